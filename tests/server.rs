use autotimetabler::config::SolvePolicy;
use autotimetabler::server::router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn post_json(body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/timetable/solve")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router(SolvePolicy::default()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn solves_a_timetable_over_http() {
    let (status, body) = post_json(json!({
        "start": 9,
        "end": 18,
        "days": "12345",
        "gap": 0,
        "maxdays": 5,
        "periodInfo": [
            { "periodsPerClass": 1, "periodTimes": [2, 9, 2, 14], "durations": [2] },
            { "periodsPerClass": 2, "periodTimes": [1, 10, 3, 10, 2, 9, 4, 9], "durations": [1, 1] }
        ]
    }))
    .await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["optimal"], json!(true));
    assert_eq!(body["unsatisfied"], json!(0));
    assert_eq!(body["unmetPreferences"], json!([]));
    let times: Vec<i64> = serde_json::from_value(body["times"].clone()).unwrap();
    let periods: Vec<Vec<i64>> = serde_json::from_value(body["periodTimes"].clone()).unwrap();
    // one start per class, however many periods each has
    assert_eq!(times.len(), 2);
    // the tutorial on Tuesday at 9 would clash with the Tuesday lecture
    if times[1] == 218 {
        assert_eq!(times, vec![228, 218]);
        assert_eq!(periods, vec![vec![228], vec![218, 418]]);
    } else {
        assert_eq!(times[1], 120);
        assert_eq!(periods[1], vec![120, 320]);
    }
}

#[tokio::test]
async fn infeasible_request_returns_an_empty_timetable() {
    let (status, body) = post_json(json!({
        "days": [1, 2, 3, 4, 5],
        "periodInfo": [
            { "periodsPerClass": 1, "periodTimes": [1, 9], "durations": [2] },
            { "periodsPerClass": 1, "periodTimes": [1, 10], "durations": [2] }
        ]
    }))
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["times"], json!([]));
    assert_eq!(body["periodTimes"], json!([]));
    assert_eq!(body["optimal"], json!(false));
}

#[tokio::test]
async fn malformed_class_is_a_bad_request() {
    let (status, body) = post_json(json!({
        "days": [1, 2],
        "periodInfo": [
            { "periodsPerClass": 2, "periodTimes": [1, 9, 1], "durations": [1, 1] }
        ]
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().starts_with("class 0 is malformed"));
}

#[tokio::test]
async fn health_check_answers() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router(SolvePolicy::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
