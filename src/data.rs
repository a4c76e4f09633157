use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InputError;
use crate::time::{self, HOURS_PER_DAY, Moment, TIME_MULT};

// Type aliases for clarity
pub type ClassIndex = usize;
pub type Weekday = u8;

/// One course component (lecture, tutorial, lab...) and every offering it
/// could be taken in.
///
/// `period_times` is a flat list of `(day, hour)` pairs, `periods_per_class`
/// pairs per offering. `durations` holds the length in hours of each period
/// of an offering.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSpec {
    #[serde(default)]
    pub periods_per_class: u32,
    #[serde(default)]
    pub period_times: Vec<f64>,
    #[serde(default)]
    pub durations: Vec<f64>,
}

/// The complete input of one timetabling request.
///
/// Hours are whole hours. `end == 0` and `maxdays == 0` mean the field was
/// left unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableRequest {
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(deserialize_with = "deserialize_days")]
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub gap: u32,
    #[serde(default)]
    pub maxdays: u32,
    #[serde(default)]
    pub period_info: Vec<ClassSpec>,
}

/// Validated scheduling preferences of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub earliest_start: u32,
    pub latest_end: u32,
    pub min_gap: u32,
    /// Sorted, without duplicates, never empty.
    pub allowed_days: Vec<Weekday>,
    pub max_distinct_days: usize,
}

impl Preferences {
    pub fn earliest_start_units(&self) -> i64 {
        self.earliest_start as i64 * TIME_MULT
    }

    pub fn latest_end_units(&self) -> i64 {
        self.latest_end as i64 * TIME_MULT
    }

    pub fn gap_units(&self) -> i64 {
        self.min_gap as i64 * TIME_MULT
    }

    /// Number of distinct days a timetable may use, clamped to the allowed days.
    pub fn effective_max_days(&self) -> usize {
        self.max_distinct_days.min(self.allowed_days.len())
    }

    /// Whether the day-count preference restricts anything at all.
    pub fn limits_days(&self) -> bool {
        self.effective_max_days() < time::weekdays().count()
    }
}

impl TimetableRequest {
    pub fn preferences(&self) -> Result<Preferences, InputError> {
        let mut allowed_days = self.days.clone();
        allowed_days.sort_unstable();
        allowed_days.dedup();
        if allowed_days.is_empty() {
            return Err(InputError::NoAllowedDays);
        }
        if let Some(&day) = allowed_days.iter().find(|d| !time::is_weekday(**d)) {
            return Err(InputError::InvalidAllowedDay(day));
        }

        let latest_end = if self.end == 0 { HOURS_PER_DAY as u32 } else { self.end };
        for (field, hour) in [("start", self.start), ("end", latest_end), ("gap", self.gap)] {
            if hour as i64 > HOURS_PER_DAY {
                return Err(InputError::InvalidPreferenceHour { field, hour });
            }
        }

        let max_distinct_days = match self.maxdays {
            0 => allowed_days.len(),
            n => n as usize,
        };

        Ok(Preferences {
            earliest_start: self.start,
            latest_end,
            min_gap: self.gap,
            allowed_days,
            max_distinct_days,
        })
    }
}

/// Accepts either `[1, 3, 5]` or the digit string `"135"`.
fn deserialize_days<'de, D>(deserializer: D) -> Result<Vec<Weekday>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Days {
        List(Vec<Weekday>),
        Digits(String),
    }

    match Days::deserialize(deserializer)? {
        Days::List(days) => Ok(days),
        Days::Digits(digits) => digits
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| {
                c.to_digit(10)
                    .map(|d| d as Weekday)
                    .ok_or_else(|| de::Error::custom(format!("invalid weekday digit {c:?}")))
            })
            .collect(),
    }
}

/// Describes a preference that the returned timetable does not honour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetPreference {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// The final output of the solver.
///
/// `times` holds the first period's start of each class in request order;
/// `period_times` holds every period's start per class. Both are empty when
/// no acceptable timetable was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableResponse {
    pub times: Vec<Moment>,
    pub period_times: Vec<Vec<Moment>>,
    pub optimal: bool,
    pub unsatisfied: u32,
    pub unmet_preferences: Vec<UnmetPreference>,
}

impl TimetableResponse {
    pub fn rejected() -> Self {
        Self {
            times: Vec::new(),
            period_times: Vec::new(),
            optimal: false,
            unsatisfied: 0,
            unmet_preferences: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(days: Vec<Weekday>) -> TimetableRequest {
        TimetableRequest {
            start: 9,
            end: 0,
            days,
            gap: 1,
            maxdays: 0,
            period_info: Vec::new(),
        }
    }

    #[test]
    fn unset_fields_fall_back_to_permissive_values() {
        let prefs = request(vec![5, 1, 3, 1]).preferences().unwrap();
        assert_eq!(prefs.allowed_days, vec![1, 3, 5]);
        assert_eq!(prefs.latest_end, 24);
        assert_eq!(prefs.max_distinct_days, 3);
        assert_eq!(prefs.earliest_start_units(), 18);
        assert_eq!(prefs.gap_units(), 2);
    }

    #[test]
    fn max_days_is_clamped_to_allowed_days() {
        let mut req = request(vec![2, 4]);
        req.maxdays = 5;
        let prefs = req.preferences().unwrap();
        assert_eq!(prefs.effective_max_days(), 2);
        assert!(prefs.limits_days());

        let mut req = request(vec![1, 2, 3, 4, 5]);
        req.maxdays = 7;
        assert!(!req.preferences().unwrap().limits_days());
    }

    #[test]
    fn empty_or_weekend_days_are_rejected() {
        assert_eq!(request(vec![]).preferences(), Err(InputError::NoAllowedDays));
        assert_eq!(
            request(vec![1, 6]).preferences(),
            Err(InputError::InvalidAllowedDay(6))
        );
    }

    #[test]
    fn out_of_range_hours_are_rejected() {
        let mut req = request(vec![1]);
        req.end = 30;
        assert_eq!(
            req.preferences(),
            Err(InputError::InvalidPreferenceHour { field: "end", hour: 30 })
        );
    }

    #[test]
    fn days_deserialize_from_list_or_digits() {
        let from_list: TimetableRequest =
            serde_json::from_str(r#"{"days":[1,2],"periodInfo":[]}"#).unwrap();
        let from_digits: TimetableRequest = serde_json::from_str(r#"{"days":"12"}"#).unwrap();
        assert_eq!(from_list.days, vec![1, 2]);
        assert_eq!(from_digits.days, vec![1, 2]);
        assert!(serde_json::from_str::<TimetableRequest>(r#"{"days":"1x"}"#).is_err());
    }

    #[test]
    fn class_spec_uses_camel_case() {
        let spec: ClassSpec = serde_json::from_str(
            r#"{"periodsPerClass":2,"periodTimes":[1,9,3,9],"durations":[1,1]}"#,
        )
        .unwrap();
        assert_eq!(spec.periods_per_class, 2);
        assert_eq!(spec.period_times, vec![1.0, 9.0, 3.0, 9.0]);
    }
}
