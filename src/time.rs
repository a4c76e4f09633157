//! Week time as one integer: `day * DAY_MULT + hour * TIME_MULT`.

/// Distance between the start of two consecutive days.
pub const DAY_MULT: i64 = 100;
/// Encoded units per hour.
pub const TIME_MULT: i64 = 2;

pub const FIRST_DAY: u8 = 1;
pub const LAST_DAY: u8 = 5;
pub const HOURS_PER_DAY: i64 = 24;

/// Earliest encodable moment (Monday, midnight).
pub const MIN_MOMENT: Moment = FIRST_DAY as i64 * DAY_MULT;
/// Latest encodable moment (Friday, midnight at the end of the day).
pub const MAX_MOMENT: Moment = LAST_DAY as i64 * DAY_MULT + HOURS_PER_DAY * TIME_MULT;

pub type Moment = i64;

/// Encodes a weekday (Monday = 1) and an hour of that day.
///
/// Fractional hours are rounded to the nearest half hour.
pub fn encode(day: u8, hour: f64) -> Moment {
    day as i64 * DAY_MULT + hours_to_units(hour)
}

/// Converts a length in hours to encoded units.
pub fn hours_to_units(hours: f64) -> i64 {
    (hours * TIME_MULT as f64).round() as i64
}

/// Recovers the weekday of an encoded moment.
pub fn day_of(moment: Moment) -> i64 {
    moment.div_euclid(DAY_MULT)
}

/// First moment of `day`.
pub fn start_of_day(day: u8) -> Moment {
    day as i64 * DAY_MULT
}

/// Moment at which `day` ends.
pub fn end_of_day(day: u8) -> Moment {
    start_of_day(day) + HOURS_PER_DAY * TIME_MULT
}

pub fn is_weekday(day: u8) -> bool {
    (FIRST_DAY..=LAST_DAY).contains(&day)
}

pub fn weekdays() -> impl Iterator<Item = u8> {
    FIRST_DAY..=LAST_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wednesday_ten_am_round_trips() {
        let moment = encode(3, 10.0);
        assert_eq!(moment, 320);
        assert_eq!(day_of(moment), 3);
    }

    #[test]
    fn half_hours_are_representable() {
        assert_eq!(encode(2, 9.5), 219);
        assert_eq!(hours_to_units(1.5), 3);
    }

    #[test]
    fn valid_range_spans_the_working_week() {
        assert_eq!(MIN_MOMENT, 100);
        assert_eq!(MAX_MOMENT, 548);
        assert_eq!(end_of_day(5), MAX_MOMENT);
        assert!(weekdays().all(|d| day_of(encode(d, 23.5)) == d as i64));
    }

    #[test]
    fn encodings_are_ordered_across_days() {
        assert!(encode(1, 23.5) < encode(2, 0.0));
        assert!(encode(4, 8.0) < encode(4, 8.5));
    }
}
