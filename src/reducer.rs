//! Raw class descriptions reduced to the shape the model builder needs.

use itertools::Itertools;

use crate::data::{ClassSpec, Weekday};
use crate::error::ClassSpecError;
use crate::time::{self, HOURS_PER_DAY, Moment};

/// A class reduced to what the model needs to place it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReducedClass {
    /// One interval per offering. Covers single-period classes and two
    /// back-to-back periods merged into one.
    Single { duration: i64, starts: Vec<Moment> },
    /// Several periods on different days that must be taken from the same
    /// offering. `offerings[i][k]` is the start of period `k` of offering `i`.
    Grouped {
        durations: Vec<i64>,
        offerings: Vec<Vec<Moment>>,
    },
}

impl ReducedClass {
    pub fn is_grouped(&self) -> bool {
        matches!(self, ReducedClass::Grouped { .. })
    }

    /// Number of start times this class contributes to a timetable.
    pub fn period_count(&self) -> usize {
        match self {
            ReducedClass::Single { .. } => 1,
            ReducedClass::Grouped { durations, .. } => durations.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Period {
    day: Weekday,
    hour: f64,
}

impl Period {
    fn start(&self) -> Moment {
        time::encode(self.day, self.hour)
    }
}

/// Reduces one class, rejecting descriptions whose counts do not line up.
pub fn reduce(spec: &ClassSpec) -> Result<ReducedClass, ClassSpecError> {
    // a class without a period count is a single one-hour period
    let (per_class, durations) = match spec.periods_per_class {
        0 => (1, vec![1.0]),
        n => (n as usize, spec.durations.clone()),
    };

    let offerings = parse_offerings(&spec.period_times, per_class)?;
    if durations.len() != per_class {
        return Err(ClassSpecError::DurationCount {
            expected: per_class,
            found: durations.len(),
        });
    }
    if let Some(&bad) = durations
        .iter()
        .find(|d| !d.is_finite() || **d <= 0.0 || **d > HOURS_PER_DAY as f64)
    {
        return Err(ClassSpecError::InvalidDuration(bad));
    }
    // no period may run into the next day
    for offering in &offerings {
        for (period, duration) in offering.iter().zip(&durations) {
            ends_same_day(period.hour, *duration)?;
        }
    }

    if per_class == 1 {
        return Ok(ReducedClass::Single {
            duration: time::hours_to_units(durations[0]),
            starts: offerings.iter().map(|o| o[0].start()).collect(),
        });
    }

    if per_class == 2 {
        let same_day = |offering: &Vec<Period>| offering[0].day == offering[1].day;
        let first = same_day(&offerings[0]);
        if let Some(offering) = offerings.iter().position(|o| same_day(o) != first) {
            return Err(ClassSpecError::MixedConsecutivePeriods { offering });
        }
        if first {
            for offering in &offerings {
                ends_same_day(offering[0].hour, durations[0] + durations[1])?;
            }
            return Ok(ReducedClass::Single {
                duration: time::hours_to_units(durations[0] + durations[1]),
                starts: offerings.iter().map(|o| o[0].start()).collect(),
            });
        }
    }

    Ok(ReducedClass::Grouped {
        durations: durations.iter().map(|d| time::hours_to_units(*d)).collect(),
        offerings: offerings
            .iter()
            .map(|o| o.iter().map(Period::start).collect())
            .collect(),
    })
}

fn ends_same_day(hour: f64, duration: f64) -> Result<(), ClassSpecError> {
    if hour + duration > HOURS_PER_DAY as f64 {
        return Err(ClassSpecError::InvalidDuration(duration));
    }
    Ok(())
}

fn parse_offerings(times: &[f64], per_class: usize) -> Result<Vec<Vec<Period>>, ClassSpecError> {
    let per_offering = 2 * per_class;
    if times.is_empty() || times.len() % per_offering != 0 {
        return Err(ClassSpecError::PeriodTimeCount {
            per_offering,
            found: times.len(),
        });
    }

    let periods: Vec<Period> = times
        .iter()
        .tuples()
        .map(|(&day, &hour)| parse_period(day, hour))
        .collect::<Result<_, _>>()?;

    Ok(periods.chunks(per_class).map(<[Period]>::to_vec).collect())
}

fn parse_period(day: f64, hour: f64) -> Result<Period, ClassSpecError> {
    if day.fract() != 0.0 || !(1.0..=5.0).contains(&day) {
        return Err(ClassSpecError::InvalidDay(day));
    }
    if !(0.0..HOURS_PER_DAY as f64).contains(&hour) {
        return Err(ClassSpecError::InvalidHour(hour));
    }
    Ok(Period {
        day: day as Weekday,
        hour,
    })
}
