//! Judges a solve outcome and reads the timetable back out of it.

use log::{debug, warn};
use std::fmt;

use crate::builder::{BuiltModel, OutputLayout};
use crate::data::{ClassIndex, UnmetPreference};
use crate::model::{CpModel, SolveOutcome, SolveStatus};
use crate::time::Moment;

/// Start of every period of every class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    per_class: Vec<Vec<Moment>>,
}

impl Schedule {
    pub fn new(flat: &[Moment], layout: &OutputLayout) -> Self {
        Self {
            per_class: layout.per_class(flat),
        }
    }

    /// Starts of the periods of `class`, first period first.
    pub fn starts(&self, class: ClassIndex) -> &[Moment] {
        &self.per_class[class]
    }

    /// The first period's start of each class, in request order.
    pub fn first_starts(&self) -> Vec<Moment> {
        (0..self.per_class.len())
            .filter_map(|class| self.starts(class).first().copied())
            .collect()
    }

    pub fn into_per_class(self) -> Vec<Vec<Moment>> {
        self.per_class
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The classes cannot be placed without overlapping.
    Infeasible,
    /// The solver stopped without an answer.
    Unknown,
    /// A timetable exists but leaves too many preferences unmet.
    TooManyUnsatisfied { unsatisfied: u32, max: u32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Infeasible => write!(f, "no timetable avoids overlapping classes"),
            Rejection::Unknown => write!(f, "the solver did not reach an answer"),
            Rejection::TooManyUnsatisfied { unsatisfied, max } => write!(
                f,
                "best timetable leaves {unsatisfied} preference weight unmet, more than {max}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Accepted {
        schedule: Schedule,
        /// No preference was violated.
        optimal: bool,
        unsatisfied: u32,
        unmet: Vec<UnmetPreference>,
    },
    Rejected(Rejection),
}

pub fn extract(outcome: &SolveOutcome, built: &BuiltModel, max_unsatisfied: u32) -> Extraction {
    match outcome.status {
        SolveStatus::Infeasible => return Extraction::Rejected(Rejection::Infeasible),
        SolveStatus::Unknown => return Extraction::Rejected(Rejection::Unknown),
        SolveStatus::Optimal | SolveStatus::Feasible => {}
    }

    let total = built.model.total_weight();
    let unsatisfied = (total as i64 - outcome.objective).max(0) as u32;
    debug!(
        "Objective {} of {} ({} unsatisfied)",
        outcome.objective, total, unsatisfied
    );
    if unsatisfied > max_unsatisfied {
        return Extraction::Rejected(Rejection::TooManyUnsatisfied {
            unsatisfied,
            max: max_unsatisfied,
        });
    }

    let Some(flat) = built
        .starts
        .iter()
        .map(|var| outcome.value(*var))
        .collect::<Option<Vec<_>>>()
    else {
        warn!("Solver outcome is missing start values");
        return Extraction::Rejected(Rejection::Unknown);
    };

    Extraction::Accepted {
        schedule: Schedule::new(&flat, &built.layout),
        optimal: unsatisfied == 0,
        unsatisfied,
        unmet: unmet_preferences(&built.model, outcome),
    }
}

fn unmet_preferences(model: &CpModel, outcome: &SolveOutcome) -> Vec<UnmetPreference> {
    model
        .preferences()
        .iter()
        .filter(|p| outcome.bool_value(p.guard) == Some(false))
        .map(|p| UnmetPreference {
            constraint_type: p.kind.constraint_type().to_string(),
            description: p.kind.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::config::PreferenceWeights;
    use crate::data::Preferences;
    use crate::reducer::ReducedClass;

    fn built() -> BuiltModel {
        let classes = vec![
            ReducedClass::Grouped {
                durations: vec![2, 2],
                offerings: vec![vec![118, 318], vec![218, 418]],
            },
            ReducedClass::Single {
                duration: 2,
                starts: vec![120],
            },
        ];
        let preferences = Preferences {
            earliest_start: 0,
            latest_end: 24,
            min_gap: 0,
            allowed_days: vec![1, 2, 3, 4, 5],
            max_distinct_days: 5,
        };
        build(&classes, &preferences, &PreferenceWeights::default())
    }

    /// Outcome assigning `starts` to the layout positions and honouring every
    /// preference except the first `violated` ones.
    fn outcome(built: &BuiltModel, starts: &[i64], violated: usize) -> SolveOutcome {
        let mut int_values = vec![0; built.model.int_vars().len()];
        for (var, value) in built.starts.iter().zip(starts) {
            int_values[var.index()] = *value;
        }
        let mut bool_values = vec![true; built.model.bool_var_count()];
        let mut objective = built.model.total_weight() as i64;
        for pref in built.model.preferences().iter().take(violated) {
            bool_values[pref.guard.index()] = false;
            objective -= pref.weight as i64;
        }
        SolveOutcome {
            status: SolveStatus::Optimal,
            objective,
            int_values,
            bool_values,
        }
    }

    #[test]
    fn accepted_schedule_follows_the_layout() {
        let built = built();
        let extraction = extract(&outcome(&built, &[218, 120, 418], 0), &built, 3);
        let Extraction::Accepted {
            schedule,
            optimal,
            unsatisfied,
            unmet,
        } = extraction
        else {
            panic!("expected an accepted schedule");
        };
        assert!(optimal);
        assert_eq!(unsatisfied, 0);
        assert!(unmet.is_empty());
        assert_eq!(schedule.starts(0), &[218, 418]);
        assert_eq!(schedule.starts(1), &[120]);
        assert_eq!(schedule.first_starts(), vec![218, 120]);
        assert_eq!(schedule.into_per_class(), vec![vec![218, 418], vec![120]]);
    }

    #[test]
    fn violations_within_threshold_are_reported() {
        let built = built();
        let Extraction::Accepted {
            optimal,
            unsatisfied,
            unmet,
            ..
        } = extract(&outcome(&built, &[118, 120, 318], 3), &built, 3)
        else {
            panic!("expected an accepted schedule");
        };
        assert!(!optimal);
        assert_eq!(unsatisfied, 3);
        assert_eq!(unmet.len(), 3);
        assert_eq!(unmet[0].constraint_type, "Earliest Start");
        assert_eq!(unmet[1].constraint_type, "Latest End");
    }

    #[test]
    fn too_many_violations_are_rejected() {
        let built = built();
        assert_eq!(
            extract(&outcome(&built, &[118, 120, 318], 4), &built, 3),
            Extraction::Rejected(Rejection::TooManyUnsatisfied {
                unsatisfied: 4,
                max: 3
            })
        );
    }

    #[test]
    fn threshold_is_configurable() {
        let built = built();
        assert!(matches!(
            extract(&outcome(&built, &[118, 120, 318], 1), &built, 0),
            Extraction::Rejected(Rejection::TooManyUnsatisfied { .. })
        ));
    }

    #[test]
    fn infeasible_and_unknown_outcomes_are_rejected() {
        let built = built();
        assert_eq!(
            extract(
                &SolveOutcome::without_solution(SolveStatus::Infeasible),
                &built,
                3
            ),
            Extraction::Rejected(Rejection::Infeasible)
        );
        assert_eq!(
            extract(
                &SolveOutcome::without_solution(SolveStatus::Unknown),
                &built,
                3
            ),
            Extraction::Rejected(Rejection::Unknown)
        );
    }

    #[test]
    fn missing_values_are_not_silently_zeroed() {
        let built = built();
        let mut partial = outcome(&built, &[118, 120, 318], 0);
        partial.int_values.clear();
        assert_eq!(
            extract(&partial, &built, 3),
            Extraction::Rejected(Rejection::Unknown)
        );
    }
}
