//! Solver-independent constraint model; a [`ConstraintSolver`] solves it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVar(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVar(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalVar(usize);

impl IntVar {
    pub fn index(self) -> usize {
        self.0
    }
}

impl BoolVar {
    pub fn index(self) -> usize {
        self.0
    }
}

impl IntervalVar {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domain {
    /// Sorted and deduplicated.
    Values(Vec<i64>),
    Range { min: i64, max: i64 },
}

impl Domain {
    pub fn from_values(values: impl IntoIterator<Item = i64>) -> Self {
        let mut values: Vec<i64> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Domain::Values(values)
    }

    pub fn range(min: i64, max: i64) -> Self {
        Domain::Range { min, max }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Domain::Values(values) => values.is_empty(),
            Domain::Range { min, max } => min > max,
        }
    }

    pub fn min(&self) -> i64 {
        match self {
            Domain::Values(values) => values.first().copied().unwrap_or(0),
            Domain::Range { min, .. } => *min,
        }
    }

    pub fn max(&self) -> i64 {
        match self {
            Domain::Values(values) => values.last().copied().unwrap_or(0),
            Domain::Range { max, .. } => *max,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        match self {
            Domain::Values(values) => values.binary_search(&value).is_ok(),
            Domain::Range { min, max } => (*min..=*max).contains(&value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntVarDef {
    pub name: String,
    pub domain: Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    Var(IntVar),
    Fixed(i64),
}

/// An interval of fixed size. Absent intervals (guard false) take no room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub name: String,
    pub start: Start,
    pub size: i64,
    pub presence: Option<BoolVar>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Exactly one of the booleans is true.
    ExactlyOne(Vec<BoolVar>),
    /// `guard => var == value`
    EqualsValueIf {
        var: IntVar,
        value: i64,
        guard: BoolVar,
    },
    /// `guard => left == right`
    EqualsVarIf {
        left: IntVar,
        right: IntVar,
        guard: BoolVar,
    },
    /// `guard => quotient == dividend / divisor` (floor division, positive divisor).
    DivisionIf {
        quotient: IntVar,
        dividend: IntVar,
        divisor: i64,
        guard: BoolVar,
    },
    /// `guard => any(literals)`
    AnyOfIf {
        literals: Vec<BoolVar>,
        guard: BoolVar,
    },
    /// No two present intervals intersect.
    NoOverlap(Vec<IntervalVar>),
}

/// What a preference boolean stands for, used when reporting violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKind {
    EarliestStart { day: u8 },
    LatestEnd { day: u8 },
    /// The period `period` of class `class` falls on one of the chosen days.
    SharedDay { class: usize, period: usize },
    /// The period `period` of class `class` falls on an allowed day.
    AllowedDay { class: usize, period: usize },
}

impl PreferenceKind {
    pub fn constraint_type(&self) -> &'static str {
        match self {
            PreferenceKind::EarliestStart { .. } => "Earliest Start",
            PreferenceKind::LatestEnd { .. } => "Latest End",
            PreferenceKind::SharedDay { .. } => "Maximum Days",
            PreferenceKind::AllowedDay { .. } => "Allowed Days",
        }
    }
}

impl fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceKind::EarliestStart { day } => {
                write!(f, "A class on day {day} starts before the earliest start time")
            }
            PreferenceKind::LatestEnd { day } => {
                write!(f, "A class on day {day} ends after the latest end time")
            }
            PreferenceKind::SharedDay { class, period } => write!(
                f,
                "Period {period} of class {class} adds a day beyond the maximum number of days"
            ),
            PreferenceKind::AllowedDay { class, period } => {
                write!(f, "Period {period} of class {class} is on a day that is not allowed")
            }
        }
    }
}

/// A soft constraint: `guard` enables the constraints it is attached to and
/// earns `weight` in the objective when true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub guard: BoolVar,
    pub weight: u32,
    pub kind: PreferenceKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpModel {
    int_vars: Vec<IntVarDef>,
    bool_names: Vec<String>,
    intervals: Vec<Interval>,
    constraints: Vec<Constraint>,
    preferences: Vec<Preference>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_int_var(&mut self, domain: Domain, name: impl Into<String>) -> IntVar {
        self.int_vars.push(IntVarDef {
            name: name.into(),
            domain,
        });
        IntVar(self.int_vars.len() - 1)
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> BoolVar {
        self.bool_names.push(name.into());
        BoolVar(self.bool_names.len() - 1)
    }

    pub fn new_interval(&mut self, start: Start, size: i64, name: impl Into<String>) -> IntervalVar {
        self.push_interval(Interval {
            name: name.into(),
            start,
            size,
            presence: None,
        })
    }

    pub fn new_optional_interval(
        &mut self,
        start: Start,
        size: i64,
        presence: BoolVar,
        name: impl Into<String>,
    ) -> IntervalVar {
        self.push_interval(Interval {
            name: name.into(),
            start,
            size,
            presence: Some(presence),
        })
    }

    fn push_interval(&mut self, interval: Interval) -> IntervalVar {
        self.intervals.push(interval);
        IntervalVar(self.intervals.len() - 1)
    }

    /// Creates the guard boolean of a new preference.
    pub fn new_preference(&mut self, kind: PreferenceKind, weight: u32) -> BoolVar {
        let guard = self.new_bool_var(format!("pref{}", self.preferences.len()));
        self.preferences.push(Preference {
            guard,
            weight,
            kind,
        });
        guard
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn int_var(&self, var: IntVar) -> &IntVarDef {
        &self.int_vars[var.0]
    }

    pub fn int_vars(&self) -> &[IntVarDef] {
        &self.int_vars
    }

    pub fn bool_var_count(&self) -> usize {
        self.bool_names.len()
    }

    pub fn interval(&self, var: IntervalVar) -> &Interval {
        &self.intervals[var.0]
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    /// Highest objective value the model could reach.
    pub fn total_weight(&self) -> u32 {
        self.preferences.iter().map(|p| p.weight).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Result of a solve. Values are only meaningful when the status has a
/// solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: i64,
    pub int_values: Vec<i64>,
    pub bool_values: Vec<bool>,
}

impl SolveOutcome {
    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            objective: 0,
            int_values: Vec::new(),
            bool_values: Vec::new(),
        }
    }

    pub fn value(&self, var: IntVar) -> Option<i64> {
        self.int_values.get(var.0).copied()
    }

    pub fn bool_value(&self, var: BoolVar) -> Option<bool> {
        self.bool_values.get(var.0).copied()
    }
}

/// Anything able to solve a [`CpModel`].
pub trait ConstraintSolver {
    fn solve(&self, model: &CpModel) -> SolveOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_domains_are_sorted_and_deduplicated() {
        let domain = Domain::from_values([320, 118, 320, 205]);
        assert_eq!(domain, Domain::Values(vec![118, 205, 320]));
        assert_eq!((domain.min(), domain.max()), (118, 320));
        assert!(domain.contains(205));
        assert!(!domain.contains(206));
        assert!(Domain::from_values([]).is_empty());
        assert!(Domain::range(5, 4).is_empty());
    }

    #[test]
    fn preferences_accumulate_weight() {
        let mut model = CpModel::new();
        let early = model.new_preference(PreferenceKind::EarliestStart { day: 1 }, 1);
        let allowed = model.new_preference(PreferenceKind::AllowedDay { class: 0, period: 0 }, 2);
        assert_ne!(early, allowed);
        assert_eq!(model.total_weight(), 3);
        assert_eq!(model.bool_var_count(), 2);
        assert_eq!(model.preferences()[1].guard, allowed);
    }
}
