//! Constraint model of one request, built from its reduced classes.

use log::{debug, trace};

use crate::config::PreferenceWeights;
use crate::data::{ClassIndex, Preferences};
use crate::model::{Constraint, CpModel, Domain, IntVar, IntervalVar, PreferenceKind, Start};
use crate::reducer::ReducedClass;
use crate::time::{self, DAY_MULT, MAX_MOMENT, MIN_MOMENT, Moment};

/// Maps every class to the positions its period starts take in a flat
/// timetable.
///
/// Class `i` owns position `i` for its first period. The remaining periods of
/// grouped classes follow all first periods, in class order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    positions: Vec<Vec<usize>>,
    owners: Vec<(ClassIndex, usize)>,
}

impl OutputLayout {
    pub fn new(classes: &[ReducedClass]) -> Self {
        let mut positions: Vec<Vec<usize>> = (0..classes.len()).map(|i| vec![i]).collect();
        let mut owners: Vec<(ClassIndex, usize)> = (0..classes.len()).map(|i| (i, 0)).collect();
        for (class, reduced) in classes.iter().enumerate() {
            for period in 1..reduced.period_count() {
                positions[class].push(owners.len());
                owners.push((class, period));
            }
        }
        Self { positions, owners }
    }

    pub fn position_count(&self) -> usize {
        self.owners.len()
    }

    pub fn positions(&self, class: ClassIndex) -> &[usize] {
        &self.positions[class]
    }

    /// Class and period stored at `position`.
    pub fn owner(&self, position: usize) -> (ClassIndex, usize) {
        self.owners[position]
    }

    /// Regroups a flat list of values into one list per class.
    pub fn per_class<T: Copy>(&self, flat: &[T]) -> Vec<Vec<T>> {
        self.positions
            .iter()
            .map(|positions| positions.iter().map(|&p| flat[p]).collect())
            .collect()
    }
}

/// The model of one request together with how to read a timetable back.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub model: CpModel,
    /// Start variable of every layout position.
    pub starts: Vec<IntVar>,
    pub layout: OutputLayout,
}

pub fn build(
    classes: &[ReducedClass],
    preferences: &Preferences,
    weights: &PreferenceWeights,
) -> BuiltModel {
    let layout = OutputLayout::new(classes);
    let mut builder = ModelBuilder::new(preferences.gap_units(), layout.position_count());

    for (index, class) in classes.iter().enumerate() {
        let positions = layout.positions(index);
        match class {
            ReducedClass::Single { duration, starts } => {
                builder.add_single(index, positions[0], *duration, starts)
            }
            ReducedClass::Grouped {
                durations,
                offerings,
            } => builder.add_grouped(index, positions, durations, offerings),
        }
    }

    builder.add_day_boundaries(preferences, weights);
    if preferences.limits_days() {
        builder.add_day_limit(preferences, weights, &layout);
    }

    let built = builder.finish(layout);
    debug!(
        "Built model with {} integer variables, {} booleans, {} intervals, {} constraints and total preference weight {}",
        built.model.int_vars().len(),
        built.model.bool_var_count(),
        built.model.intervals().len(),
        built.model.constraints().len(),
        built.model.total_weight()
    );
    built
}

struct ModelBuilder {
    model: CpModel,
    gap: i64,
    starts: Vec<Option<IntVar>>,
    intervals: Vec<IntervalVar>,
}

impl ModelBuilder {
    fn new(gap: i64, positions: usize) -> Self {
        Self {
            model: CpModel::new(),
            gap,
            starts: vec![None; positions],
            intervals: Vec::new(),
        }
    }

    fn add_single(&mut self, index: ClassIndex, position: usize, duration: i64, starts: &[Moment]) {
        let start = self
            .model
            .new_int_var(Domain::from_values(starts.iter().copied()), format!("x{index}"));
        let interval = self
            .model
            .new_interval(Start::Var(start), duration + self.gap, format!("xx{index}"));
        self.starts[position] = Some(start);
        self.intervals.push(interval);
    }

    fn add_grouped(
        &mut self,
        index: ClassIndex,
        positions: &[usize],
        durations: &[i64],
        offerings: &[Vec<Moment>],
    ) {
        trace!(
            "Class {} is grouped: {} periods in {} offerings",
            index,
            durations.len(),
            offerings.len()
        );
        let selectors: Vec<_> = (0..offerings.len())
            .map(|i| self.model.new_bool_var(format!("e{index}_{i}")))
            .collect();

        // any moment of the week until an offering is selected
        let period_starts: Vec<IntVar> = (0..durations.len())
            .map(|k| {
                self.model
                    .new_int_var(Domain::range(MIN_MOMENT, MAX_MOMENT), format!("s{index}_{k}"))
            })
            .collect();

        for (selector, offering) in selectors.iter().zip(offerings) {
            for (var, value) in period_starts.iter().zip(offering) {
                self.model.add(Constraint::EqualsValueIf {
                    var: *var,
                    value: *value,
                    guard: *selector,
                });
            }
        }
        self.model.add(Constraint::ExactlyOne(selectors));

        for (k, ((var, duration), position)) in period_starts
            .iter()
            .zip(durations)
            .zip(positions)
            .enumerate()
        {
            let interval = self.model.new_interval(
                Start::Var(*var),
                duration + self.gap,
                format!("si{index}_{k}"),
            );
            self.starts[*position] = Some(*var);
            self.intervals.push(interval);
        }
    }

    /// Blocks the start and the end of every weekday with optional intervals.
    fn add_day_boundaries(&mut self, preferences: &Preferences, weights: &PreferenceWeights) {
        for day in time::weekdays() {
            let guard = self
                .model
                .new_preference(PreferenceKind::EarliestStart { day }, weights.earliest_start);
            let too_early = self.model.new_optional_interval(
                Start::Fixed(time::start_of_day(day)),
                preferences.earliest_start_units(),
                guard,
                format!("early{day}"),
            );

            let late_start = time::start_of_day(day) + preferences.latest_end_units() + self.gap;
            let guard = self
                .model
                .new_preference(PreferenceKind::LatestEnd { day }, weights.latest_end);
            let too_late = self.model.new_optional_interval(
                Start::Fixed(late_start),
                (time::end_of_day(day) - late_start).max(0),
                guard,
                format!("late{day}"),
            );

            self.intervals.extend([too_early, too_late]);
        }
    }

    /// Keeps every period on an allowed day and on at most
    /// `effective_max_days` distinct days.
    fn add_day_limit(
        &mut self,
        preferences: &Preferences,
        weights: &PreferenceWeights,
        layout: &OutputLayout,
    ) {
        let allowed = || Domain::from_values(preferences.allowed_days.iter().map(|&d| d as i64));
        let day_slots: Vec<IntVar> = (0..preferences.effective_max_days())
            .map(|j| self.model.new_int_var(allowed(), format!("dv{j}")))
            .collect();
        debug!(
            "Limiting timetable to {} of days {:?}",
            day_slots.len(),
            preferences.allowed_days
        );

        let starts: Vec<IntVar> = self.starts.iter().flatten().copied().collect();
        for (position, start) in starts.into_iter().enumerate() {
            let (class, period) = layout.owner(position);

            let day = self.model.new_int_var(allowed(), format!("day{position}"));
            let on_allowed_day = self
                .model
                .new_preference(PreferenceKind::AllowedDay { class, period }, weights.allowed_day);
            self.model.add(Constraint::DivisionIf {
                quotient: day,
                dividend: start,
                divisor: DAY_MULT,
                guard: on_allowed_day,
            });

            let matches: Vec<_> = day_slots
                .iter()
                .enumerate()
                .map(|(j, slot)| {
                    let matched = self.model.new_bool_var(format!("b{position}_{j}"));
                    self.model.add(Constraint::EqualsVarIf {
                        left: day,
                        right: *slot,
                        guard: matched,
                    });
                    matched
                })
                .collect();
            let on_shared_day = self
                .model
                .new_preference(PreferenceKind::SharedDay { class, period }, weights.shared_day);
            self.model.add(Constraint::AnyOfIf {
                literals: matches,
                guard: on_shared_day,
            });
        }
    }

    fn finish(mut self, layout: OutputLayout) -> BuiltModel {
        self.model.add(Constraint::NoOverlap(self.intervals));
        let starts: Vec<IntVar> = self.starts.into_iter().flatten().collect();
        debug_assert_eq!(starts.len(), layout.position_count());
        BuiltModel {
            model: self.model,
            starts,
            layout,
        }
    }
}
