use log::{info, trace, warn};
use std::time::Instant;

use crate::builder;
use crate::config::SolvePolicy;
use crate::data::{ClassSpec, TimetableRequest, TimetableResponse};
use crate::error::InputError;
use crate::extractor::{self, Extraction};
use crate::model::ConstraintSolver;
use crate::reducer::{self, ReducedClass};

/// Finds a timetable for `request`: reduce, build, solve, extract.
///
/// Malformed input is an error. A request with no acceptable timetable is
/// not: it yields an empty, non-optimal response.
pub fn solve<S>(
    request: &TimetableRequest,
    policy: &SolvePolicy,
    solver: &S,
) -> Result<TimetableResponse, InputError>
where
    S: ConstraintSolver + ?Sized,
{
    let start_time = Instant::now();
    let preferences = request.preferences()?;
    let classes = reduce_all(&request.period_info)?;

    info!(
        "Setting up model with {} classes ({} grouped) over days {:?}...",
        classes.len(),
        classes.iter().filter(|c| c.is_grouped()).count(),
        preferences.allowed_days
    );
    let built = builder::build(&classes, &preferences, &policy.weights);

    let outcome = solver.solve(&built.model);
    info!("Solver finished with status {:?}", outcome.status);

    let response = match extractor::extract(&outcome, &built, policy.max_unsatisfied) {
        Extraction::Accepted {
            schedule,
            optimal,
            unsatisfied,
            unmet,
        } => {
            for preference in &unmet {
                trace!("{}", preference);
            }
            TimetableResponse {
                times: schedule.first_starts(),
                period_times: schedule.into_per_class(),
                optimal,
                unsatisfied,
                unmet_preferences: unmet,
            }
        }
        Extraction::Rejected(reason) => {
            warn!("No timetable returned: {}", reason);
            TimetableResponse::rejected()
        }
    };

    info!("Timetable request handled in {:.2?}", start_time.elapsed());
    Ok(response)
}

/// Reduces every class, naming the first one that is malformed.
pub fn reduce_all(specs: &[ClassSpec]) -> Result<Vec<ReducedClass>, InputError> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| reducer::reduce(spec).map_err(|e| InputError::class(index, e)))
        .collect()
}
