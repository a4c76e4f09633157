//! Solves a [`CpModel`] as a mixed integer program with HiGHS.

use good_lp::solvers::SolutionStatus;
use good_lp::{
    Constraint as LpConstraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable, constraint, default_solver, variable,
};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

use crate::model::{
    BoolVar, ConstraintSolver, Constraint, CpModel, Domain, Interval, SolveOutcome, SolveStatus,
    Start,
};

/// HiGHS backed [`ConstraintSolver`]. Runs single threaded with a fixed seed
/// so that identical models give identical answers.
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    time_limit: Option<Duration>,
}

impl HighsSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(time_limit: Option<Duration>) -> Self {
        Self { time_limit }
    }
}

/// How two intervals are kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separation {
    /// Both start at constants and intersect: at most one may be present.
    Exclusive(usize, usize),
    /// One must end before the other starts, the order is a decision.
    Ordered(usize, usize),
}

/// A [`Separation`] with its order variable.
#[derive(Debug, Clone, Copy)]
enum Disjunction {
    Exclusive(usize, usize),
    Ordered { a: usize, b: usize, a_first: Variable },
}

/// Bounds and presence of an interval as the linearisation sees it.
#[derive(Debug, Clone, Copy)]
struct Span {
    min_start: i64,
    max_start: i64,
    size: i64,
    presence: Option<BoolVar>,
    fixed: bool,
}

impl Span {
    fn of(model: &CpModel, interval: &Interval) -> Self {
        let (min_start, max_start, fixed) = match interval.start {
            Start::Fixed(at) => (at, at, true),
            Start::Var(var) => {
                let domain = &model.int_var(var).domain;
                (domain.min(), domain.max(), false)
            }
        };
        Self {
            min_start,
            max_start,
            size: interval.size,
            presence: interval.presence,
            fixed,
        }
    }

    fn max_end(&self) -> i64 {
        self.max_start + self.size
    }
}

/// Works out which interval pairs need a disjunction. `None` means two
/// mandatory intervals are bound to intersect.
fn separations(model: &CpModel) -> Option<Vec<Separation>> {
    let mut separations = Vec::new();
    for constraint in model.constraints() {
        let Constraint::NoOverlap(intervals) = constraint else {
            continue;
        };
        for (a, b) in intervals
            .iter()
            .map(|i| i.index())
            .filter(|&i| model.intervals()[i].size > 0)
            .tuple_combinations()
        {
            let (sa, sb) = (
                Span::of(model, &model.intervals()[a]),
                Span::of(model, &model.intervals()[b]),
            );
            if sa.max_end() <= sb.min_start || sb.max_end() <= sa.min_start {
                continue;
            }
            if sa.fixed && sb.fixed {
                if sa.presence.is_none() && sb.presence.is_none() {
                    trace!(
                        "Intervals {} and {} always overlap",
                        model.intervals()[a].name,
                        model.intervals()[b].name
                    );
                    return None;
                }
                separations.push(Separation::Exclusive(a, b));
            } else {
                separations.push(Separation::Ordered(a, b));
            }
        }
    }
    Some(separations)
}

fn absent(presence: Option<BoolVar>, bools: &[Variable]) -> Expression {
    match presence {
        Some(p) => Expression::from(1.0) - bools[p.index()],
        None => Expression::from(0.0),
    }
}

fn present(presence: Option<BoolVar>, bools: &[Variable]) -> Expression {
    match presence {
        Some(p) => Expression::from(bools[p.index()]),
        None => Expression::from(1.0),
    }
}

/// `lhs <= big_m * relax`, where `relax` is zero when the row must hold.
fn relaxed_leq(lhs: Expression, big_m: i64, relax: Expression) -> LpConstraint {
    let rhs = relax * big_m.max(0) as f64;
    constraint!(lhs <= rhs)
}

struct Linearisation {
    ints: Vec<Expression>,
    bounds: Vec<(i64, i64)>,
    bools: Vec<Variable>,
    rows: Vec<LpConstraint>,
}

impl Linearisation {
    fn int(&self, index: usize) -> (Expression, i64, i64) {
        let (min, max) = self.bounds[index];
        (self.ints[index].clone(), min, max)
    }

    fn start(&self, interval: &Interval) -> Expression {
        match interval.start {
            Start::Fixed(at) => Expression::from(at as f64),
            Start::Var(var) => self.ints[var.index()].clone(),
        }
    }

    fn add_constraint(&mut self, constraint: &Constraint) {
        match constraint {
            Constraint::ExactlyOne(bools) => {
                let sum: Expression = bools.iter().map(|b| self.bools[b.index()]).sum();
                self.rows.push(constraint!(sum == 1));
            }
            Constraint::EqualsValueIf { var, value, guard } => {
                let (x, min, max) = self.int(var.index());
                let off = Expression::from(1.0) - self.bools[guard.index()];
                let v = *value as f64;
                self.rows
                    .push(relaxed_leq(x.clone() - v, max - value, off.clone()));
                self.rows
                    .push(relaxed_leq(Expression::from(v) - x, value - min, off));
            }
            Constraint::EqualsVarIf { left, right, guard } => {
                let (l, lmin, lmax) = self.int(left.index());
                let (r, rmin, rmax) = self.int(right.index());
                let off = Expression::from(1.0) - self.bools[guard.index()];
                self.rows
                    .push(relaxed_leq(l.clone() - r.clone(), lmax - rmin, off.clone()));
                self.rows.push(relaxed_leq(r - l, rmax - lmin, off));
            }
            Constraint::DivisionIf {
                quotient,
                dividend,
                divisor,
                guard,
            } => {
                let (q, qmin, qmax) = self.int(quotient.index());
                let (x, xmin, xmax) = self.int(dividend.index());
                let d = *divisor;
                let off = Expression::from(1.0) - self.bools[guard.index()];
                // d*q <= x <= d*q + d - 1
                self.rows.push(relaxed_leq(
                    q.clone() * d as f64 - x.clone(),
                    d * qmax - xmin,
                    off.clone(),
                ));
                let slack = (d - 1) as f64;
                self.rows.push(relaxed_leq(
                    x - q * d as f64 - slack,
                    xmax - d * qmin - (d - 1),
                    off,
                ));
            }
            Constraint::AnyOfIf { literals, guard } => {
                let sum: Expression = literals.iter().map(|b| self.bools[b.index()]).sum();
                let on = self.bools[guard.index()];
                self.rows.push(constraint!(sum >= on));
            }
            // handled through the precomputed separations
            Constraint::NoOverlap(_) => {}
        }
    }

    fn add_disjunction(&mut self, model: &CpModel, disjunction: Disjunction) {
        match disjunction {
            Disjunction::Exclusive(a, b) => {
                let (ia, ib) = (&model.intervals()[a], &model.intervals()[b]);
                let both = present(ia.presence, &self.bools) + present(ib.presence, &self.bools);
                self.rows.push(constraint!(both <= 1));
            }
            Disjunction::Ordered { a, b, a_first } => {
                let (ia, ib) = (&model.intervals()[a], &model.intervals()[b]);
                let (sa, sb) = (Span::of(model, ia), Span::of(model, ib));
                let skipped =
                    absent(sa.presence, &self.bools) + absent(sb.presence, &self.bools);
                let end_a = self.start(ia) + sa.size as f64;
                let end_b = self.start(ib) + sb.size as f64;

                self.rows.push(relaxed_leq(
                    end_a - self.start(ib),
                    sa.max_end() - sb.min_start,
                    Expression::from(1.0) - a_first + skipped.clone(),
                ));
                self.rows.push(relaxed_leq(
                    end_b - self.start(ia),
                    sb.max_end() - sa.min_start,
                    Expression::from(a_first) + skipped,
                ));
            }
        }
    }
}

impl ConstraintSolver for HighsSolver {
    fn solve(&self, model: &CpModel) -> SolveOutcome {
        let start_time = Instant::now();

        if model.int_vars().iter().any(|v| v.domain.is_empty()) {
            debug!("A variable has an empty domain");
            return SolveOutcome::without_solution(SolveStatus::Infeasible);
        }
        let Some(separations) = separations(model) else {
            return SolveOutcome::without_solution(SolveStatus::Infeasible);
        };

        let mut problem = ProblemVariables::new();
        let mut one_hots = Vec::new();
        let ints: Vec<Expression> = model
            .int_vars()
            .iter()
            .map(|def| match &def.domain {
                Domain::Values(values) => {
                    let picks = problem.add_vector(variable().binary(), values.len());
                    let expr = values
                        .iter()
                        .zip(&picks)
                        .map(|(&value, &pick)| value as f64 * Expression::from(pick))
                        .sum();
                    one_hots.push(picks);
                    expr
                }
                Domain::Range { min, max } => Expression::from(
                    problem.add(variable().integer().min(*min as f64).max(*max as f64)),
                ),
            })
            .collect();
        let bools = problem.add_vector(variable().binary(), model.bool_var_count());
        let disjunctions: Vec<Disjunction> = separations
            .iter()
            .map(|s| match *s {
                Separation::Exclusive(a, b) => Disjunction::Exclusive(a, b),
                Separation::Ordered(a, b) => Disjunction::Ordered {
                    a,
                    b,
                    a_first: problem.add(variable().binary()),
                },
            })
            .collect();

        let objective: Expression = model
            .preferences()
            .iter()
            .map(|p| p.weight as f64 * Expression::from(bools[p.guard.index()]))
            .sum();

        let mut lin = Linearisation {
            ints,
            bounds: model
                .int_vars()
                .iter()
                .map(|v| (v.domain.min(), v.domain.max()))
                .collect(),
            bools,
            rows: Vec::new(),
        };
        for picks in one_hots {
            let sum: Expression = picks.into_iter().sum();
            lin.rows.push(constraint!(sum == 1));
        }
        for constraint in model.constraints() {
            lin.add_constraint(constraint);
        }
        for disjunction in disjunctions {
            lin.add_disjunction(model, disjunction);
        }

        info!(
            "Solving MIP with {} rows over {} separations...",
            lin.rows.len(),
            separations.len()
        );
        let mut lp = problem
            .maximise(objective)
            .using(default_solver)
            .set_option("threads", 1) // limit to 1 thread for reproducibility
            .set_option("random_seed", 1234) //set seed for reproducibility
            .set_option("log_to_console", "false");
        if let Some(limit) = self.time_limit {
            lp = lp.set_option("time_limit", limit.as_secs_f64());
        }
        for row in lin.rows.drain(..) {
            lp.add_constraint(row);
        }

        let solution = match lp.solve() {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => {
                info!("Model proven infeasible in {:.2?}", start_time.elapsed());
                return SolveOutcome::without_solution(SolveStatus::Infeasible);
            }
            Err(e) => {
                warn!("Solver gave up: {}", e);
                return SolveOutcome::without_solution(SolveStatus::Unknown);
            }
        };
        let status = solve_status(solution.status());
        info!("Solution ({:?}) found in {:.2?}", status, start_time.elapsed());

        let int_values: Vec<i64> = lin
            .ints
            .iter()
            .map(|expr| solution.eval(expr.clone()).round() as i64)
            .collect();
        let bool_values: Vec<bool> = lin.bools.iter().map(|b| solution.value(*b) > 0.5).collect();
        let objective = model
            .preferences()
            .iter()
            .filter(|p| bool_values[p.guard.index()])
            .map(|p| p.weight as i64)
            .sum();

        SolveOutcome {
            status,
            objective,
            int_values,
            bool_values,
        }
    }
}

/// A stop on a limit still carries HiGHS' best incumbent.
fn solve_status(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::Feasible,
    }
}
