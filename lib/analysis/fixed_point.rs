//! A generic forward worklist solver.

use crate::Error;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An analysis which can be driven to a fixed point by
/// `fixed_point_forward`.
pub trait FixedPointAnalysis<Point, State: Clone + Debug + PartialEq + Eq> {
    /// Given the state at a point, create the states flowing to each of its
    /// successors.
    fn trans(&self, point: &Point, state: &State) -> Result<Vec<(Point, State)>, Error>;

    /// Given two states reaching the same point, join them into one state.
    fn join(&self, point: &Point, state0: &State, state1: &State) -> Result<State, Error>;

    /// Given the state previously recorded at a widening point, and the state
    /// which would replace it, produce a state which changes less often.
    fn widen(&self, previous: &State, next: &State) -> State;

    /// Returns true if states at this point must eventually be widened.
    fn is_widening_point(&self, point: &Point) -> bool;
}

/// A flag shared with an analysis running on another thread, which asks it to
/// stop.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why an analysis stopped before reaching a fixed point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AbortReason {
    Cancelled,
    Timeout,
    StepLimit,
}

/// How an analysis ended.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    /// Every state is stable.
    Complete,
    /// The recorded states are partial, and may not hold for every
    /// execution.
    Aborted(AbortReason),
}

impl Status {
    pub fn is_complete(&self) -> bool {
        *self == Status::Complete
    }
}

/// The budgets bounding one run of `fixed_point_forward`.
#[derive(Clone, Debug)]
pub struct Control<'c> {
    pub widening_threshold: usize,
    pub max_steps: usize,
    pub check_interval: usize,
    pub time_budget: Option<Duration>,
    pub cancel: Option<&'c CancellationToken>,
}

impl<'c> Control<'c> {
    fn interrupted(&self, started: Instant) -> Option<AbortReason> {
        if self.cancel.map(|cancel| cancel.is_cancelled()).unwrap_or(false) {
            return Some(AbortReason::Cancelled);
        }
        match self.time_budget {
            Some(budget) if started.elapsed() >= budget => Some(AbortReason::Timeout),
            _ => None,
        }
    }
}

/// The states recorded by `fixed_point_forward`.
#[derive(Clone, Debug)]
pub struct FixedPoint<Point, State> {
    states: BTreeMap<Point, State>,
    status: Status,
    steps: usize,
}

impl<Point, State> FixedPoint<Point, State> {
    pub fn states(&self) -> &BTreeMap<Point, State> {
        &self.states
    }

    pub fn into_states(self) -> BTreeMap<Point, State> {
        self.states
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The number of worklist entries processed.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

/// Drive `analysis` forward from `entry` until no recorded state changes, or
/// a budget in `control` is exhausted.
///
/// The state recorded at a point is the join of every state which flowed to
/// it. At widening points, once a state has changed
/// `control.widening_threshold` times, further changes are widened.
pub fn fixed_point_forward<Analysis, Point, State>(
    analysis: &Analysis,
    entry: Point,
    entry_state: State,
    control: &Control,
) -> Result<FixedPoint<Point, State>, Error>
where
    Analysis: FixedPointAnalysis<Point, State>,
    Point: Clone + Debug + Eq + Hash + Ord,
    State: Clone + Debug + PartialEq + Eq,
{
    let mut states: BTreeMap<Point, State> = BTreeMap::new();
    let mut visits: FxHashMap<Point, usize> = FxHashMap::default();
    let mut queue: VecDeque<Point> = VecDeque::new();
    let mut queued: FxHashSet<Point> = FxHashSet::default();
    let started = Instant::now();
    let mut steps = 0;

    states.insert(entry.clone(), entry_state);
    queued.insert(entry.clone());
    queue.push_back(entry);

    while let Some(point) = queue.pop_front() {
        queued.remove(&point);
        if control.check_interval > 0 && steps % control.check_interval == 0 {
            if let Some(reason) = control.interrupted(started) {
                debug!("analysis aborted after {} steps: {:?}", steps, reason);
                return Ok(FixedPoint {
                    states,
                    status: Status::Aborted(reason),
                    steps,
                });
            }
        }
        if steps >= control.max_steps {
            debug!("analysis aborted after {} steps", steps);
            return Ok(FixedPoint {
                states,
                status: Status::Aborted(AbortReason::StepLimit),
                steps,
            });
        }
        steps += 1;

        let state = match states.get(&point) {
            Some(state) => state.clone(),
            None => continue,
        };

        for (successor, successor_state) in analysis.trans(&point, &state)? {
            let next = match states.get(&successor) {
                Some(previous) => {
                    let joined = analysis.join(&successor, previous, &successor_state)?;
                    if joined == *previous {
                        continue;
                    }
                    if analysis.is_widening_point(&successor) {
                        let visits = visits.entry(successor.clone()).or_insert(0);
                        *visits += 1;
                        if *visits >= control.widening_threshold {
                            debug!("widening at {:?} after {} changes", successor, visits);
                            analysis.widen(previous, &joined)
                        } else {
                            joined
                        }
                    } else {
                        joined
                    }
                }
                None => successor_state,
            };
            trace!("{:?} -> {:?}", point, successor);
            states.insert(successor.clone(), next);
            if queued.insert(successor.clone()) {
                queue.push_back(successor);
            }
        }
    }

    Ok(FixedPoint {
        states,
        status: Status::Complete,
        steps,
    })
}
