//! Running the interpreter over a whole `ControlFlowGraph`.

use crate::analysis::dftype::DfType;
use crate::analysis::fixed_point::{
    fixed_point_forward, CancellationToken, Control, FixedPointAnalysis, Status,
};
use crate::analysis::interpreter::{Interpreter, SuccessorType};
use crate::analysis::options::Options;
use crate::analysis::state::MemoryState;
use crate::il::{ControlFlowGraph, Slot};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A point in the analysis: an offset, and the calling context it is reached
/// in.
///
/// The context holds the return offset of every active inlined call,
/// outermost first. The same offset reached through two different call sites
/// is analyzed separately.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ProgramPoint {
    offset: usize,
    context: Vec<usize>,
}

impl ProgramPoint {
    pub fn new(offset: usize, context: Vec<usize>) -> ProgramPoint {
        ProgramPoint { offset, context }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn context(&self) -> &[usize] {
        &self.context
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.offset)
        } else {
            write!(f, "{}@{:?}", self.offset, self.context)
        }
    }
}

/// What is known about a conditional branch once the analysis completes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ConditionOutcome {
    /// The condition is true on every execution reaching the branch.
    AlwaysTrue,
    /// The condition is false on every execution reaching the branch.
    AlwaysFalse,
    Unknown,
}

impl fmt::Display for ConditionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConditionOutcome::AlwaysTrue => write!(f, "always true"),
            ConditionOutcome::AlwaysFalse => write!(f, "always false"),
            ConditionOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

struct Dataflow<'d> {
    interpreter: Interpreter<'d>,
    loop_headers: BTreeSet<usize>,
    max_range_intervals: usize,
}

impl<'d> FixedPointAnalysis<ProgramPoint, MemoryState> for Dataflow<'d> {
    fn trans(
        &self,
        point: &ProgramPoint,
        state: &MemoryState,
    ) -> Result<Vec<(ProgramPoint, MemoryState)>, Error> {
        Ok(self
            .interpreter
            .step(point.offset, state)?
            .into_iter()
            .map(|successor| {
                let point = ProgramPoint::new(
                    successor.offset(),
                    successor.state().call_stack().context(),
                );
                (point, MemoryState::from(successor))
            })
            .collect())
    }

    fn join(
        &self,
        point: &ProgramPoint,
        state0: &MemoryState,
        state1: &MemoryState,
    ) -> Result<MemoryState, Error> {
        state0
            .merge(state1, self.max_range_intervals)
            .map_err(|mismatch| Error::StateMismatch {
                offset: point.offset,
                mismatch,
            })
    }

    fn widen(&self, previous: &MemoryState, next: &MemoryState) -> MemoryState {
        next.widen(previous)
    }

    fn is_widening_point(&self, point: &ProgramPoint) -> bool {
        self.loop_headers.contains(&point.offset)
    }
}

/// The result of `analyze`.
#[derive(Clone, Debug)]
pub struct Analysis {
    status: Status,
    states: BTreeMap<usize, MemoryState>,
    conditions: BTreeMap<usize, ConditionOutcome>,
    instructions: usize,
    steps: usize,
}

impl Analysis {
    /// Whether the analysis reached a fixed point.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The state before each reached offset, joined across every calling
    /// context.
    pub fn states(&self) -> &BTreeMap<usize, MemoryState> {
        &self.states
    }

    /// The state before the instruction at `offset`. `None` if the offset was
    /// never reached.
    pub fn state(&self, offset: usize) -> Option<&MemoryState> {
        self.states.get(&offset)
    }

    /// What is known about the conditional branch at `offset`. `None` if
    /// there is no reachable conditional branch there.
    pub fn condition(&self, offset: usize) -> Option<ConditionOutcome> {
        self.conditions.get(&offset).cloned()
    }

    /// Every conditional branch whose condition always has the same value,
    /// with that value.
    pub fn constant_conditions(&self) -> BTreeMap<usize, bool> {
        self.conditions
            .iter()
            .filter_map(|(offset, outcome)| match *outcome {
                ConditionOutcome::AlwaysTrue => Some((*offset, true)),
                ConditionOutcome::AlwaysFalse => Some((*offset, false)),
                ConditionOutcome::Unknown => None,
            })
            .collect()
    }

    /// Every offset no execution reaches.
    ///
    /// If the analysis was aborted, this includes offsets it had not reached
    /// yet.
    pub fn unreachable(&self) -> Vec<usize> {
        (0..self.instructions)
            .filter(|offset| !self.states.contains_key(offset))
            .collect()
    }

    /// The number of worklist entries processed.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

/// Analyze one `ControlFlowGraph`, beginning at offset `0` with `initial`
/// bound.
///
/// The control flow graph is validated first. A malformed graph, or a stack
/// mismatch found during the analysis, is an `Error`. Running out of budget,
/// or being cancelled through `cancel`, is not. The `Analysis` then reports
/// `Status::Aborted` and holds the states computed so far.
pub fn analyze(
    control_flow_graph: &ControlFlowGraph,
    initial: &BTreeMap<Slot, DfType>,
    options: &Options,
    cancel: Option<&CancellationToken>,
) -> Result<Analysis, Error> {
    control_flow_graph.validate()?;

    let dataflow = Dataflow {
        interpreter: Interpreter::new(control_flow_graph, options),
        loop_headers: control_flow_graph.loop_headers(),
        max_range_intervals: options.max_range_intervals(),
    };

    let entry_state = MemoryState::with_slots(
        &initial
            .iter()
            .map(|(slot, dftype)| (slot.clone(), dftype.clone().canonical()))
            .collect(),
    );

    let control = Control {
        widening_threshold: options.widening_threshold(),
        max_steps: options.max_steps(),
        check_interval: options.cancellation_check_interval(),
        time_budget: options.time_budget(),
        cancel,
    };

    let fixed_point = fixed_point_forward(
        &dataflow,
        ProgramPoint::new(0, Vec::new()),
        entry_state,
        &control,
    )?;

    if let Status::Aborted(reason) = fixed_point.status() {
        warn!(
            "analysis aborted after {} steps: {:?}",
            fixed_point.steps(),
            reason
        );
    }

    let mut conditions: BTreeMap<usize, ConditionOutcome> = BTreeMap::new();
    let mut outcomes: BTreeMap<usize, (bool, bool)> = BTreeMap::new();
    for (point, state) in fixed_point.states() {
        if !control_flow_graph
            .instruction(point.offset)?
            .operation()
            .is_conditional_branch()
        {
            continue;
        }
        if !fixed_point.status().is_complete() {
            conditions.insert(point.offset, ConditionOutcome::Unknown);
            continue;
        }
        let outcome = outcomes.entry(point.offset).or_insert((false, false));
        for successor in dataflow.interpreter.step(point.offset, state)? {
            match successor.type_() {
                SuccessorType::ConditionTrue => outcome.0 = true,
                SuccessorType::ConditionFalse => outcome.1 = true,
                _ => {}
            }
        }
    }
    for (offset, outcome) in outcomes {
        let outcome = match outcome {
            (true, false) => ConditionOutcome::AlwaysTrue,
            (false, true) => ConditionOutcome::AlwaysFalse,
            (true, true) => ConditionOutcome::Unknown,
            // The branch is reached, but its condition has no value.
            (false, false) => continue,
        };
        conditions.insert(offset, outcome);
    }

    let mut states: BTreeMap<usize, MemoryState> = BTreeMap::new();
    for (point, state) in fixed_point.states() {
        let state = state.without_call_stack();
        let state = match states.remove(&point.offset) {
            Some(merged) => merged
                .merge(&state, options.max_range_intervals())
                .map_err(|mismatch| Error::StateMismatch {
                    offset: point.offset,
                    mismatch,
                })?,
            None => state,
        };
        states.insert(point.offset, state);
    }

    Ok(Analysis {
        status: fixed_point.status(),
        states,
        conditions,
        instructions: control_flow_graph.len(),
        steps: fixed_point.steps(),
    })
}
