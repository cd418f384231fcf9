//! The transfer function for a single instruction.

use crate::analysis::call_stack::CallFrame;
use crate::analysis::dftype::{DfType, Kind, Nullability, TypeConstraint};
use crate::analysis::options::Options;
use crate::analysis::state::{Condition, MemoryState, Relation, StackValue};
use crate::il::{Constant, ControlFlowGraph, Operation, Slot, UnaryOp};
use crate::{Error, StateMismatch};

/// How control reached a `Successor`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SuccessorType {
    /// The next offset.
    FallThrough,
    /// The target of a `Goto`.
    Jump,
    /// A conditional branch whose condition was true.
    ConditionTrue,
    /// A conditional branch whose condition was false.
    ConditionFalse,
    /// The entry of an inlined call.
    Call,
    /// The return offset of an inlined call.
    Return,
}

/// A state produced by executing one instruction, and the offset it flows to.
#[derive(Clone, Debug)]
pub struct Successor {
    offset: usize,
    state: MemoryState,
    type_: SuccessorType,
}

impl Successor {
    pub(crate) fn new(offset: usize, state: MemoryState, type_: SuccessorType) -> Successor {
        Successor {
            offset,
            state,
            type_,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn type_(&self) -> SuccessorType {
        self.type_
    }
}

impl From<Successor> for MemoryState {
    fn from(successor: Successor) -> MemoryState {
        successor.state
    }
}

/// Executes instructions of one `ControlFlowGraph` over `MemoryState`.
pub struct Interpreter<'i> {
    control_flow_graph: &'i ControlFlowGraph,
    max_call_depth: usize,
}

impl<'i> Interpreter<'i> {
    pub fn new(control_flow_graph: &'i ControlFlowGraph, options: &Options) -> Interpreter<'i> {
        Interpreter {
            control_flow_graph,
            max_call_depth: options.max_call_depth(),
        }
    }

    /// Execute the instruction at `offset` in `state`.
    ///
    /// An empty result means no state can leave this instruction. Either the
    /// path was found to be infeasible, or the analyzed method ends here.
    pub fn step(&self, offset: usize, state: &MemoryState) -> Result<Vec<Successor>, Error> {
        let operation = self.control_flow_graph.instruction(offset)?.operation();
        self.execute(offset, operation, state.clone())
            .map_err(|mismatch| Error::StateMismatch { offset, mismatch })
    }

    fn execute(
        &self,
        offset: usize,
        operation: &Operation,
        mut state: MemoryState,
    ) -> Result<Vec<Successor>, StateMismatch> {
        let next = offset + 1;
        let fall_through = |state: MemoryState| -> Result<Vec<Successor>, StateMismatch> {
            Ok(vec![Successor::new(next, state, SuccessorType::FallThrough)])
        };

        match *operation {
            Operation::Push { ref constant } => {
                state.push(StackValue::new(DfType::constant(constant.clone())));
                fall_through(state)
            }
            Operation::PushUnknown => {
                state.push(StackValue::new(DfType::Top));
                fall_through(state)
            }
            Operation::New { ref type_name } => {
                state.push(StackValue::new(DfType::reference(
                    Nullability::NotNull,
                    Some(TypeConstraint::new(type_name.as_str())),
                )));
                fall_through(state)
            }
            Operation::Load { ref slot } => {
                state.push(StackValue::with_origin(state.get(slot), slot.clone()));
                fall_through(state)
            }
            Operation::Store { ref slot } => {
                let value = state.pop()?;
                match value.origin() {
                    Some(origin) if origin == slot => {}
                    Some(origin) => {
                        let origin = origin.clone();
                        state.assign(slot.clone(), value.dftype().clone());
                        state.add_relation(Relation::equal(slot.clone(), origin));
                    }
                    None => state.assign(slot.clone(), value.dftype().clone()),
                }
                fall_through(state)
            }
            Operation::Pop => {
                state.pop()?;
                fall_through(state)
            }
            Operation::Dup => {
                let value = state.peek()?.clone();
                state.push(value);
                fall_through(state)
            }
            Operation::Binary { op } => {
                let rhs = state.pop()?;
                let lhs = state.pop()?;
                let result = DfType::binary(op, lhs.dftype(), rhs.dftype());
                if result.is_bottom() {
                    trace!("{}: {} {} {} has no value", offset, lhs, op, rhs);
                    return Ok(Vec::new());
                }
                if op.is_comparison() {
                    let condition = Condition::new(lhs.operand(), op, rhs.operand());
                    state.push(StackValue::with_condition(result, condition));
                } else {
                    state.push(StackValue::new(result));
                }
                fall_through(state)
            }
            Operation::Unary { op } => {
                let value = state.pop()?;
                let result = DfType::unary(op, value.dftype());
                if result.is_bottom() {
                    return Ok(Vec::new());
                }
                match value.condition().and_then(|condition| match op {
                    UnaryOp::Not => condition.negate(),
                    _ => None,
                }) {
                    Some(condition) => state.push(StackValue::with_condition(result, condition)),
                    None => state.push(StackValue::new(result)),
                }
                fall_through(state)
            }
            Operation::Goto { target } => Ok(vec![Successor::new(target, state, SuccessorType::Jump)]),
            Operation::ConditionalGoto { target, jump_if } => {
                let condition = state.pop()?;
                let destination = |truth: bool| if truth == jump_if { target } else { next };
                let successor = |truth: bool, state: MemoryState| {
                    let type_ = if truth {
                        SuccessorType::ConditionTrue
                    } else {
                        SuccessorType::ConditionFalse
                    };
                    Successor::new(destination(truth), state, type_)
                };
                match *condition.dftype() {
                    DfType::Bottom => Ok(Vec::new()),
                    DfType::Constant(Constant::Bool(truth)) => {
                        Ok(vec![successor(truth, state)])
                    }
                    _ => Ok([true, false]
                        .iter()
                        .filter_map(|&truth| {
                            assume(&state, &condition, truth).map(|state| successor(truth, state))
                        })
                        .collect()),
                }
            }
            Operation::Dereference => {
                let value = state.pop()?;
                if value.dftype().nullability() == Some(Nullability::Null) {
                    trace!("{}: null dereference pruned", offset);
                    return Ok(Vec::new());
                }
                let dftype = match value.dftype().kind() {
                    None | Some(Kind::Reference) => value.dftype().meet(&DfType::not_null()),
                    Some(Kind::Int) | Some(Kind::Bool) => value.dftype().clone(),
                };
                if dftype.is_bottom() {
                    return Ok(Vec::new());
                }
                match value.origin() {
                    Some(origin) => {
                        if narrow_origin(&mut state, origin, &DfType::not_null()).is_none() {
                            return Ok(Vec::new());
                        }
                        state.push(StackValue::with_origin(dftype, origin.clone()));
                    }
                    None => state.push(StackValue::new(dftype)),
                }
                fall_through(state)
            }
            Operation::Flush { ref slot } => {
                state.flush(slot);
                fall_through(state)
            }
            Operation::Invoke {
                arguments,
                returns,
                pure,
            } => {
                state.pop_n(arguments)?;
                if !pure {
                    state.flush_fields();
                }
                if returns {
                    state.push(StackValue::new(DfType::Top));
                }
                fall_through(state)
            }
            Operation::Call {
                entry,
                ref parameters,
                ref captures,
                results,
            } => {
                let arguments = state.pop_n(parameters.len())?;

                if state.call_stack().depth() >= self.max_call_depth {
                    warn!(
                        "{}: call depth {} reached, treating call to {} as opaque",
                        offset,
                        self.max_call_depth,
                        entry
                    );
                    for capture in captures {
                        state.flush(capture);
                    }
                    state.flush_fields();
                    for _ in 0..results {
                        state.push(StackValue::new(DfType::Top));
                    }
                    return fall_through(state);
                }

                // The callee shares the heap with its caller, but sees only
                // its parameters and captures of the caller's locals.
                let mut callee = MemoryState::new();
                for (slot, dftype) in state.slots() {
                    if slot.is_field() || captures.contains(slot) {
                        callee.assign(slot.clone(), dftype.clone());
                    }
                }
                for (parameter, argument) in parameters.iter().zip(arguments) {
                    callee.assign(parameter.clone(), argument.dftype().clone());
                }
                *callee.call_stack_mut() = state.call_stack().clone();
                callee
                    .call_stack_mut()
                    .push(CallFrame::new(next, results, captures.clone(), state));

                Ok(vec![Successor::new(entry, callee, SuccessorType::Call)])
            }
            Operation::Return { values } => {
                let frame = state.call_stack_mut().pop()?;
                if values != frame.results() {
                    return Err(StateMismatch::ReturnValueCount {
                        expected: frame.results(),
                        actual: values,
                    });
                }
                if state.stack().len() != values {
                    return Err(StateMismatch::StackHeight {
                        left: state.stack().len(),
                        right: values,
                    });
                }
                let returned = state.pop_n(values)?;
                let return_offset = frame.return_offset();
                let captures = frame.captures().to_vec();
                let mut caller = frame.into_caller();

                splice(&mut caller, &state, &captures);
                for value in returned {
                    caller.push(StackValue::new(value.dftype().clone()));
                }

                Ok(vec![Successor::new(return_offset, caller, SuccessorType::Return)])
            }
            Operation::Exit => Ok(Vec::new()),
            Operation::Nop => fall_through(state),
            Operation::Unsupported {
                ref name,
                pops,
                pushes,
                ..
            } => {
                debug!("{}: unsupported instruction {}, results are unknown", offset, name);
                let available = state.stack().len();
                state.pop_n(pops.min(available))?;
                match operation.slots_written() {
                    Some(written) => {
                        for slot in written {
                            state.flush(slot);
                        }
                    }
                    None => state.flush_all(),
                }
                for _ in 0..pushes {
                    state.push(StackValue::new(DfType::Top));
                }
                fall_through(state)
            }
        }
    }
}

/// `state`, assuming the popped `condition` evaluated to `truth`.
fn assume(state: &MemoryState, condition: &StackValue, truth: bool) -> Option<MemoryState> {
    if let Some(remembered) = condition.condition() {
        return state.apply_condition(remembered, truth);
    }
    let mut state = state.clone();
    if let Some(origin) = condition.origin() {
        narrow_origin(&mut state, origin, &DfType::bool(truth))?;
    }
    Some(state)
}

/// Narrow the slot a popped value was loaded from. A slot holding a value of
/// another kind is left as it is.
fn narrow_origin(state: &mut MemoryState, origin: &Slot, dftype: &DfType) -> Option<()> {
    match state.get(origin).kind() {
        Some(kind) if Some(kind) != dftype.kind() => Some(()),
        _ => state.narrow(origin, dftype),
    }
}

/// Write the callee's captures, and the heap, back into the caller.
fn splice(caller: &mut MemoryState, callee: &MemoryState, captures: &[Slot]) {
    caller.flush_fields();
    for (slot, dftype) in callee.slots() {
        if slot.is_field() {
            caller.assign(slot.clone(), dftype.clone());
        }
    }
    for capture in captures {
        caller.assign(capture.clone(), callee.get(capture));
    }
}
