//! Abstract interpretation over the dfa IL.
//!
//! `analyze` is the entry point. It drives the `Interpreter` over a
//! `ControlFlowGraph` with `fixed_point_forward` until the `MemoryState` at
//! every reachable offset is stable.

pub mod call_stack;
mod dataflow;
pub mod dftype;
pub mod fixed_point;
pub mod interpreter;
mod options;
pub mod range;
pub mod state;

pub use self::call_stack::{CallFrame, CallStack};
pub use self::dataflow::{analyze, Analysis, ConditionOutcome, ProgramPoint};
pub use self::dftype::{DfType, Nullability, TypeConstraint};
pub use self::fixed_point::{AbortReason, CancellationToken, Status};
pub use self::interpreter::{Interpreter, Successor, SuccessorType};
pub use self::options::{Options, OptionsBuilder};
pub use self::range::LongRangeSet;
pub use self::state::{Condition, MemoryState, Operand, Relation, StackValue};
