//! Dfa: an abstract interpretation dataflow engine.
//!
//! Dfa symbolically executes the control-flow graph of a single method over a
//! lattice of value abstractions, and proves facts about the method's
//! behavior: nullability, integer ranges, unreachable code, and conditions
//! which are always true or always false.
//!
//! The crate is organized bottom-up:
//!
//! * `il` holds the immutable, already-resolved instruction sequence the
//! engine consumes.
//! * `analysis::range` is a disjoint-interval algebra over `i64`.
//! * `analysis::dftype` is the value lattice.
//! * `analysis::state` and `analysis::call_stack` model the abstract memory
//! at a program point.
//! * `analysis::interpreter` is the per-instruction transfer function.
//! * `analysis::fixed_point` and `analysis::dataflow` drive the analysis to a
//! fixed point.
//!
//! ```
//! use dfa::analysis::{analyze, DfType, Options};
//! use dfa::il;
//!
//! // x = 1; y = x + 2;
//! let mut cfg = il::ControlFlowGraph::new();
//! cfg.push(il::Constant::Int(1));
//! cfg.store(il::local("x"));
//! cfg.load(il::local("x"));
//! cfg.push(il::Constant::Int(2));
//! cfg.binary(il::BinaryOp::Add);
//! cfg.store(il::local("y"));
//! cfg.exit();
//!
//! let analysis = analyze(&cfg, &Default::default(), &Options::default(), None).unwrap();
//! let state = analysis.state(6).unwrap();
//! assert_eq!(state.get(&il::local("y")), DfType::int(3));
//! ```

#[macro_use]
extern crate log;

pub mod analysis;
mod error;
pub mod il;
#[cfg(test)]
mod tests;

pub use error::*;

#[cfg(not(feature = "thread_safe"))]
use std::rc::Rc;
#[cfg(not(feature = "thread_safe"))]
pub type RC<T> = Rc<T>;

#[cfg(feature = "thread_safe")]
use std::sync::Arc;
#[cfg(feature = "thread_safe")]
pub type RC<T> = Arc<T>;
