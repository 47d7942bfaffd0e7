//! Call tree construction and presentation.
//!
//! - [`node`]: tree nodes, node states and per-direction statistics
//! - [`builder`]: the [`CallTracer`] fluent API (descendants and ancestors)
//! - [`invert`]: bottom-up caller trees turned into top-down forests

pub mod builder;
pub mod invert;
pub mod node;

pub use builder::{CallTrace, CallTracer, TraceOptions, VisitKey, DEFAULT_DEPTH};
pub use invert::invert_callers;
pub use node::{CallNode, DirectionStats, NodeState, TraversalSummary};
