//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use calltrace_core::prelude::*;
//! ```
//!
//! Brings in what a typical trace needs without the model's full surface.

// Errors
pub use crate::error::{CalltraceError, CalltraceResult};

// Loading
pub use crate::program::{load_snapshot, load_snapshot_with, LoadOptions, Program, Symbol};

// Tracing
pub use crate::cancel::CancellationToken;
pub use crate::lookup::lookup_callable;
pub use crate::scope::Scope;
pub use crate::tree::{CallNode, CallTrace, CallTracer, NodeState, TraceOptions};

// References
pub use crate::refs::{find_non_call_references, find_references, Reference, ReferenceKind};

// Configuration
pub use crate::config::{load_config, CalltraceConfig};

// Reporting
pub use crate::report::render_trace;
