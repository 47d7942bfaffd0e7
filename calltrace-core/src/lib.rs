//! calltrace-core: exact caller/callee trees over typed program snapshots
//!
//! This library answers "who calls this function, and what does it call?"
//! for programs whose identifiers are already bound to declarations by a
//! type checker. The loaded program is immutable; every operation takes it
//! by reference.
//!
//! # Features
//!
//! - **Symbol identity**: location-based equality across per-package handles
//! - **Reference classification**: call vs. escaping (non-call) references
//! - **Call resolution**: direct, method and qualified calls; explicit
//!   unresolved reasons for everything else
//! - **Call walking**: plain iterators over the calls of a body or scope
//! - **Call trees**: depth-limited, cycle-safe descendants and ancestors
//! - **Inversion**: bottom-up caller trees turned into top-down forests
//! - **Scope filtering**: all packages, the main module, or one package
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use calltrace_core::prelude::*;
//!
//! let program = load_snapshot(Path::new("snapshot.json"))?;
//! let trace = CallTracer::new(&program)
//!     .ancestor_depth(2)
//!     .descendant_depth(3)
//!     .trace_query("server.Server.Start")?;
//!
//! print!("{}", render_trace(&trace));
//! ```
//!
//! # Module Organization
//!
//! - [`program`]: snapshot model, loader, builders and the [`Visit`] trait
//! - [`symbol`]: symbol identity
//! - [`resolve`]: callee resolution for one call expression
//! - [`walk`]: call iterators
//! - [`refs`]: reference classification
//! - [`scope`]: scope filter
//! - [`tree`]: tree builder and inverter
//! - [`lookup`]: start-symbol lookup
//! - [`cancel`]: cooperative cancellation
//! - [`error`]: typed error handling
//!
//! # Cargo Features
//!
//! - `snapshot-dir` (default): load snapshots split into one file per package

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod prelude;
pub mod program;
pub mod refs;
pub mod report;
pub mod resolve;
pub mod scope;
pub mod symbol;
pub mod tree;
pub mod walk;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{CalltraceError, CalltraceResult, IoResultExt};

// Configuration
pub use config::{load_config, CalltraceConfig, OutputConfig, SnapshotConfig, TraceConfig};

// Logging
pub use logging::{init_structured_logging, log_error, log_event, log_info, log_warn};

// Program model and loading
pub use program::{
    body_units, load_snapshot, load_snapshot_with, BodyUnit, Decl, Expr, FuncDecl, Ident,
    LoadOptions, Package, PackageBuilder, Position, Program, ProgramBuilder, Selection,
    SelectionKind, Snapshot, SourceFile, Symbol, SymbolKind, TypeDecl, ValueDecl, Visit,
};

// Identity, resolution and walking
pub use resolve::{callee_name, resolve_call, Callee, Resolution, Unresolved, UnresolvedKind};
pub use symbol::{same_symbol, SymbolKey};
pub use walk::{calls_across, calls_in, calls_in_package, Call, CallsIn};

// References and scope
pub use refs::{classify_body, find_non_call_references, find_references, Reference, ReferenceKind};
pub use scope::{Scope, ScopeFilter};

// Trees
pub use cancel::CancellationToken;
pub use lookup::lookup_callable;
pub use tree::{
    invert_callers, CallNode, CallTrace, CallTracer, DirectionStats, NodeState, TraceOptions,
    TraversalSummary, VisitKey, DEFAULT_DEPTH,
};

// Reporting
pub use report::{print_json, render_references, render_trace, to_json};
