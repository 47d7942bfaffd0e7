//! Descendant and ancestor tree construction.
//!
//! ```rust,ignore
//! use calltrace_core::prelude::*;
//!
//! let trace = CallTracer::new(&program)
//!     .ancestor_depth(2)
//!     .descendant_depth(4)
//!     .scope(Scope::Project)
//!     .trace_query("server.Server.Start")?;
//!
//! println!("{} callers", trace.summary.callers.total);
//! ```
//!
//! Both directions keep a visited set per root-to-leaf path, so a function
//! reached along two different paths appears under both, while a function
//! already on the current path becomes a `cycle` leaf. Cycle detection is
//! checked before the depth limit: self-recursion reports a cycle, not a
//! truncation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::{CalltraceError, CalltraceResult};
use crate::lookup::lookup_callable;
use crate::program::{Expr, Position, Program, Symbol};
use crate::resolve::{callee_name, Callee, Unresolved};
use crate::scope::{Scope, ScopeFilter};
use crate::symbol::same_symbol;
use crate::walk::{calls_in, calls_in_package};

use super::invert::invert_callers;
use super::node::{CallNode, DirectionStats, NodeState, TraversalSummary};

/// Default depth for both directions.
pub const DEFAULT_DEPTH: usize = 3;

/// Path-local visited key: declaring package, receiver type and name.
///
/// With `legacy` set the receiver is left out, which makes same-named
/// methods of different types in one package collide. Kept only to
/// reproduce old outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitKey {
    package: Option<String>,
    receiver: Option<String>,
    name: String,
}

impl VisitKey {
    pub fn of(symbol: &Symbol, legacy: bool) -> Self {
        Self {
            package: symbol.package.clone(),
            receiver: if legacy { None } else { symbol.receiver.clone() },
            name: symbol.name.clone(),
        }
    }
}

/// Traversal settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceOptions {
    /// Caller levels above the start symbol; 0 disables the direction.
    pub ancestor_depth: usize,
    /// Callee levels below the start symbol; 0 disables the direction.
    pub descendant_depth: usize,
    pub scope: Scope,
    /// Package-path regular expressions excluded under any scope.
    pub ignore: Vec<String>,
    pub legacy_visit_key: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            ancestor_depth: DEFAULT_DEPTH,
            descendant_depth: DEFAULT_DEPTH,
            scope: Scope::default(),
            ignore: Vec::new(),
            legacy_visit_key: false,
        }
    }
}

/// Result of tracing one start symbol in both directions.
#[derive(Debug, Clone, Serialize)]
pub struct CallTrace {
    /// Qualified name of the start symbol.
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decl: Option<Position>,
    /// Caller forest, top-down: roots are the topmost callers and every
    /// path ends in the start symbol.
    pub callers: Vec<CallNode>,
    /// Callee tree rooted at the start symbol; `None` when disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callees: Option<CallNode>,
    pub summary: TraversalSummary,
}

/// Fluent configuration for building call trees over one program.
#[derive(Debug, Clone)]
pub struct CallTracer<'p> {
    program: &'p Program,
    options: TraceOptions,
    cancel: CancellationToken,
}

impl<'p> CallTracer<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            options: TraceOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace all settings at once.
    pub fn with_options(mut self, options: TraceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ancestor_depth(mut self, depth: usize) -> Self {
        self.options.ancestor_depth = depth;
        self
    }

    pub fn descendant_depth(mut self, depth: usize) -> Self {
        self.options.descendant_depth = depth;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.options.scope = scope;
        self
    }

    /// Package-path patterns to exclude (regular expressions).
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore = patterns;
        self
    }

    /// Use the receiver-less visited key.
    pub fn legacy_visit_key(mut self, enabled: bool) -> Self {
        self.options.legacy_visit_key = enabled;
        self
    }

    /// Abort the ancestor scan once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// Look up `query` and trace it.
    pub fn trace_query(&self, query: &str) -> CalltraceResult<CallTrace> {
        let start = lookup_callable(self.program, query)?;
        self.trace(start)
    }

    /// Build the caller forest and callee tree of `start`.
    pub fn trace(&self, start: &Symbol) -> CalltraceResult<CallTrace> {
        self.validate_start(start)?;
        let filter = self.scope_filter(start)?;
        let mut summary = TraversalSummary::default();

        let callees = if self.options.descendant_depth > 0 {
            let (tree, stats) = self.walk_descendants(start, &filter);
            summary.callees = stats;
            Some(tree)
        } else {
            None
        };

        let callers = if self.options.ancestor_depth > 0 {
            let (tree, stats) = self.walk_ancestors(start, &filter)?;
            summary.callers = stats;
            invert_callers(&tree, &tree.children)
        } else {
            Vec::new()
        };

        info!(
            target_symbol = %start,
            scope = %self.options.scope,
            callers = summary.callers.total,
            callees = summary.callees.total,
            unresolved = summary.callees.unresolved,
            "trace complete"
        );

        Ok(CallTrace {
            target: start.qualified_name(),
            decl: start.pos.clone(),
            callers,
            callees,
            summary,
        })
    }

    /// Callee tree of `start`, root included. A descendant depth of 0
    /// returns the bare root with disabled stats.
    pub fn descendants(&self, start: &Symbol) -> CalltraceResult<(CallNode, DirectionStats)> {
        self.validate_start(start)?;
        let filter = self.scope_filter(start)?;
        Ok(self.walk_descendants(start, &filter))
    }

    /// Caller tree of `start`, bottom-up: the root is `start` and each
    /// child is one call site in a caller. An ancestor depth of 0 returns
    /// the bare root with disabled stats.
    pub fn ancestors(&self, start: &Symbol) -> CalltraceResult<(CallNode, DirectionStats)> {
        self.validate_start(start)?;
        let filter = self.scope_filter(start)?;
        self.walk_ancestors(start, &filter)
    }

    fn validate_start(&self, start: &Symbol) -> CalltraceResult<()> {
        if !start.kind.is_callable() {
            return Err(CalltraceError::NotCallable {
                name: start.qualified_name(),
                kind: start.kind.to_string(),
            });
        }
        if start.interface {
            return Err(CalltraceError::NoBody {
                name: start.qualified_name(),
            });
        }
        let decl = self
            .program
            .func_decl(start)
            .ok_or_else(|| CalltraceError::not_found(start.qualified_name()))?;
        if decl.body.is_none() {
            return Err(CalltraceError::NoBody {
                name: start.qualified_name(),
            });
        }
        Ok(())
    }

    fn scope_filter(&self, start: &Symbol) -> CalltraceResult<ScopeFilter> {
        let start_package = start.package.as_deref().unwrap_or_default();
        ScopeFilter::new(self.program, self.options.scope, start_package)
            .with_ignore_patterns(&self.options.ignore)
    }

    fn walker<'a>(&'a self, filter: &'a ScopeFilter, limit: usize) -> Walker<'a, 'p> {
        Walker {
            program: self.program,
            filter,
            cancel: &self.cancel,
            legacy: self.options.legacy_visit_key,
            limit,
            on_path: HashSet::new(),
            stats: DirectionStats::enabled(limit),
        }
    }

    fn walk_descendants(&self, start: &Symbol, filter: &ScopeFilter) -> (CallNode, DirectionStats) {
        if self.options.descendant_depth == 0 {
            return (CallNode::root(start), DirectionStats::default());
        }
        let mut walker = self.walker(filter, self.options.descendant_depth);
        let mut root = CallNode::root(start);
        let key = walker.key(start);
        walker.on_path.insert(key);
        root.children = walker.callees(start, 0);
        debug!(target_symbol = %start, nodes = walker.stats.total, "callee tree built");
        (root, walker.stats)
    }

    fn walk_ancestors(
        &self,
        start: &Symbol,
        filter: &ScopeFilter,
    ) -> CalltraceResult<(CallNode, DirectionStats)> {
        if self.options.ancestor_depth == 0 {
            return Ok((CallNode::root(start), DirectionStats::default()));
        }
        let mut walker = self.walker(filter, self.options.ancestor_depth);
        let mut root = CallNode::root(start);
        let key = walker.key(start);
        walker.on_path.insert(key);
        root.children = walker.callers(start, 0)?;
        debug!(target_symbol = %start, nodes = walker.stats.total, "caller tree built");
        Ok((root, walker.stats))
    }
}

/// State of one directional walk.
struct Walker<'a, 'p> {
    program: &'p Program,
    filter: &'a ScopeFilter,
    cancel: &'a CancellationToken,
    legacy: bool,
    limit: usize,
    on_path: HashSet<VisitKey>,
    stats: DirectionStats,
}

impl<'a, 'p> Walker<'a, 'p> {
    fn key(&self, symbol: &Symbol) -> VisitKey {
        VisitKey::of(symbol, self.legacy)
    }

    fn in_scope(&self, symbol: &Symbol) -> bool {
        symbol
            .package
            .as_deref()
            .map_or(true, |path| self.filter.admits_path(self.program, path))
    }

    /// Whether expanding `symbol` would yield at least one child.
    fn has_visible_calls(&self, symbol: &Symbol) -> bool {
        calls_in(self.program, symbol).any(|call| match call.callee {
            Callee::Static(callee) | Callee::Interface(callee) => self.in_scope(callee),
            Callee::Unresolved(..) => true,
        })
    }

    /// Children of `caller` at `depth` (the caller's own depth).
    fn callees(&mut self, caller: &Symbol, depth: usize) -> Vec<CallNode> {
        let program = self.program;
        let child_depth = depth + 1;
        let mut children = Vec::new();

        for call in calls_in(program, caller) {
            let node = match call.callee {
                Callee::Static(callee) | Callee::Interface(callee) if !self.in_scope(callee) => {
                    self.stats.excluded_by_scope += 1;
                    continue;
                }
                Callee::Static(callee) => self.callee_node(callee, call.site, child_depth),
                Callee::Interface(method) => {
                    self.stats.interface_calls += 1;
                    CallNode::reached(method, call.site, NodeState::Interface)
                }
                Callee::Unresolved(fun, _) => {
                    self.stats.unresolved += 1;
                    let reason = call.callee.unresolved_reason().unwrap_or(Unresolved::Expression);
                    unresolved_node(fun, call.site, reason)
                }
            };
            self.stats.record(child_depth);
            children.push(node);
        }
        children
    }

    fn callee_node(&mut self, callee: &Symbol, site: &Position, depth: usize) -> CallNode {
        let key = self.key(callee);
        if self.on_path.contains(&key) {
            self.stats.cycles += 1;
            return CallNode::reached(callee, site, NodeState::Cycle);
        }
        if self.program.body_of(callee).is_none() {
            return CallNode::reached(callee, site, NodeState::NoBody);
        }
        if depth >= self.limit {
            // Nothing in scope below this node: nothing left to cut.
            if !self.has_visible_calls(callee) {
                return CallNode::reached(callee, site, NodeState::Expanded);
            }
            self.stats.truncated = true;
            return CallNode::reached(callee, site, NodeState::DepthLimit);
        }

        self.on_path.insert(key.clone());
        let mut node = CallNode::reached(callee, site, NodeState::Expanded);
        node.children = self.callees(callee, depth);
        self.on_path.remove(&key);
        node
    }

    /// Call sites of `target` in admitted packages, one child per site.
    fn callers(&mut self, target: &Symbol, depth: usize) -> CalltraceResult<Vec<CallNode>> {
        let program = self.program;
        let child_depth = depth + 1;
        let mut children = Vec::new();

        for package in program.packages() {
            if self.cancel.is_cancelled() {
                return Err(CalltraceError::Cancelled {
                    package: package.path.clone(),
                });
            }
            if !self.filter.admits(package) {
                continue;
            }
            for call in calls_in_package(package) {
                let Some(callee) = call.callee.symbol() else {
                    continue;
                };
                if !same_symbol(callee, target) {
                    continue;
                }
                let node = self.caller_node(call.caller, call.site, child_depth)?;
                self.stats.record(child_depth);
                children.push(node);
            }
        }

        debug!(target_symbol = %target, depth, sites = children.len(), "callers scanned");
        Ok(children)
    }

    fn caller_node(
        &mut self,
        caller: &Symbol,
        site: &Position,
        depth: usize,
    ) -> CalltraceResult<CallNode> {
        let key = self.key(caller);
        if self.on_path.contains(&key) {
            self.stats.cycles += 1;
            return Ok(CallNode::reached(caller, site, NodeState::Cycle));
        }
        // Package-level initializers run at load time; nothing calls them.
        if !caller.kind.is_callable() {
            return Ok(CallNode::reached(caller, site, NodeState::Expanded));
        }
        if depth >= self.limit {
            self.stats.truncated = true;
            return Ok(CallNode::reached(caller, site, NodeState::DepthLimit));
        }

        self.on_path.insert(key.clone());
        let mut node = CallNode::reached(caller, site, NodeState::Expanded);
        node.children = self.callers(caller, depth)?;
        self.on_path.remove(&key);
        Ok(node)
    }
}

fn unresolved_node(fun: &Expr, site: &Position, reason: Unresolved) -> CallNode {
    CallNode {
        name: callee_name(fun).unwrap_or_else(|| "<dynamic>".to_string()),
        decl: None,
        site: Some(site.clone()),
        state: NodeState::Unresolved { reason },
        children: Vec::new(),
    }
}
