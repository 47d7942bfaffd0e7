//! Call tree nodes and traversal summaries.

use serde::Serialize;

use crate::program::{Position, Symbol};
use crate::resolve::Unresolved;

/// Why a node has the children it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeState {
    /// Fully expanded; no children means there is nothing further.
    Expanded,
    /// Not expanded because the node sits at the requested depth limit.
    DepthLimit,
    /// Already on the current root-to-leaf path; expansion would loop.
    Cycle,
    /// Declaration without a body (external, assembly).
    NoBody,
    /// Interface method; the concrete implementation is not determined.
    Interface,
    /// Call whose target cannot be resolved statically.
    Unresolved { reason: Unresolved },
}

impl NodeState {
    /// Short marker for text rendering.
    pub fn marker(&self) -> Option<String> {
        match self {
            Self::Expanded => None,
            Self::DepthLimit => Some("depth limit".to_string()),
            Self::Cycle => Some("cycle".to_string()),
            Self::NoBody => Some("no body".to_string()),
            Self::Interface => Some("interface dispatch".to_string()),
            Self::Unresolved { reason } => Some(format!("unresolved: {}", reason)),
        }
    }
}

/// One node of a presented call tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallNode {
    /// Qualified display name of the symbol (or callee text for
    /// unresolved calls).
    pub name: String,
    /// Declaration position of the symbol, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decl: Option<Position>,
    /// Call-site position; `None` for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Position>,
    #[serde(flatten)]
    pub state: NodeState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CallNode>,
}

impl CallNode {
    /// Root node for a start symbol.
    pub fn root(symbol: &Symbol) -> Self {
        Self {
            name: symbol.qualified_name(),
            decl: symbol.pos.clone(),
            site: None,
            state: NodeState::Expanded,
            children: Vec::new(),
        }
    }

    /// Node for `symbol` reached through the call at `site`.
    pub fn reached(symbol: &Symbol, site: &Position, state: NodeState) -> Self {
        Self {
            name: symbol.qualified_name(),
            decl: symbol.pos.clone(),
            site: Some(site.clone()),
            state,
            children: Vec::new(),
        }
    }

    /// Depth of the deepest node below this one (0 for a leaf).
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.height())
            .max()
            .unwrap_or(0)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First child with the given display name.
    pub fn child(&self, name: &str) -> Option<&CallNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every root-to-leaf path as a list of display names.
    pub fn paths(&self) -> Vec<Vec<String>> {
        if self.children.is_empty() {
            return vec![vec![self.name.clone()]];
        }
        self.children
            .iter()
            .flat_map(|c| c.paths())
            .map(|mut tail| {
                tail.insert(0, self.name.clone());
                tail
            })
            .collect()
    }

    /// Same declaration: display name and declaration position agree.
    pub fn same_decl(&self, other: &CallNode) -> bool {
        self.name == other.name && self.decl == other.decl
    }
}

/// Per-direction traversal statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectionStats {
    /// False when the direction was disabled (depth 0).
    pub enabled: bool,
    pub requested_depth: usize,
    /// Nodes found, excluding the root. Unresolved and interface leaves
    /// are included.
    pub total: usize,
    /// Deepest node depth actually reached.
    pub max_depth: usize,
    /// At least one node was cut by the depth limit; more data may exist.
    /// Descendants only flag a cut when the node at the limit has in-scope
    /// calls. Ancestors flag every caller at the limit.
    pub truncated: bool,
    /// Nodes cut because they were already on the current path.
    pub cycles: usize,
    pub unresolved: usize,
    pub interface_calls: usize,
    /// Call sites dropped by the scope filter. Descendants only: the
    /// ancestor scan never reads out-of-scope packages.
    pub excluded_by_scope: usize,
}

impl DirectionStats {
    pub(crate) fn enabled(depth: usize) -> Self {
        Self {
            enabled: true,
            requested_depth: depth,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, depth: usize) {
        self.total += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Whether the traversal stopped only on cycles (never on depth).
    pub fn cycle_bounded(&self) -> bool {
        self.cycles > 0 && !self.truncated
    }
}

/// Summary over both directions of one trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalSummary {
    pub callers: DirectionStats,
    pub callees: DirectionStats,
}
