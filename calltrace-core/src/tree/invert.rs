//! Caller tree inversion.
//!
//! The ancestor walk produces a bottom-up tree: the target at the root and
//! callers below it. For presentation the caller forest is turned top-down,
//! so each root is a topmost caller and every path ends in the target.
//! A root-to-leaf path of the result, reversed, is a path of the input.
//!
//! Inversion builds fresh nodes; the input tree is never modified.

use super::node::{CallNode, NodeState};

/// Invert the callers of `target` (its children in the bottom-up tree).
///
/// Every caller without further callers becomes a root carrying a path
/// down to a new `target` leaf. Callers with callers of their own are
/// inverted recursively and the `target` leaf is attached under every
/// leaf of the result. Roots for the same declaration in the same state
/// are merged.
pub fn invert_callers(target: &CallNode, callers: &[CallNode]) -> Vec<CallNode> {
    let mut roots: Vec<CallNode> = Vec::new();

    for caller in callers {
        // The call site of `target` lives in `caller`.
        let leaf = CallNode {
            name: target.name.clone(),
            decl: target.decl.clone(),
            site: caller.site.clone(),
            state: NodeState::Expanded,
            children: Vec::new(),
        };

        if caller.children.is_empty() {
            let top = CallNode {
                name: caller.name.clone(),
                decl: caller.decl.clone(),
                site: None,
                state: caller.state.clone(),
                children: vec![leaf],
            };
            merge_root(&mut roots, top);
        } else {
            for top in invert_callers(caller, &caller.children) {
                merge_root(&mut roots, graft(top, &leaf));
            }
        }
    }

    roots
}

/// Attach a copy of `leaf` under every leaf of `node`.
fn graft(mut node: CallNode, leaf: &CallNode) -> CallNode {
    if node.children.is_empty() {
        node.children.push(leaf.clone());
    } else {
        node.children = node
            .children
            .into_iter()
            .map(|child| graft(child, leaf))
            .collect();
    }
    node
}

fn merge_root(roots: &mut Vec<CallNode>, top: CallNode) {
    match roots
        .iter_mut()
        .find(|r| r.same_decl(&top) && r.state == top.state)
    {
        Some(existing) => existing.children.extend(top.children),
        None => roots.push(top),
    }
}
