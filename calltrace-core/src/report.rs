//! Output formatting - indented trees and JSON.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write as _;

use crate::program::Program;
use crate::refs::Reference;
use crate::tree::{CallNode, CallTrace, DirectionStats};

/// Render a trace as indented text: callers top-down, then callees, then
/// the summary.
pub fn render_trace(trace: &CallTrace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "TARGET {}", trace.target);

    if trace.summary.callers.enabled {
        let _ = writeln!(out, "\nCALLERS ({}):", trace.summary.callers.total);
        if trace.callers.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for root in &trace.callers {
            render_node(&mut out, root, 1);
        }
    }

    if let Some(callees) = &trace.callees {
        let _ = writeln!(out, "\nCALLEES ({}):", trace.summary.callees.total);
        render_node(&mut out, callees, 1);
    }

    let _ = writeln!(out);
    render_stats(&mut out, "callers", &trace.summary.callers);
    render_stats(&mut out, "callees", &trace.summary.callees);
    out
}

fn render_node(out: &mut String, node: &CallNode, indent: usize) {
    let _ = write!(out, "{}{}", "  ".repeat(indent), node.name);
    if let Some(site) = &node.site {
        let _ = write!(out, " @ {}", site);
    }
    if let Some(marker) = node.state.marker() {
        let _ = write!(out, " [{}]", marker);
    }
    out.push('\n');
    for child in &node.children {
        render_node(out, child, indent + 1);
    }
}

fn render_stats(out: &mut String, label: &str, stats: &DirectionStats) {
    if !stats.enabled {
        let _ = writeln!(out, "{}: disabled", label);
        return;
    }
    let _ = writeln!(
        out,
        "{}: {} found, depth {}/{}{}, {} cycle(s), {} unresolved, {} interface, {} out of scope",
        label,
        stats.total,
        stats.max_depth,
        stats.requested_depth,
        if stats.truncated { " (truncated)" } else { "" },
        stats.cycles,
        stats.unresolved,
        stats.interface_calls,
        stats.excluded_by_scope,
    );
}

/// Render references one per line: `file:line:col kind context`.
pub fn render_references(target: &str, refs: &[Reference]) -> String {
    let mut out = String::new();
    if refs.is_empty() {
        let _ = writeln!(out, "No references to {}.", target);
        return out;
    }
    let _ = writeln!(out, "REFERENCES TO {} ({}):", target, refs.len());
    for r in refs {
        let _ = writeln!(
            out,
            "- {}:{}:{} {} in {}",
            r.file, r.line, r.column, r.kind, r.context
        );
    }
    out
}

/// Wrap any serializable result with report metadata.
pub fn to_json<T: Serialize>(program: &Program, kind: &str, body: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({
        "kind": kind,
        "generated_at": Utc::now().to_rfc3339(),
        "snapshot": program.fingerprint(),
        "result": body,
    }))
}

/// Prints a result in JSON format.
///
/// Falls back to a minimal error document if serialization fails.
pub fn print_json<T: Serialize>(program: &Program, kind: &str, body: &T) {
    match to_json(program, kind, body) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("[WARN] JSON serialization failed: {}", e);
            println!("{{\"kind\": {:?}, \"error\": {:?}}}", kind, e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Position, ProgramBuilder};
    use crate::refs::ReferenceKind;
    use crate::tree::{NodeState, TraversalSummary};

    fn leaf(name: &str, line: u32, state: NodeState) -> CallNode {
        CallNode {
            name: name.to_string(),
            decl: None,
            site: Some(Position::new("a.go", line, 2)),
            state,
            children: Vec::new(),
        }
    }

    fn trace() -> CallTrace {
        let mut callees = CallNode {
            name: "app.Run".into(),
            decl: Some(Position::new("a.go", 1, 6)),
            site: None,
            state: NodeState::Expanded,
            children: Vec::new(),
        };
        callees.children.push(leaf("app.Run", 2, NodeState::Cycle));
        callees.children.push(leaf("app.Load", 3, NodeState::DepthLimit));

        let mut summary = TraversalSummary::default();
        summary.callees = DirectionStats::enabled(1);
        summary.callees.total = 2;
        summary.callees.cycles = 1;
        summary.callees.truncated = true;

        CallTrace {
            target: "app.Run".into(),
            decl: Some(Position::new("a.go", 1, 6)),
            callers: Vec::new(),
            callees: Some(callees),
            summary,
        }
    }

    #[test]
    fn test_render_trace_markers() {
        let text = render_trace(&trace());
        assert!(text.contains("TARGET app.Run"));
        assert!(text.contains("    app.Run @ a.go:2:2 [cycle]"));
        assert!(text.contains("app.Load @ a.go:3:2 [depth limit]"));
        assert!(text.contains("callers: disabled"));
        assert!(text.contains("callees: 2 found, depth 0/1 (truncated), 1 cycle(s)"));
    }

    #[test]
    fn test_render_references() {
        let refs = vec![Reference {
            context: "app.main".into(),
            file: "a.go".into(),
            line: 4,
            column: 9,
            kind: ReferenceKind::NonCall,
        }];
        let text = render_references("app.handler", &refs);
        assert!(text.contains("- a.go:4:9 non-call in app.main"));
        assert!(render_references("app.x", &[]).contains("No references"));
    }

    #[test]
    fn test_json_envelope() {
        let program = ProgramBuilder::new().build().unwrap();
        let json = to_json(&program, "trace", &trace()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "trace");
        assert!(value["generated_at"].is_string());
        assert_eq!(value["result"]["target"], "app.Run");
        assert_eq!(value["result"]["summary"]["callees"]["cycles"], 1);
        assert_eq!(value["result"]["callees"]["children"][0]["state"], "cycle");
    }
}
