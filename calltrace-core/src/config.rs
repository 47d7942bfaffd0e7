//! Configuration loading from calltrace.toml.
//!
//! ```toml
//! [trace]
//! ancestor_depth = 2
//! descendant_depth = 4
//! scope = "project"
//! ignore = ["/internal/gen$", "_test$"]
//!
//! [snapshot]
//! main_module = "example.com/app"
//!
//! [output]
//! format = "json"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::scope::Scope;
use crate::tree::TraceOptions;

/// File name looked up next to the snapshot.
pub const CONFIG_FILE: &str = "calltrace.toml";

/// Main configuration structure for calltrace.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CalltraceConfig {
    /// Traversal defaults.
    pub trace: Option<TraceConfig>,
    /// Snapshot interpretation.
    pub snapshot: Option<SnapshotConfig>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
}

/// `[trace]` table.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    pub ancestor_depth: Option<usize>,
    pub descendant_depth: Option<usize>,
    pub scope: Option<Scope>,
    /// Package-path regular expressions to exclude.
    pub ignore: Option<Vec<String>>,
    pub legacy_visit_key: Option<bool>,
}

/// `[snapshot]` table.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Overrides the snapshot's own main module for the `project` scope.
    pub main_module: Option<String>,
}

/// Output format configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output format: "tree" or "json".
    pub format: Option<String>,
}

impl CalltraceConfig {
    /// Traversal options with file values applied over the defaults.
    pub fn trace_options(&self) -> TraceOptions {
        let mut opts = TraceOptions::default();
        if let Some(t) = &self.trace {
            if let Some(d) = t.ancestor_depth {
                opts.ancestor_depth = d;
            }
            if let Some(d) = t.descendant_depth {
                opts.descendant_depth = d;
            }
            if let Some(s) = t.scope {
                opts.scope = s;
            }
            if let Some(ignore) = &t.ignore {
                opts.ignore = ignore.clone();
            }
            if let Some(legacy) = t.legacy_visit_key {
                opts.legacy_visit_key = legacy;
            }
        }
        opts
    }

    pub fn main_module(&self) -> Option<&str> {
        self.snapshot.as_ref()?.main_module.as_deref()
    }

    /// True when the configured output format is JSON.
    pub fn wants_json(&self) -> bool {
        self.output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

/// Loads configuration from calltrace.toml in `dir` if it exists.
pub fn load_config(dir: &Path) -> Result<Option<CalltraceConfig>> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content).context("Invalid calltrace.toml")?;
    Ok(Some(cfg))
}

/// Directory to search for calltrace.toml given a snapshot path: the
/// directory itself for split snapshots, else the file's parent.
pub fn config_dir(snapshot: &Path) -> &Path {
    if snapshot.is_dir() {
        snapshot
    } else {
        snapshot.parent().unwrap_or_else(|| Path::new("."))
    }
}
