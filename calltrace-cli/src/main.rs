//! calltrace CLI - caller/callee trees for one function of a typed program
//! snapshot.
//!
//! Features:
//! - Top-down caller forests and callee trees with explicit depth, cycle,
//!   interface and unresolved markers
//! - Call vs. escaping (non-call) reference listing
//! - Scope control: all packages, the main module, or one package
//! - calltrace.toml defaults next to the snapshot, overridden by flags
//! - Plain text or JSON output

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use calltrace_core::config::config_dir;
use calltrace_core::{
    find_non_call_references, find_references, init_structured_logging, load_config,
    load_snapshot_with, log_error, log_event, log_info, log_warn, lookup_callable, print_json,
    render_references, render_trace, to_json, CallTracer, CalltraceConfig, CalltraceError,
    LoadOptions, Program, Scope, ScopeFilter, TraceOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Exact caller/callee trees over typed program snapshots")]
pub struct Cli {
    /// Snapshot file (JSON) or directory of per-package JSON files
    snapshot: String,

    /// Function or method to trace, e.g. `server.Server.Start`
    symbol: String,

    /// Caller levels to show above the symbol (0 disables)
    #[arg(long, value_name = "N")]
    up: Option<usize>,

    /// Callee levels to show below the symbol (0 disables)
    #[arg(long, value_name = "N")]
    down: Option<usize>,

    /// Packages taking part: all, project or package
    #[arg(long)]
    scope: Option<Scope>,

    /// Package-path regular expressions to exclude
    #[arg(long, num_args = 1..)]
    ignore: Vec<String>,

    /// Use the receiver-less visited key of older releases
    #[arg(long)]
    legacy_visit_key: bool,

    /// List every reference to the symbol instead of building trees
    #[arg(long, conflicts_with = "escaping")]
    refs: bool,

    /// List only the escaping (non-call) references to the symbol
    #[arg(long)]
    escaping: bool,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Write output to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<String>,

    /// Module treated as the project for `--scope project`
    #[arg(long, value_name = "MODULE")]
    main_module: Option<String>,
}

impl Cli {
    /// Config file values with flags applied on top.
    fn trace_options(&self, config: &CalltraceConfig) -> TraceOptions {
        let mut opts = config.trace_options();
        if let Some(up) = self.up {
            opts.ancestor_depth = up;
        }
        if let Some(down) = self.down {
            opts.descendant_depth = down;
        }
        if let Some(scope) = self.scope {
            opts.scope = scope;
        }
        opts.ignore.extend(self.ignore.iter().cloned());
        opts.legacy_visit_key |= self.legacy_visit_key;
        opts
    }
}

/// Validates that an output path is safe to write to.
///
/// Rejects:
/// - Absolute paths (must be relative to current directory)
/// - Paths containing `..` (parent directory traversal)
/// - Paths with null bytes
fn validate_output_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(anyhow!("Output path contains null bytes"));
    }

    let p = PathBuf::from(path);

    if p.is_absolute() {
        return Err(anyhow!(
            "Output path must be relative, not absolute: {}",
            path
        ));
    }

    for component in p.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(anyhow!(
                "Path traversal (..) not allowed in output paths: {}",
                path
            ));
        }
    }

    let normalized = path.replace('\\', "/");
    if normalized.contains("/../") || normalized.starts_with("../") {
        return Err(anyhow!("Path traversal attempt detected: {}", path));
    }

    Ok(p)
}

fn write_output(path: &str, content: &str) -> Result<()> {
    let safe_path =
        validate_output_path(path).with_context(|| format!("Invalid output path: {}", path))?;
    fs::write(&safe_path, content)
        .with_context(|| format!("Failed to write {}", safe_path.display()))?;
    log_info(&format!("output written to {}", safe_path.display()));
    eprintln!("Output written to: {}", safe_path.display());
    Ok(())
}

fn emit_text(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, content),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn emit_json(
    program: &Program,
    kind: &str,
    body: serde_json::Value,
    output: Option<&str>,
) -> Result<()> {
    match output {
        Some(path) => write_output(path, &(to_json(program, kind, &body)? + "\n")),
        None => {
            print_json(program, kind, &body);
            Ok(())
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let snapshot_path = Path::new(&cli.snapshot);

    let config = load_config(config_dir(snapshot_path))?.unwrap_or_default();
    let load_options = LoadOptions {
        main_module: cli
            .main_module
            .clone()
            .or_else(|| config.main_module().map(str::to_string)),
    };
    let program = load_snapshot_with(snapshot_path, &load_options)
        .with_context(|| format!("Failed to load snapshot: {}", cli.snapshot))?;

    let options = cli.trace_options(&config);
    let json = cli.json || config.wants_json();
    let output = cli.output.as_deref();
    let start = lookup_callable(&program, &cli.symbol)?;

    if cli.refs || cli.escaping {
        let start_package = start.package.as_deref().unwrap_or_default();
        let scope = ScopeFilter::new(&program, options.scope, start_package)
            .with_ignore_patterns(&options.ignore)?;
        let refs = if cli.escaping {
            find_non_call_references(&program, start, &scope)
        } else {
            find_references(&program, start, &scope)
        };
        if json {
            return emit_json(&program, "references", serde_json::to_value(&refs)?, output);
        }
        return emit_text(output, &render_references(&start.qualified_name(), &refs));
    }

    let trace = CallTracer::new(&program).with_options(options).trace(start)?;
    for (direction, stats) in [("callers", &trace.summary.callers), ("callees", &trace.summary.callees)] {
        if stats.truncated {
            log_event(
                "TRUNCATED",
                &format!("{} of {} cut at depth {}", direction, trace.target, stats.requested_depth),
            );
        }
    }
    if trace.summary.callees.unresolved > 0 {
        log_warn(&format!(
            "{} call(s) below {} could not be resolved statically",
            trace.summary.callees.unresolved, trace.target
        ));
    }

    if json {
        return emit_json(&program, "trace", serde_json::to_value(&trace)?, output);
    }
    emit_text(output, &render_trace(&trace))
}

/// Query mistakes (unknown or ambiguous symbol, wrong kind) are warnings;
/// anything else is an error.
fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CalltraceError>()
        .is_some_and(CalltraceError::is_recoverable)
}

fn main() -> ExitCode {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] calltrace internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 2.");
        std::process::exit(2);
    }));

    // JSON to stderr, respects RUST_LOG
    init_structured_logging();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if is_recoverable(&err) {
                log_warn(&format!("{:#}", err));
            } else {
                log_error(&format!("{:#}", err));
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("calltrace").chain(args.iter().copied())).unwrap()
    }

    // --- validate_output_path TESTS ---

    #[test]
    fn test_validate_output_path_relative() {
        assert_eq!(validate_output_path("out/trace.json").unwrap(), PathBuf::from("out/trace.json"));
    }

    #[test]
    fn test_validate_output_path_rejects_traversal() {
        assert!(validate_output_path("../trace.json").is_err());
        assert!(validate_output_path("out/../../trace.json").is_err());
    }

    #[test]
    fn test_validate_output_path_rejects_absolute_and_nul() {
        assert!(validate_output_path("/tmp/trace.json").is_err());
        assert!(validate_output_path("trace\0.json").is_err());
    }

    // --- argument TESTS ---

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&[
            "snap.json",
            "app.main",
            "--up",
            "0",
            "--scope",
            "all",
            "--ignore",
            "_test$",
            "--legacy-visit-key",
        ]);
        let config: CalltraceConfig =
            toml_config("[trace]\nancestor_depth = 4\ndescendant_depth = 6\nignore = [\"/gen$\"]\n");
        let opts = cli.trace_options(&config);
        assert_eq!(opts.ancestor_depth, 0);
        assert_eq!(opts.descendant_depth, 6);
        assert_eq!(opts.scope, Scope::All);
        assert_eq!(opts.ignore, vec!["/gen$".to_string(), "_test$".to_string()]);
        assert!(opts.legacy_visit_key);
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = parse(&["snap.json", "app.main"]);
        let opts = cli.trace_options(&CalltraceConfig::default());
        assert_eq!(opts, TraceOptions::default());
    }

    #[test]
    fn test_refs_conflicts_with_escaping() {
        let result = Cli::try_parse_from(["calltrace", "s.json", "app.main", "--refs", "--escaping"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_query_errors_are_recoverable() {
        let not_found = anyhow::Error::new(CalltraceError::not_found("app.Missing"));
        assert!(is_recoverable(&not_found));

        let wrapped = anyhow::Error::new(CalltraceError::incomplete("app", "type errors"))
            .context("Failed to load snapshot: snap.json");
        assert!(!is_recoverable(&wrapped));
        assert!(!is_recoverable(&anyhow!("plain failure")));
    }

    #[test]
    fn test_bad_scope_rejected() {
        let result = Cli::try_parse_from(["calltrace", "s.json", "app.main", "--scope", "world"]);
        assert!(result.is_err());
    }

    fn toml_config(text: &str) -> CalltraceConfig {
        let dir = std::env::temp_dir().join(format!(
            "calltrace_cli_test_{}_{}",
            std::process::id(),
            text.len()
        ));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("calltrace.toml"), text).unwrap();
        load_config(&dir).unwrap().unwrap()
    }
}
