//! Snapshot loading.
//!
//! Two layouts are accepted:
//! - a single JSON document `{ "main_module": ..., "packages": [...] }`
//! - a directory in which every `*.json` file holds one package
//!   (requires the `snapshot-dir` feature, on by default)
//!
//! Directory snapshots are parsed in parallel. Either way the raw bytes are
//! hashed with SHA-256 so reports can name exactly which snapshot answered.

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::model::Package;
use super::{Program, Snapshot};
use crate::error::{CalltraceError, CalltraceResult, IoResultExt};

/// Directories never descended into when collecting package files.
const EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules"];

/// Options for [`load_snapshot_with`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the snapshot's own `main_module`.
    pub main_module: Option<String>,
}

/// Load a snapshot file or directory with default options.
pub fn load_snapshot(path: &Path) -> CalltraceResult<Program> {
    load_snapshot_with(path, &LoadOptions::default())
}

/// Load a snapshot file or directory.
pub fn load_snapshot_with(path: &Path, options: &LoadOptions) -> CalltraceResult<Program> {
    let (snapshot, fingerprint) = if path.is_dir() {
        read_dir_snapshot(path)?
    } else {
        read_file_snapshot(path)?
    };

    let main_module = options
        .main_module
        .clone()
        .or_else(|| snapshot.main_module.clone());
    let package_count = snapshot.packages.len();
    let program = Program::new(main_module, snapshot.packages)?.with_fingerprint(fingerprint);

    info!(
        path = %path.display(),
        packages = package_count,
        functions = program.func_count(),
        fingerprint = program.fingerprint().unwrap_or_default(),
        "snapshot loaded"
    );
    Ok(program)
}

#[inline]
fn hex_digest(bytes: &[u8]) -> String {
    let mut sha = Sha256::new();
    sha.update(bytes);
    format!("{:x}", sha.finalize())
}

fn read_file_snapshot(path: &Path) -> CalltraceResult<(Snapshot, String)> {
    let bytes = fs::read(path).with_path(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| CalltraceError::snapshot(path, e.to_string()))?;
    Ok((snapshot, hex_digest(&bytes)))
}

#[cfg(feature = "snapshot-dir")]
fn read_dir_snapshot(root: &Path) -> CalltraceResult<(Snapshot, String)> {
    let files = gather_package_files(root)?;
    debug!(root = %root.display(), files = files.len(), "reading package files");

    let parsed: Vec<(PathBuf, Package, String)> = files
        .par_iter()
        .map(|file| {
            let bytes = fs::read(file).with_path(file)?;
            let package: Package = serde_json::from_slice(&bytes)
                .map_err(|e| CalltraceError::snapshot(file, e.to_string()))?;
            Ok((file.clone(), package, hex_digest(&bytes)))
        })
        .collect::<CalltraceResult<Vec<_>>>()?;

    // Fingerprint over (relative path, file digest) pairs in path order so
    // it does not depend on directory iteration order.
    let mut sha = Sha256::new();
    for (file, _, digest) in &parsed {
        let rel = file.strip_prefix(root).unwrap_or(file);
        sha.update(rel.to_string_lossy().as_bytes());
        sha.update(digest.as_bytes());
    }
    let fingerprint = format!("{:x}", sha.finalize());

    let mut packages: Vec<Package> = parsed.into_iter().map(|(_, p, _)| p).collect();
    packages.sort_by(|a, b| a.path.cmp(&b.path));

    Ok((
        Snapshot {
            main_module: None,
            packages,
        },
        fingerprint,
    ))
}

#[cfg(not(feature = "snapshot-dir"))]
fn read_dir_snapshot(root: &Path) -> CalltraceResult<(Snapshot, String)> {
    Err(CalltraceError::snapshot(
        root,
        "directory snapshots require the snapshot-dir feature",
    ))
}

/// Collect every `*.json` file below `root`, sorted.
#[cfg(feature = "snapshot-dir")]
pub fn gather_package_files(root: &Path) -> CalltraceResult<Vec<PathBuf>> {
    use walkdir::WalkDir;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| {
        !(e.file_type().is_dir()
            && e.file_name()
                .to_str()
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name)))
    }) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            match e.into_io_error() {
                Some(io) => CalltraceError::io(path, io),
                None => CalltraceError::snapshot(path, "filesystem loop"),
            }
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir()
            .join("calltrace_loader_tests")
            .join(format!("{}_{}", std::process::id(), id));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const APP_PKG: &str = r#"{
        "path": "example.com/app",
        "name": "main",
        "module": "example.com/app",
        "files": [{
            "path": "main.go",
            "decls": [
                {"decl": "func",
                 "symbol": {"kind": "func", "name": "main", "package": "example.com/app",
                            "pos": {"file": "main.go", "line": 3, "column": 6}},
                 "body": [
                    {"node": "call", "pos": {"file": "main.go", "line": 4, "column": 2},
                     "fun": {"node": "ident", "name": "run",
                             "pos": {"file": "main.go", "line": 4, "column": 2},
                             "uses": {"kind": "func", "name": "run", "package": "example.com/app",
                                      "pos": {"file": "main.go", "line": 7, "column": 6}}}}
                 ]},
                {"decl": "func",
                 "symbol": {"kind": "func", "name": "run", "package": "example.com/app",
                            "pos": {"file": "main.go", "line": 7, "column": 6}},
                 "body": []}
            ]
        }]
    }"#;

    #[test]
    fn test_load_single_file() {
        let dir = temp_dir();
        let file = dir.join("snapshot.json");
        fs::write(
            &file,
            format!(r#"{{"main_module": "example.com/app", "packages": [{}]}}"#, APP_PKG),
        )
        .unwrap();

        let program = load_snapshot(&file).unwrap();
        assert_eq!(program.main_module(), Some("example.com/app"));
        assert_eq!(program.packages().len(), 1);
        assert_eq!(program.func_count(), 2);
        assert_eq!(program.fingerprint().map(str::len), Some(64));
    }

    #[test]
    fn test_main_module_override() {
        let dir = temp_dir();
        let file = dir.join("snapshot.json");
        fs::write(&file, format!(r#"{{"packages": [{}]}}"#, APP_PKG)).unwrap();

        let options = LoadOptions {
            main_module: Some("example.com/app".into()),
        };
        let program = load_snapshot_with(&file, &options).unwrap();
        assert_eq!(program.main_module(), Some("example.com/app"));
    }

    #[cfg(feature = "snapshot-dir")]
    #[test]
    fn test_load_directory_sorted_and_stable() {
        let dir = temp_dir();
        fs::write(dir.join("b.json"), APP_PKG).unwrap();
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(
            dir.join("lib").join("lib.json"),
            r#"{"path": "example.com/app/lib", "name": "lib", "files": []}"#,
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let first = load_snapshot(&dir).unwrap();
        let paths: Vec<&str> = first.packages().iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["example.com/app", "example.com/app/lib"]);

        let second = load_snapshot(&dir).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_malformed_snapshot_is_typed_error() {
        let dir = temp_dir();
        let file = dir.join("broken.json");
        fs::write(&file, "{ not json").unwrap();
        let err = load_snapshot(&file).unwrap_err();
        assert!(matches!(err, CalltraceError::Snapshot { .. }));
        assert_eq!(err.path(), Some(&file));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_snapshot(Path::new("/nonexistent/calltrace/snapshot.json")).unwrap_err();
        assert!(matches!(err, CalltraceError::Io { .. }));
    }

    #[test]
    fn test_incomplete_package_rejected() {
        let dir = temp_dir();
        let file = dir.join("snapshot.json");
        fs::write(
            &file,
            r#"{"packages": [{"path": "example.com/x", "name": "x", "incomplete": true}]}"#,
        )
        .unwrap();
        let err = load_snapshot(&file).unwrap_err();
        assert!(matches!(err, CalltraceError::IncompletePackage { .. }));
    }
}
