//! Scope filter: which packages' call sites take part in a traversal.
//!
//! - `all`: every loaded package
//! - `project`: packages of the main module (or, when the snapshot names no
//!   main module, of the start package's module)
//! - `package`: only the start symbol's own package
//!
//! Ignore patterns (regular expressions over package paths) further exclude
//! packages under any scope.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CalltraceError, CalltraceResult};
use crate::program::{Package, Program};

/// Traversal scope selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    All,
    #[default]
    Project,
    Package,
}

impl FromStr for Scope {
    type Err = CalltraceError;

    fn from_str(s: &str) -> CalltraceResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "project" => Ok(Self::Project),
            "package" | "package-of-start" | "pkg" => Ok(Self::Package),
            other => Err(CalltraceError::invalid_argument(format!(
                "unknown scope '{}' (expected all, project or package)",
                other
            ))),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Project => "project",
            Self::Package => "package",
        })
    }
}

/// Membership predicate resolved against one program and start package.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    scope: Scope,
    start_package: String,
    project_module: Option<String>,
    ignore: Vec<Regex>,
}

impl ScopeFilter {
    /// Resolve `scope` for a traversal starting in `start_package`.
    pub fn new(program: &Program, scope: Scope, start_package: &str) -> Self {
        let project_module = program
            .main_module()
            .map(str::to_string)
            .or_else(|| program.package(start_package).and_then(|p| p.module.clone()));
        Self {
            scope,
            start_package: start_package.to_string(),
            project_module,
            ignore: Vec::new(),
        }
    }

    /// Add package-path exclusion patterns.
    pub fn with_ignore_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> CalltraceResult<Self> {
        for pattern in patterns {
            let re = Regex::new(pattern.as_ref()).map_err(|e| {
                CalltraceError::invalid_argument(format!(
                    "invalid ignore pattern '{}': {}",
                    pattern.as_ref(),
                    e
                ))
            })?;
            self.ignore.push(re);
        }
        Ok(self)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether call sites inside `package` are counted.
    pub fn admits(&self, package: &Package) -> bool {
        if self.ignore.iter().any(|re| re.is_match(&package.path)) {
            return false;
        }
        match self.scope {
            Scope::All => true,
            Scope::Package => package.path == self.start_package,
            Scope::Project => match (&self.project_module, &package.module) {
                (Some(project), Some(module)) => project == module,
                // Without module information only the start package is
                // known to belong to the project.
                _ => package.path == self.start_package,
            },
        }
    }

    /// Like [`admits`](Self::admits), for a package path that may not be
    /// loaded. Unloaded packages belong to no module and only pass `all`.
    pub fn admits_path(&self, program: &Program, path: &str) -> bool {
        match program.package(path) {
            Some(package) => self.admits(package),
            None => {
                self.scope == Scope::All && !self.ignore.iter().any(|re| re.is_match(path))
            }
        }
    }

    /// Packages of `program` admitted by this filter, in load order.
    pub fn packages<'p>(&'p self, program: &'p Program) -> impl Iterator<Item = &'p Package> + 'p {
        program.packages().iter().filter(move |p| self.admits(p))
    }
}
