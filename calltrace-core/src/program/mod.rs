//! Loaded, type-checked program.
//!
//! A [`Program`] is built once from a snapshot and then shared immutably by
//! every query. It owns the packages and the indexes the engine needs to go
//! from a callee [`Symbol`] back to its declaration body.
//!
//! # Loader contract
//!
//! Every package must carry complete binding information. A loader that
//! could only partially type-check a package must mark it `incomplete` or
//! list its `errors`; [`Program::new`] rejects such packages because the
//! engine cannot detect missing bindings on its own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CalltraceError, CalltraceResult};
use crate::symbol::SymbolKey;

pub mod builder;
pub mod loader;
pub mod model;
pub mod visit;

pub use builder::{PackageBuilder, ProgramBuilder};
pub use loader::{load_snapshot, load_snapshot_with, LoadOptions};
pub use model::{
    Decl, Descendants, Expr, FuncDecl, Ident, Package, Position, Selection, SelectionKind,
    SourceFile, Symbol, SymbolKind, TypeDecl, ValueDecl,
};
pub use visit::{walk_body, walk_children, walk_expr, Visit};

/// On-disk snapshot: the whole program in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Module treated as "the project" by the `project` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_module: Option<String>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// A declaration body together with the symbol that owns it.
///
/// Functions and methods own their whole body. Each initializer of a
/// package-level `var`/`const` is a unit owned by the name it initializes.
#[derive(Debug, Clone, Copy)]
pub struct BodyUnit<'p> {
    pub package: &'p Package,
    pub owner: &'p Symbol,
    pub body: &'p [Expr],
}

#[derive(Debug, Clone, Copy)]
struct DeclIndex {
    package: usize,
    file: usize,
    decl: usize,
}

/// Immutable program context passed to every operation.
#[derive(Debug)]
pub struct Program {
    main_module: Option<String>,
    packages: Vec<Package>,
    fingerprint: Option<String>,
    by_path: HashMap<String, usize>,
    funcs: HashMap<SymbolKey, DeclIndex>,
}

impl Program {
    /// Validate packages and build lookup indexes.
    pub fn new(main_module: Option<String>, packages: Vec<Package>) -> CalltraceResult<Self> {
        let mut by_path = HashMap::with_capacity(packages.len());
        let mut funcs = HashMap::new();

        for (pi, pkg) in packages.iter().enumerate() {
            if pkg.incomplete {
                return Err(CalltraceError::incomplete(
                    &pkg.path,
                    "loader marked binding information as partial",
                ));
            }
            if let Some(first) = pkg.errors.first() {
                return Err(CalltraceError::incomplete(
                    &pkg.path,
                    format!("{} type error(s), first: {}", pkg.errors.len(), first),
                ));
            }
            if by_path.insert(pkg.path.clone(), pi).is_some() {
                return Err(CalltraceError::DuplicatePackage {
                    package: pkg.path.clone(),
                });
            }

            for (fi, file) in pkg.files.iter().enumerate() {
                for (di, decl) in file.decls.iter().enumerate() {
                    let Decl::Func(func) = decl else { continue };
                    let sym = &func.symbol;
                    if !sym.kind.is_callable() {
                        return Err(CalltraceError::invalid_decl(
                            &pkg.path,
                            &sym.name,
                            format!("function declaration has kind {}", sym.kind),
                        ));
                    }
                    if sym.package.as_deref() != Some(pkg.path.as_str()) {
                        return Err(CalltraceError::invalid_decl(
                            &pkg.path,
                            &sym.name,
                            "declaring package does not match enclosing package",
                        ));
                    }
                    let key = SymbolKey::of(sym).ok_or_else(|| {
                        CalltraceError::invalid_decl(&pkg.path, &sym.name, "missing position")
                    })?;
                    funcs.insert(
                        key,
                        DeclIndex {
                            package: pi,
                            file: fi,
                            decl: di,
                        },
                    );
                }
            }
        }

        Ok(Self {
            main_module,
            packages,
            fingerprint: None,
            by_path,
            funcs,
        })
    }

    /// Build from a deserialized snapshot document.
    pub fn from_snapshot(snapshot: Snapshot) -> CalltraceResult<Self> {
        Self::new(snapshot.main_module, snapshot.packages)
    }

    pub(crate) fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn main_module(&self) -> Option<&str> {
        self.main_module.as_deref()
    }

    /// SHA-256 of the snapshot bytes this program was loaded from.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, path: &str) -> Option<&Package> {
        self.by_path.get(path).map(|&i| &self.packages[i])
    }

    /// Package declaring `symbol`, if it is part of this program.
    pub fn package_of(&self, symbol: &Symbol) -> Option<&Package> {
        symbol.package.as_deref().and_then(|p| self.package(p))
    }

    /// Declaration of a function or method, found by identity.
    pub fn func_decl(&self, symbol: &Symbol) -> Option<&FuncDecl> {
        let key = SymbolKey::of(symbol)?;
        let idx = self.funcs.get(&key)?;
        match &self.packages[idx.package].files[idx.file].decls[idx.decl] {
            Decl::Func(func) => Some(func),
            _ => None,
        }
    }

    /// Body of a function or method, if the program has one for it.
    pub fn body_of(&self, symbol: &Symbol) -> Option<&[Expr]> {
        self.func_decl(symbol)?.body.as_deref()
    }

    /// Number of function and method declarations.
    pub fn func_count(&self) -> usize {
        self.funcs.len()
    }
}

/// All body units of a package, in declaration order.
pub fn body_units(package: &Package) -> impl Iterator<Item = BodyUnit<'_>> {
    package.decls().flat_map(move |decl| {
        let units: Vec<BodyUnit<'_>> = match decl {
            Decl::Func(func) => func
                .body
                .as_deref()
                .map(|body| BodyUnit {
                    package,
                    owner: &func.symbol,
                    body,
                })
                .into_iter()
                .collect(),
            Decl::Value(value) => value
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, expr)| {
                    value.owner_of(i).map(|owner| BodyUnit {
                        package,
                        owner,
                        body: std::slice::from_ref(expr),
                    })
                })
                .collect(),
            Decl::Type(_) => Vec::new(),
        };
        units
    })
}
