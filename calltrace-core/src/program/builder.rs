//! Fluent construction of programs.
//!
//! Used by Rust-side loaders and by tests to describe typed programs without
//! going through JSON:
//!
//! ```rust,ignore
//! let main = Symbol::func("example.com/app", "main", Position::new("main.go", 3, 6));
//! let run = Symbol::func("example.com/app", "run", Position::new("main.go", 7, 6));
//!
//! let program = ProgramBuilder::new()
//!     .main_module("example.com/app")
//!     .package(
//!         PackageBuilder::new("example.com/app", "main")
//!             .file("main.go")
//!             .func(&main, vec![Expr::call_of(&run, Position::new("main.go", 4, 2))])
//!             .func(&run, vec![]),
//!     )
//!     .build()?;
//! ```

use super::model::{
    Decl, Expr, FuncDecl, Ident, Package, Position, Selection, SelectionKind, SourceFile, Symbol,
    TypeDecl, ValueDecl,
};
use super::Program;
use crate::error::CalltraceResult;

/// Builder for one package.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    package: Package,
}

impl PackageBuilder {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: Package {
                path: path.into(),
                name: name.into(),
                module: None,
                files: Vec::new(),
                incomplete: false,
                errors: Vec::new(),
            },
        }
    }

    /// Module the package belongs to.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.package.module = Some(module.into());
        self
    }

    /// Start a new source file; following declarations go into it.
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.package.files.push(SourceFile {
            path: path.into(),
            decls: Vec::new(),
        });
        self
    }

    fn push(&mut self, decl: Decl) {
        if self.package.files.is_empty() {
            let default = format!("{}.go", self.package.name);
            self.package.files.push(SourceFile {
                path: default,
                decls: Vec::new(),
            });
        }
        if let Some(file) = self.package.files.last_mut() {
            file.decls.push(decl);
        }
    }

    /// Function or method with a body.
    pub fn func(mut self, symbol: &Symbol, body: Vec<Expr>) -> Self {
        self.push(Decl::Func(FuncDecl {
            symbol: symbol.clone(),
            body: Some(body),
        }));
        self
    }

    /// Function declared without a body (assembly, linkname).
    pub fn external_func(mut self, symbol: &Symbol) -> Self {
        self.push(Decl::Func(FuncDecl {
            symbol: symbol.clone(),
            body: None,
        }));
        self
    }

    /// Package-level `var`/`const` with initializers.
    pub fn value(mut self, names: &[Symbol], values: Vec<Expr>) -> Self {
        self.push(Decl::Value(ValueDecl {
            names: names.to_vec(),
            values,
        }));
        self
    }

    pub fn type_decl(mut self, symbol: &Symbol) -> Self {
        self.push(Decl::Type(TypeDecl {
            symbol: symbol.clone(),
            interface_methods: Vec::new(),
        }));
        self
    }

    pub fn interface(mut self, symbol: &Symbol, methods: &[Symbol]) -> Self {
        self.push(Decl::Type(TypeDecl {
            symbol: symbol.clone(),
            interface_methods: methods.to_vec(),
        }));
        self
    }

    /// Mark binding information as partial, as a loader would.
    pub fn incomplete(mut self) -> Self {
        self.package.incomplete = true;
        self
    }

    pub fn build(self) -> Package {
        self.package
    }
}

/// Builder for a whole program.
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    main_module: Option<String>,
    packages: Vec<Package>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_module(mut self, module: impl Into<String>) -> Self {
        self.main_module = Some(module.into());
        self
    }

    pub fn package(mut self, package: PackageBuilder) -> Self {
        self.packages.push(package.build());
        self
    }

    /// Validate and index. Fails on the same conditions as [`Program::new`].
    pub fn build(self) -> CalltraceResult<Program> {
        Program::new(self.main_module, self.packages)
    }
}

/// Expression constructors.
impl Expr {
    pub fn ident(name: impl Into<String>, pos: Position, uses: Option<Symbol>) -> Self {
        Expr::Ident(Ident {
            name: name.into(),
            pos,
            uses,
        })
    }

    /// An identifier bound to `symbol`.
    pub fn use_of(symbol: &Symbol, pos: Position) -> Self {
        Self::ident(symbol.name.clone(), pos, Some(symbol.clone()))
    }

    pub fn call(fun: Expr, args: Vec<Expr>, pos: Position) -> Self {
        Expr::Call {
            fun: Box::new(fun),
            args,
            pos,
        }
    }

    /// `f()` with `f` bound to `symbol`.
    pub fn call_of(symbol: &Symbol, pos: Position) -> Self {
        Self::call(Self::use_of(symbol, pos.clone()), Vec::new(), pos)
    }

    pub fn selector(base: Expr, sel: Ident, selection: Option<Selection>) -> Self {
        Expr::Selector {
            base: Box::new(base),
            sel,
            selection,
        }
    }

    /// `pkg.Name` as a package-qualified reference.
    pub fn qualified(package_name: &str, symbol: &Symbol, pkg_pos: Position, sel_pos: Position) -> Self {
        Self::selector(
            Self::ident(package_name, pkg_pos, Some(Symbol::package_name(package_name))),
            Ident {
                name: symbol.name.clone(),
                pos: sel_pos,
                uses: Some(symbol.clone()),
            },
            None,
        )
    }

    /// `recv.M` where `M` is selected through the receiver's method set.
    pub fn method_value(recv: Expr, method: &Symbol, sel_pos: Position) -> Self {
        Self::selector(
            recv,
            Ident {
                name: method.name.clone(),
                pos: sel_pos,
                uses: Some(method.clone()),
            },
            Some(Selection {
                kind: SelectionKind::MethodVal,
                target: method.clone(),
            }),
        )
    }

    /// `recv.f` where `f` is a struct field.
    pub fn field(recv: Expr, field: &Symbol, sel_pos: Position) -> Self {
        Self::selector(
            recv,
            Ident {
                name: field.name.clone(),
                pos: sel_pos,
                uses: Some(field.clone()),
            },
            Some(Selection {
                kind: SelectionKind::FieldVal,
                target: field.clone(),
            }),
        )
    }

    pub fn index(base: Expr, indices: Vec<Expr>) -> Self {
        Expr::Index {
            base: Box::new(base),
            indices,
        }
    }

    pub fn paren(inner: Expr) -> Self {
        Expr::Paren {
            inner: Box::new(inner),
        }
    }

    pub fn func_lit(pos: Position, body: Vec<Expr>) -> Self {
        Expr::FuncLit { pos, body }
    }

    pub fn composite(ty: Option<Expr>, elts: Vec<Expr>) -> Self {
        Expr::Composite {
            ty: ty.map(Box::new),
            elts,
        }
    }

    pub fn key_value(key: Expr, value: Expr) -> Self {
        Expr::KeyValue {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Any other node (statement, operator, literal) with its children.
    pub fn stmt(kind: impl Into<String>, children: Vec<Expr>) -> Self {
        Expr::Other {
            kind: kind.into(),
            children,
        }
    }
}
