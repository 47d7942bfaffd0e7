//! Typed syntax model consumed by the engine.
//!
//! A loader (type checker front end) produces these structures with every
//! identifier use already bound to the [`Symbol`] it denotes. The engine never
//! re-resolves names; it only trusts and walks these bindings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A source location. Identity of declarations is keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl Position {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column > 0 {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// Kind of a declared entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Func,
    Method,
    Type,
    Var,
    Const,
    Field,
    Builtin,
    Package,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Func => "function",
            Self::Method => "method",
            Self::Type => "type",
            Self::Var => "variable",
            Self::Const => "constant",
            Self::Field => "field",
            Self::Builtin => "builtin",
            Self::Package => "package",
        }
    }

    /// Functions and methods are the only kinds a call can statically target.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Func | Self::Method)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared entity as seen from one binding site.
///
/// Each package of a snapshot carries its own copy of every symbol it uses,
/// so two `Symbol` values for the same function are routinely distinct
/// handles. Compare them with [`crate::symbol::same_symbol`], never with
/// field-by-field equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    /// Declaring package path; `None` for builtins and universe objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Declaration position; `None` for builtins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
    /// Receiver base type name for methods (pointer stripped).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Method declared in an interface type (no body, dynamic dispatch).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interface: bool,
}

impl Symbol {
    fn declared(kind: SymbolKind, package: &str, name: &str, pos: Position) -> Self {
        Self {
            kind,
            name: name.to_string(),
            package: Some(package.to_string()),
            pos: Some(pos),
            receiver: None,
            interface: false,
        }
    }

    pub fn func(package: &str, name: &str, pos: Position) -> Self {
        Self::declared(SymbolKind::Func, package, name, pos)
    }

    pub fn method(package: &str, receiver: &str, name: &str, pos: Position) -> Self {
        Self {
            receiver: Some(receiver.to_string()),
            ..Self::declared(SymbolKind::Method, package, name, pos)
        }
    }

    pub fn interface_method(package: &str, iface: &str, name: &str, pos: Position) -> Self {
        Self {
            interface: true,
            ..Self::method(package, iface, name, pos)
        }
    }

    pub fn var(package: &str, name: &str, pos: Position) -> Self {
        Self::declared(SymbolKind::Var, package, name, pos)
    }

    pub fn constant(package: &str, name: &str, pos: Position) -> Self {
        Self::declared(SymbolKind::Const, package, name, pos)
    }

    pub fn type_name(package: &str, name: &str, pos: Position) -> Self {
        Self::declared(SymbolKind::Type, package, name, pos)
    }

    pub fn field(package: &str, owner: &str, name: &str, pos: Position) -> Self {
        Self {
            receiver: Some(owner.to_string()),
            ..Self::declared(SymbolKind::Field, package, name, pos)
        }
    }

    /// Local variable or parameter. Locals have a position but the package
    /// is still recorded so identity stays exact.
    pub fn local(package: &str, name: &str, pos: Position) -> Self {
        Self::var(package, name, pos)
    }

    pub fn builtin(name: &str) -> Self {
        Self {
            kind: SymbolKind::Builtin,
            name: name.to_string(),
            package: None,
            pos: None,
            receiver: None,
            interface: false,
        }
    }

    pub fn package_name(name: &str) -> Self {
        Self {
            kind: SymbolKind::Package,
            ..Self::builtin(name)
        }
    }

    /// Qualified display name: `pkg/path.Func` or `pkg/path.Type.Method`.
    pub fn qualified_name(&self) -> String {
        let mut out = String::new();
        if let Some(pkg) = &self.package {
            out.push_str(pkg);
            out.push('.');
        }
        if let Some(recv) = &self.receiver {
            out.push_str(recv);
            out.push('.');
        }
        out.push_str(&self.name);
        out
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// An identifier occurrence and its use-site binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub pos: Position,
    /// Symbol this identifier resolves to. A complete package leaves this
    /// empty only for blank identifiers and definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<Symbol>,
}

/// How a selector expression `x.f` was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// `x.M` with `x` a value: method value / method call.
    MethodVal,
    /// `T.M`: method expression.
    MethodExpr,
    /// `x.f` with `f` a struct field.
    FieldVal,
}

/// Receiver-based selection attached to a selector expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub kind: SelectionKind,
    pub target: Symbol,
}

/// Expression and statement tree of a declaration body.
///
/// Only the shapes the engine needs to distinguish have dedicated variants;
/// everything else (statements, operators, literals) is an [`Expr::Other`]
/// node that simply carries its children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Ident(Ident),
    Selector {
        base: Box<Expr>,
        sel: Ident,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selection: Option<Selection>,
    },
    Call {
        fun: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        pos: Position,
    },
    /// Indexing, including generic instantiation `f[T]`.
    Index {
        base: Box<Expr>,
        #[serde(default)]
        indices: Vec<Expr>,
    },
    Paren {
        inner: Box<Expr>,
    },
    FuncLit {
        pos: Position,
        #[serde(default)]
        body: Vec<Expr>,
    },
    Composite {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ty: Option<Box<Expr>>,
        #[serde(default)]
        elts: Vec<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    Other {
        #[serde(default)]
        kind: String,
        #[serde(default)]
        children: Vec<Expr>,
    },
}

impl Expr {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Ident(_) => Vec::new(),
            Expr::Selector { base, .. } => vec![base.as_ref()],
            Expr::Call { fun, args, .. } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(fun.as_ref());
                out.extend(args.iter());
                out
            }
            Expr::Index { base, indices } => {
                let mut out = Vec::with_capacity(indices.len() + 1);
                out.push(base.as_ref());
                out.extend(indices.iter());
                out
            }
            Expr::Paren { inner } => vec![inner.as_ref()],
            Expr::FuncLit { body, .. } => body.iter().collect(),
            Expr::Composite { ty, elts } => {
                let mut out = Vec::with_capacity(elts.len() + 1);
                if let Some(ty) = ty {
                    out.push(ty.as_ref());
                }
                out.extend(elts.iter());
                out
            }
            Expr::KeyValue { key, value } => vec![key.as_ref(), value.as_ref()],
            Expr::Other { children, .. } => children.iter().collect(),
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren { inner } = expr {
            expr = inner;
        }
        expr
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order traversal over an expression tree, in source order.
pub struct Descendants<'a> {
    stack: Vec<&'a Expr>,
}

impl<'a> Descendants<'a> {
    /// Traverse a whole statement list.
    pub fn of_body(body: &'a [Expr]) -> Self {
        Self {
            stack: body.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<&'a Expr> {
        let expr = self.stack.pop()?;
        self.stack.extend(expr.children().into_iter().rev());
        Some(expr)
    }
}

/// Function or method declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    pub symbol: Symbol,
    /// `None` for declarations without a body (assembly, linkname, cgo).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<Expr>>,
}

/// Package-level `var`/`const` declaration with initializers.
///
/// With as many values as names, value `i` initializes name `i`; otherwise
/// (multi-value initializers) every value is attributed to the first name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueDecl {
    pub names: Vec<Symbol>,
    #[serde(default)]
    pub values: Vec<Expr>,
}

impl ValueDecl {
    /// The declared name an initializer expression belongs to.
    pub fn owner_of(&self, index: usize) -> Option<&Symbol> {
        if self.names.len() == self.values.len() {
            self.names.get(index)
        } else {
            self.names.first()
        }
    }
}

/// Type declaration. Methods are separate [`FuncDecl`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub symbol: Symbol,
    /// Methods declared by this type when it is an interface.
    #[serde(default)]
    pub interface_methods: Vec<Symbol>,
}

/// A top-level declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum Decl {
    Func(FuncDecl),
    Value(ValueDecl),
    Type(TypeDecl),
}

/// One source file of a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

/// One type-checked package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Import path, e.g. `example.com/app/server`.
    pub path: String,
    /// Declared package name, e.g. `server`.
    pub name: String,
    /// Module the package belongs to, used by the `project` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    /// Set by the loader when binding information is partial.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
    /// Type errors reported by the loader.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Package {
    /// Last element of the import path.
    pub fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// All declarations, in file order.
    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.files.iter().flat_map(|f| f.decls.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32) -> Position {
        Position::new("a.go", line, 1)
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(Symbol::func("example.com/app", "Run", at(1)).qualified_name(), "example.com/app.Run");
        assert_eq!(
            Symbol::method("example.com/app", "Server", "Start", at(2)).qualified_name(),
            "example.com/app.Server.Start"
        );
        assert_eq!(Symbol::builtin("len").qualified_name(), "len");
    }

    #[test]
    fn test_unparen() {
        let ident = Expr::Ident(Ident {
            name: "f".into(),
            pos: at(3),
            uses: None,
        });
        let wrapped = Expr::Paren {
            inner: Box::new(Expr::Paren {
                inner: Box::new(ident),
            }),
        };
        assert!(matches!(wrapped.unparen(), Expr::Ident(i) if i.name == "f"));
    }

    #[test]
    fn test_descendants_source_order() {
        let name = |n: &str, line| {
            Expr::Ident(Ident {
                name: n.into(),
                pos: at(line),
                uses: None,
            })
        };
        let call = Expr::Call {
            fun: Box::new(name("f", 1)),
            args: vec![name("x", 2), name("y", 3)],
            pos: at(1),
        };
        let order: Vec<String> = call
            .descendants()
            .filter_map(|e| match e {
                Expr::Ident(i) => Some(i.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec!["f", "x", "y"]);
    }

    #[test]
    fn test_value_decl_owner() {
        let a = Symbol::var("p", "a", at(1));
        let b = Symbol::var("p", "b", at(1));
        let lit = || Expr::Other {
            kind: "lit".into(),
            children: vec![],
        };

        let paired = ValueDecl {
            names: vec![a.clone(), b.clone()],
            values: vec![lit(), lit()],
        };
        assert_eq!(paired.owner_of(1).map(|s| s.name.as_str()), Some("b"));

        let multi = ValueDecl {
            names: vec![a, b],
            values: vec![lit()],
        };
        assert_eq!(multi.owner_of(0).map(|s| s.name.as_str()), Some("a"));
    }

    #[test]
    fn test_expr_json_shape() {
        let json = r#"{"node":"call","fun":{"node":"ident","name":"f","pos":{"file":"a.go","line":4}},"pos":{"file":"a.go","line":4}}"#;
        let expr: Expr = serde_json::from_str(json).unwrap();
        match expr {
            Expr::Call { fun, args, .. } => {
                assert!(args.is_empty());
                assert!(matches!(*fun, Expr::Ident(ref i) if i.name == "f" && i.uses.is_none()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
