//! Static callee resolution for a single call expression.
//!
//! Handles the three statically resolvable shapes:
//! - direct calls: `f()`
//! - method calls: `x.M()` (through the receiver's method set)
//! - qualified calls: `pkg.F()`
//!
//! plus generic instantiation (`f[T]()`, `pkg.F[T]()`) and parentheses.
//! Anything that cannot be pinned to one declaration is reported as
//! [`Callee::Unresolved`] with a reason; it is never dropped.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::program::{Expr, Ident, Selection, SelectionKind, Symbol, SymbolKind};

/// Why a call has no static target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unresolved {
    /// Call through a function-valued variable, parameter, field or constant.
    FuncValue { name: String },
    /// Immediate call of a function literal.
    FuncLit,
    /// Builtin such as `len`, `append`, `panic`.
    Builtin { name: String },
    /// Callee is some other expression (call result, index, assertion).
    Expression,
    /// Identifier without binding information.
    Unbound { name: String },
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FuncValue { name } => write!(f, "function value {}", name),
            Self::FuncLit => f.write_str("function literal"),
            Self::Builtin { name } => write!(f, "builtin {}", name),
            Self::Expression => f.write_str("dynamic expression"),
            Self::Unbound { name } => write!(f, "unbound {}", name),
        }
    }
}

/// Resolution result for one call expression.
#[derive(Debug, Clone, Copy)]
pub enum Callee<'p> {
    /// Statically known function or method.
    Static(&'p Symbol),
    /// Method of an interface type; the concrete target is not determined.
    Interface(&'p Symbol),
    Unresolved(&'p Expr, UnresolvedKind),
}

/// Discriminant of [`Unresolved`] without owned data, so [`Callee`] stays
/// `Copy`; use [`Callee::unresolved_reason`] for the full reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedKind {
    FuncValue,
    FuncLit,
    Builtin,
    Expression,
    Unbound,
}

impl<'p> Callee<'p> {
    /// The target symbol, for static and interface callees.
    pub fn symbol(&self) -> Option<&'p Symbol> {
        match *self {
            Callee::Static(s) | Callee::Interface(s) => Some(s),
            Callee::Unresolved(..) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Callee::Unresolved(..))
    }

    /// Full unresolved reason, naming the value or builtin involved.
    pub fn unresolved_reason(&self) -> Option<Unresolved> {
        let Callee::Unresolved(fun, kind) = *self else {
            return None;
        };
        let name = callee_name(fun).unwrap_or_default();
        Some(match kind {
            UnresolvedKind::FuncValue => Unresolved::FuncValue { name },
            UnresolvedKind::FuncLit => Unresolved::FuncLit,
            UnresolvedKind::Builtin => Unresolved::Builtin { name },
            UnresolvedKind::Expression => Unresolved::Expression,
            UnresolvedKind::Unbound => Unresolved::Unbound { name },
        })
    }
}

/// Outcome of looking at a call expression.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'p> {
    Call(Callee<'p>),
    /// `T(x)`: a type conversion, not a call.
    Conversion,
}

/// Resolve the callee of `call`. Returns `None` if `call` is not a call
/// expression.
pub fn resolve_call(call: &Expr) -> Option<Resolution<'_>> {
    let Expr::Call { fun, .. } = call else {
        return None;
    };
    Some(resolve_target(fun))
}

fn resolve_target(fun: &Expr) -> Resolution<'_> {
    let target = fun.unparen();
    match target {
        Expr::Ident(ident) => resolve_binding(target, ident, None),
        Expr::Selector { sel, selection, .. } => resolve_binding(target, sel, selection.as_ref()),
        // f[T]() and pkg.F[T]() resolve through the instantiated base.
        Expr::Index { base, .. } => match resolve_target(base) {
            Resolution::Call(Callee::Unresolved(_, UnresolvedKind::Expression)) => {
                Resolution::Call(Callee::Unresolved(target, UnresolvedKind::Expression))
            }
            other => other,
        },
        Expr::FuncLit { .. } => Resolution::Call(Callee::Unresolved(target, UnresolvedKind::FuncLit)),
        _ => Resolution::Call(Callee::Unresolved(target, UnresolvedKind::Expression)),
    }
}

fn resolve_binding<'p>(
    target: &'p Expr,
    ident: &'p Ident,
    selection: Option<&'p Selection>,
) -> Resolution<'p> {
    if let Some(selection) = selection {
        return match selection.kind {
            SelectionKind::MethodVal | SelectionKind::MethodExpr => {
                Resolution::Call(method_callee(&selection.target))
            }
            SelectionKind::FieldVal => {
                Resolution::Call(Callee::Unresolved(target, UnresolvedKind::FuncValue))
            }
        };
    }

    let Some(symbol) = ident.uses.as_ref() else {
        warn!(name = %ident.name, pos = %ident.pos, "call target has no binding");
        return Resolution::Call(Callee::Unresolved(target, UnresolvedKind::Unbound));
    };

    match symbol.kind {
        SymbolKind::Func => Resolution::Call(Callee::Static(symbol)),
        SymbolKind::Method => Resolution::Call(method_callee(symbol)),
        SymbolKind::Type => Resolution::Conversion,
        SymbolKind::Builtin => Resolution::Call(Callee::Unresolved(target, UnresolvedKind::Builtin)),
        SymbolKind::Var | SymbolKind::Const | SymbolKind::Field => {
            Resolution::Call(Callee::Unresolved(target, UnresolvedKind::FuncValue))
        }
        SymbolKind::Package => Resolution::Call(Callee::Unresolved(target, UnresolvedKind::Expression)),
    }
}

fn method_callee(method: &Symbol) -> Callee<'_> {
    if method.interface {
        Callee::Interface(method)
    } else {
        Callee::Static(method)
    }
}

/// Source text name of a callee expression, for labels.
pub fn callee_name(fun: &Expr) -> Option<String> {
    match fun.unparen() {
        Expr::Ident(ident) => Some(ident.name.clone()),
        Expr::Selector { base, sel, .. } => Some(match callee_name(base) {
            Some(base) => format!("{}.{}", base, sel.name),
            None => sel.name.clone(),
        }),
        Expr::Index { base, .. } => callee_name(base),
        _ => None,
    }
}

/// Position of the identifier actually being invoked by a call, used to
/// classify references as calls.
pub fn call_position(call: &Expr) -> Option<&crate::program::Position> {
    let Expr::Call { fun, .. } = call else {
        return None;
    };
    invoked_ident(fun).map(|ident| &ident.pos)
}

fn invoked_ident(fun: &Expr) -> Option<&Ident> {
    match fun.unparen() {
        Expr::Ident(ident) => Some(ident),
        Expr::Selector { sel, .. } => Some(sel),
        Expr::Index { base, .. } => invoked_ident(base),
        _ => None,
    }
}
