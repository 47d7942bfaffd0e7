//! Symbol identity.
//!
//! Every package in a snapshot carries its own copy of the symbols it binds,
//! so `pkg.F` seen from package `main` and `F` seen from inside `pkg` are two
//! different handles for one function. Identity is location based:
//! (declaring package, name, declaration position).

use crate::program::{Position, Symbol};

/// Returns true iff `a` and `b` denote the same declared entity.
///
/// Identical handles are always equal. Otherwise both sides must carry a
/// declaring package and a declaration position, and all of package, name
/// and position must agree. There are no partial matches: a missing package
/// or position on either side compares unequal.
pub fn same_symbol(a: &Symbol, b: &Symbol) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    match (&a.package, &b.package, &a.pos, &b.pos) {
        (Some(pa), Some(pb), Some(xa), Some(xb)) => pa == pb && a.name == b.name && xa == xb,
        _ => false,
    }
}

/// Hashable form of the identity compared by [`same_symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub package: String,
    pub name: String,
    pub pos: Position,
}

impl SymbolKey {
    /// `None` for symbols without package or position (builtins, universe),
    /// which have no location-based identity.
    pub fn of(symbol: &Symbol) -> Option<Self> {
        Some(Self {
            package: symbol.package.clone()?,
            name: symbol.name.clone(),
            pos: symbol.pos.clone()?,
        })
    }
}
