//! Start-symbol lookup from a user query.
//!
//! Accepted spellings, for a method `Start` on `Server` in package
//! `example.com/app/server` (package name `server`):
//!
//! - `example.com/app/server.Server.Start` (full import path)
//! - `server.Server.Start` (package name or last path segment)
//! - `Server.Start`
//!
//! and the same forms without the receiver for plain functions. A query
//! that spells the full qualified name wins over shorter matches.

use tracing::debug;

use crate::error::{CalltraceError, CalltraceResult};
use crate::program::{Decl, Package, Program, Symbol};

/// Find the one callable declaration matching `query`.
///
/// Errors: [`CalltraceError::SymbolNotFound`] when nothing matches,
/// [`CalltraceError::NotCallable`] when only non-function declarations
/// match, [`CalltraceError::AmbiguousSymbol`] when several functions do.
pub fn lookup_callable<'p>(program: &'p Program, query: &str) -> CalltraceResult<&'p Symbol> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CalltraceError::invalid_argument("empty symbol query"));
    }

    let matches: Vec<&Symbol> = program
        .packages()
        .iter()
        .flat_map(|pkg| declared_symbols(pkg).map(move |sym| (pkg, sym)))
        .filter(|(pkg, sym)| spellings(pkg, sym).iter().any(|s| s == query))
        .map(|(_, sym)| sym)
        .collect();

    let exact: Vec<&Symbol> = matches
        .iter()
        .copied()
        .filter(|s| s.qualified_name() == query)
        .collect();
    let candidates = if exact.is_empty() { matches } else { exact };

    let Some(first) = candidates.first().copied() else {
        return Err(CalltraceError::not_found(query));
    };

    let callable: Vec<&Symbol> = candidates
        .iter()
        .copied()
        .filter(|s| s.kind.is_callable())
        .collect();

    match callable.as_slice() {
        [] => Err(CalltraceError::NotCallable {
            name: first.qualified_name(),
            kind: first.kind.to_string(),
        }),
        [one] => {
            debug!(query, symbol = %one, "resolved start symbol");
            Ok(*one)
        }
        many => Err(CalltraceError::AmbiguousSymbol {
            query: query.to_string(),
            candidates: many.iter().map(|s| s.qualified_name()).collect(),
        }),
    }
}

/// Every symbol declared at package level, including interface methods.
fn declared_symbols(package: &Package) -> impl Iterator<Item = &Symbol> {
    package.decls().flat_map(|decl| {
        match decl {
            Decl::Func(func) => vec![&func.symbol],
            Decl::Value(value) => value.names.iter().collect(),
            Decl::Type(ty) => std::iter::once(&ty.symbol)
                .chain(ty.interface_methods.iter())
                .collect(),
        }
    })
}

fn spellings(package: &Package, symbol: &Symbol) -> Vec<String> {
    let local = match &symbol.receiver {
        Some(recv) => format!("{}.{}", recv, symbol.name),
        None => symbol.name.clone(),
    };
    let mut out = vec![
        format!("{}.{}", package.path, local),
        format!("{}.{}", package.name, local),
    ];
    if package.last_segment() != package.name {
        out.push(format!("{}.{}", package.last_segment(), local));
    }
    out.push(local);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{PackageBuilder, Position, ProgramBuilder};

    const SERVER: &str = "example.com/app/server";
    const CLIENT: &str = "example.com/app/client";

    fn at(file: &str, line: u32) -> Position {
        Position::new(file, line, 6)
    }

    fn program() -> Program {
        let start = Symbol::method(SERVER, "Server", "Start", at("server.go", 10));
        let run_s = Symbol::func(SERVER, "Run", at("server.go", 20));
        let run_c = Symbol::func(CLIENT, "Run", at("client.go", 5));
        let limit = Symbol::var(SERVER, "Limit", at("server.go", 3));
        ProgramBuilder::new()
            .package(
                PackageBuilder::new(SERVER, "server")
                    .func(&start, vec![])
                    .func(&run_s, vec![])
                    .value(&[limit], vec![]),
            )
            .package(PackageBuilder::new(CLIENT, "client").func(&run_c, vec![]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_full_and_short_forms() {
        let p = program();
        for q in [
            "example.com/app/server.Server.Start",
            "server.Server.Start",
            "Server.Start",
        ] {
            let sym = lookup_callable(&p, q).unwrap();
            assert_eq!(sym.qualified_name(), "example.com/app/server.Server.Start");
        }
    }

    #[test]
    fn test_ambiguous_bare_name() {
        let p = program();
        match lookup_callable(&p, "Run") {
            Err(CalltraceError::AmbiguousSymbol { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        let sym = lookup_callable(&p, "client.Run").unwrap();
        assert_eq!(sym.package.as_deref(), Some(CLIENT));
    }

    #[test]
    fn test_not_callable() {
        let p = program();
        assert!(matches!(
            lookup_callable(&p, "server.Limit"),
            Err(CalltraceError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_not_found_and_empty() {
        let p = program();
        assert!(matches!(
            lookup_callable(&p, "server.Stop"),
            Err(CalltraceError::SymbolNotFound { .. })
        ));
        assert!(matches!(
            lookup_callable(&p, "  "),
            Err(CalltraceError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_package_name_differs_from_path() {
        let f = Symbol::func("example.com/app/cmd/tool", "main", at("main.go", 3));
        let p = ProgramBuilder::new()
            .package(PackageBuilder::new("example.com/app/cmd/tool", "main").func(&f, vec![]))
            .build()
            .unwrap();
        assert!(lookup_callable(&p, "tool.main").is_ok());
        assert!(lookup_callable(&p, "main.main").is_ok());
    }
}
