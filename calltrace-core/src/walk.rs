//! Call graph walking.
//!
//! Applies [`resolve_call`] across a scope and yields [`Call`] records.
//! Walks are plain iterators: stop early with `find`, `take_while` or
//! `break`, and nothing is materialized unless the caller collects.
//!
//! Calls are not pre-indexed; every walk re-reads the loaded bodies, which
//! keeps memory flat and lets any number of walks share one [`Program`].

use crate::program::{body_units, BodyUnit, Descendants, Expr, Package, Position, Program, Symbol};
use crate::resolve::{resolve_call, Callee, Resolution};

/// One call expression with its resolved (or explicitly unresolved) callee.
#[derive(Debug, Clone, Copy)]
pub struct Call<'p> {
    /// Declaration whose body contains the call.
    pub caller: &'p Symbol,
    /// Package of the caller.
    pub package: &'p Package,
    pub callee: Callee<'p>,
    /// Position of the call expression.
    pub site: &'p Position,
}

/// Iterator over the calls of one body unit.
pub struct CallsIn<'p> {
    unit: BodyUnit<'p>,
    nodes: Descendants<'p>,
}

impl<'p> CallsIn<'p> {
    pub fn new(unit: BodyUnit<'p>) -> Self {
        Self {
            unit,
            nodes: Descendants::of_body(unit.body),
        }
    }
}

impl<'p> Iterator for CallsIn<'p> {
    type Item = Call<'p>;

    fn next(&mut self) -> Option<Call<'p>> {
        for expr in self.nodes.by_ref() {
            let Expr::Call { pos, .. } = expr else { continue };
            match resolve_call(expr) {
                Some(Resolution::Call(callee)) => {
                    return Some(Call {
                        caller: self.unit.owner,
                        package: self.unit.package,
                        callee,
                        site: pos,
                    })
                }
                Some(Resolution::Conversion) | None => continue,
            }
        }
        None
    }
}

/// All calls inside the body of the function or method `decl`, including
/// calls inside nested function literals. Empty if `decl` has no body in
/// `program`.
pub fn calls_in<'p>(program: &'p Program, decl: &Symbol) -> impl Iterator<Item = Call<'p>> + 'p {
    let unit = program.func_decl(decl).and_then(|func| {
        let package = program.package_of(&func.symbol)?;
        let body = func.body.as_deref()?;
        Some(BodyUnit {
            package,
            owner: &func.symbol,
            body,
        })
    });
    unit.into_iter().flat_map(CallsIn::new)
}

/// All calls in every declaration of `packages`, package by package.
pub fn calls_across<'p, I>(packages: I) -> impl Iterator<Item = Call<'p>>
where
    I: IntoIterator<Item = &'p Package>,
{
    packages
        .into_iter()
        .flat_map(body_units)
        .flat_map(CallsIn::new)
}

/// All calls of one package.
pub fn calls_in_package(package: &Package) -> impl Iterator<Item = Call<'_>> {
    body_units(package).flat_map(CallsIn::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{PackageBuilder, ProgramBuilder};
    use crate::symbol::same_symbol;

    const APP: &str = "example.com/app";

    fn at(line: u32) -> Position {
        Position::new("app.go", line, 2)
    }

    #[test]
    fn test_calls_in_source_order_with_literals() {
        let a = Symbol::func(APP, "A", at(1));
        let b = Symbol::func(APP, "B", at(10));
        let c = Symbol::func(APP, "C", at(20));
        let len = Symbol::builtin("len");

        let program = ProgramBuilder::new()
            .package(
                PackageBuilder::new(APP, "app")
                    .func(
                        &a,
                        vec![
                            Expr::call_of(&b, at(2)),
                            Expr::stmt(
                                "go",
                                vec![Expr::call(
                                    Expr::func_lit(at(3), vec![Expr::call_of(&c, at(4))]),
                                    vec![],
                                    at(3),
                                )],
                            ),
                            Expr::call_of(&len, at(5)),
                        ],
                    )
                    .func(&b, vec![])
                    .func(&c, vec![]),
            )
            .build()
            .unwrap();

        let calls: Vec<Call> = calls_in(&program, &a).collect();
        let lines: Vec<u32> = calls.iter().map(|c| c.site.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 5]);
        assert!(same_symbol(calls[0].callee.symbol().unwrap(), &b));
        assert!(!calls[1].callee.is_resolved());
        assert!(same_symbol(calls[2].callee.symbol().unwrap(), &c));
        assert!(same_symbol(calls[2].caller, &a));
        assert!(!calls[3].callee.is_resolved());
    }

    #[test]
    fn test_calls_across_includes_initializers() {
        let f = Symbol::func(APP, "F", at(1));
        let v = Symbol::var(APP, "cfg", at(8));
        let program = ProgramBuilder::new()
            .package(
                PackageBuilder::new(APP, "app")
                    .func(&f, vec![])
                    .value(&[v.clone()], vec![Expr::call_of(&f, at(8))]),
            )
            .build()
            .unwrap();

        let calls: Vec<Call> = calls_across(program.packages()).collect();
        assert_eq!(calls.len(), 1);
        assert!(same_symbol(calls[0].caller, &v));
        assert!(same_symbol(calls[0].callee.symbol().unwrap(), &f));
    }

    #[test]
    fn test_early_exit() {
        let f = Symbol::func(APP, "F", at(1));
        let g = Symbol::func(APP, "G", at(30));
        let body: Vec<Expr> = (2..20).map(|l| Expr::call_of(&g, at(l))).collect();
        let program = ProgramBuilder::new()
            .package(PackageBuilder::new(APP, "app").func(&f, body).func(&g, vec![]))
            .build()
            .unwrap();

        let first = calls_in(&program, &f).find(|c| c.site.line >= 5).unwrap();
        assert_eq!(first.site.line, 5);
    }

    #[test]
    fn test_no_body_yields_nothing() {
        let f = Symbol::func(APP, "F", at(1));
        let program = ProgramBuilder::new()
            .package(PackageBuilder::new(APP, "app").external_func(&f))
            .build()
            .unwrap();
        assert_eq!(calls_in(&program, &f).count(), 0);
        assert_eq!(calls_in_package(&program.packages()[0]).count(), 0);
    }
}
