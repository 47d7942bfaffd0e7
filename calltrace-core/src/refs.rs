//! Reference classification.
//!
//! For a target symbol, finds every identifier use that resolves to it and
//! tags each one as a `call` (the identifier sits in called-function
//! position) or `non_call` (the function escapes: stored in a struct field,
//! passed as a callback, assigned, returned, or taken as a method value).
//!
//! Escaping references matter for exhaustiveness: once a function value
//! escapes, it may be invoked from code the call graph cannot see.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::program::{
    body_units, walk_body, walk_children, Expr, Ident, Position, Program, Selection, Symbol, Visit,
};
use crate::resolve::call_position;
use crate::scope::ScopeFilter;
use crate::symbol::same_symbol;

/// Whether a reference invokes the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    NonCall,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Call => "call",
            Self::NonCall => "non-call",
        })
    }
}

/// One identifier occurrence resolving to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Qualified name of the innermost enclosing declaration.
    pub context: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub kind: ReferenceKind,
}

/// Every reference to `target` inside packages admitted by `scope`.
pub fn find_references(program: &Program, target: &Symbol, scope: &ScopeFilter) -> Vec<Reference> {
    let mut out = Vec::new();
    for package in scope.packages(program) {
        for unit in body_units(package) {
            classify_body(unit.owner, unit.body, target, &mut out);
        }
    }
    out
}

/// Only the escaping (non-call) references to `target`.
pub fn find_non_call_references(
    program: &Program,
    target: &Symbol,
    scope: &ScopeFilter,
) -> Vec<Reference> {
    find_references(program, target, scope)
        .into_iter()
        .filter(|r| r.kind == ReferenceKind::NonCall)
        .collect()
}

/// Classify the references to `target` within one declaration body.
pub fn classify_body(owner: &Symbol, body: &[Expr], target: &Symbol, out: &mut Vec<Reference>) {
    let mut positions = CallPositions::default();
    walk_body(&mut positions, body);

    let mut classifier = Classifier {
        target,
        context: owner.qualified_name(),
        calls: &positions.0,
        out,
    };
    walk_body(&mut classifier, body);
}

/// First pass: positions of identifiers in called-function position.
#[derive(Default)]
struct CallPositions<'p>(HashSet<&'p Position>);

impl<'p> Visit<'p> for CallPositions<'p> {
    fn visit_call(&mut self, call: &'p Expr) {
        if let Some(pos) = call_position(call) {
            self.0.insert(pos);
        }
        walk_children(self, call);
    }
}

/// Second pass: every identifier bound to the target.
struct Classifier<'a, 'p> {
    target: &'a Symbol,
    context: String,
    calls: &'a HashSet<&'p Position>,
    out: &'a mut Vec<Reference>,
}

impl<'a, 'p> Visit<'p> for Classifier<'a, 'p> {
    fn visit_ident(&mut self, ident: &'p Ident, selection: Option<&'p Selection>) {
        let bound = selection.map(|s| &s.target).or(ident.uses.as_ref());
        let Some(symbol) = bound else { return };
        if !same_symbol(symbol, self.target) {
            return;
        }
        let kind = if self.calls.contains(&ident.pos) {
            ReferenceKind::Call
        } else {
            ReferenceKind::NonCall
        };
        self.out.push(Reference {
            context: self.context.clone(),
            file: ident.pos.file.clone(),
            line: ident.pos.line,
            column: ident.pos.column,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{PackageBuilder, ProgramBuilder};
    use crate::scope::Scope;

    const APP: &str = "example.com/app";

    fn at(line: u32, col: u32) -> Position {
        Position::new("app.go", line, col)
    }

    #[test]
    fn test_call_and_escape_in_same_body() {
        let target = Symbol::func(APP, "work", at(1, 6));
        let register = Symbol::func(APP, "register", at(2, 6));
        let main = Symbol::func(APP, "main", at(3, 6));

        // work(); register(work)
        let body = vec![
            Expr::call_of(&target, at(4, 2)),
            Expr::call(Expr::use_of(&register, at(5, 2)), vec![Expr::use_of(&target, at(5, 11))], at(5, 2)),
        ];
        let program = ProgramBuilder::new()
            .package(
                PackageBuilder::new(APP, "main")
                    .func(&target, vec![])
                    .func(&register, vec![])
                    .func(&main, body),
            )
            .build()
            .unwrap();
        let scope = ScopeFilter::new(&program, Scope::All, APP);

        let refs = find_references(&program, &target, &scope);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].kind, ReferenceKind::Call);
        assert_eq!(refs[0].line, 4);
        assert_eq!(refs[1].kind, ReferenceKind::NonCall);
        assert_eq!(refs[1].column, 11);
        assert!(refs.iter().all(|r| r.context == "example.com/app.main"));

        let escaping = find_non_call_references(&program, &target, &scope);
        assert_eq!(escaping.len(), 1);
        assert_eq!(escaping[0].line, 5);
    }

    #[test]
    fn test_method_value_is_non_call() {
        let close = Symbol::method(APP, "Conn", "Close", at(1, 16));
        let conn = Symbol::local(APP, "c", at(3, 2));
        let main = Symbol::func(APP, "main", at(2, 6));
        // defer c.Close(); cleanup := c.Close
        let body = vec![
            Expr::stmt(
                "defer",
                vec![Expr::call(Expr::method_value(Expr::use_of(&conn, at(4, 8)), &close, at(4, 10)), vec![], at(4, 8))],
            ),
            Expr::stmt("assign", vec![Expr::method_value(Expr::use_of(&conn, at(5, 13)), &close, at(5, 15))]),
        ];
        let program = ProgramBuilder::new()
            .package(PackageBuilder::new(APP, "main").func(&close, vec![]).func(&main, body))
            .build()
            .unwrap();
        let scope = ScopeFilter::new(&program, Scope::All, APP);

        let kinds: Vec<ReferenceKind> = find_references(&program, &close, &scope)
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec![ReferenceKind::Call, ReferenceKind::NonCall]);
    }

    #[test]
    fn test_call_inside_literal_keeps_enclosing_declaration() {
        let target = Symbol::func(APP, "tick", at(1, 6));
        let run = Symbol::method(APP, "Loop", "Run", at(2, 16));
        let body = vec![Expr::stmt(
            "go",
            vec![Expr::call(Expr::func_lit(at(3, 5), vec![Expr::call_of(&target, at(4, 3))]), vec![], at(3, 5))],
        )];
        let program = ProgramBuilder::new()
            .package(PackageBuilder::new(APP, "main").func(&target, vec![]).func(&run, body))
            .build()
            .unwrap();
        let scope = ScopeFilter::new(&program, Scope::All, APP);

        let refs = find_references(&program, &target, &scope);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].context, "example.com/app.Loop.Run");
        assert_eq!(refs[0].kind, ReferenceKind::Call);
    }

    #[test]
    fn test_generic_instantiation_is_call() {
        let map = Symbol::func(APP, "Map", at(1, 6));
        let int = Symbol::type_name("", "int", Position::new("builtin.go", 1, 1));
        let main = Symbol::func(APP, "main", at(2, 6));
        // Map[int](); h := Map[int]
        let body = vec![
            Expr::call(Expr::index(Expr::use_of(&map, at(3, 2)), vec![Expr::use_of(&int, at(3, 6))]), vec![], at(3, 2)),
            Expr::stmt("assign", vec![Expr::index(Expr::use_of(&map, at(4, 7)), vec![Expr::use_of(&int, at(4, 11))])]),
        ];
        let program = ProgramBuilder::new()
            .package(PackageBuilder::new(APP, "main").func(&map, vec![]).func(&main, body))
            .build()
            .unwrap();
        let scope = ScopeFilter::new(&program, Scope::All, APP);

        let refs = find_references(&program, &map, &scope);
        assert_eq!(refs.len(), 2);
        assert_eq!((refs[0].line, refs[0].kind), (3, ReferenceKind::Call));
        assert_eq!((refs[1].line, refs[1].kind), (4, ReferenceKind::NonCall));
    }

    #[test]
    fn test_package_level_initializer_context() {
        let target = Symbol::func(APP, "defaultHandler", at(1, 6));
        let table = Symbol::var(APP, "routes", at(5, 5));
        let program = ProgramBuilder::new()
            .package(
                PackageBuilder::new(APP, "main")
                    .func(&target, vec![])
                    .value(&[table.clone()], vec![Expr::composite(None, vec![Expr::use_of(&target, at(6, 12))])]),
            )
            .build()
            .unwrap();
        let scope = ScopeFilter::new(&program, Scope::All, APP);

        let refs = find_non_call_references(&program, &target, &scope);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].context, "example.com/app.routes");
    }

    #[test]
    fn test_scope_limits_packages() {
        let lib = "example.com/lib";
        let target = Symbol::func(lib, "F", Position::new("lib.go", 1, 6));
        let user = Symbol::func(APP, "main", at(1, 6));
        let program = ProgramBuilder::new()
            .package(
                PackageBuilder::new(APP, "main").func(
                    &user,
                    vec![Expr::call(
                        Expr::qualified("lib", &target, at(2, 2), at(2, 6)),
                        vec![],
                        at(2, 2),
                    )],
                ),
            )
            .package(PackageBuilder::new(lib, "lib").func(&target, vec![]))
            .build()
            .unwrap();

        let everywhere = ScopeFilter::new(&program, Scope::All, lib);
        assert_eq!(find_references(&program, &target, &everywhere).len(), 1);

        let own_package = ScopeFilter::new(&program, Scope::Package, lib);
        assert!(find_references(&program, &target, &own_package).is_empty());
    }
}
