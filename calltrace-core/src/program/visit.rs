//! Visitor over declaration bodies.
//!
//! Mirrors the `syn::visit::Visit` shape: override the hooks you need and
//! call the matching `walk_*` function to keep descending.

use super::model::{Expr, Ident, Selection};

/// Read-only visitor over an expression tree.
pub trait Visit<'p> {
    fn visit_expr(&mut self, expr: &'p Expr) {
        walk_expr(self, expr);
    }

    /// Called for every identifier use, including the selected name of a
    /// selector expression. `selection` is the receiver binding when the
    /// identifier is the `M` of `x.M`.
    fn visit_ident(&mut self, _ident: &'p Ident, _selection: Option<&'p Selection>) {}

    fn visit_call(&mut self, call: &'p Expr) {
        walk_children(self, call);
    }

    fn visit_func_lit(&mut self, lit: &'p Expr) {
        walk_children(self, lit);
    }
}

/// Dispatch one node to the visitor hooks.
pub fn walk_expr<'p, V: Visit<'p> + ?Sized>(v: &mut V, expr: &'p Expr) {
    match expr {
        Expr::Ident(ident) => v.visit_ident(ident, None),
        Expr::Selector {
            base,
            sel,
            selection,
        } => {
            v.visit_expr(base);
            v.visit_ident(sel, selection.as_ref());
        }
        Expr::Call { .. } => v.visit_call(expr),
        Expr::FuncLit { .. } => v.visit_func_lit(expr),
        _ => walk_children(v, expr),
    }
}

/// Visit every direct child of `expr`.
pub fn walk_children<'p, V: Visit<'p> + ?Sized>(v: &mut V, expr: &'p Expr) {
    for child in expr.children() {
        v.visit_expr(child);
    }
}

/// Visit a statement list.
pub fn walk_body<'p, V: Visit<'p> + ?Sized>(v: &mut V, body: &'p [Expr]) {
    for stmt in body {
        v.visit_expr(stmt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Position, Symbol};

    struct Names(Vec<String>);

    impl<'p> Visit<'p> for Names {
        fn visit_ident(&mut self, ident: &'p Ident, _selection: Option<&'p Selection>) {
            self.0.push(ident.name.clone());
        }
    }

    #[test]
    fn test_selector_visits_base_then_selected_name() {
        let pos = Position::new("a.go", 1, 1);
        let expr = Expr::Selector {
            base: Box::new(Expr::Ident(Ident {
                name: "srv".into(),
                pos: pos.clone(),
                uses: Some(Symbol::local("app", "srv", pos.clone())),
            })),
            sel: Ident {
                name: "Start".into(),
                pos: Position::new("a.go", 1, 5),
                uses: None,
            },
            selection: None,
        };
        let mut names = Names(Vec::new());
        names.visit_expr(&expr);
        assert_eq!(names.0, vec!["srv", "Start"]);
    }
}
