mod common;

use rox::ast::{Expr, ExprId, Stmt};

/// Ids of every `Variable`/`This` node reading `name`, in source order.
fn reads_of(statements: &[Stmt], name: &str) -> Vec<ExprId> {
    fn in_expr(expr: &Expr, name: &str, out: &mut Vec<ExprId>) {
        match expr {
            Expr::Variable { id, name: n } if n.lexeme == name => out.push(*id),
            Expr::This { id, keyword } if keyword.lexeme == name => out.push(*id),
            Expr::Variable { .. } | Expr::This { .. } | Expr::Literal(_) => {}
            Expr::Grouping(e) | Expr::Unary { right: e, .. } => in_expr(e, name, out),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                in_expr(left, name, out);
                in_expr(right, name, out);
            }
            Expr::Assign { value, .. } => in_expr(value, name, out),
            Expr::Call {
                callee, arguments, ..
            } => {
                in_expr(callee, name, out);
                arguments.iter().for_each(|a| in_expr(a, name, out));
            }
            Expr::Get { object, .. } => in_expr(object, name, out),
            Expr::Set { object, value, .. } => {
                in_expr(object, name, out);
                in_expr(value, name, out);
            }
        }
    }

    fn in_stmt(stmt: &Stmt, name: &str, out: &mut Vec<ExprId>) {
        match stmt {
            Stmt::Expression(e) | Stmt::Print(e) => in_expr(e, name, out),
            Stmt::Var { initializer, .. } => {
                if let Some(e) = initializer {
                    in_expr(e, name, out);
                }
            }
            Stmt::Block(body) => body.iter().for_each(|s| in_stmt(s, name, out)),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                in_expr(condition, name, out);
                in_stmt(then_branch, name, out);
                if let Some(e) = else_branch {
                    in_stmt(e, name, out);
                }
            }
            Stmt::While { condition, body } => {
                in_expr(condition, name, out);
                in_stmt(body, name, out);
            }
            Stmt::Function(f) => f.body.iter().for_each(|s| in_stmt(s, name, out)),
            Stmt::Return { value, .. } => {
                if let Some(e) = value {
                    in_expr(e, name, out);
                }
            }
            Stmt::Class { methods, .. } => methods
                .iter()
                .flat_map(|m| m.body.iter())
                .for_each(|s| in_stmt(s, name, out)),
        }
    }

    let mut out = Vec::new();
    statements.iter().for_each(|s| in_stmt(s, name, &mut out));
    out
}

/// Distances recorded for each read of `name` (`None` = global).
fn distances(source: &str, name: &str) -> Vec<Option<usize>> {
    let (statements, locals) =
        common::compile(source).unwrap_or_else(|e| panic!("static errors: {:?}", e));
    reads_of(&statements, name)
        .iter()
        .map(|id| locals.get(id).copied())
        .collect()
}

#[test]
fn globals_are_left_unresolved() {
    assert_eq!(distances("var g = 1; print g; { print g; }", "g"), vec![None, None]);
}

#[test]
fn block_locals_record_hop_counts() {
    let source = "{ var a = 1; print a; { print a; { var a = 2; print a; } } }";
    assert_eq!(distances(source, "a"), vec![Some(0), Some(1), Some(0)]);
}

#[test]
fn closures_and_parameters() {
    let source = "
        fun outer(x) {
            var y = x;
            fun inner() { return x + y; }
            return inner;
        }";
    assert_eq!(distances(source, "x"), vec![Some(0), Some(1)]);
    assert_eq!(distances(source, "y"), vec![Some(1)]);
}

#[test]
fn this_resolves_through_the_method_binding_scope() {
    let source = "
        class A {
            m() { return this; }
            n() { fun inner() { return this; } return inner; }
        }";
    assert_eq!(distances(source, "this"), vec![Some(1), Some(2)]);
}

#[test]
fn reading_a_local_in_its_own_initializer() {
    assert_eq!(
        common::static_errors("{ var a = a; }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn shadowing_an_outer_local_in_its_initializer_is_still_an_error() {
    let errors = common::static_errors("{ var a = 1; { var a = a + 1; } }");
    assert_eq!(errors.len(), 1);
}

#[test]
fn redeclaration_in_the_same_local_scope() {
    assert_eq!(
        common::static_errors("fun f() {\n  var a = 1;\n  var a = 2;\n}"),
        vec!["[line 3] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn parameters_clash_with_locals_in_the_body_scope() {
    let errors = common::static_errors("fun f(a, a) {}");
    assert_eq!(errors.len(), 1);
}

#[test]
fn global_redeclaration_is_allowed() {
    assert!(common::compile("var a = 1; var a = 2; var b = b;").is_ok());
}

#[test]
fn return_outside_function() {
    assert_eq!(
        common::static_errors("return 1;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn this_outside_class() {
    assert_eq!(
        common::static_errors("fun f() { return this; }"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
}

#[test]
fn errors_are_collected_not_fatal() {
    let source = "return;\n{ var b = b; }\n{ var c; var c; }\nprint this;";
    let errors = common::static_errors(source);

    assert_eq!(errors.len(), 4);
    assert!(errors[0].starts_with("[line 1]"));
    assert!(errors[1].starts_with("[line 2]"));
    assert!(errors[2].starts_with("[line 3]"));
    assert!(errors[3].starts_with("[line 4]"));
}
