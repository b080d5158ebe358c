mod common;

use common::{on_large_stack, run, run_err, Session};
use rox::error::LoxError;
use rox::interpreter::MAX_CALL_DEPTH;

fn runtime_message(source: &str) -> String {
    let (_, err) = run_err(source);
    assert!(matches!(err, LoxError::Runtime { .. }), "not a runtime error: {:?}", err);
    err.to_string()
}

#[test]
fn arithmetic_and_division_by_zero() {
    assert_eq!(run("print 1 + 2 * 3 - 4 / 2;"), "5\n");
    assert_eq!(run("print 1 / 0; print -1 / 0; print 0 / 0;"), "Infinity\n-Infinity\nNaN\n");
}

#[test]
fn stringification() {
    let source = r#"
        print nil;
        print true;
        print 3;
        print 3.25;
        print "s";
        print clock;
        fun f() {}
        print f;
        class K {}
        print K;
        print K();
    "#;
    assert_eq!(
        run(source),
        "nil\ntrue\n3\n3.25\ns\n<native fn>\n<fn f>\nK\nK instance\n"
    );
}

#[test]
fn string_concatenation_formats_numbers() {
    assert_eq!(
        run(r#"print "value:" + 4; print "value:" + 4.5; print 2 + "x"; print "a" + "b";"#),
        "value:4\nvalue:4.5\n2x\nab\n"
    );
}

#[test]
fn truthiness_and_logical_operators() {
    let source = r#"
        if (0) print "zero";
        if ("") print "empty";
        if (nil) print "nil"; else print "no nil";
        print !nil;
        print nil or "default";
        print 0 and "right";
        print false and undefinedName;
        print "left" or undefinedName;
    "#;
    assert_eq!(
        run(source),
        "zero\nempty\nno nil\ntrue\ndefault\nright\nfalse\nleft\n"
    );
}

#[test]
fn equality() {
    let source = r#"
        print 1 == 1;
        print "a" == "a";
        print nil == false;
        print 1 != 2;
        print 1 != 1;
        print nil == nil;
        print 1 == "1";
    "#;
    assert_eq!(run(source), "true\ntrue\nfalse\ntrue\nfalse\ntrue\nfalse\n");

    let source = "
        var nan = 0 / 0;
        print nan == nan;
        print nan != nan;
        print 0 == -0;
        print 0 != -0;
        print -0 == -0;";
    assert_eq!(run(source), "true\nfalse\nfalse\ntrue\ntrue\n");
}

#[test]
fn block_scoping_and_shadowing() {
    assert_eq!(run("var a = 1; { var a = 2; print a; } print a;"), "2\n1\n");
    assert_eq!(run("var a = 1; { a = 2; } print a;"), "2\n");
}

#[test]
fn control_flow() {
    assert_eq!(run("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
    assert_eq!(run("var i = 3; while (i > 0) { print i; i = i - 1; }"), "3\n2\n1\n");

    let fib = "
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);";
    assert_eq!(run(fib), "55\n");
}

#[test]
fn counters_keep_independent_state() {
    let source = "
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }
        var a = makeCounter();
        var b = makeCounter();
        print a();
        print a();
        print b();";
    assert_eq!(run(source), "1\n2\n1\n");
}

#[test]
fn closures_share_their_captured_variable() {
    let source = "
        var inc;
        var get;
        {
            var n = 0;
            fun i() { n = n + 1; }
            fun g() { return n; }
            inc = i;
            get = g;
        }
        inc();
        inc();
        print get();";
    assert_eq!(run(source), "2\n");
}

#[test]
fn closures_bind_to_the_declaration_in_scope() {
    let source = r#"
        var a = "global";
        {
            fun showA() { print a; }
            showA();
            var a = "block";
            showA();
        }"#;
    assert_eq!(run(source), "global\nglobal\n");
}

#[test]
fn return_unwinds_exactly_one_call() {
    let source = r#"
        fun inner() { return "inner"; }
        fun outer() {
            var r = inner();
            print "after " + r;
            return "outer";
        }
        print outer();"#;
    assert_eq!(run(source), "after inner\nouter\n");
}

#[test]
fn return_from_inside_loops_and_blocks() {
    let source = "
        fun f() {
            var i = 0;
            while (true) {
                i = i + 1;
                if (i == 3) return i;
            }
        }
        print f();
        fun g() {}
        print g();";
    assert_eq!(run(source), "3\nnil\n");

    let source = r#"
        var a = "global";
        fun h() { { var a = "local"; return a; } }
        print h();
        print a;"#;
    assert_eq!(run(source), "local\nglobal\n");
}

#[test]
fn arity_mismatch_is_checked_before_the_body_runs() {
    let mut session = Session::new();

    let err = session
        .run("var ran = false;\nfun f(a, b) { ran = true; }\nf(1);")
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected 2 arguments but got 1.\n[line 3]");

    session.run("print ran;").unwrap();
    assert_eq!(session.output(), "false\n");
}

#[test]
fn runtime_errors_report_message_and_line() {
    let (output, err) = run_err("print 1;\nprint -\"a\";\nprint 2;");
    assert_eq!(output, "1\n");
    assert_eq!(err.to_string(), "Operand must be a number.\n[line 2]");
    assert_eq!(err.exit_code(), 70);

    assert_eq!(runtime_message("print 1 < \"a\";"), "Operands must be numbers.\n[line 1]");
    assert_eq!(
        runtime_message("print 1 + nil;"),
        "Operands must be two numbers or two strings.\n[line 1]"
    );
    assert_eq!(runtime_message("print nope;"), "Undefined variable 'nope'.\n[line 1]");
    assert_eq!(runtime_message("nope = 1;"), "Undefined variable 'nope'.\n[line 1]");
    assert_eq!(
        runtime_message("\"str\"();"),
        "Can only call functions and classes.\n[line 1]"
    );
    assert_eq!(
        runtime_message("var n = 1;\nprint n.x;"),
        "Only instances have properties.\n[line 2]"
    );
    assert_eq!(
        runtime_message("var n = 1;\nn.x = 2;"),
        "Only instances have fields.\n[line 2]"
    );
    assert_eq!(
        runtime_message("class A {}\nprint A().nope;"),
        "Undefined property 'nope'.\n[line 2]"
    );
}

#[test]
fn global_self_reference_fails_at_runtime() {
    assert_eq!(runtime_message("var a = a;"), "Undefined variable 'a'.\n[line 1]");
}

#[test]
fn environment_is_restored_after_a_runtime_error() {
    let mut session = Session::new();

    assert!(session.run("var x = 1; { var x = 2; print nope; }").is_err());

    // A leaked block scope would receive `y`, and the global read would fail.
    session.run("var y = 3; print y; print x;").unwrap();
    assert_eq!(session.output(), "3\n1\n");
}

#[test]
fn resolutions_from_separate_programs_do_not_collide() {
    let mut session = Session::new();

    session.run("fun f(x) { { return x; } }").unwrap();
    session.run("{ var y = 5; print f(y); }").unwrap();

    assert_eq!(session.output(), "5\n");
}

#[test]
fn finished_lines_release_their_resolutions() {
    let mut session = Session::new();

    session.run("fun f(x) { { return x; } }").unwrap();
    assert_eq!(session.resolved_locals(), 1);

    session.run("{ var y = 5; { print f(y) + y; } }").unwrap();
    assert_eq!(session.resolved_locals(), 1);

    // Closures created by an earlier line still resolve their captures.
    session
        .run("var get; { var n = 7; fun g() { return n; } get = g; }")
        .unwrap();
    assert_eq!(session.resolved_locals(), 2);

    session.run("print f(2); print get();").unwrap();
    assert_eq!(session.output(), "10\n2\n7\n");
}

#[test]
fn deep_recursion_succeeds() {
    let output = on_large_stack(|| {
        run("fun depth(n) { if (n == 0) return 0; return depth(n - 1) + 1; } print depth(2000);")
    });
    assert_eq!(output, "2000\n");
}

#[test]
fn unbounded_recursion_is_a_runtime_error() {
    let (depth, message, after) = on_large_stack(|| {
        let mut session = Session::new();
        let err = session
            .run("var calls = 0;\nfun f() { calls = calls + 1; f(); }\nf();")
            .unwrap_err();

        // The depth counter unwinds with the error; calls work again.
        session.run("print calls; fun g() { return \"ok\"; } print g();").unwrap();
        let output = session.output();
        let mut lines = output.lines();
        let depth: usize = lines.next().unwrap().parse().unwrap();
        let after = lines.next().unwrap().to_string();
        (depth, err.to_string(), after)
    });

    assert_eq!(message, "Stack overflow.\n[line 2]");
    assert_eq!(depth, MAX_CALL_DEPTH);
    assert_eq!(after, "ok");
}

#[test]
fn initializer_sets_fields() {
    let source = "
        class Point {
            init(x, y) {
                this.x = x;
                this.y = y;
            }
        }
        var p = Point(1, 2);
        print p.x + p.y;
        print p;";
    assert_eq!(run(source), "3\nPoint instance\n");
}

#[test]
fn initializer_always_yields_the_instance() {
    assert_eq!(run("class A { init() { return 5; } } print A();"), "A instance\n");
    assert_eq!(
        run("class A { init() { this.v = 1; } } var a = A(); print a.init(); print a.v;"),
        "A instance\n1\n"
    );
}

#[test]
fn class_arity_follows_init() {
    assert_eq!(
        runtime_message("class P { init(a) {} }\nP();"),
        "Expected 1 arguments but got 0.\n[line 2]"
    );
    assert_eq!(
        runtime_message("class E {}\nE(1);"),
        "Expected 0 arguments but got 1.\n[line 2]"
    );
}

#[test]
fn stored_bound_method_keeps_its_receiver() {
    let source = "
        class C {
            init() { this.n = 7; }
            get() { return this.n; }
        }
        var c = C();
        var m = c.get;
        c.n = 8;
        print m();
        print c.get();";
    assert_eq!(run(source), "8\n8\n");
}

#[test]
fn each_property_read_binds_a_new_method() {
    let source = "
        class A { m() {} }
        var a = A();
        print a.m == a.m;
        var m = a.m;
        print m == m;
        print a == a;
        print a == A();";
    assert_eq!(run(source), "false\ntrue\ntrue\nfalse\n");
}

#[test]
fn fields_shadow_methods_without_replacing_them() {
    let source = r#"
        class A { m() { return "method"; } }
        var a = A();
        a.m = "field";
        print a.m;
        var b = A();
        print b.m();"#;
    assert_eq!(run(source), "field\nmethod\n");
}

#[test]
fn methods_see_their_defining_scope() {
    let source = "
        fun make() {
            var secret = 42;
            class Box {
                reveal() { return secret; }
            }
            return Box();
        }
        print make().reveal();";
    assert_eq!(run(source), "42\n");
}

#[test]
fn this_is_captured_by_nested_functions() {
    let source = r#"
        class Greeter {
            init(name) { this.name = name; }
            greeter() {
                fun greet() { return "hi " + this.name; }
                return greet;
            }
        }
        print Greeter("lox").greeter()();"#;
    assert_eq!(run(source), "hi lox\n");
}

#[test]
fn clock_returns_seconds() {
    assert_eq!(run("var t = clock(); print t > 1000000000; print clock() >= t;"), "true\ntrue\n");
    assert_eq!(
        runtime_message("clock(1);"),
        "Expected 0 arguments but got 1.\n[line 1]"
    );
}
