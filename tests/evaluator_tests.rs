use lily::evaluator::{RuntimeError, Value};
use lily::{Environment, parse};

fn eval_src(src: &str) -> Result<Value, RuntimeError> {
    let program = parse(src).expect("parser should succeed");
    lily::eval(&program, Environment::new())
}

fn eval_ok(src: &str) -> Value {
    eval_src(src).expect("evaluation should succeed")
}

#[test]
fn evaluates_integer_arithmetic() {
    let tests = [
        ("1", 1),
        ("-1", -1),
        ("1 + 1", 2),
        ("1 - 1", 0),
        ("3 * 3", 9),
        ("9 / 3", 3),
        ("2 + 3 * 4", 14),
        ("(2 + 3) * 4", 20),
        ("7 / 2", 3),
    ];

    for (src, expected) in tests {
        assert_eq!(eval_ok(src), Value::Int(expected), "src={src:?}");
    }
}

#[test]
fn evaluates_comparisons_and_equality() {
    let tests = [
        ("2 > 1", true),
        ("1 > 1", false),
        ("1 < 2", true),
        ("1 < 1", false),
        ("1 == 1", true),
        ("1 == 2", false),
        ("1 != 2", true),
        ("1 != 1", false),
        ("true", true),
        ("false", false),
        ("!true", false),
        ("!false", true),
        ("!!true", true),
        ("true == true", true),
        ("true != false", true),
    ];

    for (src, expected) in tests {
        assert_eq!(eval_ok(src), Value::Bool(expected), "src={src:?}");
    }
}

#[test]
fn concatenates_strings() {
    let value = eval_ok("let x = \"hello\" + \" \" + \"world\"; x");
    assert_eq!(value, Value::Str("hello world".to_string()));
}

#[test]
fn if_yields_value_of_taken_branch() {
    assert_eq!(eval_ok("if (true) { 10 }"), Value::Int(10));
    assert_eq!(eval_ok("if (true) { 10 } { 20 }"), Value::Int(10));
    assert_eq!(eval_ok("if (false) { 10 } { 20 }"), Value::Int(20));
}

#[test]
fn if_without_alternative_yields_nil() {
    assert_eq!(eval_ok("if (false) { 10 }"), Value::Nil);
}

#[test]
fn top_level_return_short_circuits_program() {
    assert_eq!(eval_ok("1; return 2; 3;"), Value::Int(2));
}

#[test]
fn return_unwinds_through_nested_blocks() {
    let src = "
if (10 > 1) {
    if (10 > 1) {
        return 10;
    }
    return 1;
}";
    assert_eq!(eval_ok(src), Value::Int(10));
}

#[test]
fn let_binds_and_identifier_resolves() {
    assert_eq!(eval_ok("let x = 5; x + x"), Value::Int(10));
}

#[test]
fn let_statement_value_is_nil() {
    assert_eq!(eval_ok("let x = 5"), Value::Nil);
}

#[test]
fn assignment_value_is_nil_but_binding_updates() {
    assert_eq!(eval_ok("let a = 1; a = 2"), Value::Nil);
    assert_eq!(eval_ok("let a = 1; a = 2; a"), Value::Int(2));
}

#[test]
fn calls_function_with_arguments() {
    assert_eq!(
        eval_ok("let add = fn (a, b) { a + b }; add(3, 4)"),
        Value::Int(7)
    );
}

#[test]
fn function_body_return_is_unwrapped_at_call() {
    assert_eq!(
        eval_ok("let early = fn () { return 1; 2 }; early()"),
        Value::Int(1)
    );
}

#[test]
fn calls_function_with_no_parameters() {
    assert_eq!(eval_ok("let five = fn () { 5 }; five()"), Value::Int(5));
}

#[test]
fn functions_are_first_class() {
    let src = "
let twice = fn (f, x) { f(f(x)) };
let inc = fn (n) { n + 1 };
twice(inc, 5)";
    assert_eq!(eval_ok(src), Value::Int(7));
}

#[test]
fn immediately_invoked_function_works() {
    assert_eq!(eval_ok("fn (x) { x * 2 }(21)"), Value::Int(42));
}

#[test]
fn closures_capture_definition_environment() {
    let src = "
let make_adder = fn (x) { fn (y) { x + y } };
let add_two = make_adder(2);
add_two(40)";
    assert_eq!(eval_ok(src), Value::Int(42));
}

#[test]
fn scoping_is_lexical_not_dynamic() {
    // `f` resolves `x` through its captured chain, not the caller's
    // frame, so `g`'s parameter does not shadow it.
    let src = "
let x = 1;
let f = fn () { x };
let g = fn (x) { f() };
g(99)";
    assert_eq!(eval_ok(src), Value::Int(1));
}

#[test]
fn closure_mutates_captured_binding() {
    let src = "
let outer = 5;
let mutate = fn () { outer = 10 };
let add_outer = fn (x) { return outer + x };
mutate();
add_outer(5)";
    assert_eq!(eval_ok(src), Value::Int(15));
}

#[test]
fn closures_share_one_captured_frame() {
    let src = "
let count = 0;
let bump = fn () { count = count + 1 };
bump();
bump();
bump();
count";
    assert_eq!(eval_ok(src), Value::Int(3));
}

#[test]
fn capture_is_by_reference_not_by_copy() {
    let src = "
let x = 1;
let read = fn () { x };
x = 2;
read()";
    assert_eq!(eval_ok(src), Value::Int(2));
}

#[test]
fn recursive_function_can_reference_its_own_binding() {
    let src = "
let fib = fn (n) {
    if (n < 2) { n } { fib(n - 1) + fib(n - 2) }
};
fib(10)";
    assert_eq!(eval_ok(src), Value::Int(55));
}

#[test]
fn len_builtin_measures_strings() {
    assert_eq!(eval_ok("len(\"123\")"), Value::Int(3));
    assert_eq!(eval_ok("len(\"\")"), Value::Int(0));
}

#[test]
fn user_binding_shadows_len_builtin() {
    assert_eq!(
        eval_ok("let len = fn (x) { 1 }; len(\"123\")"),
        Value::Int(1)
    );
}

#[test]
fn empty_program_yields_nil() {
    assert_eq!(eval_ok(""), Value::Nil);
}

#[test]
fn block_statement_propagates_return_to_the_root() {
    use lily::ast::{Expr, Program, Stmt};

    // The grammar only emits blocks as `if`/`fn` bodies, but a host
    // building the AST directly gets the same propagation rules.
    let program = Program::new(vec![Stmt::Block(vec![
        Stmt::Return(Expr::Int(7)),
        Stmt::Expr(Expr::Int(8)),
    ])]);

    assert_eq!(
        lily::eval(&program, Environment::new()).expect("evaluation should succeed"),
        Value::Int(7)
    );
}
