use pseudoc::error::{Error, RuntimeError, TypeError};
use pseudoc::interpreter::{self, Env};
use pseudoc::lexer::Lexer;
use pseudoc::parser::{parse, ParseState};

fn run_source(source: &str) -> Result<String, Error> {
    let lexer = Lexer::lex(source)?;
    let mut state = ParseState::new(lexer.into_tokens());
    let program = parse(&mut state)?;
    let mut env = Env::new(Vec::new());
    interpreter::run(&program, &mut env)?;
    Ok(String::from_utf8(env.into_output()).expect("output should be UTF-8"))
}

fn output_of(source: &str) -> String {
    match run_source(source) {
        Ok(output) => output,
        Err(e) => panic!("program failed: {e}"),
    }
}

#[test]
fn arithmetic_with_precedence() {
    let output = output_of(
        "DECLARE x : INTEGER\n\
         x <- 3 + 4 * 2\n\
         OUTPUT x",
    );
    assert_eq!(output, "11\n");
}

#[test]
fn array_elements_read_back() {
    let output = output_of(
        "DECLARE a : ARRAY[1:3] OF INTEGER\n\
         a[1] <- 10\n\
         a[2] <- 20\n\
         a[3] <- 30\n\
         OUTPUT a[2]",
    );
    assert_eq!(output, "20\n");
}

#[test]
fn out_of_bounds_index_fails() {
    let err = run_source(
        "DECLARE a : ARRAY[1:3] OF INTEGER\n\
         OUTPUT a[4]",
    )
    .unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeError::IndexOutOfBounds(4))),
        "{err}"
    );
    let err = run_source(
        "DECLARE a : ARRAY[1:3] OF INTEGER\n\
         a[0] <- 1",
    )
    .unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeError::IndexOutOfBounds(0))),
        "{err}"
    );
}

#[test]
fn division_is_exact() {
    let output = output_of(
        "DECLARE r : REAL\n\
         r <- 1 / 3\n\
         OUTPUT r",
    );
    assert_eq!(output, "1/3\n");
}

#[test]
fn recursive_factorial() {
    let output = output_of(
        "FUNCTION fact(n : INTEGER) RETURNS INTEGER\n\
         IF n <= 1 THEN RETURN 1 ELSE RETURN n * fact(n - 1) ENDIF\n\
         ENDFUNCTION\n\
         OUTPUT fact(5)",
    );
    assert_eq!(output, "120\n");
}

#[test]
fn descending_for_loop() {
    let output = output_of(
        "FOR i <- 10 TO 1 STEP -2\n\
         OUTPUT i\n\
         NEXT i",
    );
    assert_eq!(output, "10\n8\n6\n4\n2\n");
}

#[test]
fn for_direction_comes_from_the_endpoints() {
    // Endpoint order says descending, default step +1: zero iterations.
    let output = output_of(
        "FOR i <- 5 TO 1\n\
         OUTPUT i\n\
         NEXT i\n\
         OUTPUT \"done\"",
    );
    assert_eq!(output, "done\n");
}

#[test]
fn for_loop_iteration_counts() {
    for (from, to, step, expected) in [
        (1i64, 10i64, 1i64, 10usize),
        (1, 10, 3, 4),
        (10, 1, -1, 10),
        (10, 1, -4, 3),
        (3, 3, 1, 1),
    ] {
        let source = format!(
            "FOR i <- {from} TO {to} STEP {step}\nOUTPUT i\nNEXT i"
        );
        let output = output_of(&source);
        assert_eq!(
            output.lines().count(),
            expected,
            "FOR {from} TO {to} STEP {step}"
        );
    }
}

#[test]
fn for_loop_in_rationals() {
    let output = output_of(
        "FOR r <- 1 TO 2 STEP 0.5\n\
         OUTPUT r\n\
         NEXT r",
    );
    assert_eq!(output, "1\n3/2\n2\n");
}

#[test]
fn for_loop_variable_is_shadowed_and_restored() {
    let output = output_of(
        "DECLARE i : INTEGER\n\
         i <- 99\n\
         FOR i <- 1 TO 3\n\
         OUTPUT i\n\
         NEXT i\n\
         OUTPUT i",
    );
    assert_eq!(output, "1\n2\n3\n99\n");
}

#[test]
fn while_loop() {
    let output = output_of(
        "DECLARE x : INTEGER\n\
         x <- 0\n\
         WHILE x < 3\n\
         x <- x + 1\n\
         OUTPUT x\n\
         ENDWHILE",
    );
    assert_eq!(output, "1\n2\n3\n");
}

#[test]
fn repeat_runs_the_body_before_testing() {
    let output = output_of(
        "DECLARE x : INTEGER\n\
         x <- 10\n\
         REPEAT\n\
         OUTPUT x\n\
         x <- x + 1\n\
         UNTIL x > 10",
    );
    assert_eq!(output, "10\n");
}

#[test]
fn case_selects_the_first_match() {
    let source = |x: i64| {
        format!(
            "DECLARE x : INTEGER\n\
             x <- {x}\n\
             CASE OF x\n\
             1 : OUTPUT \"one\"\n\
             2 : OUTPUT \"two\"\n\
             OTHERWISE OUTPUT \"many\"\n\
             ENDCASE"
        )
    };
    assert_eq!(output_of(&source(1)), "one\n");
    assert_eq!(output_of(&source(2)), "two\n");
    assert_eq!(output_of(&source(7)), "many\n");
}

#[test]
fn case_promotes_between_integer_and_real() {
    let output = output_of(
        "DECLARE x : INTEGER\n\
         x <- 2\n\
         CASE OF x\n\
         2.0 : OUTPUT \"matched\"\n\
         ENDCASE",
    );
    assert_eq!(output, "matched\n");
}

#[test]
fn case_without_otherwise_can_fall_through() {
    let output = output_of(
        "DECLARE x : INTEGER\n\
         x <- 9\n\
         CASE OF x\n\
         1 : OUTPUT \"one\"\n\
         ENDCASE\n\
         OUTPUT \"after\"",
    );
    assert_eq!(output, "after\n");
}

#[test]
fn output_renders_every_scalar_kind() {
    let output = output_of("OUTPUT 1, \"a\", TRUE, FALSE, 1.5");
    assert_eq!(output, "1aTRUEFALSE3/2\n");
}

#[test]
fn declared_scalars_have_default_values() {
    let output = output_of(
        "DECLARE n : INTEGER\n\
         DECLARE s : STRING\n\
         DECLARE b : BOOLEAN\n\
         DECLARE d : DATE\n\
         OUTPUT n\n\
         OUTPUT s\n\
         OUTPUT b\n\
         OUTPUT d",
    );
    assert_eq!(output, "0\n\nFALSE\n1970-01-01\n");
}

#[test]
fn constants_bind_their_evaluated_type() {
    let output = output_of(
        "CONSTANT pi = 3.14\n\
         OUTPUT pi",
    );
    assert_eq!(output, "157/50\n");
}

#[test]
fn integer_real_comparisons_are_symmetric() {
    let output = output_of(
        "OUTPUT 2 = 2.0\n\
         OUTPUT 2.0 = 2\n\
         OUTPUT 3 < 2.5\n\
         OUTPUT 2.5 < 3",
    );
    assert_eq!(output, "TRUE\nTRUE\nFALSE\nTRUE\n");
}

#[test]
fn logical_operators_evaluate_both_sides() {
    let output = output_of(
        "FUNCTION noisy(v : BOOLEAN) RETURNS BOOLEAN\n\
         OUTPUT \"eval\"\n\
         RETURN v\n\
         ENDFUNCTION\n\
         OUTPUT noisy(FALSE) AND noisy(TRUE)",
    );
    assert_eq!(output, "eval\neval\nFALSE\n");
}

#[test]
fn mixed_arithmetic_stays_rational() {
    let output = output_of(
        "DECLARE r : REAL\n\
         r <- 0.1 + 2\n\
         OUTPUT r\n\
         OUTPUT 1 / 3 + 1 / 6",
    );
    assert_eq!(output, "21/10\n1/2\n");
}

#[test]
fn integer_div_and_mod() {
    let output = output_of(
        "OUTPUT 7 DIV 2\n\
         OUTPUT 7 MOD 2\n\
         OUTPUT -7 DIV 2\n\
         OUTPUT -7 MOD 2",
    );
    assert_eq!(output, "3\n1\n-3\n-1\n");
}

#[test]
fn division_by_zero_fails() {
    for source in ["OUTPUT 1 / 0", "OUTPUT 1 DIV 0", "OUTPUT 1 MOD 0"] {
        let err = run_source(source).unwrap_err();
        assert!(
            matches!(err, Error::Runtime(RuntimeError::Arith(_))),
            "{source}: {err}"
        );
    }
}

#[test]
fn two_dimensional_arrays() {
    let output = output_of(
        "DECLARE grid : ARRAY[1:2, 1:3] OF INTEGER\n\
         DECLARE i : INTEGER\n\
         DECLARE j : INTEGER\n\
         FOR i <- 1 TO 2\n\
         FOR j <- 1 TO 3\n\
         grid[i, j] <- i * 10 + j\n\
         NEXT j\n\
         NEXT i\n\
         OUTPUT grid[2, 3]",
    );
    assert_eq!(output, "23\n");
}

#[test]
fn array_bounds_may_be_expressions() {
    let output = output_of(
        "DECLARE a : ARRAY[1:2 + 1] OF INTEGER\n\
         a[3] <- 7\n\
         OUTPUT a[3]",
    );
    assert_eq!(output, "7\n");
}

#[test]
fn procedures_run_via_call() {
    let output = output_of(
        "PROCEDURE shout(what : STRING)\n\
         OUTPUT what\n\
         ENDPROCEDURE\n\
         CALL shout(\"hey\")",
    );
    assert_eq!(output, "hey\n");
}

#[test]
fn call_discards_a_function_result() {
    let output = output_of(
        "FUNCTION five() RETURNS INTEGER\n\
         OUTPUT \"ran\"\n\
         RETURN 5\n\
         ENDFUNCTION\n\
         CALL five",
    );
    assert_eq!(output, "ran\n");
}

#[test]
fn parameters_shadow_and_restore_globals() {
    let output = output_of(
        "DECLARE n : STRING\n\
         n <- \"outer\"\n\
         FUNCTION double(n : INTEGER) RETURNS INTEGER\n\
         RETURN n + n\n\
         ENDFUNCTION\n\
         OUTPUT double(21)\n\
         OUTPUT n",
    );
    assert_eq!(output, "42\nouter\n");
}

#[test]
fn returning_out_of_a_loop_still_restores_bindings() {
    let output = output_of(
        "DECLARE flag : STRING\n\
         flag <- \"keep\"\n\
         FUNCTION find(flag : INTEGER) RETURNS INTEGER\n\
         FOR j <- 1 TO 10\n\
         IF j = 3 THEN RETURN flag ENDIF\n\
         NEXT j\n\
         RETURN 0\n\
         ENDFUNCTION\n\
         OUTPUT find(42)\n\
         OUTPUT flag",
    );
    assert_eq!(output, "42\nkeep\n");
}

#[test]
fn return_propagates_out_of_nested_control_flow() {
    let output = output_of(
        "FUNCTION classify(n : INTEGER) RETURNS STRING\n\
         WHILE TRUE\n\
         IF n > 0 THEN RETURN \"positive\" ELSE RETURN \"other\" ENDIF\n\
         ENDWHILE\n\
         ENDFUNCTION\n\
         OUTPUT classify(3)\n\
         OUTPUT classify(-1)",
    );
    assert_eq!(output, "positive\nother\n");
}

#[test]
fn function_without_return_fails() {
    let err = run_source(
        "FUNCTION broken() RETURNS INTEGER\n\
         IF FALSE THEN RETURN 1 ENDIF\n\
         ENDFUNCTION\n\
         OUTPUT broken()",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::MissingReturn)), "{err}");
}

#[test]
fn return_type_must_match_the_declaration() {
    let err = run_source(
        "FUNCTION bad() RETURNS INTEGER\n\
         RETURN TRUE\n\
         ENDFUNCTION\n\
         OUTPUT bad()",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::Mismatch { .. })), "{err}");
}

#[test]
fn arity_mismatch_fails() {
    let err = run_source(
        "PROCEDURE p(a : INTEGER)\n\
         OUTPUT a\n\
         ENDPROCEDURE\n\
         CALL p(1, 2)",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::BadArity)), "{err}");
}

#[test]
fn arguments_do_not_convert_implicitly() {
    let err = run_source(
        "PROCEDURE p(r : REAL)\n\
         OUTPUT r\n\
         ENDPROCEDURE\n\
         CALL p(1)",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::Mismatch { .. })), "{err}");
}

#[test]
fn byref_parameters_are_refused_at_call_time() {
    let err = run_source(
        "PROCEDURE p(BYREF a : INTEGER)\n\
         OUTPUT a\n\
         ENDPROCEDURE\n\
         CALL p(1)",
    )
    .unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeError::ByRefUnsupported)),
        "{err}"
    );
}

#[test]
fn input_is_a_clean_runtime_error() {
    let err = run_source(
        "DECLARE x : INTEGER\n\
         INPUT x",
    )
    .unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeError::InputUnsupported)),
        "{err}"
    );
}

#[test]
fn calling_an_unknown_name_fails() {
    let err = run_source("CALL nowhere").unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeError::UndefinedFunction)),
        "{err}"
    );
}

#[test]
fn declarations_inside_blocks_are_rejected() {
    let err = run_source("IF TRUE THEN DECLARE x : INTEGER ENDIF").unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeError::MisplacedStatement)),
        "{err}"
    );
}

#[test]
fn mutual_recursion_between_functions() {
    let output = output_of(
        "FUNCTION is_even(n : INTEGER) RETURNS BOOLEAN\n\
         IF n = 0 THEN RETURN TRUE ELSE RETURN is_odd(n - 1) ENDIF\n\
         ENDFUNCTION\n\
         FUNCTION is_odd(n : INTEGER) RETURNS BOOLEAN\n\
         IF n = 0 THEN RETURN FALSE ELSE RETURN is_even(n - 1) ENDIF\n\
         ENDFUNCTION\n\
         OUTPUT is_even(10)\n\
         OUTPUT is_even(7)",
    );
    assert_eq!(output, "TRUE\nFALSE\n");
}

#[test]
fn comments_are_ignored_by_the_pipeline() {
    let output = output_of(
        "// leading comment\n\
         DECLARE x : INTEGER // trailing comment\n\
         x <- 2 // another\n\
         OUTPUT x",
    );
    assert_eq!(output, "2\n");
}
