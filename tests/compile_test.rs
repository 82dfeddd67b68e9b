//! Spec compiler integration tests: documented boundary behaviors and the
//! compiler invariants callers rely on.

use autograde::{compile_spec, CallStep, PrimType, ProblemIr, SpecError, Value};
use pretty_assertions::assert_eq;

fn compile_err(yaml: &str) -> SpecError {
    match compile_spec(yaml) {
        Err(autograde::Error::Spec(e)) => e,
        Ok(_) => panic!("expected a spec error"),
        Err(other) => panic!("expected a spec error, got {other}"),
    }
}

#[test]
fn standard_io_compiles_with_normalized_output() {
    let yaml = r#"
type: standardIo
description: |
  Add two numbers
tests:
  - name: add
    stdin: "2\n3\n"
    stdout: "5"
"#;
    let ir = compile_spec(yaml).unwrap();
    let ProblemIr::StandardIo(io) = &ir else {
        panic!("wrong variant")
    };
    assert_eq!(io.tests[0].stdout, "5\n");
    assert!(!io.tests[0].stdout.contains('\r'));
    assert_eq!(ir.test_names(), vec!["add"]);
}

#[test]
fn function_tests_positionalize_in_declared_order() {
    let yaml = r#"
type: function
description: power
function:
  name: power
  arguments:
    - name: base
      type: integer
    - name: exp
      type: integer
  returns: integer
tests:
  - name: squared
    args: {exp: 2, base: 3}
    expected: 9
"#;
    let ir = compile_spec(yaml).unwrap();
    let ProblemIr::Function(f) = &ir else {
        panic!("wrong variant")
    };
    // named mapping order is irrelevant; declared order wins
    assert_eq!(f.tests[0].args, vec![Value::Int(3), Value::Int(2)]);
    assert_eq!(f.tests[0].args.len(), f.function.args.len());
}

#[test]
fn oop_scenario_compiles_with_ordered_steps() {
    let yaml = r#"
type: oop
description: Counter
class:
  name: Counter
  methods:
    - name: init
    - name: increment
      returns: void
    - name: get
      returns: integer
tests:
  - name: incrementTwice
    setup:
      - action: create
        class: Counter
        var: c
    actions:
      - action: call
        var: c
        method: increment
        expected: null
      - action: call
        var: c
        method: increment
        expected: null
      - action: call
        var: c
        method: get
        expected: 2
"#;
    let ir = compile_spec(yaml).unwrap();
    let ProblemIr::Oop(oop) = &ir else {
        panic!("wrong variant")
    };
    assert_eq!(oop.class.methods.len(), 3);
    assert_eq!(oop.tests[0].steps.len(), 3);
    let CallStep::Call {
        method, expected, ..
    } = &oop.tests[0].steps[2];
    assert_eq!(method, "get");
    assert_eq!(*expected, Some(Value::Int(2)));
    assert_eq!(oop.class.method("get").unwrap().returns, PrimType::Integer);
}

#[test]
fn compile_is_idempotent_across_insignificant_variation() {
    let a = r#"
type: function
description: id
function:
  name: identity
  arguments:
    - name: x
      type: integer
  returns: integer
tests:
  - name: same
    args: {x: 7}
    expected: 7
"#;
    // key spelling variant + extra whitespace
    let b = a
        .replace("arguments:", "args:")
        .replace("description: id", "description:  id");

    let ir_a = compile_spec(a).unwrap();
    let ir_b = compile_spec(&b).unwrap();
    assert_eq!(ir_a.canonical_bytes(), ir_b.canonical_bytes());
    assert_eq!(ir_a.content_hash(), ir_b.content_hash());
}

#[test]
fn canonical_ir_round_trips() {
    let yaml = r#"
type: oop
description: Stack
class:
  name: Stack
  methods:
    - name: push
      args:
        - name: value
          type: integer
      returns: void
    - name: pop
      returns: integer
tests:
  - name: pushPop
    setup:
      - action: create
        class: Stack
        var: s
    steps:
      - action: call
        var: s
        method: push
        args: {value: 4}
        expected: null
      - action: call
        var: s
        method: pop
        expected: 4
  - name: popEmpty
    setup:
      - action: create
        class: Stack
        var: s
    steps:
      - action: call
        var: s
        method: pop
        exception: IndexError
"#;
    let ir = compile_spec(yaml).unwrap();
    let round_tripped = ProblemIr::from_canonical_json(&ir.canonical_bytes()).unwrap();
    assert_eq!(ir, round_tripped);
}

#[test]
fn boundary_empty_tests() {
    let err = compile_err("type: standardIo\ndescription: d\ntests: []\n");
    assert_eq!(err.path.as_deref(), Some("tests"));
}

#[test]
fn boundary_unknown_top_level_key() {
    let err = compile_err(
        "type: standardIo\ndescription: d\nextra: true\ntests:\n  - name: a\n    stdout: x\n",
    );
    assert_eq!(err.path.as_deref(), Some("extra"));
}

#[test]
fn boundary_identifier_regex() {
    let err = compile_err(
        "type: standardIo\ndescription: d\ntests:\n  - name: \"has space\"\n    stdout: x\n",
    );
    assert_eq!(err.path.as_deref(), Some("tests[0].name"));
    assert!(err.message.contains("identifier"));
}

#[test]
fn boundary_both_expected_and_exception() {
    let yaml = r#"
type: function
description: d
function:
  name: f
  arguments:
    - name: n
      type: integer
tests:
  - name: t
    args: {n: 1}
    expected: 1
    exception: ValueError
"#;
    let err = compile_err(yaml);
    assert!(err.message.contains("exactly one"));
}

#[test]
fn boundary_missing_argument_is_named() {
    let yaml = r#"
type: function
description: d
function:
  name: f
  arguments:
    - name: needle
      type: integer
tests:
  - name: t
    args: {}
    expected: 1
"#;
    let err = compile_err(yaml);
    assert!(err.message.contains("needle"), "{}", err.message);
}

#[test]
fn missing_type_and_description_are_rejected() {
    let err = compile_err("description: d\ntests: []\n");
    assert_eq!(err.path.as_deref(), Some("type"));

    let err = compile_err("type: standardIo\ntests: []\n");
    assert_eq!(err.path.as_deref(), Some("description"));
}

#[test]
fn spec_error_paths_are_part_of_the_message() {
    let err = compile_err("type: standardIo\ndescription: d\ntests:\n  - name: a\n");
    // "tests[0].stdout: Missing required key 'stdout'"
    let rendered = err.to_string();
    assert!(rendered.starts_with("tests[0].stdout:"), "{}", rendered);
}
