//! Problem spec compiler — parse, validate, normalize
//!
//! A problem is authored as a single YAML document describing one of three
//! test shapes. This module validates the document exhaustively and emits
//! the canonical [`ProblemIr`]. Every rejection carries the path of the
//! offending node (`tests[2].args.n`).
//!
//! ## Example spec
//!
//! ```yaml
//! type: function
//! description: Compute n!
//! function:
//!   name: factorial
//!   arguments:
//!     - name: n
//!       type: integer
//!   returns: integer
//! tests:
//!   - name: base
//!     args: {n: 0}
//!     expected: 1
//!   - name: negative
//!     args: {n: -1}
//!     exception: ValueError
//! ```
//!
//! Compilation is deterministic and idempotent: the same input text always
//! yields byte-identical canonical IR.

use crate::error::{Result, SpecError};
use crate::ir::{
    ArgSig, CallStep, CallTest, ClassSig, ExceptionSpec, FunctionIr, FunctionSig, IoTest,
    MethodSig, OopIr, PrimType, ProblemIr, ScenarioTest, SetupStep, StandardIoIr, TestStyle,
    SCHEMA_VERSION,
};
use crate::value::{Value, MAX_STRING_LEN};
use regex::Regex;
use serde::Deserialize;
use serde_norway::{Mapping, Value as Yaml};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Logical constructor name in OOP specs. Stored as-is in the IR; target
/// languages substitute their own symbol at generation time.
pub const CONSTRUCTOR_NAME: &str = "init";

type SpecResult<T> = std::result::Result<T, SpecError>;

/// Compile a problem document into canonical IR.
///
/// Enforces single-document YAML, validates the per-type structure, and
/// normalizes: newlines to `\n`, trailing newline on every `stdout`, named
/// argument mappings to positional arrays in declared order, exception
/// shorthand strings to `{type}` records.
pub fn compile_spec(yaml_text: &str) -> Result<ProblemIr> {
    Ok(compile(yaml_text)?)
}

fn compile(yaml_text: &str) -> SpecResult<ProblemIr> {
    let raw = parse_single_document(yaml_text)?;
    let style = require_style(&raw)?;
    let description = require_description(&raw)?;

    let ir = match style {
        TestStyle::StandardIo => {
            reject_unknown_top_level_keys(&raw, &["type", "description", "tests"])?;
            ProblemIr::StandardIo(StandardIoIr {
                schema_version: SCHEMA_VERSION,
                description,
                tests: normalize_standard_io_tests(&raw)?,
            })
        }
        TestStyle::Function => {
            reject_unknown_top_level_keys(&raw, &["type", "description", "function", "tests"])?;
            let function = normalize_function_signature(&raw)?;
            let tests = normalize_function_tests(&raw, &function)?;
            ProblemIr::Function(FunctionIr {
                schema_version: SCHEMA_VERSION,
                description,
                function,
                tests,
            })
        }
        TestStyle::Oop => {
            reject_unknown_top_level_keys(&raw, &["type", "description", "class", "tests"])?;
            let class = normalize_class_signature(&raw)?;
            let tests = normalize_oop_tests(&raw, &class)?;
            ProblemIr::Oop(OopIr {
                schema_version: SCHEMA_VERSION,
                description,
                class,
                tests,
            })
        }
    };

    Ok(ir)
}

// ---------- Parsing helpers ----------

fn parse_single_document(yaml_text: &str) -> SpecResult<Mapping> {
    let mut docs = Vec::new();
    for document in serde_norway::Deserializer::from_str(yaml_text) {
        let value = Yaml::deserialize(document)
            .map_err(|e| SpecError::document(format!("YAML parse error: {}", e)))?;
        docs.push(value);
    }

    if docs.is_empty() {
        return Err(SpecError::document("YAML document is empty"));
    }
    if docs.len() > 1 {
        return Err(SpecError::document(
            "Multiple YAML documents found; provide exactly one problem per document",
        ));
    }

    match docs.into_iter().next().unwrap() {
        Yaml::Mapping(m) => Ok(m),
        Yaml::Null => Err(SpecError::document("YAML document is empty")),
        _ => Err(SpecError::document(
            "Top-level YAML must be a mapping (key/value object)",
        )),
    }
}

fn require_style(raw: &Mapping) -> SpecResult<TestStyle> {
    let value = raw
        .get("type")
        .ok_or_else(|| SpecError::new("Missing required key", "type"))?;
    match as_str(value, "type")? {
        "standardIo" => Ok(TestStyle::StandardIo),
        "function" => Ok(TestStyle::Function),
        "oop" => Ok(TestStyle::Oop),
        _ => Err(SpecError::new(
            "Must be one of: standardIo, function, oop",
            "type",
        )),
    }
}

fn require_description(raw: &Mapping) -> SpecResult<String> {
    match raw.get("description") {
        Some(Yaml::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(SpecError::new(
            "description must be a non-empty string",
            "description",
        )),
    }
}

fn reject_unknown_top_level_keys(raw: &Mapping, allowed: &[&str]) -> SpecResult<()> {
    for key in raw.keys() {
        let name = key_name(key)?;
        if !allowed.contains(&name) {
            return Err(SpecError::new(
                format!("Unknown top-level key '{}'", name),
                name,
            ));
        }
    }
    Ok(())
}

fn reject_unknown_keys(map: &Mapping, allowed: &[&str], path: &str) -> SpecResult<()> {
    for key in map.keys() {
        let name = key_name(key)?;
        if !allowed.contains(&name) {
            return Err(SpecError::new(
                format!("Unknown key '{}'", name),
                format!("{}.{}", path, name),
            ));
        }
    }
    Ok(())
}

fn key_name(key: &Yaml) -> SpecResult<&str> {
    key.as_str()
        .ok_or_else(|| SpecError::document("Mapping keys must be strings"))
}

// ---------- Type: standardIo ----------

fn normalize_standard_io_tests(raw: &Mapping) -> SpecResult<Vec<IoTest>> {
    let tests = require_tests_list(raw)?;

    let mut seen_names = HashSet::new();
    let mut norm = Vec::with_capacity(tests.len());
    for (i, t) in tests.iter().enumerate() {
        let path = format!("tests[{}]", i);
        let t = as_mapping(t, &path)?;

        let name = require_name(t, &path, &mut seen_names)?;
        let stdout = t
            .get("stdout")
            .ok_or_else(|| SpecError::new("Missing required key 'stdout'", format!("{}.stdout", path)))?;

        let stdin = match t.get("stdin") {
            Some(v) => as_str(v, &format!("{}.stdin", path))?.to_string(),
            None => String::new(),
        };
        let stdout = as_str(stdout, &format!("{}.stdout", path))?;

        let stdin = normalize_newlines(&stdin);
        let mut stdout = normalize_newlines(stdout);
        if !stdout.ends_with('\n') {
            stdout.push('\n');
        }

        reject_unknown_keys(t, &["name", "stdin", "stdout"], &path)?;

        norm.push(IoTest {
            name,
            stdin,
            stdout,
        });
    }
    require_non_empty(&norm, "tests")?;
    Ok(norm)
}

// ---------- Type: function ----------

fn normalize_function_signature(raw: &Mapping) -> SpecResult<FunctionSig> {
    let f = raw
        .get("function")
        .and_then(Yaml::as_mapping)
        .ok_or_else(|| SpecError::new("Missing required mapping", "function"))?;

    let name = as_identifier(
        f.get("name").unwrap_or(&Yaml::Null),
        "function.name",
    )?;
    let args = normalize_arg_list(f, "function")?;

    let returns = match f.get("returns") {
        Some(v) => as_type(v, "function.returns")?,
        None => PrimType::Any,
    };

    reject_unknown_keys(f, &["name", "arguments", "args", "returns"], "function")?;

    Ok(FunctionSig {
        name,
        args,
        returns,
    })
}

/// Shared signature-argument normalization: accepts either the `arguments`
/// or `args` spelling, requires a list of `{name, type}` mappings, rejects
/// duplicate names, and forbids `void` outside return position.
fn normalize_arg_list(owner: &Mapping, owner_path: &str) -> SpecResult<Vec<ArgSig>> {
    let (args, spelled) = match (owner.get("arguments"), owner.get("args")) {
        (Some(v), _) => (Some(v), "arguments"),
        (None, Some(v)) => (Some(v), "args"),
        (None, None) => (None, "arguments"),
    };
    let list_path = format!("{}.{}", owner_path, spelled);
    let args = match args {
        Some(v) => as_sequence(v, &format!("{}.arguments must be a list", owner_path), &list_path)?,
        None => {
            return if owner_path == "function" {
                Err(SpecError::new(
                    "function.arguments must be a list",
                    "function.arguments",
                ))
            } else {
                // Methods may omit the argument list entirely.
                Ok(Vec::new())
            };
        }
    };

    let mut seen = HashSet::new();
    let mut norm = Vec::with_capacity(args.len());
    for (i, a) in args.iter().enumerate() {
        let apath = format!("{}[{}]", list_path, i);
        let a = as_mapping_msg(a, "Each argument must be a mapping", &apath)?;
        let aname = as_identifier(a.get("name").unwrap_or(&Yaml::Null), &format!("{}.name", apath))?;
        if !seen.insert(aname.clone()) {
            return Err(SpecError::new("Duplicate argument name", format!("{}.name", apath)));
        }
        let aty = match a.get("type") {
            Some(v) => as_type(v, &format!("{}.type", apath))?,
            None => PrimType::Any,
        };
        if aty == PrimType::Void {
            return Err(SpecError::new(
                "void is only allowed as a return type",
                format!("{}.type", apath),
            ));
        }
        reject_unknown_keys(a, &["name", "type"], &apath)?;
        norm.push(ArgSig {
            name: aname,
            ty: aty,
        });
    }
    Ok(norm)
}

fn normalize_function_tests(raw: &Mapping, sig: &FunctionSig) -> SpecResult<Vec<CallTest>> {
    let tests = require_tests_list(raw)?;

    let mut seen_names = HashSet::new();
    let mut norm = Vec::with_capacity(tests.len());
    for (i, t) in tests.iter().enumerate() {
        let path = format!("tests[{}]", i);
        let t = as_mapping(t, &path)?;

        let name = require_name(t, &path, &mut seen_names)?;

        let args_map = t.get("args").and_then(Yaml::as_mapping).ok_or_else(|| {
            SpecError::new(
                "args must be a mapping keyed by argument names",
                format!("{}.args", path),
            )
        })?;
        let args = positionalize(args_map, &sig.args, &format!("{}.args", path))?;

        let (expected, exception) = normalize_outcome(t, &path)?;

        reject_unknown_keys(t, &["name", "args", "expected", "exception"], &path)?;
        norm.push(CallTest {
            name,
            args,
            expected,
            exception,
        });
    }

    require_non_empty(&norm, "tests")?;
    Ok(norm)
}

/// Map a named argument mapping to a positional array in declared order,
/// enforcing exact key-set equality and value/type agreement.
fn positionalize(map: &Mapping, sig: &[ArgSig], path: &str) -> SpecResult<Vec<Value>> {
    check_exact_keys(map, sig.iter().map(|a| a.name.as_str()), path)?;

    let mut out = Vec::with_capacity(sig.len());
    for arg in sig {
        let raw = map
            .get(arg.name.as_str())
            .expect("exact-key check guarantees presence");
        let vpath = format!("{}.{}", path, arg.name);
        let value = value_from_yaml(raw, &vpath)?;
        if !arg.ty.accepts(&value) {
            return Err(SpecError::new(
                format!("value should be type {}", arg.ty),
                vpath,
            ));
        }
        out.push(value);
    }
    Ok(out)
}

/// Exactly one of `expected` / `exception` per test or step.
fn normalize_outcome(
    map: &Mapping,
    path: &str,
) -> SpecResult<(Option<Value>, Option<ExceptionSpec>)> {
    let has_expected = map.contains_key("expected");
    let has_exception = map.contains_key("exception");
    if has_expected == has_exception {
        return Err(SpecError::new(
            "Provide exactly one of 'expected' or 'exception'",
            path,
        ));
    }

    if has_expected {
        let value = value_from_yaml(
            map.get("expected").unwrap(),
            &format!("{}.expected", path),
        )?;
        Ok((Some(value), None))
    } else {
        let exc = normalize_exception(
            map.get("exception").unwrap(),
            &format!("{}.exception", path),
        )?;
        Ok((None, Some(exc)))
    }
}

// ---------- Type: oop ----------

fn normalize_class_signature(raw: &Mapping) -> SpecResult<ClassSig> {
    let c = raw
        .get("class")
        .and_then(Yaml::as_mapping)
        .ok_or_else(|| SpecError::new("Missing required mapping", "class"))?;

    let name = as_identifier(c.get("name").unwrap_or(&Yaml::Null), "class.name")?;

    let methods = match c.get("methods") {
        Some(Yaml::Sequence(s)) if !s.is_empty() => s,
        _ => {
            return Err(SpecError::new(
                "class.methods must be a non-empty list",
                "class.methods",
            ))
        }
    };

    let mut seen = HashSet::new();
    let mut norm = Vec::with_capacity(methods.len());
    for (i, m) in methods.iter().enumerate() {
        let mpath = format!("class.methods[{}]", i);
        let m = as_mapping_msg(m, "Each method must be a mapping", &mpath)?;
        let mname = as_identifier(m.get("name").unwrap_or(&Yaml::Null), &format!("{}.name", mpath))?;
        if !seen.insert(mname.clone()) {
            return Err(SpecError::new("Duplicate method name", format!("{}.name", mpath)));
        }

        let margs = normalize_arg_list(m, &mpath)?;
        let returns = match m.get("returns") {
            Some(v) => as_type(v, &format!("{}.returns", mpath))?,
            None => PrimType::Any,
        };

        reject_unknown_keys(m, &["name", "arguments", "args", "returns"], &mpath)?;
        norm.push(MethodSig {
            name: mname,
            args: margs,
            returns,
        });
    }

    reject_unknown_keys(c, &["name", "methods"], "class")?;
    Ok(ClassSig {
        name,
        methods: norm,
    })
}

fn normalize_oop_tests(raw: &Mapping, class: &ClassSig) -> SpecResult<Vec<ScenarioTest>> {
    let tests = require_tests_list(raw)?;

    let mut seen_names = HashSet::new();
    let mut norm = Vec::with_capacity(tests.len());
    for (i, t) in tests.iter().enumerate() {
        let path = format!("tests[{}]", i);
        let t = as_mapping(t, &path)?;
        let name = require_name(t, &path, &mut seen_names)?;

        let setup_raw = match t.get("setup") {
            Some(v) => {
                as_sequence(v, "setup must be a list", &format!("{}.setup", path))?.as_slice()
            }
            None => &[],
        };

        let steps_raw = t.get("actions").or_else(|| t.get("steps"));
        let steps_raw = match steps_raw {
            Some(v) => as_sequence(v, "actions/steps must be a list", &format!("{}.actions", path))?,
            None => {
                return Err(SpecError::new(
                    "actions/steps must be a list",
                    format!("{}.actions", path),
                ))
            }
        };

        // setup: only create supported
        let mut created = HashSet::new();
        let mut setup = Vec::with_capacity(setup_raw.len());
        for (j, s) in setup_raw.iter().enumerate() {
            let spath = format!("{}.setup[{}]", path, j);
            let s = as_mapping_msg(s, "Each setup entry must be a mapping", &spath)?;
            if s.get("action").and_then(Yaml::as_str) != Some("create") {
                return Err(SpecError::new("Only 'create' is supported in setup", spath));
            }
            let cls = as_identifier(s.get("class").unwrap_or(&Yaml::Null), &format!("{}.class", spath))?;
            let var = as_identifier(s.get("var").unwrap_or(&Yaml::Null), &format!("{}.var", spath))?;
            if !created.insert(var.clone()) {
                return Err(SpecError::new("Duplicate var name", format!("{}.var", spath)));
            }
            let args = normalize_ctor_args(s, class, &spath)?;
            reject_unknown_keys(s, &["action", "class", "var", "args"], &spath)?;
            setup.push(SetupStep::Create {
                class: cls,
                target: var,
                args,
            });
        }

        // steps: call ops
        let mut steps = Vec::with_capacity(steps_raw.len());
        for (k, a) in steps_raw.iter().enumerate() {
            let apath = format!("{}.actions[{}]", path, k);
            let a = as_mapping_msg(a, "Each action/step must be a mapping", &apath)?;
            if a.get("action").and_then(Yaml::as_str) != Some("call") {
                return Err(SpecError::new("Only 'call' actions are supported", apath));
            }

            let var = as_identifier(a.get("var").unwrap_or(&Yaml::Null), &format!("{}.var", apath))?;
            if !created.contains(&var) {
                return Err(SpecError::new(
                    format!("Unknown variable '{}' (not created in setup)", var),
                    format!("{}.var", apath),
                ));
            }

            let method = as_identifier(a.get("method").unwrap_or(&Yaml::Null), &format!("{}.method", apath))?;
            let sig = class.method(&method).ok_or_else(|| {
                SpecError::new(
                    format!("Method '{}' not declared in class.methods", method),
                    format!("{}.method", apath),
                )
            })?;

            static EMPTY: OnceLock<Mapping> = OnceLock::new();
            let args_map = match a.get("args") {
                Some(v) => v.as_mapping().ok_or_else(|| {
                    SpecError::new("args must be a mapping", format!("{}.args", apath))
                })?,
                None => EMPTY.get_or_init(Mapping::new),
            };
            let args = positionalize(args_map, &sig.args, &format!("{}.args", apath))?;

            let (expected, exception) = normalize_outcome(a, &apath)?;

            reject_unknown_keys(
                a,
                &["action", "var", "method", "args", "expected", "exception"],
                &apath,
            )?;
            steps.push(CallStep::Call {
                on: var,
                method,
                args,
                expected,
                exception,
            });
        }

        reject_unknown_keys(t, &["name", "setup", "actions", "steps"], &path)?;
        norm.push(ScenarioTest { name, setup, steps });
    }

    require_non_empty(&norm, "tests")?;
    Ok(norm)
}

/// Constructor args on a create step are checked against the declared
/// `init` signature. Without a declared `init` the constructor takes no
/// arguments.
fn normalize_ctor_args(
    step: &Mapping,
    class: &ClassSig,
    spath: &str,
) -> SpecResult<Vec<Value>> {
    let raw = match step.get("args") {
        Some(v) => as_sequence(v, "args must be an ordered list", &format!("{}.args", spath))?,
        None => return Ok(Vec::new()),
    };

    match class.method(CONSTRUCTOR_NAME) {
        Some(ctor) => {
            if raw.len() != ctor.args.len() {
                return Err(SpecError::new(
                    format!("'{}' expects {} args", CONSTRUCTOR_NAME, ctor.args.len()),
                    format!("{}.args", spath),
                ));
            }
            let mut out = Vec::with_capacity(raw.len());
            for (k, (v, sig)) in raw.iter().zip(&ctor.args).enumerate() {
                let vpath = format!("{}.args[{}]", spath, k);
                let value = value_from_yaml(v, &vpath)?;
                if !sig.ty.accepts(&value) {
                    return Err(SpecError::new(
                        format!("value should be type {}", sig.ty),
                        vpath,
                    ));
                }
                out.push(value);
            }
            Ok(out)
        }
        None => {
            if raw.is_empty() {
                Ok(Vec::new())
            } else {
                Err(SpecError::new(
                    format!("'{}' not declared; constructor takes no arguments", CONSTRUCTOR_NAME),
                    format!("{}.args", spath),
                ))
            }
        }
    }
}

// ---------- Small utilities ----------

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

fn as_identifier(value: &Yaml, path: &str) -> SpecResult<String> {
    let s = as_str(value, path)?;
    if !ident_re().is_match(s) {
        return Err(SpecError::new(
            "must be a valid identifier (letters, digits, underscore; cannot start with digit)",
            path,
        ));
    }
    Ok(s.to_string())
}

fn as_type(value: &Yaml, path: &str) -> SpecResult<PrimType> {
    let s = as_str(value, path)?;
    PrimType::parse(s).ok_or_else(|| {
        SpecError::new(
            "type must be one of [any, bool, float, integer, string, void]",
            path,
        )
    })
}

fn as_str<'a>(value: &'a Yaml, path: &str) -> SpecResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| SpecError::new("must be a string", path))
}

fn as_mapping<'a>(value: &'a Yaml, path: &str) -> SpecResult<&'a Mapping> {
    as_mapping_msg(value, "Each test must be a mapping", path)
}

fn as_mapping_msg<'a>(value: &'a Yaml, message: &str, path: &str) -> SpecResult<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| SpecError::new(message, path))
}

fn as_sequence<'a>(value: &'a Yaml, message: &str, path: &str) -> SpecResult<&'a Vec<Yaml>> {
    value
        .as_sequence()
        .ok_or_else(|| SpecError::new(message, path))
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn require_tests_list(raw: &Mapping) -> SpecResult<&Vec<Yaml>> {
    raw.get("tests")
        .and_then(Yaml::as_sequence)
        .ok_or_else(|| SpecError::new("tests must be a list", "tests"))
}

fn require_non_empty<T>(seq: &[T], path: &str) -> SpecResult<()> {
    if seq.is_empty() {
        return Err(SpecError::new("must contain at least one item", path));
    }
    Ok(())
}

fn require_name(
    obj: &Mapping,
    path: &str,
    seen: &mut HashSet<String>,
) -> SpecResult<String> {
    let value = obj.get("name").ok_or_else(|| {
        SpecError::new("Missing required key 'name'", format!("{}.name", path))
    })?;
    let name = as_identifier(value, &format!("{}.name", path))?;
    if !seen.insert(name.clone()) {
        return Err(SpecError::new("Duplicate test name", format!("{}.name", path)));
    }
    Ok(name)
}

fn check_exact_keys<'a>(
    map: &Mapping,
    expected: impl Iterator<Item = &'a str>,
    path: &str,
) -> SpecResult<()> {
    let expected: HashSet<&str> = expected.collect();
    let mut actual = HashSet::new();
    for key in map.keys() {
        actual.insert(key_name(key)?);
    }

    let mut missing: Vec<&str> = expected.difference(&actual).copied().collect();
    let mut extra: Vec<&str> = actual.difference(&expected).copied().collect();
    missing.sort_unstable();
    extra.sort_unstable();

    if !missing.is_empty() || !extra.is_empty() {
        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing: [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            parts.push(format!("unexpected: [{}]", extra.join(", ")));
        }
        return Err(SpecError::new(parts.join("; "), path));
    }
    Ok(())
}

fn value_from_yaml(value: &Yaml, path: &str) -> SpecResult<Value> {
    match value {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(SpecError::new("number out of range", path))
            }
        }
        Yaml::String(s) => {
            if s.len() > MAX_STRING_LEN {
                return Err(SpecError::new(
                    format!("string exceeds {} bytes", MAX_STRING_LEN),
                    path,
                ));
            }
            Ok(Value::Str(s.clone()))
        }
        _ => Err(SpecError::new(
            "must be a scalar (integer, float, string, bool, or null)",
            path,
        )),
    }
}

/// Normalize an exception field: a plain string `E` means `{type: E}`; a
/// mapping requires `type` and allows an optional `message`.
fn normalize_exception(value: &Yaml, path: &str) -> SpecResult<ExceptionSpec> {
    match value {
        Yaml::String(_) => {
            let kind = as_identifier(value, path)?;
            Ok(ExceptionSpec {
                kind,
                message: None,
            })
        }
        Yaml::Mapping(m) => {
            let kind = m.get("type").ok_or_else(|| {
                SpecError::new("exception mapping must include 'type'", path)
            })?;
            let kind = as_identifier(kind, &format!("{}.type", path))?;
            let message = match m.get("message") {
                Some(v) => Some(as_str(v, &format!("{}.message", path))?.to_string()),
                None => None,
            };
            reject_unknown_keys(m, &["type", "message"], path)?;
            Ok(ExceptionSpec { kind, message })
        }
        _ => Err(SpecError::new("exception must be a string or mapping", path)),
    }
}
