//! Python harness generation (stdlib unittest)
//!
//! Emits a single self-contained test file per problem. The harness only
//! uses the Python standard library (the sandbox image is a bare
//! `python:*-slim`), runs cases in IR order, enforces the per-case timeout
//! from the `RUN_TIMEOUT` environment variable, and writes a JUnit-style
//! XML report to `REPORT_PATH`. Because the workspace mount is read-only,
//! the report is also echoed between sentinel lines on stdout for the
//! executor to recover.

use crate::error::{Error, Result};
use crate::ir::{CallStep, PrimType, ProblemIr, SetupStep};
use crate::spec::CONSTRUCTOR_NAME;
use crate::value::Value;

/// Sentinel printed by the harness immediately before the report bytes.
pub const REPORT_BEGIN_MARKER: &str = "__RUNNER_REPORT_BEGIN__";
/// Sentinel printed by the harness immediately after the report bytes.
pub const REPORT_END_MARKER: &str = "__RUNNER_REPORT_END__";

const TIMEOUT_FAIL: &str = "self.fail(\"timeout: case exceeded %.1fs\" % RUN_TIMEOUT)";

pub fn generate_standard_io(ir: &ProblemIr) -> Result<String> {
    let ProblemIr::StandardIo(problem) = ir else {
        return Err(Error::Other(
            "standardIo generator invoked with mismatched IR".into(),
        ));
    };

    let mut out = header("standardIo", ir);
    out.push_str("import os\nimport subprocess\nimport sys\nimport time\nimport unittest\n");
    out.push_str(PROLOGUE_COMMON);
    out.push_str("SUITE_NAME = \"python-standardIo\"\n\n");
    out.push_str(&case_names_block(&ir.test_names()));

    out.push_str("class StandardIoTests(unittest.TestCase):\n");
    out.push_str("    def _run_case(self, stdin_data, expected):\n");
    out.push_str("        try:\n");
    out.push_str("            proc = subprocess.run(\n");
    out.push_str("                [sys.executable, \"-u\", bootstrap.STUDENT_ENTRY],\n");
    out.push_str("                input=stdin_data.encode(\"utf-8\"),\n");
    out.push_str("                stdout=subprocess.PIPE,\n");
    out.push_str("                stderr=subprocess.PIPE,\n");
    out.push_str("                timeout=RUN_TIMEOUT,\n");
    out.push_str("                check=False,\n");
    out.push_str("            )\n");
    out.push_str("        except subprocess.TimeoutExpired:\n");
    out.push_str(&format!("            {}\n", TIMEOUT_FAIL));
    out.push_str("            return\n");
    out.push_str("        stdout = proc.stdout.decode(\"utf-8\", errors=\"replace\")\n");
    out.push_str("        stderr = proc.stderr.decode(\"utf-8\", errors=\"replace\")\n");
    out.push_str("        self.assertEqual(\n");
    out.push_str("            expected,\n");
    out.push_str("            stdout,\n");
    out.push_str("            \"expected exact stdout match\\nSTDERR:\\n\" + stderr,\n");
    out.push_str("        )\n\n");

    for (i, test) in problem.tests.iter().enumerate() {
        out.push_str(&format!("    def {}(self):\n", method_name(i, &test.name)));
        out.push_str(&format!(
            "        self._run_case({}, {})\n\n",
            py_str(&test.stdin),
            py_str(&test.stdout)
        ));
    }

    out.push_str(&runner_common("StandardIoTests"));
    Ok(out)
}

pub fn generate_function(ir: &ProblemIr) -> Result<String> {
    let ProblemIr::Function(problem) = ir else {
        return Err(Error::Other(
            "function generator invoked with mismatched IR".into(),
        ));
    };

    let mut out = header("function", ir);
    out.push_str("import importlib\nimport os\nimport signal\nimport sys\nimport time\nimport unittest\n");
    out.push_str(PROLOGUE_COMMON);
    out.push_str("SUITE_NAME = \"python-function\"\n\n");
    out.push_str(CALL_HELPERS);
    out.push_str(&case_names_block(&ir.test_names()));

    out.push_str("class FunctionTests(unittest.TestCase):\n");
    let fn_name = py_str(&problem.function.name);
    for (i, test) in problem.tests.iter().enumerate() {
        let args: Vec<String> = test.args.iter().map(py_value).collect();
        out.push_str(&format!("    def {}(self):\n", method_name(i, &test.name)));
        out.push_str("        def case():\n");
        out.push_str(&format!("            fn = getattr(_student(), {})\n", fn_name));
        out.push_str(&format!("            return fn({})\n", args.join(", ")));
        match (&test.expected, &test.exception) {
            (Some(expected), None) => {
                out.push_str("        try:\n");
                out.push_str("            got = _call_with_timeout(case)\n");
                out.push_str("        except _CaseTimeout:\n");
                out.push_str(&format!("            {}\n", TIMEOUT_FAIL));
                out.push_str("            return\n");
                out.push_str(&format!(
                    "        {}\n",
                    assert_stmt(expected, problem.function.returns, "got", None)
                ));
            }
            (None, Some(exc)) => {
                let kind = py_str(&exc.kind);
                let message = exc
                    .message
                    .as_deref()
                    .map(py_str)
                    .unwrap_or_else(|| "None".to_string());
                let desc = exception_desc(&exc.kind, exc.message.as_deref());
                out.push_str("        try:\n");
                out.push_str("            got = _call_with_timeout(case)\n");
                out.push_str("        except _CaseTimeout:\n");
                out.push_str(&format!("            {}\n", TIMEOUT_FAIL));
                out.push_str("        except Exception as exc:\n");
                out.push_str(&format!(
                    "            if not _exception_matches(exc, {}, {}):\n",
                    kind, message
                ));
                out.push_str(&format!(
                    "                self.fail(\"raised %s(%s), expected \" % (type(exc).__name__, exc) + {})\n",
                    desc
                ));
                out.push_str("        else:\n");
                out.push_str(&format!(
                    "            self.fail(\"expected \" + {} + \", but call returned %r\" % (got,))\n",
                    desc
                ));
            }
            _ => {
                return Err(Error::Other(format!(
                    "test '{}' lacks an expected/exception outcome",
                    test.name
                )))
            }
        }
        out.push('\n');
    }

    out.push_str(&runner_common("FunctionTests"));
    Ok(out)
}

pub fn generate_oop(ir: &ProblemIr) -> Result<String> {
    let ProblemIr::Oop(problem) = ir else {
        return Err(Error::Other(
            "oop generator invoked with mismatched IR".into(),
        ));
    };

    let mut out = header("oop", ir);
    out.push_str("import importlib\nimport os\nimport signal\nimport sys\nimport time\nimport unittest\n");
    out.push_str(PROLOGUE_COMMON);
    out.push_str("SUITE_NAME = \"python-oop\"\n\n");
    out.push_str(CALL_HELPERS);
    out.push_str(&case_names_block(&ir.test_names()));

    out.push_str("class ScenarioTests(unittest.TestCase):\n");
    for (i, test) in problem.tests.iter().enumerate() {
        out.push_str(&format!("    def {}(self):\n", method_name(i, &test.name)));
        out.push_str("        def case():\n");
        out.push_str("            mod = _student()\n");

        for step in &test.setup {
            let SetupStep::Create {
                class,
                target,
                args,
            } = step;
            let ctor_args: Vec<String> = args.iter().map(py_value).collect();
            out.push_str(&format!(
                "            v_{} = getattr(mod, {})({})\n",
                target,
                py_str(class),
                ctor_args.join(", ")
            ));
        }

        for (k, step) in test.steps.iter().enumerate() {
            let CallStep::Call {
                on,
                method,
                args,
                expected,
                exception,
            } = step;
            let call_args: Vec<String> = args.iter().map(py_value).collect();
            let call_expr = format!(
                "getattr(v_{}, {})({})",
                on,
                py_str(py_method_name(method)),
                call_args.join(", ")
            );
            let label = py_str(&format!("step {} ({})", k + 1, method));
            let returns = problem
                .class
                .method(method)
                .map(|m| m.returns)
                .unwrap_or(PrimType::Any);

            match (expected, exception) {
                (Some(value), None) => {
                    out.push_str(&format!(
                        "            {}\n",
                        assert_stmt(value, returns, &call_expr, Some(label.as_str()))
                    ));
                }
                (None, Some(exc)) => {
                    let kind = py_str(&exc.kind);
                    let message = exc
                        .message
                        .as_deref()
                        .map(py_str)
                        .unwrap_or_else(|| "None".to_string());
                    let desc = exception_desc(&exc.kind, exc.message.as_deref());
                    out.push_str("            try:\n");
                    out.push_str(&format!("                {}\n", call_expr));
                    out.push_str("            except Exception as exc:\n");
                    out.push_str(&format!(
                        "                if not _exception_matches(exc, {}, {}):\n",
                        kind, message
                    ));
                    out.push_str(&format!(
                        "                    self.fail({} + \": raised %s(%s), expected \" % (type(exc).__name__, exc) + {})\n",
                        label, desc
                    ));
                    out.push_str("            else:\n");
                    out.push_str(&format!(
                        "                self.fail({} + \": expected \" + {} + \" to be raised\")\n",
                        label, desc
                    ));
                }
                _ => {
                    return Err(Error::Other(format!(
                        "test '{}' step {} lacks an expected/exception outcome",
                        test.name,
                        k + 1
                    )))
                }
            }
        }

        out.push_str("        try:\n");
        out.push_str("            _call_with_timeout(case)\n");
        out.push_str("        except _CaseTimeout:\n");
        out.push_str(&format!("            {}\n", TIMEOUT_FAIL));
        out.push('\n');
    }

    out.push_str(&runner_common("ScenarioTests"));
    Ok(out)
}

// ---------- Shared harness text ----------

fn header(style: &str, ir: &ProblemIr) -> String {
    format!(
        "# AUTO-GENERATED: python {} runner\n# SPEC HASH: {}\n# Do not edit by hand; changes are overwritten when the problem is recompiled.\n\n",
        style,
        ir.content_hash()
    )
}

const PROLOGUE_COMMON: &str = r#"from xml.sax.saxutils import escape, quoteattr

sys.path.insert(0, os.path.dirname(os.path.abspath(__file__)))
import bootstrap  # noqa: F401

RUN_TIMEOUT = float(os.environ.get("RUN_TIMEOUT", "5"))
REPORT_PATH = os.environ.get("REPORT_PATH", "/tmp/report.xml")
REPORT_BEGIN = "__RUNNER_REPORT_BEGIN__"
REPORT_END = "__RUNNER_REPORT_END__"
"#;

/// Helpers for the in-process styles: import the student module and apply
/// the per-case deadline with SIGALRM. The timeout type derives from
/// BaseException so student code and assertRaises-style except blocks
/// cannot swallow it.
const CALL_HELPERS: &str = r#"
class _CaseTimeout(BaseException):
    pass


def _on_alarm(signum, frame):
    raise _CaseTimeout()


def _call_with_timeout(case):
    signal.signal(signal.SIGALRM, _on_alarm)
    signal.setitimer(signal.ITIMER_REAL, RUN_TIMEOUT)
    try:
        return case()
    finally:
        signal.setitimer(signal.ITIMER_REAL, 0)


def _student():
    return importlib.import_module(bootstrap.STUDENT_MODULE)


def _exception_matches(exc, expected_type, expected_message):
    names = [c.__name__ for c in type(exc).__mro__]
    if expected_type not in names:
        return False
    if expected_message is not None and expected_message not in str(exc):
        return False
    return True

"#;

const RUNNER_COMMON: &str = r#"
class _XmlResult(unittest.TestResult):
    """Collects per-case outcomes and timings for the XML report."""

    def __init__(self):
        super().__init__()
        self.records = []
        self._started = {}

    def startTest(self, test):
        super().startTest(test)
        self._started[test.id()] = time.monotonic()

    def _finish(self, test, status, err):
        elapsed = time.monotonic() - self._started.get(test.id(), time.monotonic())
        method = test.id().rsplit(".", 1)[-1]
        name = CASE_NAMES.get(method, method)
        if err is None:
            message = ""
            details = ""
        else:
            message = str(err[1])
            details = self._exc_info_to_string(err, test)
        self.records.append((name, status, message, details, elapsed))

    def addSuccess(self, test):
        super().addSuccess(test)
        self._finish(test, "pass", None)

    def addFailure(self, test, err):
        super().addFailure(test, err)
        self._finish(test, "failure", err)

    def addError(self, test, err):
        super().addError(test, err)
        self._finish(test, "error", err)


def _xml_safe(text):
    return "".join(c for c in text if c in "\t\n\r" or ord(c) >= 0x20)


def _write_report(result, elapsed):
    failures = sum(1 for r in result.records if r[1] == "failure")
    errors = sum(1 for r in result.records if r[1] == "error")
    lines = ['<?xml version="1.0" encoding="utf-8"?>']
    lines.append(
        '<testsuite name=%s tests="%d" failures="%d" errors="%d" time="%.3f">'
        % (quoteattr(SUITE_NAME), len(result.records), failures, errors, elapsed)
    )
    for name, status, message, details, case_time in result.records:
        open_tag = '<testcase classname=%s name=%s time="%.3f"' % (
            quoteattr(SUITE_NAME),
            quoteattr(_xml_safe(name)),
            case_time,
        )
        if status == "pass":
            lines.append(open_tag + "/>")
        else:
            lines.append(open_tag + ">")
            lines.append(
                "<%s message=%s>%s</%s>"
                % (status, quoteattr(_xml_safe(message)), escape(_xml_safe(details)), status)
            )
            lines.append("</testcase>")
    lines.append("</testsuite>")
    xml = "\n".join(lines)
    try:
        with open(REPORT_PATH, "w", encoding="utf-8") as fh:
            fh.write(xml)
    except OSError:
        pass
    sys.stdout.flush()
    print(REPORT_BEGIN)
    print(xml)
    print(REPORT_END)
    sys.stdout.flush()
    return failures == 0 and errors == 0


def main():
    suite = unittest.defaultTestLoader.loadTestsFromTestCase(__SUITE_CLASS__)
    result = _XmlResult()
    start = time.monotonic()
    suite.run(result)
    ok = _write_report(result, time.monotonic() - start)
    sys.exit(0 if ok else 1)


if __name__ == "__main__":
    main()
"#;

fn runner_common(suite_class: &str) -> String {
    RUNNER_COMMON.replace("__SUITE_CLASS__", suite_class)
}

fn case_names_block(names: &[&str]) -> String {
    let mut out = String::from("CASE_NAMES = {\n");
    for (i, name) in names.iter().enumerate() {
        out.push_str(&format!(
            "    \"{}\": {},\n",
            method_name(i, name),
            py_str(name)
        ));
    }
    out.push_str("}\n\n");
    out
}

/// Zero-padded index prefix so unittest's alphabetical execution order
/// equals IR order. Test names are validated identifiers, so the result is
/// a valid Python method name.
fn method_name(index: usize, name: &str) -> String {
    format!("test_{:04}_{}", index, name)
}

fn py_method_name(name: &str) -> &str {
    if name == CONSTRUCTOR_NAME {
        "__init__"
    } else {
        name
    }
}

fn exception_desc(kind: &str, message: Option<&str>) -> String {
    match message {
        Some(m) => py_str(&format!("{} containing '{}'", kind, m)),
        None => py_str(kind),
    }
}

/// Comparison statement for an expected value, honoring the declared return
/// type's comparison rule (floats compare approximately).
fn assert_stmt(expected: &Value, returns: PrimType, got: &str, msg: Option<&str>) -> String {
    match expected {
        Value::Null => match msg {
            Some(m) => format!("self.assertIsNone({}, {})", got, m),
            None => format!("self.assertIsNone({})", got),
        },
        _ if returns == PrimType::Float || matches!(expected, Value::Float(_)) => {
            match msg {
                Some(m) => format!(
                    "self.assertAlmostEqual({}, {}, places=6, msg={})",
                    py_value(expected),
                    got,
                    m
                ),
                None => format!(
                    "self.assertAlmostEqual({}, {}, places=6)",
                    py_value(expected),
                    got
                ),
            }
        }
        _ => match msg {
            Some(m) => format!("self.assertEqual({}, {}, {})", py_value(expected), got, m),
            None => format!("self.assertEqual({}, {})", py_value(expected), got),
        },
    }
}

// ---------- Python literal rendering ----------

fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn py_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Null => "None".into(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => py_float(*f),
        Value::Str(s) => py_str(s),
    }
}

fn py_float(f: f64) -> String {
    if f.is_nan() {
        "float(\"nan\")".into()
    } else if f.is_infinite() {
        if f > 0.0 {
            "float(\"inf\")".into()
        } else {
            "float(\"-inf\")".into()
        }
    } else if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::compile_spec;

    #[test]
    fn test_py_str_escaping() {
        assert_eq!(py_str("2\n3\n"), "\"2\\n3\\n\"");
        assert_eq!(py_str("say \"hi\"\\"), "\"say \\\"hi\\\"\\\\\"");
        assert_eq!(py_str("\x07"), "\"\\x07\"");
    }

    #[test]
    fn test_py_value_literals() {
        assert_eq!(py_value(&Value::Bool(true)), "True");
        assert_eq!(py_value(&Value::Float(0.0)), "0.0");
        assert_eq!(py_value(&Value::Float(2.5)), "2.5");
        assert_eq!(py_value(&Value::Int(-3)), "-3");
        assert_eq!(py_value(&Value::Null), "None");
    }

    #[test]
    fn test_standard_io_harness_content() {
        let yaml = r#"
type: standardIo
description: add
tests:
  - name: add
    stdin: "2\n3\n"
    stdout: "5"
"#;
        let ir = compile_spec(yaml).unwrap();
        let harness = generate_standard_io(&ir).unwrap();

        // IR order + verbatim names via the CASE_NAMES table
        assert!(harness.contains("def test_0000_add(self):"));
        assert!(harness.contains("\"test_0000_add\": \"add\","));
        // normalized expected output keeps the trailing newline
        assert!(harness.contains("self._run_case(\"2\\n3\\n\", \"5\\n\")"));
        assert!(harness.contains("timeout=RUN_TIMEOUT"));
        assert!(harness.contains(REPORT_BEGIN_MARKER));
        assert!(harness.contains("loadTestsFromTestCase(StandardIoTests)"));
    }

    #[test]
    fn test_function_harness_content() {
        let yaml = r#"
type: function
description: factorial
function:
  name: factorial
  arguments:
    - name: n
      type: integer
  returns: integer
tests:
  - name: base
    args: {n: 0}
    expected: 1
  - name: neg
    args: {n: -1}
    exception: ValueError
"#;
        let ir = compile_spec(yaml).unwrap();
        let harness = generate_function(&ir).unwrap();

        assert!(harness.contains("def test_0000_base(self):"));
        assert!(harness.contains("def test_0001_neg(self):"));
        assert!(harness.contains("return fn(0)"));
        assert!(harness.contains("self.assertEqual(1, got)"));
        assert!(harness.contains("_exception_matches(exc, \"ValueError\", None)"));
        assert!(harness.contains("_call_with_timeout"));
    }

    #[test]
    fn test_function_float_returns_compare_approximately() {
        let yaml = r#"
type: function
description: halve
function:
  name: halve
  arguments:
    - name: n
      type: integer
  returns: float
tests:
  - name: one
    args: {n: 1}
    expected: 0.5
"#;
        let ir = compile_spec(yaml).unwrap();
        let harness = generate_function(&ir).unwrap();
        assert!(harness.contains("self.assertAlmostEqual(0.5, got, places=6)"));
    }

    #[test]
    fn test_oop_harness_rewrites_init_and_threads_state() {
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
        let harness = generate_oop(&ir).unwrap();

        // constructor resolved at generation time, not in the IR
        assert!(harness.contains("v_c = getattr(mod, \"Counter\")()"));
        assert!(!harness.contains("getattr(mod, \"init\")"));
        // calls run in order against the same instance
        assert!(harness.contains("getattr(v_c, \"increment\")()"));
        assert!(harness.contains(
            "self.assertEqual(2, getattr(v_c, \"get\")(), \"step 3 (get)\")"
        ));
    }

    #[test]
    fn test_oop_exception_step() {
        let yaml = r#"
type: oop
description: Stack
class:
  name: Stack
  methods:
    - name: pop
      returns: integer
tests:
  - name: popEmpty
    setup:
      - action: create
        class: Stack
        var: s
    actions:
      - action: call
        var: s
        method: pop
        exception:
          type: IndexError
          message: empty
"#;
        let ir = compile_spec(yaml).unwrap();
        let harness = generate_oop(&ir).unwrap();
        assert!(harness.contains("_exception_matches(exc, \"IndexError\", \"empty\")"));
        assert!(harness.contains("IndexError containing 'empty'"));
    }
}
