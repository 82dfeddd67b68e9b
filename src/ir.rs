//! Canonical intermediate representation of a problem
//!
//! The IR is the spec compiler's output and the harness generators' input.
//! It is a tree of plain values with a fixed field order; the canonical
//! encoding is compact JSON of that tree, so byte-equality of two IRs
//! implies semantic equality. That property is what makes the problem
//! store's version bump and the runner cache's keying sound.
//!
//! Argument mappings are already positionalized here, newlines are
//! canonical `\n`, and every standardIo `stdout` ends with `\n`. The OOP
//! constructor keeps its logical name `init`; target-language symbols are
//! substituted at generation time.

use crate::error::{Error, Result};
use crate::value::Value;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Current IR schema version
pub const SCHEMA_VERSION: u32 = 1;

/// The three supported test shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TestStyle {
    #[serde(rename = "standardIo")]
    StandardIo,
    #[serde(rename = "function")]
    Function,
    #[serde(rename = "oop")]
    Oop,
}

impl std::fmt::Display for TestStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStyle::StandardIo => write!(f, "standardIo"),
            TestStyle::Function => write!(f, "function"),
            TestStyle::Oop => write!(f, "oop"),
        }
    }
}

/// Primitive type labels usable in signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrimType {
    Integer,
    Float,
    String,
    Bool,
    Any,
    Void,
}

impl PrimType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "integer" => Some(PrimType::Integer),
            "float" => Some(PrimType::Float),
            "string" => Some(PrimType::String),
            "bool" => Some(PrimType::Bool),
            "any" => Some(PrimType::Any),
            "void" => Some(PrimType::Void),
            _ => None,
        }
    }

    /// Does `value` inhabit this type? `any` matches everything, `float`
    /// accepts integer literals, and bool is not an integer.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            PrimType::Integer => matches!(value, Value::Int(_)),
            PrimType::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            PrimType::String => matches!(value, Value::Str(_)),
            PrimType::Bool => matches!(value, Value::Bool(_)),
            PrimType::Any => true,
            PrimType::Void => matches!(value, Value::Null),
        }
    }
}

impl std::fmt::Display for PrimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrimType::Integer => "integer",
            PrimType::Float => "float",
            PrimType::String => "string",
            PrimType::Bool => "bool",
            PrimType::Any => "any",
            PrimType::Void => "void",
        };
        write!(f, "{}", s)
    }
}

/// A canonical exception record: logical type name plus optional message
/// substring the raised error must contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExceptionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The canonical problem IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ProblemIr {
    #[serde(rename = "standardIo")]
    StandardIo(StandardIoIr),
    #[serde(rename = "function")]
    Function(FunctionIr),
    #[serde(rename = "oop")]
    Oop(OopIr),
}

/// standardIo problem: each test feeds stdin to the student script and
/// expects exact stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StandardIoIr {
    pub schema_version: u32,
    pub description: String,
    pub tests: Vec<IoTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IoTest {
    pub name: String,
    pub stdin: String,
    pub stdout: String,
}

/// function problem: a single free function with typed positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionIr {
    pub schema_version: u32,
    pub description: String,
    pub function: FunctionSig,
    pub tests: Vec<CallTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionSig {
    pub name: String,
    pub args: Vec<ArgSig>,
    pub returns: PrimType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArgSig {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrimType,
}

/// One function invocation with positional args and exactly one of
/// `expected` or `exception`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallTest {
    pub name: String,
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionSpec>,
}

/// oop problem: a class signature plus scenario tests made of create steps
/// and ordered method calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OopIr {
    pub schema_version: u32,
    pub description: String,
    pub class: ClassSig,
    pub tests: Vec<ScenarioTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassSig {
    pub name: String,
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MethodSig {
    pub name: String,
    pub args: Vec<ArgSig>,
    pub returns: PrimType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioTest {
    pub name: String,
    pub setup: Vec<SetupStep>,
    pub steps: Vec<CallStep>,
}

/// Object creation during scenario setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SetupStep {
    Create {
        class: String,
        #[serde(rename = "as")]
        target: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
    },
}

/// A method call on a created instance, asserting a result or a raise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum CallStep {
    Call {
        on: String,
        method: String,
        args: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exception: Option<ExceptionSpec>,
    },
}

impl ClassSig {
    /// Look up a method signature by its logical name.
    pub fn method(&self, name: &str) -> Option<&MethodSig> {
        self.methods.iter().find(|m| m.name == name)
    }
}

impl ProblemIr {
    pub fn style(&self) -> TestStyle {
        match self {
            ProblemIr::StandardIo(_) => TestStyle::StandardIo,
            ProblemIr::Function(_) => TestStyle::Function,
            ProblemIr::Oop(_) => TestStyle::Oop,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ProblemIr::StandardIo(p) => &p.description,
            ProblemIr::Function(p) => &p.description,
            ProblemIr::Oop(p) => &p.description,
        }
    }

    /// Number of tests the harness will run, in IR order.
    pub fn test_count(&self) -> usize {
        match self {
            ProblemIr::StandardIo(p) => p.tests.len(),
            ProblemIr::Function(p) => p.tests.len(),
            ProblemIr::Oop(p) => p.tests.len(),
        }
    }

    /// Test names, in IR order. These appear verbatim in the report.
    pub fn test_names(&self) -> Vec<&str> {
        match self {
            ProblemIr::StandardIo(p) => p.tests.iter().map(|t| t.name.as_str()).collect(),
            ProblemIr::Function(p) => p.tests.iter().map(|t| t.name.as_str()).collect(),
            ProblemIr::Oop(p) => p.tests.iter().map(|t| t.name.as_str()).collect(),
        }
    }

    /// Canonical byte encoding: compact JSON with the fixed field order.
    /// Two IRs are semantically equal iff these bytes are equal.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("IR serialization is infallible")
    }

    /// Parse the canonical encoding back into an IR.
    pub fn from_canonical_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(Error::Json)
    }

    /// Pretty JSON rendering for humans (CLI output).
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::Json)
    }

    /// Content hash of the canonical bytes, `sha256:<hex>`.
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}
