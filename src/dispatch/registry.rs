//! Operation whitelist and argument binding
//!
//! The whitelist is the only authorization boundary: a call whose name is not
//! registered is never bound, let alone run. Registered operations declare
//! their parameters, and [`Signature::bind`] maps parsed arguments onto them
//! the way Python binds a call (positional first, then keywords).

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use mongodb::bson::{Bson, Document};
use serde_json::Value;

use super::ops;
use super::session::Session;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, ExecutionError, ParseError, Result};
use crate::parser::{Literal, ParsedArgs};

/// Future returned by an operation handler
pub type OperationFuture<'a> = BoxFuture<'a, Result<String>>;

/// Operation entry point
pub type Handler = for<'a> fn(&'a mut Session, BoundArgs) -> OperationFuture<'a>;

/// One declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Whether an operation can change data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// A whitelisted operation
#[derive(Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub params: &'static [Param],
    pub summary: &'static str,
    pub kind: OperationKind,
    pub handler: Handler,
}

impl OperationSpec {
    pub fn signature(&self) -> Signature {
        Signature {
            function: self.name,
            params: self.params,
        }
    }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Parameter list of one operation
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    function: &'static str,
    params: &'static [Param],
}

impl Signature {
    /// Bind parsed arguments to parameter names
    ///
    /// Fails on surplus positional values, unknown keywords, a parameter
    /// given twice, or a required parameter left unset.
    pub fn bind(&self, args: ParsedArgs) -> Result<BoundArgs> {
        let given = args.positional.len();
        if given > self.params.len() {
            return Err(ExecutionError::TooManyArguments {
                function: self.function.to_string(),
                expected: self.params.len(),
                given,
            }
            .into());
        }

        let mut values: HashMap<&'static str, Literal> = HashMap::new();
        for (param, value) in self.params.iter().zip(args.positional) {
            values.insert(param.name, value);
        }

        for (key, value) in args.keyword {
            let Some(param) = self.params.iter().find(|p| p.name == key) else {
                return Err(ExecutionError::UnexpectedArgument {
                    function: self.function.to_string(),
                    argument: key,
                }
                .into());
            };
            if values.contains_key(param.name) {
                return Err(ExecutionError::DuplicateArgument {
                    function: self.function.to_string(),
                    argument: key,
                }
                .into());
            }
            values.insert(param.name, value);
        }

        // An explicit None leaves a required parameter unset
        if let Some(missing) = self
            .params
            .iter()
            .find(|p| {
                p.required && values.get(p.name).is_none_or(|v| *v == Literal::Null)
            })
        {
            return Err(ExecutionError::MissingArgument {
                function: self.function.to_string(),
                argument: missing.name.to_string(),
            }
            .into());
        }

        Ok(BoundArgs {
            function: self.function,
            values,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    format!("{}=...", p.name)
                }
            })
            .collect();
        write!(f, "{}({})", self.function, params.join(", "))
    }
}

/// Arguments bound to parameter names, with typed accessors
///
/// Accessors named `opt_*` treat an absent parameter and an explicit `None`
/// alike. The others fail when the value is missing.
#[derive(Debug, Clone)]
pub struct BoundArgs {
    function: &'static str,
    values: HashMap<&'static str, Literal>,
}

impl BoundArgs {
    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.get(name).filter(|v| **v != Literal::Null)
    }

    /// Required string
    pub fn string(&self, name: &str) -> Result<String> {
        self.opt_string(name)?
            .ok_or_else(|| self.missing(name))
    }

    pub fn opt_string(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Literal::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.wrong_kind(name, "a string", other)),
        }
    }

    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(Literal::Int(n)) => Ok(Some(*n)),
            Some(Literal::Float(f)) if f.fract() == 0.0 => Ok(Some(*f as i64)),
            Some(Literal::Str(s)) if s.trim().parse::<i64>().is_ok() => Ok(s.trim().parse().ok()),
            Some(other) => Err(self.wrong_kind(name, "an integer", other)),
        }
    }

    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Literal::Bool(b)) => Ok(Some(*b)),
            Some(Literal::Int(n)) => Ok(Some(*n != 0)),
            Some(other) => Err(self.wrong_kind(name, "a boolean", other)),
        }
    }

    /// Required JSON object
    pub fn document(&self, name: &str) -> Result<Document> {
        self.opt_document(name)?
            .ok_or_else(|| self.missing(name))
    }

    /// JSON object; a string argument is decoded as JSON first
    pub fn opt_document(&self, name: &str) -> Result<Option<Document>> {
        match self.json(name)? {
            None => Ok(None),
            Some(value @ Value::Object(_)) => Ok(Some(to_document(name, value)?)),
            Some(_) => Err(ExecutionError::InvalidParameters(format!(
                "'{name}' must be a JSON object"
            ))
            .into()),
        }
    }

    /// Aggregation pipeline: a JSON array of stage objects
    pub fn pipeline(&self, name: &str) -> Result<Vec<Document>> {
        match self.json(name)? {
            Some(Value::Array(stages)) => stages
                .into_iter()
                .map(|stage| match stage {
                    Value::Object(_) => to_document(name, stage),
                    _ => Err(ExecutionError::InvalidParameters(
                        "each aggregation stage must be a JSON object".to_string(),
                    )
                    .into()),
                })
                .collect(),
            _ => Err(ExecutionError::InvalidParameters(
                "MongoDB aggregation pipeline must be an array of stages.".to_string(),
            )
            .into()),
        }
    }

    /// Required JSON array of objects
    pub fn documents(&self, name: &str) -> Result<Vec<Document>> {
        match self.json(name)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(_) => to_document(name, item),
                    _ => Err(ExecutionError::InvalidParameters(format!(
                        "'{name}' must contain only JSON objects"
                    ))
                    .into()),
                })
                .collect(),
            Some(_) => Err(ExecutionError::InvalidParameters(format!(
                "'{name}' must be a list of JSON objects"
            ))
            .into()),
            None => Err(self.missing(name)),
        }
    }

    /// Index key specification
    ///
    /// Accepts a field name (`"email"`), an object (`{"email": 1}`), or a list
    /// of fields and `[field, direction]` pairs (`[("email", 1)]`).
    pub fn key_spec(&self, name: &str) -> Result<Document> {
        self.opt_key_spec(name)?
            .ok_or_else(|| self.missing(name))
    }

    /// Sort specification, in the same shapes as [`BoundArgs::key_spec`]
    pub fn opt_sort(&self, name: &str) -> Result<Option<Document>> {
        self.opt_key_spec(name)
    }

    fn opt_key_spec(&self, name: &str) -> Result<Option<Document>> {
        let value = match self.get(name) {
            None => return Ok(None),
            Some(Literal::Str(field)) if !looks_like_json(field) => {
                let mut spec = Document::new();
                spec.insert(field.trim(), 1);
                return Ok(Some(spec));
            }
            Some(_) => self.json(name)?,
        };

        match value {
            None => Ok(None),
            Some(object @ Value::Object(_)) => Ok(Some(to_document(name, object)?)),
            Some(Value::Array(items)) => {
                let mut spec = Document::new();
                for item in items {
                    let (field, direction) = key_pair(name, item)?;
                    spec.insert(field, direction);
                }
                Ok(Some(spec))
            }
            Some(_) => Err(ExecutionError::InvalidParameters(format!(
                "'{name}' must be a field name, an object or a list of [field, direction] pairs"
            ))
            .into()),
        }
    }

    /// JSON view of an argument; strings are decoded
    fn json(&self, name: &str) -> Result<Option<Value>> {
        match self.get(name) {
            None => Ok(None),
            Some(Literal::Json(value)) => Ok(Some(value.clone())),
            Some(Literal::Str(text)) => decode_json(name, text).map(Some),
            Some(other) => Err(self.wrong_kind(name, "JSON", other)),
        }
    }

    fn missing(&self, name: &str) -> DispatchError {
        ExecutionError::MissingArgument {
            function: self.function.to_string(),
            argument: name.to_string(),
        }
        .into()
    }

    fn wrong_kind(&self, name: &str, expected: &str, got: &Literal) -> DispatchError {
        ExecutionError::InvalidParameters(format!(
            "'{name}' must be {expected}, got {}",
            got.kind()
        ))
        .into()
    }
}

fn looks_like_json(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('{') || text.starts_with('[')
}

fn decode_json(name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).or_else(|strict| {
        match Literal::parse(text) {
            Literal::Json(value) => Ok(value),
            _ => Err(ParseError::InvalidJson {
                argument: name.to_string(),
                reason: strict.to_string(),
            }
            .into()),
        }
    })
}

fn to_document(name: &str, value: Value) -> Result<Document> {
    match Bson::try_from(value)? {
        Bson::Document(doc) => Ok(doc),
        _ => Err(ExecutionError::InvalidParameters(format!(
            "'{name}' must be a JSON object"
        ))
        .into()),
    }
}

fn key_pair(name: &str, item: Value) -> Result<(String, Bson)> {
    match item {
        Value::String(field) => Ok((field, Bson::Int32(1))),
        Value::Array(mut pair) if !pair.is_empty() && pair.len() <= 2 => {
            let direction = if pair.len() == 2 {
                Bson::try_from(pair.remove(1))?
            } else {
                Bson::Int32(1)
            };
            match pair.remove(0) {
                Value::String(field) => Ok((field, direction)),
                _ => Err(invalid_pair(name)),
            }
        }
        _ => Err(invalid_pair(name)),
    }
}

fn invalid_pair(name: &str) -> DispatchError {
    ExecutionError::InvalidParameters(format!(
        "'{name}' entries must be field names or [field, direction] pairs"
    ))
    .into()
}

/// The registered operations
///
/// Built once; lookups never change it.
#[derive(Debug, Clone)]
pub struct Whitelist {
    operations: HashMap<&'static str, OperationSpec>,
}

impl Whitelist {
    pub fn new(operations: impl IntoIterator<Item = OperationSpec>) -> Self {
        Self {
            operations: operations.into_iter().map(|op| (op.name, op)).collect(),
        }
    }

    /// Inspection and query operations only
    pub fn read_only() -> Self {
        Self::new(ops::read_operations())
    }

    /// Read operations plus inserts, updates, deletes and index changes
    pub fn with_writes() -> Self {
        Self::new(ops::read_operations().into_iter().chain(ops::write_operations()))
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        if config.allow_writes {
            Self::with_writes()
        } else {
            Self::read_only()
        }
    }

    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations sorted by name
    pub fn operations(&self) -> Vec<&OperationSpec> {
        let mut ops: Vec<&OperationSpec> = self.operations.values().collect();
        ops.sort_by_key(|op| op.name);
        ops
    }
}
