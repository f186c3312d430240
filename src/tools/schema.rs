//! Declared tool parameters and argument validation.
//!
//! Each tool declares an ordered list of [`ParamSpec`]s. Incoming arguments
//! are checked against it before any handler runs, and the same list is
//! rendered to JSON Schema for `tools/list`.

use serde_json::{json, Map, Value};

/// JSON type accepted for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    /// Controller resource id: a non-negative integer or an id-like string.
    /// Normalized to a string after validation.
    Id,
}

impl ParamKind {
    fn label(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Object => "an object",
            Self::Id => "an integer or id string",
        }
    }
}

/// One named parameter in a tool's input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub non_empty: bool,
    pub one_of: Vec<String>,
}

impl ParamSpec {
    pub fn new(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
            minimum: None,
            maximum: None,
            non_empty: false,
            one_of: Vec::new(),
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }

    pub fn object(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Object, description)
    }

    pub fn id(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Id, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.one_of = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// JSON Schema fragment for this parameter.
    pub fn json_schema(&self) -> Value {
        let kind = match self.kind {
            ParamKind::String => json!("string"),
            ParamKind::Integer => json!("integer"),
            ParamKind::Number => json!("number"),
            ParamKind::Boolean => json!("boolean"),
            ParamKind::Object => json!("object"),
            ParamKind::Id => json!(["integer", "string"]),
        };
        let mut schema = Map::new();
        schema.insert("type".into(), kind);
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(min) = self.minimum {
            schema.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            schema.insert("maximum".into(), json!(max));
        }
        if self.non_empty {
            schema.insert("minLength".into(), json!(1));
        }
        if !self.one_of.is_empty() {
            schema.insert("enum".into(), json!(self.one_of));
        }
        Value::Object(schema)
    }

    fn check(&self, value: &Value) -> Result<Value, String> {
        match self.kind {
            ParamKind::String => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("must be {}", self.kind.label()))?;
                if self.non_empty && s.trim().is_empty() {
                    return Err("must not be empty".into());
                }
                if !self.one_of.is_empty() && !self.one_of.iter().any(|v| v == s) {
                    return Err(format!("must be one of: {}", self.one_of.join(", ")));
                }
                Ok(value.clone())
            }
            ParamKind::Integer => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("must be {}", self.kind.label()))?;
                self.check_range(n)?;
                Ok(value.clone())
            }
            ParamKind::Number => {
                if !value.is_number() {
                    return Err(format!("must be {}", self.kind.label()));
                }
                Ok(value.clone())
            }
            ParamKind::Boolean => {
                if !value.is_boolean() {
                    return Err(format!("must be {}", self.kind.label()));
                }
                Ok(value.clone())
            }
            ParamKind::Object => {
                if !value.is_object() {
                    return Err(format!("must be {}", self.kind.label()));
                }
                Ok(value.clone())
            }
            ParamKind::Id => normalize_id(value).map(Value::String),
        }
    }

    fn check_range(&self, n: i64) -> Result<(), String> {
        if let Some(min) = self.minimum {
            if n < min {
                return Err(format!("must be >= {min}"));
            }
        }
        if let Some(max) = self.maximum {
            if n > max {
                return Err(format!("must be <= {max}"));
            }
        }
        Ok(())
    }
}

/// Accept `42`, `"42"` or `"job-7"`; reject anything that could alter a URL
/// path once interpolated.
fn normalize_id(value: &Value) -> Result<String, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n.to_string())
            .ok_or_else(|| "must be a non-negative integer".to_string()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err("must not be empty".into());
            }
            if !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err("may only contain letters, digits, '-' and '_'".into());
            }
            Ok(s.to_string())
        }
        _ => Err(format!("must be {}", ParamKind::Id.label())),
    }
}

/// Render a full input schema (JSON Schema object) for a parameter list.
pub fn input_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(p.name.clone(), p.json_schema());
        if p.required {
            required.push(Value::String(p.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Why an argument set was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Arguments that passed validation. Ids are already normalized to strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn object(&self, name: &str) -> Option<&Map<String, Value>> {
        self.values.get(name).and_then(Value::as_object)
    }

    /// A required string (or id) argument.
    pub fn require_str(&self, name: &str) -> Result<&str, ValidationError> {
        self.str(name)
            .ok_or_else(|| ValidationError::new(name, "is required"))
    }

    pub fn require_i64(&self, name: &str) -> Result<i64, ValidationError> {
        self.i64(name)
            .ok_or_else(|| ValidationError::new(name, "is required"))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

/// Check `args` against `params`.
///
/// `null` is treated as an empty argument object, and an explicit `null`
/// for an optional parameter as if it were absent. Unknown argument names
/// are rejected.
pub fn validate_arguments(params: &[ParamSpec], args: &Value) -> Result<Arguments, ValidationError> {
    let empty = Map::new();
    let given = match args {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => return Err(ValidationError::new("arguments", "must be an object")),
    };

    if let Some(unknown) = given
        .keys()
        .find(|k| !params.iter().any(|p| &p.name == *k))
    {
        return Err(ValidationError::new(unknown, "is not a recognized argument"));
    }

    let mut values = Map::new();
    for param in params {
        match given.get(&param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(ValidationError::new(&param.name, "is required"));
                }
            }
            Some(value) => {
                let checked = param
                    .check(value)
                    .map_err(|reason| ValidationError::new(&param.name, reason))?;
                values.insert(param.name.clone(), checked);
            }
        }
    }

    Ok(Arguments { values })
}
