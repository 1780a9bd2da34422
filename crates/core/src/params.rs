//! Operation parameter schemas and validated argument sets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{KmcpError, KmcpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Bool,
    Number,
}

impl ParamKind {
    /// JSON Schema type name.
    pub fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Bool => "boolean",
            ParamKind::Number => "number",
        }
    }

    fn accepts(self, v: &Value) -> bool {
        match self {
            ParamKind::String => v.is_string(),
            ParamKind::Bool => v.is_boolean(),
            ParamKind::Number => v.is_number(),
        }
    }
}

/// Declared parameter of an operation.
///
/// A required parameter never carries a default: `required()` clears it and
/// `with_default()` is ignored on required parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
}

impl ParamSpec {
    fn new(key: &str, kind: ParamKind, description: &str) -> Self {
        Self { key: key.to_string(), kind, required: false, default: None, description: description.to_string() }
    }

    pub fn string(key: &str, description: &str) -> Self { Self::new(key, ParamKind::String, description) }
    pub fn bool(key: &str, description: &str) -> Self { Self::new(key, ParamKind::Bool, description) }
    pub fn number(key: &str, description: &str) -> Self { Self::new(key, ParamKind::Number, description) }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.default = None;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        if !self.required {
            self.default = Some(value.into());
        }
        self
    }

    /// JSON Schema fragment for this parameter.
    pub fn schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), Value::String(self.kind.json_type().into()));
        if !self.description.is_empty() {
            prop.insert("description".into(), Value::String(self.description.clone()));
        }
        if let Some(d) = &self.default {
            prop.insert("default".into(), d.clone());
        }
        Value::Object(prop)
    }
}

/// JSON Schema object describing a parameter list.
pub fn input_schema(params: &[ParamSpec]) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();
    for p in params {
        props.insert(p.key.clone(), p.schema());
        if p.required {
            required.push(Value::String(p.key.clone()));
        }
    }
    serde_json::json!({
        "type": "object",
        "properties": Value::Object(props),
        "required": required,
    })
}

/// Arguments checked against a parameter list: required keys present, values
/// type-conformant, defaults filled in. Keys not declared are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArgumentSet {
    values: Map<String, Value>,
}

impl ArgumentSet {
    pub fn validate(params: &[ParamSpec], raw: &Value) -> KmcpResult<Self> {
        let empty = Map::new();
        let input = match raw {
            Value::Null => &empty,
            Value::Object(m) => m,
            _ => return Err(KmcpError::Validation("arguments must be a JSON object".into())),
        };
        let mut values = Map::new();
        for p in params {
            match input.get(&p.key) {
                None | Some(Value::Null) => {
                    if p.required {
                        return Err(KmcpError::Validation(format!("missing required argument '{}'", p.key)));
                    }
                    if let Some(d) = &p.default {
                        values.insert(p.key.clone(), d.clone());
                    }
                }
                Some(v) if p.kind.accepts(v) => {
                    values.insert(p.key.clone(), v.clone());
                }
                Some(_) => {
                    return Err(KmcpError::Validation(format!("argument '{}' must be a {}", p.key, p.kind.json_type())));
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.values.get(key) }

    /// String value, with the empty string treated as absent.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.values.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Integral view of a number; fractions truncate toward zero.
    pub fn number(&self, key: &str) -> Option<i64> {
        let v = self.values.get(key)?;
        v.as_i64().or_else(|| v.as_f64().map(|f| f.trunc() as i64))
    }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}
