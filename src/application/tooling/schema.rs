//! Typed parameter schemas and argument coercion for tools.

use std::path::PathBuf;

use serde_json::{Map, Value, json};
use tracing::debug;

use super::error::ToolInvokeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl ParamKind {
    pub fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: false,
            default,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Renders the schema as a JSON Schema object for the model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.params {
            let mut property = Map::new();
            property.insert("type".into(), json!(spec.kind.json_type()));
            if let Some(description) = &spec.description {
                property.insert("description".into(), json!(description));
            }
            if let Some(default) = &spec.default {
                property.insert("default".into(), default.clone());
            }
            properties.insert(spec.name.clone(), Value::Object(property));
            if spec.required {
                required.push(json!(spec.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validates raw model arguments and converts them to the declared types.
    ///
    /// Missing optional parameters take their default; unknown keys are ignored.
    pub fn coerce(&self, tool: &str, arguments: &Value) -> Result<ToolArgs, ToolInvokeError> {
        let raw = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            Value::String(text) if text.trim().is_empty() => Map::new(),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => map,
                _ => {
                    return Err(ToolInvokeError::argument(
                        tool,
                        "arguments must be a JSON object",
                    ));
                }
            },
            other => {
                return Err(ToolInvokeError::argument(
                    tool,
                    format!("arguments must be a JSON object, got {other}"),
                ));
            }
        };

        let mut values = Map::new();
        for spec in &self.params {
            match raw.get(&spec.name) {
                Some(value) if !value.is_null() => {
                    let coerced = coerce_value(spec, value).ok_or_else(|| {
                        ToolInvokeError::argument(
                            tool,
                            format!(
                                "parameter '{}' expects {}, got {value}",
                                spec.name,
                                spec.kind.json_type()
                            ),
                        )
                    })?;
                    values.insert(spec.name.clone(), coerced);
                }
                _ => {
                    if let Some(default) = &spec.default {
                        values.insert(spec.name.clone(), default.clone());
                    } else if spec.required {
                        return Err(ToolInvokeError::argument(
                            tool,
                            format!("missing required parameter '{}'", spec.name),
                        ));
                    }
                }
            }
        }

        for key in raw.keys() {
            if !self.params.iter().any(|spec| &spec.name == key) {
                debug!(tool, parameter = %key, "Ignoring undeclared tool argument");
            }
        }

        Ok(ToolArgs {
            tool: tool.to_string(),
            values,
        })
    }
}

fn coerce_value(spec: &ParamSpec, value: &Value) -> Option<Value> {
    match spec.kind {
        ParamKind::String => match value {
            Value::String(_) => Some(value.clone()),
            Value::Number(number) => Some(Value::String(number.to_string())),
            Value::Bool(flag) => Some(Value::String(flag.to_string())),
            _ => None,
        },
        ParamKind::Integer => match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|float| float.fract() == 0.0)
                        .map(|float| float as i64)
                })
                .map(Value::from),
            Value::String(text) => text.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ParamKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

/// Arguments after coercion against a [`ToolSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArgs {
    tool: String,
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn string(&self, name: &str) -> Result<&str, ToolInvokeError> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(name))
    }

    pub fn integer(&self, name: &str) -> Result<i64, ToolInvokeError> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.missing(name))
    }

    /// String parameter interpreted as a filesystem path, with `~` and `$VAR` expanded.
    pub fn path(&self, name: &str) -> Result<PathBuf, ToolInvokeError> {
        let raw = self.string(name)?;
        let expanded = shellexpand::full(raw).map_err(|error| {
            ToolInvokeError::argument(&self.tool, format!("cannot expand path '{raw}': {error}"))
        })?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    fn missing(&self, name: &str) -> ToolInvokeError {
        ToolInvokeError::argument(&self.tool, format!("missing parameter '{name}'"))
    }
}
