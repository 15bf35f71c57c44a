use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    #[error("parameter {0} must be a string")]
    NotAString(String),
    #[error("parameter {0} must be an array of strings")]
    NotAStringArray(String),
}

/// Accessor over the raw argument object of an action invocation.
///
/// Required accessors fail at access time when the key is absent or null,
/// before any network call is composed. Optional accessors distinguish a
/// key that was never supplied from one explicitly set to null, since the
/// upstream API treats transmitted nulls as "clear this field".
#[derive(Debug, Clone, Default)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new(arguments: Value) -> Self {
        match arguments {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn required_str(&self, name: &str) -> Result<&str, ParamError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Err(ParamError::MissingParameter(name.to_string())),
            Some(Value::String(s)) if s.is_empty() => {
                Err(ParamError::MissingParameter(name.to_string()))
            }
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ParamError::NotAString(name.to_string())),
        }
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, ParamError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ParamError::NotAString(name.to_string())),
        }
    }

    pub fn opt_str_array(&self, name: &str) -> Result<Option<Vec<String>>, ParamError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        _ => return Err(ParamError::NotAStringArray(name.to_string())),
                    }
                }
                Ok(Some(out))
            }
            Some(_) => Err(ParamError::NotAStringArray(name.to_string())),
        }
    }
}
