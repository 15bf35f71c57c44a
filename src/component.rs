use serde::Serialize;
use serde_json::{json, Value};

use crate::options::OptionLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    StringArray,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaticOption {
    pub label: &'static str,
    pub value: &'static str,
}

/// One declared input of an action, with the metadata the host's form and
/// validation layers consume. Dynamic option lookups are declared as
/// explicit [`OptionLookup`] capabilities resolved by the host, never
/// invoked from the action's own perform path.
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<StaticOption>,
    #[serde(rename = "optionsLookup", skip_serializing_if = "Option::is_none")]
    pub options_lookup: Option<OptionLookup>,
    #[serde(rename = "optionsDependOn", skip_serializing_if = "Option::is_none")]
    pub options_depend_on: Option<&'static str>,
}

impl Property {
    pub fn string(name: &'static str, label: &'static str, description: &'static str) -> Self {
        Self {
            name,
            label,
            description,
            kind: PropertyKind::String,
            required: false,
            options: Vec::new(),
            options_lookup: None,
            options_depend_on: None,
        }
    }

    pub fn string_array(
        name: &'static str,
        label: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            kind: PropertyKind::StringArray,
            ..Self::string(name, label, description)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn static_options(mut self, options: Vec<StaticOption>) -> Self {
        self.options = options;
        self
    }

    pub fn lookup(mut self, lookup: OptionLookup) -> Self {
        self.options_lookup = Some(lookup);
        self
    }

    pub fn depends_on(mut self, property: &'static str) -> Self {
        self.options_depend_on = Some(property);
        self
    }
}

/// Named reference to an output shape defined by the shared component
/// catalog; the concrete field layout lives outside this connector.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSchema {
    #[serde(rename = "ref")]
    pub reference: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub properties: Vec<Property>,
    pub output: OutputSchema,
}

impl ActionDefinition {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// JSON Schema for the action's argument object, derived from the
    /// declared properties.
    pub fn input_schema(&self) -> Value {
        let mut props = serde_json::Map::new();
        let mut required: Vec<&str> = Vec::new();
        for p in &self.properties {
            let mut schema = match p.kind {
                PropertyKind::String => json!({"type": "string"}),
                PropertyKind::StringArray => {
                    json!({"type": "array", "items": {"type": "string"}})
                }
            };
            if !p.options.is_empty() {
                let values: Vec<&str> = p.options.iter().map(|o| o.value).collect();
                schema["enum"] = json!(values);
            }
            props.insert(p.name.to_string(), schema);
            if p.required {
                required.push(p.name);
            }
        }
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": props,
            "required": required,
        })
    }

    /// Host-layer validation of a raw argument object against the declared
    /// schema: required keys present and non-empty, values of the declared
    /// kind, static-option values inside their enum. Runs before perform;
    /// nulls on optional properties pass through as clearing signals.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<(), String> {
        let obj = match arguments {
            Value::Null => return self.missing_required(),
            Value::Object(map) => map,
            _ => return Err("arguments must be an object".to_string()),
        };
        for p in &self.properties {
            let value = obj.get(p.name);
            match value {
                None | Some(Value::Null) => {
                    if p.required {
                        return Err(format!("missing required parameter: {}", p.name));
                    }
                    continue;
                }
                Some(v) => match p.kind {
                    PropertyKind::String => {
                        let Some(s) = v.as_str() else {
                            return Err(format!("parameter {} must be a string", p.name));
                        };
                        if p.required && s.is_empty() {
                            return Err(format!("missing required parameter: {}", p.name));
                        }
                        if !p.options.is_empty() && !p.options.iter().any(|o| o.value == s) {
                            let allowed: Vec<&str> =
                                p.options.iter().map(|o| o.value).collect();
                            return Err(format!(
                                "parameter {} must be one of {:?}, got {:?}",
                                p.name, allowed, s
                            ));
                        }
                    }
                    PropertyKind::StringArray => {
                        let Some(items) = v.as_array() else {
                            return Err(format!(
                                "parameter {} must be an array of strings",
                                p.name
                            ));
                        };
                        if items.iter().any(|i| !i.is_string()) {
                            return Err(format!(
                                "parameter {} must be an array of strings",
                                p.name
                            ));
                        }
                    }
                },
            }
        }
        for key in obj.keys() {
            if self.property(key).is_none() {
                return Err(format!("unknown parameter: {}", key));
            }
        }
        Ok(())
    }

    fn missing_required(&self) -> Result<(), String> {
        match self.properties.iter().find(|p| p.required) {
            Some(p) => Err(format!("missing required parameter: {}", p.name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action;
    use serde_json::json;

    #[test]
    fn input_schema_declares_required_and_enum() {
        let def = action::definition();
        let schema = def.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["repository", "issue"]));
        assert_eq!(schema["properties"]["state"]["enum"], json!(["open", "closed"]));
        assert_eq!(schema["properties"]["labels"]["type"], "array");
    }

    #[test]
    fn validation_rejects_missing_repository() {
        let def = action::definition();
        let err = def
            .validate_arguments(&json!({"issue": "42"}))
            .unwrap_err();
        assert!(err.contains("repository"));
    }

    #[test]
    fn validation_rejects_unsupported_state() {
        let def = action::definition();
        let err = def
            .validate_arguments(&json!({
                "repository": "widgets", "issue": "42", "state": "reopened"
            }))
            .unwrap_err();
        assert!(err.contains("state"));
    }

    #[test]
    fn validation_allows_explicit_null_milestone() {
        let def = action::definition();
        def.validate_arguments(&json!({
            "repository": "widgets", "issue": "42", "milestone": null
        }))
        .unwrap();
    }

    #[test]
    fn validation_rejects_unknown_keys() {
        let def = action::definition();
        let err = def
            .validate_arguments(&json!({
                "repository": "widgets", "issue": "42", "priority": "high"
            }))
            .unwrap_err();
        assert!(err.contains("priority"));
    }
}
