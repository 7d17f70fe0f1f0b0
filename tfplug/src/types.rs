//! Core value types: the dynamic tree the host engine hands to providers
//!
//! All configuration and state data arrives as a tagged-variant tree.
//! Handlers must go through the typed accessors, which fail loudly on a
//! type mismatch instead of silently coercing.

use crate::error::{Result, TfplugError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A single value in configuration or state.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null
    Null,
    Bool(bool),
    /// All numbers are f64 to match the host's type system
    Number(f64),
    String(String),
    /// Ordered, allows duplicates
    List(Vec<Dynamic>),
    /// Objects and maps both arrive as string-keyed maps
    Map(HashMap<String, Dynamic>),
    /// Not yet known during planning
    Unknown,
}

impl Dynamic {
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    /// True for null, unknown, the empty string and the empty list.
    /// This is the "user left it out" test used by diff suppression and
    /// the enable/disable heuristics.
    pub fn is_unset(&self) -> bool {
        match self {
            Dynamic::Null | Dynamic::Unknown => true,
            Dynamic::String(s) => s.is_empty(),
            Dynamic::List(l) => l.is_empty(),
            _ => false,
        }
    }

    /// Convert from a JSON value. Unknown round-trips as "__unknown__".
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Dynamic::Null,
            serde_json::Value::Bool(b) => Dynamic::Bool(b),
            serde_json::Value::Number(n) => Dynamic::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) if s == "__unknown__" => Dynamic::Unknown,
            serde_json::Value::String(s) => Dynamic::String(s),
            serde_json::Value::Array(items) => {
                Dynamic::List(items.into_iter().map(Dynamic::from_json).collect())
            }
            serde_json::Value::Object(map) => Dynamic::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Dynamic::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str("__unknown__"),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Dynamic::from_json(value))
    }
}

/// DynamicValue wraps a Dynamic tree and provides path-based access.
/// This is what every resource operation receives and returns.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn empty_map() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value: Dynamic = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Raw value at a path, or None if any step is missing.
    pub fn get(&self, path: &AttributePath) -> Option<&Dynamic> {
        self.navigate(path).ok()
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        let value = self.navigate(path)?;
        value
            .as_string()
            .map(str::to_string)
            .ok_or_else(|| Self::mismatch(path, "string", value))
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        let value = self.navigate(path)?;
        value
            .as_number()
            .ok_or_else(|| Self::mismatch(path, "number", value))
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        let value = self.navigate(path)?;
        value
            .as_bool()
            .ok_or_else(|| Self::mismatch(path, "bool", value))
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        let value = self.navigate(path)?;
        value
            .as_list()
            .map(<[Dynamic]>::to_vec)
            .ok_or_else(|| Self::mismatch(path, "list", value))
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        let value = self.navigate(path)?;
        value
            .as_map()
            .cloned()
            .ok_or_else(|| Self::mismatch(path, "map", value))
    }

    /// List of maps, the shape of every nested block collection.
    pub fn get_list_of_maps(&self, path: &AttributePath) -> Result<Vec<HashMap<String, Dynamic>>> {
        let items = self.get_list(path)?;
        items
            .into_iter()
            .map(|item| match item {
                Dynamic::Map(m) => Ok(m),
                other => Err(Self::mismatch(path, "map", &other)),
            })
            .collect()
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set(path, Dynamic::List(value))
    }

    pub fn set_map(&mut self, path: &AttributePath, value: HashMap<String, Dynamic>) -> Result<()> {
        self.set(path, Dynamic::Map(value))
    }

    pub fn set_null(&mut self, path: &AttributePath) -> Result<()> {
        self.set(path, Dynamic::Null)
    }

    pub fn set(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        if path.steps.is_empty() {
            self.value = new_value;
            return Ok(());
        }

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        let last = path.steps.len() - 1;

        for (idx, step) in path.steps.iter().enumerate() {
            let at_leaf = idx == last;
            match (current, step) {
                (Dynamic::Map(m), AttributePathStep::Name(name)) => {
                    if at_leaf {
                        m.insert(name.clone(), new_value);
                        return Ok(());
                    }
                    let next_is_index =
                        matches!(path.steps[idx + 1], AttributePathStep::Index(_));
                    current = m.entry(name.clone()).or_insert_with(|| {
                        if next_is_index {
                            Dynamic::List(Vec::new())
                        } else {
                            Dynamic::Map(HashMap::new())
                        }
                    });
                }
                (Dynamic::List(l), AttributePathStep::Index(i)) => {
                    let i = *i;
                    if i >= l.len() {
                        return Err(TfplugError::Custom(format!(
                            "list index {} out of bounds at '{}'",
                            i, path
                        )));
                    }
                    if at_leaf {
                        l[i] = new_value;
                        return Ok(());
                    }
                    current = &mut l[i];
                }
                _ => {
                    return Err(TfplugError::Custom(format!(
                        "cannot navigate '{}': step does not match value shape",
                        path
                    )))
                }
            }
        }

        unreachable!("loop always returns at the leaf step")
    }

    fn navigate(&self, path: &AttributePath) -> Result<&Dynamic> {
        let mut current = &self.value;
        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::Name(name)) => {
                    m.get(name).ok_or_else(|| TfplugError::AttributeNotFound {
                        path: path.to_string(),
                    })?
                }
                (Dynamic::List(l), AttributePathStep::Index(i)) => {
                    l.get(*i).ok_or_else(|| TfplugError::AttributeNotFound {
                        path: path.to_string(),
                    })?
                }
                _ => {
                    return Err(TfplugError::AttributeNotFound {
                        path: path.to_string(),
                    })
                }
            };
        }
        Ok(current)
    }

    fn mismatch(path: &AttributePath, expected: &str, actual: &Dynamic) -> TfplugError {
        TfplugError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }
}

/// Path to an attribute within a DynamicValue.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    Name(String),
    Index(usize),
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::Name(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps.push(AttributePathStep::Name(name.to_string()));
        self
    }

    pub fn index(mut self, idx: usize) -> Self {
        self.steps.push(AttributePathStep::Index(idx));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::Name(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                AttributePathStep::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// A warning or error surfaced to the user.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// True if any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Config and State are both dynamic trees; the aliases keep signatures
/// readable.
pub type Config = DynamicValue;
pub type State = DynamicValue;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip_through_path() {
        let mut dv = DynamicValue::empty_map();
        dv.set_string(&AttributePath::new("name"), "test".to_string())
            .unwrap();
        assert_eq!(dv.get_string(&AttributePath::new("name")).unwrap(), "test");
    }

    #[test]
    fn nested_set_creates_intermediate_maps() {
        let mut dv = DynamicValue::empty_map();
        let path = AttributePath::new("config").attribute("endpoint");
        dv.set_string(&path, "https://api.taikun.cloud".to_string())
            .unwrap();
        assert_eq!(
            dv.get_string(&path).unwrap(),
            "https://api.taikun.cloud"
        );
    }

    #[test]
    fn list_index_navigation() {
        let mut dv = DynamicValue::empty_map();
        dv.set_list(
            &AttributePath::new("servers"),
            vec![Dynamic::Map(HashMap::from([(
                "name".to_string(),
                Dynamic::String("bastion".to_string()),
            )]))],
        )
        .unwrap();

        let path = AttributePath::new("servers").index(0).attribute("name");
        assert_eq!(dv.get_string(&path).unwrap(), "bastion");
    }

    #[test]
    fn type_mismatch_fails_loudly() {
        let mut dv = DynamicValue::empty_map();
        dv.set_number(&AttributePath::new("count"), 3.0).unwrap();

        let err = dv.get_string(&AttributePath::new("count")).unwrap_err();
        assert!(err.to_string().contains("expected string"));
    }

    #[test]
    fn json_round_trip_preserves_unknown() {
        let mut dv = DynamicValue::empty_map();
        dv.set(&AttributePath::new("id"), Dynamic::Unknown).unwrap();
        let encoded = dv.encode_json().unwrap();
        let decoded = DynamicValue::decode_json(&encoded).unwrap();
        assert_eq!(
            decoded.get(&AttributePath::new("id")),
            Some(&Dynamic::Unknown)
        );
    }

    #[test]
    fn is_unset_semantics() {
        assert!(Dynamic::Null.is_unset());
        assert!(Dynamic::Unknown.is_unset());
        assert!(Dynamic::String(String::new()).is_unset());
        assert!(Dynamic::List(vec![]).is_unset());
        assert!(!Dynamic::Number(0.0).is_unset());
        assert!(!Dynamic::Bool(false).is_unset());
        assert!(!Dynamic::String("x".to_string()).is_unset());
    }
}
