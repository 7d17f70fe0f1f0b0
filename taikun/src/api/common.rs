//! Common types shared across the Taikun API families

use serde::{Deserialize, Serialize};

/// Paged list envelope used by every list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListResponse<T> {
    pub data: Vec<T>,
    pub total_count: i32,
}

/// Wire representation of the lock-manager command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Lock,
    Unlock,
}

impl LockMode {
    pub fn from_bool(lock: bool) -> Self {
        if lock {
            LockMode::Lock
        } else {
            LockMode::Unlock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Lock => "lock",
            LockMode::Unlock => "unlock",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockManagerCommand {
    pub id: i32,
    pub mode: String,
}

impl LockManagerCommand {
    pub fn new(id: i32, mode: LockMode) -> Self {
        Self {
            id,
            mode: mode.as_str().to_string(),
        }
    }
}

/// Key/value label attached to servers and VMs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

/// Query-string builder for list filters and pagination.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Response carrying only a freshly issued id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdResponse {
    pub id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_encode_and_skip_none() {
        let params = QueryParams::new()
            .add("projectId", 42)
            .add("name", "my project")
            .add_optional("organizationId", Some(7))
            .add_optional("search", None::<String>);

        let query = params.to_query_string();
        assert!(query.starts_with('?'));
        assert!(query.contains("projectId=42"));
        assert!(query.contains("name=my%20project"));
        assert!(query.contains("organizationId=7"));
        assert!(!query.contains("search="));
    }

    #[test]
    fn empty_query_params_render_nothing() {
        assert_eq!(QueryParams::new().to_query_string(), "");
    }

    #[test]
    fn lock_mode_round_trip() {
        assert_eq!(LockMode::from_bool(true).as_str(), "lock");
        assert_eq!(LockMode::from_bool(false).as_str(), "unlock");
    }

    #[test]
    fn list_envelope_decodes_camel_case() {
        #[derive(Deserialize)]
        struct Row {
            id: i32,
        }

        let body = r#"{"data":[{"id":1},{"id":2}],"totalCount":2}"#;
        let parsed: ApiListResponse<Row> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total_count, 2);
        assert_eq!(parsed.data[1].id, 2);
    }
}
