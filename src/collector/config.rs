//! Optional per-method query configuration, loaded from a JSON file of
//! the shape `{ "<method>": { "query": "...", "attributes": [...] } }`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryConfig(HashMap<String, MethodOverride>);

impl QueryConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Query config file {} could not be opened: {e}", path.display()))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            crate::Error::Config(format!("Query config file {} is not valid: {e}", path.display()))
        })
    }

    pub fn get(&self, method: &str) -> Option<&MethodOverride> {
        self.0.get(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let config: QueryConfig = serde_json::from_str(
            r#"{"users": {"query": "(objectClass=user)", "attributes": ["mail"]}}"#,
        )
        .unwrap();
        let users = config.get("users").unwrap();
        assert_eq!(users.query.as_deref(), Some("(objectClass=user)"));
        assert_eq!(users.attributes.as_deref(), Some(&["mail".to_string()][..]));
        assert!(config.get("groups").is_none());
    }
}
