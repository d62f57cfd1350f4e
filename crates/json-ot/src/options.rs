use serde::{Deserialize, Serialize};

use crate::generate_session_id;

/// Settings for opening a [`RealTimeDocument`](crate::RealTimeDocument).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentOptions {
    pub model_id: String,
    /// Random when not configured. Also prefixes the ids of new nodes.
    pub session_id: String,
    pub user_id: Option<String>,
    /// Server version the initial snapshot was taken at.
    pub version: u64,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            model_id: "default".to_string(),
            session_id: generate_session_id(),
            user_id: None,
            version: 0,
        }
    }
}

impl DocumentOptions {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}
