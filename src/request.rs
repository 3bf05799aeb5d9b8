//! The inbound notification as seen by the synchronization core.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Request parameter naming the project explicitly.
pub const PROJECT_ID_PARAM: &str = "project_id";
/// Request parameter selecting a single repository of the project.
pub const REPOSITORY_ID_PARAM: &str = "repository_id";

/// A push notification payload plus the request's query parameters.
///
/// Only `repository.name` is read from the payload; everything else in it is
/// carried along untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncRequest {
    pub payload: Value,
    pub params: HashMap<String, String>,
}

impl SyncRequest {
    pub fn new(payload: Value, params: HashMap<String, String>) -> Self {
        Self { payload, params }
    }

    /// Parses a raw JSON request body.
    pub fn from_json(body: &str, params: HashMap<String, String>) -> Result<Self> {
        let payload = serde_json::from_str(body).map_err(|e| Error::Payload {
            message: format!("Payload is not valid JSON: {}", e),
        })?;
        Ok(Self::new(payload, params))
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn project_id(&self) -> Option<&str> {
        self.params.get(PROJECT_ID_PARAM).map(String::as_str)
    }

    pub fn repository_id(&self) -> Option<&str> {
        self.params.get(REPOSITORY_ID_PARAM).map(String::as_str)
    }

    /// `repository.name` from the payload. Numbers are stringified; any other
    /// non-string value counts as missing.
    pub fn repository_name(&self) -> Option<String> {
        match self.payload.get("repository")?.get("name")? {
            Value::String(name) => Some(name.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// The project identifier this delivery targets: the `project_id`
    /// parameter if present, otherwise the payload's repository name.
    pub fn project_identifier(&self) -> Option<String> {
        self.project_id()
            .map(str::to_string)
            .or_else(|| self.repository_name())
    }
}
