//! Stored state for managed resources.
//!
//! One JSON file records every resource the tool created or imported, keyed by
//! its `type.name` address. Writes go through a temp file and a rename so an
//! interrupted save never leaves a truncated file behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::resource::{Attributes, address};

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = "otc-provider";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub resources: Vec<ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: Vec::new(),
        }
    }
}

/// State of a single managed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// Set when a create obtained an id but did not finish. The next apply
    /// replaces the resource.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tainted: bool,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            id: id.into(),
            attributes,
            tainted: false,
        }
    }

    pub fn address(&self) -> String {
        address(&self.resource_type, &self.name)
    }
}

/// `$XDG_DATA_HOME/otc-provider/state.json`, or `./state.json` when the
/// platform has no data directory.
pub fn default_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(STATE_DIR).join(STATE_FILE))
        .unwrap_or_else(|| PathBuf::from(STATE_FILE))
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the state at `path`. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no state file, starting empty");
            return Ok(Self::new());
        }

        let raw = std::fs::read_to_string(path)?;
        let state: StateFile = serde_json::from_str(&raw)
            .map_err(|e| AppError::State(format!("{}: {}", path.display(), e)))?;
        if state.version > STATE_VERSION {
            return Err(AppError::State(format!(
                "{}: unsupported state version {}",
                path.display(),
                state.version
            )));
        }
        tracing::debug!(path = %path.display(), count = state.resources.len(), "state loaded");
        Ok(state)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        self.updated_at = Utc::now();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::State(format!("failed to serialize state: {}", e)))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), count = self.resources.len(), "state saved");
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.address() == address)
    }

    /// Inserts the resource, or replaces the one stored at the same address
    /// in place so the file keeps its order.
    pub fn upsert(&mut self, resource: ResourceState) {
        let address = resource.address();
        match self.resources.iter_mut().find(|r| r.address() == address) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
        self.updated_at = Utc::now();
    }

    pub fn remove(&mut self, address: &str) -> Option<ResourceState> {
        let index = self.resources.iter().position(|r| r.address() == address)?;
        self.updated_at = Utc::now();
        Some(self.resources.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
