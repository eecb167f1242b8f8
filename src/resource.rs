use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::providers::ProviderError;

pub type Attributes = serde_json::Map<String, Value>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Create,
    Read,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

impl Timeouts {
    pub fn get(&self, kind: TimeoutKind) -> Duration {
        match kind {
            TimeoutKind::Create => self.create,
            TimeoutKind::Read => self.read,
            TimeoutKind::Update => self.update,
            TimeoutKind::Delete => self.delete,
        }
    }

    pub fn with_overrides(mut self, overrides: &TimeoutOverrides) -> Result<Self, ProviderError> {
        let parse = |raw: &Option<String>, current: Duration| match raw {
            Some(value) => parse_duration(value).map_err(ProviderError::InvalidAttribute),
            None => Ok(current),
        };
        self.create = parse(&overrides.create, self.create)?;
        self.read = parse(&overrides.read, self.read)?;
        self.update = parse(&overrides.update, self.update)?;
        self.delete = parse(&overrides.delete, self.delete)?;
        Ok(self)
    }
}

/// Per-resource timeout overrides as written in a manifest (`"10m"`, `"90s"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

/// Parses durations like `30s`, `10m`, `1h30m`. A bare number means seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(input).map_err(|e| format!("invalid duration '{}': {}", input, e))
}

/// Attribute view of one resource while an operation runs against it.
///
/// `attributes` is the working copy: declared values layered over the last
/// stored state, and whatever the adapter writes back with [`set`](Self::set).
/// `prior` is the stored state the operation started from, which is what
/// [`has_change`](Self::has_change) compares against.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceData {
    resource_type: String,
    id: String,
    attributes: Attributes,
    prior: Attributes,
    timeouts: Timeouts,
}

impl ResourceData {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: String::new(),
            attributes: Attributes::new(),
            prior: Attributes::new(),
            timeouts: Timeouts::default(),
        }
    }

    /// Data for a resource that does not exist yet.
    pub fn from_config(resource_type: impl Into<String>, config: Attributes) -> Self {
        Self {
            attributes: config,
            ..Self::new(resource_type)
        }
    }

    /// Data for an existing resource with no pending changes.
    pub fn from_state(resource_type: impl Into<String>, id: impl Into<String>, state: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes: state.clone(),
            prior: state,
            ..Self::new(resource_type)
        }
    }

    /// Data for an existing resource with declared values layered on top.
    pub fn with_changes(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        state: Attributes,
        config: &Attributes,
    ) -> Self {
        let mut attributes = state.clone();
        for (key, value) in config {
            attributes.insert(key.clone(), value.clone());
        }
        Self {
            id: id.into(),
            attributes,
            prior: state,
            ..Self::new(resource_type)
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// An empty id marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    pub fn timeout(&self, kind: TimeoutKind) -> Duration {
        self.timeouts.get(kind)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// String value or `""`, mirroring how an unset optional string is sent.
    pub fn get_string(&self, key: &str) -> String {
        self.get_str(key).unwrap_or_default().to_string()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_list(&self, key: &str) -> Vec<Value> {
        self.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get_list(key)
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn get_map(&self, key: &str) -> Option<&serde_json::Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    /// True when the attribute is set to something other than its zero value.
    pub fn has_filled(&self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64() != Some(0.0),
            Some(Value::Bool(b)) => *b,
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Null) => false,
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ProviderError> {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ProviderError::MissingAttribute {
                resource_type: self.resource_type.clone(),
                attribute: key.to_string(),
            }),
        }
    }

    pub fn require_i64(&self, key: &str) -> Result<i64, ProviderError> {
        self.get_i64(key).ok_or_else(|| ProviderError::MissingAttribute {
            resource_type: self.resource_type.clone(),
            attribute: key.to_string(),
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn has_change(&self, key: &str) -> bool {
        let (old, new) = self.get_change(key);
        old != new
    }

    pub fn get_change(&self, key: &str) -> (Option<&Value>, Option<&Value>) {
        (
            self.prior.get(key).filter(|v| !v.is_null()),
            self.get(key),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub timeouts: TimeoutOverrides,
}

impl ResourceSpec {
    pub fn address(&self) -> String {
        address(&self.resource_type, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    #[serde(rename = "type")]
    pub data_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Declared resources and data sources, read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub data: Vec<DataSpec>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .map_err(|e| AppError::Manifest(format!("{}: {}", path.display(), e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for spec in &self.resources {
            if !seen.insert(spec.address()) {
                return Err(AppError::Manifest(format!(
                    "duplicate resource address '{}'",
                    spec.address()
                )));
            }
        }
        let mut seen = HashSet::new();
        for spec in &self.data {
            if !seen.insert(address(&spec.data_type, &spec.name)) {
                return Err(AppError::Manifest(format!(
                    "duplicate data source address 'data.{}.{}'",
                    spec.data_type, spec.name
                )));
            }
        }
        Ok(())
    }
}

pub fn address(resource_type: &str, name: &str) -> String {
    format!("{}.{}", resource_type, name)
}

/// Splits `type.name` into its parts.
pub fn parse_address(address: &str) -> Option<(&str, &str)> {
    let (resource_type, name) = address.rsplit_once('.')?;
    if resource_type.is_empty() || name.is_empty() {
        return None;
    }
    Some((resource_type, name))
}
