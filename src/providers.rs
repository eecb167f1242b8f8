pub mod opentelekomcloud;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::resource::{ResourceData, Timeouts};
use crate::wait::WaitError;

pub use opentelekomcloud::OtcError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    #[error("unknown data source: {0}")]
    UnknownDataSource(String),

    #[error("resource type {0} does not support import")]
    ImportNotSupported(String),

    #[error("{resource_type}: missing required attribute '{attribute}'")]
    MissingAttribute {
        resource_type: String,
        attribute: String,
    },

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("{message}: {source}")]
    Api {
        message: String,
        #[source]
        source: OtcError,
    },

    #[error("{message}: {source}")]
    Wait {
        message: String,
        #[source]
        source: WaitError<OtcError>,
    },

    #[error(transparent)]
    Otc(#[from] OtcError),
}

/// Attaches a human readable operation to API and wait failures.
pub trait Context<T> {
    fn context(self, message: impl Into<String>) -> Result<T, ProviderError>;
}

impl<T> Context<T> for Result<T, OtcError> {
    fn context(self, message: impl Into<String>) -> Result<T, ProviderError> {
        self.map_err(|source| ProviderError::Api {
            message: message.into(),
            source,
        })
    }
}

impl<T> Context<T> for Result<T, WaitError<OtcError>> {
    fn context(self, message: impl Into<String>) -> Result<T, ProviderError> {
        self.map_err(|source| ProviderError::Wait {
            message: message.into(),
            source,
        })
    }
}

/// Static facts about a resource type that the reconciler needs for planning.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    pub timeouts: Timeouts,
    /// Attributes whose change requires destroying and recreating the resource.
    pub force_new: &'static [&'static str],
    /// List attributes the API treats as unordered sets.
    pub set_attributes: &'static [&'static str],
    pub importable: bool,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn resource_types(&self) -> Vec<&str>;
    fn data_source_types(&self) -> Vec<&str>;
    fn resource_info(&self, resource_type: &str) -> Result<ResourceInfo, ProviderError>;

    async fn create(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn read(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn update(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn delete(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn import(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn read_data_source(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
}

pub fn get_provider(name: &str, config: ProviderConfig) -> Result<Box<dyn Provider>, ProviderError> {
    match name {
        "opentelekomcloud" => Ok(Box::new(opentelekomcloud::OtcProvider::new(config)?)),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
