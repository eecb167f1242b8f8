//! otc-provider - Open Telekom Cloud resource provider
//!
//! Declares cloud resources in a manifest, converges them through the Open
//! Telekom Cloud REST APIs and records what was created in a local state file.

pub mod config;
pub mod error;
pub mod output;
pub mod providers;
pub mod reconcile;
pub mod resource;
pub mod state;
pub mod wait;

pub use config::{PollConfig, ProviderConfig};
pub use error::AppError;
pub use providers::opentelekomcloud::{OtcClient, OtcError, OtcProvider};
pub use providers::{Provider, ProviderError};
pub use reconcile::{Plan, Reconciler};
pub use resource::{Manifest, ResourceData, Timeouts};
pub use wait::StateChangeConf;
