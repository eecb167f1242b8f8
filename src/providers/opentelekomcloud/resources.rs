//! Resource adapters. Each one translates declared attributes into API calls,
//! waits for the service to settle and writes the observed state back.

mod compute_instance;
mod credential;
mod image;
mod lb_monitor;
mod log_group;
mod port;
mod router_interface;
mod share_access_rules;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::{OtcClient, OtcError};
use crate::providers::ProviderError;
use crate::resource::{ResourceData, Timeouts};
use crate::wait::{RetryError, WaitError, retry};

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    fn force_new(&self) -> &'static [&'static str] {
        &[]
    }

    /// List attributes whose order the API does not preserve.
    fn set_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    fn importable(&self) -> bool {
        true
    }

    /// Checks attribute combinations the API would reject.
    fn validate(&self, _d: &ResourceData) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError>;

    /// Refreshes `d` from the API. Clears the id when the resource is gone.
    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError>;

    /// Resources whose attributes are all force-new only ever refresh.
    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError>;
}

pub fn all() -> Vec<Box<dyn ResourceHandler>> {
    vec![
        Box::new(compute_instance::ComputeInstance),
        Box::new(port::Port),
        Box::new(router_interface::RouterInterface),
        Box::new(lb_monitor::LbMonitor),
        Box::new(log_group::LogGroup),
        Box::new(share_access_rules::ShareAccessRules),
        Box::new(image::Image),
        Box::new(credential::Credential),
    ]
}

/// Treats a 404 as "the resource is gone": clears the id and succeeds.
/// Any other error is returned with `what` for context.
pub(crate) fn check_deleted(
    d: &mut ResourceData,
    err: OtcError,
    what: &str,
) -> Result<(), ProviderError> {
    if err.is_not_found() {
        tracing::info!(id = %d.id(), "{} not found, removing from state", what);
        d.set_id("");
        return Ok(());
    }
    Err(ProviderError::Api {
        message: format!("error retrieving {} {}", what, d.id()),
        source: err,
    })
}

fn classify(err: OtcError) -> RetryError<OtcError> {
    if err.is_retryable() {
        tracing::debug!(error = %err, "retrying after transient error");
        RetryError::Retryable(err)
    } else {
        RetryError::NonRetryable(err)
    }
}

/// Repeats an API call while it fails with a retryable status.
pub(crate) async fn retry_api<T, F, Fut>(
    timeout: Duration,
    mut operation: F,
) -> Result<T, WaitError<OtcError>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OtcError>>,
{
    retry(timeout, || {
        let attempt = operation();
        async move { attempt.await.map_err(classify) }
    })
    .await
}

pub(crate) fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}
