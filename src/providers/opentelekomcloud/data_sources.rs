//! Read-only lookups. A data source is read on every run and never stored
//! as a managed resource.

mod identity_credential;
mod kms_data_key;

use async_trait::async_trait;

use super::OtcClient;
use crate::providers::ProviderError;
use crate::resource::ResourceData;

#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError>;
}

pub fn all() -> Vec<Box<dyn DataSourceHandler>> {
    vec![
        Box::new(identity_credential::IdentityCredential),
        Box::new(kms_data_key::KmsDataKey),
    ]
}
