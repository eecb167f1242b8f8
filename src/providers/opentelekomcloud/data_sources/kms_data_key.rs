use async_trait::async_trait;
use chrono::Utc;

use super::DataSourceHandler;
use crate::providers::opentelekomcloud::OtcClient;
use crate::providers::opentelekomcloud::types::DataKeyOpts;
use crate::providers::{Context, ProviderError};
use crate::resource::ResourceData;

/// Generates a fresh data key under a customer master key. Every read
/// returns a new key, so the id is the time of the read.
pub struct KmsDataKey;

#[async_trait]
impl DataSourceHandler for KmsDataKey {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_kms_data_key_v1"
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let opts = DataKeyOpts {
            key_id: d.require_str("key_id")?.to_string(),
            encryption_context: d.get_string("encryption_context"),
            datakey_length: d.require_str("datakey_length")?.to_string(),
        };

        tracing::debug!(key_id = %opts.key_id, "requesting data key");
        let key = client
            .create_data_key(&opts)
            .await
            .context(format!("error creating data key under {}", opts.key_id))?;

        d.set_id(Utc::now().to_rfc3339());
        d.set("plain_text", key.plain_text);
        d.set("cipher_text", key.cipher_text);
        Ok(())
    }
}
