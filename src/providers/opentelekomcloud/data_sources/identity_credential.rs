use async_trait::async_trait;
use serde_json::{Value, json};

use super::DataSourceHandler;
use crate::providers::opentelekomcloud::OtcClient;
use crate::providers::{Context, ProviderError};
use crate::resource::ResourceData;

/// Lists the AK/SK pairs of one user, or of the caller when no user is given.
pub struct IdentityCredential;

const ALL_CREDENTIALS_ID: &str = "credentials";

#[async_trait]
impl DataSourceHandler for IdentityCredential {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_identity_credential_v3"
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let user_id = d.get_string("user_id");
        let filter = (!user_id.is_empty()).then_some(user_id.as_str());

        let credentials = client
            .list_credentials(filter)
            .await
            .context("error retrieving AK/SK information")?;
        tracing::debug!(count = credentials.len(), "credentials listed");

        let entries: Vec<Value> = credentials
            .into_iter()
            .map(|credential| {
                json!({
                    "user_id": credential.user_id,
                    "access": credential.access,
                    "status": credential.status,
                    "create_time": credential.create_time,
                    "description": credential.description,
                })
            })
            .collect();

        let id = if user_id.is_empty() {
            ALL_CREDENTIALS_ID.to_string()
        } else {
            user_id.clone()
        };
        d.set_id(id);
        d.set("credentials", entries);
        Ok(())
    }
}
