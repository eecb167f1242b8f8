use async_trait::async_trait;

use super::{ResourceHandler, check_deleted};
use crate::providers::opentelekomcloud::OtcClient;
use crate::providers::opentelekomcloud::types::{CredentialCreateOpts, CredentialUpdateOpts};
use crate::providers::{Context, ProviderError};
use crate::resource::ResourceData;

/// A permanent AK/SK pair. The id is the access key.
pub struct Credential;

const STATUSES: &[&str] = &["active", "inactive"];

#[async_trait]
impl ResourceHandler for Credential {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_identity_credential_v3"
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["user_id"]
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("user_id")?;
        match d.get_str("status") {
            Some(status) if !STATUSES.contains(&status) => Err(ProviderError::InvalidAttribute(
                format!("status must be one of {:?}, got '{}'", STATUSES, status),
            )),
            _ => Ok(()),
        }
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let opts = CredentialCreateOpts {
            user_id: d.require_str("user_id")?.to_string(),
            description: d.get_string("description"),
        };
        let credential = client
            .create_credential(&opts)
            .await
            .context("error creating AK/SK")?;
        tracing::info!(access = %credential.access, user_id = %opts.user_id, "AK/SK created");

        d.set_id(credential.access.as_str());
        // The secret is only returned on creation and kept from here on.
        if let Some(secret) = credential.secret {
            d.set("secret", secret);
        }

        if d.get_str("status") == Some("inactive") {
            let update = CredentialUpdateOpts {
                status: Some("inactive".to_string()),
                ..Default::default()
            };
            client
                .update_credential(&credential.access, &update)
                .await
                .context(format!("error deactivating AK/SK {}", credential.access))?;
        }

        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.get_credential(d.id()).await;
        let credential = match result {
            Ok(credential) => credential,
            Err(e) => return check_deleted(d, e, "AK/SK"),
        };

        d.set("access", credential.access);
        d.set("user_id", credential.user_id);
        d.set("status", credential.status);
        d.set("description", credential.description);
        d.set("create_time", credential.create_time);
        Ok(())
    }

    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let mut opts = CredentialUpdateOpts::default();
        if d.has_change("status") {
            opts.status = Some(d.get_string("status"));
        }
        if d.has_change("description") {
            opts.description = Some(d.get_string("description"));
        }

        if opts != CredentialUpdateOpts::default() {
            client
                .update_credential(d.id(), &opts)
                .await
                .context(format!("error updating AK/SK {}", d.id()))?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.delete_credential(d.id()).await;
        if let Err(e) = result {
            return check_deleted(d, e, "AK/SK");
        }
        tracing::info!(access = %d.id(), "AK/SK deleted");
        d.set_id("");
        Ok(())
    }
}
