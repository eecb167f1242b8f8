use async_trait::async_trait;

use super::{ResourceHandler, check_deleted};
use crate::providers::opentelekomcloud::OtcClient;
use crate::providers::{Context, ProviderError};
use crate::resource::ResourceData;

pub struct LogGroup;

#[async_trait]
impl ResourceHandler for LogGroup {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_lts_group_v2"
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["group_name"]
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("group_name").map(|_| ())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let name = d.require_str("group_name")?.to_string();
        let id = client
            .create_log_group(&name)
            .await
            .context("error creating log group")?;
        tracing::info!(id = %id, name = %name, "log group created");

        d.set_id(id);
        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let groups = match client.list_log_groups().await {
            Ok(groups) => groups,
            Err(e) => return check_deleted(d, e, "log group"),
        };

        let found = groups.into_iter().find(|group| group.id == d.id());
        match found {
            Some(group) => {
                d.set("group_name", group.name);
                d.set("ttl_in_days", group.ttl_in_days);
            }
            None => {
                tracing::info!(id = %d.id(), "log group not found, removing from state");
                d.set_id("");
            }
        }
        Ok(())
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.delete_log_group(d.id()).await;
        if let Err(e) = result {
            return check_deleted(d, e, "log group");
        }
        tracing::info!(id = %d.id(), "log group deleted");
        d.set_id("");
        Ok(())
    }
}
