mod api;
mod client;
mod data_sources;
mod error;
mod resources;
mod types;

pub use client::{IMAGE_PATCH_CONTENT_TYPE, OtcClient};
pub use error::OtcError;

use std::collections::BTreeMap;

use async_trait::async_trait;

use data_sources::DataSourceHandler;
use resources::ResourceHandler;

use super::{Provider, ProviderError, ResourceInfo};
use crate::config::ProviderConfig;
use crate::resource::ResourceData;

pub struct OtcProvider {
    client: OtcClient,
    resources: BTreeMap<&'static str, Box<dyn ResourceHandler>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSourceHandler>>,
}

impl OtcProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = OtcClient::new(&config)?;
        Ok(Self::with_client(client))
    }

    /// NOTE: Primarily used for testing with mock servers.
    pub fn with_client(client: OtcClient) -> Self {
        let resources = resources::all()
            .into_iter()
            .map(|handler| (handler.type_name(), handler))
            .collect();
        let data_sources = data_sources::all()
            .into_iter()
            .map(|handler| (handler.type_name(), handler))
            .collect();

        Self {
            client,
            resources,
            data_sources,
        }
    }

    fn handler(&self, resource_type: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }
}

#[async_trait]
impl Provider for OtcProvider {
    fn name(&self) -> &str {
        "opentelekomcloud"
    }

    fn resource_types(&self) -> Vec<&str> {
        self.resources.keys().copied().collect()
    }

    fn data_source_types(&self) -> Vec<&str> {
        self.data_sources.keys().copied().collect()
    }

    fn resource_info(&self, resource_type: &str) -> Result<ResourceInfo, ProviderError> {
        let handler = self.handler(resource_type)?;
        Ok(ResourceInfo {
            timeouts: handler.default_timeouts(),
            force_new: handler.force_new(),
            set_attributes: handler.set_attributes(),
            importable: handler.importable(),
        })
    }

    async fn create(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let handler = self.handler(d.resource_type())?;
        handler.validate(d)?;
        tracing::info!(resource_type = %d.resource_type(), "creating resource");
        handler.create(&self.client, d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let handler = self.handler(d.resource_type())?;
        handler.read(&self.client, d).await
    }

    async fn update(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let handler = self.handler(d.resource_type())?;
        handler.validate(d)?;
        tracing::info!(resource_type = %d.resource_type(), id = %d.id(), "updating resource");
        handler.update(&self.client, d).await
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let handler = self.handler(d.resource_type())?;
        tracing::info!(resource_type = %d.resource_type(), id = %d.id(), "deleting resource");
        handler.delete(&self.client, d).await
    }

    async fn import(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let handler = self.handler(d.resource_type())?;
        if !handler.importable() {
            return Err(ProviderError::ImportNotSupported(
                d.resource_type().to_string(),
            ));
        }
        handler.read(&self.client, d).await
    }

    async fn read_data_source(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let handler = self
            .data_sources
            .get(d.resource_type())
            .ok_or_else(|| ProviderError::UnknownDataSource(d.resource_type().to_string()))?;
        handler.read(&self.client, d).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn provider() -> OtcProvider {
        OtcProvider::new(ProviderConfig::new("token")).unwrap()
    }

    #[test]
    fn test_every_handler_is_registered_under_its_type_name() {
        let provider = provider();
        assert_eq!(provider.resource_types().len(), 8);
        assert_eq!(provider.data_source_types().len(), 2);
        for resource_type in provider.resource_types() {
            assert!(resource_type.starts_with("opentelekomcloud_"));
        }
    }

    #[test]
    fn test_resource_info_carries_default_timeouts() {
        let provider = provider();

        let compute = provider
            .resource_info("opentelekomcloud_compute_instance_v2")
            .unwrap();
        assert_eq!(compute.timeouts.create, Duration::from_secs(30 * 60));

        let image = provider
            .resource_info("opentelekomcloud_images_image_v2")
            .unwrap();
        assert_eq!(image.timeouts.create, Duration::from_secs(10 * 60));
        assert_eq!(image.timeouts.delete, Duration::from_secs(3 * 60));
        assert!(image.force_new.contains(&"instance_id"));
    }

    #[test]
    fn test_resource_info_lists_unordered_attributes() {
        let provider = provider();

        let port = provider
            .resource_info("opentelekomcloud_networking_port_v2")
            .unwrap();
        assert!(port.set_attributes.contains(&"security_group_ids"));
        assert!(port.set_attributes.contains(&"allowed_address_pairs"));

        let compute = provider
            .resource_info("opentelekomcloud_compute_instance_v2")
            .unwrap();
        assert_eq!(compute.set_attributes, &["security_groups"]);
    }

    #[test]
    fn test_router_interface_is_not_importable() {
        let provider = provider();
        let info = provider
            .resource_info("opentelekomcloud_networking_router_interface_v2")
            .unwrap();
        assert!(!info.importable);
    }

    #[tokio::test]
    async fn test_import_rejected_for_non_importable_type() {
        let provider = provider();
        let mut d = ResourceData::new("opentelekomcloud_networking_router_interface_v2");
        d.set_id("port1");
        let result = provider.import(&mut d).await;
        assert!(matches!(result, Err(ProviderError::ImportNotSupported(_))));
    }

    #[tokio::test]
    async fn test_unknown_data_source() {
        let provider = provider();
        let mut d = ResourceData::new("opentelekomcloud_nope_v1");
        let result = provider.read_data_source(&mut d).await;
        assert!(matches!(result, Err(ProviderError::UnknownDataSource(_))));
    }

    #[tokio::test]
    async fn test_create_validates_before_calling_the_api() {
        let provider = provider();
        let mut d = ResourceData::new("opentelekomcloud_lb_monitor_v2");
        d.set("pool_id", "pool1");
        d.set("type", "ICMP");
        let result = provider.create(&mut d).await;
        assert!(matches!(result, Err(ProviderError::InvalidAttribute(_))));
    }
}
