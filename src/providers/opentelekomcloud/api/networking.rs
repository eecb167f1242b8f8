use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers::opentelekomcloud::types::{
    Port, PortCreateOpts, PortUpdateOpts, RouterInterface, RouterInterfaceOpts,
};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Serialize)]
struct PortRequest<'a, T> {
    port: &'a T,
}

#[derive(Deserialize)]
struct PortEnvelope {
    port: Port,
}

impl OtcClient {
    fn port_url(&self, id: &str) -> String {
        format!("{}/v2.0/ports/{}", self.endpoints().networking, id)
    }

    fn router_url(&self, router_id: &str, action: &str) -> String {
        format!(
            "{}/v2.0/routers/{}/{}",
            self.endpoints().networking,
            router_id,
            action
        )
    }

    pub async fn create_port(&self, opts: &PortCreateOpts) -> Result<Port, OtcError> {
        let url = format!("{}/v2.0/ports", self.endpoints().networking);
        let envelope: PortEnvelope = self.post(&url, &PortRequest { port: opts }).await?;
        Ok(envelope.port)
    }

    pub async fn get_port(&self, id: &str) -> Result<Port, OtcError> {
        let envelope: PortEnvelope = self.get(&self.port_url(id)).await?;
        Ok(envelope.port)
    }

    pub async fn update_port(&self, id: &str, opts: &PortUpdateOpts) -> Result<Port, OtcError> {
        let envelope: PortEnvelope = self
            .put(&self.port_url(id), &PortRequest { port: opts })
            .await?;
        Ok(envelope.port)
    }

    pub async fn delete_port(&self, id: &str) -> Result<(), OtcError> {
        self.delete(&self.port_url(id)).await
    }

    pub async fn add_router_interface(
        &self,
        router_id: &str,
        opts: &RouterInterfaceOpts,
    ) -> Result<RouterInterface, OtcError> {
        self.put(&self.router_url(router_id, "add_router_interface"), opts)
            .await
    }

    pub async fn remove_router_interface(
        &self,
        router_id: &str,
        opts: &RouterInterfaceOpts,
    ) -> Result<(), OtcError> {
        let _: Value = self
            .put(&self.router_url(router_id, "remove_router_interface"), opts)
            .await?;
        Ok(())
    }
}
