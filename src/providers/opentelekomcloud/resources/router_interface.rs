use async_trait::async_trait;

use super::{ResourceHandler, check_deleted, minutes};
use crate::providers::opentelekomcloud::types::RouterInterfaceOpts;
use crate::providers::opentelekomcloud::{OtcClient, OtcError};
use crate::providers::{Context, ProviderError};
use crate::resource::{ResourceData, TimeoutKind, Timeouts};
use crate::wait::{Refreshed, StateChangeConf};

/// Attaches a subnet or an existing port to a router. The id is the id of
/// the router-side port.
pub struct RouterInterface;

async fn interface_status(client: &OtcClient, port_id: &str) -> Result<Refreshed<()>, OtcError> {
    let port = client.get_port(port_id).await?;
    tracing::debug!(port_id, status = %port.status, "polled router interface");
    Ok(Some(((), port.status)))
}

/// A 409 from the remove call means the interface is still in use.
async fn remove_step(
    client: &OtcClient,
    router_id: &str,
    port_id: &str,
    opts: &RouterInterfaceOpts,
) -> Result<Refreshed<()>, OtcError> {
    match client.get_port(port_id).await {
        Err(e) if e.is_not_found() => return Ok(Some(((), "DELETED".to_string()))),
        Err(e) => return Err(e),
        Ok(_) => {}
    }

    match client.remove_router_interface(router_id, opts).await {
        Err(e) if e.is_not_found() => Ok(Some(((), "DELETED".to_string()))),
        Err(e) if e.is_conflict() => {
            tracing::debug!(port_id, "router interface still in use");
            Ok(Some(((), "ACTIVE".to_string())))
        }
        Err(e) => Err(e),
        Ok(()) => Ok(Some(((), "ACTIVE".to_string()))),
    }
}

fn interface_opts(d: &ResourceData) -> RouterInterfaceOpts {
    RouterInterfaceOpts {
        subnet_id: d.get_string("subnet_id"),
        port_id: d.get_string("port_id"),
    }
}

#[async_trait]
impl ResourceHandler for RouterInterface {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_networking_router_interface_v2"
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts {
            create: minutes(10),
            delete: minutes(10),
            ..Timeouts::default()
        }
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["router_id", "subnet_id", "port_id"]
    }

    fn importable(&self) -> bool {
        false
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("router_id")?;
        if !d.has_filled("subnet_id") && !d.has_filled("port_id") {
            return Err(ProviderError::InvalidAttribute(
                "one of subnet_id or port_id must be set".to_string(),
            ));
        }
        Ok(())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let router_id = d.require_str("router_id")?.to_string();
        let interface = client
            .add_router_interface(&router_id, &interface_opts(d))
            .await
            .context(format!("error creating router interface on {}", router_id))?;
        tracing::info!(port_id = %interface.port_id, router_id = %router_id, "router interface created");

        d.set_id(interface.port_id.as_str());

        let port_id = interface.port_id.as_str();
        StateChangeConf::new(
            &["BUILD", "PENDING_CREATE", "PENDING_UPDATE"],
            &["ACTIVE"],
            d.timeout(TimeoutKind::Create),
        )
        .with_poll(client.poll())
        .wait_for_state(move || interface_status(client, port_id))
        .await
        .context(format!(
            "error waiting for router interface {} to become available",
            port_id
        ))?;

        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let port = match client.get_port(d.id()).await {
            Ok(port) => port,
            Err(e) => return check_deleted(d, e, "router interface"),
        };

        // The router-side port names its router as the owning device.
        d.set("port_id", port.id.as_str());
        if !port.device_id.is_empty() {
            d.set("router_id", port.device_id.as_str());
        }
        d.set("region", client.region());
        Ok(())
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let router_id = d.get_string("router_id");
        // The id is the router-side port, which identifies the interface alone.
        let opts = RouterInterfaceOpts {
            subnet_id: String::new(),
            port_id: id.clone(),
        };

        let (port_id, router, opts_ref) = (id.as_str(), router_id.as_str(), &opts);
        StateChangeConf::new(&["ACTIVE"], &["DELETED"], d.timeout(TimeoutKind::Delete))
            .with_poll(client.poll())
            .wait_for_state(move || remove_step(client, router, port_id, opts_ref))
            .await
            .context(format!("error deleting router interface {}", id))?;

        tracing::info!(id = %id, "router interface deleted");
        d.set_id("");
        Ok(())
    }
}
