use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ResourceHandler, check_deleted, minutes};
use crate::providers::opentelekomcloud::types::{
    AddressPair, FixedIp, Port as PortModel, PortCreateOpts, PortUpdateOpts,
};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};
use crate::providers::{Context, ProviderError};
use crate::resource::{ResourceData, TimeoutKind, Timeouts};
use crate::wait::{Refreshed, StateChangeConf};

pub struct Port;

const FORCE_NEW: &[&str] = &[
    "network_id",
    "mac_address",
    "tenant_id",
    "device_owner",
    "device_id",
    "value_specs",
];

fn fixed_ips(d: &ResourceData) -> Option<Vec<FixedIp>> {
    let ips: Vec<FixedIp> = d
        .get_list("fixed_ip")
        .iter()
        .map(|raw| FixedIp {
            subnet_id: str_field(raw, "subnet_id"),
            ip_address: str_field(raw, "ip_address"),
        })
        .collect();
    if ips.is_empty() { None } else { Some(ips) }
}

fn address_pairs(d: &ResourceData) -> Vec<AddressPair> {
    d.get_list("allowed_address_pairs")
        .iter()
        .map(|raw| AddressPair {
            ip_address: str_field(raw, "ip_address"),
            mac_address: str_field(raw, "mac_address"),
        })
        .collect()
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// DOWN only means "not bound to a device yet", so it counts as available.
async fn port_status(client: &OtcClient, id: &str) -> Result<Refreshed<PortModel>, OtcError> {
    let port = client.get_port(id).await?;
    tracing::debug!(id, status = %port.status, "polled port");
    let status = match port.status.as_str() {
        "DOWN" | "ACTIVE" => "ACTIVE".to_string(),
        other => other.to_string(),
    };
    Ok(Some((port, status)))
}

/// One step of the delete loop: issue the DELETE until a GET returns 404.
async fn delete_step(client: &OtcClient, id: &str) -> Result<Refreshed<()>, OtcError> {
    match client.get_port(id).await {
        Err(e) if e.is_not_found() => return Ok(Some(((), "DELETED".to_string()))),
        Err(e) => return Err(e),
        Ok(_) => {}
    }

    match client.delete_port(id).await {
        Err(e) if e.is_not_found() => Ok(Some(((), "DELETED".to_string()))),
        Err(e) => Err(e),
        Ok(()) => {
            tracing::debug!(id, "port still active");
            Ok(Some(((), "ACTIVE".to_string())))
        }
    }
}

#[async_trait]
impl ResourceHandler for Port {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_networking_port_v2"
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts {
            create: minutes(10),
            delete: minutes(10),
            ..Timeouts::default()
        }
    }

    fn force_new(&self) -> &'static [&'static str] {
        FORCE_NEW
    }

    fn set_attributes(&self) -> &'static [&'static str] {
        &["security_group_ids", "allowed_address_pairs"]
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        if d.get_bool("no_security_groups") == Some(true)
            && !d.get_string_list("security_group_ids").is_empty()
        {
            return Err(ProviderError::InvalidAttribute(
                "cannot have both no_security_groups and security_group_ids set".to_string(),
            ));
        }
        Ok(())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let security_groups = d.get_string_list("security_group_ids");
        let security_groups = if d.get_bool("no_security_groups") == Some(true) {
            Some(Vec::new())
        } else if security_groups.is_empty() {
            None
        } else {
            Some(security_groups)
        };

        let opts = PortCreateOpts {
            name: d.get_string("name"),
            admin_state_up: d.get_bool("admin_state_up"),
            network_id: d.require_str("network_id")?.to_string(),
            mac_address: d.get_string("mac_address"),
            tenant_id: d.get_string("tenant_id"),
            device_owner: d.get_string("device_owner"),
            device_id: d.get_string("device_id"),
            fixed_ips: fixed_ips(d),
            security_groups,
            allowed_address_pairs: address_pairs(d),
            value_specs: d.get_map("value_specs").cloned().unwrap_or_default(),
        };

        tracing::debug!(network_id = %opts.network_id, "create options built");
        let port = client
            .create_port(&opts)
            .await
            .context("error creating port")?;
        tracing::info!(id = %port.id, "port created");

        // Recorded before the wait so a timed out port can still be cleaned up.
        d.set_id(port.id.as_str());

        let id = port.id.as_str();
        StateChangeConf::new(&[], &["ACTIVE"], d.timeout(TimeoutKind::Create))
            .with_poll(client.poll())
            .wait_for_state(move || port_status(client, id))
            .await
            .context(format!("error waiting for port {} to become available", id))?;

        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.get_port(d.id()).await;
        let port = match result {
            Ok(port) => port,
            Err(e) => return check_deleted(d, e, "port"),
        };
        tracing::debug!(id = %port.id, status = %port.status, "retrieved port");

        let all_fixed_ips: Vec<String> = port
            .fixed_ips
            .iter()
            .map(|ip| ip.ip_address.clone())
            .collect();
        let pairs: Vec<Value> = port
            .allowed_address_pairs
            .iter()
            .map(|pair| json!({"ip_address": pair.ip_address, "mac_address": pair.mac_address}))
            .collect();

        d.set("name", port.name);
        d.set("admin_state_up", port.admin_state_up);
        d.set("network_id", port.network_id);
        d.set("mac_address", port.mac_address);
        d.set("tenant_id", port.tenant_id);
        d.set("device_owner", port.device_owner);
        d.set("device_id", port.device_id);
        d.set("security_group_ids", port.security_groups);
        d.set("all_fixed_ips", all_fixed_ips);
        d.set("allowed_address_pairs", pairs);
        d.set("region", client.region());
        Ok(())
    }

    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let mut opts = PortUpdateOpts::default();

        // Empty lists are sent on purpose: they remove every entry.
        if d.has_change("allowed_address_pairs") {
            opts.allowed_address_pairs = Some(address_pairs(d));
        }
        if d.has_change("no_security_groups") && d.get_bool("no_security_groups") == Some(true) {
            opts.security_groups = Some(Vec::new());
        }
        if d.has_change("security_group_ids") {
            opts.security_groups = Some(d.get_string_list("security_group_ids"));
        }
        if d.has_change("name") {
            opts.name = Some(d.get_string("name"));
        }
        if d.has_change("admin_state_up") {
            opts.admin_state_up = Some(d.get_bool("admin_state_up").unwrap_or(false));
        }
        if d.has_change("fixed_ip") {
            opts.fixed_ips = fixed_ips(d);
        }

        if opts != PortUpdateOpts::default() {
            tracing::debug!(id = %d.id(), "updating port");
            client
                .update_port(d.id(), &opts)
                .await
                .context(format!("error updating port {}", d.id()))?;
        }

        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let port_id = id.as_str();
        StateChangeConf::new(&["ACTIVE"], &["DELETED"], d.timeout(TimeoutKind::Delete))
            .with_poll(client.poll())
            .wait_for_state(move || delete_step(client, port_id))
            .await
            .context(format!("error deleting port {}", id))?;

        tracing::info!(id = %id, "port deleted");
        d.set_id("");
        Ok(())
    }
}
