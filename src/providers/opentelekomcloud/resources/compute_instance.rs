use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use super::{ResourceHandler, check_deleted, minutes};
use crate::providers::opentelekomcloud::types::{NamedRef, Server, ServerCreateOpts, ServerNetwork};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};
use crate::providers::{Context, ProviderError};
use crate::resource::{ResourceData, TimeoutKind, Timeouts};
use crate::wait::{Refreshed, StateChangeConf};

pub struct ComputeInstance;

const FORCE_NEW: &[&str] = &[
    "image_id",
    "availability_zone",
    "key_pair",
    "network",
    "security_groups",
    "user_data",
];

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn networks(d: &ResourceData) -> Vec<ServerNetwork> {
    d.get_list("network")
        .iter()
        .map(|raw| ServerNetwork {
            uuid: str_field(raw, "uuid"),
            port: str_field(raw, "port"),
            fixed_ip: str_field(raw, "fixed_ip_v4"),
        })
        .collect()
}

fn metadata(d: &ResourceData) -> HashMap<String, String> {
    d.get_map("metadata")
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Polls the server; a 404 is reported as DELETED so the same refresh serves
/// both the build and the delete wait.
async fn server_status(client: &OtcClient, id: &str) -> Result<Refreshed<Server>, OtcError> {
    match client.get_server(id).await {
        Ok(server) => {
            tracing::debug!(id, status = %server.status, "polled server");
            let status = server.status.clone();
            Ok(Some((server, status)))
        }
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

async fn server_delete_status(client: &OtcClient, id: &str) -> Result<Refreshed<()>, OtcError> {
    match client.get_server(id).await {
        Ok(server) => Ok(Some(((), server.status))),
        Err(e) if e.is_not_found() => Ok(Some(((), "DELETED".to_string()))),
        Err(e) => Err(e),
    }
}

async fn wait_for_server(
    client: &OtcClient,
    id: &str,
    pending: &[&str],
    target: &[&str],
    timeout: std::time::Duration,
) -> Result<(), ProviderError> {
    StateChangeConf::new(pending, target, timeout)
        .with_poll(client.poll())
        .wait_for_state(move || server_status(client, id))
        .await
        .context(format!(
            "error waiting for instance {} to become {}",
            id,
            target.join("/")
        ))?;
    Ok(())
}

#[async_trait]
impl ResourceHandler for ComputeInstance {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_compute_instance_v2"
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts {
            create: minutes(30),
            update: minutes(30),
            delete: minutes(30),
            ..Timeouts::default()
        }
    }

    fn force_new(&self) -> &'static [&'static str] {
        FORCE_NEW
    }

    fn set_attributes(&self) -> &'static [&'static str] {
        &["security_groups"]
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("name")?;
        d.require_str("flavor_id")?;
        for network in networks(d) {
            if network.uuid.is_empty() && network.port.is_empty() {
                return Err(ProviderError::InvalidAttribute(
                    "every network block needs a uuid or a port".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let user_data = d.get_string("user_data");
        let opts = ServerCreateOpts {
            name: d.require_str("name")?.to_string(),
            image_ref: d.get_string("image_id"),
            flavor_ref: d.require_str("flavor_id")?.to_string(),
            networks: networks(d),
            security_groups: d
                .get_string_list("security_groups")
                .into_iter()
                .map(|name| NamedRef { name })
                .collect(),
            availability_zone: d.get_string("availability_zone"),
            key_name: d.get_string("key_pair"),
            metadata: metadata(d),
            user_data: if user_data.is_empty() {
                String::new()
            } else {
                STANDARD.encode(user_data.as_bytes())
            },
        };

        let server = client
            .create_server(&opts)
            .await
            .context("error creating instance")?;
        tracing::info!(id = %server.id, name = %opts.name, "instance created");

        d.set_id(server.id.as_str());
        if let Some(password) = server.admin_pass {
            d.set("admin_pass", password);
        }

        wait_for_server(
            client,
            &server.id,
            &["BUILD"],
            &["ACTIVE"],
            d.timeout(TimeoutKind::Create),
        )
        .await?;

        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.get_server(d.id()).await;
        let server = match result {
            Ok(server) => server,
            Err(e) => return check_deleted(d, e, "instance"),
        };
        tracing::debug!(id = %server.id, status = %server.status, "retrieved instance");

        let mut access_ip_v4 = None;
        let mut addresses = Vec::new();
        for (network, entries) in &server.addresses {
            for entry in entries {
                if entry.version == 4 && access_ip_v4.is_none() {
                    access_ip_v4 = Some(entry.addr.clone());
                }
                addresses.push(json!({
                    "network": network,
                    "address": entry.addr,
                    "version": entry.version,
                    "mac": entry.mac_addr.clone().unwrap_or_default(),
                }));
            }
        }

        // Nova lists a group once per attached NIC.
        let security_groups: Vec<String> = server
            .security_groups
            .iter()
            .map(|group| group.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        d.set("name", server.name.as_str());
        d.set("status", server.status.as_str());
        if let Some(flavor) = server.flavor_id() {
            d.set("flavor_id", flavor);
        }
        if let Some(image) = server.image_id() {
            d.set("image_id", image);
        }
        if let Some(key) = &server.key_name {
            d.set("key_pair", key.as_str());
        }
        if let Some(zone) = &server.availability_zone {
            d.set("availability_zone", zone.as_str());
        }
        if !security_groups.is_empty() {
            d.set("security_groups", security_groups);
        }
        d.set("metadata", json!(server.metadata));
        d.set("access_ip_v4", access_ip_v4.unwrap_or_default());
        d.set("all_addresses", addresses);
        d.set("region", client.region());
        Ok(())
    }

    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();

        if d.has_change("name") {
            let name = d.require_str("name")?.to_string();
            client
                .rename_server(&id, &name)
                .await
                .context(format!("error renaming instance {}", id))?;
        }

        if d.has_change("metadata") {
            client
                .replace_server_metadata(&id, &metadata(d))
                .await
                .context(format!("error updating metadata of instance {}", id))?;
        }

        if d.has_change("flavor_id") {
            let flavor = d.require_str("flavor_id")?.to_string();
            let timeout = d.timeout(TimeoutKind::Update);
            tracing::info!(id = %id, flavor = %flavor, "resizing instance");

            client
                .resize_server(&id, &flavor)
                .await
                .context(format!("error resizing instance {}", id))?;
            wait_for_server(client, &id, &["RESIZE"], &["VERIFY_RESIZE"], timeout).await?;

            client
                .confirm_resize(&id)
                .await
                .context(format!("error confirming resize of instance {}", id))?;
            wait_for_server(client, &id, &["VERIFY_RESIZE"], &["ACTIVE"], timeout).await?;
        }

        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let result = client.delete_server(&id).await;
        if let Err(e) = result {
            return check_deleted(d, e, "instance");
        }

        let server_id = id.as_str();
        StateChangeConf::new(
            &["ACTIVE", "SHUTOFF", "DELETING"],
            &["DELETED", "SOFT_DELETED"],
            d.timeout(TimeoutKind::Delete),
        )
        .with_poll(client.poll())
        .wait_for_state(move || server_delete_status(client, server_id))
        .await
        .context(format!("error waiting for instance {} to be deleted", id))?;

        tracing::info!(id = %id, "instance deleted");
        d.set_id("");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Attributes;

    fn data(value: Value) -> ResourceData {
        let attributes: Attributes = value.as_object().cloned().unwrap();
        ResourceData::from_config("opentelekomcloud_compute_instance_v2", attributes)
    }

    #[test]
    fn test_requires_name_and_flavor() {
        assert!(ComputeInstance.validate(&data(json!({"name": "web"}))).is_err());
        assert!(
            ComputeInstance
                .validate(&data(json!({"name": "web", "flavor_id": "s2.medium.1"})))
                .is_ok()
        );
    }

    #[test]
    fn test_network_needs_uuid_or_port() {
        let d = data(json!({
            "name": "web",
            "flavor_id": "s2.medium.1",
            "network": [{"fixed_ip_v4": "10.0.0.4"}]
        }));
        assert!(matches!(
            ComputeInstance.validate(&d),
            Err(ProviderError::InvalidAttribute(_))
        ));
    }

    #[test]
    fn test_metadata_values_are_stringified() {
        let d = data(json!({"metadata": {"role": "web", "replicas": 3}}));
        let metadata = metadata(&d);
        assert_eq!(metadata["role"], "web");
        assert_eq!(metadata["replicas"], "3");
    }

    #[test]
    fn test_networks_parsing() {
        let d = data(json!({"network": [{"uuid": "net1", "fixed_ip_v4": "10.0.0.4"}, {"port": "p1"}]}));
        let networks = networks(&d);
        assert_eq!(networks[0].uuid, "net1");
        assert_eq!(networks[0].fixed_ip, "10.0.0.4");
        assert_eq!(networks[1].port, "p1");
    }
}
