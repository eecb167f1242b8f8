use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn is_zero(v: &i64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

// Compute

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flavor: Option<ResourceRef>,
    /// An object for image-booted servers, an empty string otherwise.
    #[serde(default)]
    pub image: Value,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(rename = "OS-EXT-AZ:availability_zone", default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<NamedRef>,
    #[serde(rename = "adminPass", default)]
    pub admin_pass: Option<String>,
}

impl Server {
    pub fn image_id(&self) -> Option<&str> {
        self.image.get("id").and_then(Value::as_str)
    }

    pub fn flavor_id(&self) -> Option<&str> {
        self.flavor.as_ref().map(|f| f.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
    #[serde(rename = "OS-EXT-IPS-MAC:mac_addr", default)]
    pub mac_addr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fixed_ip: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCreateOpts {
    pub name: String,
    #[serde(rename = "imageRef", skip_serializing_if = "String::is_empty")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<ServerNetwork>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<NamedRef>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_name: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Base64 encoded.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_data: String,
}

// Networking

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedIp {
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPair {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub device_owner: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
    #[serde(default)]
    pub allowed_address_pairs: Vec<AddressPair>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortCreateOpts {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    pub network_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_owner: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_ips: Option<Vec<FixedIp>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_address_pairs: Vec<AddressPair>,
    /// Vendor specific keys passed through verbatim.
    #[serde(flatten)]
    pub value_specs: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_ips: Option<Vec<FixedIp>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_address_pairs: Option<Vec<AddressPair>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouterInterfaceOpts {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterInterface {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub subnet_id: String,
    pub port_id: String,
    #[serde(default)]
    pub tenant_id: String,
}

// Load balancing

#[derive(Debug, Clone, Deserialize)]
pub struct Pool {
    pub id: String,
    #[serde(default)]
    pub loadbalancers: Vec<ResourceRef>,
    #[serde(default)]
    pub listeners: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Listener {
    pub id: String,
    #[serde(default)]
    pub loadbalancers: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    #[serde(default)]
    pub provisioning_status: String,
    #[serde(default)]
    pub operating_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Monitor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "project_id")]
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub delay: i64,
    pub timeout: i64,
    pub max_retries: i64,
    #[serde(default)]
    pub url_path: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub expected_codes: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub monitor_port: Option<i64>,
    #[serde(default)]
    pub pools: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorCreateOpts {
    pub pool_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub delay: i64,
    pub timeout: i64,
    pub max_retries: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub http_method: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub expected_codes: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_port: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_codes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_port: Option<i64>,
}

impl MonitorUpdateOpts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// Log tank service

#[derive(Debug, Clone, Deserialize)]
pub struct LogGroup {
    #[serde(rename = "log_group_id")]
    pub id: String,
    #[serde(rename = "log_group_name", default)]
    pub name: String,
    #[serde(default)]
    pub ttl_in_days: i64,
}

// Scalable file service

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantAccessOpts {
    pub access_level: String,
    pub access_type: String,
    pub access_to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessRight {
    pub id: String,
    #[serde(default)]
    pub access_level: String,
    #[serde(default)]
    pub access_type: String,
    #[serde(default)]
    pub access_to: String,
    #[serde(default)]
    pub state: String,
}

// Image management service

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageCreateOpts {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub min_disk: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_ram: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub min_ram: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub os_version: String,
    #[serde(skip_serializing_if = "is_false")]
    pub is_config: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cmk_id: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_tags: Vec<ImageTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub entities: JobEntities,
    #[serde(default)]
    pub fail_reason: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobEntities {
    #[serde(default)]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(rename = "__data_origin", default)]
    pub data_origin: String,
    #[serde(default)]
    pub disk_format: String,
    #[serde(rename = "__image_size", default)]
    pub image_size: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub min_disk: i64,
    #[serde(default)]
    pub min_ram: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOp {
    pub op: &'static str,
    pub path: String,
    pub value: Value,
}

impl PatchOp {
    pub fn replace(path: &str, value: impl Into<Value>) -> Self {
        Self {
            op: "replace",
            path: path.to_string(),
            value: value.into(),
        }
    }
}

// Identity

#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub access: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialCreateOpts {
    pub user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CredentialUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Key management service

#[derive(Debug, Clone, Serialize)]
pub struct DataKeyOpts {
    pub key_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encryption_context: String,
    pub datakey_length: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataKey {
    #[serde(default)]
    pub key_id: String,
    pub plain_text: String,
    pub cipher_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_deserialization_with_extension_fields() {
        let json = r#"{
            "id": "srv1",
            "name": "web",
            "status": "ACTIVE",
            "flavor": {"id": "s2.medium.1", "links": []},
            "image": {"id": "img1", "links": []},
            "metadata": {"role": "web"},
            "addresses": {
                "net1": [
                    {"addr": "192.168.0.10", "version": 4, "OS-EXT-IPS-MAC:mac_addr": "fa:16:3e:00:00:01", "OS-EXT-IPS:type": "fixed"}
                ]
            },
            "key_name": "kp",
            "OS-EXT-AZ:availability_zone": "eu-de-01",
            "security_groups": [{"name": "default"}],
            "hostId": "ignored"
        }"#;

        let server: Server = serde_json::from_str(json).unwrap();
        assert_eq!(server.image_id(), Some("img1"));
        assert_eq!(server.flavor_id(), Some("s2.medium.1"));
        assert_eq!(server.availability_zone.as_deref(), Some("eu-de-01"));
        assert_eq!(server.addresses["net1"][0].addr, "192.168.0.10");
        assert_eq!(
            server.addresses["net1"][0].mac_addr.as_deref(),
            Some("fa:16:3e:00:00:01")
        );
        assert_eq!(server.security_groups[0].name, "default");
    }

    #[test]
    fn test_server_booted_from_volume_has_no_image() {
        let server: Server =
            serde_json::from_str(r#"{"id": "srv1", "status": "BUILD", "image": ""}"#).unwrap();
        assert_eq!(server.image_id(), None);
    }

    #[test]
    fn test_port_create_opts_flattens_value_specs() {
        let mut opts = PortCreateOpts {
            network_id: "net1".to_string(),
            ..Default::default()
        };
        opts.value_specs
            .insert("binding:vnic_type".to_string(), json!("direct"));

        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value["network_id"], "net1");
        assert_eq!(value["binding:vnic_type"], "direct");
        assert!(value.get("name").is_none());
        assert!(value.get("security_groups").is_none());
        assert!(value.get("admin_state_up").is_none());
    }

    #[test]
    fn test_port_create_opts_sends_explicit_empty_security_groups() {
        let opts = PortCreateOpts {
            network_id: "net1".to_string(),
            security_groups: Some(vec![]),
            ..Default::default()
        };
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value["security_groups"], json!([]));
    }

    #[test]
    fn test_monitor_accepts_project_id_alias() {
        let json = r#"{
            "id": "m1",
            "project_id": "p1",
            "type": "HTTP",
            "delay": 5,
            "timeout": 3,
            "max_retries": 2,
            "pools": [{"id": "pool1"}]
        }"#;
        let monitor: Monitor = serde_json::from_str(json).unwrap();
        assert_eq!(monitor.tenant_id, "p1");
        assert_eq!(monitor.type_, "HTTP");
        assert_eq!(monitor.monitor_port, None);
        assert_eq!(monitor.pools[0].id, "pool1");
    }

    #[test]
    fn test_monitor_update_opts_is_empty() {
        assert!(MonitorUpdateOpts::default().is_empty());
        let opts = MonitorUpdateOpts {
            delay: Some(10),
            ..Default::default()
        };
        assert!(!opts.is_empty());
        assert_eq!(serde_json::to_value(&opts).unwrap(), json!({"delay": 10}));
    }

    #[test]
    fn test_log_group_field_renames() {
        let group: LogGroup = serde_json::from_str(
            r#"{"log_group_id": "g1", "log_group_name": "app", "ttl_in_days": 7, "creation_time": 1}"#,
        )
        .unwrap();
        assert_eq!(group.id, "g1");
        assert_eq!(group.name, "app");
        assert_eq!(group.ttl_in_days, 7);
    }

    #[test]
    fn test_image_create_opts_skips_zero_values() {
        let opts = ImageCreateOpts {
            name: "img".to_string(),
            instance_id: "srv1".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value, json!({"name": "img", "instance_id": "srv1"}));
    }

    #[test]
    fn test_image_dunder_fields() {
        let image: Image = serde_json::from_str(
            r#"{"id": "i1", "name": "n", "__data_origin": "instance,srv1", "__image_size": "1024", "disk_format": "zvhd2"}"#,
        )
        .unwrap();
        assert_eq!(image.data_origin, "instance,srv1");
        assert_eq!(image.image_size, "1024");
        assert_eq!(image.disk_format, "zvhd2");
    }

    #[test]
    fn test_job_without_entities() {
        let job: Job = serde_json::from_str(r#"{"status": "RUNNING"}"#).unwrap();
        assert_eq!(job.status, "RUNNING");
        assert!(job.entities.image_id.is_none());
    }

    #[test]
    fn test_patch_op_replace() {
        let op = PatchOp::replace("/name", "new");
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "replace", "path": "/name", "value": "new"})
        );
    }
}
