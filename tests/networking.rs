use std::time::Duration;

use otc_provider::{
    OtcClient, OtcError, OtcProvider, PollConfig, Provider, ProviderError, ResourceData, Timeouts,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PORT: &str = "opentelekomcloud_networking_port_v2";
const ROUTER_INTERFACE: &str = "opentelekomcloud_networking_router_interface_v2";

fn provider(server: &MockServer) -> OtcProvider {
    let client = OtcClient::with_base_url("test_token".to_string(), server.uri())
        .unwrap()
        .with_poll(PollConfig::fixed(Duration::from_millis(5)));
    OtcProvider::with_client(client)
}

fn short_timeouts() -> Timeouts {
    let limit = Duration::from_secs(5);
    Timeouts {
        create: limit,
        read: limit,
        update: limit,
        delete: limit,
    }
}

fn config(resource_type: &str, value: Value) -> ResourceData {
    ResourceData::from_config(resource_type, value.as_object().cloned().unwrap())
        .with_timeouts(short_timeouts())
}

fn stored(resource_type: &str, id: &str, value: Value) -> ResourceData {
    ResourceData::from_state(resource_type, id, value.as_object().cloned().unwrap())
        .with_timeouts(short_timeouts())
}

fn port_body(status: &str) -> Value {
    json!({
        "port": {
            "id": "p1",
            "name": "web",
            "status": status,
            "admin_state_up": true,
            "network_id": "net1",
            "mac_address": "fa:16:3e:00:00:01",
            "tenant_id": "proj1",
            "device_owner": "",
            "device_id": "",
            "security_groups": ["sg1"],
            "fixed_ips": [{"subnet_id": "sub1", "ip_address": "192.168.0.10"}],
            "allowed_address_pairs": [{"ip_address": "10.0.0.0/24"}]
        }
    })
}

#[tokio::test]
async fn test_port_create_waits_for_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/ports"))
        .and(header("X-Auth-Token", "test_token"))
        .and(body_partial_json(json!({
            "port": {"name": "web", "network_id": "net1", "security_groups": ["sg1"]}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(port_body("BUILD")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(port_body("BUILD")))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    // DOWN only means "not bound yet" and counts as available.
    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(port_body("DOWN")))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = config(
        PORT,
        json!({"name": "web", "network_id": "net1", "security_group_ids": ["sg1"]}),
    );
    provider.create(&mut d).await.unwrap();

    assert_eq!(d.id(), "p1");
    assert_eq!(d.get_string("mac_address"), "fa:16:3e:00:00:01");
    assert_eq!(d.get_string_list("all_fixed_ips"), vec!["192.168.0.10"]);
    assert_eq!(d.get_string("region"), "eu-de");
    assert_eq!(d.get_bool("admin_state_up"), Some(true));
}

#[tokio::test]
async fn test_port_create_rejects_conflicting_security_groups_before_any_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = config(
        PORT,
        json!({"network_id": "net1", "no_security_groups": true, "security_group_ids": ["sg1"]}),
    );
    let result = provider.create(&mut d).await;
    assert!(matches!(result, Err(ProviderError::InvalidAttribute(_))));
    assert_eq!(d.id(), "");
}

#[tokio::test]
async fn test_port_read_not_found_clears_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "NeutronError": {"type": "PortNotFound", "message": "Port p1 could not be found."}
        })))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = stored(PORT, "p1", json!({"name": "web"}));
    provider.read(&mut d).await.unwrap();
    assert_eq!(d.id(), "");
}

#[tokio::test]
async fn test_port_read_server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "NeutronError": {"message": "Request Failed: internal server error"}
        })))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = stored(PORT, "p1", json!({}));
    let err = provider.read(&mut d).await.unwrap_err();

    match err {
        ProviderError::Api { message, source } => {
            assert_eq!(message, "error retrieving port p1");
            assert!(matches!(source, OtcError::Api { status: 500, .. }));
            assert!(source.to_string().contains("internal server error"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    assert_eq!(d.id(), "p1");
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "The request you have made requires authentication.", "title": "Unauthorized"}
        })))
        .mount(&mock_server)
        .await;

    let client = OtcClient::with_base_url("expired".to_string(), mock_server.uri()).unwrap();
    let err = client.get_port("p1").await.unwrap_err();

    match err {
        OtcError::Auth { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "The request you have made requires authentication.");
        }
        other => panic!("expected Auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_port_update_sends_only_changed_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v2.0/ports/p1"))
        .and(body_partial_json(json!({"port": {"name": "web-2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(port_body("ACTIVE")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(port_body("ACTIVE")))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let state = json!({"name": "web", "network_id": "net1"});
    let changes = json!({"name": "web-2", "network_id": "net1"});
    let mut d = ResourceData::with_changes(
        PORT,
        "p1",
        state.as_object().cloned().unwrap(),
        changes.as_object().unwrap(),
    )
    .with_timeouts(short_timeouts());

    provider.update(&mut d).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("update request");
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body, json!({"port": {"name": "web-2"}}));
}

#[tokio::test]
async fn test_port_delete_repeats_until_gone() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(port_body("ACTIVE")))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v2.0/ports/p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = stored(PORT, "p1", json!({"name": "web"}));
    provider.delete(&mut d).await.unwrap();
    assert_eq!(d.id(), "");
}

#[tokio::test]
async fn test_router_interface_create_waits_for_port() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v2.0/routers/r1/add_router_interface"))
        .and(body_partial_json(json!({"subnet_id": "sub1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r1",
            "subnet_id": "sub1",
            "port_id": "rp1",
            "tenant_id": "proj1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/rp1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "port": {"id": "rp1", "status": "BUILD"}
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/rp1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "port": {
                "id": "rp1",
                "status": "ACTIVE",
                "device_owner": "network:router_interface_distributed",
                "device_id": "r1"
            }
        })))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = config(ROUTER_INTERFACE, json!({"router_id": "r1", "subnet_id": "sub1"}));
    provider.create(&mut d).await.unwrap();

    assert_eq!(d.id(), "rp1");
    assert_eq!(d.get_string("port_id"), "rp1");
    assert_eq!(d.get_string("router_id"), "r1");
    assert_eq!(d.get_string("subnet_id"), "sub1");
    assert_eq!(d.get_string("region"), "eu-de");
}

#[tokio::test]
async fn test_router_interface_delete_retries_while_in_use() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/rp1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "port": {"id": "rp1", "status": "ACTIVE"}
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/ports/rp1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v2.0/routers/r1/remove_router_interface"))
        .and(body_json(json!({"port_id": "rp1"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "NeutronError": {"message": "Router interface is still in use"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let mut d = stored(ROUTER_INTERFACE, "rp1", json!({"router_id": "r1", "subnet_id": "sub1"}));
    provider.delete(&mut d).await.unwrap();
    assert_eq!(d.id(), "");
}

#[tokio::test]
async fn test_router_interface_is_not_importable() {
    let mock_server = MockServer::start().await;
    let provider = provider(&mock_server);

    let mut d = ResourceData::new(ROUTER_INTERFACE);
    d.set_id("rp1");
    let result = provider.import(&mut d).await;
    assert!(matches!(result, Err(ProviderError::ImportNotSupported(_))));
}
