use std::time::Duration;

use otc_provider::{OtcClient, OtcProvider, PollConfig, Provider, ResourceData, Timeouts};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MONITOR: &str = "opentelekomcloud_lb_monitor_v2";

fn provider(server: &MockServer) -> OtcProvider {
    let client = OtcClient::with_base_url("test_token".to_string(), server.uri())
        .unwrap()
        .with_poll(PollConfig::fixed(Duration::from_millis(5)));
    OtcProvider::with_client(client)
}

fn timeouts() -> Timeouts {
    let limit = Duration::from_secs(10);
    Timeouts {
        create: limit,
        read: limit,
        update: limit,
        delete: limit,
    }
}

fn monitor_body() -> Value {
    json!({
        "healthmonitor": {
            "id": "m1",
            "name": "check",
            "project_id": "proj1",
            "type": "HTTP",
            "delay": 5,
            "timeout": 3,
            "max_retries": 3,
            "url_path": "/health",
            "http_method": "GET",
            "expected_codes": "200",
            "admin_state_up": true,
            "monitor_port": 8080,
            "pools": [{"id": "pool1"}]
        }
    })
}

async fn mount_active_loadbalancer(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/loadbalancers/lb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "loadbalancer": {"id": "lb1", "provisioning_status": "ACTIVE", "operating_status": "ONLINE"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_monitor_create_waits_for_loadbalancer_and_retries_conflicts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/pools/pool1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pool": {"id": "pool1", "loadbalancers": [{"id": "lb1"}], "listeners": []}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/loadbalancers/lb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "loadbalancer": {"id": "lb1", "provisioning_status": "PENDING_UPDATE"}
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_active_loadbalancer(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v2.0/lbaas/healthmonitors"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "NeutronError": {"message": "Load balancer lb1 is immutable"}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2.0/lbaas/healthmonitors"))
        .and(body_partial_json(json!({
            "healthmonitor": {"pool_id": "pool1", "type": "HTTP", "delay": 5, "admin_state_up": true}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(monitor_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/healthmonitors/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body()))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let config = json!({
        "pool_id": "pool1",
        "type": "HTTP",
        "delay": 5,
        "timeout": 3,
        "max_retries": 3,
        "url_path": "/health",
        "http_method": "GET"
    });
    let mut d = ResourceData::from_config(MONITOR, config.as_object().cloned().unwrap())
        .with_timeouts(timeouts());
    provider.create(&mut d).await.unwrap();

    assert_eq!(d.id(), "m1");
    assert_eq!(d.get_string("tenant_id"), "proj1");
    assert_eq!(d.get_i64("monitor_port"), Some(8080));
    assert_eq!(d.get_string("pool_id"), "pool1");
}

#[tokio::test]
async fn test_monitor_resolves_loadbalancer_through_listener() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/pools/pool1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pool": {"id": "pool1", "loadbalancers": [], "listeners": [{"id": "l1"}]}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/listeners/l1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "listener": {"id": "l1", "loadbalancers": [{"id": "lb1"}]}
        })))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_active_loadbalancer(&mock_server).await;

    Mock::given(method("PUT"))
        .and(path("/v2.0/lbaas/healthmonitors/m1"))
        .and(body_partial_json(json!({"healthmonitor": {"url_path": "/ready"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/healthmonitors/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body()))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let state = json!({
        "pool_id": "pool1",
        "type": "HTTP",
        "delay": 5,
        "timeout": 3,
        "max_retries": 3,
        "url_path": "/health"
    });
    let changes = json!({"url_path": "/ready"});
    let mut d = ResourceData::with_changes(
        MONITOR,
        "m1",
        state.as_object().cloned().unwrap(),
        changes.as_object().unwrap(),
    )
    .with_timeouts(timeouts());

    provider.update(&mut d).await.unwrap();
    assert_eq!(d.id(), "m1");
}

#[tokio::test]
async fn test_monitor_delete_treats_missing_monitor_as_deleted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/pools/pool1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pool": {"id": "pool1", "loadbalancers": [{"id": "lb1"}]}
        })))
        .mount(&mock_server)
        .await;
    mount_active_loadbalancer(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path("/v2.0/lbaas/healthmonitors/m1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let state = json!({"pool_id": "pool1", "type": "TCP"});
    let mut d = ResourceData::from_state(MONITOR, "m1", state.as_object().cloned().unwrap())
        .with_timeouts(timeouts());

    provider.delete(&mut d).await.unwrap();
    assert_eq!(d.id(), "");
}

#[tokio::test]
async fn test_monitor_loadbalancer_in_error_fails_the_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/pools/pool1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pool": {"id": "pool1", "loadbalancers": [{"id": "lb1"}]}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.0/lbaas/loadbalancers/lb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "loadbalancer": {"id": "lb1", "provisioning_status": "ERROR"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2.0/lbaas/healthmonitors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(monitor_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server);
    let config = json!({"pool_id": "pool1", "type": "TCP", "delay": 5, "timeout": 3, "max_retries": 3});
    let mut d = ResourceData::from_config(MONITOR, config.as_object().cloned().unwrap())
        .with_timeouts(timeouts());

    let err = provider.create(&mut d).await.unwrap_err();
    assert!(err.to_string().contains("error waiting for load balancer lb1"));
    assert!(err.to_string().contains("ERROR"));
}
