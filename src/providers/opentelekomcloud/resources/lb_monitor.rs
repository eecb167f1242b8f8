use std::time::Duration;

use async_trait::async_trait;

use super::{ResourceHandler, check_deleted, minutes, retry_api};
use crate::providers::opentelekomcloud::types::{MonitorCreateOpts, MonitorUpdateOpts};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};
use crate::providers::{Context, ProviderError};
use crate::resource::{ResourceData, TimeoutKind, Timeouts};
use crate::wait::{Refreshed, StateChangeConf};

pub struct LbMonitor;

const MONITOR_TYPES: &[&str] = &["TCP", "UDP_CONNECT", "HTTP"];
const HTTP_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "TRACE", "OPTIONS", "CONNECT", "PATCH",
];
const LB_PENDING: &[&str] = &["PENDING_CREATE", "PENDING_UPDATE", "PENDING_DELETE"];

async fn loadbalancer_status(client: &OtcClient, id: &str) -> Result<Refreshed<()>, OtcError> {
    let lb = client.get_loadbalancer(id).await?;
    tracing::debug!(id, status = %lb.provisioning_status, "polled load balancer");
    Ok(Some(((), lb.provisioning_status)))
}

/// Resolves the load balancer a pool belongs to, directly or via its listener.
async fn loadbalancer_for_pool(client: &OtcClient, pool_id: &str) -> Result<String, ProviderError> {
    let pool = client
        .get_pool(pool_id)
        .await
        .context(format!("error retrieving pool {}", pool_id))?;

    if let Some(lb) = pool.loadbalancers.first() {
        return Ok(lb.id.clone());
    }

    if let Some(listener) = pool.listeners.first() {
        let listener = client
            .get_listener(&listener.id)
            .await
            .context(format!("error retrieving listener {}", listener.id))?;
        if let Some(lb) = listener.loadbalancers.first() {
            return Ok(lb.id.clone());
        }
    }

    Err(ProviderError::InvalidAttribute(format!(
        "unable to determine the load balancer of pool {}",
        pool_id
    )))
}

/// Monitors cannot be changed while their load balancer is busy, so every
/// mutation is fenced by this wait on both sides.
async fn wait_for_loadbalancer_via_pool(
    client: &OtcClient,
    pool_id: &str,
    timeout: Duration,
) -> Result<(), ProviderError> {
    let lb_id = loadbalancer_for_pool(client, pool_id).await?;
    let id = lb_id.as_str();
    StateChangeConf::new(LB_PENDING, &["ACTIVE"], timeout)
        .with_poll(client.poll())
        .wait_for_state(move || loadbalancer_status(client, id))
        .await
        .context(format!("error waiting for load balancer {} to become ACTIVE", lb_id))?;
    Ok(())
}

#[async_trait]
impl ResourceHandler for LbMonitor {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_lb_monitor_v2"
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts {
            create: minutes(10),
            update: minutes(10),
            delete: minutes(10),
            ..Timeouts::default()
        }
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["pool_id", "tenant_id", "type"]
    }

    fn importable(&self) -> bool {
        false
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("pool_id")?;
        let monitor_type = d.require_str("type")?;
        if !MONITOR_TYPES.contains(&monitor_type) {
            return Err(ProviderError::InvalidAttribute(format!(
                "type must be one of {:?}, got '{}'",
                MONITOR_TYPES, monitor_type
            )));
        }
        let method = d.get_string("http_method");
        if !method.is_empty() && !HTTP_METHODS.contains(&method.as_str()) {
            return Err(ProviderError::InvalidAttribute(format!(
                "http_method must be one of {:?}, got '{}'",
                HTTP_METHODS, method
            )));
        }
        match d.get_i64("monitor_port") {
            Some(port) if !(1..=65535).contains(&port) => {
                Err(ProviderError::InvalidAttribute(format!(
                    "monitor_port must be between 1 and 65535, got {}",
                    port
                )))
            }
            _ => Ok(()),
        }
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let opts = MonitorCreateOpts {
            pool_id: d.require_str("pool_id")?.to_string(),
            tenant_id: d.get_string("tenant_id"),
            type_: d.require_str("type")?.to_string(),
            delay: d.require_i64("delay")?,
            timeout: d.require_i64("timeout")?,
            max_retries: d.require_i64("max_retries")?,
            url_path: d.get_string("url_path"),
            http_method: d.get_string("http_method"),
            expected_codes: d.get_string("expected_codes"),
            name: d.get_string("name"),
            admin_state_up: Some(d.get_bool("admin_state_up").unwrap_or(true)),
            monitor_port: d.get_i64("monitor_port"),
        };

        let timeout = d.timeout(TimeoutKind::Create);
        wait_for_loadbalancer_via_pool(client, &opts.pool_id, timeout).await?;

        tracing::debug!(pool_id = %opts.pool_id, "attempting to create monitor");
        let opts_ref = &opts;
        let monitor = retry_api(timeout, move || client.create_monitor(opts_ref))
            .await
            .context("unable to create monitor")?;

        wait_for_loadbalancer_via_pool(client, &opts.pool_id, timeout).await?;

        tracing::info!(id = %monitor.id, "monitor created");
        d.set_id(monitor.id.as_str());
        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.get_monitor(d.id()).await;
        let monitor = match result {
            Ok(monitor) => monitor,
            Err(e) => return check_deleted(d, e, "monitor"),
        };

        d.set("tenant_id", monitor.tenant_id);
        d.set("type", monitor.type_);
        d.set("delay", monitor.delay);
        d.set("timeout", monitor.timeout);
        d.set("max_retries", monitor.max_retries);
        d.set("url_path", monitor.url_path);
        d.set("http_method", monitor.http_method);
        d.set("expected_codes", monitor.expected_codes);
        d.set("admin_state_up", monitor.admin_state_up);
        d.set("name", monitor.name);
        if let Some(port) = monitor.monitor_port {
            d.set("monitor_port", port);
        }
        if let Some(pool) = monitor.pools.first() {
            d.set("pool_id", pool.id.as_str());
        }
        d.set("region", client.region());
        Ok(())
    }

    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let mut opts = MonitorUpdateOpts::default();
        if d.has_change("url_path") {
            opts.url_path = Some(d.get_string("url_path"));
        }
        if d.has_change("expected_codes") {
            opts.expected_codes = Some(d.get_string("expected_codes"));
        }
        if d.has_change("delay") {
            opts.delay = d.get_i64("delay");
        }
        if d.has_change("timeout") {
            opts.timeout = d.get_i64("timeout");
        }
        if d.has_change("max_retries") {
            opts.max_retries = d.get_i64("max_retries");
        }
        if d.has_change("admin_state_up") {
            opts.admin_state_up = Some(d.get_bool("admin_state_up").unwrap_or(true));
        }
        if d.has_change("name") {
            opts.name = Some(d.get_string("name"));
        }
        if d.has_change("http_method") {
            opts.http_method = Some(d.get_string("http_method"));
        }
        if d.has_change("monitor_port") {
            opts.monitor_port = d.get_i64("monitor_port");
        }

        if opts.is_empty() {
            return self.read(client, d).await;
        }

        let id = d.id().to_string();
        let pool_id = d.require_str("pool_id")?.to_string();
        let timeout = d.timeout(TimeoutKind::Update);
        wait_for_loadbalancer_via_pool(client, &pool_id, timeout).await?;

        tracing::debug!(id = %id, "updating monitor");
        let (monitor_id, opts_ref) = (id.as_str(), &opts);
        retry_api(timeout, move || client.update_monitor(monitor_id, opts_ref))
            .await
            .context(format!("unable to update monitor {}", id))?;

        wait_for_loadbalancer_via_pool(client, &pool_id, timeout).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let pool_id = d.require_str("pool_id")?.to_string();
        let timeout = d.timeout(TimeoutKind::Delete);
        wait_for_loadbalancer_via_pool(client, &pool_id, timeout).await?;

        let monitor_id = id.as_str();
        retry_api(timeout, move || async move {
            match client.delete_monitor(monitor_id).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other,
            }
        })
        .await
        .context(format!("unable to delete monitor {}", id))?;

        wait_for_loadbalancer_via_pool(client, &pool_id, timeout).await?;

        tracing::info!(id = %id, "monitor deleted");
        d.set_id("");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Attributes;
    use serde_json::{Value, json};

    fn data(value: Value) -> ResourceData {
        let attributes: Attributes = value.as_object().cloned().unwrap();
        ResourceData::from_config("opentelekomcloud_lb_monitor_v2", attributes)
    }

    #[test]
    fn test_valid_http_monitor() {
        let d = data(json!({
            "pool_id": "pool1",
            "type": "HTTP",
            "http_method": "GET",
            "monitor_port": 8080
        }));
        assert!(LbMonitor.validate(&d).is_ok());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let d = data(json!({"pool_id": "pool1", "type": "PING"}));
        let err = LbMonitor.validate(&d).unwrap_err();
        assert!(err.to_string().contains("PING"));
    }

    #[test]
    fn test_type_is_case_sensitive() {
        let d = data(json!({"pool_id": "pool1", "type": "http"}));
        assert!(LbMonitor.validate(&d).is_err());
    }

    #[test]
    fn test_rejects_unknown_http_method() {
        let d = data(json!({"pool_id": "pool1", "type": "HTTP", "http_method": "FETCH"}));
        assert!(matches!(
            LbMonitor.validate(&d),
            Err(ProviderError::InvalidAttribute(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_port() {
        for port in [0, 65536] {
            let d = data(json!({"pool_id": "pool1", "type": "TCP", "monitor_port": port}));
            assert!(LbMonitor.validate(&d).is_err(), "port {} accepted", port);
        }
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = LbMonitor.default_timeouts();
        assert_eq!(timeouts.create, minutes(10));
        assert_eq!(timeouts.update, minutes(10));
        assert_eq!(timeouts.delete, minutes(10));
    }
}
