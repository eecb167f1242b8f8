use serde::{Deserialize, Serialize};

use crate::providers::opentelekomcloud::types::{
    Listener, LoadBalancer, Monitor, MonitorCreateOpts, MonitorUpdateOpts, Pool,
};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Serialize)]
struct MonitorRequest<'a, T> {
    healthmonitor: &'a T,
}

#[derive(Deserialize)]
struct MonitorEnvelope {
    healthmonitor: Monitor,
}

#[derive(Deserialize)]
struct PoolEnvelope {
    pool: Pool,
}

#[derive(Deserialize)]
struct ListenerEnvelope {
    listener: Listener,
}

#[derive(Deserialize)]
struct LoadBalancerEnvelope {
    loadbalancer: LoadBalancer,
}

impl OtcClient {
    fn lbaas_url(&self, collection: &str) -> String {
        format!("{}/v2.0/lbaas/{}", self.endpoints().networking, collection)
    }

    pub async fn get_pool(&self, id: &str) -> Result<Pool, OtcError> {
        let url = format!("{}/{}", self.lbaas_url("pools"), id);
        let envelope: PoolEnvelope = self.get(&url).await?;
        Ok(envelope.pool)
    }

    pub async fn get_listener(&self, id: &str) -> Result<Listener, OtcError> {
        let url = format!("{}/{}", self.lbaas_url("listeners"), id);
        let envelope: ListenerEnvelope = self.get(&url).await?;
        Ok(envelope.listener)
    }

    pub async fn get_loadbalancer(&self, id: &str) -> Result<LoadBalancer, OtcError> {
        let url = format!("{}/{}", self.lbaas_url("loadbalancers"), id);
        let envelope: LoadBalancerEnvelope = self.get(&url).await?;
        Ok(envelope.loadbalancer)
    }

    pub async fn create_monitor(&self, opts: &MonitorCreateOpts) -> Result<Monitor, OtcError> {
        let envelope: MonitorEnvelope = self
            .post(
                &self.lbaas_url("healthmonitors"),
                &MonitorRequest {
                    healthmonitor: opts,
                },
            )
            .await?;
        Ok(envelope.healthmonitor)
    }

    pub async fn get_monitor(&self, id: &str) -> Result<Monitor, OtcError> {
        let url = format!("{}/{}", self.lbaas_url("healthmonitors"), id);
        let envelope: MonitorEnvelope = self.get(&url).await?;
        Ok(envelope.healthmonitor)
    }

    pub async fn update_monitor(
        &self,
        id: &str,
        opts: &MonitorUpdateOpts,
    ) -> Result<Monitor, OtcError> {
        let url = format!("{}/{}", self.lbaas_url("healthmonitors"), id);
        let envelope: MonitorEnvelope = self
            .put(
                &url,
                &MonitorRequest {
                    healthmonitor: opts,
                },
            )
            .await?;
        Ok(envelope.healthmonitor)
    }

    pub async fn delete_monitor(&self, id: &str) -> Result<(), OtcError> {
        let url = format!("{}/{}", self.lbaas_url("healthmonitors"), id);
        self.delete(&url).await
    }
}
