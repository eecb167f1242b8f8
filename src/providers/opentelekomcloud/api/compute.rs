use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::providers::opentelekomcloud::types::{Server, ServerCreateOpts};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Serialize)]
struct CreateServerRequest<'a> {
    server: &'a ServerCreateOpts,
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: Server,
}

impl OtcClient {
    fn server_url(&self, id: &str) -> String {
        format!("{}/servers/{}", self.endpoints().compute, id)
    }

    pub async fn create_server(&self, opts: &ServerCreateOpts) -> Result<Server, OtcError> {
        let url = format!("{}/servers", self.endpoints().compute);
        let envelope: ServerEnvelope = self
            .post(&url, &CreateServerRequest { server: opts })
            .await?;
        Ok(envelope.server)
    }

    pub async fn get_server(&self, id: &str) -> Result<Server, OtcError> {
        let envelope: ServerEnvelope = self.get(&self.server_url(id)).await?;
        Ok(envelope.server)
    }

    pub async fn rename_server(&self, id: &str, name: &str) -> Result<Server, OtcError> {
        let body = json!({ "server": { "name": name } });
        let envelope: ServerEnvelope = self.put(&self.server_url(id), &body).await?;
        Ok(envelope.server)
    }

    /// Replaces the complete metadata set of a server.
    pub async fn replace_server_metadata(
        &self,
        id: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), OtcError> {
        let url = format!("{}/metadata", self.server_url(id));
        let _: Value = self.put(&url, &json!({ "metadata": metadata })).await?;
        Ok(())
    }

    pub async fn resize_server(&self, id: &str, flavor_id: &str) -> Result<(), OtcError> {
        let url = format!("{}/action", self.server_url(id));
        self.post_no_content(&url, &json!({ "resize": { "flavorRef": flavor_id } }))
            .await
    }

    pub async fn confirm_resize(&self, id: &str) -> Result<(), OtcError> {
        let url = format!("{}/action", self.server_url(id));
        self.post_no_content(&url, &json!({ "confirmResize": null }))
            .await
    }

    pub async fn delete_server(&self, id: &str) -> Result<(), OtcError> {
        self.delete(&self.server_url(id)).await
    }
}
