use serde::Deserialize;
use serde_json::json;

use crate::providers::opentelekomcloud::types::{AccessRight, GrantAccessOpts};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Deserialize)]
struct AccessEnvelope {
    access: AccessRight,
}

#[derive(Deserialize)]
struct AccessList {
    #[serde(default)]
    access_list: Vec<AccessRight>,
}

impl OtcClient {
    fn share_action_url(&self, share_id: &str) -> String {
        format!("{}/shares/{}/action", self.endpoints().sfs, share_id)
    }

    pub async fn grant_share_access(
        &self,
        share_id: &str,
        opts: &GrantAccessOpts,
    ) -> Result<AccessRight, OtcError> {
        let envelope: AccessEnvelope = self
            .post(
                &self.share_action_url(share_id),
                &json!({ "os-allow_access": opts }),
            )
            .await?;
        Ok(envelope.access)
    }

    pub async fn list_share_access(&self, share_id: &str) -> Result<Vec<AccessRight>, OtcError> {
        let list: AccessList = self
            .post(
                &self.share_action_url(share_id),
                &json!({ "os-access_list": null }),
            )
            .await?;
        Ok(list.access_list)
    }

    pub async fn deny_share_access(&self, share_id: &str, access_id: &str) -> Result<(), OtcError> {
        self.post_no_content(
            &self.share_action_url(share_id),
            &json!({ "os-deny_access": { "access_id": access_id } }),
        )
        .await
    }
}
