use serde::Deserialize;
use serde_json::json;

use crate::providers::opentelekomcloud::types::LogGroup;
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Deserialize)]
struct CreatedGroup {
    log_group_id: String,
}

#[derive(Deserialize)]
struct GroupList {
    #[serde(default)]
    log_groups: Vec<LogGroup>,
}

impl OtcClient {
    /// Returns the id of the new group.
    pub async fn create_log_group(&self, name: &str) -> Result<String, OtcError> {
        let url = format!("{}/groups", self.endpoints().lts);
        let created: CreatedGroup = self.post(&url, &json!({ "log_group_name": name })).await?;
        Ok(created.log_group_id)
    }

    /// The service has no single-group lookup, so groups are found by listing.
    pub async fn list_log_groups(&self) -> Result<Vec<LogGroup>, OtcError> {
        let url = format!("{}/groups", self.endpoints().lts);
        let list: GroupList = self.get(&url).await?;
        Ok(list.log_groups)
    }

    pub async fn delete_log_group(&self, id: &str) -> Result<(), OtcError> {
        let url = format!("{}/groups/{}", self.endpoints().lts, id);
        self.delete(&url).await
    }
}
