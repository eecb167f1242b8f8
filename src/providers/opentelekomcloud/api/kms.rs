use crate::providers::opentelekomcloud::types::{DataKey, DataKeyOpts};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

impl OtcClient {
    pub async fn create_data_key(&self, opts: &DataKeyOpts) -> Result<DataKey, OtcError> {
        let url = format!("{}/kms/create-datakey", self.endpoints().kms);
        self.post(&url, opts).await
    }
}
