use serde::{Deserialize, Serialize};

use crate::providers::opentelekomcloud::types::{
    Credential, CredentialCreateOpts, CredentialUpdateOpts,
};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Serialize)]
struct CredentialRequest<'a, T> {
    credential: &'a T,
}

#[derive(Deserialize)]
struct CredentialEnvelope {
    credential: Credential,
}

#[derive(Deserialize)]
struct CredentialList {
    #[serde(default)]
    credentials: Vec<Credential>,
}

impl OtcClient {
    fn credentials_url(&self) -> String {
        format!("{}/OS-CREDENTIAL/credentials", self.endpoints().identity)
    }

    /// Lists AK/SK pairs, restricted to one user when `user_id` is given.
    pub async fn list_credentials(&self, user_id: Option<&str>) -> Result<Vec<Credential>, OtcError> {
        let url = match user_id {
            Some(user) if !user.is_empty() => format!(
                "{}?user_id={}",
                self.credentials_url(),
                urlencoding::encode(user)
            ),
            _ => self.credentials_url(),
        };
        let list: CredentialList = self.get(&url).await?;
        Ok(list.credentials)
    }

    /// The secret key is only ever returned by this call.
    pub async fn create_credential(
        &self,
        opts: &CredentialCreateOpts,
    ) -> Result<Credential, OtcError> {
        let envelope: CredentialEnvelope = self
            .post(
                &self.credentials_url(),
                &CredentialRequest { credential: opts },
            )
            .await?;
        Ok(envelope.credential)
    }

    pub async fn get_credential(&self, access_key: &str) -> Result<Credential, OtcError> {
        let url = format!("{}/{}", self.credentials_url(), access_key);
        let envelope: CredentialEnvelope = self.get(&url).await?;
        Ok(envelope.credential)
    }

    pub async fn update_credential(
        &self,
        access_key: &str,
        opts: &CredentialUpdateOpts,
    ) -> Result<Credential, OtcError> {
        let url = format!("{}/{}", self.credentials_url(), access_key);
        let envelope: CredentialEnvelope = self
            .put(&url, &CredentialRequest { credential: opts })
            .await?;
        Ok(envelope.credential)
    }

    pub async fn delete_credential(&self, access_key: &str) -> Result<(), OtcError> {
        let url = format!("{}/{}", self.credentials_url(), access_key);
        self.delete(&url).await
    }
}
