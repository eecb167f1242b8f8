use serde::Deserialize;
use serde_json::Value;

use crate::providers::opentelekomcloud::client::IMAGE_PATCH_CONTENT_TYPE;
use crate::providers::opentelekomcloud::types::{Image, ImageCreateOpts, Job, JobResponse, PatchOp};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};

#[derive(Deserialize)]
struct ImageList {
    #[serde(default)]
    images: Vec<Image>,
}

impl OtcClient {
    fn image_url(&self, id: &str) -> String {
        format!("{}/v2/images/{}", self.endpoints().image, id)
    }

    /// Starts an asynchronous image build from a server or an OBS object.
    pub async fn create_image(&self, opts: &ImageCreateOpts) -> Result<JobResponse, OtcError> {
        let url = format!("{}/v2/cloudimages/action", self.endpoints().image);
        self.post(&url, opts).await
    }

    pub async fn get_image_job(&self, job_id: &str) -> Result<Job, OtcError> {
        let url = format!("{}/jobs/{}", self.endpoints().image_jobs, job_id);
        self.get(&url).await
    }

    /// Looks an image up in the IMS catalogue, which carries the
    /// service-specific attributes the plain image API omits.
    pub async fn find_cloud_image(&self, id: &str) -> Result<Option<Image>, OtcError> {
        let url = format!(
            "{}/v2/cloudimages?id={}&limit=1",
            self.endpoints().image,
            urlencoding::encode(id)
        );
        let list: ImageList = self.get(&url).await?;
        Ok(list.images.into_iter().find(|image| image.id == id))
    }

    pub async fn get_image(&self, id: &str) -> Result<Image, OtcError> {
        self.get(&self.image_url(id)).await
    }

    pub async fn update_image(&self, id: &str, ops: &[PatchOp]) -> Result<(), OtcError> {
        let _: Value = self
            .patch(&self.image_url(id), ops, IMAGE_PATCH_CONTENT_TYPE)
            .await?;
        Ok(())
    }

    pub async fn delete_image(&self, id: &str) -> Result<(), OtcError> {
        self.delete(&self.image_url(id)).await
    }
}
