use async_trait::async_trait;
use serde_json::Value;

use super::{ResourceHandler, check_deleted, minutes};
use crate::providers::opentelekomcloud::types::{ImageCreateOpts, ImageTag, Job, PatchOp};
use crate::providers::opentelekomcloud::{OtcClient, OtcError};
use crate::providers::{Context, ProviderError};
use crate::resource::{ResourceData, TimeoutKind, Timeouts};
use crate::wait::{Refreshed, StateChangeConf};

/// A private image built by IMS either from an ECS server (`instance_id`) or
/// from an image file in OBS (`image_url`).
pub struct Image;

const FORCE_NEW: &[&str] = &[
    "description",
    "max_ram",
    "instance_id",
    "image_url",
    "os_version",
    "is_config",
    "cmk_id",
    "type",
];
const IMAGE_TYPES: &[&str] = &["ECS", "FusionCompute", "BMS", "Ironic"];

const JOB_SUCCESS: &str = "SUCCESS";
const JOB_FAIL: &str = "FAIL";

fn image_tags(d: &ResourceData) -> Vec<ImageTag> {
    d.get_map("image_tags")
        .map(|tags| {
            tags.iter()
                .map(|(key, value)| ImageTag {
                    key: key.clone(),
                    value: value.as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Tags as the image API stores them: `key.value`.
fn tag_list(d: &ResourceData) -> Vec<String> {
    image_tags(d)
        .into_iter()
        .map(|tag| format!("{}.{}", tag.key, tag.value))
        .collect()
}

async fn job_status(client: &OtcClient, job_id: &str) -> Result<Refreshed<Job>, OtcError> {
    let job = client.get_image_job(job_id).await?;
    tracing::debug!(job_id, status = %job.status, "polled image job");
    let status = job.status.clone();
    Ok(Some((job, status)))
}

/// The image API reports lowercase statuses; a 404 means the image is gone.
async fn image_delete_status(client: &OtcClient, id: &str) -> Result<Refreshed<()>, OtcError> {
    match client.get_image(id).await {
        Ok(image) => Ok(Some(((), image.status.to_uppercase()))),
        Err(e) if e.is_not_found() => Ok(Some(((), "DELETED".to_string()))),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl ResourceHandler for Image {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_images_image_v2"
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts {
            create: minutes(10),
            delete: minutes(3),
            ..Timeouts::default()
        }
    }

    fn force_new(&self) -> &'static [&'static str] {
        FORCE_NEW
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("name")?;

        let from_server = d.has_filled("instance_id");
        let from_obs = d.has_filled("image_url");
        match (from_server, from_obs) {
            (true, true) => {
                return Err(ProviderError::InvalidAttribute(
                    "instance_id conflicts with image_url".to_string(),
                ));
            }
            (false, false) => {
                return Err(ProviderError::InvalidAttribute(
                    "either 'instance_id' or 'image_url' must be specified".to_string(),
                ));
            }
            (true, false) if d.has_filled("min_disk") => {
                return Err(ProviderError::InvalidAttribute(
                    "min_disk conflicts with instance_id".to_string(),
                ));
            }
            (false, true) if !d.has_filled("min_disk") => {
                return Err(ProviderError::InvalidAttribute(
                    "'min_disk' must be specified when creating from image_url".to_string(),
                ));
            }
            _ => {}
        }

        let image_type = d.get_string("type");
        if !image_type.is_empty()
            && !IMAGE_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&image_type))
        {
            return Err(ProviderError::InvalidAttribute(format!(
                "type must be one of {:?}, got '{}'",
                IMAGE_TYPES, image_type
            )));
        }
        Ok(())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let mut opts = ImageCreateOpts {
            name: d.require_str("name")?.to_string(),
            description: d.get_string("description"),
            max_ram: d.get_i64("max_ram").unwrap_or_default(),
            min_ram: d.get_i64("min_ram").unwrap_or_default(),
            image_tags: image_tags(d),
            ..Default::default()
        };
        if d.has_filled("instance_id") {
            opts.instance_id = d.get_string("instance_id");
        } else {
            opts.image_url = d.require_str("image_url")?.to_string();
            opts.min_disk = d.require_i64("min_disk")?;
            opts.os_version = d.get_string("os_version");
            opts.is_config = d.get_bool("is_config").unwrap_or(false);
            opts.cmk_id = d.get_string("cmk_id");
            opts.type_ = d.get_string("type");
        }

        let response = client
            .create_image(&opts)
            .await
            .context("error creating image")?;
        tracing::info!(job_id = %response.job_id, "image job submitted");

        let job_id = response.job_id.as_str();
        let job = StateChangeConf::new(
            &["INIT", "RUNNING"],
            &[JOB_SUCCESS, JOB_FAIL],
            d.timeout(TimeoutKind::Create),
        )
        .with_poll(client.poll())
        .wait_for_state(move || job_status(client, job_id))
        .await
        .context(format!("error waiting for image job {}", job_id))?;

        let job = job.ok_or_else(|| ProviderError::JobFailed {
            job_id: job_id.to_string(),
            reason: "job disappeared".to_string(),
        })?;

        if job.status == JOB_FAIL {
            let reason = job
                .fail_reason
                .or(job.error_code)
                .unwrap_or_else(|| "unknown reason".to_string());
            return Err(ProviderError::JobFailed {
                job_id: job_id.to_string(),
                reason,
            });
        }

        let image_id = job.entities.image_id.ok_or_else(|| ProviderError::JobFailed {
            job_id: job_id.to_string(),
            reason: "job finished without an image id".to_string(),
        })?;

        tracing::info!(id = %image_id, "image created");
        d.set_id(image_id);
        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.find_cloud_image(d.id()).await;
        let image = match result {
            Ok(Some(image)) => image,
            Ok(None) => {
                tracing::info!(id = %d.id(), "image not found, removing from state");
                d.set_id("");
                return Ok(());
            }
            Err(e) => return check_deleted(d, e, "image"),
        };

        d.set("name", image.name);
        d.set("visibility", image.visibility);
        d.set("file", image.file);
        d.set("schema", image.schema);
        d.set("data_origin", image.data_origin);
        d.set("disk_format", image.disk_format);
        d.set("image_size", image.image_size);
        Ok(())
    }

    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let mut ops = Vec::new();
        if d.has_change("name") {
            ops.push(PatchOp::replace("/name", d.get_string("name")));
        }
        if d.has_change("image_tags") {
            let tags: Vec<Value> = tag_list(d).into_iter().map(Value::from).collect();
            ops.push(PatchOp::replace("/tags", tags));
        }

        if !ops.is_empty() {
            tracing::debug!(id = %d.id(), changes = ops.len(), "updating image");
            client
                .update_image(d.id(), &ops)
                .await
                .context(format!("error updating image {}", d.id()))?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let id = d.id().to_string();
        let result = client.delete_image(&id).await;
        if let Err(e) = result {
            if e.is_not_found() {
                d.set_id("");
                return Ok(());
            }
            return Err(ProviderError::Api {
                message: format!("error deleting image {}", id),
                source: e,
            });
        }

        let image_id = id.as_str();
        StateChangeConf::new(
            &["ACTIVE", "PENDING_DELETE"],
            &["DELETED"],
            d.timeout(TimeoutKind::Delete),
        )
        .with_poll(client.poll())
        .wait_for_state(move || image_delete_status(client, image_id))
        .await
        .context(format!("error waiting for image {} to be deleted", id))?;

        tracing::info!(id = %id, "image deleted");
        d.set_id("");
        Ok(())
    }
}
