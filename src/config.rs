use std::time::Duration;

pub const DEFAULT_REGION: &str = "eu-de";
const DEFAULT_DOMAIN: &str = "otc.t-systems.com";

/// Timing shared by every status wait the provider performs.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub delay: Duration,
    pub min_timeout: Duration,
    pub poll_interval: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            min_timeout: Duration::from_secs(3),
            poll_interval: None,
        }
    }
}

impl PollConfig {
    /// Polls on a fixed interval with no initial delay.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: Some(interval),
        }
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub token: String,
    pub region: String,
    pub project_id: Option<String>,
    pub endpoint_override: Option<String>,
    pub poll: PollConfig,
}

impl ProviderConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            region: DEFAULT_REGION.to_string(),
            project_id: None,
            endpoint_override: None,
            poll: PollConfig::default(),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        match &self.endpoint_override {
            Some(base) => Endpoints::uniform(base),
            None => Endpoints::for_region(&self.region, self.project_id.as_deref()),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &"[REDACTED]")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("endpoint_override", &self.endpoint_override)
            .field("poll", &self.poll)
            .finish()
    }
}

/// Base URLs of the services the provider talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub compute: String,
    pub networking: String,
    pub image: String,
    /// IMS job endpoints are project scoped, unlike the image catalogue.
    pub image_jobs: String,
    pub lts: String,
    pub sfs: String,
    pub identity: String,
    pub kms: String,
}

impl Endpoints {
    pub fn for_region(region: &str, project_id: Option<&str>) -> Self {
        let host = |service: &str| format!("https://{}.{}.{}", service, region, DEFAULT_DOMAIN);
        let scoped = |service: &str, version: &str| match project_id {
            Some(project) => format!("{}/{}/{}", host(service), version, project),
            None => format!("{}/{}", host(service), version),
        };

        Self {
            compute: scoped("ecs", "v2.1"),
            networking: host("vpc"),
            image: host("ims"),
            image_jobs: scoped("ims", "v1"),
            lts: scoped("lts", "v2"),
            sfs: scoped("sfs", "v2"),
            identity: format!("https://iam.{}.{}/v3.0", region, DEFAULT_DOMAIN),
            kms: scoped("kms", "v1.0"),
        }
    }

    /// Every service behind one base URL. Used with mock servers and proxies.
    pub fn uniform(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            compute: base.clone(),
            networking: base.clone(),
            image: base.clone(),
            image_jobs: base.clone(),
            lts: base.clone(),
            sfs: base.clone(),
            identity: base.clone(),
            kms: base,
        }
    }
}
