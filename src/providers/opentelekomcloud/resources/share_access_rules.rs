use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ResourceHandler, check_deleted};
use crate::providers::opentelekomcloud::OtcClient;
use crate::providers::opentelekomcloud::types::GrantAccessOpts;
use crate::providers::{Context, ProviderError};
use crate::resource::ResourceData;

/// The full set of access rules of one SFS share. The id is the share id.
pub struct ShareAccessRules;

const MAX_RULES: usize = 20;
const DEFAULT_ACCESS_TYPE: &str = "cert";

fn field<'a>(rule: &'a Value, key: &str) -> &'a str {
    rule.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn grant_opts(rule: &Value) -> GrantAccessOpts {
    let access_type = match field(rule, "access_type") {
        "" => DEFAULT_ACCESS_TYPE,
        other => other,
    };
    GrantAccessOpts {
        access_level: field(rule, "access_level").to_string(),
        access_type: access_type.to_string(),
        access_to: field(rule, "access_to").to_string(),
    }
}

async fn grant_all(client: &OtcClient, share_id: &str, rules: &[Value]) -> Result<(), ProviderError> {
    for rule in rules {
        let opts = grant_opts(rule);
        client
            .grant_share_access(share_id, &opts)
            .await
            .context(format!("error applying access rule for share {}", share_id))?;
        tracing::debug!(share_id, access_to = %opts.access_to, "access rule applied");
    }
    Ok(())
}

async fn deny_all(client: &OtcClient, share_id: &str, rules: &[Value]) -> Result<(), ProviderError> {
    for rule in rules {
        let access_id = field(rule, "share_access_id");
        if access_id.is_empty() {
            continue;
        }
        client
            .deny_share_access(share_id, access_id)
            .await
            .context(format!("error deleting access rule for share {}", share_id))?;
        tracing::debug!(share_id, access_id, "access rule removed");
    }
    Ok(())
}

#[async_trait]
impl ResourceHandler for ShareAccessRules {
    fn type_name(&self) -> &'static str {
        "opentelekomcloud_sfs_share_access_rules_v2"
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["share_id"]
    }

    fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        d.require_str("share_id")?;
        let rules = d.get_list("access_rule");
        if rules.is_empty() || rules.len() > MAX_RULES {
            return Err(ProviderError::InvalidAttribute(format!(
                "access_rule must contain between 1 and {} entries, got {}",
                MAX_RULES,
                rules.len()
            )));
        }
        for rule in &rules {
            for key in ["access_level", "access_to"] {
                if field(rule, key).is_empty() {
                    return Err(ProviderError::MissingAttribute {
                        resource_type: d.resource_type().to_string(),
                        attribute: format!("access_rule.{}", key),
                    });
                }
            }
        }
        Ok(())
    }

    async fn create(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let share_id = d.require_str("share_id")?.to_string();
        grant_all(client, &share_id, &d.get_list("access_rule")).await?;

        tracing::info!(share_id = %share_id, "share access rules applied");
        d.set_id(share_id);
        self.read(client, d).await
    }

    async fn read(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let result = client.list_share_access(d.id()).await;
        let rights = match result {
            Ok(rights) => rights,
            Err(e) => return check_deleted(d, e, "share access rules"),
        };

        let rules: Vec<Value> = rights
            .into_iter()
            .map(|right| {
                json!({
                    "access_level": right.access_level,
                    "access_to": right.access_to,
                    "access_type": right.access_type,
                    "access_rule_status": right.state,
                    "share_access_id": right.id,
                })
            })
            .collect();

        let share_id = d.id().to_string();
        d.set("access_rule", rules);
        d.set("share_id", share_id);
        Ok(())
    }

    /// Rules cannot be modified in place: the old set is revoked and the new
    /// one granted.
    async fn update(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        if d.has_change("access_rule") {
            let (old, new) = d.get_change("access_rule");
            let as_list = |v: Option<&Value>| v.and_then(Value::as_array).cloned().unwrap_or_default();
            let (old, new) = (as_list(old), as_list(new));

            let share_id = d.id().to_string();
            deny_all(client, &share_id, &old).await?;
            grant_all(client, &share_id, &new).await?;
        }
        self.read(client, d).await
    }

    async fn delete(&self, client: &OtcClient, d: &mut ResourceData) -> Result<(), ProviderError> {
        let share_id = d.id().to_string();
        deny_all(client, &share_id, &d.get_list("access_rule")).await?;
        tracing::info!(share_id = %share_id, "share access rules removed");
        d.set_id("");
        Ok(())
    }
}
