//! Converges declared resources with stored state through a [`Provider`].
//!
//! Planning only compares the manifest against the state file; nothing is
//! read from the cloud until `apply` or `refresh` runs. Every step of an
//! apply is persisted immediately, so an interrupted run leaves state that
//! matches what was actually done.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::AppError;
use crate::providers::{Provider, ProviderError};
use crate::resource::{Attributes, Manifest, ResourceData, ResourceSpec, Timeouts, address};
use crate::state::{ResourceState, StateFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    /// Destroy, then create again.
    Replace,
    Update,
    NoOp,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Replace => write!(f, "replace"),
            Action::Update => write!(f, "update"),
            Action::NoOp => write!(f, "no-op"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChange {
    pub resource_type: String,
    pub name: String,
    pub action: Action,
    /// Declared attributes whose value differs from stored state.
    pub changed: Vec<String>,
}

impl PlannedChange {
    pub fn address(&self) -> String {
        address(&self.resource_type, &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != Action::NoOp)
    }

    fn count(&self, action: Action) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.count(Action::Create),
            replace: self.count(Action::Replace),
            update: self.count(Action::Update),
            delete: self.count(Action::Delete),
            unchanged: self.count(Action::NoOp),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub replace: usize,
    pub update: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to replace, {} to update, {} to delete, {} unchanged",
            self.create, self.replace, self.update, self.delete, self.unchanged
        )
    }
}

/// Result of reading one declared data source.
#[derive(Debug, Clone, PartialEq)]
pub struct DataResult {
    pub data_type: String,
    pub name: String,
    pub id: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    /// Addresses dropped because the resource no longer exists.
    pub dropped: Vec<String>,
}

fn is_set(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Nested objects match on their declared keys only: state also carries
/// what the API computed, such as the ids of individual access rules.
fn satisfies(declared: &Value, stored: &Value) -> bool {
    match (declared, stored) {
        (Value::Object(declared), Value::Object(stored)) => declared.iter().all(|(key, value)| {
            value.is_null() || stored.get(key).is_some_and(|s| satisfies(value, s))
        }),
        (Value::Array(declared), Value::Array(stored)) => {
            declared.len() == stored.len()
                && declared.iter().zip(stored).all(|(d, s)| satisfies(d, s))
        }
        _ => declared == stored,
    }
}

/// Set-typed attributes come back in whatever order the API chooses. Every
/// declared element needs a stored element of its own.
fn satisfies_set(declared: &[Value], stored: &[Value]) -> bool {
    if declared.len() != stored.len() {
        return false;
    }
    let mut used = vec![false; stored.len()];
    declared.iter().all(|element| {
        match (0..stored.len()).find(|&i| !used[i] && satisfies(element, &stored[i])) {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Declared attributes whose value is not what state recorded. Attributes
/// named in `sets` are compared without regard to order.
fn changed_attributes(declared: &Attributes, stored: &Attributes, sets: &[&str]) -> Vec<String> {
    declared
        .iter()
        .filter(|(key, value)| {
            match (is_set(Some(*value)), is_set(stored.get(key.as_str()))) {
                (None, None) => false,
                (Some(Value::Array(declared)), Some(Value::Array(stored)))
                    if sets.contains(&key.as_str()) =>
                {
                    !satisfies_set(declared, stored)
                }
                (Some(declared), Some(stored)) => !satisfies(declared, stored),
                _ => true,
            }
        })
        .map(|(key, _)| key.clone())
        .collect()
}

pub struct Reconciler<'a> {
    provider: &'a dyn Provider,
    state: StateFile,
    state_path: PathBuf,
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn Provider, state: StateFile, state_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            state,
            state_path: state_path.into(),
        }
    }

    pub fn load(provider: &'a dyn Provider, state_path: &Path) -> Result<Self, AppError> {
        let state = StateFile::load(state_path)?;
        Ok(Self::new(provider, state, state_path))
    }

    pub fn state(&self) -> &StateFile {
        &self.state
    }

    fn save(&mut self) -> Result<(), AppError> {
        self.state.save(&self.state_path)
    }

    fn timeouts(&self, spec: Option<&ResourceSpec>, resource_type: &str) -> Result<Timeouts, ProviderError> {
        let info = self.provider.resource_info(resource_type)?;
        match spec {
            Some(spec) => info.timeouts.with_overrides(&spec.timeouts),
            None => Ok(info.timeouts),
        }
    }

    pub fn plan(&self, manifest: &Manifest) -> Result<Plan, AppError> {
        let mut changes = Vec::new();

        for spec in &manifest.resources {
            let info = self.provider.resource_info(&spec.resource_type)?;
            let (action, changed) = match self.state.get(&spec.address()) {
                None => (Action::Create, Vec::new()),
                Some(stored) => {
                    let changed =
                        changed_attributes(&spec.attributes, &stored.attributes, info.set_attributes);
                    let action = if stored.tainted
                        || changed.iter().any(|key| info.force_new.contains(&key.as_str()))
                    {
                        Action::Replace
                    } else if changed.is_empty() {
                        Action::NoOp
                    } else {
                        Action::Update
                    };
                    (action, changed)
                }
            };
            tracing::debug!(address = %spec.address(), %action, "planned");
            changes.push(PlannedChange {
                resource_type: spec.resource_type.clone(),
                name: spec.name.clone(),
                action,
                changed,
            });
        }

        let declared: Vec<String> = manifest.resources.iter().map(ResourceSpec::address).collect();
        for stored in self.state.resources.iter().rev() {
            if !declared.contains(&stored.address()) {
                changes.push(PlannedChange {
                    resource_type: stored.resource_type.clone(),
                    name: stored.name.clone(),
                    action: Action::Delete,
                    changed: Vec::new(),
                });
            }
        }

        Ok(Plan { changes })
    }

    /// Executes `plan` in order. The first failure stops the run; everything
    /// done before it is already in state.
    pub async fn apply(&mut self, manifest: &Manifest, plan: &Plan) -> Result<(), AppError> {
        for change in &plan.changes {
            let address = change.address();
            let spec = manifest.resources.iter().find(|s| s.address() == address);

            match (change.action, spec) {
                (Action::NoOp, _) => continue,
                (Action::Delete, _) => self.delete_stored(&address, None).await?,
                (Action::Create, Some(spec)) => self.create(spec).await?,
                (Action::Replace, Some(spec)) => {
                    self.delete_stored(&address, Some(spec)).await?;
                    self.create(spec).await?;
                }
                (Action::Update, Some(spec)) => self.update(spec).await?,
                (action, None) => {
                    return Err(AppError::Manifest(format!(
                        "planned {} for '{}' which is not declared",
                        action, address
                    )));
                }
            }
        }
        Ok(())
    }

    async fn create(&mut self, spec: &ResourceSpec) -> Result<(), AppError> {
        let timeouts = self.timeouts(Some(spec), &spec.resource_type)?;
        let mut d = ResourceData::from_config(&spec.resource_type, spec.attributes.clone())
            .with_timeouts(timeouts);

        tracing::info!(address = %spec.address(), "creating");
        let result = self.provider.create(&mut d).await;

        let id = d.id().to_string();
        match result {
            Ok(()) if id.is_empty() => Err(AppError::State(format!(
                "create of '{}' finished without an id",
                spec.address()
            ))),
            Ok(()) => {
                let stored = ResourceState::new(&spec.resource_type, &spec.name, id, d.into_attributes());
                self.state.upsert(stored);
                self.save()?;
                tracing::info!(address = %spec.address(), "created");
                Ok(())
            }
            Err(e) => {
                if !id.is_empty() {
                    tracing::warn!(address = %spec.address(), id = %id, "create failed, storing as tainted");
                    let mut stored =
                        ResourceState::new(&spec.resource_type, &spec.name, id, d.into_attributes());
                    stored.tainted = true;
                    self.state.upsert(stored);
                    self.save()?;
                }
                Err(e.into())
            }
        }
    }

    async fn update(&mut self, spec: &ResourceSpec) -> Result<(), AppError> {
        let address = spec.address();
        let stored = self
            .state
            .get(&address)
            .cloned()
            .ok_or_else(|| AppError::State(format!("'{}' is not in state", address)))?;

        let timeouts = self.timeouts(Some(spec), &spec.resource_type)?;
        let mut d = ResourceData::with_changes(
            &spec.resource_type,
            &stored.id,
            stored.attributes,
            &spec.attributes,
        )
        .with_timeouts(timeouts);

        tracing::info!(address = %address, id = %stored.id, "updating");
        self.provider.update(&mut d).await?;

        if d.id().is_empty() {
            tracing::warn!(address = %address, "resource disappeared during update");
            self.state.remove(&address);
        } else {
            let id = d.id().to_string();
            self.state
                .upsert(ResourceState::new(&spec.resource_type, &spec.name, id, d.into_attributes()));
        }
        self.save()
    }

    /// Deletes the resource stored at `address`. `spec` carries the timeout
    /// overrides when the resource is still declared.
    async fn delete_stored(
        &mut self,
        address: &str,
        spec: Option<&ResourceSpec>,
    ) -> Result<(), AppError> {
        let Some(stored) = self.state.get(address).cloned() else {
            return Ok(());
        };

        let timeouts = self.timeouts(spec, &stored.resource_type)?;
        let mut d = ResourceData::from_state(&stored.resource_type, &stored.id, stored.attributes)
            .with_timeouts(timeouts);

        tracing::info!(address = %address, id = %stored.id, "deleting");
        self.provider.delete(&mut d).await?;

        self.state.remove(address);
        self.save()
    }

    /// Re-reads every stored resource. Resources that are gone are dropped.
    pub async fn refresh(&mut self) -> Result<RefreshSummary, AppError> {
        let mut summary = RefreshSummary::default();

        for stored in self.state.resources.clone() {
            let address = stored.address();
            let timeouts = self.timeouts(None, &stored.resource_type)?;
            let mut d = ResourceData::from_state(&stored.resource_type, &stored.id, stored.attributes)
                .with_timeouts(timeouts);

            self.provider.read(&mut d).await?;

            if d.id().is_empty() {
                tracing::info!(address = %address, "resource no longer exists, dropping from state");
                self.state.remove(&address);
                summary.dropped.push(address);
                continue;
            }

            let id = d.id().to_string();
            let mut refreshed =
                ResourceState::new(&stored.resource_type, &stored.name, id, d.into_attributes());
            refreshed.tainted = stored.tainted;
            self.state.upsert(refreshed);
            summary.refreshed += 1;
        }

        self.save()?;
        Ok(summary)
    }

    /// Adopts an existing cloud resource under `type.name`.
    pub async fn import(
        &mut self,
        resource_type: &str,
        name: &str,
        id: &str,
    ) -> Result<ResourceState, AppError> {
        let address = address(resource_type, name);
        if self.state.get(&address).is_some() {
            return Err(AppError::State(format!("'{}' is already managed", address)));
        }

        let timeouts = self.timeouts(None, resource_type)?;
        let mut d = ResourceData::new(resource_type).with_timeouts(timeouts);
        d.set_id(id);

        tracing::info!(address = %address, id = %id, "importing");
        self.provider.import(&mut d).await?;
        if d.id().is_empty() {
            return Err(AppError::State(format!(
                "cannot import non-existent remote object {} as '{}'",
                id, address
            )));
        }

        let imported_id = d.id().to_string();
        let imported = ResourceState::new(resource_type, name, imported_id, d.into_attributes());
        self.state.upsert(imported.clone());
        self.save()?;
        Ok(imported)
    }

    /// Deletes every stored resource, newest first.
    pub async fn destroy(&mut self) -> Result<Vec<String>, AppError> {
        let addresses: Vec<String> = self.state.resources.iter().rev().map(ResourceState::address).collect();
        for address in &addresses {
            self.delete_stored(address, None).await?;
        }
        Ok(addresses)
    }

    pub async fn read_data(&self, manifest: &Manifest) -> Result<Vec<DataResult>, AppError> {
        let mut results = Vec::with_capacity(manifest.data.len());
        for spec in &manifest.data {
            let mut d = ResourceData::from_config(&spec.data_type, spec.attributes.clone());
            tracing::debug!(data_type = %spec.data_type, name = %spec.name, "reading data source");
            self.provider.read_data_source(&mut d).await?;
            results.push(DataResult {
                data_type: spec.data_type.clone(),
                name: spec.name.clone(),
                id: d.id().to_string(),
                attributes: d.into_attributes(),
            });
        }
        Ok(results)
    }
}
