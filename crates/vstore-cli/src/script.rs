//! Scripted store sessions: a JSON list of operations replayed against a
//! fresh in-memory [`VStore`].
//!
//! Version ids are generated by the store, so steps may leave them out:
//! a missing `versionId` means the latest version of the entity, and an
//! object descriptor without `templateVersionId` is pinned to the latest
//! template version.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vstore_engine::{InMemoryBackends, VStore, VStoreConfig, VStoreError};
use vstore_types::{
    AuthorInfo, ObjectDescriptor, ObjectId, TemplateCode, TemplateDescriptor, TemplateId,
    VersionId,
};

fn default_session_secs() -> i64 {
    3600
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Author of every write; defaults to `vstore-cli`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorInfo>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Make a local file available as an upload session.
    RegisterUpload {
        key: String,
        filename: String,
        content_type: String,
        /// Relative paths resolve against the script's directory.
        path: PathBuf,
        #[serde(default = "default_session_secs")]
        session_secs: i64,
    },
    CreateTemplate {
        id: TemplateId,
        descriptor: TemplateDescriptor,
    },
    ModifyTemplate {
        id: TemplateId,
        #[serde(default)]
        version_id: Option<VersionId>,
        descriptor: TemplateDescriptor,
    },
    CreateObject {
        id: ObjectId,
        descriptor: ObjectDescriptor,
    },
    ModifyObject {
        id: ObjectId,
        #[serde(default)]
        version_id: Option<VersionId>,
        descriptor: ObjectDescriptor,
    },
    UpgradeObject {
        id: ObjectId,
        #[serde(default)]
        version_id: Option<VersionId>,
        #[serde(default)]
        modified_template_codes: Vec<TemplateCode>,
        descriptor: ObjectDescriptor,
    },
    GetObject {
        id: ObjectId,
        #[serde(default)]
        version_id: Option<VersionId>,
    },
    GetObjectVersions {
        id: ObjectId,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::RegisterUpload { .. } => "registerUpload",
            Step::CreateTemplate { .. } => "createTemplate",
            Step::ModifyTemplate { .. } => "modifyTemplate",
            Step::CreateObject { .. } => "createObject",
            Step::ModifyObject { .. } => "modifyObject",
            Step::UpgradeObject { .. } => "upgradeObject",
            Step::GetObject { .. } => "getObject",
            Step::GetObjectVersions { .. } => "getObjectVersions",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outcome {
    Registered { key: String, size: u64 },
    Committed { version_id: VersionId },
    Loaded { value: Value },
    Rejected {
        error: String,
        retryable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

impl Outcome {
    fn rejected(err: &anyhow::Error) -> Self {
        let store_error = err.downcast_ref::<VStoreError>();
        let details = store_error.and_then(|e| match e {
            VStoreError::InvalidObject { errors, .. } => serde_json::to_value(errors).ok(),
            VStoreError::TemplateValidation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        });
        Outcome::Rejected {
            error: format!("{err:#}"),
            retryable: store_error.is_some_and(VStoreError::is_retryable),
            details,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// A store over in-memory backends plus the context steps run in.
pub struct Session {
    store: VStore,
    backends: InMemoryBackends,
    base_dir: PathBuf,
    author: AuthorInfo,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: VStoreConfig, base_dir: impl Into<PathBuf>, author: AuthorInfo) -> Self {
        let (store, backends) = VStore::in_memory(config);
        Self {
            store,
            backends,
            base_dir: base_dir.into(),
            author,
            cancel: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &VStore {
        &self.store
    }

    /// Run `steps` in order. Unless `keep_going` is set, the first rejected
    /// step ends the run.
    pub async fn run(&self, steps: Vec<Step>, keep_going: bool) -> Vec<StepReport> {
        let mut reports = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            let op = step.op();
            debug!(index, op, "running step");
            let outcome = match self.execute(step).await {
                Ok(outcome) => outcome,
                Err(err) => Outcome::rejected(&err),
            };
            let stop = outcome.is_rejected() && !keep_going;
            reports.push(StepReport { index, op, outcome });
            if stop {
                break;
            }
        }
        reports
    }

    async fn execute(&self, step: Step) -> anyhow::Result<Outcome> {
        let author = self.author.clone();
        let outcome = match step {
            Step::RegisterUpload {
                key,
                filename,
                content_type,
                path,
                session_secs,
            } => {
                let path = self.base_dir.join(path);
                let content = std::fs::read(&path)
                    .with_context(|| format!("reading upload {}", path.display()))?;
                let size = content.len() as u64;
                self.backends.binaries.register_upload(
                    key.as_str(),
                    filename,
                    content_type,
                    content,
                    chrono::Duration::seconds(session_secs),
                )?;
                Outcome::Registered { key, size }
            }
            Step::CreateTemplate { id, descriptor } => Outcome::Committed {
                version_id: self.store.create_template(id, author, descriptor).await?,
            },
            Step::ModifyTemplate {
                id,
                version_id,
                descriptor,
            } => {
                let version_id = match version_id {
                    Some(version_id) => version_id,
                    None => self.store.get_template_latest_version(id)?.version_id,
                };
                Outcome::Committed {
                    version_id: self
                        .store
                        .modify_template(id, &version_id, author, descriptor)
                        .await?,
                }
            }
            Step::CreateObject { id, descriptor } => {
                let descriptor = self.pin_template(descriptor)?;
                Outcome::Committed {
                    version_id: self.store.create_object(id, author, descriptor).await?,
                }
            }
            Step::ModifyObject {
                id,
                version_id,
                descriptor,
            } => {
                let version_id = self.object_version(id, version_id).await?;
                let descriptor = self.pin_template(descriptor)?;
                Outcome::Committed {
                    version_id: self
                        .store
                        .modify_object(id, &version_id, author, descriptor)
                        .await?,
                }
            }
            Step::UpgradeObject {
                id,
                version_id,
                modified_template_codes,
                descriptor,
            } => {
                let version_id = self.object_version(id, version_id).await?;
                let descriptor = self.pin_template(descriptor)?;
                Outcome::Committed {
                    version_id: self
                        .store
                        .upgrade_object(id, &version_id, author, modified_template_codes, descriptor)
                        .await?,
                }
            }
            Step::GetObject { id, version_id } => {
                let descriptor = self
                    .store
                    .get_object_descriptor(id, version_id.as_ref(), &self.cancel)
                    .await?;
                Outcome::Loaded {
                    value: serde_json::to_value(descriptor)?,
                }
            }
            Step::GetObjectVersions { id } => {
                let versions = self
                    .store
                    .get_object_versions(id, None, &self.cancel)
                    .await?;
                Outcome::Loaded {
                    value: serde_json::to_value(versions)?,
                }
            }
        };
        Ok(outcome)
    }

    async fn object_version(
        &self,
        id: ObjectId,
        version_id: Option<VersionId>,
    ) -> anyhow::Result<VersionId> {
        if let Some(version_id) = version_id {
            return Ok(version_id);
        }
        let latest = self
            .store
            .get_object_latest_version(id)
            .await?
            .ok_or_else(|| VStoreError::NotFound(format!("object {id}")))?;
        Ok(latest.version_id)
    }

    fn pin_template(&self, mut descriptor: ObjectDescriptor) -> anyhow::Result<ObjectDescriptor> {
        if descriptor.template_version_id.is_unset() && descriptor.template_id != 0 {
            descriptor.template_version_id = self
                .store
                .get_template_latest_version(descriptor.template_id)?
                .version_id;
        }
        Ok(descriptor)
    }
}

pub fn load_script(path: &Path) -> anyhow::Result<Script> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing script {}", path.display()))
}
