//! Wire shapes returned by the Brigade API server.
//!
//! These are deliberately close to what the platform stores so that the
//! translation into [`crate::model`] types happens in a single place.

use crate::model::Status;
use chrono::{
    DateTime,
    Datelike,
    Utc,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub repo: RepoRecord,
    #[serde(default)]
    pub kubernetes: KubernetesRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerImageRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "cloneURL")]
    pub clone_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubernetesRecord {
    #[serde(default)]
    pub namespace: String,
}

/// Container image the project runs its worker with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerImageRecord {
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

impl WorkerImageRecord {
    /// `registry/name:tag`, leaving out the segments that are not set.
    /// Empty when no image name is configured.
    pub fn reference(&self) -> String {
        if self.name.is_empty() {
            return String::new();
        }
        let mut reference = String::new();
        if !self.registry.is_empty() {
            reference.push_str(self.registry.trim_end_matches('/'));
            reference.push('/');
        }
        reference.push_str(&self.name);
        if !self.tag.is_empty() {
            reference.push(':');
            reference.push_str(&self.tag);
        }
        reference
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: String,
    pub project_id: String,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    #[serde(default)]
    pub commit: String,
    #[serde(default, rename = "ref")]
    pub reference: String,
}

/// The worker pod that executed a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default, deserialize_with = "recorded_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "recorded_time")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "recorded_time")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "recorded_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "recorded_time")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Status,
}

/// The platform writes its zero time (`0001-01-01T00:00:00Z`) for timestamps
/// it never recorded, treat it the same as a missing value.
fn recorded_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let time = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(time.filter(|time| time.year() > 1))
}
