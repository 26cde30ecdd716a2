use crate::records::{
    BuildRecord,
    JobRecord,
    ProjectRecord,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// State a build worker or a job reports.
#[derive(Debug, Default, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repository: String,
    pub namespace: String,
    /// Worker image reference, empty when the project has no worker configured.
    pub worker: String,
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        Self {
            worker: record.worker.as_ref().map(|w| w.reference()).unwrap_or_default(),
            id: record.id,
            name: record.name,
            repository: record.repo.name,
            namespace: record.kubernetes.namespace,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Build {
    pub id: String,
    pub project_id: String,
    pub event_type: String,
    pub provider: String,
    pub version: String,
    pub status: Status,
    pub duration: Duration,
}

impl From<BuildRecord> for Build {
    fn from(record: BuildRecord) -> Self {
        let (status, duration) = match &record.worker {
            Some(worker) => (
                worker.status,
                finished_duration(worker.status, worker.start_time, worker.end_time),
            ),
            None => (Status::Unknown, Duration::ZERO),
        };

        Self {
            id: record.id,
            project_id: record.project_id,
            event_type: record.event_type,
            provider: record.provider,
            version: record.revision.map(|r| r.commit).unwrap_or_default(),
            status,
            duration,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    pub id: String,
    pub build_id: String,
    pub name: String,
    pub image: String,
    pub status: Status,
    pub duration: Duration,
    pub creation: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
}

impl Job {
    pub fn from_record(build_id: impl Into<String>, record: JobRecord) -> Self {
        Self {
            duration: finished_duration(record.status, record.start_time, record.end_time),
            id: record.id,
            build_id: build_id.into(),
            name: record.name,
            image: record.image,
            status: record.status,
            creation: record.create_time,
            start: record.start_time,
        }
    }
}

/// Time between `start` and `end` once `status` is terminal, zero otherwise.
/// Negative spans (clock skew, bad data) are clamped to zero.
pub fn finished_duration(status: Status, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Duration {
    if !status.is_terminal() {
        return Duration::ZERO;
    }
    match (start, end) {
        (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
        _ => Duration::ZERO,
    }
}
