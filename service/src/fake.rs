use crate::{
    model::Status,
    records::{
        BuildRecord,
        JobRecord,
        KubernetesRecord,
        ProjectRecord,
        RepoRecord,
        RevisionRecord,
        WorkerImageRecord,
        WorkerRecord,
    },
    store::Store,
};
use chrono::{
    DateTime,
    Duration,
    Utc,
};
use eyre::{
    eyre,
    Result,
};
use futures::future::BoxFuture;

const PROJECTS: usize = 10;
const JOBS_PER_BUILD: usize = 2;
const STATUSES: [Status; 5] = [
    Status::Pending,
    Status::Running,
    Status::Succeeded,
    Status::Failed,
    Status::Unknown,
];

/// Store that makes up a small Brigade installation, for running the exporter
/// without a cluster.
#[derive(Debug, Clone)]
pub struct FakeStore {
    epoch: DateTime<Utc>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new(Utc::now() - Duration::hours(1))
    }
}

impl FakeStore {
    /// All generated timestamps are offsets from `epoch`.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self { epoch }
    }

    fn at(&self, seconds: usize) -> Option<DateTime<Utc>> {
        Some(self.epoch + Duration::seconds(seconds as i64))
    }

    fn projects(&self) -> Vec<ProjectRecord> {
        (0..PROJECTS)
            .map(|i| ProjectRecord {
                id: format!("id-{i}"),
                name: format!("project-{i}"),
                repo: RepoRecord {
                    name: format!("github.com/fake-exporter/project-{i}"),
                    clone_url: format!("https://github.com/fake-exporter/project-{i}.git"),
                },
                kubernetes: KubernetesRecord {
                    namespace: format!("ns{i}"),
                },
                worker: Some(WorkerImageRecord {
                    registry: String::new(),
                    name: format!("brigade-worker-{i}"),
                    tag: String::new(),
                }),
            })
            .collect()
    }

    fn builds(&self) -> Vec<BuildRecord> {
        (0..PROJECTS)
            .map(|i| {
                let status = STATUSES[i % STATUSES.len()];
                // Every fifth build never got a worker scheduled.
                let worker = (status != Status::Unknown).then(|| WorkerRecord {
                    id: format!("worker-{i}"),
                    build_id: format!("build-{i}"),
                    project_id: format!("id-{i}"),
                    start_time: self.at(i * 60),
                    end_time: status.is_terminal().then(|| i * 60 + 15 + i).and_then(|s| self.at(s)),
                    exit_code: (status == Status::Failed) as i32,
                    status,
                });
                BuildRecord {
                    id: format!("build-{i}"),
                    project_id: format!("id-{i}"),
                    event_type: if i % 2 == 0 { "push" } else { "pull_request" }.to_string(),
                    provider: "github".to_string(),
                    revision: Some(RevisionRecord {
                        commit: format!("{:040x}", i * 7919),
                        reference: "refs/heads/master".to_string(),
                    }),
                    worker,
                }
            })
            .collect()
    }

    fn jobs(&self, build: &BuildRecord) -> Result<Vec<JobRecord>> {
        let index: usize = build
            .id
            .strip_prefix("build-")
            .and_then(|i| i.parse().ok())
            .ok_or_else(|| eyre!("build {} does not exist", build.id))?;
        let status = build.worker.as_ref().map(|w| w.status).unwrap_or(Status::Pending);

        Ok((0..JOBS_PER_BUILD)
            .map(|j| {
                let created = index * 60 + j * 5;
                let started = (status != Status::Pending).then_some(created + 2);
                JobRecord {
                    id: format!("{}-job-{j}", build.id),
                    name: format!("job-{j}"),
                    image: format!("alpine:3.{j}"),
                    create_time: self.at(created),
                    start_time: started.and_then(|s| self.at(s)),
                    end_time: status.is_terminal().then(|| created + 10).and_then(|s| self.at(s)),
                    status,
                }
            })
            .collect())
    }
}

impl Store for FakeStore {
    fn list_projects(&self) -> BoxFuture<'_, Result<Vec<ProjectRecord>>> {
        Box::pin(async move { Ok(self.projects()) })
    }

    fn list_builds(&self) -> BoxFuture<'_, Result<Vec<BuildRecord>>> {
        Box::pin(async move { Ok(self.builds()) })
    }

    fn list_jobs<'a>(&'a self, build: &'a BuildRecord) -> BoxFuture<'a, Result<Vec<JobRecord>>> {
        Box::pin(async move { self.jobs(build) })
    }
}
