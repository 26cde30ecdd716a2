//! Fixtures shared by the collector tests.

use crate::{
    sample::Sample,
    sink::{
        SampleSender,
        SampleSink,
        WorkingWindow,
    },
    Subcollector,
};
use brigade_exporter_service::{
    Build,
    Job,
    Project,
    Service,
    Status,
};
use chrono::{
    DateTime,
    Duration as ChronoDuration,
    TimeZone,
    Utc,
};
use eyre::{
    eyre,
    Result,
};
use futures::{
    future::BoxFuture,
    StreamExt,
};
use std::time::Duration;

pub(crate) fn t1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 6, 2, 10, 0, 0).unwrap()
}

pub(crate) fn t2() -> DateTime<Utc> {
    t1() + ChronoDuration::seconds(265)
}

pub(crate) fn t3() -> DateTime<Utc> {
    t2() + ChronoDuration::minutes(12)
}

pub(crate) fn t4() -> DateTime<Utc> {
    t3() + ChronoDuration::hours(1)
}

pub(crate) fn test_projects() -> Vec<Project> {
    (1..=3)
        .map(|i| Project {
            id: format!("id{i}"),
            name: format!("Name{i}"),
            repository: format!("repo{i}"),
            namespace: format!("ns{i}"),
            worker: format!("worker{i}"),
        })
        .collect()
}

pub(crate) fn test_builds() -> Vec<Build> {
    vec![
        Build {
            id: "id1".into(),
            project_id: "prj1".into(),
            event_type: "push".into(),
            provider: "gitlab".into(),
            version: "1234567890".into(),
            status: Status::Running,
            duration: Duration::ZERO,
        },
        Build {
            id: "id2".into(),
            project_id: "prj2".into(),
            event_type: "pull_request".into(),
            provider: "github".into(),
            version: "1234567891".into(),
            status: Status::Pending,
            duration: Duration::ZERO,
        },
        Build {
            id: "id3".into(),
            project_id: "prj3".into(),
            event_type: "deploy".into(),
            provider: "toilet".into(),
            version: "1234567892".into(),
            status: Status::Failed,
            duration: Duration::from_secs(18),
        },
    ]
}

pub(crate) fn test_jobs() -> Vec<Job> {
    vec![
        Job {
            id: "id1".into(),
            build_id: "bld1".into(),
            name: "id-name-1".into(),
            image: "image1".into(),
            status: Status::Running,
            duration: Duration::ZERO,
            creation: Some(t1()),
            start: Some(t2()),
        },
        Job {
            id: "id2".into(),
            build_id: "bld2".into(),
            name: "id-name-2".into(),
            image: "image2".into(),
            status: Status::Pending,
            duration: Duration::ZERO,
            creation: Some(t3()),
            start: None,
        },
        Job {
            id: "id3".into(),
            build_id: "bld3".into(),
            name: "id-name-3".into(),
            image: "image3".into(),
            status: Status::Failed,
            duration: Duration::from_secs(18),
            creation: None,
            start: Some(t4()),
        },
    ]
}

/// Service answering with fixed data, optionally slow or broken.
#[derive(Debug, Clone)]
pub(crate) struct StaticService {
    pub projects: Vec<Project>,
    pub builds: Vec<Build>,
    pub jobs: Vec<Job>,
    pub failing: bool,
    pub delay: Duration,
}

impl Default for StaticService {
    fn default() -> Self {
        Self {
            projects: test_projects(),
            builds: test_builds(),
            jobs: test_jobs(),
            failing: false,
            delay: Duration::ZERO,
        }
    }
}

impl StaticService {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    async fn answer<T: Clone>(&self, data: &[T]) -> Result<Vec<T>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing {
            return Err(eyre!("brigade API unavailable"));
        }
        Ok(data.to_vec())
    }
}

impl Service for StaticService {
    fn get_projects(&self) -> BoxFuture<'_, Result<Vec<Project>>> {
        Box::pin(self.answer(&self.projects))
    }

    fn get_builds(&self) -> BoxFuture<'_, Result<Vec<Build>>> {
        Box::pin(self.answer(&self.builds))
    }

    fn get_jobs(&self) -> BoxFuture<'_, Result<Vec<Job>>> {
        Box::pin(self.answer(&self.jobs))
    }
}

/// Runs a single subcollector against a fresh sink and returns its outcome
/// together with the rendered samples, in emission order.
pub(crate) async fn run_subcollector(subcollector: &dyn Subcollector) -> (Result<()>, Vec<String>) {
    let (sink, stream) = SampleSink::channel();
    let sender = SampleSender::new(sink.clone(), WorkingWindow::new(Duration::from_secs(10)));
    let result = subcollector.collect(&sender).await;
    sink.close();
    let lines = stream.map(|sample| render_line(&sample)).collect().await;
    (result, lines)
}

/// One exposition line, labels sorted by name.
pub(crate) fn render_line(sample: &Sample) -> String {
    let mut labels: Vec<_> = sample.labels().collect();
    labels.sort_by_key(|(name, _)| *name);
    let labels: Vec<_> = labels
        .into_iter()
        .map(|(name, value)| format!("{name}=\"{}\"", value.replace('\\', r"\\").replace('"', r#"\""#)))
        .collect();
    if labels.is_empty() {
        format!("{} {}", sample.name(), sample.value())
    } else {
        format!("{}{{{}}} {}", sample.name(), labels.join(","), sample.value())
    }
}

pub(crate) fn rendered(samples: &[Sample]) -> Vec<String> {
    samples.iter().map(render_line).collect()
}

pub(crate) fn unix(time: DateTime<Utc>) -> String {
    time.timestamp().to_string()
}
