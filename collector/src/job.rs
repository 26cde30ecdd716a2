use crate::{
    collector::Subcollector,
    sample::{
        fq_name,
        Desc,
        Sample,
        NAMESPACE,
    },
    sink::SampleSender,
};
use brigade_exporter_service::Service;
use chrono::{
    DateTime,
    Utc,
};
use eyre::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

const SUBSYSTEM: &str = "job";

/// Collects the metrics of the jobs of every Brigade build.
pub struct JobCollector {
    service: Arc<dyn Service>,
    info: Arc<Desc>,
    status: Arc<Desc>,
    duration: Arc<Desc>,
    creation: Arc<Desc>,
    start: Arc<Desc>,
}

impl JobCollector {
    pub fn new(service: Arc<dyn Service>) -> Result<Self> {
        let desc = |name: &str, help: &str, labels: &[&'static str]| -> Result<Arc<Desc>> {
            Ok(Arc::new(Desc::new(fq_name(NAMESPACE, SUBSYSTEM, name), help, labels)?))
        };

        Ok(Self {
            service,
            info: desc("info", "Brigade job information.", &["id", "build_id", "name", "image"])?,
            status: desc("status", "Brigade job status.", &["id", "status"])?,
            duration: desc("duration_seconds", "Brigade job duration in seconds.", &["id"])?,
            creation: desc(
                "create_time_seconds",
                "Brigade job creation time in unix timestamp.",
                &["id"],
            )?,
            start: desc("start_time_seconds", "Brigade job start time in unix timestamp.", &["id"])?,
        })
    }

    async fn collect_jobs(&self, sender: &SampleSender) -> Result<()> {
        let jobs = self.service.get_jobs().await?;
        trace!(jobs = jobs.len(), "collecting jobs");

        for job in jobs {
            let id = job.id.as_str();
            sender.send(Sample::new(
                Arc::clone(&self.info),
                1.0,
                [id, job.build_id.as_str(), job.name.as_str(), job.image.as_str()],
            )?)?;
            sender.send(Sample::new(
                Arc::clone(&self.status),
                1.0,
                [id.to_string(), job.status.to_string()],
            )?)?;
            sender.send(Sample::new(
                Arc::clone(&self.duration),
                job.duration.as_secs_f64(),
                [id],
            )?)?;
            sender.send(Sample::new(Arc::clone(&self.creation), unix_seconds(job.creation), [id])?)?;
            sender.send(Sample::new(Arc::clone(&self.start), unix_seconds(job.start), [id])?)?;
        }

        Ok(())
    }
}

impl Subcollector for JobCollector {
    fn collect<'a>(&'a self, sender: &'a SampleSender) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.collect_jobs(sender))
    }
}

/// Seconds since the epoch, `0` when the time was never recorded.
fn unix_seconds(time: Option<DateTime<Utc>>) -> f64 {
    time.map_or(0.0, |time| time.timestamp() as f64)
}
