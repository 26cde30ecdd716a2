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
use eyre::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

const SUBSYSTEM: &str = "build";

/// Collects the metrics of Brigade builds.
pub struct BuildCollector {
    service: Arc<dyn Service>,
    info: Arc<Desc>,
    status: Arc<Desc>,
    duration: Arc<Desc>,
}

impl BuildCollector {
    pub fn new(service: Arc<dyn Service>) -> Result<Self> {
        Ok(Self {
            service,
            info: Arc::new(Desc::new(
                fq_name(NAMESPACE, SUBSYSTEM, "info"),
                "Brigade build information.",
                &["id", "project_id", "event_type", "provider", "version"],
            )?),
            status: Arc::new(Desc::new(
                fq_name(NAMESPACE, SUBSYSTEM, "status"),
                "Brigade build status.",
                &["id", "status"],
            )?),
            duration: Arc::new(Desc::new(
                fq_name(NAMESPACE, SUBSYSTEM, "duration_seconds"),
                "Brigade build duration in seconds.",
                &["id"],
            )?),
        })
    }

    async fn collect_builds(&self, sender: &SampleSender) -> Result<()> {
        let builds = self.service.get_builds().await?;
        trace!(builds = builds.len(), "collecting builds");

        for build in builds {
            sender.send(Sample::new(
                Arc::clone(&self.info),
                1.0,
                [
                    build.id.as_str(),
                    build.project_id.as_str(),
                    build.event_type.as_str(),
                    build.provider.as_str(),
                    build.version.as_str(),
                ],
            )?)?;
            sender.send(Sample::new(
                Arc::clone(&self.status),
                1.0,
                [build.id.clone(), build.status.to_string()],
            )?)?;
            // Unfinished builds report a zero duration rather than no sample.
            sender.send(Sample::new(
                Arc::clone(&self.duration),
                build.duration.as_secs_f64(),
                [build.id],
            )?)?;
        }

        Ok(())
    }
}

impl Subcollector for BuildCollector {
    fn collect<'a>(&'a self, sender: &'a SampleSender) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.collect_builds(sender))
    }
}
