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

const SUBSYSTEM: &str = "project";

/// Collects the metrics of Brigade projects.
pub struct ProjectCollector {
    service: Arc<dyn Service>,
    info: Arc<Desc>,
}

impl ProjectCollector {
    pub fn new(service: Arc<dyn Service>) -> Result<Self> {
        Ok(Self {
            service,
            info: Arc::new(Desc::new(
                fq_name(NAMESPACE, SUBSYSTEM, "info"),
                "Brigade project information.",
                &["id", "name", "repository", "namespace", "worker"],
            )?),
        })
    }

    async fn collect_projects(&self, sender: &SampleSender) -> Result<()> {
        let projects = self.service.get_projects().await?;
        trace!(projects = projects.len(), "collecting projects");

        for project in projects {
            sender.send(Sample::new(
                Arc::clone(&self.info),
                1.0,
                [
                    project.id,
                    project.name,
                    project.repository,
                    project.namespace,
                    project.worker,
                ],
            )?)?;
        }

        Ok(())
    }
}

impl Subcollector for ProjectCollector {
    fn collect<'a>(&'a self, sender: &'a SampleSender) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.collect_projects(sender))
    }
}
