use crate::{
    build::BuildCollector,
    job::JobCollector,
    project::ProjectCollector,
    sink::SampleSender,
};
use brigade_exporter_service::Service;
use eyre::Result;
use futures::future::BoxFuture;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Arc;
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// Produces the samples of one kind of Brigade entity during a cycle.
pub trait Subcollector: Send + Sync {
    /// Writes samples through `sender` as they are produced. Returns an error
    /// when the data could not be fetched or the sender refused a sample;
    /// samples written before that stay valid.
    fn collect<'a>(&'a self, sender: &'a SampleSender) -> BoxFuture<'a, Result<()>>;
}

#[derive(
    Debug, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubcollectorKind {
    Projects,
    Builds,
    Jobs,
}

impl SubcollectorKind {
    pub fn subcollector(self, service: Arc<dyn Service>) -> Result<Arc<dyn Subcollector>> {
        Ok(match self {
            SubcollectorKind::Projects => Arc::new(ProjectCollector::new(service)?),
            SubcollectorKind::Builds => Arc::new(BuildCollector::new(service)?),
            SubcollectorKind::Jobs => Arc::new(JobCollector::new(service)?),
        })
    }
}
