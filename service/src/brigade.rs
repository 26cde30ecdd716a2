use crate::{
    model::{
        Build,
        Job,
        Project,
    },
    store::Store,
};
use eyre::{
    Result,
    WrapErr as _,
};
use futures::future::{
    join_all,
    BoxFuture,
};
use std::sync::Arc;

/// Domain view of a Brigade installation, used by the metric collectors.
pub trait Service: Send + Sync {
    fn get_projects(&self) -> BoxFuture<'_, Result<Vec<Project>>>;

    fn get_builds(&self) -> BoxFuture<'_, Result<Vec<Build>>>;

    /// Jobs of every build. Ordering is unspecified.
    fn get_jobs(&self) -> BoxFuture<'_, Result<Vec<Job>>>;
}

/// [`Service`] that translates the records of a [`Store`].
#[derive(Clone)]
pub struct Brigade {
    store: Arc<dyn Store>,
}

impl Brigade {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        let records = self.store.list_projects().await.wrap_err("Failed to list projects")?;
        Ok(records.into_iter().map(Project::from).collect())
    }

    async fn builds(&self) -> Result<Vec<Build>> {
        let records = self.store.list_builds().await.wrap_err("Failed to list builds")?;
        Ok(records.into_iter().map(Build::from).collect())
    }

    /// Looks up the jobs of all builds concurrently, one task per build, and
    /// merges them. A build whose lookup fails contributes no jobs.
    ///
    /// The number of in-flight requests grows with the number of builds, there
    /// is no cap on it.
    async fn jobs(&self) -> Result<Vec<Job>> {
        let builds = self.store.list_builds().await.wrap_err("Failed to list builds")?;
        debug!(builds = builds.len(), "looking up jobs");

        let lookups = builds.into_iter().map(|build| {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                match store.list_jobs(&build).await {
                    Ok(records) => records
                        .into_iter()
                        .map(|record| Job::from_record(build.id.as_str(), record))
                        .collect(),
                    Err(err) => {
                        warn!(build_id = %build.id, "Failed to list jobs of build: {err:#}");
                        Vec::new()
                    }
                }
            })
        });

        let jobs = join_all(lookups)
            .await
            .into_iter()
            .flat_map(|lookup| {
                lookup.unwrap_or_else(|err| {
                    error!("Job lookup task did not complete: {err}");
                    Vec::new()
                })
            })
            .collect();
        Ok(jobs)
    }
}

impl Service for Brigade {
    fn get_projects(&self) -> BoxFuture<'_, Result<Vec<Project>>> {
        Box::pin(self.projects())
    }

    fn get_builds(&self) -> BoxFuture<'_, Result<Vec<Build>>> {
        Box::pin(self.builds())
    }

    fn get_jobs(&self) -> BoxFuture<'_, Result<Vec<Job>>> {
        Box::pin(self.jobs())
    }
}
