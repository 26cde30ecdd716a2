use crate::records::{
    BuildRecord,
    JobRecord,
    ProjectRecord,
};
use eyre::{
    eyre,
    Result,
    WrapErr as _,
};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Read-only access to the records stored by the Brigade platform.
pub trait Store: Send + Sync {
    fn list_projects(&self) -> BoxFuture<'_, Result<Vec<ProjectRecord>>>;

    fn list_builds(&self) -> BoxFuture<'_, Result<Vec<BuildRecord>>>;

    fn list_jobs<'a>(&'a self, build: &'a BuildRecord) -> BoxFuture<'a, Result<Vec<JobRecord>>>;
}

/// [`Store`] backed by the Brigade API server.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    api_url: Url,
}

impl HttpStore {
    /// Every request, from connecting to reading the body, fails after `request_timeout`.
    pub fn new(api_url: Url, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .wrap_err("Failed to build the Brigade API client")?;
        Ok(Self::with_client(client, api_url))
    }

    pub fn with_client(client: reqwest::Client, api_url: Url) -> Self {
        Self { client, api_url }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| eyre!("Brigade API URL {} cannot be used as a base", self.api_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        trace!(%url, "requesting Brigade API");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .wrap_err_with(|| format!("Request to {url} failed"))?
            .error_for_status()
            .wrap_err_with(|| format!("Request to {url} was rejected"))?;
        response
            .json()
            .await
            .wrap_err_with(|| format!("Failed to decode the response of {url}"))
    }
}

impl Store for HttpStore {
    fn list_projects(&self) -> BoxFuture<'_, Result<Vec<ProjectRecord>>> {
        Box::pin(self.get::<Vec<ProjectRecord>>(&["v1", "projects"]))
    }

    fn list_builds(&self) -> BoxFuture<'_, Result<Vec<BuildRecord>>> {
        Box::pin(self.get::<Vec<BuildRecord>>(&["v1", "builds"]))
    }

    fn list_jobs<'a>(&'a self, build: &'a BuildRecord) -> BoxFuture<'a, Result<Vec<JobRecord>>> {
        Box::pin(async move { self.get::<Vec<JobRecord>>(&["v1", "build", build.id.as_str(), "jobs"]).await })
    }
}
