//! # Brigade service
//!
//! Read access to a Brigade installation for the exporter.
//!
//! - **`records`**: the shapes the Brigade API returns
//! - **`store`**: the [`Store`] contract plus the HTTP implementation talking to the API server
//! - **`fake`**: a [`Store`] with made up data, for running without a cluster
//! - **`model`**: the projects, builds and jobs metrics are derived from
//! - **`brigade`**: the [`Service`] that turns store records into the model, expanding builds into their jobs

#[macro_use]
extern crate tracing;

pub mod brigade;
pub mod fake;
pub mod model;
pub mod records;
pub mod store;

pub use brigade::{
    Brigade,
    Service,
};
pub use fake::FakeStore;
pub use model::{
    Build,
    Job,
    Project,
    Status,
};
pub use store::{
    HttpStore,
    Store,
};
