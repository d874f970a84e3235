//! `heyrs`: an HTTP load-generation engine.
//!
//! The binary entrypoint (`main.rs`) and its CLI layer are thin collaborators
//! around the engine exposed here — everything in this crate is usable
//! without `clap` in the picture, which is what the integration tests do.

pub mod aggregator;
pub mod controller;
pub mod errors;
pub mod limiter;
pub mod plan;
pub mod reporter;
pub mod request;
pub mod result;
pub mod snapshot;
pub mod timing;
pub mod transport;
pub mod worker;

pub use controller::run;
pub use plan::{Budget, OutputMode, Plan, TransportOptions};
pub use request::{BuiltRequest, Canonical, RequestFactory, StaticRequestFactory, TemplatedRequestFactory};
pub use result::RequestResult;
pub use snapshot::Snapshot;
