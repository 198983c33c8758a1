//! Data models for requests, their ownership hierarchy and execution results.
//!
//! These are the records the persistence layer stores and the importers
//! produce.

pub mod request;
pub mod response;
pub mod workspace;

pub use request::{find_enabled, BodyType, HttpMethod, KeyValue, Request, RequestBody};
pub use response::ExecutionResult;
pub use workspace::{Collection, Folder, Workspace};
