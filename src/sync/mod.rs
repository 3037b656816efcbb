//! Sync module: remote store transports and the reconciliation engine.
//!
//! - `RemoteStore` trait (`remote`)
//! - HTTP transport (`http`) and in-memory store (`memory`)
//! - `SyncEngine` with per-record outcomes (`engine`)

pub mod engine;
pub mod http;
pub mod memory;
pub mod remote;

pub use engine::{RecordOutcome, SyncEngine, SyncOutcome, SyncReport};
pub use http::HttpRemoteStore;
pub use memory::InMemoryRemoteStore;
pub use remote::RemoteStore;
