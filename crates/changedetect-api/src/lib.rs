// changedetect-api: Async Rust client for the changedetection.io REST API (v1)

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

mod notifications;
mod system;
mod tags;
mod watches;

pub use client::{ChangeDetectionClient, Payload};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    CreateTagRequest, CreateWatchRequest, DiffFormat, DiffOptions, FetchBackend, HttpMethod,
    ImportOptions, Processor, SystemInfo, Tag, TimeBetweenCheck, UpdateTagRequest,
    UpdateWatchRequest, Watch,
};
