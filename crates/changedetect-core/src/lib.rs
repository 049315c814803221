// changedetect-core: Polling coordinator, entities and service calls on top of changedetect-api.

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod entry;
pub mod error;
pub mod service;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EntryConfig, EntryOptions, TlsVerification};
pub use coordinator::{Coordinator, PollScope, UpdateFailed};
pub use entity::{DOMAIN, DeviceInfo, EntityState, Platform, render, render_current};
pub use entry::{
    ConnectionInfo, EntryHandles, EntryRegistry, config_flow, flow_error_key, setup_entry,
    unload_entry, update_options, validate_connection,
};
pub use error::CoreError;
pub use service::{DomainEvent, Service, ServiceDispatcher};
pub use snapshot::{Snapshot, UpdateStatus};
