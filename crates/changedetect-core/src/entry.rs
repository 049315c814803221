// ── Entry lifecycle ──
//
// Setup and teardown of configured connections. Handles for each entry
// live in an `EntryRegistry` that the host owns and passes in; there is
// no process-wide registry.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use changedetect_api::{ChangeDetectionClient, SystemInfo};

use crate::config::{DEFAULT_SCAN_INTERVAL, EntryConfig, EntryOptions};
use crate::coordinator::{Coordinator, PollScope};
use crate::entity::{self, DEFAULT_NAME, DeviceInfo, EntityState};
use crate::error::CoreError;
use crate::service::ServiceDispatcher;

// ── Registry ─────────────────────────────────────────────────────

/// Everything a running entry needs, cheap to clone.
#[derive(Clone)]
pub struct EntryHandles {
    pub entry_id: String,
    pub config: EntryConfig,
    pub client: ChangeDetectionClient,
    pub coordinator: Coordinator,
    pub services: ServiceDispatcher,
    pub device: DeviceInfo,
}

impl EntryHandles {
    pub fn unique_id(&self) -> String {
        self.config.unique_id()
    }

    /// Current entity states for this entry.
    pub fn entities(&self) -> Vec<EntityState> {
        entity::render_current(&self.coordinator)
    }
}

/// Per-entry handles keyed by entry id.
#[derive(Clone, Default)]
pub struct EntryRegistry {
    entries: Arc<DashMap<String, EntryHandles>>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entry_id: &str) -> Option<EntryHandles> {
        self.entries.get(entry_id).map(|e| e.value().clone())
    }

    /// Look up an entry, failing with [`CoreError::EntryNotFound`].
    pub fn require(&self, entry_id: &str) -> Result<EntryHandles, CoreError> {
        self.get(entry_id).ok_or_else(|| CoreError::EntryNotFound {
            entry_id: entry_id.to_owned(),
        })
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.entries.contains_key(entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Entry id already configured for an instance, if any.
    pub fn find_by_unique_id(&self, unique_id: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.value().unique_id() == unique_id)
            .map(|e| e.key().clone())
    }
}

// ── Client construction ──────────────────────────────────────────

fn build_client(
    config: &EntryConfig,
    http: Option<reqwest::Client>,
) -> Result<ChangeDetectionClient, CoreError> {
    let client = match http {
        Some(http) => {
            ChangeDetectionClient::with_client(http, config.base_url.as_str(), &config.api_key)?
                .with_timeout(config.timeout)
        }
        None => ChangeDetectionClient::new(
            config.base_url.as_str(),
            &config.api_key,
            &config.transport(),
        )?,
    };
    Ok(client)
}

fn effective_interval(requested: Duration) -> Duration {
    if requested.is_zero() {
        DEFAULT_SCAN_INTERVAL
    } else {
        requested
    }
}

fn build_coordinator(config: &EntryConfig, client: ChangeDetectionClient) -> Coordinator {
    Coordinator::new(
        client,
        effective_interval(config.scan_interval),
        PollScope {
            tags: config.fetch_tags,
            notifications: config.fetch_notifications,
        },
    )
}

// ── Setup / unload ───────────────────────────────────────────────

/// Set up an entry: build the client and coordinator, run the first poll,
/// register the handles and start polling.
///
/// If the first poll fails nothing is registered and no entities exist.
/// `http` lets the host share its own session; `None` builds one from the
/// entry's transport settings.
pub async fn setup_entry(
    registry: &EntryRegistry,
    entry_id: &str,
    config: EntryConfig,
    http: Option<reqwest::Client>,
) -> Result<Vec<EntityState>, CoreError> {
    if registry.contains(entry_id) {
        return Err(CoreError::AlreadyConfigured {
            unique_id: entry_id.to_owned(),
        });
    }

    let client = build_client(&config, http)?;
    let coordinator = build_coordinator(&config, client.clone());
    let snapshot = coordinator.first_refresh().await?;

    let device = DeviceInfo::for_entry(entry_id, config.base_url.as_str(), Some(&snapshot));
    let handles = EntryHandles {
        entry_id: entry_id.to_owned(),
        services: ServiceDispatcher::new(coordinator.clone()),
        client,
        coordinator: coordinator.clone(),
        device,
        config,
    };
    let entities = handles.entities();

    // Another setup for the same id may have finished while this one polled.
    let claimed = match registry.entries.entry(entry_id.to_owned()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(handles);
            true
        }
    };
    if !claimed {
        coordinator.shutdown().await;
        return Err(CoreError::AlreadyConfigured {
            unique_id: entry_id.to_owned(),
        });
    }
    coordinator.start().await;

    info!(
        entry_id,
        watches = snapshot.watch_count(),
        entities = entities.len(),
        "entry set up"
    );
    Ok(entities)
}

/// Stop polling and drop the entry's handles.
pub async fn unload_entry(registry: &EntryRegistry, entry_id: &str) -> Result<(), CoreError> {
    let (_, handles) =
        registry
            .entries
            .remove(entry_id)
            .ok_or_else(|| CoreError::EntryNotFound {
                entry_id: entry_id.to_owned(),
            })?;
    handles.coordinator.shutdown().await;
    info!(entry_id, "entry unloaded");
    Ok(())
}

/// Apply changed options. A new poll interval rebuilds the coordinator;
/// the old one keeps running if the new one cannot complete its first poll.
/// Fails with [`CoreError::EntryNotFound`] if the entry is unloaded or
/// replaced meanwhile. Event subscribers carry over to the new dispatcher.
pub async fn update_options(
    registry: &EntryRegistry,
    entry_id: &str,
    options: EntryOptions,
) -> Result<(), CoreError> {
    let current = registry.require(entry_id)?;
    if effective_interval(options.scan_interval) == current.coordinator.scan_interval() {
        debug!(entry_id, "options unchanged");
        return Ok(());
    }

    let mut config = current.config.clone();
    config.scan_interval = options.scan_interval;
    let coordinator = build_coordinator(&config, current.client.clone());
    if let Err(e) = coordinator.first_refresh().await {
        warn!(entry_id, error = %e, "keeping previous coordinator");
        return Err(e);
    }

    // The entry may have been unloaded or replaced during the first poll.
    let replaced = match registry.entries.get_mut(entry_id) {
        Some(mut handles) if handles.coordinator.ptr_eq(&current.coordinator) => {
            handles.services = current.services.with_coordinator(coordinator.clone());
            handles.coordinator = coordinator.clone();
            handles.config = config;
            true
        }
        _ => false,
    };
    if !replaced {
        coordinator.shutdown().await;
        return Err(CoreError::EntryNotFound {
            entry_id: entry_id.to_owned(),
        });
    }
    current.coordinator.shutdown().await;
    coordinator.start().await;

    info!(
        entry_id,
        interval_secs = coordinator.scan_interval().as_secs(),
        "entry options updated"
    );
    Ok(())
}

// ── Config flow ──────────────────────────────────────────────────

/// Result of a successful connection check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    /// Entry title, e.g. `ChangeDetection.io (12 watches)`.
    pub title: String,
    pub unique_id: String,
    pub systeminfo: SystemInfo,
}

/// Check that the instance answers with the given credentials.
pub async fn validate_connection(
    config: &EntryConfig,
    http: Option<reqwest::Client>,
) -> Result<ConnectionInfo, CoreError> {
    let client = build_client(config, http)?;
    let systeminfo = client.systeminfo().await?;
    let title = format!(
        "{DEFAULT_NAME} ({} watches)",
        systeminfo.watch_count.unwrap_or(0)
    );
    Ok(ConnectionInfo {
        title,
        unique_id: config.unique_id(),
        systeminfo,
    })
}

/// Interactive setup step: reject instances that are already configured,
/// then validate the connection.
pub async fn config_flow(
    registry: &EntryRegistry,
    config: &EntryConfig,
    http: Option<reqwest::Client>,
) -> Result<ConnectionInfo, CoreError> {
    let unique_id = config.unique_id();
    if registry.find_by_unique_id(&unique_id).is_some() {
        return Err(CoreError::AlreadyConfigured { unique_id });
    }
    validate_connection(config, http).await
}

/// Form error key for a failed flow step.
pub fn flow_error_key(err: &CoreError) -> &'static str {
    match err {
        CoreError::AlreadyConfigured { .. } => "already_configured",
        CoreError::Api(e) if e.is_auth_error() => "invalid_auth",
        CoreError::Api(_) => "cannot_connect",
        _ => "unknown",
    }
}
