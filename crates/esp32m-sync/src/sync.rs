//! Configuration sync between a local editor and a remote device.
//!
//! The device sends full states; local edits go back as diffs. A diff is
//! kept pending until the transport reports that the device accepted or
//! rejected it, and only an accepted diff changes the last known state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use esp32m_core::{ConfigError, ConfigStorage, Diff, Schema, StructCodec, StructError};

use crate::debounce::Debouncer;
use crate::rate_limiter::RateLimiter;

/// Configuration for [`ConfigSync`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Minimum spacing between diffs handed to the transport.
    #[serde(with = "millis")]
    pub send_interval: Duration,
    /// Capacity of the event channel.
    pub channel_capacity: usize,
    /// Quiet period before a deferred edit is diffed and sent.
    #[serde(with = "millis")]
    pub edit_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(100),
            channel_capacity: 64,
            edit_delay: Duration::from_millis(300),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// A diff ready to be sent to the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingDiff {
    pub request_id: Uuid,
    /// Configuration section the diff applies to.
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Wire-encoded diff.
    pub diff: Value,
}

/// Events produced for the transport and the UI.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The last known state of a section changed.
    StateUpdated {
        name: String,
        state: Map<String, Value>,
    },
    /// A diff should be sent to the device.
    DiffReady(OutgoingDiff),
}

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unknown config section: {0}")]
    UnknownSection(String),

    #[error("No state received for config section: {0}")]
    NoState(String),

    #[error("Unknown request: {0}")]
    UnknownRequest(Uuid),

    #[error("Codec error: {0}")]
    Codec(#[from] StructError),

    #[error("Storage error: {0}")]
    Storage(#[from] ConfigError),

    #[error("Event channel closed")]
    ChannelClosed,
}

struct Section {
    codec: StructCodec,
    last_known: Option<Map<String, Value>>,
}

struct PendingDiff {
    name: String,
    diff: Diff,
}

struct Inner {
    storage: Arc<dyn ConfigStorage>,
    sections: RwLock<HashMap<String, Section>>,
    pending: RwLock<HashMap<Uuid, PendingDiff>>,
    events: mpsc::Sender<SyncEvent>,
    limiter: RateLimiter,
    edit_delay: Duration,
    /// Deferred edits, one debouncer per section.
    deferred: Mutex<HashMap<String, Debouncer>>,
}

/// Handle to the sync state. Cheap to clone.
#[derive(Clone)]
pub struct ConfigSync {
    inner: Arc<Inner>,
}

impl ConfigSync {
    /// Create a sync handle and the receiver for its events.
    pub fn new(
        config: SyncConfig,
        storage: Arc<dyn ConfigStorage>,
    ) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (events, rx) = mpsc::channel(config.channel_capacity.max(1));
        let inner = Inner {
            storage,
            sections: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
            events,
            limiter: RateLimiter::new(config.send_interval),
            edit_delay: config.edit_delay,
            deferred: Mutex::new(HashMap::new()),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    /// Attach a schema to a configuration section.
    ///
    /// A previously persisted state for the section becomes its last known
    /// state. Registering a name again replaces the schema and reloads.
    pub async fn register(&self, name: &str, schema: Schema) -> Result<(), SyncError> {
        let codec = StructCodec::new(schema);
        let last_known = if self.inner.storage.has(name) {
            let stored = self.inner.storage.load(name)?;
            Some(codec.unfold(&stored)?)
        } else {
            None
        };

        debug!(
            "Registered config section {} (persisted state: {})",
            name,
            last_known.is_some()
        );
        self.inner
            .sections
            .write()
            .await
            .insert(name.to_string(), Section { codec, last_known });
        Ok(())
    }

    /// Record a full state reported by the device.
    pub async fn receive_state(
        &self,
        name: &str,
        state: &Value,
    ) -> Result<Map<String, Value>, SyncError> {
        let unfolded = {
            let mut sections = self.inner.sections.write().await;
            let section = sections
                .get_mut(name)
                .ok_or_else(|| SyncError::UnknownSection(name.to_string()))?;
            let unfolded = section.codec.unfold(state)?;
            section.last_known = Some(unfolded.clone());
            unfolded
        };

        self.inner
            .storage
            .save(name, &Value::Object(unfolded.clone()))?;
        debug!("Received state for {}", name);
        self.emit(SyncEvent::StateUpdated {
            name: name.to_string(),
            state: unfolded.clone(),
        })
        .await?;
        Ok(unfolded)
    }

    /// Turn a local edit into a diff for the device.
    ///
    /// Returns `None` when the edit does not change anything.
    pub async fn edit(&self, name: &str, edited: &Value) -> Result<Option<Uuid>, SyncError> {
        let outgoing = {
            let sections = self.inner.sections.read().await;
            let section = sections
                .get(name)
                .ok_or_else(|| SyncError::UnknownSection(name.to_string()))?;
            let last_known = section
                .last_known
                .as_ref()
                .ok_or_else(|| SyncError::NoState(name.to_string()))?;

            let diff = section.codec.diff(last_known, edited)?;
            if diff.is_empty() {
                debug!("Edit of {} changes nothing", name);
                return Ok(None);
            }

            let outgoing = OutgoingDiff {
                request_id: Uuid::new_v4(),
                name: name.to_string(),
                timestamp: Utc::now(),
                diff: section.codec.encode_diff(&diff),
            };
            self.inner.pending.write().await.insert(
                outgoing.request_id,
                PendingDiff {
                    name: name.to_string(),
                    diff,
                },
            );
            outgoing
        };

        let request_id = outgoing.request_id;
        info!("Sending diff {} for {}: {}", request_id, name, outgoing.diff);
        let sent = self
            .inner
            .limiter
            .invoke(|| self.emit(SyncEvent::DiffReady(outgoing)))
            .await;
        if let Err(e) = sent {
            self.inner.pending.write().await.remove(&request_id);
            return Err(e);
        }
        Ok(Some(request_id))
    }

    /// The device accepted a diff: apply it and persist the result.
    pub async fn acknowledge(&self, request_id: Uuid) -> Result<Map<String, Value>, SyncError> {
        let pending = self.take_pending(request_id).await?;

        let patched = {
            let mut sections = self.inner.sections.write().await;
            let section = sections
                .get_mut(&pending.name)
                .ok_or_else(|| SyncError::UnknownSection(pending.name.clone()))?;
            let base = section
                .last_known
                .as_ref()
                .ok_or_else(|| SyncError::NoState(pending.name.clone()))?;
            let patched = section.codec.apply_diff(base, &pending.diff)?;
            section.last_known = Some(patched.clone());
            patched
        };

        self.inner
            .storage
            .save(&pending.name, &Value::Object(patched.clone()))?;
        info!("Diff {} applied to {}", request_id, pending.name);
        self.emit(SyncEvent::StateUpdated {
            name: pending.name,
            state: patched.clone(),
        })
        .await?;
        Ok(patched)
    }

    /// The device rejected a diff: drop it.
    pub async fn reject(&self, request_id: Uuid) -> Result<(), SyncError> {
        let pending = self.take_pending(request_id).await?;
        warn!("Diff {} for {} rejected by device", request_id, pending.name);
        Ok(())
    }

    /// Coalesce a burst of edits: only the last edit of a section made
    /// within `edit_delay` is diffed and sent.
    ///
    /// Failures are logged. Must be called from within a tokio runtime.
    pub fn edit_deferred(&self, name: &str, edited: Value) {
        let sync = self.clone();
        let section = name.to_string();
        let task = async move {
            match sync.edit(&section, &edited).await {
                Ok(Some(request_id)) => debug!("Deferred edit of {} sent as {}", section, request_id),
                Ok(None) => {}
                Err(e) => warn!("Deferred edit of {} failed: {}", section, e),
            }
        };

        let mut deferred = self
            .inner
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        deferred
            .entry(name.to_string())
            .or_insert_with(|| Debouncer::new(self.inner.edit_delay))
            .call(task);
    }

    /// Whether a deferred edit of `name` is still waiting.
    pub fn has_deferred_edit(&self, name: &str) -> bool {
        self.inner
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .is_some_and(Debouncer::is_pending)
    }

    pub async fn last_known(&self, name: &str) -> Option<Map<String, Value>> {
        self.inner
            .sections
            .read()
            .await
            .get(name)
            .and_then(|s| s.last_known.clone())
    }

    /// Number of diffs awaiting a device response.
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.read().await.len()
    }

    /// Names of registered sections, sorted.
    pub async fn sections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.sections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn take_pending(&self, request_id: Uuid) -> Result<PendingDiff, SyncError> {
        self.inner
            .pending
            .write()
            .await
            .remove(&request_id)
            .ok_or(SyncError::UnknownRequest(request_id))
    }

    async fn emit(&self, event: SyncEvent) -> Result<(), SyncError> {
        self.inner
            .events
            .send(event)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esp32m_core::MemoryConfigStorage;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_json(&json!([["ssid"], ["pass"], ["ip", [["addr"], ["mask"]]]])).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.send_interval, Duration::from_millis(100));
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.edit_delay, Duration::from_millis(300));
    }

    #[test]
    fn test_config_serde() {
        let config: SyncConfig =
            serde_json::from_value(json!({ "sendInterval": 250, "channelCapacity": 8, "editDelay": 50 }))
                .unwrap();
        assert_eq!(config.send_interval, Duration::from_millis(250));
        assert_eq!(config.edit_delay, Duration::from_millis(50));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({ "sendInterval": 250, "channelCapacity": 8, "editDelay": 50 })
        );
    }

    #[test]
    fn test_outgoing_diff_serializes_camel_case() {
        let outgoing = OutgoingDiff {
            request_id: Uuid::nil(),
            name: "wifi".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            diff: json!({ "0": "home" }),
        };
        let value = serde_json::to_value(&outgoing).unwrap();
        assert_eq!(value["requestId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(value["diff"], json!({ "0": "home" }));
    }

    #[tokio::test]
    async fn test_register_loads_persisted_state() {
        let storage = Arc::new(MemoryConfigStorage::new());
        storage
            .save("wifi", &json!({ "ssid": "home", "junk": 1 }))
            .unwrap();

        let (sync, _rx) = ConfigSync::new(SyncConfig::default(), storage);
        sync.register("wifi", schema()).await.unwrap();

        let state = sync.last_known("wifi").await.unwrap();
        assert_eq!(Value::Object(state), json!({ "ssid": "home" }));
        assert_eq!(sync.sections().await, vec!["wifi"]);
    }

    #[tokio::test]
    async fn test_unknown_section() {
        let storage = Arc::new(MemoryConfigStorage::new());
        let (sync, _rx) = ConfigSync::new(SyncConfig::default(), storage);

        let err = sync.receive_state("mqtt", &json!({})).await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownSection(name) if name == "mqtt"));
    }

    #[tokio::test]
    async fn test_edit_without_state() {
        let storage = Arc::new(MemoryConfigStorage::new());
        let (sync, _rx) = ConfigSync::new(SyncConfig::default(), storage);
        sync.register("wifi", schema()).await.unwrap();

        let err = sync.edit("wifi", &json!({ "ssid": "x" })).await.unwrap_err();
        assert!(matches!(err, SyncError::NoState(_)));
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let storage = Arc::new(MemoryConfigStorage::new());
        let (sync, _rx) = ConfigSync::new(SyncConfig::default(), storage);

        let id = Uuid::new_v4();
        assert!(matches!(
            sync.acknowledge(id).await,
            Err(SyncError::UnknownRequest(unknown)) if unknown == id
        ));
        assert!(matches!(sync.reject(id).await, Err(SyncError::UnknownRequest(_))));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let storage = Arc::new(MemoryConfigStorage::new());
        let (sync, rx) = ConfigSync::new(SyncConfig::default(), storage);
        sync.register("wifi", schema()).await.unwrap();
        drop(rx);

        let err = sync
            .receive_state("wifi", &json!({ "ssid": "home" }))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_nothing_pending() {
        let storage = Arc::new(MemoryConfigStorage::new());
        let (sync, mut rx) = ConfigSync::new(SyncConfig::default(), storage);
        sync.register("wifi", schema()).await.unwrap();
        sync.receive_state("wifi", &json!({ "ssid": "home" }))
            .await
            .unwrap();
        rx.recv().await.unwrap();
        drop(rx);

        let err = sync
            .edit("wifi", &json!({ "ssid": "office" }))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ChannelClosed));
        assert_eq!(sync.pending_count().await, 0);
    }
}
