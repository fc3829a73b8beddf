//! Versioned snapshot documents and load-time normalisation.
//!
//! Current documents look like `{"version": 1, "items": [...]}`. A bare JSON
//! array is the version 0 layout written by the browser dashboard, whose
//! camera records used different field names; those are accepted through
//! serde aliases. Each stored record is normalised exactly once, into either
//! a fully typed value or a [`Discard`] with the reason it was dropped.

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::cameras::{
    new_camera_id, resolve_playback_url, CameraConfig, Credentials, DesiredState, StreamKind,
    DEFAULT_CHANNEL,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

pub const SNAPSHOT_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u64),

    #[error("document has neither a top-level array nor an 'items' array")]
    UnexpectedShape,
}

/// A stored record that could not be turned into a typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discard {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct LoadReport<T> {
    pub version: u64,
    pub records: Vec<T>,
    pub discarded: Vec<Discard>,
}

#[derive(Serialize)]
struct SnapshotOut<'a, T> {
    version: u64,
    items: &'a [T],
}

pub fn encode_snapshot<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string(&SnapshotOut {
        version: SNAPSHOT_VERSION,
        items,
    })?)
}

/// Splits a stored document into its version and raw records.
pub fn decode_document(raw: &str) -> Result<(u64, Vec<Value>), DocumentError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => Ok((0, items)),
        Value::Object(mut map) => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or(DocumentError::UnexpectedShape)?;
            if version != SNAPSHOT_VERSION {
                return Err(DocumentError::UnsupportedVersion(version));
            }
            match map.remove("items") {
                Some(Value::Array(items)) => Ok((version, items)),
                _ => Err(DocumentError::UnexpectedShape),
            }
        }
        _ => Err(DocumentError::UnexpectedShape),
    }
}

/// Camera record as found in storage: every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredCamera {
    id: Option<String>,
    name: Option<String>,
    location_tag: Option<String>,
    #[serde(alias = "ipAddress")]
    address: Option<String>,
    port: Option<u16>,
    #[serde(alias = "cameraChannel")]
    channel: Option<u32>,
    credentials: Option<Credentials>,
    username: Option<String>,
    password: Option<String>,
    #[serde(alias = "streamType")]
    stream_kind: Option<StreamKind>,
    #[serde(alias = "customRtspUrl")]
    custom_stream_url: Option<String>,
    #[serde(alias = "simulatedHlsUrl")]
    playback_url: Option<String>,
    #[serde(alias = "status")]
    desired_state: Option<String>,
    #[serde(alias = "motionDetectionSimulated")]
    motion_detection_enabled: Option<bool>,
    #[serde(alias = "isRecordingSimulated")]
    recording_enabled: Option<bool>,
    #[serde(alias = "lastChecked")]
    last_checked_at: Option<DateTime<Utc>>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StoredCamera {
    fn normalize(self, now: DateTime<Utc>) -> Result<CameraConfig, String> {
        let name = present(self.name).ok_or("missing name")?;
        let address = present(self.address).ok_or("missing address")?;
        let id = present(self.id).unwrap_or_else(new_camera_id);

        let stream_kind = self.stream_kind.unwrap_or_default();
        let port = match self.port {
            Some(p) if p != 0 => p,
            _ => stream_kind.default_port(),
        };
        let channel = match self.channel {
            Some(c) if c != 0 => c,
            _ => DEFAULT_CHANNEL,
        };

        // Legacy records kept username/password at the top level.
        let credentials = self
            .credentials
            .or_else(|| {
                present(self.username).map(|username| Credentials {
                    username,
                    password: self.password.unwrap_or_default(),
                })
            })
            .filter(|c| !c.username.trim().is_empty());

        let custom_stream_url = present(self.custom_stream_url);
        let playback_url = match present(self.playback_url) {
            Some(url) => url,
            None => resolve_playback_url(&id, custom_stream_url.as_deref()),
        };

        // The browser persisted the tile status here; only an explicit
        // "Online" means the operator wanted the camera live.
        let desired_state = match self.desired_state.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("online") => DesiredState::Online,
            _ => DesiredState::Offline,
        };

        Ok(CameraConfig {
            id,
            name,
            location_tag: present(self.location_tag),
            address,
            port,
            channel,
            credentials,
            stream_kind,
            custom_stream_url,
            playback_url,
            desired_state,
            motion_detection_enabled: self.motion_detection_enabled.unwrap_or(false),
            recording_enabled: self.recording_enabled.unwrap_or(false),
            last_checked_at: self.last_checked_at.unwrap_or(now),
        })
    }
}

/// Decodes and normalises a stored camera list. Records that cannot be
/// normalised, and later duplicates of an id, are reported as discarded.
pub fn load_cameras(raw: &str, now: DateTime<Utc>) -> Result<LoadReport<CameraConfig>, DocumentError> {
    let (version, items) = decode_document(raw)?;
    let mut records = Vec::with_capacity(items.len());
    let mut discarded = Vec::new();
    let mut seen = HashSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let normalized = serde_json::from_value::<StoredCamera>(item)
            .map_err(|e| e.to_string())
            .and_then(|stored| stored.normalize(now));

        match normalized {
            Ok(camera) if seen.insert(camera.id.clone()) => records.push(camera),
            Ok(camera) => discarded.push(Discard {
                index,
                reason: format!("duplicate id {}", camera.id),
            }),
            Err(reason) => discarded.push(Discard { index, reason }),
        }
    }

    Ok(LoadReport {
        version,
        records,
        discarded,
    })
}
