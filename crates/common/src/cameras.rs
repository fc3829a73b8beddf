use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base address of the stream gateway that republishes camera feeds as HLS.
pub const PLAYBACK_BASE_URL: &str = "https://streams.smart-building.local/live";

pub const DEFAULT_RTSP_PORT: u16 = 554;
pub const DEFAULT_MJPEG_PORT: u16 = 80;
pub const DEFAULT_CHANNEL: u32 = 1;

pub type CameraId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StreamKind {
    #[default]
    #[serde(rename = "RTSP")]
    Rtsp,
    #[serde(rename = "MJPEG")]
    Mjpeg,
}

impl StreamKind {
    pub fn default_port(&self) -> u16 {
        match self {
            StreamKind::Rtsp => DEFAULT_RTSP_PORT,
            StreamKind::Mjpeg => DEFAULT_MJPEG_PORT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Rtsp => "RTSP",
            StreamKind::Mjpeg => "MJPEG",
        }
    }
}

/// Operator intent for a camera, independent of whether playback succeeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DesiredState {
    Online,
    #[default]
    Offline,
}

impl DesiredState {
    pub fn toggled(self) -> Self {
        match self {
            DesiredState::Online => DesiredState::Offline,
            DesiredState::Offline => DesiredState::Online,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, DesiredState::Online)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    /// Persisted, never returned by the API; see [`CameraConfig::redacted`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub id: CameraId,
    pub name: String,
    pub location_tag: Option<String>,

    // Connection parameters
    pub address: String,
    pub port: u16,
    pub channel: u32,
    pub credentials: Option<Credentials>,
    pub stream_kind: StreamKind,
    pub custom_stream_url: Option<String>,
    pub playback_url: String,

    // Operator intent and feature toggles
    pub desired_state: DesiredState,
    pub motion_detection_enabled: bool,
    pub recording_enabled: bool,

    pub last_checked_at: DateTime<Utc>,
}

impl CameraConfig {
    /// Builds a fresh record from a draft, assigning a new id.
    pub fn from_draft(draft: CameraDraft, now: DateTime<Utc>) -> Self {
        let id = new_camera_id();
        let mut camera = Self {
            playback_url: String::new(),
            id,
            name: String::new(),
            location_tag: None,
            address: String::new(),
            port: 0,
            channel: DEFAULT_CHANNEL,
            credentials: None,
            stream_kind: StreamKind::default(),
            custom_stream_url: None,
            desired_state: DesiredState::Online,
            motion_detection_enabled: false,
            recording_enabled: false,
            last_checked_at: now,
        };
        camera.apply_draft(draft, now);
        camera
    }

    /// Replaces the editable fields, keeping id, intent and toggles.
    pub fn apply_draft(&mut self, draft: CameraDraft, now: DateTime<Utc>) {
        let draft = draft.normalized();
        self.name = draft.name;
        self.address = draft.address;
        self.port = draft.port;
        self.channel = draft.channel;
        // The edit form is filled from a redacted record; a blank password
        // for the same user keeps the stored one.
        let previous = self.credentials.take();
        self.credentials = draft.credentials.map(|mut c| {
            if c.password.is_empty() {
                if let Some(prev) = previous.filter(|p| p.username == c.username) {
                    c.password = prev.password;
                }
            }
            c
        });
        self.stream_kind = draft.stream_kind;
        self.custom_stream_url = draft.custom_stream_url;
        self.location_tag = draft.location_tag;
        self.playback_url = resolve_playback_url(&self.id, self.custom_stream_url.as_deref());
        self.last_checked_at = now;
    }

    /// Copy safe to hand out over the API: the password is cleared.
    pub fn redacted(&self) -> Self {
        let mut camera = self.clone();
        if let Some(c) = camera.credentials.as_mut() {
            c.password.clear();
        }
        camera
    }

    /// Device-side address shown on the tile card. Carries the user name
    /// but never the password.
    pub fn source_url(&self) -> String {
        if let Some(custom) = self.custom_stream_url.as_deref() {
            return custom.to_string();
        }

        let auth = match &self.credentials {
            Some(c) if !c.username.is_empty() => format!("{}@", c.username),
            _ => String::new(),
        };

        match self.stream_kind {
            StreamKind::Rtsp => format!(
                "rtsp://{}{}:{}/cam/realmonitor?channel={}&subtype=0",
                auth, self.address, self.port, self.channel
            ),
            StreamKind::Mjpeg => format!(
                "http://{}{}:{}/video?channel={}",
                auth, self.address, self.port, self.channel
            ),
        }
    }
}

/// Editable part of a camera record, as submitted by the add/edit form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CameraDraft {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub channel: u32,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub stream_kind: StreamKind,
    #[serde(default)]
    pub custom_stream_url: Option<String>,
    #[serde(default)]
    pub location_tag: Option<String>,
}

impl CameraDraft {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_custom_url(mut self, url: impl Into<String>) -> Self {
        self.custom_stream_url = Some(url.into());
        self
    }

    pub fn with_stream_kind(mut self, kind: StreamKind) -> Self {
        self.stream_kind = kind;
        self
    }

    /// Trims text fields, drops blank optionals and fills zero port/channel.
    pub fn normalized(self) -> Self {
        let port = if self.port == 0 {
            self.stream_kind.default_port()
        } else {
            self.port
        };
        let channel = if self.channel == 0 { DEFAULT_CHANNEL } else { self.channel };
        let credentials = self
            .credentials
            .filter(|c| !c.username.trim().is_empty());

        Self {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            port,
            channel,
            credentials,
            stream_kind: self.stream_kind,
            custom_stream_url: non_blank(self.custom_stream_url),
            location_tag: non_blank(self.location_tag),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn new_camera_id() -> CameraId {
    format!("ipcam_{}", Uuid::new_v4().simple())
}

/// Custom URL when given, otherwise the gateway manifest address for `id`.
pub fn resolve_playback_url(id: &str, custom_stream_url: Option<&str>) -> String {
    match custom_stream_url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => synthesized_playback_url(id),
    }
}

pub fn synthesized_playback_url(id: &str) -> String {
    let mut slug: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if slug.is_empty() {
        slug = "camera".to_string();
    }
    format!("{}/{}/index.m3u8", PLAYBACK_BASE_URL, slug)
}
