use common::cameras::{CameraConfig, DesiredState, StreamKind};
use common::streams::SessionPhase;
use serde::{Deserialize, Serialize};
use stream_session::StreamSession;

/// User-facing status of a camera tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileStatus {
    Online,
    Offline,
    Connecting,
    #[serde(rename = "Loading Stream")]
    LoadingStream,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Green,
    Red,
    Yellow,
    DarkRed,
}

impl TileStatus {
    /// The camera's own desired state wins while it is Offline; otherwise
    /// the controller phase decides. A controller that has not reacted yet
    /// reads as Connecting.
    pub fn project(desired: DesiredState, phase: Option<SessionPhase>) -> Self {
        if !desired.is_online() {
            return TileStatus::Offline;
        }
        match phase {
            None | Some(SessionPhase::Idle) => TileStatus::Connecting,
            Some(SessionPhase::Attaching) => TileStatus::LoadingStream,
            Some(SessionPhase::Playing) => TileStatus::Online,
            Some(SessionPhase::Recovering) => TileStatus::Connecting,
            Some(SessionPhase::Failed) => TileStatus::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TileStatus::Online => "Online",
            TileStatus::Offline => "Offline",
            TileStatus::Connecting => "Connecting",
            TileStatus::LoadingStream => "Loading Stream",
            TileStatus::Error => "Error",
        }
    }

    pub fn indicator(&self) -> Indicator {
        match self {
            TileStatus::Online => Indicator::Green,
            TileStatus::Offline => Indicator::Red,
            TileStatus::Connecting | TileStatus::LoadingStream => Indicator::Yellow,
            TileStatus::Error => Indicator::DarkRed,
        }
    }

    /// Text drawn over the video area; none while the stream is live.
    pub fn overlay(&self) -> Option<&'static str> {
        match self {
            TileStatus::Online => None,
            TileStatus::Offline => Some("Camera Offline"),
            TileStatus::Connecting => Some("Reconnecting..."),
            TileStatus::LoadingStream => Some("Loading Stream..."),
            TileStatus::Error => Some("Stream Unavailable"),
        }
    }

    pub fn shows_live_badge(&self) -> bool {
        matches!(self, TileStatus::Online)
    }
}

/// Everything a tile renders, recomputed on every phase emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub camera_id: String,
    pub name: String,
    pub location_tag: Option<String>,
    pub stream_kind: StreamKind,
    pub source_url: String,
    pub status: TileStatus,
    pub label: &'static str,
    pub indicator: Indicator,
    pub overlay: Option<&'static str>,
    pub live: bool,
    pub retry_count: u32,
    pub motion_detection_enabled: bool,
    pub recording_enabled: bool,
}

impl TileView {
    pub fn new(camera: &CameraConfig, session: Option<&StreamSession>) -> Self {
        let status = TileStatus::project(camera.desired_state, session.map(|s| s.phase));
        Self {
            camera_id: camera.id.clone(),
            name: camera.name.clone(),
            location_tag: camera.location_tag.clone(),
            stream_kind: camera.stream_kind,
            source_url: camera.source_url(),
            status,
            label: status.label(),
            indicator: status.indicator(),
            overlay: status.overlay(),
            live: status.shows_live_badge(),
            retry_count: session.map(|s| s.retry_count).unwrap_or(0),
            motion_detection_enabled: camera.motion_detection_enabled,
            recording_enabled: camera.recording_enabled,
        }
    }
}
