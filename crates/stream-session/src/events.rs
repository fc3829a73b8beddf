use common::cameras::CameraId;
use common::streams::{SessionPhase, StreamErrorClass};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Attach generation of a controller. Bumped on every release.
pub type Epoch = u64;

/// Something a streaming client or rendering surface observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Manifest fetched and parsed by the client library.
    ManifestParsed,
    /// Native playback: the surface loaded stream metadata.
    MetadataLoaded,
    /// The surface accepted a play request.
    PlaybackStarted,
    /// The surface refused a play request (autoplay policy, codec).
    PlaybackRejected { reason: String },
    /// Client library error.
    Error {
        class: StreamErrorClass,
        fatal: bool,
        details: String,
    },
    /// Native playback error reported by the surface.
    NativeError { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub camera_id: CameraId,
    pub epoch: Epoch,
    pub event: ClientEvent,
}

/// Handed to a client or surface at attach time. Every event it sends is
/// stamped with the attach epoch, so events sent after the controller has
/// moved on are recognised as stale.
#[derive(Debug, Clone)]
pub struct EventSink {
    camera_id: CameraId,
    epoch: Epoch,
    tx: UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn new(camera_id: impl Into<CameraId>, epoch: Epoch, tx: UnboundedSender<SessionEvent>) -> Self {
        Self {
            camera_id: camera_id.into(),
            epoch,
            tx,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn emit(&self, event: ClientEvent) {
        let stamped = SessionEvent {
            camera_id: self.camera_id.clone(),
            epoch: self.epoch,
            event,
        };
        if self.tx.send(stamped).is_err() {
            debug!(camera_id = %self.camera_id, epoch = self.epoch, "session event loop gone, event dropped");
        }
    }
}

/// Phase emission of one controller, the only thing it exposes outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseUpdate {
    pub camera_id: CameraId,
    pub phase: SessionPhase,
    pub bound_url: Option<String>,
    pub retry_count: u32,
}

pub type UpdateSink = UnboundedSender<PhaseUpdate>;
