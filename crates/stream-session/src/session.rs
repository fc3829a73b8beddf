use common::cameras::{CameraConfig, DesiredState};
use common::streams::SessionPhase;
use serde::Serialize;

/// What a controller is asked to show: the camera's playback URL and
/// whether the operator wants it live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub playback_url: String,
    pub desired_state: DesiredState,
}

impl StreamTarget {
    pub fn new(playback_url: impl Into<String>, desired_state: DesiredState) -> Self {
        Self {
            playback_url: playback_url.into(),
            desired_state,
        }
    }

    pub fn from_camera(camera: &CameraConfig) -> Self {
        Self::new(camera.playback_url.clone(), camera.desired_state)
    }

    /// Online with something to play.
    pub fn is_live(&self) -> bool {
        self.desired_state.is_online() && !self.playback_url.trim().is_empty()
    }
}

/// Observable state of one controller. `bound_url` is set exactly while
/// the phase is Attaching, Playing or Recovering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSession {
    pub phase: SessionPhase,
    pub bound_url: Option<String>,
    pub retry_count: u32,
}

impl StreamSession {
    pub fn is_consistent(&self) -> bool {
        self.phase.is_bound() == self.bound_url.is_some()
    }
}
