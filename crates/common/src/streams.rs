use serde::{Deserialize, Serialize};

/// MIME type a rendering surface is asked about before native HLS playback.
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  Idle,
  Attaching,
  Playing,
  Recovering,
  Failed,
}

impl SessionPhase {
  /// Phases in which a client session is bound to a playback URL.
  pub fn is_bound(&self) -> bool {
    matches!(
      self,
      SessionPhase::Attaching | SessionPhase::Playing | SessionPhase::Recovering
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      SessionPhase::Idle => "idle",
      SessionPhase::Attaching => "attaching",
      SessionPhase::Playing => "playing",
      SessionPhase::Recovering => "recovering",
      SessionPhase::Failed => "failed",
    }
  }
}

impl Default for SessionPhase {
  fn default() -> Self {
    Self::Idle
  }
}

/// Classification of a fatal streaming error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorClass {
  /// Manifest or segment transport failure; recovered by reissuing the load.
  Network,
  /// Decode/buffer failure; recovered by client-level media recovery.
  Media,
  /// Anything else; terminal.
  Other,
}

impl StreamErrorClass {
  pub fn is_recoverable(&self) -> bool {
    !matches!(self, StreamErrorClass::Other)
  }
}
