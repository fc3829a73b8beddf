use crate::events::EventSink;
use std::time::Duration;

/// Manifest loading parameters handed to each new client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub manifest_timeout: Duration,
    pub manifest_max_retry: u32,
    pub manifest_retry_delay: Duration,
}

/// An adaptive-streaming client bound to one playback URL.
///
/// Clients never call back into the controller directly; everything they
/// observe goes through the [`EventSink`] they were created with.
pub trait StreamClient: Send {
    fn load_source(&mut self, url: &str);
    fn attach_media(&mut self, surface: &mut dyn RenderSurface);
    /// Reissues the manifest load after a network-class failure.
    fn start_load(&mut self);
    /// Resets the media pipeline after a decode-class failure.
    fn recover_media_error(&mut self);
    /// Stops all work. No event is emitted by this client afterwards.
    fn destroy(&mut self);
}

pub trait ClientFactory: Send + Sync {
    /// Whether the client library works in this environment at all.
    fn is_supported(&self) -> bool;
    fn create(&self, config: &ClientConfig, events: EventSink) -> Box<dyn StreamClient>;
}

/// The element a tile renders into.
pub trait RenderSurface: Send {
    fn can_play_native(&self, mime: &str) -> bool;
    /// Points the surface at `url`. Native metadata and error events go to
    /// `events`.
    fn set_source(&mut self, url: &str, events: EventSink);
    /// Requests playback. The outcome arrives as `PlaybackStarted` or
    /// `PlaybackRejected`.
    fn play(&mut self, events: &EventSink);
    /// Stops rendering and clears the source.
    fn detach(&mut self);
}
