use crate::client::RenderSurface;
use crate::events::{ClientEvent, EventSink};

/// Surface with no display. Play requests are acknowledged at once, which
/// makes the console's sessions reach Playing as soon as the manifest
/// parses.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    native_formats: Vec<String>,
    source: Option<String>,
    playing: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports native support for `mime`.
    pub fn with_native_support(mut self, mime: impl Into<String>) -> Self {
        self.native_formats.push(mime.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl RenderSurface for HeadlessSurface {
    fn can_play_native(&self, mime: &str) -> bool {
        self.native_formats.iter().any(|m| m.eq_ignore_ascii_case(mime))
    }

    fn set_source(&mut self, url: &str, events: EventSink) {
        self.source = Some(url.to_string());
        self.playing = false;
        events.emit(ClientEvent::MetadataLoaded);
    }

    fn play(&mut self, events: &EventSink) {
        if self.source.is_none() {
            events.emit(ClientEvent::PlaybackRejected {
                reason: "no source attached".to_string(),
            });
            return;
        }
        self.playing = true;
        events.emit(ClientEvent::PlaybackStarted);
    }

    fn detach(&mut self) {
        self.source = None;
        self.playing = false;
    }
}
