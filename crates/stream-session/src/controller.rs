use crate::client::{ClientFactory, RenderSurface, StreamClient};
use crate::events::{ClientEvent, Epoch, EventSink, PhaseUpdate, SessionEvent, UpdateSink};
use crate::policy::RecoveryPolicy;
use crate::session::{StreamSession, StreamTarget};
use common::cameras::CameraId;
use common::streams::{SessionPhase, StreamErrorClass, HLS_MIME};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Playback lifecycle of one camera tile.
///
/// Every mutation goes through `reconcile`, `restart`, `dispose` or
/// `handle_event`, and all of them take `&mut self`, so transitions for a
/// controller are strictly sequential. The controller holds at most one
/// client; any transition into Idle, Failed or a new Attaching destroys the
/// current client and detaches the surface first.
pub struct StreamSessionController {
    camera_id: CameraId,
    surface: Box<dyn RenderSurface>,
    factory: Arc<dyn ClientFactory>,
    policy: RecoveryPolicy,
    events: UnboundedSender<SessionEvent>,
    updates: UpdateSink,
    session: StreamSession,
    target: Option<StreamTarget>,
    client: Option<Box<dyn StreamClient>>,
    sink: Option<EventSink>,
    native: bool,
    epoch: Epoch,
}

impl StreamSessionController {
    pub fn new(
        camera_id: impl Into<CameraId>,
        surface: Box<dyn RenderSurface>,
        factory: Arc<dyn ClientFactory>,
        policy: RecoveryPolicy,
        events: UnboundedSender<SessionEvent>,
        updates: UpdateSink,
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            surface,
            factory,
            policy,
            events,
            updates,
            session: StreamSession::default(),
            target: None,
            client: None,
            sink: None,
            native: false,
            epoch: 0,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    /// Epoch that events must carry to be accepted.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Applies a new `(playback_url, desired_state)` pair.
    pub fn reconcile(&mut self, target: StreamTarget) {
        if self.target.as_ref() == Some(&target) {
            return;
        }

        let url = target.playback_url.trim().to_string();
        let live = target.is_live();
        let already_playing = live
            && self.session.phase == SessionPhase::Playing
            && self.session.bound_url.as_deref() == Some(url.as_str());
        self.target = Some(target);
        if already_playing {
            return;
        }

        debug!(camera_id = %self.camera_id, url = %url, live, "reconciling stream target");
        self.teardown();
        if live {
            self.attach(url);
        }
    }

    /// Forces a fresh attach against the current target, leaving Failed.
    pub fn restart(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };
        info!(camera_id = %self.camera_id, phase = self.session.phase.as_str(), "restarting stream session");
        self.teardown();
        if target.is_live() {
            self.attach(target.playback_url.trim().to_string());
        }
    }

    /// Drives the controller to Idle before it is dropped.
    pub fn dispose(&mut self) {
        debug!(camera_id = %self.camera_id, "disposing stream session");
        self.teardown();
        self.target = None;
    }

    pub fn handle_event(&mut self, epoch: Epoch, event: ClientEvent) {
        if epoch != self.epoch || !self.session.phase.is_bound() {
            debug!(
                camera_id = %self.camera_id,
                epoch,
                current_epoch = self.epoch,
                phase = self.session.phase.as_str(),
                event = ?event,
                "ignoring stale client event"
            );
            return;
        }

        match event {
            ClientEvent::ManifestParsed if !self.native => self.request_play(),
            ClientEvent::MetadataLoaded if self.native => self.request_play(),
            ClientEvent::ManifestParsed | ClientEvent::MetadataLoaded => {}
            ClientEvent::PlaybackStarted => {
                let bound = self.session.bound_url.clone();
                self.set_phase(SessionPhase::Playing, bound, 0);
            }
            ClientEvent::PlaybackRejected { reason } => {
                self.fail(&format!("play request rejected: {reason}"));
            }
            ClientEvent::Error {
                class,
                fatal: false,
                details,
            } => {
                debug!(camera_id = %self.camera_id, class = ?class, %details, "non-fatal stream error");
            }
            ClientEvent::Error {
                class,
                fatal: true,
                details,
            } => self.recover(class, &details),
            ClientEvent::NativeError { details } => {
                self.fail(&format!("native playback error: {details}"));
            }
        }
    }

    fn attach(&mut self, url: String) {
        let sink = EventSink::new(self.camera_id.clone(), self.epoch, self.events.clone());

        if self.factory.is_supported() {
            let mut client = self.factory.create(&self.policy.client_config(), sink.clone());
            self.native = false;
            self.sink = Some(sink);
            self.set_phase(SessionPhase::Attaching, Some(url.clone()), 0);
            client.load_source(&url);
            client.attach_media(self.surface.as_mut());
            self.client = Some(client);
        } else if self.surface.can_play_native(HLS_MIME) {
            info!(camera_id = %self.camera_id, "streaming client unsupported, using native playback");
            self.native = true;
            self.sink = Some(sink.clone());
            self.set_phase(SessionPhase::Attaching, Some(url.clone()), 0);
            self.surface.set_source(&url, sink);
        } else {
            warn!(camera_id = %self.camera_id, "neither streaming client nor native playback is supported");
            self.set_phase(SessionPhase::Failed, None, 0);
        }
    }

    fn request_play(&mut self) {
        if let Some(sink) = &self.sink {
            self.surface.play(sink);
        }
    }

    fn recover(&mut self, class: StreamErrorClass, details: &str) {
        let retry_count = self.session.retry_count;
        if !class.is_recoverable() || self.client.is_none() {
            self.fail(&format!("unrecoverable {class:?} error: {details}"));
            return;
        }
        if retry_count >= self.policy.max_retries {
            self.fail(&format!("retries exhausted after {retry_count} attempts: {details}"));
            return;
        }

        let attempt = retry_count + 1;
        warn!(camera_id = %self.camera_id, class = ?class, attempt, max = self.policy.max_retries, %details, "fatal stream error, recovering");
        let bound = self.session.bound_url.clone();
        self.set_phase(SessionPhase::Recovering, bound, attempt);

        if let Some(client) = self.client.as_mut() {
            match class {
                StreamErrorClass::Network => client.start_load(),
                StreamErrorClass::Media => client.recover_media_error(),
                StreamErrorClass::Other => {}
            }
        }
    }

    fn fail(&mut self, reason: &str) {
        warn!(camera_id = %self.camera_id, url = ?self.session.bound_url, reason, "stream session failed");
        let retry_count = self.session.retry_count;
        self.release();
        self.set_phase(SessionPhase::Failed, None, retry_count);
    }

    fn teardown(&mut self) {
        self.release();
        self.set_phase(SessionPhase::Idle, None, 0);
    }

    /// Destroys the client and detaches the surface. Events already in
    /// flight from them carry the old epoch and are dropped on arrival.
    fn release(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.destroy();
        }
        if self.session.phase.is_bound() {
            self.surface.detach();
        }
        self.sink = None;
        self.native = false;
        self.epoch += 1;
    }

    fn set_phase(&mut self, phase: SessionPhase, bound_url: Option<String>, retry_count: u32) {
        let next = StreamSession {
            phase,
            bound_url,
            retry_count,
        };
        if next == self.session {
            return;
        }
        self.session = next;

        let update = PhaseUpdate {
            camera_id: self.camera_id.clone(),
            phase,
            bound_url: self.session.bound_url.clone(),
            retry_count,
        };
        if self.updates.send(update).is_err() {
            debug!(camera_id = %self.camera_id, "phase listener gone");
        }
    }
}

impl Drop for StreamSessionController {
    fn drop(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use common::cameras::DesiredState;
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    #[derive(Debug, Default)]
    struct Stats {
        created: usize,
        live: usize,
        max_live: usize,
        created_while_live: usize,
        loads: Vec<String>,
        start_loads: usize,
        media_recoveries: usize,
    }

    struct FakeClient {
        stats: Arc<Mutex<Stats>>,
        destroyed: bool,
    }

    impl StreamClient for FakeClient {
        fn load_source(&mut self, url: &str) {
            self.stats.lock().unwrap().loads.push(url.to_string());
        }

        fn attach_media(&mut self, _surface: &mut dyn RenderSurface) {}

        fn start_load(&mut self) {
            self.stats.lock().unwrap().start_loads += 1;
        }

        fn recover_media_error(&mut self) {
            self.stats.lock().unwrap().media_recoveries += 1;
        }

        fn destroy(&mut self) {
            if !self.destroyed {
                self.destroyed = true;
                self.stats.lock().unwrap().live -= 1;
            }
        }
    }

    struct FakeFactory {
        supported: bool,
        stats: Arc<Mutex<Stats>>,
    }

    impl ClientFactory for FakeFactory {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn create(&self, _config: &ClientConfig, _events: EventSink) -> Box<dyn StreamClient> {
            let mut stats = self.stats.lock().unwrap();
            if stats.live > 0 {
                stats.created_while_live += 1;
            }
            stats.created += 1;
            stats.live += 1;
            stats.max_live = stats.max_live.max(stats.live);
            Box::new(FakeClient {
                stats: self.stats.clone(),
                destroyed: false,
            })
        }
    }

    struct FakeSurface {
        native: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RenderSurface for FakeSurface {
        fn can_play_native(&self, mime: &str) -> bool {
            self.native && mime == HLS_MIME
        }

        fn set_source(&mut self, url: &str, _events: EventSink) {
            self.log.lock().unwrap().push(format!("source {url}"));
        }

        fn play(&mut self, _events: &EventSink) {
            self.log.lock().unwrap().push("play".to_string());
        }

        fn detach(&mut self) {
            self.log.lock().unwrap().push("detach".to_string());
        }
    }

    struct Harness {
        controller: StreamSessionController,
        stats: Arc<Mutex<Stats>>,
        surface_log: Arc<Mutex<Vec<String>>>,
        updates: UnboundedReceiver<PhaseUpdate>,
        _events: UnboundedReceiver<SessionEvent>,
    }

    impl Harness {
        fn new(supported: bool, native: bool) -> Self {
            let stats = Arc::new(Mutex::new(Stats::default()));
            let surface_log = Arc::new(Mutex::new(Vec::new()));
            let (events_tx, events_rx) = mpsc::unbounded_channel();
            let (updates_tx, updates_rx) = mpsc::unbounded_channel();
            let controller = StreamSessionController::new(
                "cam1",
                Box::new(FakeSurface {
                    native,
                    log: surface_log.clone(),
                }),
                Arc::new(FakeFactory {
                    supported,
                    stats: stats.clone(),
                }),
                RecoveryPolicy::default().with_max_retries(3),
                events_tx,
                updates_tx,
            );
            Self {
                controller,
                stats,
                surface_log,
                updates: updates_rx,
                _events: events_rx,
            }
        }

        fn online(&mut self, url: &str) {
            self.controller
                .reconcile(StreamTarget::new(url, DesiredState::Online));
        }

        fn send(&mut self, event: ClientEvent) {
            let epoch = self.controller.epoch();
            self.controller.handle_event(epoch, event);
        }

        fn play_through(&mut self) {
            self.send(ClientEvent::ManifestParsed);
            self.send(ClientEvent::PlaybackStarted);
        }

        fn drain(&mut self) -> Vec<PhaseUpdate> {
            let mut out = Vec::new();
            while let Ok(update) = self.updates.try_recv() {
                out.push(update);
            }
            out
        }

        fn phases(&mut self) -> Vec<SessionPhase> {
            self.drain().into_iter().map(|u| u.phase).collect()
        }

        fn live_clients(&self) -> usize {
            self.stats.lock().unwrap().live
        }
    }

    fn network_error() -> ClientEvent {
        ClientEvent::Error {
            class: StreamErrorClass::Network,
            fatal: true,
            details: "manifestLoadError".to_string(),
        }
    }

    #[test]
    fn attach_then_manifest_and_play_reach_playing() {
        let mut h = Harness::new(true, false);
        h.online("u1");

        assert_eq!(h.controller.phase(), SessionPhase::Attaching);
        assert_eq!(h.controller.session().bound_url.as_deref(), Some("u1"));
        assert_eq!(h.stats.lock().unwrap().loads, vec!["u1".to_string()]);

        h.play_through();
        assert_eq!(h.controller.phase(), SessionPhase::Playing);
        assert_eq!(h.controller.session().retry_count, 0);
        assert_eq!(h.surface_log.lock().unwrap().as_slice(), ["play"]);
        assert_eq!(h.phases(), vec![SessionPhase::Attaching, SessionPhase::Playing]);
    }

    #[test]
    fn identical_target_is_a_noop() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();
        h.drain();

        h.online("u1");
        assert_eq!(h.controller.phase(), SessionPhase::Playing);
        assert_eq!(h.stats.lock().unwrap().created, 1);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn offline_while_playing_goes_idle_and_stays_quiet() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();
        let old_epoch = h.controller.epoch();
        h.drain();

        h.controller
            .reconcile(StreamTarget::new("u1", DesiredState::Offline));
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert_eq!(h.controller.session().bound_url, None);
        assert_eq!(h.live_clients(), 0);
        assert_eq!(h.surface_log.lock().unwrap().last().map(String::as_str), Some("detach"));

        // The destroyed client's events are still queued somewhere.
        h.controller.handle_event(old_epoch, ClientEvent::PlaybackStarted);
        h.controller.handle_event(old_epoch, network_error());

        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].phase, SessionPhase::Idle);
        assert_eq!(updates[0].bound_url, None);
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
    }

    #[test]
    fn network_errors_beyond_limit_fail_exactly_once() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();
        h.drain();

        for _ in 0..6 {
            h.send(network_error());
        }

        let updates = h.drain();
        let retries: Vec<u32> = updates
            .iter()
            .filter(|u| u.phase == SessionPhase::Recovering)
            .map(|u| u.retry_count)
            .collect();
        assert_eq!(retries, vec![1, 2, 3]);

        let failed: Vec<&PhaseUpdate> = updates
            .iter()
            .filter(|u| u.phase == SessionPhase::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].retry_count, 3);
        assert_eq!(failed[0].bound_url, None);

        assert_eq!(h.stats.lock().unwrap().start_loads, 3);
        assert_eq!(h.live_clients(), 0);
        assert_eq!(h.controller.session().retry_count, 3);
    }

    #[test]
    fn media_errors_recover_and_playback_resets_count() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();

        h.send(ClientEvent::Error {
            class: StreamErrorClass::Media,
            fatal: true,
            details: "bufferStalledError".to_string(),
        });
        assert_eq!(h.controller.phase(), SessionPhase::Recovering);
        assert_eq!(h.controller.session().retry_count, 1);
        assert_eq!(h.stats.lock().unwrap().media_recoveries, 1);

        h.send(ClientEvent::PlaybackStarted);
        assert_eq!(h.controller.phase(), SessionPhase::Playing);
        assert_eq!(h.controller.session().retry_count, 0);
        assert_eq!(h.live_clients(), 1);
    }

    #[test]
    fn url_change_while_playing_tears_down_first() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();
        let old_epoch = h.controller.epoch();
        h.drain();

        h.online("u2");
        let updates = h.drain();
        assert_eq!(updates[0].phase, SessionPhase::Idle);
        assert_eq!(updates[1].phase, SessionPhase::Attaching);
        assert_eq!(updates[1].bound_url.as_deref(), Some("u2"));
        assert_eq!(h.live_clients(), 1);

        h.controller.handle_event(old_epoch, ClientEvent::PlaybackStarted);
        assert_eq!(h.controller.phase(), SessionPhase::Attaching);

        h.play_through();
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].phase, SessionPhase::Playing);
        assert_eq!(updates[0].bound_url.as_deref(), Some("u2"));
        assert_eq!(h.stats.lock().unwrap().loads, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn never_holds_two_live_clients() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.online("u2");
        h.send(network_error());
        h.controller.restart();
        h.play_through();
        h.online("u3");
        h.controller
            .reconcile(StreamTarget::new("u3", DesiredState::Offline));
        h.online("u3");
        h.controller.dispose();

        let stats = h.stats.lock().unwrap();
        assert_eq!(stats.created, 5);
        assert_eq!(stats.max_live, 1);
        assert_eq!(stats.created_while_live, 0);
        assert_eq!(stats.live, 0);
        assert!(h.controller.session().is_consistent());
    }

    #[test]
    fn unrecoverable_error_fails_until_target_changes() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.send(ClientEvent::Error {
            class: StreamErrorClass::Other,
            fatal: true,
            details: "manifestParsingError".to_string(),
        });
        assert_eq!(h.controller.phase(), SessionPhase::Failed);
        assert_eq!(h.live_clients(), 0);

        h.online("u1");
        assert_eq!(h.controller.phase(), SessionPhase::Failed);

        h.online("u2");
        assert_eq!(h.controller.phase(), SessionPhase::Attaching);
        assert!(h.controller.has_client());
    }

    #[test]
    fn restart_leaves_failed() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.send(ClientEvent::PlaybackRejected {
            reason: "autoplay blocked".to_string(),
        });
        assert_eq!(h.controller.phase(), SessionPhase::Failed);

        h.controller.restart();
        assert_eq!(h.controller.phase(), SessionPhase::Attaching);
        assert_eq!(h.controller.session().bound_url.as_deref(), Some("u1"));
    }

    #[test]
    fn non_fatal_errors_are_ignored() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();
        h.drain();

        h.send(ClientEvent::Error {
            class: StreamErrorClass::Network,
            fatal: false,
            details: "fragLoadTimeOut".to_string(),
        });
        assert_eq!(h.controller.phase(), SessionPhase::Playing);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn native_fallback_tracks_surface_events() {
        let mut h = Harness::new(false, true);
        h.online("u1");

        assert!(h.controller.is_native());
        assert!(!h.controller.has_client());
        assert_eq!(h.controller.phase(), SessionPhase::Attaching);

        h.send(ClientEvent::ManifestParsed);
        assert_eq!(h.surface_log.lock().unwrap().as_slice(), ["source u1"]);

        h.send(ClientEvent::MetadataLoaded);
        h.send(ClientEvent::PlaybackStarted);
        assert_eq!(h.controller.phase(), SessionPhase::Playing);

        h.send(ClientEvent::NativeError {
            details: "MEDIA_ERR_NETWORK".to_string(),
        });
        assert_eq!(h.controller.phase(), SessionPhase::Failed);
        assert_eq!(
            h.surface_log.lock().unwrap().as_slice(),
            ["source u1", "play", "detach"]
        );
        assert_eq!(h.stats.lock().unwrap().created, 0);
    }

    #[test]
    fn no_playback_support_fails_immediately() {
        let mut h = Harness::new(false, false);
        h.online("u1");

        assert_eq!(h.controller.phase(), SessionPhase::Failed);
        assert_eq!(h.controller.session().bound_url, None);
        assert_eq!(h.phases(), vec![SessionPhase::Failed]);
    }

    #[test]
    fn empty_url_stays_idle() {
        let mut h = Harness::new(true, false);
        h.online("   ");

        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert_eq!(h.stats.lock().unwrap().created, 0);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn dispose_releases_client() {
        let mut h = Harness::new(true, false);
        h.online("u1");
        h.play_through();

        h.controller.dispose();
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert_eq!(h.live_clients(), 0);
    }

    #[test]
    fn drop_destroys_live_client() {
        let h = Harness::new(true, false);
        let stats = h.stats.clone();
        let Harness { mut controller, .. } = h;
        controller.reconcile(StreamTarget::new("u1", DesiredState::Online));
        assert_eq!(stats.lock().unwrap().live, 1);

        drop(controller);
        assert_eq!(stats.lock().unwrap().live, 0);
    }
}
