use assistant::{Assistant, ChatSession};
use gallery::{CameraDesk, GalleryOrchestrator, SurfaceProvider};
use mock_feeds::MockFeeds;
use registry::{CameraRegistry, KeyValueStore, ScheduleBook};
use std::sync::{Arc, Weak};
use stream_session::{ClientFactory, PhaseUpdate, RecoveryPolicy, SessionEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Collaborators the console is assembled from.
pub struct ConsoleParts {
    pub store: Arc<dyn KeyValueStore>,
    pub factory: Arc<dyn ClientFactory>,
    pub surfaces: Arc<dyn SurfaceProvider>,
    pub recovery: RecoveryPolicy,
    pub assistant: Arc<dyn Assistant>,
    pub feeds: MockFeeds,
}

#[derive(Clone)]
pub struct ConsoleState {
    inner: Arc<ConsoleStateInner>,
}

struct ConsoleStateInner {
    desk: Mutex<CameraDesk>,
    schedules: Mutex<ScheduleBook>,
    assistant: Arc<dyn Assistant>,
    chat: Mutex<ChatSession>,
    feeds: MockFeeds,
}

impl ConsoleState {
    /// Loads persisted state and starts the session event loop. Must be
    /// called from within a tokio runtime.
    pub fn new(parts: ConsoleParts) -> (Self, JoinHandle<()>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let orchestrator = GalleryOrchestrator::new(
            parts.factory,
            parts.surfaces,
            parts.recovery,
            events_tx,
            updates_tx,
        );
        let desk = CameraDesk::new(CameraRegistry::load(parts.store.clone()), orchestrator);
        let schedules = ScheduleBook::load(parts.store);

        let inner = Arc::new(ConsoleStateInner {
            desk: Mutex::new(desk),
            schedules: Mutex::new(schedules),
            assistant: parts.assistant,
            chat: Mutex::new(ChatSession::with_greeting()),
            feeds: parts.feeds,
        });

        let event_loop = tokio::spawn(run_event_loop(Arc::downgrade(&inner), events_rx, updates_rx));
        (Self { inner }, event_loop)
    }

    pub fn desk(&self) -> &Mutex<CameraDesk> {
        &self.inner.desk
    }

    pub fn schedules(&self) -> &Mutex<ScheduleBook> {
        &self.inner.schedules
    }

    pub fn assistant(&self) -> Arc<dyn Assistant> {
        self.inner.assistant.clone()
    }

    pub fn chat(&self) -> &Mutex<ChatSession> {
        &self.inner.chat
    }

    pub fn feeds(&self) -> &MockFeeds {
        &self.inner.feeds
    }
}

/// Single consumer of client events. Every transition happens here or in a
/// request handler, always under the desk lock, so a controller never sees
/// two transitions at once.
async fn run_event_loop(
    state: Weak<ConsoleStateInner>,
    mut events: UnboundedReceiver<SessionEvent>,
    mut updates: UnboundedReceiver<PhaseUpdate>,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Some(inner) = state.upgrade() else { break };
                inner.desk.lock().await.dispatch(event);
            }
            update = updates.recv() => {
                let Some(update) = update else { break };
                info!(
                    camera_id = %update.camera_id,
                    phase = update.phase.as_str(),
                    bound_url = ?update.bound_url,
                    retry_count = update.retry_count,
                    "stream phase changed"
                );
            }
        }
    }
    debug!("session event loop stopped");
}
