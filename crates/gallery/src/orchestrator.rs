use common::cameras::{CameraConfig, CameraId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use stream_session::{
    ClientFactory, HeadlessSurface, RecoveryPolicy, RenderSurface, SessionEvent, StreamSession,
    StreamSessionController, StreamTarget, UpdateSink,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Hands out a fresh rendering surface per tile.
pub trait SurfaceProvider: Send + Sync {
    fn surface_for(&self, camera: &CameraConfig) -> Box<dyn RenderSurface>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurfaces;

impl SurfaceProvider for HeadlessSurfaces {
    fn surface_for(&self, _camera: &CameraConfig) -> Box<dyn RenderSurface> {
        Box::new(HeadlessSurface::new())
    }
}

/// Sole owner of the camera-to-controller mapping.
pub struct GalleryOrchestrator {
    factory: Arc<dyn ClientFactory>,
    surfaces: Arc<dyn SurfaceProvider>,
    policy: RecoveryPolicy,
    events: UnboundedSender<SessionEvent>,
    updates: UpdateSink,
    controllers: HashMap<CameraId, StreamSessionController>,
}

impl GalleryOrchestrator {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        surfaces: Arc<dyn SurfaceProvider>,
        policy: RecoveryPolicy,
        events: UnboundedSender<SessionEvent>,
        updates: UpdateSink,
    ) -> Self {
        Self {
            factory,
            surfaces,
            policy,
            events,
            updates,
            controllers: HashMap::new(),
        }
    }

    /// Brings the controller set in line with `cameras`, then forwards each
    /// camera's current target.
    pub fn reconcile(&mut self, cameras: &[CameraConfig]) {
        let present: HashSet<&str> = cameras.iter().map(|c| c.id.as_str()).collect();
        let stale: Vec<CameraId> = self
            .controllers
            .keys()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.dispose(&id);
        }

        for camera in cameras {
            let controller = self.controllers.entry(camera.id.clone()).or_insert_with(|| {
                info!(camera_id = %camera.id, name = %camera.name, "creating stream session");
                StreamSessionController::new(
                    camera.id.clone(),
                    self.surfaces.surface_for(camera),
                    self.factory.clone(),
                    self.policy.clone(),
                    self.events.clone(),
                    self.updates.clone(),
                )
            });
            controller.reconcile(StreamTarget::from_camera(camera));
        }
    }

    /// Forces the controller to Idle and drops it. Returns whether one
    /// existed.
    pub fn dispose(&mut self, id: &str) -> bool {
        match self.controllers.remove(id) {
            Some(mut controller) => {
                controller.dispose();
                info!(camera_id = %id, "stream session disposed");
                true
            }
            None => false,
        }
    }

    pub fn dispatch(&mut self, event: SessionEvent) {
        match self.controllers.get_mut(&event.camera_id) {
            Some(controller) => controller.handle_event(event.epoch, event.event),
            None => debug!(camera_id = %event.camera_id, "event for unknown camera dropped"),
        }
    }

    pub fn restart(&mut self, id: &str) -> bool {
        match self.controllers.get_mut(id) {
            Some(controller) => {
                controller.restart();
                true
            }
            None => false,
        }
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn session(&self, id: &str) -> Option<&StreamSession> {
        self.controllers.get(id).map(|c| c.session())
    }
}

impl Drop for GalleryOrchestrator {
    fn drop(&mut self) {
        for controller in self.controllers.values_mut() {
            controller.dispose();
        }
    }
}
