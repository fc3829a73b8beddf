use crate::orchestrator::GalleryOrchestrator;
use crate::tile::TileView;
use common::cameras::{CameraConfig, CameraDraft};
use registry::{CameraRegistry, RegistryError};
use stream_session::{SessionEvent, StreamSession};

/// Camera registry and gallery kept in step: every successful registry
/// mutation is followed by a reconcile of the controller set.
pub struct CameraDesk {
    registry: CameraRegistry,
    orchestrator: GalleryOrchestrator,
}

impl CameraDesk {
    pub fn new(registry: CameraRegistry, orchestrator: GalleryOrchestrator) -> Self {
        let mut desk = Self {
            registry,
            orchestrator,
        };
        desk.reconcile();
        desk
    }

    pub fn cameras(&self) -> &[CameraConfig] {
        self.registry.list()
    }

    pub fn camera(&self, id: &str) -> Option<&CameraConfig> {
        self.registry.get(id)
    }

    pub fn add(&mut self, draft: CameraDraft) -> Result<CameraConfig, RegistryError> {
        let camera = self.registry.add(draft)?;
        self.reconcile();
        Ok(camera)
    }

    pub fn update(&mut self, id: &str, draft: CameraDraft) -> Result<CameraConfig, RegistryError> {
        let camera = self.registry.update(id, draft)?;
        self.reconcile();
        Ok(camera)
    }

    /// The session is disposed before the record leaves the registry.
    pub fn remove(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        let orchestrator = &mut self.orchestrator;
        let removed = self.registry.remove_with(id, |camera| {
            orchestrator.dispose(&camera.id);
        })?;
        self.reconcile();
        Ok(removed)
    }

    pub fn toggle_desired_state(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        let camera = self.registry.toggle_desired_state(id)?;
        self.reconcile();
        Ok(camera)
    }

    pub fn toggle_motion_detection(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        self.registry.toggle_motion_detection(id)
    }

    pub fn toggle_recording(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        self.registry.toggle_recording(id)
    }

    /// "Try again" on a tile.
    pub fn restart(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.registry.get(id).is_none() || !self.orchestrator.restart(id) {
            return Err(RegistryError::not_found(id));
        }
        Ok(())
    }

    pub fn dispatch(&mut self, event: SessionEvent) {
        self.orchestrator.dispatch(event);
    }

    pub fn session(&self, id: &str) -> Option<&StreamSession> {
        self.orchestrator.session(id)
    }

    pub fn controller_count(&self) -> usize {
        self.orchestrator.controller_count()
    }

    pub fn tile(&self, id: &str) -> Option<TileView> {
        self.registry
            .get(id)
            .map(|camera| TileView::new(camera, self.orchestrator.session(id)))
    }

    pub fn tiles(&self) -> Vec<TileView> {
        self.registry
            .list()
            .iter()
            .map(|camera| TileView::new(camera, self.orchestrator.session(&camera.id)))
            .collect()
    }

    fn reconcile(&mut self) {
        self.orchestrator.reconcile(self.registry.list());
    }
}
