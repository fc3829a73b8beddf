use crate::error::RegistryError;
use crate::schema::{encode_snapshot, load_cameras};
use crate::storage::KeyValueStore;
use chrono::Utc;
use common::cameras::{new_camera_id, resolve_playback_url, CameraConfig, CameraDraft};
use common::validation::{validate_name, validate_uri};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Storage key of the persisted camera list
pub const CAMERAS_KEY: &str = "ipCameras";

/// Ordered collection of camera configurations, persisted as a full
/// snapshot after every successful mutation.
pub struct CameraRegistry {
    store: Arc<dyn KeyValueStore>,
    key: String,
    cameras: Vec<CameraConfig>,
}

impl CameraRegistry {
    /// Loads the stored list. Unreadable or malformed documents are dropped
    /// and the registry starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        Self::load_from(store, CAMERAS_KEY)
    }

    pub fn load_from(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let cameras = match store.get(key) {
            Ok(Some(raw)) => match load_cameras(&raw, Utc::now()) {
                Ok(report) => {
                    for discard in &report.discarded {
                        warn!(key, index = discard.index, reason = %discard.reason, "discarded stored camera");
                    }
                    info!(key, version = report.version, count = report.records.len(), "loaded cameras");
                    report.records
                }
                Err(e) => {
                    error!(key, error = %e, "stored camera list is unusable, starting empty");
                    if let Err(e) = store.remove(key) {
                        warn!(key, error = %e, "failed to clear unusable camera list");
                    }
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!(key, "no stored camera list");
                Vec::new()
            }
            Err(e) => {
                error!(key, error = %e, "failed to read camera list, starting empty");
                Vec::new()
            }
        };

        Self {
            store,
            key: key.to_string(),
            cameras,
        }
    }

    pub fn list(&self) -> &[CameraConfig] {
        &self.cameras
    }

    pub fn get(&self, id: &str) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn add(&mut self, draft: CameraDraft) -> Result<CameraConfig, RegistryError> {
        validate_draft(&draft)?;

        let mut camera = CameraConfig::from_draft(draft, Utc::now());
        while self.get(&camera.id).is_some() {
            camera.id = new_camera_id();
            camera.playback_url =
                resolve_playback_url(&camera.id, camera.custom_stream_url.as_deref());
        }

        info!(camera_id = %camera.id, name = %camera.name, "camera added");
        self.cameras.push(camera.clone());
        self.persist();
        Ok(camera)
    }

    pub fn update(&mut self, id: &str, draft: CameraDraft) -> Result<CameraConfig, RegistryError> {
        let camera = self.find_mut(id)?;
        validate_draft(&draft)?;
        camera.apply_draft(draft, Utc::now());
        let updated = camera.clone();

        info!(camera_id = %id, playback_url = %updated.playback_url, "camera updated");
        self.persist();
        Ok(updated)
    }

    pub fn remove(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        self.remove_with(id, |_| {})
    }

    /// Removes `id`, running `before_remove` while the record is still
    /// listed so dependants can release what they hold for it.
    pub fn remove_with<F>(&mut self, id: &str, before_remove: F) -> Result<CameraConfig, RegistryError>
    where
        F: FnOnce(&CameraConfig),
    {
        let index = self
            .cameras
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RegistryError::not_found(id))?;

        before_remove(&self.cameras[index]);
        let removed = self.cameras.remove(index);

        info!(camera_id = %id, "camera removed");
        self.persist();
        Ok(removed)
    }

    pub fn toggle_desired_state(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        let camera = self.find_mut(id)?;
        camera.desired_state = camera.desired_state.toggled();
        camera.last_checked_at = Utc::now();
        let updated = camera.clone();

        info!(camera_id = %id, desired_state = ?updated.desired_state, "desired state toggled");
        self.persist();
        Ok(updated)
    }

    pub fn toggle_motion_detection(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        let camera = self.find_mut(id)?;
        camera.motion_detection_enabled = !camera.motion_detection_enabled;
        let updated = camera.clone();
        self.persist();
        Ok(updated)
    }

    pub fn toggle_recording(&mut self, id: &str) -> Result<CameraConfig, RegistryError> {
        let camera = self.find_mut(id)?;
        camera.recording_enabled = !camera.recording_enabled;
        let updated = camera.clone();
        self.persist();
        Ok(updated)
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut CameraConfig, RegistryError> {
        self.cameras
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RegistryError::not_found(id))
    }

    /// Write failures are logged and swallowed; the in-memory list stays
    /// authoritative.
    fn persist(&self) {
        let result = encode_snapshot(&self.cameras).and_then(|raw| self.store.set(&self.key, &raw));
        match result {
            Ok(()) => debug!(key = %self.key, count = self.cameras.len(), "camera list saved"),
            Err(e) => error!(key = %self.key, error = %e, "failed to save camera list"),
        }
    }
}

fn validate_draft(draft: &CameraDraft) -> Result<(), RegistryError> {
    validate_name(&draft.name, "name")?;
    validate_name(&draft.address, "address")?;
    if let Some(url) = draft.custom_stream_url.as_deref().filter(|u| !u.trim().is_empty()) {
        validate_uri(url.trim(), "customStreamUrl")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use common::cameras::DesiredState;

    fn registry() -> (Arc<MemoryStore>, CameraRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = CameraRegistry::load(store.clone());
        (store, registry)
    }

    fn reload(store: &Arc<MemoryStore>) -> Vec<CameraConfig> {
        CameraRegistry::load(store.clone()).list().to_vec()
    }

    #[test]
    fn add_assigns_unique_ids_and_urls() {
        let (_store, mut registry) = registry();
        let a = registry.add(CameraDraft::new("Lobby", "10.0.0.1")).unwrap();
        let b = registry.add(CameraDraft::new("Dock", "10.0.0.2")).unwrap();

        assert_ne!(a.id, b.id);
        assert!(!a.playback_url.is_empty());
        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.list()[0].id, a.id);
        assert_eq!(registry.list()[1].id, b.id);
    }

    #[test]
    fn add_rejects_missing_required_fields() {
        let (store, mut registry) = registry();

        let err = registry.add(CameraDraft::new("", "10.0.0.1")).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref m) if m.contains("name")));

        let err = registry.add(CameraDraft::new("Lobby", "  ")).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref m) if m.contains("address")));

        let err = registry
            .add(CameraDraft::new("Lobby", "10.0.0.1").with_custom_url("file:///etc/passwd"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));

        assert!(registry.is_empty());
        assert_eq!(store.get(CAMERAS_KEY).unwrap(), None);
    }

    #[test]
    fn update_preserves_id_and_rederives_url() {
        let (store, mut registry) = registry();
        let camera = registry.add(CameraDraft::new("Lobby", "10.0.0.1")).unwrap();
        registry.toggle_desired_state(&camera.id).unwrap();

        let updated = registry
            .update(
                &camera.id,
                CameraDraft::new("Lobby West", "10.0.0.9").with_custom_url("https://cdn.example/w.m3u8"),
            )
            .unwrap();

        assert_eq!(updated.id, camera.id);
        assert_eq!(updated.name, "Lobby West");
        assert_eq!(updated.playback_url, "https://cdn.example/w.m3u8");
        assert_eq!(updated.desired_state, DesiredState::Offline);
        assert!(updated.last_checked_at >= camera.last_checked_at);
        assert_eq!(reload(&store), registry.list());

        let reverted = registry
            .update(&camera.id, CameraDraft::new("Lobby West", "10.0.0.9"))
            .unwrap();
        assert_eq!(reverted.playback_url, camera.playback_url);
    }

    #[test]
    fn missing_ids_report_not_found() {
        let (_store, mut registry) = registry();
        registry.add(CameraDraft::new("Lobby", "10.0.0.1")).unwrap();

        assert_eq!(
            registry.update("nope", CameraDraft::new("x", "y")).unwrap_err(),
            RegistryError::not_found("nope")
        );
        assert!(matches!(registry.remove("nope"), Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.toggle_recording("nope"), Err(RegistryError::NotFound(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn update_checks_the_id_before_the_draft() {
        let (_store, mut registry) = registry();
        let camera = registry.add(CameraDraft::new("Lobby", "10.0.0.1")).unwrap();

        assert_eq!(
            registry.update("missing", CameraDraft::new("", "")).unwrap_err(),
            RegistryError::not_found("missing")
        );
        assert!(matches!(
            registry.update(&camera.id, CameraDraft::new("", "")),
            Err(RegistryError::Validation(_))
        ));
        assert_eq!(registry.get(&camera.id).unwrap().name, "Lobby");
    }

    #[test]
    fn remove_runs_hook_before_record_leaves() {
        let (store, mut registry) = registry();
        let camera = registry.add(CameraDraft::new("Lobby", "10.0.0.1")).unwrap();

        let mut seen = None;
        registry
            .remove_with(&camera.id, |c| seen = Some(c.id.clone()))
            .unwrap();

        assert_eq!(seen.as_deref(), Some(camera.id.as_str()));
        assert!(registry.is_empty());
        assert!(reload(&store).is_empty());
    }

    #[test]
    fn toggles_flip_and_persist() {
        let (store, mut registry) = registry();
        let camera = registry.add(CameraDraft::new("Lobby", "10.0.0.1")).unwrap();

        let toggled = registry.toggle_motion_detection(&camera.id).unwrap();
        assert!(toggled.motion_detection_enabled);
        let toggled = registry.toggle_recording(&camera.id).unwrap();
        assert!(toggled.recording_enabled);
        let toggled = registry.toggle_desired_state(&camera.id).unwrap();
        assert_eq!(toggled.desired_state, DesiredState::Offline);
        let toggled = registry.toggle_desired_state(&camera.id).unwrap();
        assert_eq!(toggled.desired_state, DesiredState::Online);

        assert_eq!(reload(&store), registry.list());
    }

    #[test]
    fn malformed_storage_starts_empty_and_is_cleared() {
        let store = Arc::new(MemoryStore::with_entry(CAMERAS_KEY, "{\"version\": 1, \"items\": ["));
        let registry = CameraRegistry::load(store.clone());

        assert!(registry.is_empty());
        assert_eq!(store.get(CAMERAS_KEY).unwrap(), None);
    }
}
