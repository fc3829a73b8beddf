pub mod cameras;
pub mod error;
pub mod schedules;
pub mod schema;
pub mod storage;

pub use cameras::{CameraRegistry, CAMERAS_KEY};
pub use error::RegistryError;
pub use schedules::{ScheduleBook, ScheduleDraft, ScheduleItem, TargetDevice, SCHEDULES_KEY};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
