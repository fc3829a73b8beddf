//! Camera gallery: one stream session per registered camera and the tile
//! state projected from it.

pub mod desk;
pub mod orchestrator;
pub mod tile;

pub use desk::CameraDesk;
pub use orchestrator::{GalleryOrchestrator, HeadlessSurfaces, SurfaceProvider};
pub use tile::{Indicator, TileStatus, TileView};
