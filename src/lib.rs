//! Smart building console: camera gallery with supervised HLS sessions,
//! device schedules, dashboard feeds and an AI assistant.

pub use assistant;
pub use common;
pub use console;
pub use gallery;
pub use mock_feeds;
pub use registry;
pub use stream_session;
