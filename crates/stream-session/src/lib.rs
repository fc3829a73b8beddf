//! Per-tile playback lifecycle for adaptive (HLS) camera streams.
//!
//! A [`StreamSessionController`] owns at most one [`StreamClient`] at a time
//! and drives it through the [`SessionPhase`](common::streams::SessionPhase)
//! state machine. Clients report back through an epoch-stamped
//! [`EventSink`]; phase changes leave through an [`UpdateSink`].

pub mod client;
pub mod controller;
pub mod events;
pub mod http_client;
pub mod policy;
pub mod session;
pub mod surface;

pub use client::{ClientConfig, ClientFactory, RenderSurface, StreamClient};
pub use controller::StreamSessionController;
pub use events::{ClientEvent, Epoch, EventSink, PhaseUpdate, SessionEvent, UpdateSink};
pub use http_client::{HttpClientFactory, HttpManifestClient};
pub use policy::RecoveryPolicy;
pub use session::{StreamSession, StreamTarget};
pub use surface::HeadlessSurface;
