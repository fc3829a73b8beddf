use crate::client::{ClientConfig, ClientFactory, RenderSurface, StreamClient};
use crate::events::{ClientEvent, EventSink};
use anyhow::{Context, Result};
use common::streams::StreamErrorClass;
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const MANIFEST_SIGNATURE: &str = "#EXTM3U";

/// Creates [`HttpManifestClient`]s that share one connection pool and run
/// on the runtime the factory was built on.
#[derive(Clone, Debug)]
pub struct HttpClientFactory {
    http: Client,
    runtime: Handle,
}

impl HttpClientFactory {
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("smart-building-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        let runtime = Handle::try_current().context("manifest client needs a tokio runtime")?;
        Ok(Self { http, runtime })
    }
}

impl ClientFactory for HttpClientFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, config: &ClientConfig, events: EventSink) -> Box<dyn StreamClient> {
        Box::new(HttpManifestClient {
            http: self.http.clone(),
            runtime: self.runtime.clone(),
            config: config.clone(),
            events,
            url: None,
            task: None,
        })
    }
}

/// Fetches and checks the HLS manifest of a stream. Segment download and
/// decoding are left to the rendering surface.
pub struct HttpManifestClient {
    http: Client,
    runtime: Handle,
    config: ClientConfig,
    events: EventSink,
    url: Option<String>,
    task: Option<JoinHandle<()>>,
}

impl HttpManifestClient {
    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl StreamClient for HttpManifestClient {
    fn load_source(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.start_load();
    }

    fn attach_media(&mut self, surface: &mut dyn RenderSurface) {
        if let Some(url) = &self.url {
            surface.set_source(url, self.events.clone());
        }
    }

    fn start_load(&mut self) {
        self.abort_task();
        let Some(url) = self.url.clone() else {
            return;
        };
        debug!(camera_id = %self.events.camera_id(), %url, "loading manifest");
        self.task = Some(self.runtime.spawn(load_manifest(
            self.http.clone(),
            url,
            self.config.clone(),
            self.events.clone(),
        )));
    }

    fn recover_media_error(&mut self) {
        // The manifest is still good; ask the surface to play again.
        if self.url.is_some() {
            self.events.emit(ClientEvent::ManifestParsed);
        }
    }

    fn destroy(&mut self) {
        self.abort_task();
        self.url = None;
    }
}

impl Drop for HttpManifestClient {
    fn drop(&mut self) {
        self.abort_task();
    }
}

enum FetchError {
    Transport(String),
    NotAManifest,
}

async fn fetch_manifest(http: &Client, url: &str, config: &ClientConfig) -> Result<(), FetchError> {
    let response = http
        .get(url)
        .timeout(config.manifest_timeout)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    if body.trim_start().starts_with(MANIFEST_SIGNATURE) {
        Ok(())
    } else {
        Err(FetchError::NotAManifest)
    }
}

async fn load_manifest(http: Client, url: String, config: ClientConfig, events: EventSink) {
    let mut attempt: u32 = 0;
    loop {
        match fetch_manifest(&http, &url, &config).await {
            Ok(()) => {
                debug!(camera_id = %events.camera_id(), %url, "manifest parsed");
                events.emit(ClientEvent::ManifestParsed);
                return;
            }
            Err(FetchError::NotAManifest) => {
                events.emit(ClientEvent::Error {
                    class: StreamErrorClass::Other,
                    fatal: true,
                    details: format!("{url} is not an HLS playlist"),
                });
                return;
            }
            Err(FetchError::Transport(details)) if attempt >= config.manifest_max_retry => {
                warn!(camera_id = %events.camera_id(), %url, attempts = attempt + 1, %details, "manifest load failed");
                events.emit(ClientEvent::Error {
                    class: StreamErrorClass::Network,
                    fatal: true,
                    details,
                });
                return;
            }
            Err(FetchError::Transport(details)) => {
                attempt += 1;
                events.emit(ClientEvent::Error {
                    class: StreamErrorClass::Network,
                    fatal: false,
                    details,
                });
                tokio::time::sleep(config.manifest_retry_delay).await;
            }
        }
    }
}
