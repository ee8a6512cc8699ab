//! Model loading with a deadline

use std::time::Duration;

use super::scene::SceneNode;
use super::AssetError;
use crate::core::config::{AssetOptions, AssetOrientation};
use crate::traits::AssetLoader;

/// Builds the node installed when the model cannot be loaded
pub type FallbackFactory = Box<dyn FnOnce() -> SceneNode + Send>;

/// How a single model load is performed
pub struct LoadOptions {
    pub timeout: Duration,
    pub orientation: AssetOrientation,
    /// Defaults to a sphere sized by the render profile
    pub fallback: Option<FallbackFactory>,
}

impl LoadOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            orientation: AssetOrientation::default(),
            fallback: None,
        }
    }

    pub fn with_orientation(mut self, orientation: AssetOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: FnOnce() -> SceneNode + Send + 'static,
    {
        self.fallback = Some(Box::new(fallback));
        self
    }
}

impl From<&AssetOptions> for LoadOptions {
    fn from(options: &AssetOptions) -> Self {
        Self::new(Duration::from_millis(options.timeout_ms)).with_orientation(options.orientation)
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("timeout", &self.timeout)
            .field("orientation", &self.orientation)
            .field("custom_fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Run a loader, turning an overrun into [`AssetError::AssetLoadTimeout`]
pub async fn load_with_timeout(
    loader: &dyn AssetLoader,
    url: &str,
    timeout: Duration,
) -> Result<SceneNode, AssetError> {
    match tokio::time::timeout(timeout, loader.load(url)).await {
        Ok(result) => result,
        Err(_) => Err(AssetError::AssetLoadTimeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use once_cell::sync::Lazy;

    use crate::rendering::scene::{Geometry, ModelFormat, SceneNode};
    use crate::rendering::AssetError;
    use crate::traits::AssetLoader;

    /// Shared async HTTP client for model downloads
    static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
        reqwest::Client::builder()
            .user_agent(concat!("geoanchor/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    });

    /// Downloads model files and hands the encoded bytes to the surface
    #[derive(Debug, Clone, Copy, Default)]
    pub struct HttpAssetLoader;

    impl HttpAssetLoader {
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl AssetLoader for HttpAssetLoader {
        async fn load(&self, url: &str) -> Result<SceneNode, AssetError> {
            let failed = |reason: String| AssetError::AssetLoadFailed {
                url: url.to_string(),
                reason,
            };

            let response = HTTP_CLIENT
                .get(url)
                .send()
                .await
                .map_err(|e| failed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(failed(format!("HTTP {}", status)));
            }

            let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
            if bytes.is_empty() {
                return Err(failed("empty response body".into()));
            }

            log::debug!("downloaded {} bytes from {}", bytes.len(), url);

            let name = url
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .unwrap_or("model");

            Ok(SceneNode::new(name).with_geometry(Geometry::Encoded {
                format: ModelFormat::from_url(url),
                bytes: bytes.to_vec(),
            }))
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpAssetLoader;
