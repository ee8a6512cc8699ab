use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::rendering::scene::SceneNode;
use crate::rendering::AssetError;
use crate::traits::AssetLoader;

#[derive(Debug, Clone)]
enum Behavior {
    Succeed(SceneNode),
    Fail(String),
    Hang,
    Delay(Duration, SceneNode),
}

/// Handle on the number of loads a [`StaticAssetLoader`] served
#[derive(Debug, Clone)]
pub struct LoadCounter(Arc<AtomicUsize>);

impl LoadCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Asset loader with a scripted outcome
#[derive(Debug, Clone)]
pub struct StaticAssetLoader {
    behavior: Behavior,
    loads: Arc<AtomicUsize>,
}

impl StaticAssetLoader {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(node: SceneNode) -> Self {
        Self::with(Behavior::Succeed(node))
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::with(Behavior::Fail(reason.into()))
    }

    /// Never resolves
    pub fn hang() -> Self {
        Self::with(Behavior::Hang)
    }

    pub fn delayed(delay: Duration, node: SceneNode) -> Self {
        Self::with(Behavior::Delay(delay, node))
    }

    pub fn load_counter(&self) -> LoadCounter {
        LoadCounter(Arc::clone(&self.loads))
    }
}

#[async_trait]
impl AssetLoader for StaticAssetLoader {
    async fn load(&self, url: &str) -> Result<SceneNode, AssetError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(node) => Ok(node.clone()),
            Behavior::Fail(reason) => Err(AssetError::AssetLoadFailed {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            Behavior::Hang => {
                futures::future::pending::<()>().await;
                Err(AssetError::AssetLoadFailed {
                    url: url.to_string(),
                    reason: "abandoned".into(),
                })
            }
            Behavior::Delay(delay, node) => {
                tokio::time::sleep(*delay).await;
                Ok(node.clone())
            }
        }
    }
}
