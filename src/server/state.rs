use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::ProviderError;
use crate::pipeline::BookPipeline;
use crate::provider::{StoryProvider, VeniceClient};
use crate::render::{AssetFetcher, ImageFetcher};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Text and image backend. `None` in offline mode.
    pub provider: Option<Arc<dyn StoryProvider>>,
    /// Downloads images for HTML export.
    pub fetcher: Arc<dyn AssetFetcher>,
}

impl AppState {
    /// Builds the state for a configuration, connecting to Venice.ai when an
    /// API key is set.
    pub fn from_config(config: Config) -> Result<Self, ProviderError> {
        let provider: Option<Arc<dyn StoryProvider>> = if config.is_online() {
            Some(Arc::new(VeniceClient::new(config.api.clone())?))
        } else {
            None
        };

        let fetcher = ImageFetcher::new(
            Duration::from_secs(config.api.timeout_secs),
            config.render.max_image_bytes,
        );

        Ok(Self {
            config: Arc::new(config),
            provider,
            fetcher: Arc::new(fetcher),
        })
    }

    /// True when no provider is configured.
    pub fn is_offline(&self) -> bool {
        self.provider.is_none()
    }

    /// A pipeline over the configured provider, if there is one.
    pub fn pipeline(&self) -> Option<BookPipeline> {
        self.provider.as_ref().map(|provider| {
            BookPipeline::new(
                Arc::clone(provider),
                &self.config.api,
                self.config.generation.clone(),
            )
        })
    }
}
