//! Storybook - illustrated children's book generator.
//!
//! This library provides functionality for:
//! - Generating eight-page illustrated stories through the Venice.ai text and image API
//! - Restricting image generation to an allow-list of safe models
//! - Building complete offline books when no API key is configured
//! - Exporting books as standalone, printable HTML
//! - Serving all of the above over a JSON HTTP API

pub mod book;
pub mod config;
pub mod console;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod render;
pub mod safety;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use book::{Book, GenerationRequest, IllustrationRequest, StoryResult, Storyboard};
pub use config::Config;
pub use console::Console;
pub use error::{ConfigError, GenerationError, ProviderError, RenderError, ValidationError};
pub use pipeline::BookPipeline;
pub use provider::{StoryProvider, VeniceClient};
pub use render::{AssetFetcher, RenderOptions};
pub use server::AppState;
