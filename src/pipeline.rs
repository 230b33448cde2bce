//! Book generation pipeline.
//!
//! Sequences the provider calls that turn a story idea into a book:
//! storyboard, prose, character description, then ten illustrations
//! generated concurrently. Text calls ask for JSON output and retry once
//! without it if the model doesn't support that mode.

use crate::book::{
    Book, DEFAULT_ART_STYLE, GenerationRequest, Illustration, IllustrationRequest, PAGE_COUNT,
    StoryResult, Storyboard, StructuredPrompt,
};
use crate::config::{ApiConfig, GenerationConfig};
use crate::error::{GenerationError, ProviderError};
use crate::extract::parse_model_json;
use crate::prompts;
use crate::provider::{ChatRequest, StoryProvider};
use crate::safety::{self, ImageParams};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Character used when a single illustration is requested without one.
const DEFAULT_CHARACTER: &str = "a friendly children's book character";

/// Title used for a single cover illustration requested without one.
const DEFAULT_COVER_TITLE: &str = "Story";

/// Which slot of the book an illustration fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    Cover,
    Page(usize),
    End,
}

/// One illustration to generate.
#[derive(Debug, Clone)]
struct ImageJob {
    role: PageRole,
    text: String,
    size: String,
}

/// Orchestrates provider calls to build a book.
pub struct BookPipeline {
    provider: Arc<dyn StoryProvider>,
    text_model: String,
    prompt_model: String,
    settings: GenerationConfig,
}

impl BookPipeline {
    /// Create a new pipeline.
    pub fn new(
        provider: Arc<dyn StoryProvider>,
        api_config: &ApiConfig,
        settings: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            text_model: api_config.text_model.clone(),
            prompt_model: api_config.prompt_model.clone(),
            settings,
        }
    }

    /// Generates a complete illustrated book.
    pub async fn generate_book(
        &self,
        request: &GenerationRequest,
    ) -> Result<Book, GenerationError> {
        info!(
            prompt = request.prompt_text(),
            provider = self.provider.name(),
            "Starting book generation"
        );

        let storyboard = self.storyboard(request).await?;
        let mut story = self.write_story(request, Some(&storyboard)).await?;
        story.character_description = self.describe_character(&story, &storyboard).await?;

        let images = self.illustrate(request, &story).await?;
        info!(title = %story.title, "Book generation complete");

        Ok(Book {
            title: story.title,
            story: story.story,
            cover_image_url: images.cover,
            page_image_urls: images.pages,
            end_page_image_url: images.end,
            metadata: None,
            summary: None,
        })
    }

    /// Plans the book page by page.
    pub async fn storyboard(
        &self,
        request: &GenerationRequest,
    ) -> Result<Storyboard, GenerationError> {
        info!(model = self.text_model_for(request), "Generating storyboard");

        let chat = ChatRequest::new(
            self.text_model_for(request),
            prompts::storyboard_system_prompt(request.language(), request.grade()),
            format!("The story idea is: {}", request.prompt_text()),
        );
        let storyboard: Storyboard = self.complete_json(chat).await?;

        if storyboard.pages.len() != PAGE_COUNT {
            warn!(pages = storyboard.pages.len(), "Storyboard page count differs from book length");
        }
        Ok(storyboard)
    }

    /// Writes the final prose.
    ///
    /// With a storyboard, each page expands the matching storyboard page.
    /// Without one the model writes the story directly and also returns a
    /// character description.
    pub async fn write_story(
        &self,
        request: &GenerationRequest,
        storyboard: Option<&Storyboard>,
    ) -> Result<StoryResult, GenerationError> {
        info!(model = self.text_model_for(request), "Writing story text");

        let chat = ChatRequest::new(
            self.text_model_for(request),
            prompts::story_system_prompt(request.language(), request.grade(), storyboard.is_some()),
            prompts::story_user_prompt(request.prompt_text(), storyboard),
        );
        let mut story: StoryResult = self.complete_json(chat).await?;

        story.story.retain(|page| !page.trim().is_empty());
        if story.story.len() != PAGE_COUNT {
            return Err(GenerationError::IncompleteStory {
                expected: PAGE_COUNT,
                actual: story.story.len(),
            });
        }

        if let Some(board) = storyboard {
            if story.title.trim().is_empty() {
                story.title = board.title.clone();
            }
            if story.character_description.trim().is_empty() {
                story.character_description = board.character_description.clone();
            }
        }

        info!(title = %story.title, "Story text generated");
        Ok(story)
    }

    /// Derives one consistent description of the protagonist.
    pub async fn describe_character(
        &self,
        story: &StoryResult,
        storyboard: &Storyboard,
    ) -> Result<String, GenerationError> {
        info!("Generating consistent character description");

        let chat = ChatRequest::new(
            self.prompt_model.as_str(),
            prompts::character_system_prompt(story),
            prompts::CHARACTER_USER_PROMPT,
        );
        let description = self.provider.chat(&chat).await?.trim().to_string();

        if description.is_empty() {
            warn!("Empty character description, using the storyboard's");
            let planned = [&story.character_description, &storyboard.character_description]
                .into_iter()
                .find(|d| !d.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_CHARACTER.to_string());
            return Ok(planned);
        }

        debug!(character = %description, "Character description");
        Ok(description)
    }

    /// Generates the cover, one image per page and the end page concurrently.
    pub async fn illustrate(
        &self,
        request: &GenerationRequest,
        story: &StoryResult,
    ) -> Result<BookImages, GenerationError> {
        let image_model = safety::enforce_safe_image_model(request.image_model.as_deref());
        info!(model = image_model, "Generating illustrations");

        let jobs = self.image_jobs(story);
        let urls = try_join_all(jobs.iter().map(|job| {
            self.illustrate_page(
                job,
                request.art_style(),
                image_model,
                &story.character_description,
                &story.title,
            )
        }))
        .await?;

        BookImages::from_urls(urls)
    }

    fn image_jobs(&self, story: &StoryResult) -> Vec<ImageJob> {
        let cover = ImageJob {
            role: PageRole::Cover,
            text: prompts::cover_scene(&story.title),
            size: self.settings.cover_size.clone(),
        };
        let pages = story.story.iter().enumerate().map(|(i, text)| ImageJob {
            role: PageRole::Page(i + 1),
            text: text.clone(),
            size: self.settings.page_size.clone(),
        });
        let end = ImageJob {
            role: PageRole::End,
            text: prompts::end_page_scene(&story.title),
            size: self.settings.page_size.clone(),
        };

        std::iter::once(cover)
            .chain(pages)
            .chain(std::iter::once(end))
            .collect()
    }

    /// Writes an image prompt for one slot and generates the image.
    async fn illustrate_page(
        &self,
        job: &ImageJob,
        art_style: &str,
        image_model: &str,
        character: &str,
        title: &str,
    ) -> Result<String, GenerationError> {
        let cover_title = (job.role == PageRole::Cover).then_some(title);
        let chat = ChatRequest::new(
            self.prompt_model.as_str(),
            prompts::art_director_prompt(art_style, character, cover_title),
            prompts::art_director_user_prompt(&job.text),
        );
        let image_prompt = self.provider.chat(&chat).await?;

        let raw_limit = safety::prompt_character_limit(image_model);
        let limit = raw_limit.saturating_sub(self.settings.prompt_limit_buffer).max(1);
        let prompt = self.fit_prompt(&image_prompt, limit, image_model, raw_limit);

        let request = safety::build_safe_image_request(
            ImageParams {
                prompt,
                size: job.size.clone(),
            },
            Some(image_model),
        );
        let url = self.provider.generate_image(&request).await?;
        debug!(role = ?job.role, "Illustration generated");
        Ok(url)
    }

    /// Generates a single illustration from a structured `{style, characters, scene}` prompt.
    pub async fn structured_illustration(
        &self,
        request: &IllustrationRequest,
    ) -> Result<Illustration, GenerationError> {
        let art_style = request
            .art_style
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ART_STYLE);
        let character = request
            .character_description
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CHARACTER);
        let cover_title = request
            .is_cover
            .then(|| request.title.as_deref().unwrap_or(DEFAULT_COVER_TITLE));

        info!(art_style, cover = request.is_cover, "Generating structured illustration");

        let chat = ChatRequest::new(
            self.prompt_model.as_str(),
            prompts::structured_image_system_prompt(art_style, character),
            prompts::structured_image_user_prompt(art_style, request.text_content(), cover_title),
        );
        let structured_prompt: StructuredPrompt = self.complete_json(chat).await?;

        let image_model = safety::enforce_safe_image_model(request.image_model.as_deref());
        let limit = safety::prompt_character_limit(image_model);
        let final_prompt =
            self.fit_prompt(&structured_prompt.combined(), limit, image_model, limit);

        let size = if request.is_cover {
            &self.settings.cover_size
        } else {
            &self.settings.page_size
        };
        let image_request = safety::build_safe_image_request(
            ImageParams {
                prompt: final_prompt.clone(),
                size: size.clone(),
            },
            Some(image_model),
        );
        let image_url = self.provider.generate_image(&image_request).await?;
        info!("Structured illustration generated");

        Ok(Illustration {
            image_url,
            structured_prompt,
            final_prompt,
        })
    }

    fn fit_prompt(&self, prompt: &str, limit: usize, model: &str, model_limit: usize) -> String {
        let prompt = prompt.trim();
        let fitted = safety::truncate_prompt(prompt, limit);
        if fitted.len() < prompt.len() {
            warn!(limit, model, model_limit, "Truncating long image prompt");
        }
        fitted.to_string()
    }

    fn text_model_for<'a>(&'a self, request: &'a GenerationRequest) -> &'a str {
        request
            .text_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.text_model.as_str())
    }

    /// Runs a chat request in JSON mode and parses the reply.
    ///
    /// If the model rejects JSON mode, retries once without it and relies on
    /// fenced-block recovery.
    async fn complete_json<T: DeserializeOwned>(
        &self,
        request: ChatRequest,
    ) -> Result<T, GenerationError> {
        let json_request = request.json_mode();
        let first_attempt = self.provider.chat(&json_request).await;
        let content = match first_attempt {
            Ok(content) => content,
            Err(e) if e.rejects_response_format() => {
                warn!(
                    model = %json_request.model,
                    "Model does not support JSON response format, falling back to instruction-based parsing"
                );
                self.provider.chat(&json_request.without_format()).await?
            }
            Err(e) => return Err(e.into()),
        };

        parse_model_json(&content)
    }
}

/// Image references for one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookImages {
    pub cover: String,
    pub pages: Vec<String>,
    pub end: String,
}

impl BookImages {
    /// Splits `[cover, pages.., end]` as produced by the image jobs.
    fn from_urls(mut urls: Vec<String>) -> Result<Self, GenerationError> {
        if urls.len() < 2 {
            return Err(GenerationError::Provider(ProviderError::EmptyResponse(
                "Missing cover or end page illustration".to_string(),
            )));
        }
        let end = urls.pop().unwrap_or_default();
        let cover = urls.remove(0);
        Ok(Self {
            cover,
            pages: urls,
            end,
        })
    }
}
