//! Request and result types shared by the pipeline, the fallback and the
//! HTTP layer. Field names follow the JSON the browser client exchanges.

use crate::error::ValidationError;
use crate::safety;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of story pages in every book.
pub const PAGE_COUNT: usize = 8;

/// Grade level used when the client sends none.
pub const DEFAULT_GRADE_LEVEL: &str = "3";

/// Language used when the client sends none.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Art style used when the client sends none.
pub const DEFAULT_ART_STYLE: &str = "Classic storybook";

/// A request to generate a full book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    pub prompt: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub grade_level: Option<String>,
    pub language: Option<String>,
    pub art_style: Option<String>,
    #[serde(alias = "model")]
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

impl GenerationRequest {
    /// Checks the prompt and the image model before any provider call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_prompt()?;
        if !safety::is_allowed_image_model(self.image_model.as_deref()) {
            return Err(ValidationError::UnsafeImageModel);
        }
        Ok(())
    }

    /// Checks only the prompt (text-only generation needs no image model).
    pub fn validate_prompt(&self) -> Result<(), ValidationError> {
        if self.prompt_text().is_empty() {
            return Err(ValidationError::MissingPrompt);
        }
        Ok(())
    }

    pub fn prompt_text(&self) -> &str {
        self.prompt.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn grade(&self) -> &str {
        non_blank(self.grade_level.as_deref()).unwrap_or(DEFAULT_GRADE_LEVEL)
    }

    pub fn language(&self) -> &str {
        non_blank(self.language.as_deref()).unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn art_style(&self) -> &str {
        non_blank(self.art_style.as_deref()).unwrap_or(DEFAULT_ART_STYLE)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `"3"` or `3` for fields the client may send either way.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(text) => text,
        Scalar::Number(number) => number.to_string(),
    }))
}

/// Per-page plan produced before the final prose.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Storyboard {
    pub title: String,
    pub pages: Vec<String>,
    pub character_description: String,
    pub theme: String,
}

/// Final prose for a book, without illustrations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoryResult {
    pub title: String,
    pub story: Vec<String>,
    pub character_description: String,
}

/// Marks a book built by the offline generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    pub fallback: bool,
    pub language: String,
}

/// The assembled book returned to the client.
///
/// Image references are remote URLs or `data:` URIs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub story: Vec<String>,
    pub cover_image_url: String,
    pub page_image_urls: Vec<String>,
    pub end_page_image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BookMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Book {
    /// True when the book came from the offline generator.
    pub fn is_fallback(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.fallback)
    }

    /// All image references: cover, pages, end page.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.cover_image_url.as_str())
            .chain(self.page_image_urls.iter().map(String::as_str))
            .chain(std::iter::once(self.end_page_image_url.as_str()))
    }
}

/// A request for a single illustration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IllustrationRequest {
    pub text: Option<String>,
    pub art_style: Option<String>,
    pub image_model: Option<String>,
    pub character_description: Option<String>,
    pub is_cover: bool,
    pub title: Option<String>,
}

impl IllustrationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text_content().is_empty() {
            return Err(ValidationError::MissingText);
        }
        if !safety::is_allowed_image_model(self.image_model.as_deref()) {
            return Err(ValidationError::UnsafeImageModel);
        }
        Ok(())
    }

    pub fn text_content(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Image prompt split into its three parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StructuredPrompt {
    pub style: String,
    pub characters: String,
    pub scene: String,
}

impl StructuredPrompt {
    /// Joins the parts into the prompt sent to the image model.
    pub fn combined(&self) -> String {
        format!(
            "Style: {}. Characters: {}. Scene: {}",
            self.style, self.characters, self.scene
        )
    }
}

/// Result of a single structured illustration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Illustration {
    pub image_url: String,
    pub structured_prompt: StructuredPrompt,
    pub final_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_model_alias() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{"prompt":"a fox","gradeLevel":"2","model":"llama-3.3-70b","imageModel":"hidream"}"#,
        )
        .unwrap();
        assert_eq!(req.text_model.as_deref(), Some("llama-3.3-70b"));
        assert_eq!(req.grade(), "2");
        assert_eq!(req.language(), DEFAULT_LANGUAGE);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_numeric_grade_level() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"a fox","gradeLevel":4}"#).unwrap();
        assert_eq!(req.grade(), "4");

        let req: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"a fox","gradeLevel":null}"#).unwrap();
        assert_eq!(req.grade(), DEFAULT_GRADE_LEVEL);

        assert!(serde_json::from_str::<GenerationRequest>(r#"{"gradeLevel":[3]}"#).is_err());
    }

    #[test]
    fn test_request_validation() {
        let mut req = GenerationRequest {
            prompt: Some("   ".to_string()),
            image_model: Some("qwen-image".to_string()),
            ..Default::default()
        };
        assert_eq!(req.validate(), Err(ValidationError::MissingPrompt));

        req.prompt = Some("a brave snail".to_string());
        req.image_model = Some("mystery-model".to_string());
        assert_eq!(req.validate(), Err(ValidationError::UnsafeImageModel));

        req.image_model = None;
        assert_eq!(req.validate(), Err(ValidationError::UnsafeImageModel));
        assert!(req.validate_prompt().is_ok());
    }

    #[test]
    fn test_book_serialization_omits_empty_metadata() {
        let book = Book {
            title: "T".to_string(),
            story: vec!["p".to_string()],
            cover_image_url: "c".to_string(),
            page_image_urls: vec!["p1".to_string()],
            end_page_image_url: "e".to_string(),
            metadata: None,
            summary: None,
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["coverImageUrl"], "c");
        assert_eq!(json["endPageImageUrl"], "e");
        assert!(json.get("metadata").is_none());
        assert_eq!(book.image_urls().collect::<Vec<_>>(), vec!["c", "p1", "e"]);
    }

    #[test]
    fn test_illustration_request_validation() {
        let req: IllustrationRequest =
            serde_json::from_str(r#"{"text":"","imageModel":"hidream"}"#).unwrap();
        assert_eq!(req.validate(), Err(ValidationError::MissingText));

        let req: IllustrationRequest =
            serde_json::from_str(r#"{"text":"a cat","imageModel":"hidream","isCover":true}"#)
                .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.is_cover);
    }

    #[test]
    fn test_structured_prompt_combined() {
        let prompt = StructuredPrompt {
            style: "Warli".to_string(),
            characters: "a girl".to_string(),
            scene: "a village".to_string(),
        };
        assert_eq!(
            prompt.combined(),
            "Style: Warli. Characters: a girl. Scene: a village"
        );
    }
}
