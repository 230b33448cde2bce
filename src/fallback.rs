//! Offline book generator.
//!
//! Builds a complete, deterministic book from templates when the provider
//! is unavailable: templated prose in the requested language and SVG
//! placeholder illustrations embedded as `data:` URIs.

use crate::book::{Book, BookMetadata, GenerationRequest, PAGE_COUNT};
use crate::utils::{capitalize_first, escape_markup, truncate_chars};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Prompt used when the request carries none.
const DEFAULT_PROMPT: &str = "a brave young explorer discovering a hidden world";

/// Title used when the prompt is too short to make one.
const DEFAULT_TITLE: &str = "A Magical Adventure";

/// Gradient stops for placeholder images.
const PALETTES: [[&str; 3]; 4] = [
    ["#FFDFC8", "#FF9AA2", "#FFB7B2"],
    ["#D9F4FF", "#A0E7E5", "#B4F8C8"],
    ["#FFF3B0", "#FFCE6D", "#F6A6B2"],
    ["#E5E0FF", "#C4C1E0", "#A0C4FF"],
];

/// Story opener and closing line for one language.
struct LanguageLines {
    name: &'static str,
    opener: &'static str,
    closer: &'static str,
}

const LANGUAGES: [LanguageLines; 6] = [
    LanguageLines {
        name: "English",
        opener: "Once upon a time",
        closer: "Together they discovered that kindness makes every adventure brighter.",
    },
    LanguageLines {
        name: "Spanish",
        opener: "Érase una vez",
        closer: "Juntos descubrieron que la bondad hace cada aventura más brillante.",
    },
    LanguageLines {
        name: "French",
        opener: "Il était une fois",
        closer: "Ensemble, ils découvrirent que la gentillesse rend chaque aventure plus lumineuse.",
    },
    LanguageLines {
        name: "German",
        opener: "Es war einmal",
        closer: "Gemeinsam entdeckten sie, dass Freundlichkeit jedes Abenteuer heller macht.",
    },
    LanguageLines {
        name: "Hindi",
        opener: "किसी समय की बात है",
        closer: "साथ मिलकर उन्होंने सीखा कि दया हर रोमांच को उज्ज्वल बनाती है।",
    },
    LanguageLines {
        name: "Gujarati",
        opener: "એક વખતની વાત છે",
        closer: "સાથે મળીને તેમણે શીખ્યું કે દયા દરેક સાહસને ઝગમગતું બનાવે છે.",
    },
];

/// Writing tone per grade level, 1 through 5.
const GRADE_TONES: [(&str, &str); 5] = [
    ("1", "short, playful sentences with gentle rhymes"),
    ("2", "simple sentences filled with curiosity and friendship"),
    ("3", "warm storytelling with a dash of adventure and humour"),
    ("4", "imaginative scenes with lively dialogue and problem solving"),
    ("5", "rich descriptions, thoughtful emotions, and inspiring lessons"),
];

/// Story beats for the first seven pages; the eighth is the closing line.
const BEATS: [&str; PAGE_COUNT - 1] = [
    "meets a surprising friend who understands their dreams",
    "follows sparkling clues that flutter in the air",
    "faces a puzzle that needs courage and creativity",
    "listens to the whispers of the wind for gentle guidance",
    "shares a laugh that echoes like chimes through the trees",
    "helps someone in need and feels their heart glow",
    "sees the path ahead sparkle with possibilities",
];

fn language_lines(language: &str) -> &'static LanguageLines {
    LANGUAGES
        .iter()
        .find(|l| l.name == language)
        .unwrap_or(&LANGUAGES[0])
}

fn grade_tone(grade: &str) -> &'static str {
    GRADE_TONES
        .iter()
        .find(|(g, _)| *g == grade)
        .map(|(_, tone)| *tone)
        .unwrap_or(GRADE_TONES[2].1)
}

fn fallback_title(prompt: &str) -> String {
    if prompt.chars().count() > 3 {
        let title = capitalize_first(prompt);
        title.strip_suffix('.').unwrap_or(&title).to_string()
    } else {
        DEFAULT_TITLE.to_string()
    }
}

/// Builds a complete offline book for the request.
///
/// Always returns exactly [`PAGE_COUNT`] pages and page images.
pub fn build_fallback_book(request: &GenerationRequest) -> Book {
    let prompt = match request.prompt_text() {
        "" => DEFAULT_PROMPT,
        p => p,
    };
    let language = request.language();
    let lines = language_lines(language);
    let tone = grade_tone(request.grade());
    let title = fallback_title(prompt);

    let summary = format!(
        "{}, a story about {}. Written with {}.",
        lines.opener, prompt, tone
    );

    let story: Vec<String> = BEATS
        .iter()
        .copied()
        .chain(std::iter::once(lines.closer))
        .map(|beat| format!("{}! Our hero inspired by {} {}", lines.opener, prompt, beat))
        .collect();

    let cover_image_url = create_fallback_image(&title, request.art_style(), 1792, 1024, 0);
    let page_image_urls = story
        .iter()
        .enumerate()
        .map(|(i, page)| create_fallback_image(&format!("Page {}", i + 1), page, 1024, 1024, i + 1))
        .collect();
    let end_page_image_url = create_fallback_image("The End", lines.closer, 1024, 1024, 5);

    Book {
        title,
        story,
        cover_image_url,
        page_image_urls,
        end_page_image_url,
        metadata: Some(BookMetadata {
            fallback: true,
            language: language.to_string(),
        }),
        summary: Some(summary),
    }
}

/// Renders a gradient placeholder illustration as a base64 SVG data URI.
pub fn create_fallback_image(
    title: &str,
    body: &str,
    width: u32,
    height: u32,
    palette_index: usize,
) -> String {
    let palette = PALETTES[palette_index % PALETTES.len()];
    let safe_title = escape_markup(truncate_chars(title, 80));
    let safe_body = escape_markup(truncate_chars(body, 160));

    let w = f64::from(width);
    let h = f64::from(height);
    let title_size = (w / 18.0).max(32.0).round();
    let body_size = (w / 26.0).max(24.0).round();
    let radius_large = (w.max(h) * 0.06).round();
    let radius_small = (w.max(h) * 0.05).round();

    let svg = format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}">
  <defs>
    <linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="{c0}" />
      <stop offset="70%" stop-color="{c1}" />
      <stop offset="100%" stop-color="{c2}" />
    </linearGradient>
  </defs>
  <rect width="{width}" height="{height}" fill="url(#bg)" rx="48" ry="48" />
  <g fill="#3c2a4d" font-family="'Baloo 2', 'Comic Sans MS', sans-serif" text-anchor="middle">
    <text x="{cx}" y="{title_y}" font-size="{title_size}" font-weight="700">{safe_title}</text>
    <text x="{cx}" y="{body_y}" font-size="{body_size}" opacity="0.75">{safe_body}</text>
  </g>
  <circle cx="{c1x}" cy="{c1y}" r="{radius_large}" fill="#ffffff55" />
  <circle cx="{c2x}" cy="{c2y}" r="{radius_small}" fill="#ffffff33" />
  <path d="M{p0x} {p0y} Q{p1x} {p1y} {p2x} {p2y} T{p3x} {p0y}" stroke="#ffffff55" stroke-width="14" fill="none" stroke-linecap="round" />
</svg>"##,
        c0 = palette[0],
        c1 = palette[1],
        c2 = palette[2],
        cx = w / 2.0,
        title_y = h / 2.0 - 40.0,
        body_y = h / 2.0 + 40.0,
        c1x = (w * 0.2).round(),
        c1y = (h * 0.8).round(),
        c2x = (w * 0.8).round(),
        c2y = (h * 0.2).round(),
        p0x = (w * 0.2).round(),
        p0y = (h * 0.25).round(),
        p1x = (w * 0.3).round(),
        p1y = (h * 0.05).round(),
        p2x = (w * 0.5).round(),
        p2y = (h * 0.18).round(),
        p3x = (w * 0.8).round(),
    );

    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}
