//! Prompt templates for every provider call the pipeline makes.

use crate::book::{PAGE_COUNT, Storyboard, StoryResult};

const GRADE_LEVEL_GUIDE: &str = "\
**Grade Level Adaptations:**
- **1st-2nd Grade:** Write in the style of authors like Dr. Seuss or Eric Carle. Use simple, rhyming language, short sentences, and clear, foundational themes like friendship or discovery.
- **3rd-4th Grade:** Write in the style of authors like Roald Dahl or Beverly Cleary. Use more complex sentences, richer vocabulary, introduce humor, and explore themes of overcoming challenges or understanding others.
- **5th Grade & Up:** Write in the style of authors like C.S. Lewis or J.K. Rowling. Use sophisticated language, complex sentence structures, metaphors, and allegories. Tackle deeper themes like courage, morality, and the complexities of life.";

/// Detailed descriptions for the art styles the client offers.
static STYLE_DESCRIPTIONS: [(&str, &str); 8] = [
    (
        "Studio Ghibli",
        "AUTHENTIC Studio Ghibli animation style: soft watercolor painted backgrounds with incredible depth, gentle hand-painted textures, characters with large expressive eyes and rosy cheeks, flowing natural hair movement, detailed clothing folds, warm golden lighting filtering through scenes, lush environmental details (grass blades, tree leaves, clouds), nostalgic peaceful atmosphere, painterly brushstrokes visible, color palette of soft pastels with rich accent colors, characters integrated naturally into detailed backgrounds, dreamlike quality reminiscent of My Neighbor Totoro, Spirited Away, and Kiki's Delivery Service",
    ),
    (
        "Hayao Miyazaki style",
        "Hayao Miyazaki's distinctive animation aesthetic: incredibly detailed natural environments (forests, meadows, skies), magical realism elements seamlessly integrated, characters with expressive large eyes and gentle features, dynamic cloud formations, glowing atmospheric lighting, sense of movement in hair and clothing, organic flowing shapes, rich color gradients, hand-painted watercolor backgrounds, depth through multiple layers, whimsical yet grounded character designs, environmental storytelling through background details, sense of wonder and adventure",
    ),
    (
        "Midcentury American cartoon",
        "1950s-60s midcentury American cartoon style: bold flat colors without gradients, clean geometric simplified shapes, limited color palette (primary colors dominant), thick black outlines around all elements, minimalist backgrounds with simple patterns, characters with simple rounded features, retro typography influences, sharp angular design elements, vintage advertising aesthetic, Chuck Jones / UPA animation influence, stylized proportions, graphic design sensibility",
    ),
    (
        "Amar Chitra Katha",
        "Traditional Indian Amar Chitra Katha comic book illustration style: vibrant saturated colors, detailed traditional Indian clothing (saris, dhotis, jewelry), expressive faces with defined features, narrative comic panel composition, cultural and mythological visual elements, decorative borders and patterns, rich skin tones, detailed architecture (temples, palaces), dramatic poses and gestures, clear linework with color fills, educational illustration quality, authentic Indian cultural representation",
    ),
    (
        "Chacha Chaudhary",
        "Chacha Chaudhary Indian comic style: simple bold line art, thick black outlines, bright primary colors (red, yellow, blue), comic book panel layout, expressive cartoon faces with exaggerated features, simple backgrounds, Indian cultural elements (turbans, traditional clothing, Indian settings), humorous visual storytelling, clear readable compositions, cartoon proportions, retro Indian comic aesthetic from the 1970s-80s",
    ),
    (
        "xkcd Comics",
        "xkcd minimalist stick figure comic style: extremely simple black line drawings on pure white background, stick figure characters made of basic lines and circles, no color except black lines, no shading or gradients, clean geometric shapes, clever visual metaphors, mathematical or scientific diagram influence, minimalist environment suggestions, focus on ideas and concepts over visual detail, Randall Munroe's distinctive simple aesthetic",
    ),
    (
        "Old cartoon",
        "Vintage 1930s-1940s classic animation style: rubber hose animation limbs (bendy, flowing), pie-cut eyes (wedge-shaped), white gloves on hands, exaggerated expressions and movements, grainy film texture, limited color palette (sepia tones or early Technicolor), hand-drawn cel animation aesthetic with visible ink lines, bouncy personality poses, vintage cartoon physics, classic Disney/Fleischer Studios influence, nostalgic aged appearance",
    ),
    (
        "Indian Warli art",
        "Authentic Indian Warli tribal art style: white figures on earthy brown/terracotta background, stick figure humans and animals made of simple circles, triangles, and lines, repetitive geometric patterns, circular dance formations (tarpa dance), ritualistic compositions, folk art simplicity, no perspective or depth, flat two-dimensional, symbolic representation over realism, tribal cultural storytelling, traditional Indian rural life themes, minimalist geometric aesthetic",
    ),
];

/// Returns the detailed description for an art style, defaulting to Studio Ghibli.
pub fn style_description(art_style: &str) -> &'static str {
    STYLE_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == art_style)
        .or_else(|| STYLE_DESCRIPTIONS.first())
        .map(|(_, description)| *description)
        .unwrap_or_default()
}

/// System prompt for the storyboard call.
pub fn storyboard_system_prompt(language: &str, grade: &str) -> String {
    format!(
        "You are a children's book editor planning an illustrated picture book for a grade {grade} reader.
Plan a unique, captivating story of exactly {PAGE_COUNT} pages.
{GRADE_LEVEL_GUIDE}
**CRITICAL INSTRUCTIONS:**
1.  Create a compelling title.
2.  Write exactly {PAGE_COUNT} short page summaries, one per page, in story order.
3.  Describe the main character's appearance, age and clothing in one sentence.
4.  Name the story's central theme in a few words.
5.  Write everything in {language}.
6.  You MUST return a valid JSON object with keys \"title\", \"pages\", \"characterDescription\" and \"theme\"."
    )
}

/// System prompt for the prose call.
///
/// Without a storyboard the model also describes the main character.
pub fn story_system_prompt(language: &str, grade: &str, with_storyboard: bool) -> String {
    let mut prompt = format!(
        "You are a world-class children's book author. Your task is to write a unique, captivating, and emotionally resonant {PAGE_COUNT}-page story. You must emulate the masters of children's literature, adapting your style to the requested grade level. The reader is in grade {grade}.
{GRADE_LEVEL_GUIDE}
**CRITICAL INSTRUCTIONS:**
1.  Create a compelling title for the story.
2.  The story MUST be exactly {PAGE_COUNT} pages long. Do not provide less or more.
3.  The story must be written in {language}.
4.  You MUST return a valid JSON object with two keys: \"title\" and \"story\".
5.  ABSOLUTELY DO NOT use placeholder text like \"-1\" or fail to complete a page. Each of the {PAGE_COUNT} strings in the 'story' array must be a complete paragraph for that page."
    );

    if with_storyboard {
        prompt.push_str("\n6.  Follow the storyboard page by page: page N of the story expands storyboard page N.");
    } else {
        prompt.push_str(
            "\n6.  Also create a brief character description for the main character that will be used for consistent illustrations.\n7.  Return JSON with keys: \"title\", \"story\", \"characterDescription\"",
        );
    }

    prompt
}

/// User turn for the prose call.
pub fn story_user_prompt(idea: &str, storyboard: Option<&Storyboard>) -> String {
    match storyboard {
        None => format!("The story idea is: {}", idea),
        Some(board) => {
            let pages = board
                .pages
                .iter()
                .enumerate()
                .map(|(i, page)| format!("Page {}: {}", i + 1, page))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "The story idea is: {}\nWorking title: {}\nTheme: {}\nStoryboard:\n{}",
                idea, board.title, board.theme, pages
            )
        }
    }
}

/// System prompt for the character description call.
pub fn character_system_prompt(story: &StoryResult) -> String {
    let story_json = serde_json::json!({ "title": story.title, "story": story.story });
    format!(
        "Based on the following children's story, create a single, detailed character description for the main protagonist. Describe their appearance, gender, age, and clothing in a consistent manner. This description will be used to generate all illustrations. Output ONLY the description as a single paragraph. Story: {}",
        story_json
    )
}

/// User turn for the character description call.
pub const CHARACTER_USER_PROMPT: &str = "Generate the character description.";

/// System prompt for the "art director" call that writes an image prompt.
///
/// `cover_title` selects the cover variant. Art styles mentioning Ghibli
/// get a dedicated variant.
pub fn art_director_prompt(art_style: &str, character: &str, cover_title: Option<&str>) -> String {
    let ghibli = art_style.to_lowercase().contains("ghibli");

    match (cover_title, ghibli) {
        (Some(title), false) => format!(
            "You are an expert art director creating a book cover illustration. Create a rich, detailed, and imaginative image prompt for an AI model. The prompt must generate a vibrant, friendly, and colorful book cover in a playful cartoon style. CRITICAL: The image MUST prominently display the title text \"{title}\" as readable text integrated into the cover design - this could be on a sign, banner, building, or stylized lettering that fits the scene. The title text should be large, clear, and easily readable. The requested art style is a suggestion, but the final image MUST be a cartoon. The main character MUST match this description: \"{character}\". Art Style: {art_style}."
        ),
        (Some(title), true) => format!(
            "You are an expert art director specializing in the Studio Ghibli aesthetic for a children's book cover. Create a rich, detailed, and imaginative image prompt that captures a playful cartoon style inspired by Ghibli. CRITICAL: The image MUST prominently display the title text \"{title}\" as readable text integrated into the cover design - this could be on a wooden sign, magical banner, or stylized lettering that fits the Ghibli aesthetic. The title text should be large, clear, and easily readable. Emphasize lush, painterly backgrounds, whimsical scenery, and the interplay of light and nature. The final image MUST be a cartoon that evokes the feeling of a Ghibli film. Art Style: {art_style}. The main character MUST match this description: \"{character}\"."
        ),
        (None, false) => format!(
            "You are an expert art director creating illustrations for a children's book. Create a rich, detailed, and imaginative image prompt for an AI model. The prompt must generate a vibrant, friendly, and colorful image in a playful cartoon style. It should capture the essence of the following text. Focus on scene, characters, emotion, and lighting. The final output should be a single, descriptive paragraph. The requested art style is a suggestion, but the final image MUST be a cartoon. The main character MUST match this description: \"{character}\". Art Style: {art_style}."
        ),
        (None, true) => format!(
            "You are an expert art director specializing in the Studio Ghibli aesthetic for a children's book. Create a rich, detailed, and imaginative image prompt that captures the provided text in a playful cartoon style inspired by Ghibli. Emphasize lush, painterly backgrounds, whimsical scenery, and the interplay of light and nature. The final image MUST be a cartoon that evokes the feeling of a Ghibli film. The final output must be a single, descriptive paragraph. Art Style: {art_style}. The main character MUST match this description: \"{character}\"."
        ),
    }
}

/// User turn for the "art director" call.
pub fn art_director_user_prompt(text: &str) -> String {
    format!("Text: \"{}\"", text)
}

/// Scene text for the cover illustration.
pub fn cover_scene(title: &str) -> String {
    format!("A beautiful book cover for a story titled \"{}\"", title)
}

/// Scene text for the closing illustration.
pub fn end_page_scene(title: &str) -> String {
    format!(
        "A beautiful \"The End\" illustration that matches the theme and style of the story \"{}\". Show a magical, whimsical \"The End\" sign or text integrated naturally into a scene that reflects the story's mood and setting.",
        title
    )
}

/// System prompt for a structured `{style, characters, scene}` image prompt.
pub fn structured_image_system_prompt(art_style: &str, character: &str) -> String {
    let description = style_description(art_style);
    format!(
        "You are a MASTER art director who PERFECTLY replicates artistic styles for children's books.

CRITICAL STYLE REQUIREMENT: The image MUST authentically match the \"{art_style}\" style. Study this description and follow it EXACTLY:

{description}

Create a structured JSON prompt with three components:

1. \"style\": START with \"{art_style} style:\" then describe the visual style using the specifications above. Include specific details about colors, linework, textures, lighting, and composition that define this exact style.

2. \"characters\": Describe ALL characters in the scene with PRECISE age-appropriate details. If adults are present, they should be CLEARLY adults (mature faces, adult proportions, taller, parental age). If children are present, specify their approximate age and childlike proportions. ALWAYS include: \"{character}\" Specify exact ages, proportions, facial features, clothing, and expressions.

3. \"scene\": Describe the setting, composition, mood, lighting, specific actions, and background elements in the \"{art_style}\" aesthetic.

Return ONLY valid JSON with keys: style, characters, scene."
    )
}

/// User turn for a structured image prompt.
pub fn structured_image_user_prompt(
    art_style: &str,
    text: &str,
    cover_title: Option<&str>,
) -> String {
    match cover_title {
        Some(title) => format!(
            "Create a stunning book cover in authentic \"{}\" style for \"{}\": {}",
            art_style, title, text
        ),
        None => format!(
            "Create an illustration in pure \"{}\" style for: {}",
            art_style, text
        ),
    }
}
