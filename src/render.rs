//! Standalone HTML export.
//!
//! Turns a [`Book`] into a single self-contained page: full-bleed cover,
//! one page per paragraph, and a closing page with a signature. Print CSS
//! lays pages out on A4 landscape so the browser can save a PDF.

use crate::book::Book;
use crate::error::{ProviderError, RenderError};
use crate::utils::{check_response_status, escape_markup};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::try_join_all;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, info};
use url::{Host, Url};

/// Content type assumed when a server doesn't send one.
const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Page colours for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub background: Rgb,
    pub border: Rgb,
    pub accent: Rgb,
}

/// Light yellow pages with a pink border.
pub const DEFAULT_PALETTE: Palette = Palette {
    name: "classic",
    background: Rgb(255, 255, 230),
    border: Rgb(255, 182, 193),
    accent: Rgb(255, 182, 193),
};

/// Themed palettes and the story words that select them.
static THEMED_PALETTES: [(&[&str], Palette); 4] = [
    (
        &["ocean", "sea", "wave", "fish", "whale", "mermaid", "river"],
        Palette {
            name: "ocean",
            background: Rgb(230, 245, 255),
            border: Rgb(100, 170, 220),
            accent: Rgb(60, 130, 200),
        },
    ),
    (
        &["forest", "tree", "wood", "leaf", "garden", "jungle"],
        Palette {
            name: "forest",
            background: Rgb(235, 250, 235),
            border: Rgb(120, 190, 120),
            accent: Rgb(70, 140, 70),
        },
    ),
    (
        &["space", "star", "moon", "planet", "rocket", "galaxy"],
        Palette {
            name: "space",
            background: Rgb(240, 235, 255),
            border: Rgb(160, 140, 220),
            accent: Rgb(110, 90, 190),
        },
    ),
    (
        &["sun", "desert", "beach", "summer", "sand"],
        Palette {
            name: "sunny",
            background: Rgb(255, 243, 224),
            border: Rgb(255, 180, 100),
            accent: Rgb(230, 130, 50),
        },
    ),
];

/// Picks the palette whose keywords appear most often in the title and
/// story. Ties go to the earlier theme; no match gives [`DEFAULT_PALETTE`].
pub fn palette_for(book: &Book) -> Palette {
    let text = std::iter::once(&book.title)
        .chain(book.story.iter())
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.strip_suffix('s').filter(|s| !s.is_empty()).unwrap_or(w))
        .collect();

    let mut best: Option<(usize, Palette)> = None;
    for (keywords, palette) in &THEMED_PALETTES {
        let hits = words.iter().filter(|w| keywords.contains(*w)).count();
        if hits > 0 && best.is_none_or(|(top, _)| hits > top) {
            best = Some((hits, *palette));
        }
    }

    best.map(|(_, palette)| palette).unwrap_or(DEFAULT_PALETTE)
}

/// Options for [`render_book_html`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Line printed under the final illustration.
    pub signature: String,
}

const BOOK_CSS: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; background: #444; font-family: Helvetica, Arial, sans-serif; }
.book { display: flex; justify-content: center; align-items: center; min-height: calc(100vh - 64px); }
.page { display: none; position: relative; width: 297mm; height: 210mm; max-width: 100vw; overflow: hidden;
  background: var(--page-bg); }
.page.active { display: flex; }
.cover img { width: 100%; height: 100%; object-fit: cover; }
.story-page, .end-page { flex-direction: column; align-items: center; border: 1mm solid var(--page-border);
  outline: 5mm solid var(--page-bg); outline-offset: -6mm; padding-top: 15mm; }
.illustration { width: 116mm; height: 116mm; object-fit: cover; box-shadow: 2mm 2mm 0 rgba(0, 0, 0, 0.1); }
.end-page .illustration { width: 105mm; height: 105mm; }
.text { width: calc(100% - 60mm); margin: 8mm auto 0; font-size: 18pt; line-height: 1.35; text-align: center; color: #000; }
.page-number { position: absolute; right: 20mm; bottom: 15mm; font-size: 14pt; font-weight: bold; }
.signature { margin-top: 12mm; font-size: 24pt; font-weight: bold; color: #000; }
.corner { position: absolute; font-size: 12pt; color: var(--page-accent); }
.corner.tl { top: 10mm; left: 12mm; }
.corner.tr { top: 10mm; right: 12mm; }
.corner.bl { bottom: 10mm; left: 12mm; }
.controls { display: flex; gap: 12px; justify-content: center; align-items: center; height: 64px; color: #fff; }
.controls button { padding: 8px 16px; border: 0; border-radius: 6px; background: var(--page-border); cursor: pointer; }
@page { size: A4 landscape; margin: 0; }
@media print {
  body { background: none; }
  .controls { display: none; }
  .book { display: block; min-height: 0; }
  .page, .page.active { display: flex; page-break-after: always; break-after: page; max-width: none; }
}
"#;

const NAV_SCRIPT: &str = r#"
(function () {
  var pages = document.querySelectorAll('.page');
  var indicator = document.getElementById('indicator');
  var current = 0;
  function show(index) {
    current = Math.max(0, Math.min(pages.length - 1, index));
    pages.forEach(function (page, i) { page.classList.toggle('active', i === current); });
    indicator.textContent = (current + 1) + ' / ' + pages.length;
  }
  document.getElementById('prev').addEventListener('click', function () { show(current - 1); });
  document.getElementById('next').addEventListener('click', function () { show(current + 1); });
  document.getElementById('print').addEventListener('click', function () { window.print(); });
  document.addEventListener('keydown', function (e) {
    if (e.key === 'ArrowRight' || e.key === 'PageDown') show(current + 1);
    if (e.key === 'ArrowLeft' || e.key === 'PageUp') show(current - 1);
  });
  show(0);
})();
"#;

/// Renders the book as a standalone HTML document.
pub fn render_book_html(book: &Book, options: &RenderOptions) -> String {
    let palette = palette_for(book);
    let title = escape_markup(&book.title);
    let lang = match book.metadata.as_ref().map(|m| m.language.as_str()) {
        Some("Spanish") => "es",
        Some("French") => "fr",
        Some("German") => "de",
        Some("Hindi") => "hi",
        Some("Gujarati") => "gu",
        _ => "en",
    };
    debug!(palette = palette.name, pages = book.story.len(), "Rendering book");

    let mut html = String::with_capacity(8 * 1024);
    html.push_str(&format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>\n:root {{ --page-bg: {}; --page-border: {}; --page-accent: {}; }}{BOOK_CSS}</style>\n\
         </head>\n<body>\n<main class=\"book\">\n",
        palette.background, palette.border, palette.accent
    ));

    html.push_str(&format!(
        "<section class=\"page cover active\"><img src=\"{}\" alt=\"Cover: {title}\"></section>\n",
        escape_markup(&book.cover_image_url)
    ));

    for (i, text) in book.story.iter().enumerate() {
        let number = i + 1;
        let image = book
            .page_image_urls
            .get(i)
            .map(|url| {
                format!(
                    "<img class=\"illustration\" src=\"{}\" alt=\"Illustration for page {number}\">",
                    escape_markup(url)
                )
            })
            .unwrap_or_default();
        html.push_str(&format!(
            "<section class=\"page story-page\">{image}<p class=\"text\">{}</p><span class=\"page-number\">{number}</span></section>\n",
            escape_markup(text)
        ));
    }

    html.push_str(&format!(
        "<section class=\"page end-page\"><img class=\"illustration\" src=\"{}\" alt=\"The End\">\
         <p class=\"signature\">{}</p>\
         <span class=\"corner tl\">*</span><span class=\"corner tr\">*</span><span class=\"corner bl\">+</span></section>\n",
        escape_markup(&book.end_page_image_url),
        escape_markup(&options.signature)
    ));

    html.push_str(
        "</main>\n<nav class=\"controls\">\
         <button id=\"prev\">&larr; Previous</button><span id=\"indicator\"></span>\
         <button id=\"next\">Next &rarr;</button><button id=\"print\">Print / Save as PDF</button></nav>\n",
    );
    html.push_str(&format!("<script>{NAV_SCRIPT}</script>\n</body>\n</html>\n"));
    html
}

/// File name for an exported book, e.g. `The_Paper_Moon.html`.
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    if stem.is_empty() {
        "storybook.html".to_string()
    } else {
        format!("{}.html", stem)
    }
}

/// A downloaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Downloads remote images for embedding.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Asset, RenderError>;
}

/// Downloads book images from public hosts only.
///
/// Only `http` and `https` URLs whose host resolves to public addresses are
/// fetched. The vetted address is pinned for the request and redirects are
/// not followed, so a later lookup can't point the download elsewhere. The
/// reply must be an `image/*` no larger than `max_bytes`.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    timeout: Duration,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        Self { timeout, max_bytes }
    }

    async fn download(&self, url: &Url, addr: SocketAddr) -> Result<Asset, RenderError> {
        let fetch_failed = |source: ProviderError| RenderError::FetchFailed {
            url: url.to_string(),
            source,
        };

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(domain) = url.domain() {
            builder = builder.resolve(domain, addr);
        }
        let client = builder.build().map_err(|e| fetch_failed(e.into()))?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_failed(e.into()))?;
        let mut response = check_response_status(response).await.map_err(fetch_failed)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(RenderError::NotAnImage {
                url: url.to_string(),
                content_type,
            });
        }

        let too_large = || RenderError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| fetch_failed(e.into()))? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Asset {
            content_type: Some(content_type),
            bytes,
        })
    }
}

#[async_trait]
impl AssetFetcher for ImageFetcher {
    async fn fetch(&self, raw: &str) -> Result<Asset, RenderError> {
        let (url, addr) = resolve_public_url(raw).await?;
        debug!(url = %url, addr = %addr, "Fetching image");
        self.download(&url, addr).await
    }
}

/// Parses an image URL and resolves its host, refusing anything that isn't
/// `http(s)` on a public address.
pub async fn resolve_public_url(raw: &str) -> Result<(Url, SocketAddr), RenderError> {
    let blocked = |reason: &str| RenderError::BlockedUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|_| blocked("not a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(blocked("only http and https images can be embedded"));
    }
    let port = url
        .port_or_known_default()
        .ok_or_else(|| blocked("no port"))?;

    let addrs: Vec<SocketAddr> = match url.host() {
        Some(Host::Ipv4(ip)) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
        Some(Host::Ipv6(ip)) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
        Some(Host::Domain(domain)) => tokio::net::lookup_host((domain, port))
            .await
            .map_err(|_| blocked("host could not be resolved"))?
            .collect(),
        None => return Err(blocked("no host")),
    };

    // Every address must be public, or a second lookup could pick a private one.
    if addrs.is_empty() || !addrs.iter().all(|addr| is_public_ip(addr.ip())) {
        return Err(blocked("host is not a public address"));
    }
    Ok((url, addrs[0]))
}

/// True for globally routable unicast addresses.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_multicast()
                || a == 0
                // 100.64.0.0/10 carrier-grade NAT
                || (a == 100 && (b & 0xc0) == 64))
        }
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_ip(IpAddr::V4(v4)),
            None => {
                !(v6.is_loopback()
                    || v6.is_unspecified()
                    || v6.is_multicast()
                    || v6.is_unique_local()
                    || v6.is_unicast_link_local())
            }
        },
    }
}

/// Returns a copy of the book with every remote image replaced by a
/// base64 `data:` URI. Images are fetched concurrently; existing `data:`
/// URIs are kept as they are.
pub async fn inline_images(book: &Book, fetcher: &dyn AssetFetcher) -> Result<Book, RenderError> {
    let (cover_image_url, page_image_urls, end_page_image_url) = tokio::try_join!(
        inline_image(&book.cover_image_url, fetcher),
        try_join_all(book.page_image_urls.iter().map(|url| inline_image(url, fetcher))),
        inline_image(&book.end_page_image_url, fetcher),
    )?;

    info!(title = %book.title, "Inlined book images");
    Ok(Book {
        cover_image_url,
        page_image_urls,
        end_page_image_url,
        ..book.clone()
    })
}

async fn inline_image(url: &str, fetcher: &dyn AssetFetcher) -> Result<String, RenderError> {
    if url.is_empty() || url.starts_with("data:") {
        return Ok(url.to_string());
    }

    let asset = fetcher.fetch(url).await?;

    Ok(format!(
        "data:{};base64,{}",
        asset.content_type.as_deref().unwrap_or(DEFAULT_IMAGE_TYPE),
        STANDARD.encode(&asset.bytes)
    ))
}
