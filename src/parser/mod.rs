pub mod clean;
pub mod extract;

use extract::{Extractor, Mention};

/// Two-pass pipeline: raw HTML → flat text → hardware mentions.
pub fn process_page(page: u32, html: &str, extractor: &Extractor) -> Vec<Mention> {
    let text = clean::clean_html(html);
    extractor.extract(&text, page)
}

// ── Tests ──
