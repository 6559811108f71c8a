//! Deck document splitting and serialization.
//!
//! A deck document is the content of every slide, in order, separated by a
//! delimiter line:
//!
//! ```markdown
//! # First slide
//!
//! ---
//!
//! # Second slide
//! ```

use crate::model::SlideRecord;

/// Delimiter the splitter looks for between slides.
pub const DELIMITER: &str = "---\n";

/// Separator written between slides by [`serialize`].
const SEPARATOR: &str = "\n\n---\n\n";

/// Split a document into trimmed slide blocks.
///
/// An empty document yields a single empty block, never zero blocks.
pub fn split(document: &str) -> Vec<String> {
    document
        .split(DELIMITER)
        .map(|block| block.trim().to_string())
        .collect()
}

/// Join slide contents, in position order, into a document.
///
/// [`split`] reads the result back into the same contents.
pub fn serialize(slides: &[SlideRecord]) -> String {
    let mut ordered: Vec<&SlideRecord> = slides.iter().collect();
    ordered.sort_by_key(|slide| slide.position);

    let mut document = String::new();
    for (i, slide) in ordered.iter().enumerate() {
        if i > 0 {
            document.push_str(SEPARATOR);
        }
        document.push_str(&slide.content);
        // A trailing "---" would join the separator's newline into a delimiter
        if i + 1 < ordered.len() && slide.content.ends_with("---") {
            document.push(' ');
        }
    }
    document
}

/// Whether writing `next` over `current` would change the document.
///
/// Writes that only differ in surrounding whitespace are skipped so they do
/// not show up as file modifications in watch mode.
pub fn needs_rewrite(current: &str, next: &str) -> bool {
    current.trim() != next.trim()
}
