//! Greedy word wrap against measured pixel widths.

use super::backend::RenderError;
use super::font::FontHandle;

/// Split `text` into lines narrower than `max_width` pixels.
///
/// Words are added to the current line while the measured line stays under
/// `max_width`. A word that is too wide on its own gets a line of its own,
/// unmodified. Explicit newlines start a new line; blank lines are dropped.
pub fn wrap(text: &str, font: &FontHandle, max_width: u32) -> Result<Vec<String>, RenderError> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if font.measure(&candidate)?.width < max_width {
                current = candidate;
            } else if current.is_empty() {
                lines.push(candidate);
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    Ok(lines)
}
