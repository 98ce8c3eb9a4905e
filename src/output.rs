//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! Rendering 3 slides (enhanced)
//! 002 slide_2.png
//! 001 slide_1.png
//!     warning: logo skipped: logo assets/logo.png: No such file or directory
//! 003 slide_3.png → error slide
//!     can't encode character '☃' in position 5: not covered by built-in 5x7
//!
//! Carousel 3f2c9a…e1 (partial)
//! 001 slide_1.png  41.2 KiB
//!     carousel-store/3f2c9a…e1/slide_1.png
//! ...
//! 3 slides stored, 1 error slide, 2 warnings
//! ```
//!
//! Slide progress lines arrive in completion order; the stored listing is in
//! slide order.
//!
//! ## Sweep
//!
//! ```text
//! Sweep carousel-store (ttl 24h)
//!     removed 3f2c9a…e1
//! 1 removed, 4 kept
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::Publication;
use crate::render::RenderEvent;
use crate::store::{SweepReport, content_type};
use crate::types::slide_filename;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn format_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else {
        format!("{secs}s")
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Render
// ============================================================================

/// Format a single render progress event as display lines.
pub fn format_render_event(event: &RenderEvent) -> Vec<String> {
    match event {
        RenderEvent::Started { renderer, total } => {
            vec![format!("Rendering {} ({})", plural(*total, "slide"), renderer)]
        }
        RenderEvent::SlideRendered {
            index, warnings, ..
        } => {
            let mut lines = vec![format!("{} {}", format_index(*index), slide_filename(*index))];
            for warning in warnings {
                lines.push(format!("{}warning: {}", indent(1), warning));
            }
            lines
        }
        RenderEvent::SlideFailed { index, error, .. } => vec![
            format!(
                "{} {} \u{2192} error slide",
                format_index(*index),
                slide_filename(*index)
            ),
            format!("{}{}", indent(1), error),
        ],
    }
}

pub fn print_render_event(event: &RenderEvent) {
    for line in format_render_event(event) {
        println!("{}", line);
    }
}

/// Format the stored files and summary of a published carousel.
pub fn format_publication(publication: &Publication) -> Vec<String> {
    let response = &publication.response;
    let mut lines = vec![format!(
        "Carousel {} ({})",
        response.carousel_id, response.status
    )];
    for (i, file) in publication.stored.iter().enumerate() {
        lines.push(format!(
            "{} {}  {}",
            format_index(i + 1),
            file.filename,
            format_size(file.bytes)
        ));
        lines.push(format!("{}{}", indent(1), file.path.display()));
    }

    let mut summary = format!("{} stored", plural(publication.stored.len(), "slide"));
    if publication.error_slides > 0 {
        summary.push_str(&format!(", {}", plural(publication.error_slides, "error slide")));
    }
    if !response.warnings.is_empty() {
        summary.push_str(&format!(", {}", plural(response.warnings.len(), "warning")));
    }
    lines.push(summary);
    lines
}

pub fn print_publication(publication: &Publication) {
    for line in format_publication(publication) {
        println!("{}", line);
    }
}

// ============================================================================
// Store
// ============================================================================

/// Format the files of one stored carousel with their content types.
pub fn format_listing(carousel_id: &str, filenames: &[String]) -> Vec<String> {
    let mut lines = vec![format!(
        "Carousel {} ({})",
        carousel_id,
        plural(filenames.len(), "file")
    )];
    for (i, name) in filenames.iter().enumerate() {
        lines.push(format!(
            "{} {}  {}",
            format_index(i + 1),
            name,
            content_type(name)
        ));
    }
    lines
}

pub fn print_listing(carousel_id: &str, filenames: &[String]) {
    for line in format_listing(carousel_id, filenames) {
        println!("{}", line);
    }
}

/// Format one sweep pass.
pub fn format_sweep_report(root: &Path, ttl: Duration, report: &SweepReport) -> Vec<String> {
    let mut lines = vec![format!("Sweep {} (ttl {})", root.display(), format_ttl(ttl))];
    for id in &report.removed {
        lines.push(format!("{}removed {}", indent(1), id));
    }
    for id in &report.failed {
        lines.push(format!("{}failed {}", indent(1), id));
    }
    lines.push(report.to_string());
    lines
}

pub fn print_sweep_report(root: &Path, ttl: Duration, report: &SweepReport) {
    for line in format_sweep_report(root, ttl, report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredFile;
    use crate::types::{CarouselResponse, EncodedSlide};
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn format_ttl_prefers_hours() {
        assert_eq!(format_ttl(Duration::from_secs(24 * 3600)), "24h");
        assert_eq!(format_ttl(Duration::from_secs(90)), "90s");
        assert_eq!(format_ttl(Duration::ZERO), "0s");
    }

    #[test]
    fn plural_words() {
        assert_eq!(plural(1, "slide"), "1 slide");
        assert_eq!(plural(0, "slide"), "0 slides");
    }

    // =========================================================================
    // Render output
    // =========================================================================

    #[test]
    fn started_event() {
        let event = RenderEvent::Started {
            renderer: "enhanced".to_string(),
            total: 3,
        };
        assert_eq!(format_render_event(&event), ["Rendering 3 slides (enhanced)"]);
    }

    #[test]
    fn rendered_event_with_warning() {
        let event = RenderEvent::SlideRendered {
            index: 2,
            total: 3,
            warnings: vec!["logo skipped".to_string()],
        };
        assert_eq!(
            format_render_event(&event),
            ["002 slide_2.png", "    warning: logo skipped"]
        );
    }

    #[test]
    fn failed_event() {
        let event = RenderEvent::SlideFailed {
            index: 3,
            total: 3,
            error: "boom".to_string(),
        };
        assert_eq!(
            format_render_event(&event),
            ["003 slide_3.png \u{2192} error slide", "    boom"]
        );
    }

    #[test]
    fn publication_summary() {
        let publication = Publication {
            response: CarouselResponse {
                status: "partial".to_string(),
                carousel_id: "abc".to_string(),
                slides: vec![EncodedSlide {
                    filename: "slide_1.png".to_string(),
                    content: String::new(),
                }],
                warnings: vec!["slide 1: boom".to_string()],
            },
            stored: vec![StoredFile {
                carousel_id: "abc".to_string(),
                filename: "slide_1.png".to_string(),
                path: PathBuf::from("store/abc/slide_1.png"),
                bytes: 2048,
            }],
            error_slides: 1,
        };
        assert_eq!(
            format_publication(&publication),
            [
                "Carousel abc (partial)",
                "001 slide_1.png  2.0 KiB",
                "    store/abc/slide_1.png",
                "1 slide stored, 1 error slide, 1 warning",
            ]
        );
    }

    // =========================================================================
    // Store output
    // =========================================================================

    #[test]
    fn listing_shows_content_types() {
        let names = vec!["slide_1.png".to_string(), "notes.bin".to_string()];
        assert_eq!(
            format_listing("abc", &names),
            [
                "Carousel abc (2 files)",
                "001 slide_1.png  image/png",
                "002 notes.bin  application/octet-stream",
            ]
        );
    }

    #[test]
    fn sweep_report_lines() {
        let report = SweepReport {
            removed: vec!["old".to_string()],
            failed: vec!["stuck".to_string()],
            kept: 2,
        };
        assert_eq!(
            format_sweep_report(Path::new("store"), Duration::from_secs(3600), &report),
            [
                "Sweep store (ttl 1h)",
                "    removed old",
                "    failed stuck",
                "1 removed, 2 kept, 1 failed",
            ]
        );
    }
}
