//! Text sanitation applied to every string before it reaches a font.
//!
//! Font glyph coverage is unpredictable for arbitrary Unicode, so typographic
//! punctuation is mapped to ASCII first and invisible or control characters
//! are removed. The result is then compatibility-normalized, which folds
//! ligatures, full-width forms, and circled digits into plain letters and
//! digits. With `ascii_only` set the decomposed form (NFKD) is used so accents
//! split off their base letter, and whatever non-ASCII text remains is dropped.
//! Otherwise the composed form (NFKC) keeps accented letters whole.
//!
//! [`Sanitizer::sanitize`] is total and idempotent: no output character is
//! ever rewritten by a second pass.

use unicode_normalization::UnicodeNormalization;

/// Typographic characters and their ASCII stand-ins.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2192}', "->"),  // →
    ('\u{2190}', "<-"),  // ←
    ('\u{2191}', "^"),   // ↑
    ('\u{2193}', "v"),   // ↓
    ('\u{2018}', "'"),   // ‘
    ('\u{2019}', "'"),   // ’
    ('\u{201C}', "\""),  // “
    ('\u{201D}', "\""),  // ”
    ('\u{2013}', "-"),   // –
    ('\u{2014}', "-"),   // —
    ('\u{2026}', "..."), // …
    ('\u{00A0}', " "),   // no-break space
];

/// Zero-width and formatting code points with no visible glyph.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}')
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    ascii_only: bool,
}

impl Sanitizer {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    pub fn sanitize(&self, text: &str) -> String {
        let mut cleaned = String::with_capacity(text.len());
        for c in text.chars() {
            if let Some((_, replacement)) = SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
                cleaned.push_str(replacement);
                continue;
            }
            match c {
                '\n' => cleaned.push('\n'),
                '\t' => cleaned.push(' '),
                '\r' => {}
                c if is_invisible(c) => {}
                c if c.is_control() => cleaned.push('?'),
                c => cleaned.push(c),
            }
        }

        if self.ascii_only {
            cleaned.nfkd().filter(char::is_ascii).collect()
        } else {
            cleaned.nfkc().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "plain ascii",
        "“Quoted” — and ‘single’ … done",
        "Left ← Right → Up ↑ Down ↓",
        "tab\there\r\nnext line",
        "zero\u{200B}width\u{FEFF}",
        "bell\u{7}and\u{85}next",
        "café naïve 日本語 🎉",
        "a\u{00A0}b",
        "->already ascii<-",
        "\u{FB01}nal \u{FF21}\u{FF22} \u{2460} cafe\u{301}",
        "e\u{200B}\u{301}",
    ];

    #[test]
    fn substitutes_typographic_punctuation() {
        let s = Sanitizer::default();
        assert_eq!(
            s.sanitize("“Quoted” — and ‘single’ …"),
            "\"Quoted\" - and 'single' ..."
        );
        assert_eq!(s.sanitize("a → b ← c ↑ ↓"), "a -> b <- c ^ v");
    }

    #[test]
    fn keeps_unicode_unless_ascii_only() {
        assert_eq!(Sanitizer::new(false).sanitize("café 🎉"), "café 🎉");
        assert_eq!(Sanitizer::new(true).sanitize("café 🎉"), "cafe ");
        assert_eq!(Sanitizer::new(true).sanitize("naïve Ångström"), "naive Angstrom");
    }

    #[test]
    fn folds_compatibility_characters() {
        for ascii_only in [false, true] {
            let s = Sanitizer::new(ascii_only);
            assert_eq!(s.sanitize("\u{FB01}nal"), "final");
            assert_eq!(s.sanitize("\u{FF21}\u{FF22}\u{FF23}"), "ABC");
            assert_eq!(s.sanitize("step \u{2460}"), "step 1");
        }
    }

    #[test]
    fn composed_form_kept_without_ascii_only() {
        // e + combining acute
        assert_eq!(Sanitizer::new(false).sanitize("cafe\u{301}"), "caf\u{E9}");
    }

    #[test]
    fn strips_invisible_and_control_characters() {
        let s = Sanitizer::default();
        assert_eq!(s.sanitize("zero\u{200B}width"), "zerowidth");
        assert_eq!(s.sanitize("tab\there"), "tab here");
        assert_eq!(s.sanitize("line\r\nbreak"), "line\nbreak");
        assert_eq!(s.sanitize("bell\u{7}"), "bell?");
    }

    #[test]
    fn ascii_only_output_is_ascii() {
        let s = Sanitizer::new(true);
        for sample in SAMPLES {
            assert!(s.sanitize(sample).is_ascii(), "non-ascii output for {sample:?}");
        }
    }

    #[test]
    fn sanitize_is_idempotent() {
        for ascii_only in [false, true] {
            let s = Sanitizer::new(ascii_only);
            for sample in SAMPLES {
                let once = s.sanitize(sample);
                assert_eq!(s.sanitize(&once), once, "sample {sample:?}");
            }
        }
    }
}
