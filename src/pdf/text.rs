//! Text normalisation and width estimates for the built-in PDF fonts.
//!
//! The standard 14 fonts carry no embedded glyphs beyond Latin, and their
//! metrics are not exposed by the backend, so widths are estimated per
//! character class. Estimates err on the wide side to avoid overflowing
//! the right margin.

use super::blocks::FontStyle;
use super::style::PT_TO_MM;

/// ASCII fallbacks for U+00C0..=U+00FF.
const LATIN1_LETTERS: &[u8; 64] =
    b"AAAAAAACEEEEIIIIDNOOOOOxOUUUUYTsaaaaaaaceeeeiiiidnooooo/ouuuuyty";

/// Replace characters the built-in fonts cannot show with ASCII approximations.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\t' => out.push_str("    "),
            '\u{a0}' | '\u{2002}'..='\u{200a}' | '\u{202f}' => out.push(' '),
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{2023}' | '\u{25cf}' | '\u{00b7}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            '\u{00a7}' => out.push_str("Sec. "),
            '\u{00b6}' => out.push_str("Para. "),
            '\u{00a9}' => out.push_str("(c)"),
            '\u{00ae}' => out.push_str("(R)"),
            '\u{2122}' => out.push_str("(TM)"),
            '\u{00b0}' => out.push_str(" deg"),
            '\u{20ac}' => out.push_str("EUR"),
            '\u{00a3}' => out.push_str("GBP"),
            '\u{00c0}'..='\u{00ff}' => {
                let idx = (u32::from(c) - 0xc0) as usize;
                out.push(char::from(LATIN1_LETTERS[idx]));
            }
            c if c.is_control() || c == '\u{200b}' || c == '\u{feff}' => {}
            _ => out.push('?'),
        }
    }
    out
}

/// Approximate advance width of a character, in em.
fn char_width_em(c: char, style: FontStyle) -> f32 {
    if style == FontStyle::Mono {
        return 0.6;
    }

    let width = match c {
        'i' | 'j' | 'l' | '\'' | '|' | '!' | '.' | ',' | ':' | ';' => 0.28,
        'f' | 't' | 'r' | 'I' | ' ' | '(' | ')' | '[' | ']' | '-' | '/' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.94,
        'A'..='Z' | '%' | '&' | '@' => 0.72,
        _ => 0.56,
    };

    match style {
        FontStyle::Bold | FontStyle::BoldItalic => width * 1.06,
        _ => width,
    }
}

/// Width of a string in millimetres at the given font size.
#[must_use]
pub fn text_width(text: &str, style: FontStyle, size_pt: f32) -> f32 {
    text.chars().map(|c| char_width_em(c, style)).sum::<f32>() * size_pt * PT_TO_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_ascii() {
        assert_eq!(normalize("Rent: $900 (USD)"), "Rent: $900 (USD)");
    }

    #[test]
    fn test_normalize_typography() {
        assert_eq!(
            normalize("\u{201c}Tenant\u{201d} \u{2014} the party\u{2019}s \u{2026}"),
            "\"Tenant\" - the party's ..."
        );
        assert_eq!(normalize("\u{00a7}4"), "Sec. 4");
    }

    #[test]
    fn test_normalize_accents_and_unknowns() {
        assert_eq!(normalize("Jos\u{00e9} M\u{00fc}ller"), "Jose Muller");
        assert_eq!(normalize("\u{00c9}TAT"), "ETAT");
        assert_eq!(normalize("\u{4e2d}"), "?");
        assert_eq!(normalize("a\u{200b}b"), "ab");
    }

    #[test]
    fn test_mono_width_is_fixed() {
        let w = text_width("abcd", FontStyle::Mono, 10.0);
        assert!((w - 4.0 * 0.6 * 10.0 * PT_TO_MM).abs() < 1e-4);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = text_width("Agreement", FontStyle::Regular, 11.0);
        let bold = text_width("Agreement", FontStyle::Bold, 11.0);
        assert!(bold > regular);
    }
}
