//! Character width lookups used by the text flow.

/// Advance widths for a font at a given size.
///
/// Implementations wrap whatever font source the caller has loaded. The text
/// flow only ever asks for single characters.
pub trait FontMetrics: Send + Sync {
    /// Advance width of `ch` in points at `font_size`.
    fn char_width(&self, ch: char, font_size: f64) -> f64;

    /// Width of a string with no letter spacing.
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

/// Approximate proportional metrics in the shape of Helvetica.
///
/// Characters are bucketed into width classes (in 1/1000 em) rather than
/// looked up individually. Good enough to size auto-height bands when no real
/// font is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageWidthMetrics;

impl AverageWidthMetrics {
    fn units(ch: char) -> u16 {
        match ch {
            ' ' => 278,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '|' | '\'' => 222,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 333,
            'm' | 'w' => 833,
            'M' | 'W' => 889,
            '0'..='9' => 556,
            'A'..='Z' => 667,
            'a'..='z' => 556,
            c if is_wide(c) => 1000,
            _ => 556,
        }
    }
}

impl FontMetrics for AverageWidthMetrics {
    fn char_width(&self, ch: char, font_size: f64) -> f64 {
        Self::units(ch) as f64 / 1000.0 * font_size
    }
}

/// CJK ideographs, kana, hangul and fullwidth forms take a full em.
fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}
