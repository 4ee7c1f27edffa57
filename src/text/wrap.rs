//! Character level line wrapping.

use itertools::Itertools;

/// Measures the logical extent of a (possibly multi-line) text, in pixels.
pub trait Measure {
    fn size(&self, text: &str) -> (i32, i32);

    fn width(&self, text: &str) -> i32 {
        self.size(text).0
    }
}

impl<M: Measure + ?Sized> Measure for &M {
    fn size(&self, text: &str) -> (i32, i32) {
        (**self).size(text)
    }
}

/// Greedily breaks `text` into lines no wider than `max_width`.
///
/// Breaks may fall inside words, which suits scripts that do not separate words
/// with spaces. A character that alone is wider than `max_width` still gets its
/// own line. Existing line breaks are treated as ordinary characters.
pub fn wrap<M: Measure + ?Sized>(text: &str, measure: &M, max_width: i32) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for ch in text.chars() {
        let mut candidate = line.clone();
        candidate.push(ch);
        if measure.width(&candidate) <= max_width {
            line = candidate;
        } else {
            if !line.is_empty() {
                lines.push(line);
            }
            line = ch.to_string();
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.into_iter().join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Every ASCII char is `advance` wide, anything else twice that; lines are
    /// `line_height` tall with `spacing` between them.
    pub struct GridMeasure {
        pub advance: i32,
        pub line_height: i32,
        pub spacing: i32,
    }

    impl GridMeasure {
        pub fn new(advance: i32) -> Self {
            Self {
                advance,
                line_height: advance,
                spacing: 0,
            }
        }
    }

    impl Measure for GridMeasure {
        fn size(&self, text: &str) -> (i32, i32) {
            let width = text
                .split('\n')
                .map(|l| {
                    l.chars()
                        .map(|c| if c.is_ascii() { self.advance } else { 2 * self.advance })
                        .sum::<i32>()
                })
                .max()
                .unwrap_or(0);
            let n = text.split('\n').count() as i32;
            (width, n * self.line_height + (n - 1) * self.spacing)
        }
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert_eq!(wrap("", &GridMeasure::new(10), 100), "");
    }

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap("Hello", &GridMeasure::new(10), 50), "Hello");
    }

    #[test]
    fn splits_inside_words() {
        assert_eq!(wrap("Hello world", &GridMeasure::new(10), 40), "Hell\no wo\nrld");
    }

    #[test]
    fn wide_characters_use_their_own_width() {
        assert_eq!(wrap("你好世界!", &GridMeasure::new(10), 45), "你好\n世界\n!");
    }

    #[test]
    fn oversized_character_gets_its_own_line() {
        assert_eq!(wrap("a你b", &GridMeasure::new(10), 15), "a\n你\nb");
    }

    #[test]
    fn lines_fit_and_reassemble_the_input() {
        let m = GridMeasure::new(7);
        let text = "The quick brown fox 跳过了 the lazy dog, 然后又跑了回来。";
        for max_width in [1, 7, 13, 14, 30, 64, 100, 1000] {
            let wrapped = wrap(text, &m, max_width);
            for line in wrapped.split('\n') {
                assert!(
                    m.width(line) <= max_width || line.chars().count() == 1,
                    "{line:?} wider than {max_width}"
                );
            }
            assert_eq!(wrapped.replace('\n', ""), text);
        }
    }
}
