//! Built-in Helvetica font for stamped text.
//!
//! Helvetica is one of the PDF standard 14 fonts, so it is referenced by
//! name and never embedded as a font program. Text is encoded with
//! WinAnsiEncoding; characters outside that encoding are replaced by `?`.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Resource name used for the stamp font in page resource dictionaries.
pub const FONT_RESOURCE_NAME: &str = "FStamp";

/// Helvetica advance widths (1/1000 em) for WinAnsi codes 32..=126.
const HELVETICA_WIDTHS_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Width used for codes outside the ASCII table.
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// Handle to the font object added to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontHandle {
    pub(crate) object_id: ObjectId,
}

/// Add the Helvetica font dictionary to `doc`.
pub(crate) fn embed_helvetica(doc: &mut Document) -> FontHandle {
    let dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]);
    FontHandle {
        object_id: doc.add_object(Object::Dictionary(dict)),
    }
}

/// Map a character to its WinAnsiEncoding byte.
fn win_ansi_code(c: char) -> u8 {
    match c {
        ' '..='~' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        '\t' => b' ',
        _ => b'?',
    }
}

/// Encode text as WinAnsi bytes.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_code).collect()
}

fn code_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_WIDTHS_ASCII[usize::from(code - 32)],
        _ => HELVETICA_DEFAULT_WIDTH,
    }
}

/// Width of `text` in points at `font_size`.
pub fn string_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| u32::from(code_width(win_ansi_code(c))))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let units = units as f32;
    units * font_size / 1000.0
}

/// Break text into lines no wider than `max_width`.
///
/// Explicit newlines always break. Words are never split, so a single word
/// wider than `max_width` occupies a line of its own.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();

        for word in paragraph.split(' ') {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate_width = string_width(&current, font_size)
                + string_width(" ", font_size)
                + string_width(word, font_size);

            if candidate_width <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }

        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ascii() {
        assert_eq!(encode_win_ansi("Alice"), b"Alice".to_vec());
    }

    #[test]
    fn test_encode_latin1_and_specials() {
        assert_eq!(encode_win_ansi("é"), vec![0xE9]);
        assert_eq!(encode_win_ansi("€"), vec![0x80]);
        assert_eq!(encode_win_ansi("“x”"), vec![0x93, b'x', 0x94]);
    }

    #[test]
    fn test_encode_unsupported() {
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_string_width() {
        // 'A' is 667 units, so 10pt -> 6.67pt
        let w = string_width("A", 10.0);
        assert!((w - 6.67).abs() < 1e-4);
        assert_eq!(string_width("", 12.0), 0.0);
    }

    #[test]
    fn test_wrap_fits_on_one_line() {
        let lines = wrap_text("Hello world", 8.0, 300.0);
        assert_eq!(lines, ["Hello world"]);
    }

    #[test]
    fn test_wrap_breaks_words() {
        // Each "aaaa" is 4 * 556 = 2224 units -> 22.24pt at 10pt
        let lines = wrap_text("aaaa aaaa aaaa", 10.0, 50.0);
        assert_eq!(lines, ["aaaa aaaa", "aaaa"]);
    }

    #[test]
    fn test_wrap_long_word_kept_whole() {
        let lines = wrap_text("supercalifragilistic", 10.0, 20.0);
        assert_eq!(lines, ["supercalifragilistic"]);
    }

    #[test]
    fn test_wrap_explicit_newlines() {
        let lines = wrap_text("line one\r\nline two", 8.0, 300.0);
        assert_eq!(lines, ["line one", "line two"]);
    }
}
