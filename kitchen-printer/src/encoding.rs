//! Text encodings for thermal printers
//!
//! Printers either accept UTF-8 directly or expect a legacy code page.
//! The only legacy page supported is GBK (common on Chinese printers).
//! This module provides:
//! - Column width calculation per encoding
//! - Right padding to a column width
//! - Converting a UTF-8 ESC/POS stream to GBK while preserving commands

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// Character set a printer expects for text bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Text bytes are sent as UTF-8 unchanged
    #[default]
    Utf8,
    /// Text is transcoded to GBK, Chinese mode is enabled around it
    Gbk,
}

impl TextEncoding {
    /// Encode a finished ESC/POS buffer built from UTF-8 text
    pub fn encode(self, buf: Vec<u8>) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => buf,
            TextEncoding::Gbk => convert_to_gbk(&buf),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Gbk => "gbk",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "" => Ok(TextEncoding::Utf8),
            "gbk" => Ok(TextEncoding::Gbk),
            other => Err(format!("unknown code page: {}", other)),
        }
    }
}

/// Number of printer columns a string occupies
///
/// GBK printers render Chinese characters two columns wide (one per byte).
/// UTF-8 printers are assumed to render one column per character.
pub fn text_width(s: &str, encoding: TextEncoding) -> usize {
    match encoding {
        TextEncoding::Utf8 => s.chars().count(),
        TextEncoding::Gbk => {
            let (cow, _, _) = encoding_rs::GBK.encode(s);
            cow.len()
        }
    }
}

/// Pad a string with trailing spaces up to `width` columns
///
/// Strings already at or beyond the width are returned unchanged;
/// ticket lines are never truncated.
pub fn pad_right(s: &str, width: usize, encoding: TextEncoding) -> String {
    let current = text_width(s, encoding);
    if current >= width {
        return s.to_string();
    }
    format!("{}{}", s, " ".repeat(width - current))
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to GBK
///
/// ASCII bytes (0x00-0x7F) are copied unchanged, which protects ESC/POS
/// commands from being corrupted. Only runs of bytes >= 0x80 are decoded
/// as UTF-8 and re-encoded as GBK.
///
/// Chinese mode is re-enabled after every INIT command (ESC @), since INIT
/// resets it.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn convert_to_gbk(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() * 2);

    // FS & - enable Chinese mode, FS C 1 - select GBK
    result.extend_from_slice(&[0x1C, 0x26, 0x1C, 0x43, 0x01]);

    let mut pending = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == 0x1B && bytes.get(i + 1) == Some(&0x40) {
            flush_pending(&mut pending, &mut result);
            result.extend_from_slice(&[0x1B, 0x40, 0x1C, 0x26]);
            i += 2;
            continue;
        }

        if b < 0x80 {
            flush_pending(&mut pending, &mut result);
            result.push(b);
        } else {
            pending.push(b);
        }
        i += 1;
    }

    flush_pending(&mut pending, &mut result);

    // FS . - leave Chinese mode
    result.extend_from_slice(&[0x1C, 0x2E]);

    result
}

fn flush_pending(pending: &mut Vec<u8>, result: &mut Vec<u8>) {
    if pending.is_empty() {
        return;
    }
    let text = String::from_utf8_lossy(pending);
    let (gbk, _, _) = encoding_rs::GBK.encode(&text);
    result.extend_from_slice(&gbk);
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("hello", TextEncoding::Utf8), 5);
        assert_eq!(text_width("你好", TextEncoding::Utf8), 2);
        assert_eq!(text_width("你好", TextEncoding::Gbk), 4);
        assert_eq!(text_width("AB中文CD", TextEncoding::Gbk), 8);
    }

    #[test]
    fn test_pad_right() {
        assert_eq!(pad_right("Table: 7", 10, TextEncoding::Utf8), "Table: 7  ");
        assert_eq!(pad_right("桌", 4, TextEncoding::Gbk), "桌  ");
        assert_eq!(
            pad_right("a very long table name", 5, TextEncoding::Utf8),
            "a very long table name"
        );
    }

    #[test]
    fn test_parse_code_page() {
        assert_eq!("GBK".parse::<TextEncoding>().unwrap(), TextEncoding::Gbk);
        assert_eq!("utf-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert!("latin1".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_gbk_preserves_commands() {
        let mut input = vec![0x1B, 0x40];
        input.extend_from_slice("中".as_bytes());
        input.extend_from_slice(&[0x1D, 0x56, 0x00]);

        let out = convert_to_gbk(&input);

        assert_eq!(&out[..5], &[0x1C, 0x26, 0x1C, 0x43, 0x01]);
        assert_eq!(&out[5..9], &[0x1B, 0x40, 0x1C, 0x26]);
        // 中 is 0xD6 0xD0 in GBK
        assert_eq!(&out[9..11], &[0xD6, 0xD0]);
        assert_eq!(&out[11..14], &[0x1D, 0x56, 0x00]);
        assert_eq!(&out[14..], &[0x1C, 0x2E]);
    }

    #[test]
    fn test_utf8_is_passthrough() {
        let input = "Nasi Goreng ñ".as_bytes().to_vec();
        assert_eq!(TextEncoding::Utf8.encode(input.clone()), input);
    }
}
