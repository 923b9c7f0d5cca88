//! ESC/POS byte streams
//!
//! [`EscPosBuilder`] appends commands and text; [`Profile`] covers the
//! commands that differ between printer families.

use crate::encoding::TextEncoding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Command dialect of a printer model
///
/// Most commands are shared; font sizing and paper cutting differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// HRPT TP808 and compatibles: GS ! sizing, ESC d / ESC m cut
    #[default]
    Hrpt,
    /// Epson TM series and clones (XPrinter): ESC ! sizing, GS V cut
    Epson,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Hrpt => "hrpt",
            Profile::Epson => "epson",
        }
    }

    fn double_size(self) -> &'static [u8] {
        match self {
            Profile::Hrpt => &[0x1D, 0x21, 0x11],
            Profile::Epson => &[0x1B, 0x21, 0x30],
        }
    }

    fn normal_size(self) -> &'static [u8] {
        match self {
            Profile::Hrpt => &[0x1D, 0x21, 0x00],
            Profile::Epson => &[0x1B, 0x21, 0x00],
        }
    }

    fn cut(self) -> &'static [u8] {
        match self {
            // ESC d 3 (feed 3 lines) + ESC m (cut)
            Profile::Hrpt => &[0x1B, 0x64, 0x03, 0x1B, 0x6D],
            // GS V 0 - full cut
            Profile::Epson => &[0x1D, 0x56, 0x00],
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hrpt" | "" => Ok(Profile::Hrpt),
            "epson" | "xprinter" => Ok(Profile::Epson),
            other => Err(format!("unknown printer profile: {}", other)),
        }
    }
}

const INIT: &[u8] = &[0x1B, 0x40];
const ALIGN_LEFT: &[u8] = &[0x1B, 0x61, 0x00];
const ALIGN_CENTER: &[u8] = &[0x1B, 0x61, 0x01];
const BOLD_ON: &[u8] = &[0x1B, 0x45, 0x01];
const BOLD_OFF: &[u8] = &[0x1B, 0x45, 0x00];

/// Accumulates a ticket as ESC/POS bytes
///
/// Chained calls append commands and UTF-8 text; [`EscPosBuilder::build`]
/// converts the text to the printer's encoding at the end.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    profile: Profile,
    encoding: TextEncoding,
}

impl EscPosBuilder {
    /// `width` is the line length in columns (32 on 58mm paper, 48 on 80mm).
    /// The buffer starts with `ESC @`.
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(1024);
        buf.extend_from_slice(INIT);
        Self {
            buf,
            width,
            profile: Profile::default(),
            encoding: TextEncoding::default(),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    fn cmd(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.cmd(s.as_bytes())
    }

    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s).newline()
    }

    pub fn newline(&mut self) -> &mut Self {
        self.cmd(b"\n")
    }

    /// `ESC d n`
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.cmd(&[0x1B, 0x64, lines])
    }

    pub fn center(&mut self) -> &mut Self {
        self.cmd(ALIGN_CENTER)
    }

    pub fn left(&mut self) -> &mut Self {
        self.cmd(ALIGN_LEFT)
    }

    pub fn bold(&mut self) -> &mut Self {
        self.cmd(BOLD_ON)
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.cmd(BOLD_OFF)
    }

    /// Double width and height, in the profile's dialect
    pub fn double_size(&mut self) -> &mut Self {
        self.cmd(self.profile.double_size())
    }

    pub fn reset_size(&mut self) -> &mut Self {
        self.cmd(self.profile.normal_size())
    }

    /// `columns` copies of `ch` on their own line
    pub fn rule(&mut self, ch: char, columns: usize) -> &mut Self {
        let s: String = std::iter::repeat_n(ch, columns).collect();
        self.line(&s)
    }

    /// Full-width `=` rule
    pub fn sep_double(&mut self) -> &mut Self {
        self.rule('=', self.width)
    }

    /// Full-width `-` rule
    pub fn sep_single(&mut self) -> &mut Self {
        self.rule('-', self.width)
    }

    pub fn cut(&mut self) -> &mut Self {
        self.cmd(self.profile.cut())
    }

    /// Finished stream in the printer's encoding
    pub fn build(self) -> Vec<u8> {
        self.encoding.encode(self.buf)
    }

    /// Finished stream with text left as UTF-8
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_starts_with_init() {
        let data = EscPosBuilder::new(32).build_raw();
        assert_eq!(data, vec![0x1B, 0x40]);
    }

    #[test]
    fn test_profile_sizing_and_cut() {
        let mut b = EscPosBuilder::new(32).with_profile(Profile::Epson);
        b.double_size().reset_size().cut();
        let data = b.build_raw();
        assert_eq!(
            &data[2..],
            &[0x1B, 0x21, 0x30, 0x1B, 0x21, 0x00, 0x1D, 0x56, 0x00]
        );

        let mut b = EscPosBuilder::new(32);
        b.double_size().cut();
        let data = b.build_raw();
        assert_eq!(
            &data[2..],
            &[0x1D, 0x21, 0x11, 0x1B, 0x64, 0x03, 0x1B, 0x6D]
        );
    }

    #[test]
    fn test_separators() {
        let mut b = EscPosBuilder::new(10);
        b.sep_double().rule('-', 4);

        let s = String::from_utf8_lossy(&b.build_raw()).into_owned();
        assert!(s.contains("==========\n"));
        assert!(s.contains("----\n"));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("XPRINTER".parse::<Profile>().unwrap(), Profile::Epson);
        assert_eq!("hrpt".parse::<Profile>().unwrap(), Profile::Hrpt);
        assert!("zebra".parse::<Profile>().is_err());
    }

    #[test]
    fn test_profile_serde_names() {
        assert_eq!(serde_json::to_string(&Profile::Epson).unwrap(), "\"epson\"");
        let parsed: Profile = serde_json::from_str("\"hrpt\"").unwrap();
        assert_eq!(parsed, Profile::Hrpt);
        assert_eq!(Profile::Epson.to_string(), "epson");
    }

    #[test]
    fn test_gbk_build() {
        let mut b = EscPosBuilder::new(32).with_encoding(TextEncoding::Gbk);
        b.line("宫保鸡丁");
        let data = b.build();
        // Chinese mode prefix, then INIT + re-enable
        assert_eq!(&data[..5], &[0x1C, 0x26, 0x1C, 0x43, 0x01]);
        assert_eq!(data.last(), Some(&0x2E));
    }
}
