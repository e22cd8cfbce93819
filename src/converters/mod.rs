//! Format codecs
//!
//! The engine never touches file formats directly; it goes through a `FormatCodec`.
//! MusicXML (uncompressed) is the only format implemented here.

pub mod musicxml;

pub use musicxml::MusicXmlCodec;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;
use crate::models::Score;

/// Text formats a score can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    MusicXml,
    Humdrum,
    Mei,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::MusicXml => "musicxml",
            ExportFormat::Humdrum => "humdrum",
            ExportFormat::Mei => "mei",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "musicxml" | "xml" => Ok(ExportFormat::MusicXml),
            "humdrum" | "krn" => Ok(ExportFormat::Humdrum),
            "mei" => Ok(ExportFormat::Mei),
            other => Err(CodecError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Lower-cased extension of a filename hint, if it has one
pub fn file_extension(filename_hint: &str) -> Option<String> {
    let name = filename_hint.rsplit(['/', '\\']).next().unwrap_or(filename_hint);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Decode raw file content into a score, or encode a score as text
pub trait FormatCodec {
    fn decode(&self, raw: &[u8], filename_hint: &str) -> Result<Score, CodecError>;

    fn encode(&self, score: &Score, format: ExportFormat) -> Result<String, CodecError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_parse() {
        assert_eq!("MusicXML".parse::<ExportFormat>().unwrap(), ExportFormat::MusicXml);
        assert_eq!("krn".parse::<ExportFormat>().unwrap(), ExportFormat::Humdrum);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("song.MusicXML").as_deref(), Some("musicxml"));
        assert_eq!(file_extension("dir.v2/song").as_deref(), None);
        assert_eq!(file_extension("a/b/c.mxl").as_deref(), Some("mxl"));
        assert_eq!(file_extension("noext"), None);
    }
}
