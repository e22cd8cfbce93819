//! Uncompressed MusicXML (score-partwise) codec

pub mod emitter;
pub mod parser;

pub use emitter::{duration_to_note_type, write_musicxml};
pub use parser::parse_musicxml;

use crate::converters::{file_extension, ExportFormat, FormatCodec};
use crate::error::CodecError;
use crate::models::Score;

/// Reads and writes `.musicxml` / `.xml` files
#[derive(Debug, Clone, Copy, Default)]
pub struct MusicXmlCodec;

impl MusicXmlCodec {
    pub fn new() -> Self {
        Self
    }
}

fn looks_like_xml(raw: &[u8]) -> bool {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    // skip a UTF-8 byte order mark
    let body = raw[start..].strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&raw[start..]);
    body.first() == Some(&b'<')
}

impl FormatCodec for MusicXmlCodec {
    fn decode(&self, raw: &[u8], filename_hint: &str) -> Result<Score, CodecError> {
        match file_extension(filename_hint).as_deref() {
            Some("musicxml") | Some("xml") => {}
            None if looks_like_xml(raw) => {}
            None => {
                return Err(CodecError::MalformedInput(format!(
                    "'{}' does not look like MusicXML",
                    filename_hint
                )))
            }
            Some(other) => return Err(CodecError::UnsupportedFormat(other.to_string())),
        }

        let text = std::str::from_utf8(raw)
            .map_err(|e| CodecError::MalformedInput(format!("not valid UTF-8: {}", e)))?;
        let text = text.trim_start_matches('\u{feff}');
        let score = parse_musicxml(text)?;
        log::debug!(
            "Decoded '{}': {} part(s), {} measure(s)",
            filename_hint,
            score.parts.len(),
            score.parts.first().map(|p| p.measures.len()).unwrap_or(0)
        );
        Ok(score)
    }

    fn encode(&self, score: &Score, format: ExportFormat) -> Result<String, CodecError> {
        match format {
            ExportFormat::MusicXml => Ok(write_musicxml(score)),
            other => Err(CodecError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Lead</part-name></score-part></part-list>
  <part id="P1"><measure number="1">
    <attributes><divisions>1</divisions></attributes>
    <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
  </measure></part>
</score-partwise>"#;

    #[test]
    fn test_decode_by_extension() {
        let codec = MusicXmlCodec::new();
        let score = codec.decode(MINIMAL.as_bytes(), "song.musicxml").unwrap();
        assert_eq!(score.parts[0].name, "Lead");
        assert!(codec.decode(MINIMAL.as_bytes(), "song.XML").is_ok());
        assert!(codec.decode(MINIMAL.as_bytes(), "upload").is_ok());
    }

    #[test]
    fn test_decode_rejects_other_formats() {
        let codec = MusicXmlCodec::new();
        for name in ["song.mxl", "song.krn", "song.mei"] {
            assert!(matches!(
                codec.decode(MINIMAL.as_bytes(), name),
                Err(CodecError::UnsupportedFormat(_))
            ));
        }
        assert!(matches!(
            codec.decode(&[0xff, 0xfe, 0x3c], "song.xml"),
            Err(CodecError::MalformedInput(_))
        ));
        assert!(matches!(
            codec.decode(b"**kern", "upload"),
            Err(CodecError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_encode_only_musicxml() {
        let codec = MusicXmlCodec::new();
        let score = codec.decode(MINIMAL.as_bytes(), "a.xml").unwrap();
        assert!(codec
            .encode(&score, ExportFormat::MusicXml)
            .unwrap()
            .contains("<score-partwise"));
        assert_eq!(
            codec.encode(&score, ExportFormat::Humdrum),
            Err(CodecError::UnsupportedFormat("humdrum".to_string()))
        );
    }
}
