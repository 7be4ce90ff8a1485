//! Probe tool output types.
//!
//! The probe command emits a JSON document with a `format` section
//! (container-level info plus the tag map) and a `streams` array.

use core_schema::TagMap;
use serde::Deserialize;

/// Top-level probe document
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeOutput {
    pub format: Option<ProbeFormat>,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

/// Container-level format information
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeFormat {
    pub duration: Option<String>,
    pub size: Option<String>,
    pub bit_rate: Option<String>,
    pub format_name: Option<String>,
    pub format_long_name: Option<String>,
    #[serde(default)]
    pub tags: TagMap,
}

/// Per-stream information
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeStream {
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Read-only attributes derived from the file itself.
///
/// Never user-editable; the schema locks the corresponding keys to
/// `Role::Noone`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intrinsic {
    pub duration: f64,
    pub size: u64,
    pub bit_rate: u64,
    pub format_name: String,
    pub format_long_name: String,
    pub width: u32,
    pub height: u32,
    pub codec_name: String,
    pub codec_type: String,
}

impl Intrinsic {
    /// Build from a probe document taking the first video stream, if any.
    pub fn from_probe(probe: &ProbeOutput) -> Self {
        let mut data = Intrinsic::default();

        if let Some(format) = &probe.format {
            data.duration = format
                .duration
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            data.size = format
                .size
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            data.bit_rate = format
                .bit_rate
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            data.format_name = format.format_name.clone().unwrap_or_default();
            data.format_long_name = format.format_long_name.clone().unwrap_or_default();
        }

        if let Some(video) = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
        {
            data.width = video.width.unwrap_or(0);
            data.height = video.height.unwrap_or(0);
            data.codec_name = video.codec_name.clone().unwrap_or_default();
            data.codec_type = video.codec_type.clone().unwrap_or_default();
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_from_probe() {
        let json = r#"{
            "format": {
                "duration": "12.5",
                "size": "1048576",
                "bit_rate": "800000",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "format_long_name": "QuickTime / MOV",
                "tags": {"title": "Trip"}
            },
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
            ]
        }"#;

        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        let intrinsic = Intrinsic::from_probe(&probe);

        assert_eq!(intrinsic.duration, 12.5);
        assert_eq!(intrinsic.size, 1_048_576);
        assert_eq!(intrinsic.width, 1920);
        assert_eq!(intrinsic.codec_name, "h264");
        // first *video* stream wins, not the first stream
        assert_eq!(intrinsic.codec_type, "video");
    }

    #[test]
    fn test_probe_without_tags_or_streams() {
        let probe: ProbeOutput = serde_json::from_str(r#"{"format": {}}"#).unwrap();
        let intrinsic = Intrinsic::from_probe(&probe);
        assert_eq!(intrinsic.duration, 0.0);
        assert!(probe.format.unwrap().tags.is_empty());
    }
}
