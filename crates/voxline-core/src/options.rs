//! Voice tunables sent with each synthesis task.
//!
//! Every field has a fixed nominal default, so `VoiceOptions::default()`
//! is a complete, working parameter set. The values map one-to-one onto
//! the `parameters` object of the `run-task` envelope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default synthesis model identifier.
pub const DEFAULT_MODEL: &str = "cosyvoice-v1";

/// Default timbre for [`DEFAULT_MODEL`].
pub const DEFAULT_VOICE: &str = "longxiaochun";

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Default volume on the service's 0–100 scale.
pub const DEFAULT_VOLUME: u8 = 50;

// ── Output codec ───────────────────────────────────────────────────

/// Output audio codec for the synthesized stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 layer III frames.
    #[default]
    Mp3,
    /// RIFF WAV container.
    Wav,
    /// Raw PCM16 LE samples, no container.
    Pcm,
}

impl AudioFormat {
    /// The wire name of the codec, as the service expects it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "pcm" => Ok(Self::Pcm),
            other => Err(format!("unknown audio format '{other}' (expected mp3, wav, or pcm)")),
        }
    }
}

// ── Voice options ──────────────────────────────────────────────────

/// Recognized synthesis tunables.
///
/// Each field defaults to a fixed nominal value when omitted, so partial
/// overrides compose with `..VoiceOptions::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceOptions {
    /// Synthesis model identifier.
    pub model: String,

    /// Timbre selector.
    pub voice: String,

    /// Output codec.
    pub format: AudioFormat,

    /// Output sample rate in Hz.
    pub sample_rate: u32,

    /// Volume, 0–100.
    pub volume: u8,

    /// Speech-speed multiplier (1.0 = nominal).
    pub rate: f32,

    /// Pitch multiplier (1.0 = nominal).
    pub pitch: f32,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            format: AudioFormat::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            volume: DEFAULT_VOLUME,
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_nominal() {
        let opts = VoiceOptions::default();
        assert_eq!(opts.model, "cosyvoice-v1");
        assert_eq!(opts.voice, "longxiaochun");
        assert_eq!(opts.format, AudioFormat::Mp3);
        assert_eq!(opts.sample_rate, 22_050);
        assert_eq!(opts.volume, 50);
        assert!((opts.rate - 1.0).abs() < f32::EPSILON);
        assert!((opts.pitch - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn format_round_trips_through_str() {
        for fmt in [AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Pcm] {
            assert_eq!(fmt.as_str().parse::<AudioFormat>().unwrap(), fmt);
        }
        assert!("ogg".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn format_serializes_lowercase() {
        let json = serde_json::to_string(&AudioFormat::Wav).unwrap();
        assert_eq!(json, "\"wav\"");
    }
}
