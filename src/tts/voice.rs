//! Voice selection parameters sent with every synthesis request.

use serde::{Deserialize, Serialize};

/// Accepted `speaking_rate` range.
pub const SPEAKING_RATE_RANGE: (f32, f32) = (0.5, 2.0);
/// Accepted `pitch` range, in semitones.
pub const PITCH_RANGE: (f32, f32) = (-10.0, 10.0);

/// SSML voice gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

impl VoiceGender {
    /// Wire name used by the synthesis service (`"FEMALE"` / `"MALE"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceGender::Female => "FEMALE",
            VoiceGender::Male => "MALE",
        }
    }

    /// Parse the wire name; unknown values return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "FEMALE" => Some(VoiceGender::Female),
            "MALE" => Some(VoiceGender::Male),
            _ => None,
        }
    }
}

/// How a page should be voiced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    /// BCP-47 language code, e.g. `"tr-TR"`.
    pub language_code: String,
    pub voice_gender: VoiceGender,
    /// Specific voice, e.g. `"tr-TR-Wavenet-A"`.  `None` lets the service
    /// pick one matching language and gender.
    pub voice_name: Option<String>,
    /// 1.0 is normal speed; accepted range 0.5 – 2.0.
    pub speaking_rate: f32,
    /// Semitones relative to the voice default; accepted range -10 – 10.
    pub pitch: f32,
}

impl VoiceParams {
    /// Return a copy with `speaking_rate` and `pitch` clamped into their
    /// accepted ranges.  Non-finite values fall back to the defaults.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let rate = clamp_or(self.speaking_rate, SPEAKING_RATE_RANGE, defaults.speaking_rate);
        let pitch = clamp_or(self.pitch, PITCH_RANGE, defaults.pitch);

        if rate != self.speaking_rate || pitch != self.pitch {
            log::warn!(
                "voice: clamped speaking_rate {} -> {rate}, pitch {} -> {pitch}",
                self.speaking_rate,
                self.pitch
            );
        }

        Self {
            speaking_rate: rate,
            pitch,
            ..self.clone()
        }
    }
}

fn clamp_or(value: f32, (lo, hi): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            language_code: "tr-TR".into(),
            voice_gender: VoiceGender::Female,
            voice_name: None,
            speaking_rate: 1.0,
            pitch: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_wire_names() {
        assert_eq!(VoiceGender::Female.as_str(), "FEMALE");
        assert_eq!(VoiceGender::Male.as_str(), "MALE");
        assert_eq!(VoiceGender::parse("male"), Some(VoiceGender::Male));
        assert_eq!(VoiceGender::parse("NEUTRAL"), None);
    }

    #[test]
    fn gender_serialises_as_screaming_case() {
        let json = serde_json::to_string(&VoiceGender::Male).unwrap();
        assert_eq!(json, "\"MALE\"");
    }

    #[test]
    fn in_range_values_are_untouched() {
        let params = VoiceParams {
            speaking_rate: 1.5,
            pitch: -3.0,
            ..VoiceParams::default()
        };
        assert_eq!(params.clamped(), params);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let params = VoiceParams {
            speaking_rate: 4.0,
            pitch: -25.0,
            ..VoiceParams::default()
        };
        let clamped = params.clamped();
        assert_eq!(clamped.speaking_rate, 2.0);
        assert_eq!(clamped.pitch, -10.0);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let params = VoiceParams {
            speaking_rate: f32::NAN,
            pitch: f32::INFINITY,
            ..VoiceParams::default()
        };
        let clamped = params.clamped();
        assert_eq!(clamped.speaking_rate, 1.0);
        assert_eq!(clamped.pitch, 0.0);
    }
}
