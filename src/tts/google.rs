//! Google Cloud Text-to-Speech REST gateway.
//!
//! Talks to `POST /v1/text:synthesize` and `GET /v1/voices` with an API key.
//! All connection details come from [`SynthesisConfig`]; nothing is
//! hardcoded beyond the wire format.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::catalog::VoiceDirectory;
use super::gateway::{SynthesisError, SynthesisGateway};
use super::voice::{VoiceGender, VoiceParams};
use crate::config::SynthesisConfig;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
    pitch: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<WireVoice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVoice {
    name: String,
    #[serde(default)]
    language_codes: Vec<String>,
    #[serde(default)]
    ssml_gender: String,
    #[serde(default)]
    natural_sample_rate_hertz: u32,
}

// ---------------------------------------------------------------------------
// VoiceInfo
// ---------------------------------------------------------------------------

/// A voice offered by the synthesis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub language_codes: Vec<String>,
    /// `None` for neutral or unspecified voices.
    pub gender: Option<VoiceGender>,
    pub natural_sample_rate_hertz: u32,
}

impl From<WireVoice> for VoiceInfo {
    fn from(v: WireVoice) -> Self {
        Self {
            gender: VoiceGender::parse(&v.ssml_gender),
            name: v.name,
            language_codes: v.language_codes,
            natural_sample_rate_hertz: v.natural_sample_rate_hertz,
        }
    }
}

/// Keep only voices of `gender`; `None` keeps all.
pub fn filter_voices(voices: Vec<VoiceInfo>, gender: Option<VoiceGender>) -> Vec<VoiceInfo> {
    match gender {
        Some(g) => voices.into_iter().filter(|v| v.gender == Some(g)).collect(),
        None => voices,
    }
}

// ---------------------------------------------------------------------------
// GoogleTtsGateway
// ---------------------------------------------------------------------------

/// Synthesizes MP3 audio with Google Cloud Text-to-Speech.
pub struct GoogleTtsGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    preview_text: String,
}

impl GoogleTtsGateway {
    /// Build a gateway from application config.
    ///
    /// The HTTP client carries the per-request `timeout`.  A default client
    /// is used if the builder fails.
    pub fn from_config(config: &SynthesisConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            preview_text: config.preview_text.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, SynthesisError> {
        self.api_key.as_deref().ok_or_else(|| {
            SynthesisError::NotConfigured(format!(
                "set synthesis.api_key or {}",
                crate::config::settings::API_KEY_ENV
            ))
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SynthesisError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(SynthesisError::Status {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

fn build_request<'a>(text: &'a str, voice: &'a VoiceParams) -> SynthesizeRequest<'a> {
    SynthesizeRequest {
        input: SynthesisInput { text },
        voice: VoiceSelection {
            language_code: &voice.language_code,
            name: voice.voice_name.as_deref().filter(|n| !n.is_empty()),
            ssml_gender: voice.voice_gender.as_str(),
        },
        audio_config: AudioConfig {
            audio_encoding: "MP3",
            speaking_rate: voice.speaking_rate,
            pitch: voice.pitch,
        },
    }
}

fn decode_audio(body: SynthesizeResponse) -> Result<Vec<u8>, SynthesisError> {
    let audio = BASE64
        .decode(body.audio_content.as_bytes())
        .map_err(|e| SynthesisError::Decode(e.to_string()))?;
    if audio.is_empty() {
        return Err(SynthesisError::EmptyAudio);
    }
    Ok(audio)
}

#[async_trait]
impl SynthesisGateway for GoogleTtsGateway {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
        let voice = voice.clamped();
        let url = format!("{}/v1/text:synthesize", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .json(&build_request(text, &voice))
            .send()
            .await?;

        let body: SynthesizeResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;

        let audio = decode_audio(body)?;
        log::debug!("google tts: {} text bytes -> {} audio bytes", text.len(), audio.len());
        Ok(audio)
    }
}

#[async_trait]
impl VoiceDirectory for GoogleTtsGateway {
    /// List the service's voices for `language_code`, optionally filtered by
    /// gender.
    async fn list_voices(
        &self,
        language_code: &str,
        gender: Option<VoiceGender>,
    ) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let url = format!("{}/v1/voices", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("languageCode", language_code), ("key", self.api_key()?)])
            .send()
            .await?;
        let body: VoicesResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;

        let voices = body.voices.into_iter().map(VoiceInfo::from).collect();
        Ok(filter_voices(voices, gender))
    }

    /// Synthesize the configured preview sentence with voice `name`.
    async fn preview_voice(
        &self,
        voice: &VoiceParams,
        name: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        let params = VoiceParams {
            voice_name: Some(name.to_string()),
            ..voice.clone()
        };
        self.synthesize(&self.preview_text, &params).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> SynthesisConfig {
        SynthesisConfig {
            base_url: "http://localhost:9/".into(),
            api_key: api_key.map(str::to_string),
            ..SynthesisConfig::default()
        }
    }

    #[test]
    fn request_body_matches_wire_format() {
        let voice = VoiceParams {
            voice_name: Some("tr-TR-Wavenet-A".into()),
            speaking_rate: 1.25,
            pitch: -2.0,
            ..VoiceParams::default()
        };
        let json = serde_json::to_value(build_request("Merhaba", &voice)).unwrap();

        assert_eq!(json["input"]["text"], "Merhaba");
        assert_eq!(json["voice"]["languageCode"], "tr-TR");
        assert_eq!(json["voice"]["name"], "tr-TR-Wavenet-A");
        assert_eq!(json["voice"]["ssmlGender"], "FEMALE");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(json["audioConfig"]["speakingRate"], 1.25);
        assert_eq!(json["audioConfig"]["pitch"], -2.0);
    }

    #[test]
    fn empty_voice_name_is_omitted() {
        let voice = VoiceParams {
            voice_name: Some(String::new()),
            ..VoiceParams::default()
        };
        let json = serde_json::to_value(build_request("x", &voice)).unwrap();
        assert!(json["voice"].get("name").is_none());
    }

    #[test]
    fn decode_audio_reads_base64() {
        let body = SynthesizeResponse {
            audio_content: BASE64.encode(b"ID3mp3"),
        };
        assert_eq!(decode_audio(body).unwrap(), b"ID3mp3");
    }

    #[test]
    fn decode_audio_rejects_empty_and_garbage() {
        let empty = SynthesizeResponse {
            audio_content: String::new(),
        };
        assert_eq!(decode_audio(empty), Err(SynthesisError::EmptyAudio));

        let garbage = SynthesizeResponse {
            audio_content: "***".into(),
        };
        assert!(matches!(decode_audio(garbage), Err(SynthesisError::Decode(_))));
    }

    #[test]
    fn voices_filter_by_gender() {
        let body: VoicesResponse = serde_json::from_str(
            r#"{"voices":[
                {"name":"tr-TR-Standard-A","languageCodes":["tr-TR"],"ssmlGender":"FEMALE","naturalSampleRateHertz":24000},
                {"name":"tr-TR-Standard-B","languageCodes":["tr-TR"],"ssmlGender":"MALE","naturalSampleRateHertz":24000},
                {"name":"tr-TR-Neutral","languageCodes":["tr-TR"],"ssmlGender":"NEUTRAL"}
            ]}"#,
        )
        .unwrap();
        let voices: Vec<VoiceInfo> = body.voices.into_iter().map(VoiceInfo::from).collect();

        let male = filter_voices(voices.clone(), Some(VoiceGender::Male));
        assert_eq!(male.len(), 1);
        assert_eq!(male[0].name, "tr-TR-Standard-B");
        assert_eq!(filter_voices(voices, None).len(), 3);
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        // Only meaningful when the env fallback is unset.
        if std::env::var(crate::config::settings::API_KEY_ENV).is_ok() {
            return;
        }
        let gateway = GoogleTtsGateway::from_config(&config(None), Duration::from_secs(1));
        let err = gateway
            .synthesize("x", &VoiceParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn listing_voices_requires_api_key() {
        if std::env::var(crate::config::settings::API_KEY_ENV).is_ok() {
            return;
        }
        let gateway = GoogleTtsGateway::from_config(&config(None), Duration::from_secs(1));
        let err = gateway.list_voices("tr-TR", None).await.unwrap_err();
        assert!(matches!(err, SynthesisError::NotConfigured(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = GoogleTtsGateway::from_config(&config(Some("k")), Duration::from_secs(1));
        assert_eq!(gateway.base_url, "http://localhost:9");
    }

    #[test]
    fn gateway_is_object_safe() {
        let gateway: Box<dyn SynthesisGateway> = Box::new(GoogleTtsGateway::from_config(
            &config(Some("k")),
            Duration::from_secs(1),
        ));
        drop(gateway);
    }
}
