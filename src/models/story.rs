use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationMode {
    Creative,
    Broadcast,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Creative => f.write_str("CREATIVE"),
            GenerationMode::Broadcast => f.write_str("BROADCAST"),
        }
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATIVE" => Ok(GenerationMode::Creative),
            "BROADCAST" => Ok(GenerationMode::Broadcast),
            other => Err(format!(
                "Unknown generation mode '{}'. Expected CREATIVE or BROADCAST",
                other
            )),
        }
    }
}

/// A story generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySubmission {
    pub mode: GenerationMode,
    pub script: String,
    pub voice_id: String,
    pub title: Option<String>,
    pub avatar_image_url: Option<String>,
}

impl StorySubmission {
    pub fn new(
        mode: GenerationMode,
        script: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            script: script.into(),
            voice_id: voice_id.into(),
            title: None,
            avatar_image_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_avatar_image_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_image_url = Some(url.into());
        self
    }

    /// Reject requests the backend would refuse anyway, before any network call.
    pub fn validate(&self) -> Result<(), String> {
        if self.script.trim().is_empty() {
            return Err("script must not be empty".to_string());
        }
        if self.voice_id.trim().is_empty() {
            return Err("voice id must not be empty".to_string());
        }
        Ok(())
    }

    /// Title with blank values treated as absent.
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// Avatar image URL with blank values treated as absent.
    pub fn avatar_image_url(&self) -> Option<&str> {
        non_blank(self.avatar_image_url.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// Recorded audio to clone a voice from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSample {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub label: Option<String>,
}

impl VoiceSample {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: DEFAULT_AUDIO_MIME.to_string(),
            label: None,
        }
    }

    /// Guess an audio MIME type from the file extension, falling back to mpeg
    /// when the extension is unknown or not audio.
    pub fn mime_for_file_name(file_name: &str) -> String {
        mime_guess::from_path(file_name)
            .iter()
            .find(|mime| mime.type_() == mime_guess::mime::AUDIO)
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub voice_id: String,
    #[serde(default)]
    pub label: Option<String>,
}
