// CLI voice commands: clone-voice

use std::path::Path;

use super::{build_client, describe_error};
use crate::client::GenerationClient;
use crate::models::{ClientConfig, VoiceSample};

/// Read an audio file into a sample ready for upload.
pub async fn read_voice_sample(path: &Path, label: Option<&str>) -> anyhow::Result<VoiceSample> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read audio file '{}': {}", path.display(), e))?;
    if bytes.is_empty() {
        anyhow::bail!("Audio file '{}' is empty", path.display());
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("voice.mp3")
        .to_string();
    let mut sample = VoiceSample::new(bytes, file_name);
    sample.mime_type = VoiceSample::mime_for_file_name(&sample.file_name);
    sample.label = label.map(str::to_string);
    Ok(sample)
}

/// vpc clone-voice
pub async fn cmd_clone_voice(
    config: &ClientConfig,
    file: &Path,
    label: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let sample = read_voice_sample(file, label).await?;
    let client = build_client(config)?;

    let profile = client
        .clone_voice(sample)
        .await
        .map_err(|e| describe_error(&e, &config.base_url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Voice cloned successfully.");
        println!("  Voice ID: {}", profile.voice_id);
        if let Some(label) = &profile.label {
            println!("  Label:    {}", label);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_voice_sample_sets_name_and_mime() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("narrator.wav");
        std::fs::write(&path, b"RIFF....WAVE").expect("write");

        let sample = read_voice_sample(&path, Some("Narrator")).await.expect("sample");
        assert_eq!(sample.file_name, "narrator.wav");
        assert_eq!(sample.mime_type, "audio/wav");
        assert_eq!(sample.label.as_deref(), Some("Narrator"));
        assert_eq!(sample.bytes, b"RIFF....WAVE".to_vec());
    }

    #[tokio::test]
    async fn test_read_voice_sample_rejects_empty_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.mp3");
        std::fs::write(&path, b"").expect("write");

        let err = read_voice_sample(&path, None).await.unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[tokio::test]
    async fn test_read_voice_sample_missing_file() {
        let err = read_voice_sample(Path::new("/definitely/not/here.mp3"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read audio file"));
    }
}
