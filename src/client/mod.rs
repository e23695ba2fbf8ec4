pub mod http;

use async_trait::async_trait;

use crate::errors::ClientError;
use crate::models::{JobStatus, StorySubmission, VoiceProfile, VoiceSample};

pub use http::HttpGenerationClient;

/// Remote capability the tracker depends on.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Submit a story for generation and return the server-assigned job id.
    async fn submit_story(&self, submission: &StorySubmission) -> Result<String, ClientError>;

    /// Fetch the current status of a job.
    async fn fetch_job(&self, job_id: &str) -> Result<JobStatus, ClientError>;

    /// Upload a voice sample to be cloned.
    async fn clone_voice(&self, sample: VoiceSample) -> Result<VoiceProfile, ClientError>;
}
