pub mod config;
pub mod job;
pub mod story;

pub use config::{ClientConfig, PollFailurePolicy};
pub use job::{JobState, JobStatus};
pub use story::{GenerationMode, StorySubmission, VoiceProfile, VoiceSample};
