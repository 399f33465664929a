//! External service clients and the submission pipeline

pub mod caption;
pub mod pipeline;
pub mod track;

pub use caption::{Caption, CaptionService, OpenAiCaptionClient};
pub use pipeline::{PersistOutcome, SubmissionOutcome, SubmissionPipeline};
pub use track::{SpotifyTrackClient, TrackResolver};
