pub mod whisper;

pub use whisper::{clean_transcript, TranscriptionError, WhisperTranscriber, AUDIO_EXTRACTION_ERROR};
