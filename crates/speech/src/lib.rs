pub mod device;
pub mod pcm;
pub mod stt;
pub mod tts;

/// Sample rate requested from the text-to-speech service.
pub const TTS_SAMPLE_RATE: u32 = 24000;

/// Sample rate the speech-to-text service expects for LINEAR16 uploads.
pub const STT_SAMPLE_RATE: u32 = 16000;
