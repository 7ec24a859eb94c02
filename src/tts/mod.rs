pub mod interface;
pub mod playback;
pub mod client;
pub mod decode;
pub mod command;
pub mod local;
pub mod silent;
pub mod factory;

pub use interface::{
    AudioBackend, AudioClip, PlaybackCompletion, Sound, SpeechOptions, SpeechSynthesizer, Voice,
    VoiceQuality,
};
pub use playback::{PlaybackHandle, PlaybackState};
pub use client::RemoteAudioClient;
pub use decode::{decode_clip, DecodedClip};
pub use command::CommandAudioBackend;
pub use local::CommandSynthesizer;
pub use silent::{SilentAudioBackend, SilentStats, SilentSynthesizer};
pub use factory::TTSFactory;
