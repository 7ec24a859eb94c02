use std::io::Cursor;
use std::time::Duration;

use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::interface::AudioClip;
use crate::error::{SpeechError, SpeechResult};

/// What a full decode pass found in a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedClip {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: u64,
}

impl DecodedClip {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }
}

fn decode_error(message: impl std::fmt::Display) -> SpeechError {
    SpeechError::Decode(format!("Audio clip is not playable: {}", message))
}

/// Decode every packet of `clip`. Fails with `Decode` unless at least one
/// audio frame comes out.
pub fn decode_clip(clip: &AudioClip) -> SpeechResult<DecodedClip> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(clip.bytes.clone())), Default::default());
    let mut hint = Hint::new();
    hint.mime_type(clip.mime_type).with_extension(clip.extension());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error("no audio track"))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut decoded = DecodedClip {
        sample_rate: track.codec_params.sample_rate.unwrap_or(0),
        channels: track.codec_params.channels.map(|c| c.count()).unwrap_or(0),
        frames: 0,
    };

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(buffer) => {
                let spec = *buffer.spec();
                decoded.sample_rate = spec.rate;
                decoded.channels = spec.channels.count();
                decoded.frames += buffer.frames() as u64;
            }
            // A corrupt packet is skipped; the clip fails only if nothing decodes.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(decode_error(e)),
        }
    }

    if decoded.frames == 0 {
        return Err(decode_error("no audio frames"));
    }
    Ok(decoded)
}

/// `count` frames of MPEG-1 Layer III silence: 44.1 kHz, 128 kbit/s, mono.
#[cfg(test)]
pub(crate) fn silent_mp3(count: usize) -> Vec<u8> {
    const FRAME_LEN: usize = 417;
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
    frame.repeat(count)
}
