//! In-memory audio decoding using symphonia
//!
//! Call recordings arrive as complete payloads, so the whole recording is
//! decoded up front.
//!
//! # Sample Format
//!
//! - Output: Stereo f32 samples (interleaved: [L, R, L, R, ...])
//! - Mono recordings: duplicated to stereo
//! - Multi-channel: downmixed to stereo

use super::DecodedAudio;
use crate::error::{Error, Result};
use crate::fetch::AudioPayload;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode a complete payload to interleaved stereo f32 at its native rate
pub fn decode_payload(payload: AudioPayload) -> Result<DecodedAudio> {
    let mut hint = Hint::new();
    if !payload.mime_type.is_empty() && payload.mime_type != "application/octet-stream" {
        hint.mime_type(&payload.mime_type);
    }

    let byte_len = payload.bytes.len();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(payload.bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("unrecognised {} data ({})", payload.mime_type, e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode("recording has no audio track".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec ({})", e)))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut stereo = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping corrupt packet: {}", msg);
                continue;
            }
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        append_as_stereo(buffer.samples(), spec.channels.count(), &mut stereo);
    }

    if stereo.is_empty() {
        return Err(Error::Decode("recording contains no audio".to_string()));
    }

    let sample_rate = sample_rate
        .ok_or_else(|| Error::Decode("recording has no sample rate".to_string()))?;

    debug!(
        "Decoded {} bytes into {} frames at {}Hz",
        byte_len,
        stereo.len() / 2,
        sample_rate
    );

    Ok(DecodedAudio::new(stereo, sample_rate))
}

/// Append interleaved `channels`-wide samples to `out` as interleaved stereo
fn append_as_stereo(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            // Mono: duplicate to stereo
            out.reserve(samples.len() * 2);
            for &sample in samples {
                out.push(sample);
                out.push(sample);
            }
        }
        2 => out.extend_from_slice(samples),
        _ => {
            // Multi-channel: even channels feed left, odd channels feed right
            let half = channels as f32 / 2.0;
            out.reserve(samples.len() / channels * 2);
            for frame in samples.chunks_exact(channels) {
                let mut left_sum = 0.0f32;
                let mut right_sum = 0.0f32;
                for (ch_idx, &sample) in frame.iter().enumerate() {
                    if ch_idx % 2 == 0 {
                        left_sum += sample;
                    } else {
                        right_sum += sample;
                    }
                }
                out.push(left_sum / half);
                out.push(right_sum / half);
            }
        }
    }
}
