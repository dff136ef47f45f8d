//! Clip decoding using symphonia
//!
//! Decodes a whole clip into memory. Voice lines and short effects are small
//! enough that streaming decode is not worth the complexity here.
//!
//! # Supported Formats
//!
//! Per Cargo.toml symphonia features: WAV/PCM, MP3, FLAC, AAC, MP4/M4A, Vorbis.
//!
//! # Sample Format
//!
//! Output keeps the source channel layout, interleaved f32.

use crate::audio::clip::{AudioClip, ClipOrigin};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode an audio file into a clip
pub fn decode_file(key: &str, path: &Path) -> Result<AudioClip> {
    let file = File::open(path)
        .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

    let extension = path.extension().and_then(|ext| ext.to_str());
    let clip = decode_source(key, Box::new(file), extension)?;
    Ok(clip.with_origin(ClipOrigin::File(path.to_path_buf())))
}

/// Decode in-memory encoded bytes into a clip
///
/// `extension` is a format hint (e.g. "mp3"); probing still inspects the data.
pub fn decode_bytes(key: &str, bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioClip> {
    decode_source(key, Box::new(Cursor::new(bytes)), extension)
}

fn decode_source(
    key: &str,
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
) -> Result<AudioClip> {
    let mss = MediaSourceStream::new(source, Default::default());

    // Create hint from extension
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext.trim_start_matches('.'));
    }

    // Probe format
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("{}: unsupported format ({})", key, e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode(format!("{}: no audio track found", key)))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("{}: unsupported codec ({})", key, e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // EOF
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(format!("{}: {}", key, e))),
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet: skip it, keep the rest of the clip
                warn!("{}: skipping undecodable packet: {}", key, e);
            }
            Err(e) => return Err(Error::Decode(format!("{}: {}", key, e))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Decode(format!("{}: no samples decoded", key)));
    }

    debug!(
        "Decoded {}: {} samples, {} Hz, {} channel(s)",
        key,
        samples.len(),
        sample_rate,
        channels
    );

    Ok(AudioClip::new(key, samples, sample_rate, channels))
}
