//! Audio file decoding for clip preloading
//!
//! Decodes a whole file into interleaved f32 samples with symphonia
//! (WAV, FLAC, MP3, Ogg Vorbis). This runs on the control plane only; the
//! result is handed to the clip store, which validates rate and length.
//! No resampling is done: a file at a different rate is rejected by the store.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::ClipError;

/// Fully decoded file contents
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples, `channels` per frame
    pub samples: Vec<f32>,
    /// 1 or 2; wider sources are reduced to their first two channels
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            c => self.samples.len() / c as usize,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

fn decode_error(path: &Path, reason: impl ToString) -> ClipError {
    ClipError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Decode the first audio track of a file
pub fn decode_file(path: &Path) -> Result<DecodedAudio, ClipError> {
    let file = File::open(path).map_err(|e| decode_error(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_error(path, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error(path, "no audio track"))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_error(path, "unknown sample rate"))?;
    let mut source_channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(path, e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<(SampleBuffer<f32>, usize)> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::warn!("{:?}: error reading packet: {}", path, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("{:?}: skipping undecodable packet: {}", path, e);
                continue;
            }
            Err(e) => return Err(decode_error(path, e)),
        };

        let spec = *decoded.spec();
        source_channels = spec.channels.count();
        let frames = decoded.capacity();

        // Grow the scratch buffer if a later packet is larger than the first
        let needs_alloc = match &sample_buf {
            Some((_, capacity)) => frames > *capacity,
            None => true,
        };
        if needs_alloc {
            sample_buf = Some((SampleBuffer::new(frames as u64, spec), frames));
        }

        if let Some((buf, _)) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if source_channels == 0 {
        return Err(decode_error(path, "unknown channel layout"));
    }

    let (samples, channels) = if source_channels > 2 {
        log::info!(
            "{:?}: keeping the first 2 of {} channels",
            path,
            source_channels
        );
        let stereo = samples
            .chunks_exact(source_channels)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect();
        (stereo, 2)
    } else {
        (samples, source_channels as u16)
    };

    log::debug!(
        "Decoded {:?}: {} Hz, {} ch, {} samples",
        path,
        sample_rate,
        channels,
        samples.len()
    );

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav_i16(path: &Path, channels: u16, rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let frames: Vec<Vec<i16>> = (0..4800).map(|_| vec![i16::MAX / 2]).collect();
        write_wav_i16(&path, 1, 48000, &frames);

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.frames(), 4800);
        assert!((audio.duration_secs() - 0.1).abs() < 1e-9);
        assert!(audio.samples.iter().all(|s| (s - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_decode_float_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..1000 {
            writer.write_sample(0.25f32).unwrap();
            writer.write_sample(-0.75f32).unwrap();
        }
        writer.finalize().unwrap();

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), 2000);
        assert_eq!(&audio.samples[..2], &[0.25, -0.75]);
    }

    #[test]
    fn test_wide_file_keeps_first_two_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.wav");
        let frames: Vec<Vec<i16>> = (0..100).map(|_| vec![8192, -8192, 16384, 0]).collect();
        write_wav_i16(&path, 4, 48000, &frames);

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frames(), 100);
        assert!((audio.samples[0] - 0.25).abs() < 1e-3);
        assert!((audio.samples[1] + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.wav");
        assert!(matches!(
            decode_file(&path),
            Err(ClipError::Decode { path: p, .. }) if p == path
        ));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();
        assert!(matches!(decode_file(&path), Err(ClipError::Decode { .. })));
    }
}
