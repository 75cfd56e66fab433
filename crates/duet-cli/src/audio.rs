//! Speech output: play clips through the speakers or save them to disk.
//!
//! Clips are decoded with symphonia. Playback uses cpal and is compiled in
//! with the `playback` feature; without it `duet speak` saves the clip.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use duet_core::utils::timestamp_slug;
use duet_providers::AudioSink;

/// Whether this build can play audio.
pub const PLAYBACK_AVAILABLE: bool = cfg!(feature = "playback");

/// Decode a clip (mp3 from the speech endpoint, or wav) into mono samples.
pub fn decode_mono(audio: &[u8]) -> Result<(Vec<f32>, u32)> {
    let source = MediaSourceStream::new(
        Box::new(Cursor::new(audio.to_vec())),
        Default::default(),
    );
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!("unrecognized audio: {e}"))?;

    let mut format = probed.format;
    let track = format.default_track().context("no default audio track")?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.context("unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| anyhow!("no decoder for clip: {e}"))?;

    let mut out = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => bail!("audio read error: {e}"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphError::DecodeError(_)) => continue,
            Err(e) => bail!("audio decode error: {e}"),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let frames = decoded.frames();
        let needs_new = sample_buf
            .as_ref()
            .map_or(true, |b| b.capacity() < frames * channels);
        if needs_new {
            sample_buf = Some(SampleBuffer::<f32>::new(frames as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        // Downmix to mono.
        out.extend(
            buf.samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if out.is_empty() {
        bail!("clip holds no audio");
    }
    Ok((out, sample_rate))
}

/// Linear resampling of a mono signal.
#[cfg_attr(not(feature = "playback"), allow(dead_code))]
fn resample_linear(input: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || input.is_empty() || from == 0 || to == 0 {
        return input.to_vec();
    }
    let ratio = f64::from(from) / f64::from(to);
    let len = ((input.len() as f64) / ratio).round().max(1.0) as usize;
    (0..len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx.min(input.len() - 1)];
            let b = input[(idx + 1).min(input.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

/// Plays clips on the default output device.
#[derive(Debug, Default)]
pub struct SpeakerSink;

impl AudioSink for SpeakerSink {
    fn play(&self, audio: &[u8]) -> Result<()> {
        let (samples, rate) = decode_mono(audio)?;
        debug!(samples = samples.len(), rate, "playing speech");
        play_samples(&samples, rate)
    }
}

#[cfg(feature = "playback")]
fn play_samples(samples: &[f32], rate: u32) -> Result<()> {
    use std::sync::Arc;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use tracing::error;

    let device = cpal::default_host()
        .default_output_device()
        .context("no default audio output device")?;
    let config = device
        .default_output_config()
        .context("cannot query the audio output format")?
        .config();
    let channels = usize::from(config.channels).max(1);
    let samples = resample_linear(samples, rate, config.sample_rate);

    struct Playhead {
        samples: Vec<f32>,
        position: usize,
        finished: bool,
    }

    let buffer = Arc::new(Mutex::new(Playhead {
        samples,
        position: 0,
        finished: false,
    }));
    let feed = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut buf) = feed.lock() else {
                    return;
                };
                for frame in data.chunks_mut(channels) {
                    let sample = match buf.samples.get(buf.position) {
                        Some(s) => {
                            buf.position += 1;
                            *s
                        }
                        None => {
                            buf.finished = true;
                            0.0
                        }
                    };
                    frame.fill(sample);
                }
            },
            |err| error!("audio output stream error: {err}"),
            None,
        )
        .context("failed to open the audio output stream")?;
    stream.play().context("failed to start audio playback")?;

    loop {
        std::thread::sleep(std::time::Duration::from_millis(10));
        let buf = buffer
            .lock()
            .map_err(|e| anyhow!("playback buffer lock poisoned: {e}"))?;
        if buf.finished {
            break;
        }
    }
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn play_samples(_samples: &[f32], _rate: u32) -> Result<()> {
    bail!("this build has no audio playback; use `duet speak --save`")
}

/// Writes synthesized speech to timestamped files.
pub struct FileAudioSink {
    dir: PathBuf,
    last: Mutex<Option<PathBuf>>,
}

impl FileAudioSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last: Mutex::new(None),
        }
    }

    /// Path of the most recent clip, if any.
    pub fn last_written(&self) -> Option<PathBuf> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

impl AudioSink for FileAudioSink {
    fn play(&self, audio: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let mut path = self.dir.join(format!("speech-{}.mp3", timestamp_slug()));
        let mut n = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("speech-{}-{n}.mp3", timestamp_slug()));
            n += 1;
        }

        std::fs::write(&path, audio)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), bytes = audio.len(), "speech written");

        if let Ok(mut last) = self.last.lock() {
            *last = Some(path);
        }
        Ok(())
    }
}

/// Where `speak` sends its clip.
pub enum SpeechOutput {
    Speakers(SpeakerSink),
    File(FileAudioSink),
}

impl SpeechOutput {
    /// Speakers unless `save` is set or this build cannot play audio.
    pub fn select(save: bool, dir: impl Into<PathBuf>) -> Self {
        if save || !PLAYBACK_AVAILABLE {
            SpeechOutput::File(FileAudioSink::new(dir))
        } else {
            SpeechOutput::Speakers(SpeakerSink)
        }
    }

    /// Where the last clip was saved; `None` when played.
    pub fn saved_path(&self) -> Option<PathBuf> {
        match self {
            SpeechOutput::Speakers(_) => None,
            SpeechOutput::File(sink) => sink.last_written(),
        }
    }
}

impl AudioSink for SpeechOutput {
    fn play(&self, audio: &[u8]) -> Result<()> {
        match self {
            SpeechOutput::Speakers(sink) => sink.play(audio),
            SpeechOutput::File(sink) => sink.play(audio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav(channels: u16, rate: u32, frames: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in frames {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decode_wav_clip() {
        let clip = wav(1, 16_000, &[0, 16_384, -16_384, 0]);
        let (samples, rate) = decode_mono(&clip).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(samples.len(), 4);
        assert!((samples[1] - 0.5).abs() < 0.01);
    }

    #[test]
    fn decode_downmixes_stereo() {
        let clip = wav(2, 24_000, &[16_384, 0, 16_384, 0]);
        let (samples, _) = decode_mono(&clip).unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.25).abs() < 0.01);
    }

    #[test]
    fn speakers_reject_garbage() {
        assert!(SpeakerSink.play(b"definitely not audio").is_err());
    }

    #[test]
    fn resample_scales_length() {
        let input = vec![0.0, 1.0, 0.0, -1.0];
        assert_eq!(resample_linear(&input, 16_000, 32_000).len(), 8);
        assert_eq!(resample_linear(&input, 16_000, 16_000), input);
    }

    #[test]
    fn save_selects_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let output = SpeechOutput::select(true, dir.path().join("audio"));
        assert!(matches!(output, SpeechOutput::File(_)));

        output.play(&[1, 2, 3]).unwrap();
        let saved = output.saved_path().unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn default_selection_plays_when_available() {
        let output = SpeechOutput::select(false, "unused");
        assert_eq!(matches!(output, SpeechOutput::Speakers(_)), PLAYBACK_AVAILABLE);
        assert!(output.saved_path().is_none());
    }

    #[test]
    fn file_sink_writes_clips() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileAudioSink::new(dir.path().join("audio"));

        sink.play(&[1, 2, 3]).unwrap();
        let first = sink.last_written().unwrap();
        sink.play(&[4]).unwrap();
        let second = sink.last_written().unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read(&second).unwrap(), vec![4]);
    }
}
