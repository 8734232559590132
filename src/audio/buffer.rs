use std::path::Path;

use ndarray::{Array3, ArrayD, Axis};
use thiserror::Error;
use tracing::{debug, info};

/// Sample rate every bundled backend expects
pub const MODEL_SAMPLE_RATE: u32 = 16_000;

/// Errors raised while reading or normalizing audio
#[derive(Debug, Error)]
pub enum AudioError {
    /// Waveform rank outside (samples), (channels, samples), (batch, channels, samples)
    #[error("unsupported waveform rank {0}, expected 1 to 3 dimensions")]
    UnsupportedRank(usize),

    /// A batch or channel axis had length zero
    #[error("waveform has an empty {0} axis")]
    EmptyAxis(&'static str),

    /// Sample rate of zero
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// WAV file could not be read
    #[error("failed to read wav file {path}: {source}")]
    Wav {
        /// Path to the WAV file
        path: String,
        /// Underlying decoder error
        source: hound::Error,
    },
}

/// Raw sample storage, tagged by the dtype the host produced
#[derive(Debug, Clone)]
pub enum SampleData {
    /// 32-bit float samples
    F32(ArrayD<f32>),
    /// 64-bit float samples
    F64(ArrayD<f64>),
    /// 16-bit integer PCM
    I16(ArrayD<i16>),
}

impl SampleData {
    /// Tensor shape
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::F32(a) => a.shape(),
            Self::F64(a) => a.shape(),
            Self::I16(a) => a.shape(),
        }
    }

    fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Self::F32(a) => a.mapv(f64::from),
            Self::F64(a) => a.clone(),
            Self::I16(a) => a.mapv(|s| f64::from(s) / 32_768.0),
        }
    }
}

/// Channel-tagged audio handed over by the graph host
///
/// The waveform is `(samples)`, `(channels, samples)` or
/// `(batch, channels, samples)`.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Waveform tensor
    pub waveform: SampleData,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Wraps an f32 waveform tensor
    #[must_use]
    pub const fn new(waveform: ArrayD<f32>, sample_rate: u32) -> Self {
        Self {
            waveform: SampleData::F32(waveform),
            sample_rate,
        }
    }

    /// Reads a WAV file into a `(1, channels, frames)` buffer
    ///
    /// 16-bit PCM keeps its integer dtype; other integer widths are scaled to f32.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or decoded
    pub fn read_wav(path: &Path) -> Result<Self, AudioError> {
        let wav_err = |source| AudioError::Wav {
            path: path.display().to_string(),
            source,
        };
        let mut reader = hound::WavReader::open(path).map_err(wav_err)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            bits = spec.bits_per_sample,
            "reading wav file"
        );

        let waveform = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => {
                let interleaved = reader
                    .samples::<i16>()
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(wav_err)?;
                SampleData::I16(deinterleave(&interleaved, channels))
            }
            (hound::SampleFormat::Int, bits) => {
                let scale = f64::from(1_u32 << (bits.saturating_sub(1)).min(31));
                #[allow(clippy::cast_possible_truncation)]
                let interleaved = reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (f64::from(v) / scale) as f32))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(wav_err)?;
                SampleData::F32(deinterleave(&interleaved, channels))
            }
            (hound::SampleFormat::Float, _) => {
                let interleaved = reader
                    .samples::<f32>()
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(wav_err)?;
                SampleData::F32(deinterleave(&interleaved, channels))
            }
        };

        Ok(Self {
            waveform,
            sample_rate: spec.sample_rate,
        })
    }

    /// Collapses the buffer to mono f32 samples
    ///
    /// Batch index 0 is taken, channels are averaged, then samples are cast to f32.
    ///
    /// # Errors
    /// Returns error for ranks outside 1..=3 or an empty batch/channel axis
    pub fn to_mono(&self) -> Result<MonoAudio, AudioError> {
        let shape = self.waveform.shape().to_vec();
        let rank = shape.len();
        if rank == 0 || rank > 3 {
            return Err(AudioError::UnsupportedRank(rank));
        }

        let mut wave = self.waveform.to_f64();
        if wave.ndim() == 3 {
            if wave.len_of(Axis(0)) == 0 {
                return Err(AudioError::EmptyAxis("batch"));
            }
            wave = wave.index_axis_move(Axis(0), 0);
        }
        if wave.ndim() == 2 {
            wave = wave
                .mean_axis(Axis(0))
                .ok_or(AudioError::EmptyAxis("channel"))?;
        }

        // f64 → f32: model inputs are f32
        #[allow(clippy::cast_possible_truncation)]
        let samples: Vec<f32> = wave.iter().map(|&s| s as f32).collect();

        debug!(
            shape = ?shape,
            samples = samples.len(),
            sample_rate = self.sample_rate,
            "waveform reduced to mono f32"
        );

        Ok(MonoAudio {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}

fn deinterleave<T: Copy>(interleaved: &[T], channels: usize) -> ArrayD<T> {
    let frames = interleaved.len() / channels;
    Array3::from_shape_fn((1, channels, frames), |(_, c, i)| {
        interleaved[i * channels + c]
    })
    .into_dyn()
}

/// Single-channel f32 audio
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAudio {
    /// Samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl MonoAudio {
    /// Duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Resamples to `target_rate` with linear interpolation
    ///
    /// # Errors
    /// Returns error if either sample rate is zero
    pub fn resampled(&self, target_rate: u32) -> Result<Vec<f32>, AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(self.sample_rate));
        }
        if target_rate == 0 {
            return Err(AudioError::InvalidSampleRate(target_rate));
        }
        if self.sample_rate == target_rate {
            return Ok(self.samples.clone());
        }

        let _span = tracing::debug_span!("resample").entered();
        let start = std::time::Instant::now();
        let resampled = resample_linear(&self.samples, self.sample_rate, target_rate);

        debug!(
            source_rate = self.sample_rate,
            target_rate = target_rate,
            input_samples = self.samples.len(),
            output_samples = resampled.len(),
            resample_us = start.elapsed().as_micros(),
            "audio resampled"
        );

        Ok(resampled)
    }
}

// Fractional index math needs f64 <-> usize conversions
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = f64::from(source_rate) / f64::from(target_rate);
    let output_len = ((samples.len() as f64) / ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let src = (i as f64) * ratio;
            let floor = src.floor() as usize;
            if floor > last {
                return 0.0_f32;
            }
            let ceil = (floor + 1).min(last);
            let fract = src - src.floor();
            let s1 = f64::from(samples[floor]);
            let s2 = f64::from(samples[ceil]);
            s1.mul_add(1.0 - fract, s2 * fract) as f32
        })
        .collect()
}
