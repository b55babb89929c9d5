use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use web_time::Instant;

use crate::config::*;

const MAX_BUFFERED_SAMPLES: usize = FFT_SIZE * 4;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

#[derive(Debug, thiserror::Error)]
pub enum MicrophoneError {
    #[error("no audio input device available")]
    NoDevice,
    #[error("failed to query input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("unsupported input sample format {0:?}")]
    Format(SampleFormat),
    #[error("failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("input stream reported an error")]
    Stream,
}

/// Scoped microphone acquisition. The cpal callback downmixes to mono and
/// keeps the latest samples in a bounded buffer; dropping this tears the
/// stream down on every exit path.
pub struct Microphone {
    _stream: Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    failed: Arc<AtomicBool>,
}

impl Microphone {
    pub fn open() -> Result<Self, MicrophoneError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(MicrophoneError::NoDevice)?;
        let supported = device.default_input_config()?;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let samples = Arc::new(Mutex::new(Vec::with_capacity(MAX_BUFFERED_SAMPLES)));
        let failed = Arc::new(AtomicBool::new(false));

        let err_callback = |fail: Arc<AtomicBool>| {
            move |e: cpal::StreamError| {
                log::warn!("Microphone stream error: {e}");
                fail.store(true, Ordering::Relaxed);
            }
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                let buf = samples.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        push_mono(&buf, data.iter().copied(), channels);
                    },
                    err_callback(failed.clone()),
                    None,
                )?
            }
            SampleFormat::I16 => {
                let buf = samples.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        push_mono(
                            &buf,
                            data.iter().map(|&s| s as f32 / i16::MAX as f32),
                            channels,
                        );
                    },
                    err_callback(failed.clone()),
                    None,
                )?
            }
            SampleFormat::U16 => {
                let buf = samples.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        push_mono(
                            &buf,
                            data.iter().map(|&s| s as f32 / u16::MAX as f32 * 2.0 - 1.0),
                            channels,
                        );
                    },
                    err_callback(failed.clone()),
                    None,
                )?
            }
            other => return Err(MicrophoneError::Format(other)),
        };
        stream.play()?;

        Ok(Self {
            _stream: stream,
            samples,
            failed,
        })
    }

    /// Copy the newest samples, oldest first.
    pub fn latest(&self, out: &mut Vec<f32>) {
        out.clear();
        if let Ok(buf) = self.samples.lock() {
            let start = buf.len().saturating_sub(FFT_SIZE);
            out.extend_from_slice(&buf[start..]);
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}

fn push_mono(buf: &Arc<Mutex<Vec<f32>>>, data: impl Iterator<Item = f32>, channels: usize) {
    let Ok(mut guard) = buf.lock() else { return };
    let mut frame_sum = 0.0f32;
    let mut frame_len = 0usize;
    for sample in data {
        frame_sum += sample;
        frame_len += 1;
        if frame_len == channels {
            guard.push(frame_sum / channels as f32);
            frame_sum = 0.0;
            frame_len = 0;
        }
    }
    if guard.len() > MAX_BUFFERED_SAMPLES {
        let drop = guard.len() - MAX_BUFFERED_SAMPLES;
        guard.drain(0..drop);
    }
}

/// Byte-scale frequency analysis: Hann-windowed FFT with per-bin smoothing,
/// bins mapped from [-100, -30] dBFS onto [0, 255]. The intensity filter's
/// 128 mid-scale reference assumes exactly this scale.
pub struct ByteSpectrum {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl ByteSpectrum {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            fft,
            window: hann_window(FFT_SIZE),
            buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            smoothed: vec![0.0; FFT_SIZE / 2],
        }
    }

    /// Mean byte magnitude across all frequency bins, in [0, 255].
    pub fn average(&mut self, samples: &[f32]) -> f32 {
        // Right-align the newest samples; missing history reads as silence.
        let pad = FFT_SIZE.saturating_sub(samples.len());
        for slot in self.buffer.iter_mut().take(pad) {
            *slot = Complex::new(0.0, 0.0);
        }
        let tail = &samples[samples.len().saturating_sub(FFT_SIZE)..];
        for (i, &s) in tail.iter().enumerate() {
            self.buffer[pad + i] = Complex::new(s * self.window[pad + i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let norm = 1.0 / FFT_SIZE as f32;
        let mut sum = 0.0f32;
        for (bin, slot) in self.smoothed.iter_mut().zip(self.buffer.iter()) {
            let magnitude = slot.norm() * norm;
            *bin = *bin * SPECTRUM_SMOOTHING + magnitude * (1.0 - SPECTRUM_SMOOTHING);
            let db = 20.0 * bin.max(1e-10).log10();
            let byte = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
            sum += byte.clamp(0.0, 255.0);
        }
        sum / self.smoothed.len() as f32
    }
}

impl Default for ByteSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Per-tick intensity state: ambient baseline learned over the calibration
/// window, then a tapered, headroom-scaled response in [0, 0.5].
pub struct IntensityFilter {
    started: Instant,
    baseline: Option<f32>,
    raw_average: f32,
    intensity: f32,
}

impl IntensityFilter {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            baseline: None,
            raw_average: 0.0,
            intensity: 0.0,
        }
    }

    pub fn is_calibrating(&self, now: Instant) -> bool {
        now.duration_since(self.started) < Duration::from_millis(CALIBRATION_MS)
    }

    pub fn baseline(&self) -> f32 {
        self.baseline.unwrap_or(0.0)
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn update(&mut self, raw_average: f32, now: Instant) -> f32 {
        self.raw_average = raw_average;
        let baseline = *self.baseline.get_or_insert(raw_average);
        if self.is_calibrating(now) {
            self.baseline =
                Some(baseline * BASELINE_SMOOTHING + raw_average * (1.0 - BASELINE_SMOOTHING));
        }
        let baseline = self.baseline();
        let net = raw_average - baseline;
        let max_net = (ANALYSIS_MID_SCALE - baseline).max(1.0);
        let norm = (net / max_net).clamp(0.0, 1.0);
        self.intensity = norm.sqrt() * INTENSITY_HEADROOM;
        self.intensity
    }
}

/// The estimator the vehicle controller reads. On any audio error the
/// session degrades to zero intensity; the failure is logged by the caller.
pub struct VoiceIntensity {
    mic: Microphone,
    spectrum: ByteSpectrum,
    filter: IntensityFilter,
    samples: Vec<f32>,
}

impl VoiceIntensity {
    pub fn start(now: Instant) -> Result<Self, MicrophoneError> {
        let mic = Microphone::open()?;
        log::info!("Microphone initialized, calibrating ambient baseline");
        Ok(Self {
            mic,
            spectrum: ByteSpectrum::new(),
            filter: IntensityFilter::new(now),
            samples: Vec::with_capacity(FFT_SIZE),
        })
    }

    pub fn tick(&mut self, now: Instant) -> Result<(), MicrophoneError> {
        if self.mic.has_failed() {
            return Err(MicrophoneError::Stream);
        }
        self.mic.latest(&mut self.samples);
        let raw = self.spectrum.average(&self.samples);
        self.filter.update(raw, now);
        Ok(())
    }

    pub fn intensity(&self) -> f32 {
        self.filter.intensity()
    }
}
