// Audio output using cpal
// One output stream per playback session, fed through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{HeapRb, traits::{Consumer, Observer, Producer, Split}};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::{PlaybackError, Result};

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// State shared between the output callback and the session owner
#[derive(Debug, Default)]
pub struct OutputMeter {
    amplitude_bits: AtomicU32,
    paused: AtomicBool,
}

impl OutputMeter {
    /// Peak absolute sample value of the last rendered block
    pub fn amplitude(&self) -> f32 {
        f32::from_bits(self.amplitude_bits.load(Ordering::Relaxed))
    }

    fn set_amplitude(&self, value: f32) {
        self.amplitude_bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

pub struct AudioOutput {
    _stream: Stream,
    producer: RingProducer,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Create a new audio output on the default device
    pub fn new(meter: Arc<OutputMeter>, volume: Arc<Mutex<f32>>) -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;

        let config = device.default_output_config()
            .map_err(|e| PlaybackError::Output(format!("failed to get default output config: {}", e)))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), consumer, volume, meter)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), consumer, volume, meter)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), consumer, volume, meter)?
            }
            format => {
                return Err(PlaybackError::Output(format!("unsupported sample format: {:?}", format)));
            }
        };

        stream.play()
            .map_err(|e| PlaybackError::Output(format!("failed to start stream: {}", e)))?;

        tracing::debug!(sample_rate, channels, "Audio output opened");

        Ok(Self {
            _stream: stream,
            producer,
            sample_rate,
            channels,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut consumer: RingConsumer,
        volume: Arc<Mutex<f32>>,
        meter: Arc<OutputMeter>,
    ) -> Result<Stream> {
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Paused: render silence and leave queued samples in place
                if meter.is_paused() {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0);
                    }
                    meter.set_amplitude(0.0);
                    return;
                }

                let vol = *volume.lock();
                let mut block_peak = 0.0f32;
                for sample in data.iter_mut() {
                    let value = consumer.try_pop().unwrap_or(0.0) * vol;
                    block_peak = block_peak.max(value.abs());
                    *sample = T::from_sample(value);
                }
                meter.set_amplitude(block_peak);
            },
            move |err| {
                tracing::error!(error = %err, "Audio output stream error");
            },
            None,
        ).map_err(|e| PlaybackError::Output(format!("failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Write samples to the output buffer
    /// Returns the number of samples actually written
    pub fn write(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Write all samples, waiting for room in the buffer.
    /// Returns false if `stop` was raised before everything was queued.
    pub fn write_blocking(&mut self, samples: &[f32], stop: &AtomicBool) -> bool {
        let mut remaining = samples;

        while !remaining.is_empty() {
            if stop.load(Ordering::SeqCst) {
                return false;
            }
            let written = self.write(remaining);
            if written > 0 {
                remaining = &remaining[written..];
            } else {
                // Buffer full, wait a bit
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        true
    }

    /// Wait until the device has consumed everything queued.
    /// Returns false if `stop` was raised first.
    pub fn drain(&self, stop: &AtomicBool) -> bool {
        while self.producer.occupied_len() > 0 {
            if stop.load(Ordering::SeqCst) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Convert interleaved samples between channel counts.
///
/// Mono is copied to every output channel, a mix down to mono averages, and
/// any other mismatch maps output channel `n` to input channel `n % from`.
pub fn remix(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);

    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for ch in 0..to {
                out.push(frame[ch % from]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remix_mono_to_stereo() {
        assert_eq!(remix(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_remix_stereo_to_mono() {
        assert_eq!(remix(&[0.25, 0.75, -1.0, 1.0], 2, 1), vec![0.5, 0.0]);
    }

    #[test]
    fn test_remix_same_layout() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(remix(&samples, 2, 2), samples);
    }

    #[test]
    fn test_remix_stereo_to_quad() {
        assert_eq!(
            remix(&[0.1, 0.2], 2, 4),
            vec![0.1, 0.2, 0.1, 0.2]
        );
    }

    #[test]
    fn test_meter_defaults() {
        let meter = OutputMeter::default();
        assert_eq!(meter.amplitude(), 0.0);
        assert!(!meter.is_paused());
        meter.set_amplitude(0.25);
        assert_eq!(meter.amplitude(), 0.25);
    }
}
