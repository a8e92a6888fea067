//! Streaming sample rate conversion using rubato
//!
//! Decoded packets arrive in whatever sizes the codec produces. rubato's
//! fixed-input resamplers want exact chunks, so input is buffered until a full
//! chunk is available and the remainder is flushed at end of stream.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};

use super::error::{PlaybackError, Result};

/// Frames handed to rubato per call
const CHUNK_FRAMES: usize = 1024;

/// Upper bound on zero-padded calls made while draining the filter
const MAX_FLUSH_CALLS: usize = 4;

pub struct StreamResampler {
    inner: Option<FastFixedIn<f32>>,
    ratio: f64,
    channels: usize,
    pending: Vec<Vec<f32>>,
    /// Filter warm-up frames still to drop from the front of the output
    skip_frames: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    /// Create a resampler. Matching rates produce a pass-through.
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        let channels = channels.max(1);
        let ratio = output_rate as f64 / input_rate as f64;

        let inner = if input_rate == output_rate {
            None
        } else {
            let resampler = FastFixedIn::<f32>::new(
                ratio,
                1.0, // no runtime ratio changes
                PolynomialDegree::Septic,
                CHUNK_FRAMES,
                channels,
            )
            .map_err(|e| PlaybackError::Resample(format!("failed to create resampler: {}", e)))?;
            tracing::debug!(
                input_rate,
                output_rate,
                channels,
                delay = resampler.output_delay(),
                "Resampling enabled"
            );
            Some(resampler)
        };

        Ok(Self {
            skip_frames: inner.as_ref().map_or(0, |r| r.output_delay()),
            inner,
            ratio,
            channels,
            pending: vec![Vec::new(); channels],
            frames_in: 0,
            frames_out: 0,
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Feed interleaved samples, returning whatever full chunks are ready
    pub fn process(&mut self, interleaved: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(interleaved.to_vec());
        };

        for (i, sample) in interleaved.iter().enumerate() {
            self.pending[i % self.channels].push(*sample);
        }
        self.frames_in += (interleaved.len() / self.channels) as u64;

        let mut output = Vec::new();
        while self.pending[0].len() >= resampler.input_frames_next() {
            let needed = resampler.input_frames_next();
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|plane| plane.drain(..needed).collect())
                .collect();
            let planar = resampler
                .process(&chunk, None)
                .map_err(|e| PlaybackError::Resample(e.to_string()))?;
            append_frames(&planar, &mut self.skip_frames, &mut self.frames_out, u64::MAX, &mut output);
        }

        Ok(output)
    }

    /// Resample buffered input and drain the filter so the stream ends with
    /// `input frames * ratio` output frames
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };

        let expected = (self.frames_in as f64 * self.ratio).round() as u64;
        let mut output = Vec::new();
        for _ in 0..MAX_FLUSH_CALLS {
            if self.frames_out >= expected {
                break;
            }
            // Partial chunks are zero padded by rubato
            let planar = if self.pending[0].is_empty() {
                resampler.process_partial(None::<&[Vec<f32>]>, None)
            } else {
                resampler.process_partial(Some(self.pending.as_slice()), None)
            }
            .map_err(|e| PlaybackError::Resample(e.to_string()))?;
            for plane in self.pending.iter_mut() {
                plane.clear();
            }
            append_frames(&planar, &mut self.skip_frames, &mut self.frames_out, expected, &mut output);
        }
        Ok(output)
    }
}

/// Interleave planar output onto `output`, dropping the first `skip` frames
/// and stopping once `frames_out` reaches `limit`
fn append_frames(
    planar: &[Vec<f32>],
    skip: &mut usize,
    frames_out: &mut u64,
    limit: u64,
    output: &mut Vec<f32>,
) {
    let frames = planar.first().map_or(0, Vec::len);
    let start = (*skip).min(frames);
    *skip -= start;

    let room = limit.saturating_sub(*frames_out).min((frames - start) as u64) as usize;
    output.reserve(room * planar.len());
    for frame in start..start + room {
        for plane in planar {
            output.push(plane[frame]);
        }
    }
    *frames_out += room as u64;
}
