use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{LoopPlayerError, Result};

/// Level and pitch measurements for one rendered output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub rms: f32,
    pub peak: f32,
    /// Centre frequency of the strongest non-DC bin, or 0 for silence.
    pub dominant_hz: f32,
}

/// Offline measurements of rendered output, used by the host to confirm what
/// the engine produced. Keeps its FFT plan between calls so equally sized
/// blocks do not re-plan.
pub struct BlockAnalyzer {
    sample_rate: u32,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl BlockAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn analyze_channel(&mut self, samples: &[f32]) -> Result<ChannelReport> {
        if samples.len() < 2 {
            return Err(LoopPlayerError::msg(
                "analysis requires blocks with at least two samples",
            ));
        }

        let rms = compute_rms(samples);
        let peak = samples.iter().fold(0.0_f32, |peak, sample| peak.max(sample.abs()));
        let dominant_hz = self.dominant_frequency(samples)?;

        Ok(ChannelReport {
            rms,
            peak,
            dominant_hz,
        })
    }

    pub fn analyze(&mut self, channels: &[Vec<f32>]) -> Result<Vec<ChannelReport>> {
        channels
            .iter()
            .map(|channel| self.analyze_channel(channel))
            .collect()
    }

    fn dominant_frequency(&mut self, samples: &[f32]) -> Result<f32> {
        let len = samples.len();
        let bin_hz = self.sample_rate as f32 / len as f32;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let strongest = fft
            .spectrum
            .iter()
            .enumerate()
            .skip(1)
            .map(|(bin, value)| (bin, value.norm()))
            .fold((0, 0.0_f32), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        if strongest.1 <= f32::EPSILON {
            Ok(0.0)
        } else {
            Ok(strongest.0 as f32 * bin_hz)
        }
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        if self.fft.as_ref().is_some_and(|fft| fft.size != size) {
            self.fft = None;
        }

        let planner = &mut self.fft_planner;
        self.fft
            .get_or_insert_with(|| FftResources::new(planner, size))
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn new(planner: &mut RealFftPlanner<f32>, size: usize) -> Self {
        let plan = planner.plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for BlockAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft.as_ref().map(|fft| fft.size))
            .finish()
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{render_block, InterpolationMode, OutputChannelMask, SampleBuffer, SampleStore, TransportState};

    fn sine(hz: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * PI * hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn silence_has_no_level_or_pitch() {
        let mut analyzer = BlockAnalyzer::new(48_000);
        let report = analyzer.analyze_channel(&[0.0; 1024]).unwrap();

        assert_eq!(report, ChannelReport::default());
    }

    #[test]
    fn measures_sine_level_and_frequency() {
        let mut analyzer = BlockAnalyzer::new(48_000);
        let report = analyzer.analyze_channel(&sine(1_000.0, 48_000, 4_800)).unwrap();

        assert_abs_diff_eq!(report.rms, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
        assert_abs_diff_eq!(report.peak, 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(report.dominant_hz, 1_000.0, epsilon = 1e-2);
    }

    #[test]
    fn rejects_tiny_blocks() {
        let mut analyzer = BlockAnalyzer::new(48_000);
        assert!(analyzer.analyze_channel(&[1.0]).is_err());
    }

    #[test]
    fn double_rate_playback_doubles_pitch() {
        let source = SampleBuffer::from_channels(vec![sine(500.0, 48_000, 4_800)]).unwrap();
        let store = SampleStore::with_buffer(source);
        let mask = OutputChannelMask::first_n(1);
        let mut transport = TransportState::with_rate(2.0);
        let mut rendered = vec![vec![0.0; 4_800]];

        {
            let mut outputs: Vec<&mut [f32]> = rendered.iter_mut().map(Vec::as_mut_slice).collect();
            render_block(
                &mut outputs,
                Some(&mask),
                4_800,
                &mut transport,
                &store,
                InterpolationMode::Linear,
            );
        }

        let mut analyzer = BlockAnalyzer::new(48_000);
        let reports = analyzer.analyze(&rendered).unwrap();
        assert_abs_diff_eq!(reports[0].dominant_hz, 1_000.0, epsilon = 1e-2);
    }
}
