//! Music mode: the waveform is driven by live audio analysis instead of
//! the phase generator.
//!
//! The analyzer itself (FFT, tap point, playback) is a black box behind
//! [`AudioAnalyzer`]; this module owns the per-frame shaping pipeline that
//! turns its raw window into the displayed line.

/// Number of display points per frame, matching the ECG trace length.
pub const DISPLAY_POINTS: usize = 200;

/// Relative energy per frequency band, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandEnergy {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

/// Black-box audio analysis source.
pub trait AudioAnalyzer: Send {
    /// Current time-domain window, values in `-1.0..=1.0`.
    fn waveform(&mut self) -> Vec<f32>;

    /// Current energy split across bands.
    fn band_energy(&mut self) -> BandEnergy;

    /// Average volume in `0.0..=1.0`, used for the display BPM.
    fn average_volume(&mut self) -> f32;
}

/// Per-frame shaping of the analyzer window into display points.
///
/// Each frame is resampled to [`DISPLAY_POINTS`], bass-boosted, blended
/// 50/50 with the previous frame, clamped, and smoothed with a 3-point
/// moving average. The blend keeps the line from strobing between frames.
#[derive(Debug)]
pub struct MusicWaveform {
    smoothed: Vec<f32>,
}

impl Default for MusicWaveform {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicWaveform {
    pub fn new() -> Self {
        Self {
            smoothed: vec![0.0; DISPLAY_POINTS],
        }
    }

    /// Shape one analyzer frame. Returns the current display points.
    pub fn process(&mut self, waveform: &[f32], band: &BandEnergy) -> &[f32] {
        let raw = resample(waveform, DISPLAY_POINTS);
        let bass_boost = 1.0 + band.bass * 1.5;

        let mut points = Vec::with_capacity(DISPLAY_POINTS);
        for i in 0..DISPLAY_POINTS {
            let boosted = raw[i] * bass_boost;
            let blended = boosted * 0.5 + self.smoothed[i] * 0.5;
            points.push(blended.clamp(-1.0, 1.0));
        }

        // 3-point moving average, endpoints kept
        let mut clean = Vec::with_capacity(DISPLAY_POINTS);
        clean.push(points[0]);
        for i in 1..DISPLAY_POINTS - 1 {
            clean.push((points[i - 1] + points[i] + points[i + 1]) / 3.0);
        }
        clean.push(points[DISPLAY_POINTS - 1]);

        self.smoothed = clean;
        &self.smoothed
    }

    pub fn points(&self) -> &[f32] {
        &self.smoothed
    }
}

/// Linear resampling to `target` points. An empty source yields silence.
fn resample(src: &[f32], target: usize) -> Vec<f32> {
    if src.is_empty() {
        return vec![0.0; target];
    }
    (0..target)
        .map(|i| {
            let src_index = i as f32 / target as f32 * src.len() as f32;
            let low = src_index.floor() as usize;
            let high = (low + 1).min(src.len() - 1);
            let t = src_index - low as f32;
            src[low] * (1.0 - t) + src[high] * t
        })
        .collect()
}
