//! ECG waveform generator.
//!
//! One phase accumulator drives all heartbeat modes; switching modes only
//! retunes the parameters, so the rendered line never jumps. Rate is an
//! emergent property of `phase_step`: the generator is a phase oscillator,
//! not a rate controller.

use std::f64::consts::{PI, TAU};

use rand::Rng;

use kodou_shared::protocol::Mode;

/// Per-tick smoothing factor for the amplitude's approach to its target.
const AMPLITUDE_SMOOTHING: f64 = 0.02;

/// Tunable waveform parameters.
///
/// `amplitude` is owned by the generator's smoothing; external code only
/// ever sets the target (via a preset).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub phase_step: f64,
    pub amplitude: f64,
    pub target_amplitude: f64,
    pub noise: f64,
    pub qrs_gain: f64,
    pub harmonics: bool,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            phase_step: 0.067,
            amplitude: 1.0,
            target_amplitude: 1.0,
            noise: 0.0,
            qrs_gain: 1.0,
            harmonics: false,
        }
    }
}

/// Per-mode parameter preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavePreset {
    pub phase_step: f64,
    pub target_amplitude: f64,
    pub noise: f64,
    pub qrs_gain: f64,
    pub harmonics: bool,
}

const NORMAL_PRESET: WavePreset = WavePreset {
    phase_step: 0.067,
    target_amplitude: 1.0,
    noise: 0.03,
    qrs_gain: 0.8,
    harmonics: false,
};

const EXCITED_PRESET: WavePreset = WavePreset {
    phase_step: 0.12,
    target_amplitude: 1.0,
    noise: 0.25,
    qrs_gain: 1.1,
    harmonics: true,
};

const DEATH_PRESET: WavePreset = WavePreset {
    phase_step: 0.04,
    target_amplitude: 0.0,
    noise: 0.0,
    qrs_gain: 1.0,
    harmonics: false,
};

impl WavePreset {
    /// Preset for a mode. `music` has none: live audio analysis drives the
    /// display instead of the generator.
    pub fn for_mode(mode: Mode) -> Option<WavePreset> {
        match mode {
            Mode::Normal => Some(NORMAL_PRESET),
            Mode::Excited => Some(EXCITED_PRESET),
            Mode::Death => Some(DEATH_PRESET),
            Mode::Music => None,
        }
    }
}

/// One generated data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSample {
    pub value: f64,
    /// True exactly once per cycle, at the QRS peak.
    pub beat: bool,
}

/// Stateful per-viewer waveform synthesizer.
#[derive(Debug)]
pub struct WaveGenerator {
    phase: f64,
    params: WaveParams,
    beeped: bool,
}

impl Default for WaveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveGenerator {
    pub fn new() -> Self {
        Self::with_params(WaveParams::default())
    }

    pub fn with_params(params: WaveParams) -> Self {
        Self {
            phase: 0.0,
            params,
            beeped: false,
        }
    }

    /// Retune to a mode's preset. The phase and the smoothed amplitude are
    /// left untouched so the waveform stays continuous across the switch.
    pub fn set_mode(&mut self, mode: Mode) {
        let Some(preset) = WavePreset::for_mode(mode) else {
            return;
        };
        self.params.phase_step = preset.phase_step;
        self.params.target_amplitude = preset.target_amplitude;
        self.params.noise = preset.noise;
        self.params.qrs_gain = preset.qrs_gain;
        self.params.harmonics = preset.harmonics;
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// BPM implied by the current `phase_step` at a given tick interval.
    pub fn nominal_bpm(&self, tick_interval_ms: f64) -> f64 {
        if self.params.phase_step <= 0.0 {
            return 0.0;
        }
        let ms_per_cycle = TAU / self.params.phase_step * tick_interval_ms;
        60_000.0 / ms_per_cycle
    }

    /// Generate the next data point.
    pub fn tick(&mut self) -> WaveSample {
        // Exponential approach toward the target amplitude, so a mode
        // switch fades instead of stepping.
        let amp_diff = self.params.target_amplitude - self.params.amplitude;
        self.params.amplitude += amp_diff * AMPLITUDE_SMOOTHING;
        if self.params.amplitude < 0.01 && self.params.target_amplitude == 0.0 {
            self.params.amplitude = 0.0;
        }

        self.phase += self.params.phase_step;
        let cycle_pos = self.phase % TAU;
        let amp = self.params.amplitude;
        let mut beat = false;

        let mut value = 0.0;

        // ---- PQRST template ----
        if cycle_pos < 0.3 {
            // P wave
            value = (cycle_pos * 10.5).sin() * 0.15;
            self.beeped = false;
        } else if cycle_pos < 0.55 {
            // QRS complex
            let t = cycle_pos - 0.3;
            value = if t < 0.05 {
                // Q dip
                -0.3 * (t / 0.05)
            } else if t < 0.12 {
                // R spike
                -0.3 + 1.8 * ((t - 0.05) / 0.07)
            } else if t < 0.18 {
                // S drop
                1.5 - 1.9 * ((t - 0.12) / 0.06)
            } else {
                // S recovery
                -0.4 * (1.0 - (t - 0.18) / 0.07)
            };

            value *= self.params.qrs_gain;

            if !self.beeped {
                self.beeped = true;
                beat = true;
            }
        } else if cycle_pos < 0.9 {
            // T wave
            let t = (cycle_pos - 0.55) / 0.35;
            value = (t * PI).sin() * 0.25;
        }
        // baseline: value stays 0

        // ---- Extra harmonics for the excited mode ----
        if self.params.harmonics {
            // ST elevation
            if (0.55..0.9).contains(&cycle_pos) {
                value += 0.15;
            }
            // Layered high-frequency flutter
            value += (self.phase * 5.0).sin() * 0.08;
            value += (self.phase * 9.0).sin() * 0.06;
            value += (self.phase * 13.0).sin() * 0.05;
            value += (self.phase * 17.0).sin() * 0.04;
            // Low-frequency sway
            value += (self.phase * 2.3).sin() * 0.1;
            // Occasional ectopic beat in the tail of the cycle
            let mut rng = rand::rng();
            if cycle_pos > 1.0 && rng.random::<f64>() < 0.008 {
                value += (rng.random::<f64>() - 0.5) * 1.2;
            }
        }

        // ---- Noise ----
        if self.params.noise > 0.0 {
            value += (rand::rng().random::<f64>() - 0.5) * self.params.noise;
        }

        value *= amp;

        WaveSample { value, beat }
    }
}
