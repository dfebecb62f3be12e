//! Display BPM shaping.
//!
//! The number shown on screen is derived from the generator's nominal rate
//! plus per-mode jitter; it is presentation state, not a rate controller.

use rand::Rng;

use kodou_shared::protocol::Mode;

/// Jitter half-width applied on each beat in normal mode.
const NORMAL_JITTER: f64 = 3.0;
/// Jitter half-width applied every tick in excited mode.
const EXCITED_JITTER: f64 = 15.0;
const EXCITED_MIN_BPM: f64 = 60.0;
const EXCITED_MAX_BPM: f64 = 180.0;

/// Current display BPM.
#[derive(Debug)]
pub struct BpmMeter {
    current: f64,
}

impl Default for BpmMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl BpmMeter {
    pub fn new() -> Self {
        Self { current: 72.0 }
    }

    /// Update from one waveform tick.
    pub fn on_tick(&mut self, mode: Mode, beat: bool, nominal_bpm: f64) {
        match mode {
            Mode::Death => {
                self.current = 0.0;
            }
            Mode::Excited => {
                if nominal_bpm > 0.0 {
                    let jitter = (rand::rng().random::<f64>() - 0.5) * EXCITED_JITTER * 2.0;
                    self.current = (nominal_bpm + jitter)
                        .round()
                        .clamp(EXCITED_MIN_BPM, EXCITED_MAX_BPM);
                }
            }
            Mode::Normal => {
                if beat && nominal_bpm > 0.0 {
                    let jitter = (rand::rng().random::<f64>() - 0.5) * NORMAL_JITTER * 2.0;
                    self.current = (nominal_bpm + jitter).round();
                }
            }
            // Music BPM comes from volume, not from the generator
            Mode::Music => {}
        }
    }

    /// Update from the music analyzer's average volume (0.0..=1.0).
    pub fn on_volume(&mut self, average_volume: f64) {
        self.current = (60.0 + average_volume * 100.0).round();
    }

    pub fn value(&self) -> u16 {
        self.current.max(0.0) as u16
    }
}
