//! Sound effect seam.
//!
//! The audio engine itself (oscillators, gain ramps) lives outside the
//! core; the mode machine only talks to this trait.

/// Cues the mode machine can trigger.
///
/// `start_alarm` / `start_flatline` begin a continuous effect that keeps
/// running until the matching stop is called; `play_beep` is one-shot.
#[cfg_attr(test, mockall::automock)]
pub trait SoundEffects: Send {
    /// One-shot sine beep.
    fn play_beep(&mut self, frequency: f32, duration_secs: f32, volume: f32);

    /// Continuous two-tone alarm (excited mode).
    fn start_alarm(&mut self);
    fn stop_alarm(&mut self);

    /// Continuous flatline tone (death mode).
    fn start_flatline(&mut self);
    fn stop_flatline(&mut self);
}

/// No-op implementation for headless viewers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSoundEffects;

impl SoundEffects for NullSoundEffects {
    fn play_beep(&mut self, _frequency: f32, _duration_secs: f32, _volume: f32) {}

    fn start_alarm(&mut self) {}

    fn stop_alarm(&mut self) {}

    fn start_flatline(&mut self) {}

    fn stop_flatline(&mut self) {}
}
