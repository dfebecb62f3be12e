//! Display mode state machine.
//!
//! Owns the current mode, retunes the waveform generator on transitions,
//! and starts/stops the continuous effects that belong to each mode. Mode
//! changes arrive as broadcasts, so every viewer runs the same transitions
//! in the same order.

use tokio_util::sync::CancellationToken;

use kodou_shared::protocol::Mode;

use crate::effects::SoundEffects;
use crate::wave::{WaveGenerator, WaveSample};

/// Beat cue per mode: (frequency, duration, volume).
const NORMAL_BEEP: (f32, f32, f32) = (880.0, 0.15, 0.3);
const EXCITED_BEEP: (f32, f32, f32) = (1000.0, 0.08, 0.5);

/// Per-viewer mode state machine.
pub struct ModeMachine {
    current: Mode,
    generator: WaveGenerator,
    effects: Box<dyn SoundEffects>,
    /// Lifetime of the music-mode analysis loop. Present only in music
    /// mode; cancelled the moment the mode is left, so a stale loop
    /// iteration observes the token and exits without side effects.
    music_token: Option<CancellationToken>,
}

impl ModeMachine {
    pub fn new(effects: Box<dyn SoundEffects>) -> Self {
        let mut generator = WaveGenerator::new();
        generator.set_mode(Mode::Normal);
        Self {
            current: Mode::Normal,
            generator,
            effects,
            music_token: None,
        }
    }

    pub fn current(&self) -> Mode {
        self.current
    }

    pub fn generator(&self) -> &WaveGenerator {
        &self.generator
    }

    /// Token owned by the current music session, if music mode is active.
    pub fn music_token(&self) -> Option<CancellationToken> {
        self.music_token.clone()
    }

    /// Switch to a new mode.
    ///
    /// A request for the current mode is silently ignored. Otherwise the
    /// previous mode's continuous effect is stopped first, then the
    /// generator is retuned (music bypasses it entirely) and the new
    /// mode's effect starts. Returns whether a transition happened.
    pub fn switch_mode(&mut self, next: Mode) -> bool {
        if next == self.current {
            return false;
        }

        let prev = self.current;
        self.current = next;

        match prev {
            Mode::Excited => self.effects.stop_alarm(),
            Mode::Death => self.effects.stop_flatline(),
            Mode::Music => {
                if let Some(token) = self.music_token.take() {
                    token.cancel();
                }
            }
            Mode::Normal => {}
        }

        if next == Mode::Music {
            // Live audio drives the display; the generator keeps its phase
            // for when a heartbeat mode comes back.
            self.music_token = Some(CancellationToken::new());
        } else {
            self.generator.set_mode(next);
            match next {
                Mode::Excited => self.effects.start_alarm(),
                Mode::Death => self.effects.start_flatline(),
                Mode::Normal | Mode::Music => {}
            }
        }

        tracing::info!("Mode switched: {} -> {}", prev, next);
        true
    }

    /// Advance the waveform one tick. Returns `None` in music mode, where
    /// the analyzer produces the display data instead.
    pub fn tick(&mut self) -> Option<WaveSample> {
        if self.current == Mode::Music {
            return None;
        }
        let sample = self.generator.tick();
        if sample.beat {
            match self.current {
                Mode::Normal => {
                    let (f, d, v) = NORMAL_BEEP;
                    self.effects.play_beep(f, d, v);
                }
                Mode::Excited => {
                    let (f, d, v) = EXCITED_BEEP;
                    self.effects.play_beep(f, d, v);
                }
                Mode::Death | Mode::Music => {}
            }
        }
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{MockSoundEffects, NullSoundEffects};

    fn machine_with_null_effects() -> ModeMachine {
        ModeMachine::new(Box::new(NullSoundEffects))
    }

    #[test]
    fn test_initial_mode_is_normal() {
        // テスト項目: 初期モードが normal である
        // given (前提条件):

        // when (操作):
        let machine = machine_with_null_effects();

        // then (期待する結果):
        assert_eq!(machine.current(), Mode::Normal);
    }

    #[test]
    fn test_duplicate_switch_is_silently_ignored() {
        // テスト項目: 同一モードへの切替要求が無視される
        // given (前提条件):
        let mut effects = MockSoundEffects::new();
        effects.expect_start_alarm().never();
        effects.expect_stop_alarm().never();
        effects.expect_start_flatline().never();
        effects.expect_stop_flatline().never();
        let mut machine = ModeMachine::new(Box::new(effects));

        // when (操作):
        let switched = machine.switch_mode(Mode::Normal);

        // then (期待する結果):
        assert!(!switched);
        assert_eq!(machine.current(), Mode::Normal);
    }

    #[test]
    fn test_leaving_excited_stops_the_alarm() {
        // テスト項目: excited から離れるとアラームが必ず停止される
        // given (前提条件):
        let mut effects = MockSoundEffects::new();
        effects.expect_start_alarm().times(1).return_const(());
        effects.expect_stop_alarm().times(1).return_const(());
        let mut machine = ModeMachine::new(Box::new(effects));
        machine.switch_mode(Mode::Excited);

        // when (操作):
        machine.switch_mode(Mode::Normal);

        // then (期待する結果): mock が stop_alarm の呼び出しを検証する
        assert_eq!(machine.current(), Mode::Normal);
    }

    #[test]
    fn test_entering_death_starts_flatline_and_leaving_stops_it() {
        // テスト項目: death への遷移で flatline が開始され、離脱で停止される
        // given (前提条件):
        let mut effects = MockSoundEffects::new();
        effects.expect_start_flatline().times(1).return_const(());
        effects.expect_stop_flatline().times(1).return_const(());
        let mut machine = ModeMachine::new(Box::new(effects));

        // when (操作):
        machine.switch_mode(Mode::Death);
        machine.switch_mode(Mode::Normal);

        // then (期待する結果):
        assert_eq!(machine.current(), Mode::Normal);
    }

    #[test]
    fn test_switch_keeps_the_phase_accumulator_uninterrupted() {
        // テスト項目: モード切替が位相を中断しない
        // given (前提条件):
        let mut machine = machine_with_null_effects();
        for _ in 0..37 {
            machine.tick();
        }
        let phase_before = machine.generator().phase();
        let excited_step = {
            let preset = crate::wave::WavePreset::for_mode(Mode::Excited).unwrap();
            preset.phase_step
        };

        // when (操作):
        machine.switch_mode(Mode::Excited);

        // then (期待する結果): 次のサンプルは既存の位相から続く
        assert_eq!(machine.generator().phase(), phase_before);
        machine.tick();
        assert!((machine.generator().phase() - (phase_before + excited_step)).abs() < 1e-12);
    }

    #[test]
    fn test_entering_music_creates_a_token_and_bypasses_the_generator() {
        // テスト項目: music モードでトークンが作られ生成器が迂回される
        // given (前提条件):
        let mut machine = machine_with_null_effects();
        let phase_before = machine.generator().phase();

        // when (操作):
        machine.switch_mode(Mode::Music);

        // then (期待する結果):
        let token = machine.music_token().expect("Music mode must own a token");
        assert!(!token.is_cancelled());
        assert_eq!(machine.tick(), None);
        assert_eq!(machine.generator().phase(), phase_before);
    }

    #[test]
    fn test_leaving_music_cancels_the_token() {
        // テスト項目: music からの離脱で実行中のトークンがキャンセルされる
        // given (前提条件):
        let mut machine = machine_with_null_effects();
        machine.switch_mode(Mode::Music);
        let token = machine.music_token().expect("Music mode must own a token");

        // when (操作):
        machine.switch_mode(Mode::Normal);

        // then (期待する結果):
        assert!(token.is_cancelled());
        assert!(machine.music_token().is_none());
    }

    #[test]
    fn test_beat_triggers_mode_specific_beep() {
        // テスト項目: beat で normal モードのビープが鳴る
        // given (前提条件):
        let mut effects = MockSoundEffects::new();
        effects
            .expect_play_beep()
            .withf(|f, _, _| (*f - 880.0).abs() < f32::EPSILON)
            .times(1..)
            .return_const(());
        let mut machine = ModeMachine::new(Box::new(effects));

        // when (操作): 1 周期ぶん tick して beat を発生させる
        let mut saw_beat = false;
        for _ in 0..200 {
            if let Some(sample) = machine.tick() {
                if sample.beat {
                    saw_beat = true;
                    break;
                }
            }
        }

        // then (期待する結果):
        assert!(saw_beat);
    }
}
