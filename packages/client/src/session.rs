//! Viewer session core.
//!
//! [`ClientCore`] owns every per-viewer state machine and applies the
//! relay's broadcasts in receipt order. The same code path handles the
//! viewer's own events coming back from the relay, which is what keeps all
//! viewers consistent.

use kodou_shared::protocol::{
    ClientCountData, DanmakuDeleteData, DanmakuEntry, Event, EventType, Mode, ModeChangeData,
};

use crate::avatar::avatar_url;
use crate::bpm::BpmMeter;
use crate::danmaku::{DanmakuFrame, DanmakuRenderer, RendererConfig};
use crate::effects::SoundEffects;
use crate::lyrics::LyricsTimeline;
use crate::mode::ModeMachine;
use crate::music::{AudioAnalyzer, MusicWaveform};

/// Waveform/render loop cadence.
pub const TICK_INTERVAL_MS: i64 = 30;

/// Pre-authored messages selectable instead of free text.
pub const QUICK_PHRASES: [&str; 4] = ["666", "泪目", "加油！", "下次一定"];

/// Counters shown in the viewer chrome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
    pub interaction_count: u64,
    pub online_count: usize,
}

/// What one inbound event did to the core. Consumed by the display layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    ModeChanged { from: Mode, to: Mode },
    /// Already in the requested mode; nothing happened
    ModeUnchanged,
    DanmakuQueued(DanmakuEntry),
    DanmakuRemoved { id: String, removed: bool },
    /// Rehydrated from a `danmakuListSync`; carries the entry count
    Rehydrated(usize),
    OnlineCount(usize),
    Interaction(u64),
    Heartbeat,
    /// Valid event with nothing for a viewer to do
    Ignored,
    /// Payload didn't match its type; dropped with a warning
    Invalid(&'static str),
}

/// Output of one render tick, handed to the render sink.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreFrame {
    /// Next waveform sample; `None` while music mode bypasses the generator
    pub wave: Option<f64>,
    pub beat: bool,
    pub bpm: u16,
    /// Full display trace from the audio analyzer (music mode only)
    pub music: Option<Vec<f32>>,
    /// Current karaoke line (music mode with lyrics only)
    pub lyric_line: Option<String>,
    pub danmaku: Vec<DanmakuFrame>,
}

/// All per-viewer state, wired together.
pub struct ClientCore {
    pub mode: ModeMachine,
    pub renderer: DanmakuRenderer,
    pub bpm: BpmMeter,
    pub stats: ClientStats,
    /// Audio source for music mode; absent on viewers without playback
    analyzer: Option<Box<dyn AudioAnalyzer>>,
    music_shaper: MusicWaveform,
    lyrics: Option<LyricsTimeline>,
    /// Wall-clock start of the current music session
    music_started_at: Option<i64>,
}

impl ClientCore {
    pub fn new(effects: Box<dyn SoundEffects>, renderer_config: RendererConfig) -> Self {
        Self {
            mode: ModeMachine::new(effects),
            renderer: DanmakuRenderer::new(renderer_config),
            bpm: BpmMeter::new(),
            stats: ClientStats::default(),
            analyzer: None,
            music_shaper: MusicWaveform::new(),
            lyrics: None,
            music_started_at: None,
        }
    }

    /// Attach the audio source used when music mode is entered.
    pub fn set_analyzer(&mut self, analyzer: Box<dyn AudioAnalyzer>) {
        self.analyzer = Some(analyzer);
    }

    /// Attach parsed lyrics for the karaoke display.
    pub fn set_lyrics(&mut self, lyrics: LyricsTimeline) {
        self.lyrics = Some(lyrics);
    }

    /// Apply one broadcast from the relay.
    pub fn handle_event(&mut self, event: &Event) -> Applied {
        match event.r#type {
            EventType::ModeChange => match event.data_as::<ModeChangeData>() {
                Ok(payload) => {
                    let from = self.mode.current();
                    if self.mode.switch_mode(payload.mode) {
                        if payload.mode == Mode::Music {
                            // Fresh session: lyrics sync starts from the
                            // first music tick
                            self.music_started_at = None;
                        }
                        Applied::ModeChanged {
                            from,
                            to: payload.mode,
                        }
                    } else {
                        Applied::ModeUnchanged
                    }
                }
                Err(e) => {
                    tracing::warn!("Invalid modeChange payload: {}", e);
                    Applied::Invalid("modeChange")
                }
            },
            EventType::Danmaku => match event.data_as::<DanmakuEntry>() {
                Ok(mut entry) => {
                    entry.avatar = avatar_url(&entry.avatar, &entry.name);
                    self.renderer.enqueue(entry.clone());
                    Applied::DanmakuQueued(entry)
                }
                Err(e) => {
                    tracing::warn!("Invalid danmaku payload: {}", e);
                    Applied::Invalid("danmaku")
                }
            },
            EventType::DanmakuDelete => match event.data_as::<DanmakuDeleteData>() {
                Ok(payload) => {
                    let removed = self.renderer.remove(&payload.id);
                    Applied::DanmakuRemoved {
                        id: payload.id,
                        removed,
                    }
                }
                Err(e) => {
                    tracing::warn!("Invalid danmakuDelete payload: {}", e);
                    Applied::Invalid("danmakuDelete")
                }
            },
            EventType::DanmakuListSync => match event.data_as::<Vec<DanmakuEntry>>() {
                Ok(entries) => {
                    let count = entries.len();
                    for mut entry in entries {
                        entry.avatar = avatar_url(&entry.avatar, &entry.name);
                        self.renderer.enqueue(entry);
                    }
                    Applied::Rehydrated(count)
                }
                Err(e) => {
                    tracing::warn!("Invalid danmakuListSync payload: {}", e);
                    Applied::Invalid("danmakuListSync")
                }
            },
            EventType::Connect | EventType::Disconnect => {
                match event.data_as::<ClientCountData>() {
                    Ok(payload) => {
                        self.stats.online_count = payload.total_clients;
                        Applied::OnlineCount(payload.total_clients)
                    }
                    Err(e) => {
                        tracing::warn!("Invalid client count payload: {}", e);
                        Applied::Invalid("connect/disconnect")
                    }
                }
            }
            EventType::Interaction => {
                self.stats.interaction_count += 1;
                Applied::Interaction(self.stats.interaction_count)
            }
            EventType::Heartbeat => Applied::Heartbeat,
            // register は中継されない想定、未知タグは viewer には無意味
            EventType::Register | EventType::DanmakuList | EventType::Unknown => Applied::Ignored,
        }
    }

    /// Advance every animation state machine one step.
    pub fn tick(&mut self, now_millis: i64) -> CoreFrame {
        let sample = self.mode.tick();
        if let Some(sample) = sample {
            let nominal = self.mode.generator().nominal_bpm(TICK_INTERVAL_MS as f64);
            self.bpm.on_tick(self.mode.current(), sample.beat, nominal);
        }

        let (music, lyric_line) = if self.mode.current() == Mode::Music {
            self.music_tick(now_millis)
        } else {
            self.music_started_at = None;
            (None, None)
        };

        let danmaku = self.renderer.tick(now_millis);
        CoreFrame {
            wave: sample.map(|s| s.value),
            beat: sample.map(|s| s.beat).unwrap_or(false),
            bpm: self.bpm.value(),
            music,
            lyric_line,
            danmaku,
        }
    }

    /// One music-mode frame: shape the analyzer window and look up the
    /// current karaoke line. Without an analyzer the trace stays empty.
    fn music_tick(&mut self, now_millis: i64) -> (Option<Vec<f32>>, Option<String>) {
        let started_at = *self.music_started_at.get_or_insert(now_millis);

        let Some(analyzer) = self.analyzer.as_mut() else {
            return (None, None);
        };

        let window = analyzer.waveform();
        let band = analyzer.band_energy();
        let points = self.music_shaper.process(&window, &band).to_vec();
        self.bpm.on_volume(analyzer.average_volume() as f64);

        let elapsed_secs = (now_millis - started_at) as f64 / 1000.0;
        let lyric_line = self
            .lyrics
            .as_ref()
            .and_then(|timeline| timeline.line_at(elapsed_secs))
            .map(|sentence| sentence.text());

        (Some(points), lyric_line)
    }
}
