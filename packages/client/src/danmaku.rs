//! Danmaku overlay renderer.
//!
//! A bounded-concurrency animator: pending entries wait in a FIFO queue,
//! on-screen entries occupy a fixed pool of slots, and each slot scrolls
//! across the viewport in a fixed duration matched to the waveform's
//! visible time window. Progress is purely time-based, so variable frame
//! rates don't change how long an entry stays on screen.

use std::collections::{HashMap, VecDeque};

use rand::Rng;

use kodou_shared::protocol::DanmakuEntry;

/// Nominal width of the avatar + padding of one rendered entry.
const ENTRY_BASE_WIDTH: f32 = 52.0;
/// Estimated advance per character at the overlay's font size.
const CHAR_WIDTH: f32 = 9.0;
/// Fade-in portion at the start of the scroll.
const FADE_IN_PROGRESS: f32 = 0.05;

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Maximum number of entries on screen at once (the slot pool size)
    pub max_concurrent: usize,
    /// Total scroll duration per entry, in milliseconds
    pub scroll_duration_ms: i64,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Height of one rendered entry, used for lane placement
    pub entry_height: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            scroll_duration_ms: 5000,
            viewport_width: 480.0,
            viewport_height: 160.0,
            entry_height: 32.0,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveSlot {
    entry: DanmakuEntry,
    started_at: i64,
    width: f32,
    y: f32,
}

/// Position of one on-screen entry for the render sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DanmakuFrame {
    pub entry: DanmakuEntry,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
}

/// Queue + slot pool animator.
pub struct DanmakuRenderer {
    config: RendererConfig,
    queue: VecDeque<DanmakuEntry>,
    slots: Vec<Option<ActiveSlot>>,
    /// Server id -> slot index, for out-of-band removal
    index: HashMap<String, usize>,
}

impl DanmakuRenderer {
    pub fn new(config: RendererConfig) -> Self {
        let slots = (0..config.max_concurrent).map(|_| None).collect();
        Self {
            config,
            queue: VecDeque::new(),
            slots,
            index: HashMap::new(),
        }
    }

    /// Queue an entry for display.
    pub fn enqueue(&mut self, entry: DanmakuEntry) {
        self.queue.push_back(entry);
    }

    /// Advance the animation to `now_millis` and return the visible frames.
    ///
    /// Finished slots are freed first, then at most one queued entry is
    /// assigned to a free slot per tick, which spreads bursts of danmaku
    /// across frames instead of dumping them on screen at once.
    pub fn tick(&mut self, now_millis: i64) -> Vec<DanmakuFrame> {
        self.retire_finished(now_millis);

        if self.active_count() < self.config.max_concurrent {
            if let Some(entry) = self.queue.pop_front() {
                self.assign_slot(entry, now_millis);
            }
        }

        let duration = self.config.scroll_duration_ms.max(1) as f32;
        let traversal_base = self.config.viewport_width;
        self.slots
            .iter()
            .flatten()
            .map(|slot| {
                let elapsed = (now_millis - slot.started_at) as f32;
                let progress = (elapsed / duration).clamp(0.0, 1.0);
                // Travel the full container width plus the element width so
                // the entry completely exits before its slot is recycled.
                let scroll_distance = traversal_base + slot.width;
                let opacity = if progress < FADE_IN_PROGRESS {
                    progress * 20.0
                } else {
                    1.0
                };
                DanmakuFrame {
                    entry: slot.entry.clone(),
                    x: traversal_base - scroll_distance * progress,
                    y: slot.y,
                    opacity,
                }
            })
            .collect()
    }

    /// Hide the entry mapped to a server id, freeing its slot immediately.
    /// Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(slot_index) => {
                self.slots[slot_index] = None;
                true
            }
            None => false,
        }
    }

    /// Drop the queue and hide everything on screen.
    pub fn clear(&mut self) {
        self.queue.clear();
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.index.clear();
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    fn retire_finished(&mut self, now_millis: i64) {
        let duration = self.config.scroll_duration_ms;
        for slot in self.slots.iter_mut() {
            let finished = slot
                .as_ref()
                .is_some_and(|active| now_millis - active.started_at >= duration);
            if finished {
                if let Some(active) = slot.take() {
                    self.index.remove(&active.entry.id);
                }
            }
        }
    }

    fn assign_slot(&mut self, entry: DanmakuEntry, now_millis: i64) {
        let Some(slot_index) = self.slots.iter().position(Option::is_none) else {
            // No free slot after all; put the entry back at the front
            self.queue.push_front(entry);
            return;
        };

        let width = self.measure(&entry);
        let lane_span = (self.config.viewport_height - self.config.entry_height).max(0.0);
        let y = if lane_span > 0.0 {
            rand::rng().random::<f32>() * lane_span
        } else {
            0.0
        };

        if !entry.id.is_empty() {
            self.index.insert(entry.id.clone(), slot_index);
        }
        self.slots[slot_index] = Some(ActiveSlot {
            entry,
            started_at: now_millis,
            width,
            y,
        });
    }

    /// Estimated rendered width of one entry. The real sink measures the
    /// laid-out element; this keeps the scroll distance plausible headless.
    fn measure(&self, entry: &DanmakuEntry) -> f32 {
        ENTRY_BASE_WIDTH + entry.content.chars().count() as f32 * CHAR_WIDTH
    }
}

/// One piece of a danmaku's content after emoji markup parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// A `[qq-emoji:<id>]` marker
    Emoji(u32),
}

/// Split inline `[qq-emoji:<id>]` markers from text runs.
///
/// Malformed markers stay as literal text.
pub fn parse_segments(content: &str) -> Vec<Segment> {
    const MARKER: &str = "[qq-emoji:";

    let mut segments = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(MARKER) {
        let after_marker = &rest[start + MARKER.len()..];
        match after_marker.find(']') {
            Some(end) if after_marker[..end].chars().all(|c| c.is_ascii_digit()) && end > 0 => {
                let id: u32 = match after_marker[..end].parse() {
                    Ok(id) => id,
                    Err(_) => {
                        // Digits overflowed u32; keep the marker as text
                        push_text(&mut segments, &rest[..start + MARKER.len()]);
                        rest = after_marker;
                        continue;
                    }
                };
                push_text(&mut segments, &rest[..start]);
                segments.push(Segment::Emoji(id));
                rest = &after_marker[end + 1..];
            }
            _ => {
                push_text(&mut segments, &rest[..start + MARKER.len()]);
                rest = after_marker;
            }
        }
    }
    push_text(&mut segments, rest);
    segments
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

/// Image URL for a QQ emoji id.
pub fn emoji_url(id: u32) -> String {
    format!("https://koishi.js.org/QFace/assets/qq_emoji/{id}/apng/{id}.png")
}
