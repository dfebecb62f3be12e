//! Karaoke lyrics parsing and lookup for music mode.
//!
//! Source format: one sentence per line, made of `[start+duration]chars`
//! tags. A tag's duration is split evenly across its characters; a tag
//! whose text is a single space is a pause marker and is skipped.

/// One timed character.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricChar {
    pub ch: char,
    /// Seconds from track start
    pub start: f64,
    pub duration: f64,
}

/// One timed sentence (one source line).
#[derive(Debug, Clone, PartialEq)]
pub struct LyricSentence {
    pub chars: Vec<LyricChar>,
    pub start: f64,
    pub end: f64,
}

impl LyricSentence {
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.ch).collect()
    }
}

/// Parsed lyrics with time-indexed lookup.
#[derive(Debug, Default)]
pub struct LyricsTimeline {
    sentences: Vec<LyricSentence>,
}

impl LyricsTimeline {
    pub fn parse(text: &str) -> Self {
        Self {
            sentences: parse_lyrics(text),
        }
    }

    pub fn sentences(&self) -> &[LyricSentence] {
        &self.sentences
    }

    /// The sentence active at `elapsed` seconds, if any.
    pub fn line_at(&self, elapsed: f64) -> Option<&LyricSentence> {
        self.sentences
            .iter()
            .find(|s| elapsed >= s.start && elapsed < s.end)
    }
}

/// Parse the `[start+duration]chars` format.
pub fn parse_lyrics(text: &str) -> Vec<LyricSentence> {
    let mut sentences = Vec::new();

    for line in text.trim().lines() {
        let mut chars: Vec<LyricChar> = Vec::new();

        for (start, duration, tag_text) in parse_tags(line) {
            // A single space is a pause marker
            if tag_text == " " {
                continue;
            }
            let char_count = tag_text.chars().count();
            if char_count == 0 {
                continue;
            }
            // Split the tag duration evenly across its characters
            let char_duration = duration / char_count as f64;
            let mut current = start;
            for ch in tag_text.chars() {
                chars.push(LyricChar {
                    ch,
                    start: round3(current),
                    duration: round3(char_duration),
                });
                current += char_duration;
            }
        }

        if !chars.is_empty() {
            let start = chars[0].start;
            let last = &chars[chars.len() - 1];
            let end = last.start + last.duration;
            sentences.push(LyricSentence { chars, start, end });
        }
    }

    sentences
}

/// Extract `(start, duration, text)` triples from one line.
fn parse_tags(line: &str) -> Vec<(f64, f64, &str)> {
    let mut tags = Vec::new();
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(']') else {
            break;
        };
        let header = &after_open[..close];
        let body = &after_open[close + 1..];
        let text_end = body.find('[').unwrap_or(body.len());

        if let Some((start_str, duration_str)) = header.split_once('+') {
            if let (Ok(start), Ok(duration)) =
                (start_str.trim().parse::<f64>(), duration_str.trim().parse::<f64>())
            {
                tags.push((start, duration, &body[..text_end]));
            }
        }

        rest = &body[text_end..];
    }

    tags
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
