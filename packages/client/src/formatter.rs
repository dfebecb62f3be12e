//! Terminal rendering of applied events for the headless viewer.

use kodou_shared::time::timestamp_to_rfc3339;

use crate::session::Applied;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// One printable line for an applied event, or `None` for events that
    /// only feed the animation loop.
    pub fn format_applied(applied: &Applied) -> Option<String> {
        match applied {
            Applied::ModeChanged { from, to } => Some(format!("\n*** Mode: {from} -> {to} ***")),
            Applied::ModeUnchanged => None,
            Applied::DanmakuQueued(entry) => {
                let marker = if entry.is_quick_phrase { " (quick)" } else { "" };
                Some(format!(
                    "\n[{}] {}{}: {}  <{}>",
                    timestamp_to_rfc3339(entry.timestamp),
                    entry.name,
                    marker,
                    entry.content,
                    entry.id,
                ))
            }
            Applied::DanmakuRemoved { id, removed } => {
                if *removed {
                    Some(format!("\n*** Danmaku {id} removed ***"))
                } else {
                    None
                }
            }
            Applied::Rehydrated(count) => Some(format!("\n*** Synced {count} danmaku ***")),
            Applied::OnlineCount(count) => Some(format!("\n*** Online: {count} ***")),
            Applied::Interaction(count) => Some(format!("\n*** Interactions: {count} ***")),
            Applied::Heartbeat | Applied::Ignored | Applied::Invalid(_) => None,
        }
    }

    /// Status line shown on demand.
    pub fn format_status(mode: &str, bpm: u16, online: usize, pending: usize) -> String {
        format!("mode={mode} bpm={bpm} online={online} pending_danmaku={pending}")
    }
}

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(name: &str) {
    use std::io::Write;
    print!("{}> ", name);
    std::io::stdout().flush().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodou_shared::protocol::Mode;

    #[test]
    fn test_mode_change_line_names_both_modes() {
        // テスト項目: モード切替行に遷移前後のモード名が含まれる
        // given (前提条件):
        let applied = Applied::ModeChanged {
            from: Mode::Normal,
            to: Mode::Excited,
        };

        // when (操作):
        let line = MessageFormatter::format_applied(&applied).unwrap();

        // then (期待する結果):
        assert!(line.contains("normal"));
        assert!(line.contains("excited"));
    }

    #[test]
    fn test_silent_events_produce_no_line() {
        // テスト項目: 表示不要なイベントが行を生成しない
        // given (前提条件):

        // when (操作) / then (期待する結果):
        assert_eq!(MessageFormatter::format_applied(&Applied::Heartbeat), None);
        assert_eq!(MessageFormatter::format_applied(&Applied::Ignored), None);
        assert_eq!(
            MessageFormatter::format_applied(&Applied::ModeUnchanged),
            None
        );
    }

    #[test]
    fn test_removed_danmaku_line_only_when_something_was_removed() {
        // テスト項目: 実際に削除された場合のみ行が出る
        // given (前提条件):
        let removed = Applied::DanmakuRemoved {
            id: "id-1".to_string(),
            removed: true,
        };
        let noop = Applied::DanmakuRemoved {
            id: "id-2".to_string(),
            removed: false,
        };

        // when (操作) / then (期待する結果):
        assert!(MessageFormatter::format_applied(&removed).is_some());
        assert_eq!(MessageFormatter::format_applied(&noop), None);
    }
}
