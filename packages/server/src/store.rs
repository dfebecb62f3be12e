//! In-memory danmaku store.
//!
//! Holds every submitted danmaku for the lifetime of the process. There is
//! no eviction: one live event's chat volume fits comfortably in memory and
//! newly joined viewers rehydrate from the full list.

use std::collections::HashMap;

use rand::Rng;

use kodou_shared::protocol::{DanmakuEntry, DanmakuStatus};
use kodou_shared::time::{Clock, SystemClock};

const ID_SUFFIX_LEN: usize = 7;
const ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Store of submitted danmaku, keyed by server-assigned id.
pub struct DanmakuStore {
    entries: HashMap<String, DanmakuEntry>,
    clock: Box<dyn Clock>,
}

impl Default for DanmakuStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DanmakuStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Create a store with an injected clock (fixed clocks in tests).
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Insert a submitted danmaku.
    ///
    /// Assigns a fresh unique id, forces `status` to `queued`, and returns
    /// the stored copy. Callers must broadcast the returned copy, not the
    /// submission, since only the copy carries the id.
    pub fn add(&mut self, draft: DanmakuEntry) -> DanmakuEntry {
        let mut entry = draft;
        entry.id = self.fresh_id();
        entry.status = DanmakuStatus::Queued;
        self.entries.insert(entry.id.clone(), entry.clone());
        entry
    }

    /// Remove an entry. Returns whether removal occurred; an absent id is
    /// not an error.
    pub fn delete(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Look up a single entry.
    pub fn get(&self, id: &str) -> Option<&DanmakuEntry> {
        self.entries.get(id)
    }

    /// Update the advisory status of an entry. Unknown ids are ignored.
    pub fn update_status(&mut self, id: &str, status: DanmakuStatus) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.status = status;
        }
    }

    /// All entries sorted by timestamp ascending (oldest first).
    ///
    /// Used to rehydrate newly joined viewers.
    pub fn get_all(&self) -> Vec<DanmakuEntry> {
        let mut entries: Vec<DanmakuEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Generate an id not already present in the store.
    ///
    /// Ids are `{millis}-{7 base36 chars}`; the random suffix makes a
    /// same-millisecond collision unlikely, and the re-roll loop keeps the
    /// unique-id invariant even then.
    fn fresh_id(&self) -> String {
        loop {
            let id = generate_id(self.clock.now_millis());
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }
}

fn generate_id(now_millis: i64) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_CHARSET[rng.random_range(0..ID_CHARSET.len())] as char)
        .collect();
    format!("{now_millis}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodou_shared::time::FixedClock;

    fn draft(user_id: &str, content: &str, timestamp: i64) -> DanmakuEntry {
        DanmakuEntry {
            id: String::new(),
            user_id: user_id.to_string(),
            name: user_id.to_string(),
            avatar: String::new(),
            content: content.to_string(),
            timestamp,
            is_quick_phrase: false,
            status: DanmakuStatus::Done, // add() must reset this
        }
    }

    #[test]
    fn test_add_assigns_id_and_queued_status() {
        // テスト項目: add が id を割り当て status を queued にリセットする
        // given (前提条件):
        let mut store = DanmakuStore::with_clock(Box::new(FixedClock::new(171234)));

        // when (操作):
        let stored = store.add(draft("u1", "hi", 1000));

        // then (期待する結果):
        assert!(stored.id.starts_with("171234-"));
        assert_eq!(stored.id.len(), "171234-".len() + 7);
        assert_eq!(stored.status, DanmakuStatus::Queued);
        assert_eq!(store.get(&stored.id), Some(&stored));
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        // テスト項目: 同一時刻でも add が一意な id を割り当てる
        // given (前提条件):
        let mut store = DanmakuStore::with_clock(Box::new(FixedClock::new(171234)));

        // when (操作):
        let ids: Vec<String> = (0..100)
            .map(|i| store.add(draft("u1", "hi", i)).id)
            .collect();

        // then (期待する結果):
        let unique: std::collections::HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_get_all_is_sorted_by_timestamp() {
        // テスト項目: get_all が挿入順に関わらずタイムスタンプ昇順で返す
        // given (前提条件):
        let mut store = DanmakuStore::new();
        store.add(draft("u1", "third", 3000));
        store.add(draft("u2", "first", 1000));
        store.add(draft("u3", "second", 2000));

        // when (操作):
        let all = store.get_all();

        // then (期待する結果):
        let timestamps: Vec<i64> = all.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_delete_removes_entry() {
        // テスト項目: delete が対象のエントリを取り除く
        // given (前提条件):
        let mut store = DanmakuStore::new();
        let stored = store.add(draft("u1", "hi", 1000));

        // when (操作):
        let deleted = store.delete(&stored.id);

        // then (期待する結果):
        assert!(deleted);
        assert!(store.get_all().iter().all(|e| e.id != stored.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_of_absent_id_returns_false_and_leaves_store_unchanged() {
        // テスト項目: 存在しない id の delete が false を返し store を変えない
        // given (前提条件):
        let mut store = DanmakuStore::new();
        store.add(draft("u1", "hi", 1000));

        // when (操作):
        let deleted = store.delete("171234-absent0");

        // then (期待する結果):
        assert!(!deleted);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_status_preserves_advisory_field() {
        // テスト項目: update_status が status フィールドを更新する
        // given (前提条件):
        let mut store = DanmakuStore::new();
        let stored = store.add(draft("u1", "hi", 1000));

        // when (操作):
        store.update_status(&stored.id, DanmakuStatus::Displaying);

        // then (期待する結果):
        assert_eq!(
            store.get(&stored.id).map(|e| e.status),
            Some(DanmakuStatus::Displaying)
        );
    }

    #[test]
    fn test_clear_empties_the_store() {
        // テスト項目: clear で全エントリが消える
        // given (前提条件):
        let mut store = DanmakuStore::new();
        store.add(draft("u1", "a", 1000));
        store.add(draft("u2", "b", 2000));

        // when (操作):
        store.clear();

        // then (期待する結果):
        assert!(store.is_empty());
        assert!(store.get_all().is_empty());
    }
}
