// =============================================================================
// Search History: caller-owned, bounded, most recent first
// =============================================================================
//
// The host keeps one of these and passes it around; the engine never sees
// it.  Re-searching a symbol moves it to the front instead of duplicating it,
// and the ring is trimmed to `capacity` after every insert.
//
// Persistence uses the same atomic tmp + rename write as the engine config.
// =============================================================================

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::Timeframe;

pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub searched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    capacity: usize,
    entries: VecDeque<SearchEntry>,
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a search now.
    pub fn record(&mut self, symbol: &str, timeframe: Timeframe) {
        self.record_at(symbol, timeframe, Utc::now());
    }

    /// Record a search at an explicit time.  Symbols compare
    /// case-insensitively.
    pub fn record_at(&mut self, symbol: &str, timeframe: Timeframe, at: DateTime<Utc>) {
        let symbol = symbol.trim().to_uppercase();
        self.entries.retain(|e| e.symbol != symbol);
        self.entries.push_front(SearchEntry {
            symbol,
            timeframe,
            searched_at: at,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &SearchEntry> {
        self.entries.iter()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Load from `path`.  A missing file yields an empty history.
    pub fn load(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no search history yet");
            return Ok(Self::new(capacity));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read search history from {}", path.display()))?;
        let entries: VecDeque<SearchEntry> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse search history from {}", path.display()))?;

        let mut history = Self::new(capacity);
        // Stored newest first; replay oldest first so the order survives.
        for entry in entries.into_iter().rev() {
            history.record_at(&entry.symbol, entry.timeframe, entry.searched_at);
        }
        Ok(history)
    }

    /// Persist to `path` with an atomic write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(&self.entries).context("failed to serialise search history")?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp history to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp history to {}", path.display()))?;

        info!(path = %path.display(), entries = self.entries.len(), "search history saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn most_recent_first_without_duplicates() {
        let mut h = SearchHistory::new(5);
        h.record_at("aapl", Timeframe::Daily, at(1));
        h.record_at("MSFT", Timeframe::Daily, at(2));
        h.record_at("AAPL", Timeframe::Weekly, at(3));
        assert_eq!(h.symbols(), vec!["AAPL", "MSFT"]);
        assert_eq!(h.entries().next().unwrap().timeframe, Timeframe::Weekly);
    }

    #[test]
    fn trims_to_capacity() {
        let mut h = SearchHistory::new(2);
        for (i, s) in ["A", "B", "C"].iter().enumerate() {
            h.record_at(s, Timeframe::Daily, at(i as i64));
        }
        assert_eq!(h.symbols(), vec!["C", "B"]);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut h = SearchHistory::new(0);
        h.record_at("A", Timeframe::Daily, at(0));
        h.record_at("B", Timeframe::Daily, at(1));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn save_then_load_preserves_order() {
        let dir = std::env::temp_dir().join(format!("signal-history-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("history.json");

        let mut h = SearchHistory::new(5);
        h.record_at("AAA", Timeframe::Daily, at(1));
        h.record_at("BBB", Timeframe::Monthly, at(2));
        h.save(&path).unwrap();

        let loaded = SearchHistory::load(&path, 5).unwrap();
        assert_eq!(loaded, h);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_empty() {
        let h = SearchHistory::load("/nonexistent/signal-history.json", 3).unwrap();
        assert!(h.is_empty());
    }
}
