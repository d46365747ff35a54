use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use super::asset::AssetCategory;

/// Capacity of the recent-notes history.
pub const NOTE_CAPACITY: usize = 12;
/// How many of the newest notes are rendered into a memory summary.
pub const SUMMARY_NOTES: usize = 8;
/// Longer notes are cut to this many characters.
pub const NOTE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    AwaitingChart,
    AwaitingPrompt,
}

impl PendingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingAction::AwaitingChart => "awaiting_chart",
            PendingAction::AwaitingPrompt => "awaiting_prompt",
        }
    }
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendingAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_chart" => Ok(PendingAction::AwaitingChart),
            "awaiting_prompt" => Ok(PendingAction::AwaitingPrompt),
            other => Err(anyhow::anyhow!("Unknown pending action: {}", other)),
        }
    }
}

/// The single unresolved expectation of a session. Action, category and
/// symbol live together so none of them can be set without the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSlot {
    pub action: PendingAction,
    pub category: AssetCategory,
    pub symbol: String,
}

/// Bounded history of short notes, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteLog(VecDeque<String>);

impl NoteLog {
    /// Build from stored notes, keeping only the newest `NOTE_CAPACITY`.
    pub fn from_notes(notes: Vec<String>) -> Self {
        let mut log = NoteLog::default();
        for note in notes {
            log.push(note);
        }
        log
    }

    /// Append a note, evicting from the front once over capacity.
    /// Blank notes are dropped.
    pub fn push(&mut self, note: impl Into<String>) {
        let note = note.into();
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        self.0.push_back(note.chars().take(NOTE_MAX_CHARS).collect());
        while self.0.len() > NOTE_CAPACITY {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Numbered list of the newest `SUMMARY_NOTES` notes in chronological
    /// order, or an empty string.
    pub fn summary(&self) -> String {
        let skip = self.0.len().saturating_sub(SUMMARY_NOTES);
        self.0
            .iter()
            .skip(skip)
            .enumerate()
            .map(|(i, note)| format!("{}. {}", i + 1, note))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub pending: Option<PendingSlot>,
    pub last_category: Option<AssetCategory>,
    pub last_symbol: Option<String>,
    pub last_timeframe: Option<String>,
    pub last_style: Option<String>,
    pub last_risk: Option<String>,
    pub recent_notes: NoteLog,
}

impl Memory {
    pub fn pending_action(&self) -> Option<PendingAction> {
        self.pending.as_ref().map(|slot| slot.action)
    }

    /// Replace whatever was pending. Last write wins; nothing is queued.
    pub fn set_pending(&mut self, action: PendingAction, category: AssetCategory, symbol: String) {
        self.pending = Some(PendingSlot {
            action,
            category,
            symbol,
        });
    }

    /// Clear the slot and remember its asset as the last selection.
    pub fn resolve_pending(&mut self) -> Option<PendingSlot> {
        let slot = self.pending.take()?;
        self.last_category = Some(slot.category);
        self.last_symbol = Some(slot.symbol.clone());
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_log_is_bounded_newest_last() {
        let mut log = NoteLog::default();
        for i in 0..30 {
            log.push(format!("note {}", i));
            assert!(log.len() <= NOTE_CAPACITY);
        }
        assert_eq!(log.len(), NOTE_CAPACITY);
        assert_eq!(log.iter().next().map(String::as_str), Some("note 18"));
        assert_eq!(log.iter().last().map(String::as_str), Some("note 29"));
    }

    #[test]
    fn test_blank_notes_are_dropped() {
        let mut log = NoteLog::default();
        log.push("   ");
        log.push("");
        assert!(log.is_empty());
    }

    #[test]
    fn test_long_notes_are_cut() {
        let mut log = NoteLog::default();
        log.push("ж".repeat(NOTE_MAX_CHARS + 50));
        assert_eq!(log.iter().next().unwrap().chars().count(), NOTE_MAX_CHARS);
    }

    #[test]
    fn test_summary_uses_newest_eight() {
        let log = NoteLog::from_notes((1..=10).map(|i| format!("n{}", i)).collect());
        let summary = log.summary();
        let lines: Vec<_> = summary.lines().collect();
        assert_eq!(lines.len(), SUMMARY_NOTES);
        assert_eq!(lines[0], "1. n3");
        assert_eq!(lines[7], "8. n10");
        assert_eq!(NoteLog::default().summary(), "");
    }

    #[test]
    fn test_set_pending_overwrites_previous_slot() {
        let mut memory = Memory::default();
        memory.set_pending(PendingAction::AwaitingChart, AssetCategory::Crypto, "BTCUSDT".into());
        memory.set_pending(PendingAction::AwaitingPrompt, AssetCategory::Metals, "XAUUSD".into());
        assert_eq!(
            memory.pending,
            Some(PendingSlot {
                action: PendingAction::AwaitingPrompt,
                category: AssetCategory::Metals,
                symbol: "XAUUSD".into(),
            })
        );
    }

    #[test]
    fn test_resolve_pending_records_last_selection() {
        let mut memory = Memory::default();
        assert!(memory.resolve_pending().is_none());
        memory.set_pending(PendingAction::AwaitingChart, AssetCategory::Stocks, "US30".into());
        let slot = memory.resolve_pending().unwrap();
        assert_eq!(slot.symbol, "US30");
        assert!(memory.pending.is_none());
        assert_eq!(memory.last_category, Some(AssetCategory::Stocks));
        assert_eq!(memory.last_symbol.as_deref(), Some("US30"));
    }
}
