//! Activity log of order and enabled-state mutations

use crate::error::{GroupError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;

/// One recorded mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Unique ID for this record (ULID format)
    pub id: String,

    pub timestamp: DateTime<Utc>,

    /// Canonical op string (e.g., "move entry-top", "toggle entry")
    pub op: String,

    /// The normalized input parameters (as JSON)
    pub input: Value,

    /// The result value or error (as JSON)
    pub output: Value,

    pub duration_ms: u64,
}

impl MutationRecord {
    pub fn new(op: impl Into<String>, input: Value, output: Value, duration_ms: u64) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            op: op.into(),
            input,
            output,
            duration_ms,
        }
    }
}

/// How one engine mutation ends up in the log
pub enum Outcome<T> {
    /// Changed the order list or an enabled flag
    Logged { value: T, record: MutationRecord },
    /// Nothing changed
    Unlogged { value: T },
    /// Failed; recorded unless the call never reached the order list
    Failed {
        error: GroupError,
        record: Option<MutationRecord>,
    },
}

impl<T: Serialize> Outcome<T> {
    /// Classify a finished call. `InvalidContext` aborts before touching
    /// anything and gets no record.
    pub fn classify(
        op: &str,
        input: Value,
        duration_ms: u64,
        changed: bool,
        result: Result<T>,
    ) -> Self {
        match result {
            Ok(value) if changed => {
                let output = serde_json::to_value(&value).unwrap_or(Value::Null);
                let record = MutationRecord::new(op, input, output, duration_ms);
                Self::Logged { value, record }
            }
            Ok(value) => Self::Unlogged { value },
            Err(error) => {
                let record = (!matches!(error, GroupError::InvalidContext)).then(|| {
                    let output = json!({ "error": error.to_string() });
                    MutationRecord::new(op, input, output, duration_ms)
                });
                Self::Failed { error, record }
            }
        }
    }
}

impl<T> Outcome<T> {
    /// Get the value and record separately
    pub fn split(self) -> (Result<T>, Option<MutationRecord>) {
        match self {
            Self::Logged { value, record } => (Ok(value), Some(record)),
            Self::Unlogged { value } => (Ok(value), None),
            Self::Failed { error, record } => (Err(error), record),
        }
    }
}

/// Bounded in-memory log, oldest records dropped first
#[derive(Debug, Clone)]
pub struct ActivityLog {
    records: VecDeque<MutationRecord>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a record. With zero capacity nothing is kept.
    pub fn push(&mut self, record: MutationRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records newest first
    pub fn recent(&self) -> impl Iterator<Item = &MutationRecord> + '_ {
        self.records.iter().rev()
    }

    pub fn latest(&self) -> Option<&MutationRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bounded_newest_first() {
        let mut log = ActivityLog::new(2);
        for op in ["first", "second", "third"] {
            log.push(MutationRecord::new(op, json!({}), json!(null), 0));
        }
        let ops: Vec<&str> = log.recent().map(|r| r.op.as_str()).collect();
        assert_eq!(ops, vec!["third", "second"]);
        assert_eq!(log.latest().unwrap().op, "third");
    }

    #[test]
    fn test_zero_capacity() {
        let mut log = ActivityLog::new(0);
        log.push(MutationRecord::new("op", json!({}), json!({}), 1));
        assert!(log.is_empty());
    }

    #[test]
    fn test_classify_changed_call_is_logged() {
        let input = json!({ "id": "a" });
        let outcome = Outcome::classify("toggle entry", input, 3, true, Ok(vec!["a"]));
        let (result, record) = outcome.split();
        assert_eq!(result.unwrap(), vec!["a"]);
        let record = record.unwrap();
        assert_eq!(record.op, "toggle entry");
        assert_eq!(record.output, json!(["a"]));
    }

    #[test]
    fn test_classify_unchanged_and_aborted_calls_are_silent() {
        let unchanged = Outcome::classify("toggle entry", json!({}), 0, false, Ok(1u8));
        assert!(unchanged.split().1.is_none());

        let aborted: Result<u8> = Err(GroupError::InvalidContext);
        let (result, record) =
            Outcome::classify("reorder group", json!({}), 0, true, aborted).split();
        assert!(matches!(result, Err(GroupError::InvalidContext)));
        assert!(record.is_none());
    }

    #[test]
    fn test_classify_failure_records_error() {
        let failed: Result<u8> = Err(GroupError::persist("disk full"));
        let (_, record) = Outcome::classify("move entry-top", json!({}), 0, true, failed).split();
        let output = record.unwrap().output;
        assert!(output["error"].as_str().unwrap().contains("disk full"));
    }

    #[test]
    fn test_record_ids_are_ulids() {
        let record = MutationRecord::new("op", json!({}), json!({}), 0);
        assert!(ulid::Ulid::from_string(&record.id).is_ok());
    }
}
