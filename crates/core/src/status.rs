//! Key-value run status shared between the pipeline and whoever observes it.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};

pub const STAGE: &str = "pipeline.stage";
pub const RUN_ID: &str = "pipeline.run_id";
pub const SCENES_TOTAL: &str = "scenes.total";
pub const SCENES_SYNTHESIZED: &str = "scenes.synthesized";
pub const NARRATION_PLACEHOLDERS: &str = "narration.placeholders";
pub const SEGMENTS_COMPOSED: &str = "segments.composed";
pub const RUNS_COMPLETED: &str = "runs.completed";
pub const RUNS_FAILED: &str = "runs.failed";
pub const LAST_OUTPUT: &str = "last.output";
pub const LAST_ERROR: &str = "last.error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Count(u64),
    Text(String),
}

impl StatusValue {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            StatusValue::Count(n) => Some(*n),
            StatusValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StatusValue::Text(s) => Some(s),
            StatusValue::Count(_) => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusValue::Count(n) => write!(f, "{}", n),
            StatusValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for StatusValue {
    fn from(n: u64) -> Self {
        StatusValue::Count(n)
    }
}

impl From<&str> for StatusValue {
    fn from(s: &str) -> Self {
        StatusValue::Text(s.to_string())
    }
}

impl From<String> for StatusValue {
    fn from(s: String) -> Self {
        StatusValue::Text(s)
    }
}

pub trait StatusStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StatusValue>;

    fn set(&self, key: &str, value: StatusValue);

    /// Read-modify-write a key; no other writer runs between the read and the write.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<StatusValue>) -> StatusValue,
    ) -> StatusValue;

    fn snapshot(&self) -> BTreeMap<String, StatusValue>;

    fn increment(&self, key: &str) -> u64 {
        let value = self.update(key, &mut |current| {
            let n = current.and_then(|v| v.as_count()).unwrap_or(0);
            StatusValue::Count(n + 1)
        });
        value.as_count().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    values: Mutex<BTreeMap<String, StatusValue>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StatusValue>> {
        // A panic while holding the lock leaves the map intact.
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, key: &str) -> Option<StatusValue> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: StatusValue) {
        self.lock().insert(key.to_string(), value);
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<StatusValue>) -> StatusValue,
    ) -> StatusValue {
        let mut values = self.lock();
        let next = apply(values.get(key).cloned());
        values.insert(key.to_string(), next.clone());
        next
    }

    fn snapshot(&self) -> BTreeMap<String, StatusValue> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_and_get() {
        let store = MemoryStatusStore::new();
        assert_eq!(store.get(STAGE), None);

        store.set(STAGE, "composing".into());
        assert_eq!(store.get(STAGE), Some(StatusValue::Text("composing".into())));
    }

    #[test]
    fn test_increment_starts_from_zero() {
        let store = MemoryStatusStore::new();
        assert_eq!(store.increment(RUNS_COMPLETED), 1);
        assert_eq!(store.increment(RUNS_COMPLETED), 2);
        assert_eq!(store.get(RUNS_COMPLETED), Some(StatusValue::Count(2)));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStatusStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.increment(SEGMENTS_COMPOSED);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(SEGMENTS_COMPOSED), Some(StatusValue::Count(800)));
    }

    #[test]
    fn test_values_serialize_untagged() {
        let mut snapshot = BTreeMap::new();
        snapshot.insert("a".to_string(), StatusValue::Count(3));
        snapshot.insert("b".to_string(), StatusValue::from("done"));
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"a":3,"b":"done"}"#
        );
    }
}
