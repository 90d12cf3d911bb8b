//! 💾 State persistence
//!
//! One JSON blob per conversation. Loading merges the stored blob over
//! the default state so fields added later are filled in, and falls
//! back to the default state wholesale on any read, parse or type error.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::demiurge::PersonalityState;

/// Key-value blob store keyed by conversation
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet
    fn load(&self, conversation: &str) -> Result<Option<Value>>;
    fn save(&self, conversation: &str, state: &Value) -> Result<()>;
}

/// One pretty-printed JSON file per conversation
pub struct FileStateStore {
    base_path: PathBuf,
}

impl FileStateStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Creates the data directory with a .gitignore
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).with_context(|| {
            format!("Failed to create data dir {}", self.base_path.display())
        })?;

        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "# Orpheus personality state\n*\n!.gitignore\n")?;
        }
        Ok(())
    }

    pub fn path_for(&self, conversation: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", sanitize_key(conversation)))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, conversation: &str) -> Result<Option<Value>> {
        let path = self.path_for(conversation);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt state file {}", path.display()))?;
        Ok(Some(value))
    }

    fn save(&self, conversation: &str, state: &Value) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.path_for(conversation);
        let json_content = serde_json::to_string_pretty(state)?;

        // readers only ever see a complete file
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json_content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStateStore {
    blobs: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, conversation: &str) -> Result<Option<Value>> {
        Ok(self.blobs.lock().get(conversation).cloned())
    }

    fn save(&self, conversation: &str, state: &Value) -> Result<()> {
        self.blobs
            .lock()
            .insert(conversation.to_string(), state.clone());
        Ok(())
    }
}

/// File-safe, one-to-one encoding of a conversation key.
///
/// `[A-Za-z0-9-]` pass through; every other byte, `_` included, becomes
/// `_` plus two hex digits. The empty key maps to a lone `_`, which no
/// other key can produce.
pub fn sanitize_key(key: &str) -> String {
    if key.is_empty() {
        return "_".to_string();
    }
    let mut encoded = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("_{:02X}", b));
        }
    }
    encoded
}

/// Recursive merge: objects merge key by key, anything else in `overlay` replaces `base`
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Default state merged with `loaded`, typed. The memory capacity of
/// `default` wins over a stored one.
pub fn merge_with_defaults(loaded: Value, default: &PersonalityState) -> Result<PersonalityState> {
    let mut merged = serde_json::to_value(default)?;
    deep_merge(&mut merged, loaded);
    let mut state: PersonalityState =
        serde_json::from_value(merged).context("Stored state has the wrong shape")?;
    state.max_memories = default.max_memories;
    state.trim_memories();
    Ok(state)
}

/// Load a conversation's state; never fails
pub fn load_state(
    store: &dyn StateStore,
    conversation: &str,
    default: &PersonalityState,
) -> PersonalityState {
    let loaded = match store.load(conversation) {
        Ok(Some(value)) => value,
        Ok(None) => return default.clone(),
        Err(e) => {
            tracing::warn!(conversation, error = %e, "state unreadable, using defaults");
            return default.clone();
        }
    };

    match merge_with_defaults(loaded, default) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(conversation, error = %e, "state rejected, using defaults");
            default.clone()
        }
    }
}

/// Persist a conversation's state; failures are logged only
pub fn save_state(store: &dyn StateStore, conversation: &str, state: &PersonalityState) {
    let result = serde_json::to_value(state)
        .map_err(anyhow::Error::from)
        .and_then(|value| store.save(conversation, &value));
    if let Err(e) = result {
        tracing::warn!(conversation, error = %e, "failed to save state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demiurge::Tone;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_deep_merge_objects_recursively() {
        let mut base = json!({"a": {"x": 1, "y": 2}, "list": [1, 2, 3], "keep": true});
        deep_merge(&mut base, json!({"a": {"y": 5, "z": 6}, "list": [9]}));
        assert_eq!(
            base,
            json!({"a": {"x": 1, "y": 5, "z": 6}, "list": [9], "keep": true})
        );
    }

    #[test]
    fn test_missing_fields_come_from_defaults() {
        let store = MemoryStateStore::new();
        store
            .save("c1", &json!({"vectors": {"mythicDepth": 0.55}, "memories": ["kept"]}))
            .unwrap();

        let state = load_state(&store, "c1", &PersonalityState::default());
        assert_eq!(state.vectors.mythic_depth, 0.55);
        assert_eq!(state.vectors.presence, 0.6);
        assert_eq!(state.memories, vec!["kept"]);
        assert_eq!(state.max_memories, 10);
        assert!(state.identity().boundaries.no_fake_agency);
    }

    #[test]
    fn test_wrong_types_fall_back_wholesale() {
        let store = MemoryStateStore::new();
        store
            .save("c1", &json!({"vectors": {"mythicDepth": "deep"}, "memories": ["lost"]}))
            .unwrap();
        let state = load_state(&store, "c1", &PersonalityState::default());
        assert_eq!(state, PersonalityState::default());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path());
        fs::write(store.path_for("c1"), "{ not json").unwrap();
        let state = load_state(&store, "c1", &PersonalityState::default());
        assert_eq!(state, PersonalityState::default());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state"));
        store.initialize().unwrap();

        let mut state = PersonalityState::default();
        state.remember("a snippet worth keeping around".to_string());
        state
            .thread_memory
            .record("hello", Tone::Mythic, Default::default());
        save_state(&store, "user/42", &state);

        assert!(dir.path().join("state").join("user_2F42.json").exists());
        assert!(!dir.path().join("state").join("user_2F42.json.tmp").exists());
        let loaded = load_state(&store, "user/42", &PersonalityState::default());
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_unknown_tone_keeps_state() {
        let store = MemoryStateStore::new();
        store
            .save(
                "c1",
                &json!({"threadMemory": {"lastTones": ["oracular"]}, "memories": ["kept"]}),
            )
            .unwrap();
        let state = load_state(&store, "c1", &PersonalityState::default());
        assert_eq!(state.thread_memory.last_tones, vec![Tone::Casual]);
        assert_eq!(state.memories, vec!["kept"]);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("abc-DEF123"), "abc-DEF123");
        assert_eq!(sanitize_key("user_1"), "user_5F1");
        assert_eq!(sanitize_key("../etc/passwd"), "_2E_2E_2Fetc_2Fpasswd");
        assert_eq!(sanitize_key("é"), "_C3_A9");
        assert_eq!(sanitize_key(""), "_");
    }

    #[test]
    fn test_punctuation_keys_stay_isolated() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path());
        let keys = ["alice/home", "alice_home", "alice home", "alice_2Fhome", ""];
        let paths: std::collections::HashSet<_> = keys.iter().map(|k| store.path_for(k)).collect();
        assert_eq!(paths.len(), keys.len());

        let mut state = PersonalityState::default();
        state.remember("my secret is that I adopted a cat named Pixel".to_string());
        save_state(&store, "alice/home", &state);

        let other = load_state(&store, "alice_home", &PersonalityState::default());
        assert!(other.memories.is_empty());
        let same = load_state(&store, "alice/home", &PersonalityState::default());
        assert_eq!(same.memories, state.memories);
    }

    #[test]
    fn test_configured_capacity_trims_stored_memories() {
        let store = MemoryStateStore::new();
        let memories: Vec<String> = (0..12).map(|i| format!("stored memory {}", i)).collect();
        store
            .save("c1", &json!({"maxMemories": 50, "memories": memories}))
            .unwrap();

        let state = load_state(&store, "c1", &PersonalityState::with_max_memories(4));
        assert_eq!(state.max_memories, 4);
        assert_eq!(state.memories, memories[8..].to_vec());
    }
}
