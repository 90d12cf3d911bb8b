//! Per-conversation session registry
//!
//! The map lock is held only for lookup and insert. A turn holds its
//! session's own lock for the whole turn, so turns on one conversation
//! are strictly sequential while different conversations run in parallel.

use super::{Engine, Session, TurnReply};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct SessionRegistry {
    engine: Arc<Engine>,
    seed: Option<u64>,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

/// Stable per-conversation seed derived from the configured one
fn derive_seed(seed: u64, conversation: &str) -> u64 {
    conversation
        .bytes()
        .fold(seed ^ 0xcbf2_9ce4_8422_2325, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        })
}

impl SessionRegistry {
    pub fn new(engine: Arc<Engine>, seed: Option<u64>) -> Self {
        Self {
            engine,
            seed,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn rng_for(&self, conversation: &str) -> Box<dyn RngCore + Send> {
        match self.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(derive_seed(seed, conversation))),
            None => Box::new(StdRng::from_entropy()),
        }
    }

    /// Session for `conversation`, created on first use
    pub fn session(&self, conversation: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(conversation) {
            return Arc::clone(session);
        }
        let session = Arc::new(Mutex::new(Session::new(
            conversation,
            Arc::clone(&self.engine),
            self.rng_for(conversation),
        )));
        sessions.insert(conversation.to_string(), Arc::clone(&session));
        tracing::debug!(conversation, "session opened");
        session
    }

    /// Fresh conversation under a random key
    pub fn open_new(&self) -> String {
        let key = Uuid::new_v4().to_string();
        self.session(&key);
        key
    }

    pub fn turn(&self, conversation: &str, message: &str) -> TurnReply {
        let session = self.session(conversation);
        let mut session = session.lock();
        session.turn(message)
    }

    pub fn conversations(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demiurge::archetype::PhraseBook;
    use crate::demiurge::directives::DirectiveEngine;
    use crate::demiurge::voice::Composer;
    use crate::totems::{FileStateStore, MemoryStateStore, StateStore};
    use std::thread;

    fn registry_on(store: Arc<dyn StateStore>, seed: Option<u64>) -> SessionRegistry {
        let composer = Composer::new(
            Arc::new(PhraseBook::default()),
            DirectiveEngine::standard().unwrap(),
        );
        let engine = Engine::new(composer, store, "orpheus").unwrap();
        SessionRegistry::new(Arc::new(engine), seed)
    }

    fn registry(seed: Option<u64>) -> SessionRegistry {
        registry_on(Arc::new(MemoryStateStore::new()), seed)
    }

    #[test]
    fn test_same_key_same_session() {
        let reg = registry(Some(1));
        let a = reg.session("alpha");
        let b = reg.session("alpha");
        assert!(Arc::ptr_eq(&a, &b));
        reg.session("beta");
        assert_eq!(reg.conversations(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_concurrent_turns_do_not_lose_updates() {
        let reg = Arc::new(registry(Some(3)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    let key = if i % 2 == 0 { "shared" } else { "other" };
                    for n in 0..25 {
                        reg.turn(key, &format!("thread {} says hello number {}", i, n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let shared = reg.session("shared").lock().state();
        let other = reg.session("other").lock().state();
        assert_eq!(shared.interactions, 100);
        assert_eq!(other.interactions, 100);
    }

    #[test]
    fn test_file_backed_keys_differing_in_punctuation() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        store.initialize().unwrap();
        let reg = Arc::new(registry_on(Arc::new(store), Some(9)));

        reg.turn("alice/home", "my secret is that I adopted a cat named Pixel");
        let quiet = reg.session("alice_home").lock().state();
        assert!(quiet.memories.is_empty());
        assert_eq!(quiet.interactions, 0);

        let handles: Vec<_> = ["x/y", "x_y"]
            .into_iter()
            .map(|key| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for n in 0..100 {
                        reg.turn(key, &format!("turn number {} on this key", n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(reg.session("x/y").lock().state().interactions, 100);
        assert_eq!(reg.session("x_y").lock().state().interactions, 100);
    }

    #[test]
    fn test_seeded_registries_repeat() {
        let script = ["hey", "what is the meaning of all this", "I feel so alone lately, honestly"];
        let run = || {
            let reg = registry(Some(42));
            script
                .iter()
                .map(|m| reg.turn("c", m).reply)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_open_new() {
        let reg = registry(None);
        let key = reg.open_new();
        assert_eq!(key.len(), 36);
        assert_eq!(reg.conversations(), vec![key]);
    }
}
