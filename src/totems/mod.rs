//! Totems Level - Persisted personality state

pub mod persistence;

pub use persistence::{
    deep_merge, load_state, save_state, FileStateStore, MemoryStateStore, StateStore,
};
