//! Store adapter contract and in-process reference implementation the
//! matching engine's host uses to load/save state and surface priority
//! queues (§6.2).

pub mod error;
pub mod store;

pub use error::PersistenceError;
pub use store::{
    EngineStateSnapshot, EngineStore, InMemoryEngineStore, SaveEngineStateInput, SyncPersonasResult,
};
