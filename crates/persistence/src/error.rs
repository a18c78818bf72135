use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("engine lock is held by another tick")]
    LockHeld,

    #[error("no engine state has been saved yet")]
    NoState,

    #[error("store backend error: {0}")]
    Backend(String),
}
