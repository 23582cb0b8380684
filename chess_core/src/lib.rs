//! Chess session engine: game bookkeeping, computer opponent search, the
//! background move coordinator, and the coalescing save writer.

pub mod coordinator;
pub mod engine;
pub mod logic;
pub mod persistence;
pub mod settings;
