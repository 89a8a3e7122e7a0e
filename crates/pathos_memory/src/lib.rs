//! Memory and conversation state.
//!
//! - `store`: short-term FIFO + long-term salience store
//! - `session`: the owned per-conversation state object
//! - `coordinator`: pure turn planning over a session
//! - `persistence`: the snapshot collaborator (in-memory, SQLite)

pub mod coordinator;
pub mod importance;
pub mod persistence;
pub mod record;
pub mod session;
pub mod store;

pub use coordinator::{PreparedTurn, TurnPlanner};
pub use importance::{score_importance, summarise};
pub use persistence::{
    open_store, InMemorySessionStore, PersistenceError, SessionStore, SqliteSessionStore,
};
pub use record::{MemoryRecord, MemoryTier, RecalledMemory};
pub use session::{Session, StateSample};
pub use store::{ConsolidationReport, MemorySystem};
