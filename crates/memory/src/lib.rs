//! Memory subsystem for Waypoint.
//!
//! Three services share one persistent store:
//! - [`SessionManager`] — durable conversation identity and bounded history
//! - [`ConversationMemory`] — embedding-indexed summaries with semantic recall
//! - [`PreferenceService`] — merged per-category user preferences
//!
//! Backends: [`SqliteStore`] (production) and [`InMemoryStore`] (tests).

pub mod in_memory;
pub mod preferences;
pub mod recall;
pub mod session;
pub mod sqlite;
pub mod vector;

pub use in_memory::InMemoryStore;
pub use preferences::{extract_preferences, PreferenceService};
pub use recall::ConversationMemory;
pub use session::SessionManager;
pub use sqlite::SqliteStore;
