pub mod archive_parser;
pub mod sqlite_store;
pub mod store;

pub use archive_parser::{ArchiveParser, CommandParser};
pub use sqlite_store::SqliteStore;
pub use store::{AncestorGroup, CategoryLookup, LineageLookup, PersistSummary, Store, StoredPerson};
