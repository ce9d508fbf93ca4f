//! # Library Crate
//!
//! Media library domain types and the boundary to the host that owns them.
//!
//! ## Main Components
//!
//! - **types**: items, users, per-user play state, people, collections
//! - **adapter**: the [`LibraryAdapter`] trait the host implements
//! - **index**: [`LibraryIndex`], an in-memory adapter implementation
//! - **parser**: JSON snapshot loading into a `LibraryIndex`
//! - **error**: error types for lookups and loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use library::{LibraryAdapter, LibraryIndex, ItemKind};
//! use std::path::Path;
//!
//! let index = LibraryIndex::load_from_file(Path::new("library.json"))?;
//! let alice = index.find_user_by_name("alice").unwrap().clone();
//! let movies = index.items_for_user(&alice, &[ItemKind::Movie])?;
//! ```

// Public modules
pub mod adapter;
pub mod error;
pub mod index;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use adapter::LibraryAdapter;
pub use error::{LibraryError, Result};
pub use index::LibraryIndex;
pub use parser::LibrarySnapshot;
pub use types::{
    // Type aliases
    ItemId,
    UserId,
    // Core types
    Collection,
    MediaItem,
    Person,
    User,
    UserData,
    // Enums
    ItemKind,
    PersonRole,
};
