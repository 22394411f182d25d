//! keyshelf - Local API key shelf
//!
//! "Keys you can find, secrets that don't linger."
//!
//! Stores named API keys for the services a developer works with in a
//! single JSON document under the home directory, with search, categories
//! and a clipboard copy that scrubs itself after a short delay.
//!
//! Keys are stored in plaintext. The store file is readable only by its
//! owner but is not encrypted.

pub mod catalog;
pub mod clipboard;
pub mod error;
pub mod query;
pub mod record;
pub mod store;

pub use clipboard::{
    ClipboardBackend, ClipboardGuard, MemoryClipboard, SystemClipboard, DEFAULT_CLEAR_DELAY,
};
pub use error::{KeyError, Result};
pub use query::{CategoryFilter, KeyQuery};
pub use record::{mask_secret, KeyRecord, KeyUpdate, NewKey};
pub use store::KeyStore;
