//! Storage backends for keystore items
//!
//! This module provides two backends behind the `Backend` trait:
//! 1. Disk (one JSON file per item)
//! 2. OS keychain

mod disk;
mod keychain;
mod traits;

pub use disk::DiskBackend;
pub use keychain::{KeychainBackend, DEFAULT_SERVICE as DEFAULT_KEYCHAIN_SERVICE};
pub use traits::{Backend, BackendListing};
