//! # PhotoCap Store
//!
//! Per-user profiles and media uploads on top of PhotoCap Auth.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     PHOTOCAP API                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │  ACCOUNTS   │  │  PROFILES   │  │  UPLOADS        │  │
//! │  │  + SESSION  │  │  flat JSON  │  │  + sidecars     │  │
//! │  └──────┬──────┘  └──────┬──────┘  └────────┬────────┘  │
//! │         │                │                   │           │
//! │  ┌──────┴───────┐  ┌─────┴───────────────────┴────────┐ │
//! │  │ PHOTOCAP AUTH│  │          USER DATA STORE          │ │
//! │  │ (credentials)│  │   users/<mobile>/{profile,uploads}│ │
//! │  └──────────────┘  └───────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Model
//!
//! - Upload names are `<mobile>_<YYYYMMDD>_<N>.<ext>`, N per user per day
//! - An existing upload is never overwritten
//! - Listings rescan the directory; there is no index to drift
//! - JSON documents are written through the atomic writer

pub mod api;
pub mod error;
pub mod housekeeping;
pub mod media;
pub mod profile;
pub mod sidecar;
pub mod store;
pub mod uploads;

pub use api::{ApiConfig, PhotoCapApi};
pub use error::{StoreError, StoreResult};
pub use housekeeping::{prune_capture_temp_files, StorageUsage};
pub use media::MediaType;
pub use profile::Profile;
pub use sidecar::UploadSidecar;
pub use store::UserDataStore;
pub use uploads::UploadRecord;

/// PhotoCap Store version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
