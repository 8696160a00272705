//! Core library for Sopdrop: config, registry client, cache, version
//! resolution, security gate. Used by the CLI binary and the host
//! integration layer.

pub mod asset_ref;
pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod host;
pub mod http_client;
pub mod install;
pub mod log;
pub mod package;
pub mod paths;
pub mod registry;

// Re-export the main API for the CLI and host-side tooling.
pub use asset_ref::{AssetRef, AssetSlug, VersionSpec};
pub use cache::{AssetCache, CacheStatus, CachedAsset};
pub use config::Config;
pub use error::{Result, SopdropError};
pub use gate::{GateDecision, GateReport};
pub use host::HostAdapter;
pub use install::{
    code_listing, copy, deliver, install, package_report, paste, preview_report, InstalledAsset,
    PasteOptions, PasteOutcome,
};
pub use log::{log, log_error};
pub use package::{AssetKind, Package, PackageMetadata};
pub use registry::{
    Asset, AssetPayload, AssetSummary, AssetVersion, Owner, PublishManifest, PublishedAsset,
    RegistryClient, User,
};
