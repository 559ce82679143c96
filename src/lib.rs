//! Self-updater for packages published as GitHub Releases.
//!
//! [`UpdateOrchestrator`] is the entry point: build it with a
//! [`PackageInfo`] and a set of [`Collaborators`], then forward the user's
//! actions to it.

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod release;
pub mod staging;
pub mod types;
pub mod ui;
pub mod updater;
pub mod version;


pub use error::{InstallError, UpdateError};
pub use install::{InstallReport, InstallationReplacer};
pub use release::{ReleaseClient, ReleaseEndpoint};
pub use types::{PackageInfo, ReleaseAsset, ReleaseMetadata, UpdaterSettings};
pub use updater::{Collaborators, CompletionCallback, UpdateOrchestrator, UpdateState};
pub use version::is_newer;
