//! Resolution of logical asset names to retrievable locations.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::discovery::{
    default_library_candidates, discover_default_dicdir, discover_default_library_path,
    discover_user_dictionary,
};
use crate::error::{MecabError, Result};

/// Logical assets the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Engine shared library. Required.
    EngineBinary,
    /// System dictionary / model directory. Optional.
    DataBlob,
    /// User dictionary file. Optional.
    UserDictionary,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetKind::EngineBinary => "engine binary",
            AssetKind::DataBlob => "data blob",
            AssetKind::UserDictionary => "user dictionary",
        })
    }
}

/// Where an asset can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local filesystem path or a bare library name for the platform loader.
    Local(PathBuf),
    /// Network address. Fetching it is the locator's job, not the engine's.
    Remote(String),
}

impl Location {
    /// Shorthand for [`Location::Local`].
    pub fn local(path: impl AsRef<Path>) -> Self {
        Location::Local(path.as_ref().to_path_buf())
    }

    /// Shorthand for [`Location::Remote`].
    pub fn remote(url: impl Into<String>) -> Self {
        Location::Remote(url.into())
    }

    /// Returns the path of a local location.
    pub fn local_path(&self) -> Result<&Path> {
        match self {
            Location::Local(path) => Ok(path),
            Location::Remote(url) => Err(MecabError::LoadFailure(format!(
                "remote location {url} must be fetched before it can be used"
            ))),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => f.write_str(url),
        }
    }
}

/// Maps an [`AssetKind`] to a [`Location`].
///
/// `Ok(None)` means the asset is not provided; that is only an error for
/// [`AssetKind::EngineBinary`].
#[async_trait]
pub trait ResourceLocator: Send + Sync {
    /// Resolves one asset.
    async fn resolve(&self, asset: AssetKind) -> Result<Option<Location>>;
}

/// Locator backed by environment variables and well-known platform paths.
///
/// - `MECAB_LIBRARY_PATH`: engine shared library.
/// - `MECAB_DICDIR`: system dictionary directory.
/// - `MECAB_USERDIC`: user dictionary file.
///
/// Without `MECAB_LIBRARY_PATH` or a local copy, the first bare library name
/// is returned so the platform loader's search path applies. Without a
/// dictionary directory the engine falls back to its own `mecabrc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResourceLocator;

#[async_trait]
impl ResourceLocator for LocalResourceLocator {
    async fn resolve(&self, asset: AssetKind) -> Result<Option<Location>> {
        let path = match asset {
            AssetKind::EngineBinary => discover_default_library_path().or_else(|| {
                default_library_candidates()
                    .first()
                    .map(|name| PathBuf::from(*name))
            }),
            AssetKind::DataBlob => discover_default_dicdir(),
            AssetKind::UserDictionary => discover_user_dictionary(),
        };
        Ok(path.map(Location::Local))
    }
}

/// Locator over a fixed, preloaded set of locations.
#[derive(Debug, Clone, Default)]
pub struct StaticResourceLocator {
    locations: HashMap<AssetKind, Location>,
}

impl StaticResourceLocator {
    /// Creates an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a location for one asset.
    pub fn with(mut self, asset: AssetKind, location: Location) -> Self {
        self.locations.insert(asset, location);
        self
    }
}

#[async_trait]
impl ResourceLocator for StaticResourceLocator {
    async fn resolve(&self, asset: AssetKind) -> Result<Option<Location>> {
        Ok(self.locations.get(&asset).cloned())
    }
}
