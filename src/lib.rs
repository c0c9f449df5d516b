#![deny(missing_docs)]

//! Async client for the MeCab morphological analyzer C API.
//!
//! The crate owns one shared engine instance, brings it up with a
//! retrying background loader, serializes queries against it, and decodes
//! MeCab's line-oriented output into [`Token`] records.
//!
//! ## Quick Start
//! ```no_run
//! use mecab_rs::{Mecab, MecabConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mecab = Mecab::native(MecabConfig::default())?;
//!     mecab.start();
//!     mecab.wait_ready().await?;
//!
//!     let result = mecab.analyze("すもももももももものうち").await?;
//!     for token in &result.recognized {
//!         println!("{}\t{}", token.surface, token.part_of_speech());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle
//! [`Mecab::start`] spawns the loader, which resolves assets through a
//! [`ResourceLocator`], loads the engine binary and creates an instance.
//! Failed attempts are retried after [`RetryPolicy::delay`], forever unless
//! [`RetryPolicy::max_attempts`] is set. Queries issued before the engine is
//! ready fail with [`MecabError::NotReady`]; use [`Mecab::wait_ready`] or a
//! [`ReadinessGate`] to wait instead.
//!
//! ## Output Rules
//! - Lines without a tab never fail a query. Lines matching
//!   [`DecoderOptions::foreign_pattern`] become tokens tagged
//!   [`FOREIGN_PART_OF_SPEECH`]; all others land in
//!   [`QueryResult::unrecognized`].
//! - Missing or empty feature fields are filled with [`UNKNOWN_FEATURE`];
//!   a missing dictionary form falls back to the surface.
//! - An empty engine result reports the whole input as unrecognized.
//!
//! ## Environment Variables
//! Read only by [`LocalResourceLocator`]:
//! - `MECAB_LIBRARY_PATH`: explicit dynamic library path.
//! - `MECAB_DICDIR`: system dictionary directory.
//! - `MECAB_USERDIC`: user dictionary file.

mod binding;
mod config;
mod constants;
mod decoder;
mod discovery;
mod error;
mod gate;
mod lifecycle;
mod locator;
mod model;
mod native;
mod pipeline;
mod runtime;
mod types;

pub use binding::{EngineAssets, EngineBinding, InstanceHandle};
pub use constants::*;
pub use decoder::{decode, DecoderOptions, OutputDecoder};
pub use error::{MecabError, Result};
pub use gate::ReadinessGate;
pub use lifecycle::{EngineLifecycle, EngineState, EngineStatus, LifecycleEvent};
pub use locator::{
    AssetKind, LocalResourceLocator, Location, ResourceLocator, StaticResourceLocator,
};
pub use model::{Feature, QueryResult, Token};
pub use native::NativeEngine;
pub use pipeline::QueryPipeline;
pub use runtime::Mecab;
pub use types::{BufferPolicy, MecabConfig, RetryPolicy};

#[cfg(test)]
mod test_support;
