//! Fetches prebuilt FFmpeg XCFramework bundles from the GitHub Actions artifacts of the latest
//! upstream release.
//!
//! See: [`fetch_latest_frameworks`]

pub mod client;
pub mod env;
pub mod error;
pub mod pipeline;
pub mod release;
pub mod transactions;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use pipeline::fetch_latest_frameworks;
