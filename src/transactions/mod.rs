//! Pre-made transactions over downloaded artifacts.

mod download_artifact;
mod extract_archive;
mod extract_frameworks;
mod extract_tarball;
mod install_frameworks;

pub use download_artifact::*;
pub use extract_archive::*;
pub use extract_frameworks::*;
pub use extract_tarball::*;
pub use install_frameworks::*;
