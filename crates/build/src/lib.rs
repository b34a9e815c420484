//! Script emission, metadata search, and build orchestration for spiral solvers.
//!
//! - [`script`] — renders a traced [`Composition`] as a generator script
//! - [`registry`] — reads and writes the metadata sidecars of installed
//!   libraries
//! - [`toolchain`] — runs the generator and the native build tool
//! - [`Builder`] — drives one transform from tracing to an installed library
//!
//! [`Composition`]: spiral_core::Composition

mod build_dir;
mod builder;
mod error;
mod lock;
pub mod registry;
pub mod script;
pub mod toolchain;

pub use build_dir::BuildDir;
pub use builder::{Action, BuildState, Builder, Event};
pub use error::BuildError;
pub use lock::InstallLock;
pub use registry::{Found, RegistryError};
pub use script::ScriptConfig;

#[cfg(test)]
pub(crate) mod test_utils;
