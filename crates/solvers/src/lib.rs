//! Runtime side of spiral solvers.
//!
//! A [`Solver`] binds a [`Transform`] to a generated library: it finds or
//! builds the library, loads it, and initializes it. [`Solver::solve`] then
//! checks the caller's buffers against the generated function, runs it, and
//! normalizes the result.
//!
//! ```no_run
//! use spiral_core::{Options, transforms::Mdrconv};
//! use spiral_solvers::Solver;
//!
//! let solver = Solver::new(Mdrconv::new([32, 32, 32])?, Options::from_env())?;
//!
//! let src = vec![0.0_f64; 32 * 32 * 32];
//! let sym = vec![0.0_f64; 2 * 32 * 32 * 17];
//! let mut dst = vec![0.0_f64; 32 * 32 * 32];
//! solver.solve(&mut dst, &src, Some(&sym))?;
//! # Ok::<(), spiral_solvers::Error>(())
//! ```
//!
//! [`Transform`]: spiral_core::Transform

mod buffer;
mod error;
mod invoke;
mod library;
mod solver;

pub use buffer::{Buffer, DeviceBuffer, DeviceScale, Domain, Element};
pub use error::Error;
pub use invoke::{InvokeError, Invoker};
pub use library::{
    DestroyFn, EntryPoints, ExecFn, InitFn, LoadError, LoadedLibrary, Session, SourceFn, SymbolFn,
};
pub use solver::Solver;
