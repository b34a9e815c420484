//! Loading generated libraries and managing their lifetime.
//!
//! A generated library exports three C-linkage entry points:
//!
//! ```text
//! void init_<base>(void);
//! void <base>(void *dst, void *src[, void *sym]);
//! void destroy_<base>(void);
//! ```
//!
//! The init and exec functions are required. The destroy function is
//! optional and resolved once, at load time; its absence is never an error.

use std::{
    ffi::c_void,
    path::{Path, PathBuf},
};

use libloading::Library;
use spiral_core::{Operands, metadata::FunctionNames};
use thiserror::Error;

pub type InitFn = unsafe extern "C" fn();
pub type DestroyFn = unsafe extern "C" fn();
pub type SourceFn = unsafe extern "C" fn(*mut c_void, *mut c_void);
pub type SymbolFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *mut c_void);

/// The main function of a generated library, typed by its arity.
#[derive(Debug, Clone, Copy)]
pub enum ExecFn {
    Source(SourceFn),
    SourceAndSymbol(SymbolFn),
}

impl ExecFn {
    #[must_use]
    pub fn operands(self) -> Operands {
        match self {
            ExecFn::Source(_) => Operands::Source,
            ExecFn::SourceAndSymbol(_) => Operands::SourceAndSymbol,
        }
    }

    /// Calls the function, destination first.
    ///
    /// `sym` is ignored by single-source functions.
    ///
    /// # Safety
    ///
    /// Every pointer must satisfy the generated function's size and type
    /// expectations, and the library it came from must still be loaded.
    pub unsafe fn call(self, dst: *mut c_void, src: *mut c_void, sym: *mut c_void) {
        match self {
            ExecFn::Source(f) => unsafe { f(dst, src) },
            ExecFn::SourceAndSymbol(f) => unsafe { f(dst, src, sym) },
        }
    }
}

/// Resolved entry points of a generated library.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub init: InitFn,
    pub exec: ExecFn,
    pub destroy: Option<DestroyFn>,
}

/// Errors that can occur while loading a generated library.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot load {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("metadata names no {entry} function")]
    Unnamed { entry: &'static str },

    #[error("could not find function: {name}")]
    MissingInit {
        name: String,
        #[source]
        source: libloading::Error,
    },

    #[error("could not find function: {name}")]
    MissingExec {
        name: String,
        #[source]
        source: libloading::Error,
    },
}

/// A generated library kept loaded together with its resolved entry points.
#[derive(Debug)]
pub struct LoadedLibrary {
    path: PathBuf,
    names: FunctionNames,
    entries: EntryPoints,
    _lib: Library,
}

impl LoadedLibrary {
    /// Loads the library at `path` and resolves the functions in `names`.
    ///
    /// The exec function is typed according to `operands`.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be loaded, or if the init or
    /// exec function is unnamed or missing.
    pub fn open(path: &Path, names: &FunctionNames, operands: Operands) -> Result<Self, LoadError> {
        let init_name = names
            .init
            .as_deref()
            .ok_or(LoadError::Unnamed { entry: "init" })?;
        let exec_name = names
            .exec
            .as_deref()
            .ok_or(LoadError::Unnamed { entry: "exec" })?;

        // SAFETY: generated libraries run no initializers beyond the C runtime's.
        let lib = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the generated ABI fixes the signatures of all three functions.
        let init = unsafe { lib.get::<InitFn>(init_name.as_bytes()).map(|symbol| *symbol) }
            .map_err(|source| LoadError::MissingInit {
                name: init_name.to_string(),
                source,
            })?;

        let exec = unsafe {
            match operands {
                Operands::Source => lib
                    .get::<SourceFn>(exec_name.as_bytes())
                    .map(|symbol| ExecFn::Source(*symbol)),
                Operands::SourceAndSymbol => lib
                    .get::<SymbolFn>(exec_name.as_bytes())
                    .map(|symbol| ExecFn::SourceAndSymbol(*symbol)),
            }
        }
        .map_err(|source| LoadError::MissingExec {
            name: exec_name.to_string(),
            source,
        })?;

        let destroy = names.destroy.as_deref().and_then(|name| {
            unsafe { lib.get::<DestroyFn>(name.as_bytes()).map(|symbol| *symbol) }.ok()
        });
        if destroy.is_none() {
            log::debug!("{} exports no destroy function", path.display());
        }

        log::debug!("loaded {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            names: names.clone(),
            entries: EntryPoints {
                init,
                exec,
                destroy,
            },
            _lib: lib,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn names(&self) -> &FunctionNames {
        &self.names
    }

    /// Returns the resolved entry points.
    ///
    /// They are valid only while this library is loaded.
    #[must_use]
    pub fn entries(&self) -> EntryPoints {
        self.entries
    }
}

/// An initialized generated library.
///
/// Creating a session calls init once. Dropping it calls destroy once, if the
/// library exports one. Destroy is only ever reached for a session whose init
/// ran, so a library that failed to load or initialize is never destroyed.
#[derive(Debug)]
pub struct Session {
    entries: EntryPoints,
}

impl Session {
    /// Calls the init function and starts a session.
    ///
    /// # Safety
    ///
    /// The library the entry points came from must stay loaded until the
    /// session is dropped.
    pub unsafe fn start(entries: EntryPoints) -> Self {
        unsafe { (entries.init)() };
        Self { entries }
    }

    #[must_use]
    pub fn exec(&self) -> ExecFn {
        self.entries.exec
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(destroy) = self.entries.destroy else {
            return;
        };
        // SAFETY: `start` requires the library to outlive the session.
        unsafe { destroy() };
        log::debug!("destroyed session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    static INITS: AtomicUsize = AtomicUsize::new(0);
    static DESTROYS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_init() {
        INITS.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn count_destroy() {
        DESTROYS.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn noop() {}

    unsafe extern "C" fn copy(dst: *mut c_void, src: *mut c_void) {
        unsafe { *dst.cast::<f64>() = *src.cast::<f64>() };
    }

    #[test]
    fn session_initializes_and_destroys_once() {
        let entries = EntryPoints {
            init: count_init,
            exec: ExecFn::Source(copy),
            destroy: Some(count_destroy),
        };
        let inits = INITS.load(Ordering::SeqCst);
        let destroys = DESTROYS.load(Ordering::SeqCst);

        let session = unsafe { Session::start(entries) };
        assert_eq!(INITS.load(Ordering::SeqCst), inits + 1);
        assert_eq!(DESTROYS.load(Ordering::SeqCst), destroys);

        drop(session);
        assert_eq!(DESTROYS.load(Ordering::SeqCst), destroys + 1);
    }

    #[test]
    fn teardown_without_destroy_is_silent() {
        let entries = EntryPoints {
            init: noop,
            exec: ExecFn::Source(copy),
            destroy: None,
        };

        let session = unsafe { Session::start(entries) };
        drop(session);
    }

    #[test]
    fn exec_passes_destination_first() {
        let mut dst = 0.0_f64;
        let mut src = 2.5_f64;
        let exec = ExecFn::Source(copy);

        unsafe {
            exec.call(
                (&raw mut dst).cast(),
                (&raw mut src).cast(),
                std::ptr::null_mut(),
            );
        };

        assert_eq!(exec.operands(), Operands::Source);
        assert_eq!(dst, 2.5);
    }

    #[test]
    fn missing_library_is_an_open_error() {
        let names = FunctionNames::for_base("dMdrconv_4x4x4");
        let err = LoadedLibrary::open(
            Path::new("/nonexistent/libdMdrconv_4x4x4.so"),
            &names,
            Operands::SourceAndSymbol,
        )
        .unwrap_err();

        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn unnamed_init_is_rejected_before_loading() {
        let names = FunctionNames {
            init: None,
            ..FunctionNames::for_base("conv")
        };
        let err = LoadedLibrary::open(Path::new("/nonexistent"), &names, Operands::Source)
            .unwrap_err();

        assert!(matches!(err, LoadError::Unnamed { entry: "init" }));
    }

    #[cfg(target_os = "linux")]
    mod libc {
        use super::*;

        const LIBC: &str = "libc.so.6";

        fn names(init: &str, exec: &str, destroy: &str) -> FunctionNames {
            FunctionNames {
                exec: Some(exec.to_string()),
                init: Some(init.to_string()),
                destroy: Some(destroy.to_string()),
            }
        }

        #[test]
        fn optional_destroy_resolves_to_none() {
            let library = LoadedLibrary::open(
                Path::new(LIBC),
                &names("sync", "abs", "destroy_nothing_here"),
                Operands::Source,
            )
            .expect("libc should load");

            assert!(library.entries().destroy.is_none());
            assert_eq!(library.entries().exec.operands(), Operands::Source);
            assert_eq!(library.path(), Path::new(LIBC));
        }

        #[test]
        fn missing_init_fails_before_any_teardown() {
            let err = LoadedLibrary::open(
                Path::new(LIBC),
                &names("init_nothing_here", "abs", "destroy_nothing_here"),
                Operands::Source,
            )
            .unwrap_err();

            match err {
                LoadError::MissingInit { name, .. } => assert_eq!(name, "init_nothing_here"),
                other => panic!("expected missing init, got {other:?}"),
            }
        }

        #[test]
        fn missing_exec_is_fatal() {
            let err = LoadedLibrary::open(
                Path::new(LIBC),
                &names("sync", "exec_nothing_here", "destroy_nothing_here"),
                Operands::SourceAndSymbol,
            )
            .unwrap_err();

            assert!(matches!(err, LoadError::MissingExec { .. }));
        }
    }
}
