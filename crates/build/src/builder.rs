//! Build orchestration: trace, emit, generate, compile, install.
//!
//! A [`Builder`] walks one transform through a fixed sequence of states:
//!
//! ```text
//! Idle -> Tracing -> ScriptWritten -> Generated -> Compiled -> Installed
//!                 \_____________________________________________/
//!                                        |
//!                                      Failed
//! ```
//!
//! Any step error moves the builder to [`BuildState::Failed`] and is returned
//! to the caller. The temporary build directory is removed on every path
//! unless `keep_temp` is set.
//!
//! # Observer Events
//!
//! The builder emits one [`Event`] after each step completes. Observers can
//! return [`Action::Abort`] to stop before the next step, for example to
//! inspect a script without running the generator.
//!
//! # Concurrent builds
//!
//! Builds of different base names never collide: each gets its own uniquely
//! named build directory. Builds of the same base name, from this or other
//! processes, are serialized by an [`InstallLock`]; a build that acquires the
//! lock after another one installed the library returns that library.

use std::{
    any::type_name,
    path::{Path, PathBuf},
};

use spiral_core::{
    Composition, Observer, Options, Transform, metadata::FunctionNames, trace,
};

use crate::{
    BuildDir, BuildError, InstallLock, ScriptConfig,
    registry::{self, library_file_name},
    script, toolchain,
};

/// States of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    Idle,
    Tracing,
    ScriptWritten,
    Generated,
    Compiled,
    Installed,
    Failed,
}

/// Progress event emitted after each build step.
#[derive(Debug)]
pub enum Event<'a> {
    /// The reference pipeline was traced.
    Traced { composition: &'a Composition },
    /// The generator script was written.
    ScriptWritten { path: &'a Path, script: &'a str },
    /// The generator produced its source file.
    Generated { source: &'a Path },
    /// The build tool configured and compiled the library.
    Compiled,
    /// The library was installed.
    Installed { library: &'a Path },
}

impl Event<'_> {
    /// Returns the state the builder reached when emitting this event.
    #[must_use]
    pub fn state(&self) -> BuildState {
        match self {
            Event::Traced { .. } => BuildState::Tracing,
            Event::ScriptWritten { .. } => BuildState::ScriptWritten,
            Event::Generated { .. } => BuildState::Generated,
            Event::Compiled => BuildState::Compiled,
            Event::Installed { .. } => BuildState::Installed,
        }
    }
}

/// Control actions supported by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop before the next step.
    Abort,
}

/// Generates, compiles, and installs the library of one transform.
pub struct Builder<'a, T> {
    transform: &'a T,
    options: &'a Options,
    base: String,
    libs_dir: PathBuf,
    state: BuildState,
}

impl<'a, T: Transform> Builder<'a, T> {
    /// Creates a builder installing `lib<base>` into `libs_dir`.
    pub fn new(
        transform: &'a T,
        options: &'a Options,
        base: impl Into<String>,
        libs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transform,
            options,
            base: base.into(),
            libs_dir: libs_dir.into(),
            state: BuildState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the path the library is installed at.
    #[must_use]
    pub fn library_path(&self) -> PathBuf {
        self.libs_dir.join(library_file_name(&self.base))
    }

    /// Runs the build without observation.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    pub fn run_unobserved(&mut self) -> Result<PathBuf, BuildError> {
        self.run(())
    }

    /// Runs the build, reporting each completed step to `observer`.
    ///
    /// Returns the path of the installed library.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails or the observer aborts the build.
    pub fn run<Obs>(&mut self, mut observer: Obs) -> Result<PathBuf, BuildError>
    where
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        let result = self.steps(&mut observer);
        if let Err(err) = &result {
            log::debug!("build of {} failed: {err}", self.base);
            self.enter(BuildState::Failed);
        }
        result
    }

    fn steps<Obs>(&mut self, observer: &mut Obs) -> Result<PathBuf, BuildError>
    where
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        let _lock = InstallLock::acquire(&self.libs_dir, &self.base)?;
        let library = self.library_path();
        if library.exists() {
            log::info!("{} was installed by a concurrent build", library.display());
            self.enter(BuildState::Installed);
            return Ok(library);
        }

        let names = FunctionNames::for_base(&self.base);
        let metadata = registry::build_metadata(self.transform, self.options, names);

        self.enter(BuildState::Tracing);
        let composition = trace::trace(self.transform)?;
        self.notify(observer, &Event::Traced {
            composition: &composition,
        })?;

        let dir = BuildDir::create(
            self.options.work_dir.as_deref(),
            &self.base,
            self.options.keep_temp,
        )
        .map_err(BuildError::WorkDir)?;

        let config = ScriptConfig::new(&self.base, short_type_name::<T>(), self.options);
        let text = script::emit(&composition, &config);
        let script_path = dir.path().join(format!("{}.g", self.base));
        script::write_script(&script_path, &text).map_err(|source| BuildError::Script {
            path: script_path.clone(),
            source,
        })?;
        self.enter(BuildState::ScriptWritten);
        self.notify(observer, &Event::ScriptWritten {
            path: &script_path,
            script: &text,
        })?;

        log::info!("Generating {}", self.options.platform.language());
        toolchain::generate(&self.options.toolchain, dir.path(), &script_path)?;
        if self.options.include_metadata {
            registry::write_metadata_source(dir.path(), &self.base, &metadata)?;
        }
        self.enter(BuildState::Generated);
        self.notify(observer, &Event::Generated {
            source: &dir.path().join(config.source_file()),
        })?;

        log::info!("Compiling and linking");
        let defines = toolchain::cmake_defines(&self.base, self.options, &self.libs_dir);
        toolchain::compile(&self.options.toolchain, dir.path(), &defines)?;
        self.enter(BuildState::Compiled);
        self.notify(observer, &Event::Compiled)?;

        toolchain::install(&self.options.toolchain, dir.path())?;
        if !library.exists() {
            return Err(BuildError::MissingLibrary { path: library });
        }
        if self.options.include_metadata {
            registry::write_sidecar(&self.libs_dir, &self.base, &metadata)?;
        }
        self.enter(BuildState::Installed);
        self.notify(observer, &Event::Installed { library: &library })?;

        Ok(library)
    }

    fn enter(&mut self, state: BuildState) {
        log::debug!("build {}: {:?} -> {:?}", self.base, self.state, state);
        self.state = state;
    }

    fn notify<Obs>(&self, observer: &mut Obs, event: &Event<'_>) -> Result<(), BuildError>
    where
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        match observer.observe(event) {
            Some(Action::Abort) => Err(BuildError::Aborted { state: self.state }),
            None => Ok(()),
        }
    }
}

/// `spiral_core::transforms::Mdrconv` -> `Mdrconv`
fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
