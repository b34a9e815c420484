use std::{
    fs,
    path::{Path, PathBuf},
};

use spiral_build::{Builder, registry};
use spiral_core::{
    Options, Transform,
    metadata::{FunctionNames, Query},
};

use crate::{Buffer, Error, InvokeError, Invoker, LoadedLibrary, Session};

/// A transform bound to its generated, loaded, and initialized library.
///
/// Construction finds a library for the transform, in order:
///
/// 1. `lib<base>` in the library directory
/// 2. any installed library whose metadata describes the same function
/// 3. a fresh build of `lib<base>`
///
/// and then loads and initializes it. Any failure aborts construction, so a
/// `Solver` always holds an initialized library. Dropping it calls the
/// library's destroy function, if it has one.
#[derive(Debug)]
pub struct Solver<T> {
    transform: T,
    options: Options,
    base: String,
    invoker: Invoker,
    // Declared before `library` so destroy runs while the library is loaded.
    session: Session,
    library: LoadedLibrary,
}

impl<T: Transform> Solver<T> {
    /// Creates a solver for `transform` under `options`.
    ///
    /// Environment toggles are applied to `options` first (see
    /// [`Options::apply_env`]), then the transform may adjust them; see
    /// [`Transform::configure`].
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid, or if no library can be
    /// found, built, loaded, or initialized.
    pub fn new(transform: T, options: Options) -> Result<Self, Error> {
        let options = transform.configure(options.apply_env());
        options.validate()?;

        let base = base_name(&transform, &options);
        let libs_dir = options.resolved_libs_dir();
        fs::create_dir_all(&libs_dir).map_err(|source| Error::LibsDir {
            path: libs_dir.clone(),
            source,
        })?;

        let (path, names) = locate(&transform, &options, &base, &libs_dir)?;
        let library = LoadedLibrary::open(&path, &names, transform.operands())?;
        // SAFETY: `library` is stored alongside the session and dropped after it.
        let session = unsafe { Session::start(library.entries()) };
        let invoker = Invoker::new(&transform, &options);

        Ok(Self {
            transform,
            options,
            base,
            invoker,
            session,
            library,
        })
    }

    /// Runs the generated function and normalizes the result.
    ///
    /// `sym` must be given exactly when the transform takes a symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers do not fit the generated function. No
    /// buffer is accessed in that case.
    pub fn solve<D, S>(&self, dst: &mut D, src: &S, sym: Option<&S>) -> Result<(), InvokeError>
    where
        D: Buffer + ?Sized,
        S: Buffer + ?Sized,
    {
        // SAFETY: the session keeps the library loaded, and the library was
        // generated for, or matched against, this transform.
        unsafe { self.invoker.invoke(self.session.exec(), dst, src, sym) }
    }

    #[must_use]
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Returns the options after [`Transform::configure`].
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns the platform-specific base name, e.g. `dMdrconv_4x4x4_cu`.
    #[must_use]
    pub fn name_base(&self) -> &str {
        &self.base
    }

    /// Returns the names of the functions in use, which come from metadata
    /// when an existing library was matched.
    #[must_use]
    pub fn names(&self) -> &FunctionNames {
        self.library.names()
    }

    #[must_use]
    pub fn library_path(&self) -> &Path {
        self.library.path()
    }
}

fn base_name<T: Transform>(transform: &T, options: &Options) -> String {
    format!(
        "{}{}",
        transform.name_base(options.precision),
        options.platform.name_suffix()
    )
}

fn locate<T: Transform>(
    transform: &T,
    options: &Options,
    base: &str,
    libs_dir: &Path,
) -> Result<(PathBuf, FunctionNames), Error> {
    let specific = libs_dir.join(registry::library_file_name(base));
    if specific.exists() {
        log::debug!("using {}", specific.display());
        return Ok((specific, FunctionNames::for_base(base)));
    }

    let query = Query::for_transform(transform, options);
    if let Some(found) = registry::search(libs_dir, &query)? {
        log::debug!("{} provides {base}", found.library.display());
        return Ok((found.library, found.names));
    }

    log::debug!("no library provides {base}; building it");
    let library = Builder::new(transform, options, base, libs_dir).run_unobserved()?;
    Ok((library, FunctionNames::for_base(base)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use spiral_build::BuildDir;
    use spiral_core::{
        Platform, Precision,
        transforms::{Hockney, Mdrconv},
    };

    use crate::LoadError;

    fn scratch(name: &str) -> BuildDir {
        BuildDir::create(Some(&std::env::temp_dir()), name, false).unwrap()
    }

    #[test]
    fn base_names_carry_precision_and_platform() {
        let conv = Mdrconv::new([4, 4, 8]).unwrap();
        let cuda = Options {
            platform: Platform::Cuda,
            ..Options::default()
        };
        let hip_single = Options {
            platform: Platform::Hip,
            precision: Precision::Single,
            ..Options::default()
        };

        assert_eq!(base_name(&conv, &Options::default()), "dMdrconv_4x4x8");
        assert_eq!(base_name(&conv, &cuda), "dMdrconv_4x4x8_cu");
        assert_eq!(base_name(&conv, &hip_single), "fMdrconv_4x4x8_hip");
    }

    #[test]
    fn specific_library_wins() {
        let scratch = scratch("locate-specific");
        let libs = scratch.path();
        let conv = Mdrconv::new([4, 4, 4]).unwrap();
        let path = libs.join(registry::library_file_name("dMdrconv_4x4x4"));
        fs::write(&path, b"").unwrap();

        let (found, names) = locate(&conv, &Options::default(), "dMdrconv_4x4x4", libs).unwrap();

        assert_eq!(found, path);
        assert_eq!(names, FunctionNames::for_base("dMdrconv_4x4x4"));
    }

    #[test]
    fn matching_metadata_supplies_names() {
        let scratch = scratch("locate-metadata");
        let libs = scratch.path();
        let hockney = Hockney::new(8, 4, 3).unwrap();
        let options = Options::default();
        let names = FunctionNames {
            exec: Some("poisson".to_string()),
            init: Some("init_poisson".to_string()),
            destroy: None,
        };
        let metadata = registry::build_metadata(&hockney, &options, names.clone());
        registry::write_sidecar(libs, "bundle", &metadata).unwrap();
        let bundle = libs.join(registry::library_file_name("bundle"));
        fs::write(&bundle, b"").unwrap();

        let (found, found_names) = locate(&hockney, &options, "dHockney_8_4_3", libs).unwrap();

        assert_eq!(found, bundle);
        assert_eq!(found_names, names);
    }

    #[test]
    fn unloadable_library_aborts_construction() {
        let scratch = scratch("solver-unloadable");
        let libs = scratch.path();
        let conv = Mdrconv::new([4, 4, 4]).unwrap();
        fs::write(libs.join(registry::library_file_name("dMdrconv_4x4x4")), b"not a library")
            .unwrap();
        let options = Options {
            libs_dir: Some(libs.to_path_buf()),
            ..Options::default()
        };

        let err = Solver::new(conv, options).unwrap_err();

        assert!(matches!(err, Error::Load(LoadError::Open { .. })));
    }

    #[test]
    fn invalid_options_are_rejected_first() {
        let scratch = scratch("solver-invalid");
        let conv = Mdrconv::new([4, 4, 4]).unwrap();
        let mut options = Options {
            libs_dir: Some(scratch.path().to_path_buf()),
            ..Options::default()
        };
        options.toolchain.generator.clear();

        let err = Solver::new(conv, options).unwrap_err();

        assert!(matches!(err, Error::Options(_)));
    }
}
