use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static COUNTER: AtomicU64 = AtomicU64::new(0);

const MAX_ATTEMPTS: u32 = 16;

/// A uniquely named temporary directory holding one build.
///
/// The directory is created as `<parent>/<base>_<suffix>` and removed when
/// the value is dropped, on success and failure paths alike, unless it was
/// created with `keep` set. The process working directory is left alone:
/// external tools are started with this directory as their own working
/// directory instead.
#[derive(Debug)]
pub struct BuildDir {
    path: PathBuf,
    keep: bool,
}

impl BuildDir {
    /// Creates a build directory for `base` under `parent`.
    ///
    /// When `parent` is `None`, or does not name an existing directory, the
    /// current directory is used instead; the latter case logs a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined or the
    /// directory cannot be created.
    pub fn create(parent: Option<&Path>, base: &str, keep: bool) -> io::Result<Self> {
        let parent = resolve_parent(parent)?;

        let mut attempt = 0;
        loop {
            let path = parent.join(format!("{base}_{}", unique_suffix()));
            match fs::create_dir(&path) {
                Ok(()) => {
                    log::debug!("created build directory {}", path.display());
                    return Ok(Self { path, keep });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_ATTEMPTS => {
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn keeps(&self) -> bool {
        self.keep
    }
}

impl Drop for BuildDir {
    fn drop(&mut self) {
        if self.keep {
            log::info!("keeping build directory {}", self.path.display());
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.path) {
            log::warn!(
                "failed to remove build directory {}: {err}",
                self.path.display()
            );
        }
    }
}

fn resolve_parent(parent: Option<&Path>) -> io::Result<PathBuf> {
    match parent {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        Some(dir) => {
            log::warn!(
                "could not find workdir \"{}\", using current directory",
                dir.display()
            );
            env::current_dir()
        }
        None => env::current_dir(),
    }
}

/// `<pid>_<nanos>_<counter>`, hex encoded.
fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.subsec_nanos());
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}{nanos:08x}{count:x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::scratch_dir;

    #[test]
    fn removed_on_drop() {
        let parent = scratch_dir("build-dir-drop");
        let path = {
            let dir = BuildDir::create(Some(&parent), "dMdrconv_4x4x4", false).unwrap();
            assert!(dir.path().is_dir());
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn kept_when_requested() {
        let parent = scratch_dir("build-dir-keep");
        let path = {
            let dir = BuildDir::create(Some(&parent), "dMdrconv_4x4x4", true).unwrap();
            dir.path().to_path_buf()
        };
        assert!(path.is_dir());
    }

    #[test]
    fn names_are_unique_and_prefixed() {
        let parent = scratch_dir("build-dir-unique");
        let a = BuildDir::create(Some(&parent), "conv", false).unwrap();
        let b = BuildDir::create(Some(&parent), "conv", false).unwrap();

        assert_ne!(a.path(), b.path());
        for dir in [&a, &b] {
            let name = dir.path().file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with("conv_"), "{name}");
            assert_eq!(dir.path().parent(), Some(parent.as_path()));
        }
    }

    #[test]
    fn missing_parent_falls_back_to_current_dir() {
        let missing = scratch_dir("build-dir-missing").join("nope");
        let dir = BuildDir::create(Some(&missing), "fallback", false).unwrap();

        assert_eq!(dir.path().parent(), Some(env::current_dir().unwrap().as_path()));
    }
}
