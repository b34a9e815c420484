//! Metadata search over installed libraries.
//!
//! Every library built with metadata enabled gets a JSON sidecar,
//! `lib<base>.json`, installed next to it. Before generating a transform, a
//! solver asks [`search`] whether any installed library already exports a
//! function with the same signature, possibly under a different base name.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use spiral_core::{
    Options, Transform,
    metadata::{BuildInfo, FunctionNames, Metadata, Query, TransformMetadata},
};
use thiserror::Error;

/// Errors that can occur while reading or writing metadata files.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read library directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write metadata file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot serialize metadata")]
    Serialize(#[from] serde_json::Error),
}

/// A library exporting a function that matches a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub library: PathBuf,
    pub names: FunctionNames,
}

/// Returns the platform file name of the library for `base`.
#[must_use]
pub fn library_file_name(base: &str) -> String {
    let (prefix, ext) = if cfg!(target_os = "windows") {
        ("", "dll")
    } else if cfg!(target_os = "macos") {
        ("lib", "dylib")
    } else {
        ("lib", "so")
    };
    format!("{prefix}{base}.{ext}")
}

/// Returns the path of the sidecar describing the library for `base`.
#[must_use]
pub fn sidecar_path(libs_dir: &Path, base: &str) -> PathBuf {
    libs_dir.join(format!("lib{base}.json"))
}

/// Builds the metadata record of a transform built under `options`.
pub fn build_metadata<T: Transform>(
    transform: &T,
    options: &Options,
    names: FunctionNames,
) -> Metadata {
    let generator = options
        .toolchain
        .generator
        .first()
        .map_or("", String::as_str);
    Metadata::single(
        BuildInfo::current(generator),
        TransformMetadata::new(Query::for_transform(transform, options), names),
    )
}

/// Scans the sidecars in `libs_dir` for a transform matching `query`.
///
/// Sidecars are visited in file name order; the first usable match wins.
/// Sidecars that cannot be read or parsed, or whose library is missing, are
/// skipped. A missing `libs_dir` yields no match.
///
/// # Errors
///
/// Returns an error if `libs_dir` exists but cannot be listed.
pub fn search(libs_dir: &Path, query: &Query) -> Result<Option<Found>, RegistryError> {
    let entries = match fs::read_dir(libs_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(RegistryError::ReadDir {
                path: libs_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut sidecars: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_sidecar(path))
        .collect();
    sidecars.sort();

    for sidecar in sidecars {
        let Some(base) = sidecar_base(&sidecar) else {
            continue;
        };
        let library = libs_dir.join(library_file_name(base));
        if !library.exists() {
            log::debug!("skipping {}: no library", sidecar.display());
            continue;
        }

        let metadata = match read_sidecar(&sidecar) {
            Ok(metadata) => metadata,
            Err(reason) => {
                log::warn!("skipping metadata file {}: {reason}", sidecar.display());
                continue;
            }
        };

        if let Some(entry) = metadata.find(query) {
            log::debug!("found matching transform in {}", library.display());
            return Ok(Some(Found {
                library,
                names: entry.names.clone(),
            }));
        }
    }

    Ok(None)
}

/// Installs the sidecar of the library for `base`.
///
/// The file is written under a temporary name and renamed into place, so a
/// concurrent [`search`] never sees a partial record.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized or written.
pub fn write_sidecar(
    libs_dir: &Path,
    base: &str,
    metadata: &Metadata,
) -> Result<PathBuf, RegistryError> {
    let path = sidecar_path(libs_dir, base);
    let staging = libs_dir.join(format!(".lib{base}.json.{}", std::process::id()));
    let json = serde_json::to_string_pretty(metadata)?;

    fs::write(&staging, json)
        .and_then(|()| fs::rename(&staging, &path))
        .map_err(|source| {
            let _ = fs::remove_file(&staging);
            RegistryError::Write {
                path: path.clone(),
                source,
            }
        })?;

    Ok(path)
}

/// Writes `<base>_meta.c`, which embeds the record in the built library.
///
/// The file defines `<base>_metadata`, the record as a JSON string, and an
/// accessor `<base>_get_metadata()`.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized or written.
pub fn write_metadata_source(
    dir: &Path,
    base: &str,
    metadata: &Metadata,
) -> Result<PathBuf, RegistryError> {
    let path = dir.join(format!("{base}_meta.c"));
    let json = serde_json::to_string(metadata)?;
    let source = format!(
        "/* metadata for {base} */\n\n\
         const char {base}_metadata[] = \"{}\";\n\n\
         const char *{base}_get_metadata(void)\n\
         {{\n    return {base}_metadata;\n}}\n",
        escape_c(&json)
    );

    fs::write(&path, source).map_err(|source| RegistryError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn is_sidecar(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json") && sidecar_base(path).is_some()
}

/// `lib<base>.json` -> `<base>`
fn sidecar_base(path: &Path) -> Option<&str> {
    path.file_stem()?.to_str()?.strip_prefix("lib")
}

fn read_sidecar(path: &Path) -> Result<Metadata, String> {
    let text = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&text).map_err(|err| err.to_string())
}

fn escape_c(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
