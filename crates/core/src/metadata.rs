//! Records describing the functions exported by a built library.
//!
//! A [`Metadata`] record is embedded in a library when it is built with
//! metadata enabled, and a copy is installed next to the library so later
//! solvers can find it without loading it. A record lists one
//! [`TransformMetadata`] entry per exported transform.

use serde::{Deserialize, Serialize};

use crate::{Direction, Options, Platform, Precision, Transform, TransformKind};

/// Information about the tool that produced a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub package: String,
    pub version: String,
    pub generator: String,
}

impl BuildInfo {
    /// Describes this crate and the given generator command.
    #[must_use]
    pub fn current(generator: &str) -> Self {
        Self {
            package: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generator: generator.to_string(),
        }
    }
}

/// Exported symbol names of one transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy: Option<String>,
}

impl FunctionNames {
    /// Returns the conventional names for a base name:
    /// `<base>`, `init_<base>`, `destroy_<base>`.
    #[must_use]
    pub fn for_base(base: &str) -> Self {
        Self {
            exec: Some(base.to_string()),
            init: Some(format!("init_{base}")),
            destroy: Some(format!("destroy_{base}")),
        }
    }

    /// A record is usable only if it names both the exec and init functions.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.exec.is_some() && self.init.is_some()
    }
}

/// The signature fields a search compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub direction: Direction,
    pub precision: Precision,
    pub transform_type: TransformKind,
    pub dimensions: Vec<usize>,
    pub platform: Platform,
}

impl Query {
    /// Builds the query describing `transform` under `options`.
    pub fn for_transform<T: Transform>(transform: &T, options: &Options) -> Self {
        let problem = transform.problem();
        Self {
            direction: problem.direction(),
            precision: options.precision,
            transform_type: transform.kind(),
            dimensions: problem.dimensions().to_vec(),
            platform: options.platform,
        }
    }
}

/// Signature and exported names of one transform in a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformMetadata {
    pub direction: Direction,
    pub precision: Precision,
    pub transform_type: TransformKind,
    pub dimensions: Vec<usize>,
    pub platform: Platform,
    pub names: FunctionNames,
}

impl TransformMetadata {
    #[must_use]
    pub fn new(query: Query, names: FunctionNames) -> Self {
        Self {
            direction: query.direction,
            precision: query.precision,
            transform_type: query.transform_type,
            dimensions: query.dimensions,
            platform: query.platform,
            names,
        }
    }

    /// Returns `true` if every signature field equals the query's.
    #[must_use]
    pub fn matches(&self, query: &Query) -> bool {
        self.direction == query.direction
            && self.precision == query.precision
            && self.transform_type == query.transform_type
            && self.dimensions == query.dimensions
            && self.platform == query.platform
    }
}

/// Metadata of a built library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub build_info: BuildInfo,
    pub transforms: Vec<TransformMetadata>,
    #[serde(default)]
    pub transform_types: Vec<TransformKind>,
}

impl Metadata {
    /// Creates a record for a library exporting a single transform.
    #[must_use]
    pub fn single(build_info: BuildInfo, transform: TransformMetadata) -> Self {
        let transform_types = vec![transform.transform_type];
        Self {
            build_info,
            transforms: vec![transform],
            transform_types,
        }
    }

    /// Returns the first usable transform entry matching `query`.
    #[must_use]
    pub fn find(&self, query: &Query) -> Option<&TransformMetadata> {
        self.transforms
            .iter()
            .find(|entry| entry.names.is_usable() && entry.matches(query))
    }
}
