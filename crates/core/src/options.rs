use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presence of this variable switches on `keep_temp`.
pub const ENV_KEEP_TEMP: &str = "SP_KEEPTEMP";

/// Presence of this variable switches on `print_rule_tree`.
pub const ENV_PRINT_RULE_TREE: &str = "SP_PRINTRULETREE";

/// Explicit working directory for temporary build directories.
pub const ENV_WORK_DIR: &str = "SP_WORKDIR";

/// Explicit directory for installed libraries.
pub const ENV_LIBS_DIR: &str = "SP_LIBSDIR";

/// Root of a generator installation; its `bin/spiral` becomes the generator.
pub const ENV_SPIRAL_HOME: &str = "SPIRAL_HOME";

/// Floating point precision of generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Double,
    Single,
}

impl Precision {
    /// Returns the C type name of a real value.
    #[must_use]
    pub fn c_type(self) -> &'static str {
        match self {
            Precision::Double => "double",
            Precision::Single => "float",
        }
    }

    /// Returns the prefix used in function base names.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Precision::Double => "d",
            Precision::Single => "f",
        }
    }
}

/// Target platform of generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Cpu,
    Cuda,
    Hip,
}

impl Platform {
    /// Returns `true` for GPU backends.
    #[must_use]
    pub fn is_gpu(self) -> bool {
        matches!(self, Platform::Cuda | Platform::Hip)
    }

    /// Returns the suffix appended to base names built for this platform.
    #[must_use]
    pub fn name_suffix(self) -> &'static str {
        match self {
            Platform::Cpu => "",
            Platform::Cuda => "_cu",
            Platform::Hip => "_hip",
        }
    }

    /// Returns the extension of the source file the generator emits.
    #[must_use]
    pub fn source_extension(self) -> &'static str {
        match self {
            Platform::Cpu => "c",
            Platform::Cuda => "cu",
            Platform::Hip => "cpp",
        }
    }

    /// Returns the language name used in progress messages.
    #[must_use]
    pub fn language(self) -> &'static str {
        match self {
            Platform::Cpu => "C",
            Platform::Cuda => "CUDA",
            Platform::Hip => "HIP",
        }
    }
}

/// External programs used to generate and build code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Toolchain {
    /// Generator command; the script path is appended as the last argument.
    pub generator: Vec<String>,
    /// Native build tool (cmake compatible command line).
    pub build_tool: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            generator: vec!["spiral".to_string()],
            build_tool: "cmake".to_string(),
        }
    }
}

impl Toolchain {
    /// Returns the default toolchain, using `$SPIRAL_HOME/bin/spiral` as the
    /// generator when `SPIRAL_HOME` is set.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env_from(|k: &str| env::var_os(k))
    }

    /// Points a default generator at `$SPIRAL_HOME/bin/spiral`, reading
    /// variables through `lookup`.
    ///
    /// A generator that was set explicitly is left alone.
    #[must_use]
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        if self.generator != Self::default().generator {
            return self;
        }
        if let Some(home) = lookup(ENV_SPIRAL_HOME) {
            let generator = Path::new(&home).join("bin").join("spiral");
            self.generator = vec![generator.to_string_lossy().into_owned()];
        }
        self
    }
}

/// Errors that can occur when reading or validating [`Options`].
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to parse options")]
    Parse(#[from] serde_json::Error),

    #[error("generator command is empty")]
    EmptyGenerator,

    #[error("build tool is empty")]
    EmptyBuildTool,
}

/// Configuration of a solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub precision: Precision,
    pub platform: Platform,
    /// Embed a metadata record in built libraries and install a sidecar.
    pub include_metadata: bool,
    /// Keep temporary build directories.
    ///
    /// Also switched on by `SP_KEEPTEMP`; an explicit `false` does not
    /// override the variable.
    pub keep_temp: bool,
    /// Build with MPI support.
    pub mpi: bool,
    /// Ask the generator to print its rule tree.
    ///
    /// Also switched on by `SP_PRINTRULETREE`, like `keep_temp`.
    pub print_rule_tree: bool,
    /// Parent directory for temporary build directories.
    pub work_dir: Option<PathBuf>,
    /// Directory holding installed libraries.
    pub libs_dir: Option<PathBuf>,
    pub toolchain: Toolchain,
}

impl Options {
    /// Returns default options with environment toggles applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Applies the process environment; see [`Options::apply_env_from`].
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|k: &str| env::var_os(k))
    }

    /// Applies environment toggles, reading variables through `lookup`.
    ///
    /// A set toggle variable switches its option on, whatever its value. A
    /// toggle that is already on is never switched off. Directories are only
    /// filled in when unset, and a default generator is resolved from
    /// `SPIRAL_HOME`.
    #[must_use]
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        self.keep_temp |= lookup(ENV_KEEP_TEMP).is_some();
        self.print_rule_tree |= lookup(ENV_PRINT_RULE_TREE).is_some();
        if self.work_dir.is_none() {
            self.work_dir = lookup(ENV_WORK_DIR).map(PathBuf::from);
        }
        if self.libs_dir.is_none() {
            self.libs_dir = lookup(ENV_LIBS_DIR).map(PathBuf::from);
        }
        self.toolchain = self.toolchain.apply_env_from(&lookup);
        self
    }

    /// Parses options from JSON, rejecting unrecognized keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, names an unknown option,
    /// or describes an invalid toolchain.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Validates that the toolchain can be invoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator command or build tool is empty.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.toolchain.generator.first().is_none_or(String::is_empty) {
            return Err(OptionsError::EmptyGenerator);
        }
        if self.toolchain.build_tool.is_empty() {
            return Err(OptionsError::EmptyBuildTool);
        }
        Ok(())
    }

    /// Returns the directory holding installed libraries.
    ///
    /// Falls back to `$HOME/.local/share/spiral/.libs`, then `./.libs`.
    #[must_use]
    pub fn resolved_libs_dir(&self) -> PathBuf {
        if let Some(dir) = &self.libs_dir {
            return dir.clone();
        }
        let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"));
        match home {
            Some(home) => Path::new(&home)
                .join(".local")
                .join("share")
                .join("spiral")
                .join(".libs"),
            None => PathBuf::from(".libs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_double_cpu() {
        let options = Options::default();

        assert_eq!(options.precision, Precision::Double);
        assert_eq!(options.platform, Platform::Cpu);
        assert!(!options.include_metadata);
        assert!(!options.keep_temp);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn parses_partial_json() {
        let options = Options::from_json(r#"{ "precision": "single", "platform": "cuda" }"#)
            .expect("should parse");

        assert_eq!(options.precision, Precision::Single);
        assert_eq!(options.platform, Platform::Cuda);
        assert_eq!(options.toolchain, Toolchain::default());
    }

    #[test]
    fn rejects_unknown_option() {
        let result = Options::from_json(r#"{ "colour": "blue" }"#);
        assert!(matches!(result, Err(OptionsError::Parse(_))));
    }

    #[test]
    fn rejects_empty_generator() {
        let result = Options::from_json(r#"{ "toolchain": { "generator": [] } }"#);
        assert!(matches!(result, Err(OptionsError::EmptyGenerator)));
    }

    #[test]
    fn explicit_libs_dir_wins() {
        let options = Options {
            libs_dir: Some(PathBuf::from("/opt/spiral/libs")),
            ..Options::default()
        };
        assert_eq!(options.resolved_libs_dir(), PathBuf::from("/opt/spiral/libs"));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let pairs: Vec<(String, OsString)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), OsString::from(*v)))
            .collect();
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn env_toggles_switch_options_on() {
        let options = Options::default().apply_env_from(vars(&[
            (ENV_KEEP_TEMP, ""),
            (ENV_PRINT_RULE_TREE, "0"),
        ]));

        assert!(options.keep_temp);
        assert!(options.print_rule_tree);
    }

    #[test]
    fn env_never_switches_options_off() {
        let options = Options {
            keep_temp: true,
            print_rule_tree: true,
            ..Options::default()
        }
        .apply_env_from(vars(&[]));

        assert!(options.keep_temp);
        assert!(options.print_rule_tree);
    }

    #[test]
    fn env_fills_unset_dirs_only() {
        let env = vars(&[(ENV_WORK_DIR, "/tmp/work"), (ENV_LIBS_DIR, "/tmp/libs")]);

        let filled = Options::default().apply_env_from(&env);
        assert_eq!(filled.work_dir, Some(PathBuf::from("/tmp/work")));
        assert_eq!(filled.libs_dir, Some(PathBuf::from("/tmp/libs")));

        let explicit = Options {
            libs_dir: Some(PathBuf::from("/opt/libs")),
            ..Options::default()
        }
        .apply_env_from(&env);
        assert_eq!(explicit.work_dir, Some(PathBuf::from("/tmp/work")));
        assert_eq!(explicit.libs_dir, Some(PathBuf::from("/opt/libs")));
    }

    #[test]
    fn spiral_home_locates_default_generator() {
        let env = vars(&[(ENV_SPIRAL_HOME, "/opt/spiral")]);

        let options = Options::default().apply_env_from(&env);
        let expected = Path::new("/opt/spiral").join("bin").join("spiral");
        assert_eq!(
            options.toolchain.generator,
            vec![expected.to_string_lossy().into_owned()]
        );

        let custom = Toolchain {
            generator: vec!["gap".to_string(), "-q".to_string()],
            ..Toolchain::default()
        };
        assert_eq!(custom.clone().apply_env_from(&env), custom);
    }

    #[test]
    fn empty_env_changes_nothing() {
        assert_eq!(Options::default().apply_env_from(vars(&[])), Options::default());
    }

    #[test]
    fn platform_properties() {
        assert!(!Platform::Cpu.is_gpu());
        assert!(Platform::Cuda.is_gpu());
        assert!(Platform::Hip.is_gpu());
        assert_eq!(Platform::Cuda.name_suffix(), "_cu");
        assert_eq!(Platform::Hip.source_extension(), "cpp");
        assert_eq!(Precision::Single.c_type(), "float");
    }
}
