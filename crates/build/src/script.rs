//! Rendering of generator scripts.
//!
//! A script loads the generator's FFT package, selects a platform
//! configuration, wraps the traced composition in a function call taking the
//! external `sym` buffer, and finally prints the generated code to
//! `<name>.<ext>`. Emission is a pure function of its inputs: the same
//! composition and config always produce the same bytes.

use std::{fmt::Write as _, fs, io, path::Path};

use spiral_core::{Composition, Options, Platform, Precision};

/// Settings that shape a generator script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Base name of the generated function and source file.
    pub name: String,
    /// Name of whatever produced the script, used in the header comment.
    pub origin: String,
    pub platform: Platform,
    pub precision: Precision,
    pub print_rule_tree: bool,
}

impl ScriptConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, origin: impl Into<String>, options: &Options) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            platform: options.platform,
            precision: options.precision,
            print_rule_tree: options.print_rule_tree,
        }
    }

    /// Returns the name of the source file the generator will write.
    #[must_use]
    pub fn source_file(&self) -> String {
        format!("{}.{}", self.name, self.platform.source_extension())
    }
}

fn platform_conf(platform: Platform) -> &'static str {
    match platform {
        Platform::Cpu => "conf := LocalConfig.fftx.defaultConf();",
        Platform::Cuda => "conf := LocalConfig.fftx.confGPU();",
        Platform::Hip => "conf := FFTXGlobals.defaultHIPConf();",
    }
}

/// Renders the generator script for a composition.
///
/// Entries appear in exactly the order of `composition`.
#[must_use]
pub fn emit(composition: &Composition, config: &ScriptConfig) -> String {
    let mut s = String::new();
    render(&mut s, composition, config).expect("writing to a String cannot fail");
    s
}

fn render(s: &mut String, composition: &Composition, config: &ScriptConfig) -> std::fmt::Result {
    writeln!(s)?;
    writeln!(s, "# SPIRAL script generated by {}", config.origin)?;
    writeln!(s)?;

    writeln!(s, "Load(fftx);")?;
    writeln!(s, "ImportAll(fftx);")?;
    writeln!(s)?;
    writeln!(s, "{}", platform_conf(config.platform))?;
    writeln!(s)?;

    writeln!(s, r#"t := let(symvar := var("sym", TPtr(TReal)),"#)?;
    writeln!(s, "    TFCall(")?;
    writeln!(s, "        Compose([")?;
    for entry in composition.iter() {
        writeln!(s, "            {entry}")?;
    }
    writeln!(s, "        ]),")?;
    writeln!(
        s,
        r#"        rec(fname := "{}", params := [symvar])"#,
        config.name
    )?;
    writeln!(s, "    )")?;
    writeln!(s, ");")?;
    writeln!(s)?;

    writeln!(s, "opts := conf.getOpts(t);")?;
    if config.platform.is_gpu() {
        writeln!(s, "opts.wrapCFuncs := true;")?;
    }
    if config.precision == Precision::Single {
        writeln!(s, r#"opts.TRealCtype := "float";"#)?;
    }
    if config.print_rule_tree {
        writeln!(s, "opts.printRuleTree := true;")?;
    }
    writeln!(s, "tt := opts.tagIt(t);")?;
    writeln!(s)?;

    writeln!(s, "c := opts.fftxGen(tt);")?;
    writeln!(
        s,
        r#"PrintTo("{}", opts.prettyPrint(c));"#,
        config.source_file()
    )?;
    writeln!(s)
}

/// Writes a rendered script to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_script(path: &Path, text: &str) -> io::Result<()> {
    fs::write(path, text)
}
