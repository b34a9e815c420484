//! Subprocess invocations of the generator and the native build tool.
//!
//! Both tools run with the build directory as their working directory and
//! block until they exit. A failing tool has its error stream copied
//! verbatim to stderr before the error is returned.

use std::{
    fs,
    path::Path,
    process::{Command, Output},
};

use spiral_core::{Options, Platform, Toolchain};

use crate::BuildError;

/// CMake project that compiles `<FILEROOT>` into `lib<FILEROOT>` and installs it.
pub const CMAKE_LISTS: &str = include_str!("../cmake/CMakeLists.txt");

/// Runs the generator on `script` inside `dir`.
///
/// # Errors
///
/// Returns [`BuildError::Spawn`] if the generator cannot be started and
/// [`BuildError::Generator`] if it exits unsuccessfully.
pub fn generate(toolchain: &Toolchain, dir: &Path, script: &Path) -> Result<(), BuildError> {
    let Some((program, args)) = toolchain.generator.split_first() else {
        return Err(BuildError::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty generator"),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args).arg(script).current_dir(dir);

    let output = run(&mut cmd, program)?;
    if !output.status.success() {
        let stderr = surface_stderr(&output);
        return Err(BuildError::Generator {
            code: output.status.code(),
            stderr,
        });
    }
    Ok(())
}

/// Returns the configure-step defines for building `base`.
#[must_use]
pub fn cmake_defines(base: &str, options: &Options, libs_dir: &Path) -> Vec<String> {
    let mut defines = vec![format!("-DFILEROOT:STRING={base}")];
    match options.platform {
        Platform::Cpu => {}
        Platform::Cuda => defines.push("-DHASCUDA=1".to_string()),
        Platform::Hip => {
            defines.push("-DHASHIP=1".to_string());
            defines.push("-DCMAKE_CXX_COMPILER=hipcc".to_string());
        }
    }
    if options.mpi {
        defines.push("-DHASMPI=1".to_string());
    }
    if options.include_metadata {
        defines.push("-DHAS_METADATA=1".to_string());
    }
    defines.push(format!("-DLIBS_DIR={}", libs_dir.display()));
    defines
}

/// Configures and compiles the generated sources in `dir`.
///
/// # Errors
///
/// Returns [`BuildError::Script`] if the project file cannot be written,
/// [`BuildError::Spawn`] if the build tool cannot be started, and
/// [`BuildError::BuildTool`] if a step exits unsuccessfully.
pub fn compile(toolchain: &Toolchain, dir: &Path, defines: &[String]) -> Result<(), BuildError> {
    let lists = dir.join("CMakeLists.txt");
    fs::write(&lists, CMAKE_LISTS).map_err(|source| BuildError::Script {
        path: lists,
        source,
    })?;

    let tool = toolchain.build_tool.as_str();

    let mut configure = Command::new(tool);
    configure.args(defines).arg(".").current_dir(dir);
    check_step("configure", run(&mut configure, tool)?)?;

    let mut build = Command::new(tool);
    build
        .args(["--build", ".", "--config", "Release"])
        .current_dir(dir);
    check_step("build", run(&mut build, tool)?)
}

/// Installs the compiled library into the directory given at configure time.
///
/// # Errors
///
/// Returns [`BuildError::Spawn`] if the build tool cannot be started and
/// [`BuildError::BuildTool`] if it exits unsuccessfully.
pub fn install(toolchain: &Toolchain, dir: &Path) -> Result<(), BuildError> {
    let tool = toolchain.build_tool.as_str();

    let mut install = Command::new(tool);
    install
        .args(["--install", ".", "--config", "Release"])
        .current_dir(dir);
    check_step("install", run(&mut install, tool)?)
}

fn run(cmd: &mut Command, program: &str) -> Result<Output, BuildError> {
    log::debug!("running {cmd:?}");
    cmd.output().map_err(|source| BuildError::Spawn {
        program: program.to_string(),
        source,
    })
}

fn check_step(step: &'static str, output: Output) -> Result<(), BuildError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = surface_stderr(&output);
    Err(BuildError::BuildTool {
        step,
        code: output.status.code(),
        stderr,
    })
}

fn surface_stderr(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    eprint!("{stderr}");
    stderr
}
