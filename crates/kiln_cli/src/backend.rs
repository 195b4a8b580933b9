//! Compiler backend that runs an external command.
//!
//! The command line comes from `compiler.command` in `kiln.toml`. Arguments
//! may contain `{input}`, `{input_dir}`, `{output}` and `{options}`; an
//! argument that is exactly `{options}` expands to the whitespace-separated
//! options, or to nothing when there are none.
//!
//! The compiler never reads the user's source file directly. The text handed
//! to [`CompilerBackend::compile_from_source`] is staged into a scratch
//! directory and `{input}` points there, so the binary always corresponds to
//! the text that was fingerprinted. `{input_dir}` names the original
//! directory for relative includes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use kiln_cache::{CompilerBackend, Compiled, Diagnostic};
use kiln_config::{
    INPUT_DIR_PLACEHOLDER, INPUT_PLACEHOLDER, OPTIONS_PLACEHOLDER, OUTPUT_PLACEHOLDER,
};
use tracing::debug;

/// Runs the configured compiler on kernel source text.
pub struct CommandBackend {
    command: Vec<String>,
    /// Where the source was read from. Supplies the staged file name and
    /// `{input_dir}`.
    origin: PathBuf,
}

impl CommandBackend {
    /// Creates a backend for source read from `origin` using `command`.
    pub fn new(command: Vec<String>, origin: &Path) -> Self {
        Self {
            command,
            origin: origin.to_path_buf(),
        }
    }

    /// Directory of the original source, `.` for a bare file name.
    fn origin_dir(&self) -> PathBuf {
        match self.origin.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Name of the staged copy; keeps the extension compilers key on.
    fn staged_name(&self) -> OsString {
        self.origin
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("kernel.src"))
    }

    /// Expands placeholders into a concrete argument list.
    fn expand(&self, input: &Path, output: &Path, options: &str) -> Vec<String> {
        let input = input.display().to_string();
        let input_dir = self.origin_dir().display().to_string();
        let output = output.display().to_string();
        let mut args = Vec::with_capacity(self.command.len());
        for arg in &self.command {
            if arg == OPTIONS_PLACEHOLDER {
                args.extend(options.split_whitespace().map(str::to_string));
                continue;
            }
            args.push(
                arg.replace(INPUT_DIR_PLACEHOLDER, &input_dir)
                    .replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
                    .replace(OPTIONS_PLACEHOLDER, options),
            );
        }
        args
    }
}

impl CompilerBackend for CommandBackend {
    type Program = ();

    fn compile_from_source(&mut self, source: &str, options: &str) -> Result<Compiled<()>, Diagnostic> {
        let scratch = tempfile::Builder::new()
            .prefix("kiln-build-")
            .tempdir()
            .map_err(|e| Diagnostic::new(format!("failed to create scratch directory: {e}")))?;
        let input = scratch.path().join(self.staged_name());
        std::fs::write(&input, source)
            .map_err(|e| Diagnostic::new(format!("failed to stage kernel source: {e}")))?;
        let output = scratch.path().join("kernel.bin");

        let args = self.expand(&input, &output, options);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| Diagnostic::new("compiler command is empty"))?;
        debug!(program = %program, args = ?rest, "running compiler");

        let result = Command::new(program)
            .args(rest)
            .output()
            .map_err(|e| Diagnostic::new(format!("failed to run '{program}': {e}")))?;
        if !result.status.success() {
            let mut log = String::from_utf8_lossy(&result.stderr).into_owned();
            log.push_str(&String::from_utf8_lossy(&result.stdout));
            if log.trim().is_empty() {
                log = format!("'{program}' exited with {}", result.status);
            }
            return Err(Diagnostic::new(log));
        }

        let artifact = std::fs::read(&output)
            .map_err(|e| Diagnostic::new(format!("compiler produced no binary: {e}")))?;
        if artifact.is_empty() {
            return Err(Diagnostic::new("compiler produced an empty binary"));
        }
        Ok(Compiled {
            program: (),
            artifact,
        })
    }

    fn load_precompiled(&mut self, artifact: &[u8], _options: &str) -> Result<(), Diagnostic> {
        if artifact.is_empty() {
            return Err(Diagnostic::new("empty binary"));
        }
        Ok(())
    }
}
