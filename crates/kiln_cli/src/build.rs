//! `kiln build` and `kiln verify`.
//!
//! Both read the kernel source, resolve the cache name and options, and run
//! the cache's verification. `build` additionally compiles on a miss using the
//! command from `[compiler]`.

use std::path::Path;

use kiln_cache::{BuildOutcome, CacheStatus};

use crate::backend::CommandBackend;
use crate::project::{resolve_name, Project};
use crate::{BuildArgs, GlobalArgs, VerifyArgs};

/// Runs the `kiln build` command.
///
/// Returns exit code 0 on success. Compile failures surface as errors with the
/// compiler's log.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let compiler = project
        .config
        .compiler
        .as_ref()
        .ok_or("no [compiler] section in kiln.toml")?;

    let source = read_source(&args.source)?;
    let name = resolve_name(&args.source, args.name.as_deref())?;
    let options = project.options(args.options.as_deref());

    let mut backend = CommandBackend::new(compiler.command.clone(), &args.source);
    let output = project
        .cache()
        .build(&mut backend, &project.device(), &name, &source, &options)?;

    if let Some(ref dest) = args.output {
        std::fs::write(dest, &output.artifact)
            .map_err(|e| format!("failed to write {}: {e}", dest.display()))?;
    }

    if !global.quiet {
        let bytes = output.artifact.len();
        match output.outcome {
            BuildOutcome::Hit => eprintln!("      Cached {name} ({bytes} bytes)"),
            BuildOutcome::Miss { reason, stored } => {
                eprintln!("   Compiled {name} ({bytes} bytes, {reason})");
                if !stored {
                    eprintln!("warning: binary for {name} was not stored in the cache");
                }
            }
        }
    }
    Ok(0)
}

/// Reads kernel source text.
///
/// Sources must be UTF-8, since that is the text handed to the compiler and
/// fingerprinted.
pub fn read_source(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    String::from_utf8(bytes).map_err(|e| {
        format!(
            "{} is not valid UTF-8 (invalid byte at offset {}); kernel sources must be UTF-8 text",
            path.display(),
            e.utf8_error().valid_up_to()
        )
        .into()
    })
}

/// Runs the `kiln verify` command.
///
/// Returns exit code 0 if the cached binary would be reused, 1 otherwise.
pub fn verify(args: &VerifyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let source = read_source(&args.source)?;
    let name = resolve_name(&args.source, args.name.as_deref())?;
    let options = project.options(args.options.as_deref());

    match project
        .cache()
        .verify(&project.device(), &name, &source, &options)
    {
        CacheStatus::Valid => {
            if !global.quiet {
                println!("{name}: valid");
            }
            Ok(0)
        }
        CacheStatus::Invalid(reason) => {
            if !global.quiet {
                println!("{name}: invalid: {reason}");
            }
            Ok(1)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Project whose "compiler" copies the source to the output.
    fn make_project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("kiln.toml"),
            r#"
[cache]
dir = "cache"

[compiler]
command = ["cp", "{input}", "{output}"]

[device]
name = "gfx1030"
vendor = "AMD"
version = "OpenCL 2.0"
"#,
        )
        .unwrap();
        fs::write(tmp.path().join("blur.cl"), "__kernel void blur() {}").unwrap();
        tmp
    }

    fn global(root: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(root.to_str().unwrap().to_string()),
        }
    }

    fn verify_args(root: &Path) -> VerifyArgs {
        VerifyArgs {
            source: root.join("blur.cl"),
            options: None,
            name: None,
        }
    }

    #[test]
    fn build_then_verify() {
        let tmp = make_project();
        let g = global(tmp.path());

        assert_eq!(verify(&verify_args(tmp.path()), &g).unwrap(), 1);

        let out = tmp.path().join("blur.bin");
        let args = BuildArgs {
            source: tmp.path().join("blur.cl"),
            options: None,
            name: None,
            output: Some(out.clone()),
        };
        assert_eq!(run(&args, &g).unwrap(), 0);
        assert_eq!(fs::read(&out).unwrap(), b"__kernel void blur() {}");
        assert!(tmp.path().join("cache").join("blur.key").is_file());

        assert_eq!(verify(&verify_args(tmp.path()), &g).unwrap(), 0);

        fs::write(tmp.path().join("blur.cl"), "__kernel void blur(int r) {}").unwrap();
        assert_eq!(verify(&verify_args(tmp.path()), &g).unwrap(), 1);
    }

    #[test]
    fn build_without_compiler_section_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kiln.toml"), "[device]\nname = \"gfx1030\"\n").unwrap();
        fs::write(tmp.path().join("blur.cl"), "k").unwrap();
        let args = BuildArgs {
            source: tmp.path().join("blur.cl"),
            options: None,
            name: None,
            output: None,
        };
        let err = run(&args, &global(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("[compiler]"));
    }

    #[test]
    fn non_utf8_source_is_rejected_clearly() {
        let tmp = make_project();
        let src = tmp.path().join("blur.cl");
        fs::write(&src, b"__kernel void blur() {} \xff").unwrap();
        let err = read_source(&src).unwrap_err().to_string();
        assert!(err.contains("not valid UTF-8"));
        assert!(err.contains("offset 24"));

        let err = verify(&verify_args(tmp.path()), &global(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }
}
