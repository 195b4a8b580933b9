//! Project discovery and config-to-cache wiring shared by all commands.

use std::path::{Path, PathBuf};

use kiln_cache::{cache_name_from_path, BuildCache, StaticDevice};
use kiln_config::{KilnConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `kiln.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// A loaded project: its root directory and parsed configuration.
pub struct Project {
    /// Directory containing `kiln.toml`.
    pub root: PathBuf,
    /// Parsed configuration.
    pub config: KilnConfig,
}

impl Project {
    /// Locates and loads the project for this invocation.
    pub fn load(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let root = resolve_project_root(global)?;
        let config = kiln_config::load_config(&root)?;
        Ok(Self { root, config })
    }

    /// Absolute cache directory; relative paths are taken from the project root.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.config.cache.dir)
    }

    /// Cache configured from `[cache]`.
    pub fn cache(&self) -> BuildCache {
        BuildCache::new(&self.cache_dir())
            .fingerprint_options(self.config.cache.fingerprint_options)
            .locking(self.config.cache.locking)
            .lock_timeout(self.config.cache.lock_timeout())
    }

    /// Device descriptor from `[device]`.
    pub fn device(&self) -> StaticDevice {
        let d = &self.config.device;
        StaticDevice::new(&d.name, &d.vendor, &d.version)
    }

    /// Compile options: the explicit override, else `compiler.options`.
    pub fn options(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(options) => options.to_string(),
            None => self
                .config
                .compiler
                .as_ref()
                .map(|c| c.options.clone())
                .unwrap_or_default(),
        }
    }
}

/// Picks the cache name: the explicit one, else the source file stem.
pub fn resolve_name(source: &Path, explicit: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    match explicit {
        Some(name) => Ok(name.to_string()),
        None => cache_name_from_path(source).ok_or_else(|| {
            format!("cannot derive a cache name from '{}'", source.display()).into()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[cache]
dir = "cache"

[compiler]
command = ["clc", "-o", "{output}", "{input}"]
options = "-O2"

[device]
name = "gfx1030"
vendor = "AMD"
version = "OpenCL 2.0"
"#;

    fn global_for(path: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: false,
            verbose: false,
            config: Some(path.to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn find_project_root_walks_up() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), CONFIG).unwrap();
        let nested = tmp.path().join("kernels").join("blur");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), tmp.path());
    }

    #[test]
    fn resolve_project_root_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILE);
        fs::write(&config_path, CONFIG).unwrap();
        let root = resolve_project_root(&global_for(&config_path)).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn resolve_project_root_from_config_dir() {
        let tmp = TempDir::new().unwrap();
        let root = resolve_project_root(&global_for(tmp.path())).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn project_wiring() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), CONFIG).unwrap();
        let project = Project::load(&global_for(tmp.path())).unwrap();

        assert_eq!(project.cache_dir(), tmp.path().join("cache"));
        assert_eq!(project.cache().store().dir(), tmp.path().join("cache"));
        assert_eq!(project.device(), StaticDevice::new("gfx1030", "AMD", "OpenCL 2.0"));
        assert_eq!(project.options(None), "-O2");
        assert_eq!(project.options(Some("-O0")), "-O0");
        assert_eq!(project.options(Some("")), "");
    }

    #[test]
    fn name_resolution() {
        assert_eq!(resolve_name(Path::new("k/blur.cl"), None).unwrap(), "blur");
        assert_eq!(resolve_name(Path::new("k/blur.cl"), Some("b2")).unwrap(), "b2");
        assert!(resolve_name(Path::new("/"), None).is_err());
    }
}
