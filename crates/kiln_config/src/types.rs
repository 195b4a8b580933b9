//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder replaced by the kernel source path in compiler commands.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Placeholder replaced by the directory of the original kernel source, for
/// include paths such as `-I{input_dir}`.
pub const INPUT_DIR_PLACEHOLDER: &str = "{input_dir}";

/// Placeholder replaced by the binary output path in compiler commands.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Placeholder replaced by the compile options in compiler commands.
pub const OPTIONS_PLACEHOLDER: &str = "{options}";

/// The top-level configuration parsed from `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct KilnConfig {
    /// Cache location and behaviour.
    #[serde(default)]
    pub cache: CacheConfig,
    /// External compiler used by `kiln build`.
    #[serde(default)]
    pub compiler: Option<CompilerConfig>,
    /// Identity of the device kernels are built for.
    pub device: DeviceConfig,
}

/// The `[cache]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding `.key` and `.bin` files, relative to the config file.
    pub dir: PathBuf,
    /// Whether compile options are part of the source fingerprint.
    pub fingerprint_options: bool,
    /// Whether builds take the per-name lock.
    pub locking: bool,
    /// How long to wait for the per-name lock, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".kiln-cache"),
            fingerprint_options: true,
            locking: true,
            lock_timeout_ms: 10_000,
        }
    }
}

impl CacheConfig {
    /// Lock timeout as a [`Duration`].
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// The `[compiler]` section.
#[derive(Debug, Deserialize)]
pub struct CompilerConfig {
    /// Program and arguments, with `{input}`, `{output}` and `{options}`
    /// placeholders.
    ///
    /// Accepts either a list of strings or a single whitespace-separated
    /// string.
    #[serde(deserialize_with = "deserialize_command")]
    pub command: Vec<String>,
    /// Default compile options, overridable on the command line.
    #[serde(default)]
    pub options: String,
}

/// The `[device]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device name as reported by the driver.
    pub name: String,
    /// Device vendor.
    #[serde(default)]
    pub vendor: String,
    /// Driver or API version.
    #[serde(default)]
    pub version: String,
}

/// Deserializes a command given as a list or as one whitespace-separated string.
fn deserialize_command<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CommandVisitor;

    impl<'de> Visitor<'de> for CommandVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a command string or a list of arguments")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.split_whitespace().map(str::to_string).collect())
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(CommandVisitor)
}
