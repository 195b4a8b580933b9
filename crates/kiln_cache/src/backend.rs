//! Interfaces to the compute backend that the cache drives.
//!
//! The cache never talks to a GPU API itself. Callers hand it a
//! [`CompilerBackend`] and a [`DeviceDescriptor`] for the device the program
//! targets.

use std::fmt;

/// Build log or error text produced by a compiler backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The backend's message, usually the full build log.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.trim_end())
    }
}

impl From<String> for Diagnostic {
    fn from(message: String) -> Self {
        Self { message }
    }
}

/// A freshly compiled program together with its serialized binary.
#[derive(Debug, Clone)]
pub struct Compiled<P> {
    /// Backend handle for the program, ready to create kernels from.
    pub program: P,
    /// The binary the backend produced; this is what gets cached.
    pub artifact: Vec<u8>,
}

/// A backend that turns kernel source into device binaries.
///
/// Both calls are blocking. Options are applied on every call, including when
/// a cached binary is loaded, because they may affect the link step.
pub trait CompilerBackend {
    /// Backend handle for a built program.
    type Program;

    /// Compiles kernel source with the given options.
    fn compile_from_source(
        &mut self,
        source: &str,
        options: &str,
    ) -> Result<Compiled<Self::Program>, Diagnostic>;

    /// Builds a program from a binary previously returned by
    /// [`compile_from_source`](Self::compile_from_source).
    fn load_precompiled(&mut self, artifact: &[u8], options: &str) -> Result<Self::Program, Diagnostic>;
}

/// Descriptive identity of the device a program is built for.
pub trait DeviceDescriptor {
    /// Device name, e.g. `"gfx1030"`.
    fn name(&self) -> String;

    /// Device vendor, e.g. `"Advanced Micro Devices, Inc."`.
    fn vendor(&self) -> String;

    /// Driver or API version string, e.g. `"OpenCL 2.0 AMD-APP"`.
    fn version(&self) -> String;

    /// Returns `(name, vendor, version)`.
    fn describe(&self) -> (String, String, String) {
        (self.name(), self.vendor(), self.version())
    }
}

/// A device described by fixed strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaticDevice {
    /// Device name.
    pub name: String,
    /// Device vendor.
    pub vendor: String,
    /// Driver or API version.
    pub version: String,
}

impl StaticDevice {
    /// Creates a device descriptor from its three identity strings.
    pub fn new(name: impl Into<String>, vendor: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: vendor.into(),
            version: version.into(),
        }
    }
}

impl DeviceDescriptor for StaticDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn vendor(&self) -> String {
        self.vendor.clone()
    }

    fn version(&self) -> String {
        self.version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_device_describe_order() {
        let dev = StaticDevice::new("gfx1030", "AMD", "OpenCL 2.0");
        assert_eq!(
            dev.describe(),
            ("gfx1030".to_string(), "AMD".to_string(), "OpenCL 2.0".to_string())
        );
    }

    #[test]
    fn diagnostic_display_trims_trailing_newlines() {
        let diag = Diagnostic::new("line 3: syntax error\n\n");
        assert_eq!(diag.to_string(), "line 3: syntax error");
    }
}
