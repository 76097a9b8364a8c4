//! Platform detection.

use std::fmt;

/// The operating system whose content variant is being unpacked.
///
/// The platform matters in one place: the sprite-font glyph layout differs
/// between the DirectX (Windows) and OpenGL (Linux/Mac) content variants, so
/// the sprite-font writer selects its extraction strategy from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    Mac,
}

impl Platform {
    /// Detect the platform the unpacker is running on.
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Mac => "macOS",
        };
        write!(f, "{name}")
    }
}
