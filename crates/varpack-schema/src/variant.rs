/// A platform/architecture combination a module can be built for.
///
/// The set is fixed. Its declaration order is the canonical iteration order
/// used everywhere variants are collected or listed, so the first variant of
/// a module is always well-defined regardless of how artifacts were found.
///
/// # Example
///
/// ```
/// use varpack_schema::Variant;
///
/// let v: Variant = "linux-amd64".parse().unwrap();
/// assert_eq!(v.library_extension(), "so");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Variant {
    /// Linux on `x86_64`.
    #[serde(rename = "linux-amd64")]
    LinuxAmd64,
    /// Linux on ARM64.
    #[serde(rename = "linux-arm64")]
    LinuxArm64,
    /// macOS on Apple Silicon.
    #[serde(rename = "darwin-arm64")]
    DarwinArm64,
    /// macOS on Intel.
    #[serde(rename = "darwin-amd64")]
    DarwinAmd64,
}

/// Operating system family of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux-family targets (`.so` libraries).
    Linux,
    /// Darwin-family targets (`.dylib` libraries).
    Darwin,
}

impl Variant {
    /// Every supported variant, in canonical order.
    pub const ALL: [Variant; 4] = [
        Self::LinuxAmd64,
        Self::LinuxArm64,
        Self::DarwinArm64,
        Self::DarwinAmd64,
    ];

    /// The variant of the host this binary was compiled for, if supported.
    pub fn current() -> Option<Self> {
        if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
            Some(Self::LinuxAmd64)
        } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
            Some(Self::LinuxArm64)
        } else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            Some(Self::DarwinArm64)
        } else if cfg!(all(target_os = "macos", target_arch = "x86_64")) {
            Some(Self::DarwinAmd64)
        } else {
            None
        }
    }

    /// Identifier used on disk, on the packager command line, and in the index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinuxAmd64 => "linux-amd64",
            Self::LinuxArm64 => "linux-arm64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::DarwinAmd64 => "darwin-amd64",
        }
    }

    /// Operating system family.
    pub fn os(&self) -> Os {
        match self {
            Self::LinuxAmd64 | Self::LinuxArm64 => Os::Linux,
            Self::DarwinArm64 | Self::DarwinAmd64 => Os::Darwin,
        }
    }

    /// Native shared-library extension, without the leading dot.
    pub fn library_extension(&self) -> &'static str {
        match self.os() {
            Os::Linux => "so",
            Os::Darwin => "dylib",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux-amd64" | "linux-x86_64" => Ok(Self::LinuxAmd64),
            "linux-arm64" | "linux-aarch64" => Ok(Self::LinuxArm64),
            "darwin-arm64" | "darwin-aarch64" | "macos-arm64" => Ok(Self::DarwinArm64),
            "darwin-amd64" | "darwin-x86_64" | "macos-x86_64" => Ok(Self::DarwinAmd64),
            _ => Err(format!("Unknown variant: {s}")),
        }
    }
}
