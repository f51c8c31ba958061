use thiserror::Error;

/// Creates an anyhow error with the current file and line number
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*)
        )
    };
}

/// Failure of a single transport operation.
///
/// Only device exception responses are permanent: the device understood the
/// request and refused it, so asking again will not help.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect to {target} failed: {reason}")]
    Connect { target: String, reason: String },

    #[error("not connected")]
    NotConnected,

    #[error("i/o error: {0}")]
    Io(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("device exception 0x{code:02X} ({name})")]
    Exception { code: u8, name: String },

    #[error("expected {expected} registers, got {actual}")]
    UnexpectedLength { expected: u16, actual: usize },
}

impl TransportError {
    pub fn exception<S: Into<String>>(code: u8, name: S) -> Self {
        Self::Exception {
            code,
            name: name.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }
}

/// Catalog authoring defects, reported when a catalog is loaded.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("catalog is for space {found}, expected {expected}")]
    SpaceMismatch { expected: String, found: String },

    #[error("register 0x{address:04X} ({description}): length must be at least 1")]
    ZeroLength { address: u16, description: String },

    #[error("register 0x{address:04X} ({description}): range runs past 0xFFFF")]
    OutOfRange { address: u16, description: String },

    #[error("register 0x{address:04X} ({description}): scale {scale} must be positive and finite")]
    InvalidScale {
        address: u16,
        description: String,
        scale: f64,
    },

    #[error("register 0x{address:04X} overlaps register 0x{previous:04X} (length {previous_length})")]
    Overlap {
        address: u16,
        previous: u16,
        previous_length: u16,
    },

    #[error("register 0x{address:04X}: enumeration {table} needs a single register, length is {length}")]
    EnumerationLength {
        address: u16,
        table: String,
        length: u16,
    },

    #[error("register 0x{address:04X}: unknown enumeration table {table}")]
    UnknownEnumeration { address: u16, table: String },
}
