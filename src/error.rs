use std::fmt;
use std::path::PathBuf;

/// One parameter whose stored shape disagrees with the network it is being
/// loaded into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub name: String,
    pub stored: Vec<usize>,
    pub expected: Vec<usize>,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: stored {:?}, current {:?}",
            self.name, self.stored, self.expected
        )
    }
}

/// All errors produced by the library.
#[derive(Debug)]
pub enum NetError {
    /// Architecture (or dropout probability) violates its invariants.
    InvalidSpec(String),
    /// The checkpoint file could not be created, written, or read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The stored record is missing fields or is structurally malformed.
    CorruptCheckpoint { path: Option<PathBuf>, reason: String },
    /// Stored parameter shapes disagree with the rebuilt architecture.
    /// Lists every mismatched parameter, not only the first.
    ShapeMismatch(Vec<ShapeMismatch>),
    /// A batch was fed whose width is not the network's input size.
    InputMismatch { expected: usize, found: usize },
    /// JSON cannot represent NaN or infinity, so such parameters are refused.
    NonFiniteParameter { name: String },
}

impl NetError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptCheckpoint {
            path: None,
            reason: reason.into(),
        }
    }

    /// Attaches `path` to a `CorruptCheckpoint` that does not carry one yet.
    pub(crate) fn at_path(self, at: &std::path::Path) -> Self {
        match self {
            Self::CorruptCheckpoint { path: None, reason } => Self::CorruptCheckpoint {
                path: Some(at.to_path_buf()),
                reason,
            },
            other => other,
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpec(msg) => write!(f, "invalid network spec: {msg}"),
            Self::Io { path, source } => write!(f, "io error on '{}': {source}", path.display()),
            Self::CorruptCheckpoint { path: Some(path), reason } => {
                write!(f, "corrupt checkpoint '{}': {reason}", path.display())
            }
            Self::CorruptCheckpoint { path: None, reason } => {
                write!(f, "corrupt checkpoint: {reason}")
            }
            Self::ShapeMismatch(mismatches) => {
                write!(f, "shape mismatch in {} parameter(s): ", mismatches.len())?;
                for (i, m) in mismatches.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            Self::InputMismatch { expected, found } => {
                write!(f, "input width {found} does not match network input size {expected}")
            }
            Self::NonFiniteParameter { name } => {
                write!(f, "parameter '{name}' contains a non-finite value")
            }
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
