//! Error taxonomy shared by every store and the module runtime

use thiserror::Error;

use crate::ids::{ObjectId, VariableType};

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Coarse classification of a [`KernelError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    TypeMismatch,
    InvalidArgument,
    InvariantViolation,
    NotImplemented,
}

/// Errors raised by the object registry, the stores and the module runtime
///
/// Every failure aborts the operation before any store was touched, so the
/// caller observes the pre-call state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KernelError {
    /// The registry was used before the first kernel reset
    #[error("reset was not called on the kernel")]
    NotInitialized,

    /// The identity pool has no identities left
    #[error("no usable object identities left")]
    ExhaustedIdentitySpace,

    /// Object still has children and cannot be removed
    #[error("object #{0} has children")]
    HasChildren(ObjectId),

    /// The root object cannot be changed this way
    #[error("cannot change root")]
    RootImmutable,

    /// Ident contains characters other than alphanumerics and underscore
    #[error("ident '{0}' may only contain alphanumerics and underscore")]
    InvalidIdent(String),

    /// A sibling under the same parent already uses this ident
    #[error("ident '{ident}' is already used below #{parent}")]
    DuplicateIdent { ident: String, parent: ObjectId },

    /// Referenced identity, name or ident does not exist
    #[error("{kind} #{key} does not exist")]
    NotFound { kind: &'static str, key: String },

    /// Keyed record already exists
    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: &'static str, key: String },

    /// Value of the wrong declared type
    #[error("{name} is of type {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: VariableType,
        actual: VariableType,
    },

    /// Integer code outside of a known enumeration
    #[error("unsupported {kind}: {code}")]
    UnsupportedType { kind: &'static str, code: i64 },

    /// Malformed or missing argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation would break a store invariant
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Operation family the emulation deliberately does not support
    #[error("{0} is not implemented")]
    NotImplemented(String),
}

impl KernelError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        KernelError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, key: impl ToString) -> Self {
        KernelError::AlreadyExists {
            kind,
            key: key.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        KernelError::InvalidArgument(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        KernelError::InvariantViolation(message.into())
    }

    pub fn not_implemented(what: impl Into<String>) -> Self {
        KernelError::NotImplemented(what.into())
    }

    /// Classify into the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::NotFound { .. } => ErrorKind::NotFound,
            KernelError::AlreadyExists { .. } | KernelError::DuplicateIdent { .. } => {
                ErrorKind::AlreadyExists
            }
            KernelError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            KernelError::InvalidIdent(_)
            | KernelError::UnsupportedType { .. }
            | KernelError::InvalidArgument(_)
            | KernelError::RootImmutable => ErrorKind::InvalidArgument,
            KernelError::NotInitialized
            | KernelError::ExhaustedIdentitySpace
            | KernelError::HasChildren(_)
            | KernelError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            KernelError::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }
}
