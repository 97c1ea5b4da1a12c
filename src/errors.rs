use thiserror::Error;

/// User-correctable problems with an entry, an email or a password.
///
/// These are surfaced immediately and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    MissingField(&'static str),

    #[error("an entry for platform '{0}' already exists")]
    DuplicatePlatform(String),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("master password must be at least {0} characters")]
    WeakPassword(usize),
}

/// All errors that can occur in VaultFill.
#[derive(Debug, Error)]
pub enum VaultFillError {
    // --- Validation ---
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // --- Crypto errors ---
    /// Wrong password or tampered ciphertext. Deliberately not split
    /// into two cases.
    #[error("Wrong password or corrupted vault")]
    AuthenticationFailure,

    #[error("Crypto fault: {0}")]
    CryptoFault(String),

    // --- Login errors ---
    // Both render the same message so the output cannot be used to
    // enumerate registered accounts.
    #[error("Invalid email or password")]
    UserNotFound,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for {0}")]
    AccountExists(String),

    #[error("No account is unlocked, log in first")]
    NotLoggedIn,

    // --- Entry errors ---
    #[error("Entry '{0}' not found")]
    NotFound(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Cross-context protocol ---
    #[error("Malformed message: {0}")]
    Protocol(String),

    #[error("Audit error: {0}")]
    AuditError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl VaultFillError {
    /// True for the login-time failures that callers must present as
    /// one generic message.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::UserNotFound | Self::InvalidCredentials)
    }
}

/// Convenience type alias for VaultFill results.
pub type Result<T> = std::result::Result<T, VaultFillError>;
