//! # Store Error Types
//!
//! Errors raised by the backend adapter layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Authorization  │  │    Backend      │  │     Data                │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │ PermissionDenied│  │  NotFound       │  │  Decode                 │ │
//! │  │ Unauthenticated │  │  Unavailable    │  │  SerializationFailed    │ │
//! │  │ InvalidCreds    │  │  UploadFailed   │  │  Core (business rules)  │ │
//! │  │ AccountExists   │  │  Storage        │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │   Only PermissionDenied is published on the       │
//! │  │                 │   EventBus. Everything else stays with the        │
//! │  │  InvalidConfig  │   caller.                                         │
//! │  │  ConfigLoad/Save│                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use frutiandante_core::CoreError;

use crate::failure::OperationKind;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error type.
///
/// `Clone` so the same error can sit in a mirror's state and be handed to
/// the caller that triggered it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    // =========================================================================
    // Authorization Errors
    // =========================================================================
    /// The backend's access rules rejected the operation.
    #[error("Missing or insufficient permissions: {operation} on {path}")]
    PermissionDenied { path: String, operation: OperationKind },

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    Unauthenticated,

    /// Email/password pair was rejected.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("An account already exists for {0}")]
    AccountExists(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// Update of a document that does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Blob upload failed.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Local key/value storage failed.
    #[error("Local storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Data Errors
    // =========================================================================
    /// A snapshot could not be turned into the expected record.
    #[error("Malformed document {path}: {reason}")]
    Decode { path: String, reason: String },

    /// A record could not be turned into a document.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Business rule rejected the input.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationFailed(err.to_string())
    }
}

impl From<frutiandante_core::ValidationError> for StoreError {
    fn from(err: frutiandante_core::ValidationError) -> Self {
        StoreError::Core(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::ConfigSaveFailed(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl StoreError {
    /// Returns true for authorization failures, the only kind that goes on
    /// the error channel.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }

    /// Returns true if the operation may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::UploadFailed(_) | StoreError::Storage(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidConfig(_)
                | StoreError::ConfigLoadFailed(_)
                | StoreError::ConfigSaveFailed(_)
        )
    }

    /// Short, user-facing text. Never includes paths or payloads.
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::PermissionDenied { .. } => "No tienes permiso para realizar esta acción.",
            StoreError::Unauthenticated => "Debes iniciar sesión.",
            StoreError::InvalidCredentials => "Correo o contraseña incorrectos.",
            StoreError::AccountExists(_) => "Ya existe una cuenta con ese correo.",
            StoreError::NotFound(_) => "No encontramos lo que buscabas.",
            StoreError::Unavailable(_) => "Sin conexión. Intenta nuevamente.",
            StoreError::UploadFailed(_) => "No se pudo subir la imagen.",
            StoreError::Core(_) => "Revisa los datos ingresados.",
            _ => "Ocurrió un error inesperado.",
        }
    }
}
