//! Error types for the dependency resolution engine.

use thiserror::Error;

/// Dependency resolution errors
///
/// Represents the conditions that can occur during registration, proxy
/// construction, storage or resolution. Every error surfaces to the caller of
/// the resolve operation that triggered it; nothing is retried internally.
///
/// # Examples
///
/// ```rust
/// use proxy_di::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.resolve_required::<String>() {
///     Err(DiError::Unresolved(name)) => assert_eq!(name, "alloc::string::String"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use proxy_di::DiError;
///
/// let circular = DiError::Circular(vec!["ServiceA".into(), "ServiceB".into(), "ServiceA".into()]);
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// A (key, contract) pair was registered twice under the `Reject` policy
    #[error("Registration conflict: {0} is already registered")]
    RegistrationConflict(String),
    /// A required resolution found nothing registered
    #[error("Unresolved dependency: {0}")]
    Unresolved(String),
    /// The concrete type exposes no constructor
    #[error("No usable constructor for: {0}")]
    NoUsableConstructor(&'static str),
    /// A singleton or scoped storager was asked to store a second instance
    #[error("Instance already saved for: {0}")]
    DoubleSave(String),
    /// A build re-entered its own descriptor on the same call chain (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum build nesting depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A pool factory hit an upstream capacity limit
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A user factory, constructor or init method reported a failure
    #[error("Factory failed: {0}")]
    Factory(String),
    /// Invalid container configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Background infrastructure (the pool sweeper) could not be started
    #[error("Background task failed: {0}")]
    Background(String),
}

impl DiError {
    /// Convenience constructor for factory failures.
    pub fn factory(message: impl Into<String>) -> Self {
        DiError::Factory(message.into())
    }
}

/// Result type for DI operations
///
/// # Examples
///
/// ```rust
/// use proxy_di::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::Unresolved("some_service".to_string()))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
