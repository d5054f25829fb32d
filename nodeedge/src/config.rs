//!
//! Process-wide configuration.
//!

use once_cell::sync::Lazy;

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND: &str = "nodeedge.backends.edgedb";

/// Environment variable overriding the backend of [`Configuration::global`].
pub const BACKEND_ENV: &str = "NODEEDGE_BACKEND";

static GLOBAL: Lazy<Configuration> = Lazy::new(Configuration::from_env);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    backend: String,
}

impl Configuration {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(BACKEND_ENV) {
            Ok(backend) if !backend.is_empty() => Self::new(backend),
            _ => Self::default(),
        }
    }

    /// The configuration read once at first use.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Dotted identifier of the active backend, e.g. `nodeedge.backends.edgedb`.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn is_edgedb_backend(&self) -> bool {
        self.backend.contains("edgedb")
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_edgedb() {
        let config = Configuration::default();
        assert_eq!(config.backend(), DEFAULT_BACKEND);
        assert!(config.is_edgedb_backend());
    }

    #[test]
    fn other_backends_are_not_edgedb() {
        let config = Configuration::new("nodeedge.backends.postgres");
        assert!(!config.is_edgedb_backend());
    }
}
