//! Ledger backends for repasseweb
//!
//! Two implementations of [`LedgerBackend`]: an in-process store seeded from
//! YAML, and a client for a hosted database exposed through PostgREST.

pub mod error;
pub mod memory;
pub mod postgrest;

use std::sync::Arc;

use repasseweb_config::{BackendConfig, BackendKind};
use repasseweb_core::BackendRef;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryBackend, Seed};
pub use postgrest::{PostgrestBackend, QueryParams};

/// Build the backend selected in the configuration
///
/// A memory backend without a seed file starts from the bundled demo data.
pub fn build_backend(config: &BackendConfig) -> StoreResult<BackendRef> {
    let backend: BackendRef = match config.kind {
        BackendKind::Memory => match &config.seed_file {
            Some(path) => Arc::new(MemoryBackend::from_seed_file(path)?),
            None => {
                log::info!("No seed file configured, loading demo data");
                Arc::new(MemoryBackend::from_seed(Seed::demo()?))
            }
        },
        BackendKind::Postgrest => Arc::new(PostgrestBackend::from_config(config)?),
    };
    log::info!("Using {} backend", backend.name());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_backend_with_demo_seed() {
        let backend = build_backend(&BackendConfig::default()).unwrap();
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn test_build_postgrest_backend() {
        let config = BackendConfig {
            kind: BackendKind::Postgrest,
            url: "https://project.example.co".to_string(),
            api_key: "anon".to_string(),
            seed_file: None,
        };
        assert_eq!(build_backend(&config).unwrap().name(), "postgrest");
    }

    #[test]
    fn test_missing_seed_file() {
        let config = BackendConfig {
            seed_file: Some("/nonexistent/seed.yaml".into()),
            ..BackendConfig::default()
        };
        assert!(matches!(build_backend(&config), Err(StoreError::SeedIo { .. })));
    }
}
