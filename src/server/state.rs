//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::attribution::{AttributionConfig, AttributionError, AttributionService};

/// Shared application state.
///
/// The attribution service is swapped wholesale when settings change, so
/// in-flight requests keep the service they started with.
pub struct AppState {
    /// Current attribution service.
    pub service: RwLock<Arc<AttributionService>>,
}

impl AppState {
    /// Create application state, seeding the SauceNAO key from the
    /// `SAUCENAO_API_KEY` environment variable when present.
    ///
    /// # Errors
    /// Returns an error if the attribution service cannot be created.
    pub fn new() -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let mut config = AttributionConfig::default();
        if let Ok(key) = std::env::var("SAUCENAO_API_KEY") {
            if !key.is_empty() {
                config = config.with_saucenao_key(key);
            }
        }

        let service = AttributionService::new(config)
            .map_err(|e| format!("Failed to create attribution service: {e}"))?;

        Ok(Arc::new(Self {
            service: RwLock::new(Arc::new(service)),
        }))
    }

    /// Replace the SauceNAO API key, rebuilding the service around it.
    /// An empty or absent key clears it.
    ///
    /// # Errors
    /// Returns an error if the rebuilt service cannot be created.
    pub async fn set_saucenao_key(&self, key: Option<String>) -> Result<(), AttributionError> {
        let config = {
            let current = self.service.read().await;
            current.config().clone()
        };
        let config = AttributionConfig {
            saucenao_key: key.filter(|k| !k.is_empty()),
            ..config
        };

        let service = AttributionService::new(config)?;
        *self.service.write().await = Arc::new(service);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_clear_saucenao_key() {
        let state = AppState::new().unwrap();

        state
            .set_saucenao_key(Some("key-123".to_string()))
            .await
            .unwrap();
        assert!(state.service.read().await.config().saucenao_key.is_some());

        state.set_saucenao_key(Some(String::new())).await.unwrap();
        assert!(state.service.read().await.config().saucenao_key.is_none());
    }
}
