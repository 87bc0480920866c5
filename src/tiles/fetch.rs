//! Remote tile sources and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::DistillConfig;

use super::{TileError, TileKey};

/// Anything that can produce raw tile bytes for a key.
///
/// One call is one attempt; retry policy lives in [`super::TileCache`].
pub trait TileSource {
    fn fetch(&self, key: TileKey) -> Result<Vec<u8>, TileError>;
}

/// Terrarium tiles over HTTPS.
pub struct HttpTileSource {
    config: DistillConfig,
    client: reqwest::blocking::Client,
}

impl HttpTileSource {
    pub fn new(config: DistillConfig) -> Result<Self, TileError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TileError::Transport {
                key: TileKey::new(0, 0, 0),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { config, client })
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, key: TileKey) -> Result<Vec<u8>, TileError> {
        let url = self.config.tile_url_for(key.z, key.x, key.y);

        let response = self.client.get(&url).send().map_err(|e| TileError::Transport {
            key,
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(TileError::Status {
                key,
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|e| TileError::Transport {
            key,
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Cooperative cancellation for a distillation run: an explicit flag that
/// any clone can raise, plus an optional deadline.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Err if cancelled or past the deadline.
    pub fn check(&self) -> Result<(), TileError> {
        if self.is_cancelled() {
            return Err(TileError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(TileError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert!(matches!(token.check(), Err(TileError::Cancelled)));
    }

    #[test]
    fn test_deadline() {
        let past = CancelToken::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(past.check(), Err(TileError::DeadlineExceeded)));
        let future = CancelToken::with_deadline(Instant::now() + Duration::from_secs(60));
        assert!(future.check().is_ok());
    }
}
