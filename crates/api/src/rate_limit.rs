//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP limits on the prediction endpoint via tower_governor.

use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tracing::warn;

/// Governor config with `X-RateLimit-*` headers enabled
pub type PredictGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests that may be made back to back
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 2,
            burst_size: 5,
        }
    }
}

/// Build the governor config, `None` if the quota is unusable.
///
/// Keys on the peer IP, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<PredictGovernorConfig>> {
    let built = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish();
    if built.is_none() {
        warn!("Invalid rate limit {:?}, rate limiting disabled", config);
    }
    built.map(Arc::new)
}

/// Layer enforcing the quota
pub fn governor_layer(
    config: &RateLimitConfig,
) -> Option<GovernorLayer<PeerIpKeyExtractor, StateInformationMiddleware>> {
    create_governor_config(config).map(|config| GovernorLayer { config })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.per_second, 2);
        assert_eq!(config.burst_size, 5);
    }

    #[test]
    fn test_create_governor_config() {
        let governor = create_governor_config(&RateLimitConfig::default());
        assert!(governor.is_some());
    }

    #[test]
    fn test_zero_burst_is_rejected() {
        let config = RateLimitConfig {
            per_second: 1,
            burst_size: 0,
        };
        assert!(create_governor_config(&config).is_none());
        assert!(governor_layer(&config).is_none());
    }
}
