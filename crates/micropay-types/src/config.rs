//! Configuration for a settlement engine instance.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{MicropayError, Result, constants};

/// Static configuration of one engine instance. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The only identity allowed to submit claim batches.
    pub collector: Address,
    /// The engine's own identity. Bound into every signed message and used
    /// as the custody account inside the value store.
    pub domain: Address,
    /// Whether zero-amount vouchers are accepted. Off by default.
    #[serde(default)]
    pub allow_zero_amount: bool,
    /// Maximum vouchers per claim batch.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_max_batch_size() -> usize {
    constants::DEFAULT_MAX_BATCH_SIZE
}

impl EngineConfig {
    /// Config with default policy for the given collector and domain.
    #[must_use]
    pub fn new(collector: Address, domain: Address) -> Self {
        Self {
            collector,
            domain,
            allow_zero_amount: false,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_zero_amounts(mut self, allow: bool) -> Self {
        self.allow_zero_amount = allow;
        self
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.collector.is_zero() {
            return Err(MicropayError::Configuration(
                "collector must not be the zero address".into(),
            ));
        }
        if self.domain.is_zero() {
            return Err(MicropayError::Configuration(
                "domain must not be the zero address".into(),
            ));
        }
        if self.collector == self.domain {
            return Err(MicropayError::Configuration(
                "collector and domain must differ".into(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(MicropayError::Configuration(
                "max_batch_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::new(Address::repeat_byte(0xc0), Address::repeat_byte(0xd0))
    }

    #[test]
    fn defaults() {
        let cfg = config();
        assert!(!cfg.allow_zero_amount);
        assert_eq!(cfg.max_batch_size, 1024);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_addresses() {
        let cfg = EngineConfig::new(Address::ZERO, Address::repeat_byte(0xd0));
        assert!(matches!(cfg.validate(), Err(MicropayError::Configuration(_))));

        let cfg = EngineConfig::new(Address::repeat_byte(0xc0), Address::ZERO);
        assert!(matches!(cfg.validate(), Err(MicropayError::Configuration(_))));
    }

    #[test]
    fn rejects_collector_equal_to_domain() {
        let cfg = EngineConfig::new(Address::repeat_byte(0xc0), Address::repeat_byte(0xc0));
        assert!(matches!(cfg.validate(), Err(MicropayError::Configuration(_))));
    }

    #[test]
    fn rejects_zero_batch_limit() {
        let cfg = config().with_max_batch_size(0);
        assert!(matches!(cfg.validate(), Err(MicropayError::Configuration(_))));
    }

    #[test]
    fn missing_policy_fields_take_defaults() {
        let json = r#"{
            "collector": "0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0",
            "domain": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0"
        }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg, config());
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = config().with_zero_amounts(true).with_max_batch_size(8);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
