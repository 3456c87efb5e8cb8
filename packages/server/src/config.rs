//! Server configuration.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{DEFAULT_ROOM_CAPACITY, IceServer, MembershipUpdates, RegistrySettings};

pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT_MULTIPLIER: u32 = 3;
pub const DEFAULT_ICE_SERVER: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("ping interval must be greater than zero")]
    ZeroPingInterval,

    #[error("timeout multiplier must be greater than zero")]
    ZeroTimeoutMultiplier,

    #[error("ping interval times timeout multiplier overflows")]
    PingIntervalTooLarge,

    #[error("default room capacity must be greater than zero")]
    ZeroRoomCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Time between liveness sweeps
    pub ping_interval: Duration,
    /// A connection silent for `ping_interval * timeout_multiplier` is dropped
    pub timeout_multiplier: u32,
    pub default_room_capacity: usize,
    pub membership_updates: MembershipUpdates,
    /// Handed to clients in `setInfo`
    pub ice_servers: Vec<IceServer>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            ping_interval: DEFAULT_PING_INTERVAL,
            timeout_multiplier: DEFAULT_TIMEOUT_MULTIPLIER,
            default_room_capacity: DEFAULT_ROOM_CAPACITY,
            membership_updates: MembershipUpdates::default(),
            ice_servers: vec![IceServer {
                urls: DEFAULT_ICE_SERVER.to_string(),
            }],
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_interval.is_zero() {
            return Err(ConfigError::ZeroPingInterval);
        }
        if self.timeout_multiplier == 0 {
            return Err(ConfigError::ZeroTimeoutMultiplier);
        }
        if self.ping_interval.checked_mul(self.timeout_multiplier).is_none() {
            return Err(ConfigError::PingIntervalTooLarge);
        }
        if self.default_room_capacity == 0 {
            return Err(ConfigError::ZeroRoomCapacity);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Silence threshold for the liveness sweep. Saturates if `validate`
    /// would reject the config.
    pub fn liveness_timeout(&self) -> Duration {
        self.ping_interval.saturating_mul(self.timeout_multiplier)
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            default_room_capacity: self.default_room_capacity,
            membership_updates: self.membership_updates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        // テスト項目: デフォルト設定はバリデーションを通過する
        // given (前提条件):
        let config = ServerConfig::default();

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
        assert_eq!(config.liveness_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        // テスト項目: 0 の間隔・倍率・定員はエラーになる
        // given (前提条件):
        let zero_interval = ServerConfig {
            ping_interval: Duration::ZERO,
            ..ServerConfig::default()
        };
        let zero_multiplier = ServerConfig {
            timeout_multiplier: 0,
            ..ServerConfig::default()
        };
        let zero_capacity = ServerConfig {
            default_room_capacity: 0,
            ..ServerConfig::default()
        };

        // when (操作):
        let results = [
            zero_interval.validate(),
            zero_multiplier.validate(),
            zero_capacity.validate(),
        ];

        // then (期待する結果):
        assert_eq!(
            results,
            [
                Err(ConfigError::ZeroPingInterval),
                Err(ConfigError::ZeroTimeoutMultiplier),
                Err(ConfigError::ZeroRoomCapacity),
            ]
        );
    }

    #[test]
    fn test_overflowing_liveness_timeout_is_rejected() {
        // テスト項目: 間隔 × 倍率が Duration に収まらない設定はエラーになる
        // given (前提条件):
        let config = ServerConfig {
            ping_interval: Duration::from_secs(u64::MAX),
            ..ServerConfig::default()
        };

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Err(ConfigError::PingIntervalTooLarge));
        assert_eq!(config.liveness_timeout(), Duration::MAX);
    }

    #[test]
    fn test_registry_settings_follow_config() {
        // テスト項目: Registry の設定が ServerConfig から作られる
        // given (前提条件):
        let config = ServerConfig {
            default_room_capacity: 5,
            membership_updates: MembershipUpdates::Delta,
            ..ServerConfig::default()
        };

        // when (操作):
        let settings = config.registry_settings();

        // then (期待する結果):
        assert_eq!(settings.default_room_capacity, 5);
        assert_eq!(settings.membership_updates, MembershipUpdates::Delta);
    }
}
