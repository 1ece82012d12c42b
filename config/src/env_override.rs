//! Environment variable overrides (spec §6.3), applied after the YAML file.
//!
//! Each override is `ANTWORT_<SECTION>_<FIELD>`. Only the keys actually
//! named in spec §6.3 are recognized; anything else in the environment is
//! ignored rather than rejected, so operators can carry unrelated env vars
//! (`PATH`, `RUST_LOG`, ...) without tripping validation.

use crate::{AuthKind, BackendProviderKind, ConfigError, GatewayConfig, StorageKind};
use std::env;

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::EnvOverride {
        key: key.to_string(),
        value,
        message: e.to_string(),
    })
}

pub fn apply_env_overrides(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    if let Some(v) = var("ANTWORT_SERVER_PORT") {
        config.server.port = parse("ANTWORT_SERVER_PORT", v)?;
    }
    if let Some(v) = var("ANTWORT_SERVER_READ_TIMEOUT_SECS") {
        config.server.read_timeout_secs = parse("ANTWORT_SERVER_READ_TIMEOUT_SECS", v)?;
    }
    if let Some(v) = var("ANTWORT_SERVER_WRITE_TIMEOUT_SECS") {
        config.server.write_timeout_secs = parse("ANTWORT_SERVER_WRITE_TIMEOUT_SECS", v)?;
    }

    if let Some(v) = var("ANTWORT_ENGINE_PROVIDER") {
        config.engine.provider = match v.as_str() {
            "vllm" => BackendProviderKind::Vllm,
            "litellm" => BackendProviderKind::Litellm,
            "vllm-responses" => BackendProviderKind::VllmResponses,
            other => {
                return Err(ConfigError::EnvOverride {
                    key: "ANTWORT_ENGINE_PROVIDER".to_string(),
                    value: other.to_string(),
                    message: "expected one of vllm, litellm, vllm-responses".to_string(),
                })
            }
        };
    }
    if let Some(v) = var("ANTWORT_ENGINE_BACKEND_URL") {
        config.engine.backend_url = v;
    }
    if let Some(v) = var("ANTWORT_ENGINE_API_KEY") {
        config.engine.api_key = Some(v);
    }
    if let Some(v) = var("ANTWORT_ENGINE_API_KEY_FILE") {
        config.engine.api_key_file = Some(v);
    }
    if let Some(v) = var("ANTWORT_ENGINE_DEFAULT_MODEL") {
        config.engine.default_model = Some(v);
    }
    if let Some(v) = var("ANTWORT_ENGINE_MAX_TURNS") {
        config.engine.max_turns = parse("ANTWORT_ENGINE_MAX_TURNS", v)?;
    }

    if let Some(v) = var("ANTWORT_STORAGE_TYPE") {
        config.storage.kind = match v.as_str() {
            "memory" => StorageKind::Memory,
            "postgres" => StorageKind::Postgres,
            other => {
                return Err(ConfigError::EnvOverride {
                    key: "ANTWORT_STORAGE_TYPE".to_string(),
                    value: other.to_string(),
                    message: "expected one of memory, postgres".to_string(),
                })
            }
        };
    }
    if let Some(v) = var("ANTWORT_STORAGE_MAX_SIZE") {
        config.storage.max_size = parse("ANTWORT_STORAGE_MAX_SIZE", v)?;
    }
    if let Some(v) = var("ANTWORT_STORAGE_POSTGRES_DSN") {
        config.storage.postgres.get_or_insert_with(Default::default).dsn = Some(v);
    }
    if let Some(v) = var("ANTWORT_STORAGE_POSTGRES_DSN_FILE") {
        config.storage.postgres.get_or_insert_with(Default::default).dsn_file = Some(v);
    }

    if let Some(v) = var("ANTWORT_AUTH_TYPE") {
        config.auth.kind = match v.as_str() {
            "none" => AuthKind::None,
            "apikey" => AuthKind::Apikey,
            "jwt" => AuthKind::Jwt,
            other => {
                return Err(ConfigError::EnvOverride {
                    key: "ANTWORT_AUTH_TYPE".to_string(),
                    value: other.to_string(),
                    message: "expected one of none, apikey, jwt".to_string(),
                })
            }
        };
    }
    if let Some(v) = var("ANTWORT_AUTH_API_KEYS") {
        config.auth.api_keys = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Some(v) = var("ANTWORT_AUTH_JWT_ISSUER") {
        config.auth.jwt.get_or_insert_with(Default::default).issuer = Some(v);
    }
    if let Some(v) = var("ANTWORT_AUTH_JWT_JWKS_URL") {
        config.auth.jwt.get_or_insert_with(Default::default).jwks_url = Some(v);
    }

    if let Some(v) = var("ANTWORT_RATE_LIMIT_DEFAULT_RPM") {
        config.rate_limit.default_rpm = parse("ANTWORT_RATE_LIMIT_DEFAULT_RPM", v)?;
    }

    if let Some(v) = var("ANTWORT_OBSERVABILITY_METRICS_ENABLED") {
        config.observability.metrics.enabled = parse("ANTWORT_OBSERVABILITY_METRICS_ENABLED", v)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_var<F: FnOnce()>(key: &str, value: &str, f: F) {
        let prev = env::var(key).ok();
        env::set_var(key, value);
        f();
        match prev {
            Some(p) => env::set_var(key, p),
            None => env::remove_var(key),
        }
    }

    #[test]
    fn port_override_wins_over_default() {
        with_var("ANTWORT_SERVER_PORT", "9999", || {
            let mut config = GatewayConfig::default();
            apply_env_overrides(&mut config).unwrap();
            assert_eq!(config.server.port, 9999);
        });
    }

    #[test]
    fn invalid_provider_value_is_rejected() {
        with_var("ANTWORT_ENGINE_PROVIDER", "not-a-provider", || {
            let mut config = GatewayConfig::default();
            let err = apply_env_overrides(&mut config).unwrap_err();
            assert!(matches!(err, ConfigError::EnvOverride { .. }));
        });
    }

    #[test]
    fn api_keys_csv_splits_and_trims() {
        with_var("ANTWORT_AUTH_API_KEYS", "abc, def ,ghi", || {
            let mut config = GatewayConfig::default();
            apply_env_overrides(&mut config).unwrap();
            assert_eq!(config.auth.api_keys, vec!["abc", "def", "ghi"]);
        });
    }
}
