//! `_file` reference resolution (spec §6.3): for `(value, value_file)` field
//! pairs, reads `value_file`, trims whitespace, and fills `value` only if it
//! is still unset — so an explicit YAML/env value always wins over a file.

use crate::{ConfigError, GatewayConfig};
use std::path::Path;

fn resolve(value: &mut Option<String>, file_ref: &Option<String>) -> Result<(), ConfigError> {
    if value.is_some() {
        return Ok(());
    }
    let Some(path) = file_ref else { return Ok(()) };
    let contents = std::fs::read_to_string(Path::new(path))
        .map_err(|source| ConfigError::FileRef { path: path.clone(), source })?;
    *value = Some(contents.trim().to_string());
    Ok(())
}

pub fn resolve_file_refs(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    resolve(&mut config.engine.api_key, &config.engine.api_key_file.clone())?;

    if let Some(postgres) = &mut config.storage.postgres {
        let dsn_file = postgres.dsn_file.clone();
        resolve(&mut postgres.dsn, &dsn_file)?;
    }

    for server in &mut config.mcp.servers {
        if let Some(auth) = &mut server.auth {
            let client_id_file = auth.client_id_file.clone();
            resolve(&mut auth.client_id, &client_id_file)?;
            let client_secret_file = auth.client_secret_file.clone();
            resolve(&mut auth.client_secret, &client_secret_file)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{McpAuthConfig, McpServerConfig};

    #[test]
    fn file_reference_fills_unset_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_key.txt");
        std::fs::write(&path, "sk-from-file\n").unwrap();

        let mut config = GatewayConfig::default();
        config.engine.api_key_file = Some(path.to_string_lossy().to_string());
        resolve_file_refs(&mut config).unwrap();
        assert_eq!(config.engine.api_key.as_deref(), Some("sk-from-file"));
    }

    #[test]
    fn explicit_value_wins_over_file_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_key.txt");
        std::fs::write(&path, "sk-from-file\n").unwrap();

        let mut config = GatewayConfig::default();
        config.engine.api_key = Some("sk-explicit".to_string());
        config.engine.api_key_file = Some(path.to_string_lossy().to_string());
        resolve_file_refs(&mut config).unwrap();
        assert_eq!(config.engine.api_key.as_deref(), Some("sk-explicit"));
    }

    #[test]
    fn mcp_server_auth_file_refs_resolve_independently() {
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret.txt");
        std::fs::write(&secret_path, "s3cr3t").unwrap();

        let mut config = GatewayConfig::default();
        config.mcp.servers.push(McpServerConfig {
            name: "search".to_string(),
            transport: "http".to_string(),
            url: "https://mcp.example.com".to_string(),
            headers: Default::default(),
            auth: Some(McpAuthConfig {
                kind: "oauth".to_string(),
                client_secret_file: Some(secret_path.to_string_lossy().to_string()),
                ..Default::default()
            }),
        });

        resolve_file_refs(&mut config).unwrap();
        assert_eq!(
            config.mcp.servers[0].auth.as_ref().unwrap().client_secret.as_deref(),
            Some("s3cr3t")
        );
    }
}
