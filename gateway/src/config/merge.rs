use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{ApiKey, ServerConfig, TlsConfig, env};

/// Merge environment configuration (base) with optional YAML overrides
///
/// Any value present in YAML replaces the environment value; absent YAML
/// values leave the environment/default value untouched.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            config.tls = merge_tls(tls, config.tls.take())?;
        }
    }

    if let Some(upstream) = yaml.upstream {
        let target = &mut config.upstream;
        if let Some(key) = upstream.api_key {
            target.api_key = Some(ApiKey::new(key));
        }
        if let Some(base_url) = upstream.base_url {
            target.base_url = base_url;
        }
        if upstream.default_model.is_some() {
            target.default_model = upstream.default_model;
        }
        if let Some(secs) = upstream.connect_timeout_seconds {
            target.connect_timeout_seconds = secs;
        }
        if let Some(secs) = upstream.request_timeout_seconds {
            target.request_timeout_seconds = secs;
        }
        if let Some(secs) = upstream.idle_timeout_seconds {
            target.idle_timeout_seconds = secs;
        }
    }

    if let Some(audio) = yaml.audio_demo {
        let target = &mut config.audio_demo;
        if let Some(path) = audio.text_path {
            target.text_path = PathBuf::from(path);
        }
        if let Some(path) = audio.pcm_path {
            target.pcm_path = PathBuf::from(path);
        }
        if let Some(rate) = audio.sample_rate {
            target.sample_rate = rate;
        }
        if let Some(ms) = audio.chunk_duration_ms {
            target.chunk_duration_ms = ms;
        }
    }

    if let Some(fillers) = yaml.rag.and_then(|rag| rag.filler_messages) {
        config.rag.filler_messages = fillers;
    }

    if let Some(origins) = yaml.security.and_then(|s| s.cors_allowed_origins) {
        config.cors_allowed_origins = Some(origins);
    }

    Ok(config)
}

fn merge_tls(
    tls: super::yaml::TlsYaml,
    current: Option<TlsConfig>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    if tls.enabled == Some(false) {
        return Ok(None);
    }

    match (tls.cert_path, tls.key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) if tls.enabled == Some(true) && current.is_none() => {
            Err("server.tls.enabled is true but cert_path/key_path are missing".into())
        }
        (None, None) => Ok(current),
        _ => Err("server.tls.cert_path and server.tls.key_path must be set together".into()),
    }
}
