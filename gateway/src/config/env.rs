use std::path::PathBuf;

use super::utils::{env_parse, env_string, parse_pipe_list};
use super::{ApiKey, ServerConfig, TlsConfig};

/// Build a configuration from environment variables on top of the defaults
///
/// Recognised variables:
/// - `HOST`, `PORT`
/// - `TLS_CERT_PATH`, `TLS_KEY_PATH`
/// - `YOUR_LLM_API_KEY` (alias `LLM_API_KEY`), `LLM_BASE_URL`, `LLM_DEFAULT_MODEL`
/// - `LLM_CONNECT_TIMEOUT_SECONDS`, `LLM_REQUEST_TIMEOUT_SECONDS`, `LLM_IDLE_TIMEOUT_SECONDS`
/// - `AUDIO_TEXT_PATH`, `AUDIO_PCM_PATH`, `AUDIO_SAMPLE_RATE`, `AUDIO_CHUNK_DURATION_MS`
/// - `RAG_FILLER_MESSAGES` (`|`-separated)
/// - `CORS_ALLOWED_ORIGINS`
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse::<u16>("PORT")? {
        config.port = port;
    }

    config.tls = match (env_string("TLS_CERT_PATH"), env_string("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    };

    let upstream = &mut config.upstream;
    upstream.api_key = env_string("YOUR_LLM_API_KEY")
        .or_else(|| env_string("LLM_API_KEY"))
        .map(ApiKey::new);
    if let Some(base_url) = env_string("LLM_BASE_URL") {
        upstream.base_url = base_url;
    }
    upstream.default_model = env_string("LLM_DEFAULT_MODEL");
    if let Some(secs) = env_parse::<u64>("LLM_CONNECT_TIMEOUT_SECONDS")? {
        upstream.connect_timeout_seconds = secs;
    }
    if let Some(secs) = env_parse::<u64>("LLM_REQUEST_TIMEOUT_SECONDS")? {
        upstream.request_timeout_seconds = secs;
    }
    if let Some(secs) = env_parse::<u64>("LLM_IDLE_TIMEOUT_SECONDS")? {
        upstream.idle_timeout_seconds = secs;
    }

    let audio = &mut config.audio_demo;
    if let Some(path) = env_string("AUDIO_TEXT_PATH") {
        audio.text_path = PathBuf::from(path);
    }
    if let Some(path) = env_string("AUDIO_PCM_PATH") {
        audio.pcm_path = PathBuf::from(path);
    }
    if let Some(rate) = env_parse::<u32>("AUDIO_SAMPLE_RATE")? {
        audio.sample_rate = rate;
    }
    if let Some(ms) = env_parse::<u32>("AUDIO_CHUNK_DURATION_MS")? {
        audio.chunk_duration_ms = ms;
    }

    if let Some(raw) = env_string("RAG_FILLER_MESSAGES") {
        config.rag.filler_messages = parse_pipe_list(&raw);
    }

    config.cors_allowed_origins = env_string("CORS_ALLOWED_ORIGINS");

    Ok(config)
}
