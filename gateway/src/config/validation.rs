use url::Url;

use super::ServerConfig;
use crate::core::audio::chunk_size_bytes;

/// Validate a fully merged configuration
pub(super) fn validate_config(config: &ServerConfig) -> Result<(), String> {
    if config.port == 0 {
        return Err("port must be non-zero".to_string());
    }

    validate_base_url(&config.upstream.base_url)?;

    let upstream = &config.upstream;
    if upstream.connect_timeout_seconds == 0
        || upstream.request_timeout_seconds == 0
        || upstream.idle_timeout_seconds == 0
    {
        return Err("upstream timeouts must be greater than zero".to_string());
    }

    let audio = &config.audio_demo;
    if chunk_size_bytes(audio.sample_rate, audio.chunk_duration_ms) == 0 {
        return Err(format!(
            "audio_demo sample_rate={} and chunk_duration_ms={} give an empty chunk",
            audio.sample_rate, audio.chunk_duration_ms
        ));
    }

    if config.rag.filler_messages.is_empty() {
        return Err("rag.filler_messages must contain at least one phrase".to_string());
    }

    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), String> {
    let url = Url::parse(base_url).map_err(|e| format!("Invalid upstream base_url: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Invalid upstream base_url scheme '{other}', expected http or https"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_chunk_is_rejected() {
        let mut config = ServerConfig::default();
        config.audio_demo.chunk_duration_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("empty chunk"));
    }

    #[test]
    fn test_empty_filler_set_is_rejected() {
        let mut config = ServerConfig::default();
        config.rag.filler_messages.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = ServerConfig::default();
        config.upstream.idle_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_base_url_scheme() {
        assert!(validate_base_url("http://localhost:8080/v1").is_ok());
        assert!(validate_base_url("ftp://example.com").unwrap_err().contains("base_url"));
        assert!(validate_base_url("not a url").is_err());
    }
}
