use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. YAML values override
/// environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   tls:
///     enabled: true
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// upstream:
///   api_key: "your-provider-key"
///   base_url: "https://api.openai.com/v1"
///   default_model: "gpt-4o-mini"
///   connect_timeout_seconds: 10
///   request_timeout_seconds: 60
///   idle_timeout_seconds: 120
///
/// audio_demo:
///   text_path: "./file.txt"
///   pcm_path: "./file.pcm"
///   sample_rate: 16000
///   chunk_duration_ms: 40
///
/// rag:
///   filler_messages:
///     - "Just a moment, I'm thinking..."
///
/// security:
///   cors_allowed_origins: "*"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub upstream: Option<UpstreamYaml>,
    pub audio_demo: Option<AudioDemoYaml>,
    pub rag: Option<RagYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Upstream provider settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub connect_timeout_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub idle_timeout_seconds: Option<u64>,
}

/// Audio demo resources from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioDemoYaml {
    pub text_path: Option<String>,
    pub pcm_path: Option<String>,
    pub sample_rate: Option<u32>,
    pub chunk_duration_ms: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RagYaml {
    pub filler_messages: Option<Vec<String>>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 3001
  tls:
    enabled: true
    cert_path: "/tmp/cert.pem"
    key_path: "/tmp/key.pem"

upstream:
  api_key: "sk-yaml"
  base_url: "https://llm.example.com/v1"
  default_model: "gpt-4o"
  connect_timeout_seconds: 5
  request_timeout_seconds: 30
  idle_timeout_seconds: 90

audio_demo:
  text_path: "/data/greeting.txt"
  pcm_path: "/data/greeting.pcm"
  sample_rate: 16000
  chunk_duration_ms: 40

rag:
  filler_messages:
    - "Hold on..."
    - "Checking..."

security:
  cors_allowed_origins: "*"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(3001));
        let tls = server.tls.unwrap();
        assert_eq!(tls.enabled, Some(true));
        assert_eq!(tls.cert_path.as_deref(), Some("/tmp/cert.pem"));

        let upstream = config.upstream.unwrap();
        assert_eq!(upstream.api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(upstream.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(upstream.idle_timeout_seconds, Some(90));

        let audio = config.audio_demo.unwrap();
        assert_eq!(audio.pcm_path.as_deref(), Some("/data/greeting.pcm"));
        assert_eq!(audio.chunk_duration_ms, Some(40));

        assert_eq!(config.rag.unwrap().filler_messages.unwrap().len(), 2);
        assert_eq!(
            config.security.unwrap().cors_allowed_origins.as_deref(),
            Some("*")
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
upstream:
  default_model: "gpt-4o-mini"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.server.is_none());
        assert!(config.audio_demo.is_none());
        let upstream = config.upstream.unwrap();
        assert!(upstream.api_key.is_none());
        assert_eq!(upstream.default_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.upstream.is_none());
        assert!(config.rag.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: 9100\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.server.unwrap().port, Some(9100));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.yaml");
        fs::write(&path, "invalid: yaml: [content").unwrap();

        let result = YamlConfig::from_file(&path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
