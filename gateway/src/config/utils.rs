use std::env;
use std::str::FromStr;

/// Read a non-empty environment variable
pub(super) fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable, `Ok(None)` when unset
pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: '{raw}' ({e})")),
        None => Ok(None),
    }
}

/// Split a `|`-separated list, dropping empty entries
///
/// Filler phrases contain commas, so commas cannot be the separator here.
pub(super) fn parse_pipe_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipe_list() {
        let list = parse_pipe_list("Hold on, please...| Checking... ||");
        assert_eq!(list, vec!["Hold on, please...", "Checking..."]);
    }

    #[test]
    fn test_parse_pipe_list_empty() {
        assert!(parse_pipe_list(" | ").is_empty());
    }
}
