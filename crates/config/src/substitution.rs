use anyhow::Result;
use regex::Regex;
use std::env;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("placeholder pattern is valid"))
}

/// Substitute environment variables written as `${VAR_NAME}` or `$VAR_NAME`.
///
/// Unset variables keep their placeholder; validation reports them later.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    substitute_with(content, |name| env::var(name).ok())
}

/// Substitution with a custom variable lookup
pub fn substitute_with<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();

    let result = placeholder_pattern().replace_all(content, |caps: &regex::Captures<'_>| {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return whole.to_string();
        };
        match lookup(name) {
            Some(value) => {
                debug!("Substituting environment variable: {}", name);
                value
            }
            None => {
                warn!("Environment variable '{}' not set", name);
                missing.push(name.to_string());
                whole.to_string()
            }
        }
    });

    if !missing.is_empty() {
        debug!("Unresolved environment variables: {:?}", missing);
    }

    Ok(result.into_owned())
}

/// Names of placeholders still present in `content`
pub fn unresolved_env_vars(content: &str) -> Vec<String> {
    placeholder_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn has_unresolved_env_vars(content: &str) -> bool {
    placeholder_pattern().is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "BTH_KRAKEN_API_KEY" => Some("key-123".to_string()),
            "PORT" => Some("5501".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_both_placeholder_forms_are_substituted() {
        let out = substitute_with("key: ${BTH_KRAKEN_API_KEY}\nport: $PORT", lookup).unwrap();
        assert_eq!(out, "key: key-123\nport: 5501");
    }

    #[test]
    fn test_missing_variables_keep_placeholder() {
        let out = substitute_with("secret: ${BTH_KRAKEN_PRIVATE_KEY}", lookup).unwrap();
        assert_eq!(out, "secret: ${BTH_KRAKEN_PRIVATE_KEY}");
        assert!(has_unresolved_env_vars(&out));
        assert_eq!(unresolved_env_vars(&out), vec!["BTH_KRAKEN_PRIVATE_KEY"]);
    }

    #[test]
    fn test_plain_text_untouched() {
        assert!(!has_unresolved_env_vars("wss://ws-auth.kraken.com"));
        assert_eq!(substitute_with("a: 1", lookup).unwrap(), "a: 1");
    }
}
