//! # Localization Tests
//!
//! Checks the bundled Fluent messages against the keys the bot looks up.

use hookbot::localization::{t, t_args, LocalizationManager};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Every literal message key passed to `t` or `t_args` under `src/`
fn keys_used_in_source() -> BTreeSet<String> {
    let pattern = Regex::new(r#"\bt(?:_args)?\(\s*"([a-z0-9-]+)""#).unwrap();
    let mut keys = BTreeSet::new();
    let mut pending = vec![Path::new(env!("CARGO_MANIFEST_DIR")).join("src")];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                let source = fs::read_to_string(&path).unwrap();
                keys.extend(pattern.captures_iter(&source).map(|c| c[1].to_string()));
            }
        }
    }

    keys
}

/// Whether `message` is the placeholder rendered for an absent key
fn is_fallback(key: &str, message: &str) -> bool {
    message == format!("Missing translation: {key}") || message == format!("Missing value for key: {key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_every_used_key_exists() {
        let manager = setup_localization();
        let keys = keys_used_in_source();
        assert!(keys.len() > 40, "only found {} keys", keys.len());

        let missing: Vec<_> = keys
            .iter()
            .filter(|key| is_fallback(key, &manager.get_message(key, None)))
            .collect();
        assert!(missing.is_empty(), "missing messages: {missing:?}");
    }

    #[test]
    fn test_region_names_exist() {
        let manager = setup_localization();
        for region in ["north", "south", "east", "west", "central"] {
            let message = manager.get_message(&format!("weather-region-{region}"), None);
            assert!(!is_fallback(&format!("weather-region-{region}"), &message), "no name for {region}");
        }
    }

    #[test]
    fn test_messages_starting_with_missing_are_real() {
        let manager = setup_localization();
        let message = manager.get_message("catgpt-missing-credentials", None);
        assert!(!is_fallback("catgpt-missing-credentials", &message));
        assert!(message.starts_with("Missing email"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();
        let message = manager.get_message("nonexistent-key", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_arguments_have_no_isolation_marks() {
        let message = t_args("ui-timestamp", &[("timestamp", "12:00:00")]);
        assert_eq!(message, "ts: 12:00:00");
    }

    #[test]
    fn test_unknown_command_message() {
        let message = t_args("error-unknown-command", &[("command", "/doesnotexist")]);
        assert!(message.contains("<code>/doesnotexist</code>"));
    }

    #[test]
    fn test_global_accessor() {
        assert_eq!(t("ui-back"), "<< Back <<");
    }

    #[test]
    fn test_from_source_rejects_invalid_fluent() {
        assert!(LocalizationManager::from_source("en", "this is not fluent").is_err());
        assert!(LocalizationManager::from_source("not a locale!", "a = b").is_err());
    }
}
