use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::sync::LazyLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

const EN_RESOURCE: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the bot
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a localization manager with the bundled English messages
    pub fn new() -> Result<Self> {
        Self::from_source("en", EN_RESOURCE)
    }

    /// Create a localization manager from Fluent source text
    pub fn from_source(locale: &str, source: &str) -> Result<Self> {
        let locale: LanguageIdentifier = locale.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders Unicode isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Conflicting Fluent messages: {errors:?}"))?;

        Ok(Self { bundle })
    }

    fn empty() -> Self {
        let mut bundle = FluentBundle::new_concurrent(Vec::new());
        bundle.set_use_isolating(false);
        Self { bundle }
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let mut errors = Vec::new();
        let value = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key, errors = ?errors, "Fluent formatting reported errors");
        }
        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.get_message(key, Some(&fluent_args))
    }
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(|| {
    LocalizationManager::new().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load bundled messages");
        LocalizationManager::empty()
    })
});

/// Validate the bundled messages and initialize the global manager
pub fn init_localization() -> Result<()> {
    LocalizationManager::new()?;
    LazyLock::force(&LOCALIZATION_MANAGER);
    Ok(())
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    LOCALIZATION_MANAGER.get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    LOCALIZATION_MANAGER.get_message_with_args(key, args)
}
