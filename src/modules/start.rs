use async_trait::async_trait;

use super::{Module, Reply, Request};
use crate::bot::ui_builder::button_column;
use crate::localization::{t, t_args};

/// Lists every registered module
pub struct StartModule;

/// `/weathersg` -> `Weathersg`
fn button_label(key: &str) -> String {
    let name = key.trim_start_matches('/');
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl Module for StartModule {
    fn key(&self) -> &str {
        "/start"
    }

    fn description(&self) -> &str {
        "Show All Modules"
    }

    async fn handle(&self, request: &Request<'_>) -> anyhow::Result<Reply> {
        let mut text = t("start-title");
        text.push('\n');
        for info in request.catalog {
            text.push('\n');
            text.push_str(&t_args(
                "start-entry",
                &[("key", &info.key), ("description", &info.description)],
            ));
        }

        // The first registration is this menu itself
        let keyboard = button_column(
            request
                .catalog
                .iter()
                .skip(1)
                .map(|info| (button_label(&info.key), info.key.clone())),
        );

        Ok(Reply::one(request.responder().menu(&text, keyboard)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_label() {
        assert_eq!(button_label("/weathersg"), "Weathersg");
        assert_eq!(button_label("/catGPT"), "Catgpt");
        assert_eq!(button_label("/"), "");
    }
}
