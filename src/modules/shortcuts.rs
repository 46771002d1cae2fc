//! Saved command shortcuts shown as an inline keyboard

use anyhow::Result;
use async_trait::async_trait;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;
use tracing::debug;

use super::{Module, Reply, Request};
use crate::bot::ui_builder::button_column;
use crate::db::{self, Shortcut};
use crate::localization::{t, t_args};

const KEY: &str = "/shortcuts";

#[derive(Debug, PartialEq, Eq)]
enum Action<'a> {
    Menu,
    Show,
    Modify,
    Help,
    Unknown(&'a str),
}

impl<'a> Action<'a> {
    fn parse(arg: Option<&'a str>) -> Self {
        match arg {
            None => Action::Menu,
            Some("show") => Action::Show,
            Some("modify") => Action::Modify,
            Some("help") => Action::Help,
            Some(other) => Action::Unknown(other),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Change {
    Add,
    Delete,
    Edit,
    Unknown(String),
}

impl Change {
    fn parse(arg: &str) -> Self {
        match arg.to_lowercase().as_str() {
            "add" => Change::Add,
            "delete" => Change::Delete,
            "edit" => Change::Edit,
            other => Change::Unknown(other.to_string()),
        }
    }
}

/// Render the numbered shortcut list
fn format_list(shortcuts: &[Shortcut]) -> String {
    let mut text = format!("\n{}\n", t("shortcuts-list-header"));

    if shortcuts.is_empty() {
        text.push_str(&t("shortcuts-list-none"));
        text.push('\n');
    }

    for (i, shortcut) in shortcuts.iter().enumerate() {
        text.push_str(&format!(
            "{i}. {} '{}'\n",
            html::escape(&shortcut.name),
            html::escape(&shortcut.command)
        ));
    }

    text
}

fn parse_index(arg: &str, len: usize) -> Result<usize, String> {
    let index: usize = arg
        .parse()
        .map_err(|_| format!("'{arg}' is not a valid index"))?;
    if index >= len {
        return Err(format!("index {index} out of range, {len} shortcut(s) saved"));
    }
    Ok(index)
}

/// Saved shortcut list and its editor
pub struct ShortcutsModule;

impl ShortcutsModule {
    async fn show(request: &Request<'_>) -> Result<Reply> {
        let shortcuts = db::get_shortcuts(request.db.pool(), request.user_id()).await?;
        let responder = request.responder();

        if shortcuts.is_empty() {
            return Ok(Reply::one(responder.text(&t("shortcuts-empty"), None)));
        }

        let keyboard = button_column(
            shortcuts
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("{i}. {}", s.name), s.command.clone())),
        );
        Ok(Reply::one(responder.menu(&t("shortcuts-saved-list"), keyboard)))
    }

    async fn modify(request: &Request<'_>) -> Result<Reply> {
        let user_id = request.user_id();
        let pool = request.db.pool();
        let base = request.head(2);
        let responder = request.responder().with_args(base);
        // Every modify step keeps the editor open
        let reply = |text: String| -> Result<Reply> {
            Ok(Reply::one(responder.text(&text, None)).listening(base))
        };

        if request.argc() == 2 {
            let shortcuts = db::get_shortcuts(pool, user_id).await?;
            let text = format!("{}\n{}", t("shortcuts-modify-prompt"), format_list(&shortcuts));
            return Ok(Reply::one(request.responder().text(&text, None)).listening(request.args));
        }

        if request.argc() < 4 {
            return reply(t_args(
                "shortcuts-not-enough-args",
                &[("count", &request.argc().to_string())],
            ));
        }

        let mut shortcuts = db::get_shortcuts(pool, user_id).await?;
        let args = request.args;

        match Change::parse(&args[2]) {
            Change::Add => {
                if args.len() != 5 {
                    return reply(t("shortcuts-add-arity"));
                }
                shortcuts.push(Shortcut {
                    name: args[3].clone(),
                    command: args[4].clone(),
                });
                db::save_shortcuts(pool, user_id, &shortcuts).await?;
                debug!(user_id, count = shortcuts.len(), "Shortcut added");
                reply(format!("{}\n{}", t("shortcuts-added"), format_list(&shortcuts)))
            }
            Change::Delete => {
                let indexes: Result<Vec<usize>, String> =
                    args[3..].iter().map(|a| parse_index(a, shortcuts.len())).collect();
                let indexes = match indexes {
                    Ok(indexes) => indexes,
                    Err(detail) => {
                        return reply(t_args("shortcuts-invalid-indexes", &[("detail", &detail)]));
                    }
                };

                let mut position = 0;
                shortcuts.retain(|_| {
                    let keep = !indexes.contains(&position);
                    position += 1;
                    keep
                });
                db::save_shortcuts(pool, user_id, &shortcuts).await?;
                debug!(user_id, count = shortcuts.len(), "Shortcuts deleted");
                reply(format!("{}\n{}", t("shortcuts-deleted"), format_list(&shortcuts)))
            }
            Change::Edit => {
                if args.len() != 6 {
                    return reply(t("shortcuts-edit-arity"));
                }
                let index = match parse_index(&args[3], shortcuts.len()) {
                    Ok(index) => index,
                    Err(detail) => {
                        return reply(t_args("shortcuts-invalid-index", &[("detail", &detail)]));
                    }
                };
                shortcuts[index] = Shortcut {
                    name: args[4].clone(),
                    command: args[5].clone(),
                };
                db::save_shortcuts(pool, user_id, &shortcuts).await?;
                reply(format!("{}\n{}", t("shortcuts-edited"), format_list(&shortcuts)))
            }
            Change::Unknown(action) => {
                reply(t_args("shortcuts-unexpected-action", &[("action", &action)]))
            }
        }
    }
}

#[async_trait]
impl Module for ShortcutsModule {
    fn key(&self) -> &str {
        KEY
    }

    fn description(&self) -> &str {
        "Set custom inline keyboard"
    }

    async fn handle(&self, request: &Request<'_>) -> Result<Reply> {
        match Action::parse(request.arg(1)) {
            Action::Menu => {
                let keyboard = InlineKeyboardMarkup::new(vec![vec![
                    InlineKeyboardButton::callback(t("shortcuts-menu-show"), format!("{KEY} show")),
                    InlineKeyboardButton::callback(t("shortcuts-menu-modify"), format!("{KEY} modify")),
                    InlineKeyboardButton::callback(t("shortcuts-menu-help"), format!("{KEY} help")),
                ]]);
                Ok(Reply::one(request.responder().menu(&t("ui-select-option"), keyboard)))
            }
            Action::Show => Self::show(request).await,
            Action::Modify => Self::modify(request).await,
            Action::Help => {
                let text = t_args("shortcuts-help", &[("key", KEY)]);
                Ok(Reply::one(request.responder().text(&text, None)))
            }
            Action::Unknown(argument) => {
                let text = t_args("shortcuts-unexpected-argument", &[("argument", argument)]);
                Ok(Reply::one(request.responder().with_args(request.head(1)).exception(&text)))
            }
        }
    }
}

/// Shorthand for `/shortcuts show`
pub struct ScShowModule;

#[async_trait]
impl Module for ScShowModule {
    fn key(&self) -> &str {
        "/scshow"
    }

    fn description(&self) -> &str {
        "Show Saved Shortcuts"
    }

    async fn handle(&self, request: &Request<'_>) -> Result<Reply> {
        let args = vec![KEY.to_string(), "show".to_string()];
        let request = Request {
            args: &args,
            ..*request
        };
        ShortcutsModule::show(&request).await
    }
}
