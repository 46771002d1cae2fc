mod common;

use common::*;
use hookbot::bot::process_update;
use hookbot::directive::{Directive, Target};
use hookbot::errors::BotError;
use hookbot::session::{SessionKey, SessionState};
use hookbot::update::InboundUpdate;
use teloxide::types::{CallbackQueryId, ChatId, MessageId};
use teloxide::{ApiError, RequestError};

fn key() -> SessionKey {
    SessionKey::new(CHAT, USER)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A listening session turns plain text into more arguments for the pending command
    #[tokio::test]
    async fn test_continuation_appends_input() {
        let (app, calls) = recorder_app().await;
        app.sessions.set(key(), "/record modify add", true).await.unwrap();

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("foo bar")).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, strings(&["/record", "modify", "add", "foo", "bar"]));
        assert!(!calls[0].listening);
    }

    /// A continuation answered without a new listen request closes the session
    #[tokio::test]
    async fn test_finished_continuation_closes_session() {
        let (app, calls) = recorder_app().await;

        app.sessions.set(key(), "/record", true).await.unwrap();
        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &group("noop")).await.unwrap();
        assert_eq!(outbound.bodies(), strings(&["same", "after"]));

        let state = app.sessions.get(key()).await.unwrap();
        assert!(!state.listening);
        assert_eq!(state.pending_command, "/record noop");

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &group("just chatting")).await.unwrap();
        assert!(outbound.sent().is_empty());
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    /// A continuation that asks for more input keeps the session open
    #[tokio::test]
    async fn test_continuation_can_keep_listening() {
        let (app, _) = recorder_app().await;
        app.sessions.set(key(), "/record listen", true).await.unwrap();

        process_update(&app, &RecordingOutbound::new(), &private("more")).await.unwrap();

        let state = app.sessions.get(key()).await.unwrap();
        assert!(state.listening);
        assert_eq!(state.pending_tokens().unwrap(), strings(&["/record", "listen", "more"]));
    }

    /// A failing continuation still closes the session
    #[tokio::test]
    async fn test_failed_continuation_closes_session() {
        let (app, _) = recorder_app().await;
        app.sessions.set(key(), "/record", true).await.unwrap();

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("fail")).await.unwrap();

        assert!(outbound.bodies()[0].starts_with("Unexpected error"));
        assert!(!app.sessions.get(key()).await.unwrap().listening);
    }

    /// Continuations work in group chats too
    #[tokio::test]
    async fn test_continuation_in_group() {
        let (app, calls) = recorder_app().await;
        app.sessions.set(key(), "/record", true).await.unwrap();

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &group("north")).await.unwrap();

        assert_eq!(calls.lock().unwrap()[0].args, strings(&["/record", "north"]));
        assert_eq!(outbound.bodies(), vec!["echo /record|north".to_string()]);
    }

    /// A fresh command closes the session before the module runs
    #[tokio::test]
    async fn test_fresh_command_resets_session() {
        let (app, calls) = recorder_app().await;
        app.sessions.set(key(), "/record listen", true).await.unwrap();

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/record again")).await.unwrap();

        assert!(!calls.lock().unwrap()[0].listening);
        let state = app.sessions.get(key()).await.unwrap();
        assert_eq!(
            state,
            SessionState {
                listening: false,
                pending_command: "/record again".to_string(),
            }
        );
    }

    /// The reset command leaves the stored session untouched
    #[tokio::test]
    async fn test_reset_command_keeps_session() {
        let (app, _) = recorder_app().await;
        app.sessions.set(key(), "/record listen", true).await.unwrap();

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/START")).await.unwrap();

        let state = app.sessions.get(key()).await.unwrap();
        assert!(state.listening);
        assert_eq!(state.pending_command, "/record listen");
        assert_eq!(outbound.messages().len(), 1);
    }

    /// Listen transitions are persisted with the module's tokens
    #[tokio::test]
    async fn test_listen_is_persisted() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/record listen")).await.unwrap();

        let state = app.sessions.get(key()).await.unwrap();
        assert!(state.listening);
        assert_eq!(state.pending_tokens().unwrap(), strings(&["/record", "listen"]));
        assert_eq!(outbound.bodies(), vec!["more?".to_string()]);
    }

    /// Sessions of other users in the same chat are not touched
    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let (app, _) = recorder_app().await;
        let other = SessionKey::new(CHAT, USER + 1);
        app.sessions.set(other, "/record listen", true).await.unwrap();

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/record")).await.unwrap();

        assert!(app.sessions.get(other).await.unwrap().listening);
    }

    /// Mentions are stripped, the key is lowercased and argument case is kept
    #[tokio::test]
    async fn test_mention_and_case() {
        let (app, calls) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/RECORD@my_bot Hello")).await.unwrap();

        assert_eq!(calls.lock().unwrap()[0].args, strings(&["/record", "Hello"]));
    }

    /// Quoted arguments become single tokens
    #[tokio::test]
    async fn test_quoted_arguments() {
        let (app, calls) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private(r#"/record "hello world" 'a b'"#))
            .await
            .unwrap();

        assert_eq!(
            calls.lock().unwrap()[0].args,
            strings(&["/record", "hello world", "a b"])
        );
    }

    /// Unbalanced quotes produce a parsing error reply and no dispatch
    #[tokio::test]
    async fn test_parse_error_reply() {
        let (app, calls) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private(r#"/record "unclosed"#)).await.unwrap();

        assert!(calls.lock().unwrap().is_empty());
        let bodies = outbound.bodies();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].starts_with("parsing error"), "got {}", bodies[0]);
    }

    /// An unknown key is reported by name and only the listening reset is stored
    #[tokio::test]
    async fn test_unknown_command() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/doesnotexist")).await.unwrap();

        let messages = outbound.messages();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Directive::SendText { text, reply_to, .. } => {
                assert!(text.contains("/doesnotexist"));
                assert_eq!(*reply_to, Some(MessageId(1)));
            }
            other => panic!("unexpected directive {other:?}"),
        }

        let state = app.sessions.get(key()).await.unwrap();
        assert_eq!(state.pending_command, "/doesnotexist");
        assert!(!state.listening);
    }

    /// Plain text with no open session is ignored in groups
    #[tokio::test]
    async fn test_non_command_in_group_is_silent() {
        let (app, calls) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &group("hello there")).await.unwrap();

        assert!(outbound.sent().is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    /// Plain text with no open session gets exactly one instruction in private chats
    #[tokio::test]
    async fn test_non_command_in_private_chat() {
        let (app, calls) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("hello there")).await.unwrap();

        let bodies = outbound.bodies();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].starts_with("ERROR: Not a command"));
        assert!(calls.lock().unwrap().is_empty());
    }

    /// "Message is not modified" is swallowed and later directives still go out
    #[tokio::test]
    async fn test_not_modified_continues_delivery() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::failing(|d| match d {
            Directive::EditText { .. } => Some(RequestError::Api(ApiError::MessageNotModified)),
            _ => None,
        });
        process_update(&app, &outbound, &private("/record noop")).await.unwrap();

        assert_eq!(outbound.bodies(), strings(&["same", "after"]));
    }

    /// Edits aimed at the last sent message use the id the first send returned
    #[tokio::test]
    async fn test_last_sent_target_is_resolved() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/record typed")).await.unwrap();

        let messages = outbound.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].target(), Some(Target::Message(MessageId(1000))));
    }

    /// A handler failure becomes one generic reply quoting the message
    #[tokio::test]
    async fn test_module_error_reply() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &private("/record fail")).await.unwrap();

        let messages = outbound.messages();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Directive::SendText { text, reply_to, .. } => {
                assert!(text.starts_with("Unexpected error"));
                assert!(text.contains("record exploded"));
                assert_eq!(*reply_to, Some(MessageId(1)));
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    /// A rejected send is reported to the user
    #[tokio::test]
    async fn test_delivery_failure_reply() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::failing(|d| match d.body() {
            Some(body) if body.starts_with("echo") => Some(RequestError::Api(ApiError::BotBlocked)),
            _ => None,
        });
        process_update(&app, &outbound, &private("/record")).await.unwrap();

        let bodies = outbound.bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[1].starts_with("Unexpected error"));
    }

    /// Callbacks are acknowledged first and errors do not quote the keyboard message
    #[tokio::test]
    async fn test_callback_is_acknowledged() {
        let (app, _) = recorder_app().await;

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &callback("/record fail", 42)).await.unwrap();

        let sent = outbound.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            Directive::AnswerCallback {
                query_id: CallbackQueryId("query-1".to_string())
            }
        );
        match &sent[1] {
            Directive::SendText { reply_to, .. } => assert_eq!(*reply_to, None),
            other => panic!("unexpected directive {other:?}"),
        }
    }

    /// Storage failures abort the update without any reply
    #[tokio::test]
    async fn test_storage_failure_is_returned() {
        let (app, calls) = recorder_app().await;
        app.db.pool().close().await;

        let outbound = RecordingOutbound::new();
        let result = process_update(&app, &outbound, &private("/record")).await;

        assert!(matches!(result, Err(BotError::Storage(_))));
        assert!(outbound.sent().is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    /// Updates without text, like a shared location, continue with an empty input
    #[tokio::test]
    async fn test_update_without_text_continues() {
        let (app, calls) = recorder_app().await;
        app.sessions.set(key(), "/record listen", true).await.unwrap();

        let update = InboundUpdate {
            text: None,
            kind: hookbot::update::UpdateKind::Location {
                latitude: 1.35,
                longitude: 103.8,
            },
            ..InboundUpdate::text(
                ChatId(CHAT),
                USER,
                hookbot::update::ChatKind::Private,
                MessageId(3),
                "",
            )
        };

        let outbound = RecordingOutbound::new();
        process_update(&app, &outbound, &update).await.unwrap();

        assert_eq!(calls.lock().unwrap()[0].args, strings(&["/record", "listen"]));
    }
}
