use std::ops::ControlFlow;
use std::sync::Arc;

use teloxide::dptree::di::DependencySupplier;
use teloxide::dptree::{from_fn_with_description, HandlerDescription};
use teloxide::prelude::*;
use teloxide::types::Me;

use crate::{config::SharedConfig, types::TeloxideHandler};

/// Text following a bot command, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandArgs(pub String);

/// Splits "/cmd@bot_name args" into the command name and its arguments.
///
/// Commands addressed to another bot are dropped.
pub(crate) fn parse_command<'a>(text: &'a str, bot_username: &str) -> Option<(&'a str, CommandArgs)> {
    let text = text.trim_start().strip_prefix('/')?;
    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };

    // When sending commands in a group, a mention suffix may be attached to
    // the text. For example: "/guess@xxxx_bot".
    let name = match head.split_once('@') {
        Some((name, mention)) if mention == bot_username => name,
        Some(_) => return None,
        None => head,
    };
    if name.is_empty() {
        return None;
    }

    Some((name, CommandArgs(rest.to_owned())))
}

pub(crate) fn command_filter(cmd: &'static str) -> impl Fn(Message, Me) -> Option<CommandArgs> {
    move |msg: Message, me: Me| {
        let text = msg.text()?;
        let username = me.username.clone().unwrap_or_default();
        parse_command(text, &username)
            .filter(|(name, _)| *name == cmd)
            .map(|(_, args)| args)
    }
}

/// Wraps a handler chain so that a failed endpoint is logged and answered
/// with the generic error prompt instead of being silently dropped.
pub(crate) fn report_failures(handler: TeloxideHandler) -> TeloxideHandler {
    from_fn_with_description(
        HandlerDescription::user_defined(),
        move |container: DependencyMap, cont| {
            let handler = handler.clone();
            async move {
                match handler.execute(container.clone(), cont).await {
                    ControlFlow::Break(Err(err)) => {
                        let bot: Arc<Bot> = container.get();
                        let msg: Arc<Message> = container.get();
                        let config: Arc<SharedConfig> = container.get();
                        error!("Failed to handle message ({}): {:?}", msg.id, err);
                        if let Err(err) = bot
                            .send_message(msg.chat.id, &config.i18n.error_prompt)
                            .reply_to_message_id(msg.id)
                            .await
                        {
                            error!("Failed to report the failure: {}", err);
                        }
                        ControlFlow::Break(Ok(()))
                    }
                    other => other,
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let (name, args) = parse_command("/guess_p hard", "picguessr_bot").unwrap();
        assert_eq!(name, "guess_p");
        assert_eq!(args, CommandArgs("hard".to_owned()));

        let (name, args) = parse_command("/score@picguessr_bot", "picguessr_bot").unwrap();
        assert_eq!(name, "score");
        assert_eq!(args.0, "");

        let (name, args) =
            parse_command("/guess_emperor@picguessr_bot  1024 ", "picguessr_bot").unwrap();
        assert_eq!(name, "guess_emperor");
        assert_eq!(args.0, "1024");
    }

    #[test]
    fn test_parse_command_rejects() {
        assert!(parse_command("guess", "picguessr_bot").is_none());
        assert!(parse_command("/", "picguessr_bot").is_none());
        assert!(parse_command("/guess@other_bot", "picguessr_bot").is_none());
    }
}
