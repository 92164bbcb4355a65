//! Built-in commands every bot gets unless disabled

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::application::errors::CommandError;
use crate::application::interactivity::InteractivityEngine;
use crate::application::messaging::{OutgoingText, ParsedCommand};
use crate::domain::entities::{Command, CommandConfig, Locality, Message, Privilege, User, UserId};
use crate::domain::traits::{AdminRecord, AdminRoster, BotCommand, Messenger};

use super::feedback::FEEDBACK_LISTENER;

/// `/ping` - liveness check
pub fn ping(messenger: Arc<dyn Messenger>) -> CommandConfig {
    CommandConfig::new("ping")
        .with_description("Pong 🏓")
        .with_action(move |message, _| {
            OutgoingText::new(message.chat_id(), "Pong 🏓").send(messenger.as_ref());
            Ok(())
        })
}

/// `/cancel` - stop the chat's active conversation
pub fn cancel(messenger: Arc<dyn Messenger>, engine: Arc<InteractivityEngine>) -> CommandConfig {
    CommandConfig::new("cancel")
        .with_description("Cancel the current operation 🛑")
        .with_action(move |message, _| {
            let text = if engine.deactivate_listener(message.chat_id())? {
                "Cancelled the current operation ✅"
            } else {
                "There's no operation to cancel 🙃"
            };
            OutgoingText::reply_to_in_group(message, text).send(messenger.as_ref());
            Ok(())
        })
}

/// `/feedback` - start the one-question feedback conversation
pub fn feedback(engine: Arc<InteractivityEngine>) -> CommandConfig {
    CommandConfig::new("feedback")
        .with_description("Send feedback to the bot owner 💌")
        .with_action(move |message, parsed| {
            let mut data = HashMap::new();
            data.insert("chat-kind".to_string(), message.chat.kind.as_str().to_string());
            data.insert("origin-message".to_string(), parsed.origin_message_id().to_string());
            if let Some(sender) = &message.sender {
                data.insert("requester".to_string(), sender.display_name());
            }
            engine
                .activate_listener(message.chat_id(), FEEDBACK_LISTENER, data)
                .map_err(|e| CommandError::ExecutionFailed(e.to_string()))
        })
}

/// User a promote/demote request targets
#[derive(Debug, PartialEq, Eq)]
enum Target {
    User(UserId),
    Bot,
    Invalid,
    Missing,
}

/// From the id parameter, else from the forwarded sender of the replied message
fn resolve_target(message: &Message, parsed: &ParsedCommand) -> Target {
    if !parsed.parameters.is_empty() {
        return match parsed.parameters.parse() {
            Ok(id) => Target::User(id),
            Err(_) => Target::Invalid,
        };
    }
    match message.reply_to.as_ref().and_then(|r| r.forward_from.as_ref()) {
        Some(user) if user.is_bot => Target::Bot,
        Some(user) => Target::User(user.id),
        None => Target::Missing,
    }
}

fn usage(parsed: &ParsedCommand, verb: &str) -> String {
    format!(
        "Send this command as a reply to a forwarded message from the user you wish to {} ℹ\n\
         Or send the user id in {} [userId] ℹ",
        verb, parsed
    )
}

/// `/promote` - make a user a bot admin
pub fn promote(messenger: Arc<dyn Messenger>, roster: Arc<dyn AdminRoster>, owner: Option<UserId>) -> CommandConfig {
    CommandConfig::new("promote")
        .with_description("Promote a user to be an admin of the bot.")
        .with_locality(Locality::User)
        .with_privilege(Privilege::Admin)
        .with_action(move |message, parsed| {
            let reply = |text: &str| {
                OutgoingText::reply_to_in_group(message, text).send(messenger.as_ref());
            };
            let promoter = message
                .sender_id()
                .ok_or_else(|| CommandError::InvalidArgs("promotion without a sender".to_string()))?;

            let user_id = match resolve_target(message, parsed) {
                Target::User(id) => id,
                Target::Bot => {
                    reply("I won't trust that bot to administrate me 😒");
                    return Ok(());
                }
                Target::Invalid => {
                    reply("Invalid userId ⚠");
                    return Ok(());
                }
                Target::Missing => {
                    reply(&usage(parsed, "promote"));
                    return Ok(());
                }
            };

            if Some(user_id) == owner {
                reply("That's my owner 😊");
                return Ok(());
            }
            if roster.is_admin(user_id)? {
                reply("The user is already an admin 🙃");
                return Ok(());
            }

            let record = AdminRecord {
                user_id,
                promoted_by: Some(promoter),
                promoted_at: Utc::now(),
            };
            if let Err(e) = roster.add_admin(&record) {
                reply("An error occurred while promoting ⚠");
                return Err(e.into());
            }
            tracing::info!("{} promoted {} to admin", promoter, user_id);
            reply("Promoted to an admin successfully ✅");
            Ok(())
        })
}

/// `/demote` - remove a bot admin, handing their promotions to the demoter
pub fn demote(messenger: Arc<dyn Messenger>, roster: Arc<dyn AdminRoster>, owner: Option<UserId>) -> CommandConfig {
    CommandConfig::new("demote")
        .with_description("Demote a bot administrator.")
        .with_locality(Locality::User)
        .with_privilege(Privilege::Admin)
        .with_action(move |message, parsed| {
            let reply = |text: &str| {
                OutgoingText::reply_to_in_group(message, text).send(messenger.as_ref());
            };
            let demoter = message
                .sender_id()
                .ok_or_else(|| CommandError::InvalidArgs("demotion without a sender".to_string()))?;
            let by_owner = Some(demoter) == owner;

            let user_id = match resolve_target(message, parsed) {
                Target::User(id) => id,
                Target::Bot => {
                    reply("Heh, I already don't trust any bot to administrate me 😏");
                    return Ok(());
                }
                Target::Invalid => {
                    reply("Invalid userId ⚠");
                    return Ok(());
                }
                Target::Missing => {
                    reply(&usage(parsed, "demote"));
                    return Ok(());
                }
            };

            if Some(user_id) == owner {
                reply("I won't ever demote my owner ❕");
                return Ok(());
            }

            let Some(record) = roster.get_admin(user_id)? else {
                reply("The user is already not an admin to be demoted 😅");
                return Ok(());
            };

            match record.promoted_by {
                None if !by_owner => {
                    reply("Only the bot's owner can demote this user ⚠");
                    return Ok(());
                }
                Some(promoter) if promoter != demoter && !by_owner => {
                    let boss = User::new(promoter).display_name();
                    reply(&format!("This user can be only demoted by {} or by the owner ⚠", boss));
                    return Ok(());
                }
                _ => {}
            }

            if let Err(e) = roster.remove_admin(user_id) {
                reply("An error occurred while demoting ⚠");
                return Err(e.into());
            }
            match roster.transfer_promotions(user_id, demoter) {
                Ok(moved) => tracing::info!("{} demoted {}, {} sub-admins transferred", demoter, user_id, moved),
                Err(e) => {
                    tracing::error!("Failed to transfer sub-admins from {} to {}: {}", user_id, demoter, e);
                    reply("An error occurred while transferring sub-admins ⚠");
                    return Err(e.into());
                }
            }
            reply("Demoted successfully ✅");
            Ok(())
        })
}

/// Menu entries for the commands anyone may see everywhere
pub fn menu_entries(commands: &[Arc<Command>]) -> Vec<BotCommand> {
    commands
        .iter()
        .filter(|c| c.locality() == Locality::All)
        .filter(|c| matches!(c.privilege(), Privilege::Public | Privilege::GroupAdmin))
        .filter_map(|c| c.description().map(|d| BotCommand::new(c.name(), d)))
        .collect()
}

/// `/update_commands` - publish the command menu.
///
/// Publishes `commands` as given; register it after every other command.
pub fn update_commands(messenger: Arc<dyn Messenger>, commands: Vec<Arc<Command>>) -> CommandConfig {
    let entries = menu_entries(&commands);
    CommandConfig::new("update_commands")
        .with_privilege(Privilege::Admin)
        .with_action(move |message, _| {
            let text = match messenger.set_commands(&entries) {
                Ok(()) => {
                    tracing::info!("Updated bot commands definition");
                    "Updated commands definition successfully ✅"
                }
                Err(e) => {
                    tracing::error!("Failed to update bot commands definition: {}", e);
                    "Failed to update commands definition ⚠"
                }
            };
            OutgoingText::reply_to_in_group(message, text).send(messenger.as_ref());
            Ok(())
        })
}
