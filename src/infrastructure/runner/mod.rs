//! Update loops feeding the handler pipe
//!
//! Handlers are synchronous and may block on the network or the database, so
//! they run on tokio's blocking pool. Within a batch, chats are processed in
//! parallel and each chat's updates in arrival order.
//!
//! The poll back-off is transport plumbing for the Telegram loop only; the
//! pipe and its handlers never retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use crate::application::messaging::Handler;
use crate::domain::entities::{Chat, ChatId, Message, Update, User};
use crate::infrastructure::adapters::telegram::TelegramAdapter;

/// Back-off after a failed poll
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub type SharedHandler = Arc<dyn Handler<Update>>;

/// Group updates by chat, keeping arrival order inside each group and the
/// order in which chats first appear.
pub fn partition_by_chat(updates: Vec<Update>) -> Vec<Vec<Update>> {
    let mut groups: Vec<(Option<ChatId>, Vec<Update>)> = Vec::new();
    for update in updates {
        let chat_id = update.chat_id();
        match groups.iter_mut().find(|(id, _)| *id == chat_id) {
            Some((_, group)) => group.push(update),
            None => groups.push((chat_id, vec![update])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

/// Run one batch through the pipe and wait for all of it.
///
/// Returns how many updates were consumed.
pub async fn process_batch(pipe: SharedHandler, updates: Vec<Update>) -> usize {
    let mut tasks = JoinSet::new();
    for group in partition_by_chat(updates) {
        let pipe = Arc::clone(&pipe);
        tasks.spawn_blocking(move || {
            group
                .iter()
                .filter(|update| {
                    let consumed = pipe.process(update);
                    tracing::trace!("{} update {}", if consumed { "Consumed" } else { "Ignored" }, update.id);
                    consumed
                })
                .count()
        });
    }

    let mut consumed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(count) => consumed += count,
            Err(e) => tracing::error!("Update worker failed: {}", e),
        }
    }
    consumed
}

/// Long-poll Telegram until Ctrl-C
pub async fn run_polling(bot: Arc<TelegramAdapter>, pipe: SharedHandler, poll_timeout: u64) {
    let mut offset: i64 = 0;
    tracing::info!("Starting message loop...");

    loop {
        let poll = {
            let bot = Arc::clone(&bot);
            tokio::task::spawn_blocking(move || bot.get_updates(offset, poll_timeout))
        };

        let updates = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                break;
            }
            joined = poll => match joined {
                Ok(Ok(updates)) => updates,
                Ok(Err(e)) => {
                    tracing::error!("Failed to get updates: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
                Err(e) => {
                    tracing::error!("Polling task failed: {}", e);
                    continue;
                }
            },
        };

        if updates.is_empty() {
            continue;
        }
        offset = TelegramAdapter::get_next_offset(&updates, offset);
        tracing::debug!("Received {} updates", updates.len());
        process_batch(Arc::clone(&pipe), updates.into_iter().map(Into::into).collect()).await;
    }
}

/// Feed stdin lines to the pipe as private messages from `user`, until EOF
/// or Ctrl-C.
pub async fn run_console(pipe: SharedHandler, user: User) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id: i64 = 1;
    tracing::info!("Console mode, chatting as {}. Ctrl-D to quit.", user);

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line,
        };

        let text = match line {
            Ok(Some(text)) => text,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read stdin: {}", e);
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }

        let message = Message::from_text(next_id, Chat::private(user.id), text.trim()).with_sender(user.clone());
        let update = Update::from_message(next_id, message);
        next_id += 1;

        if process_batch(Arc::clone(&pipe), vec![update]).await == 0 {
            println!("(not handled)");
        }
    }
    tracing::info!("Console session ended");
}
