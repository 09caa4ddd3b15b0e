//! The command dispatcher: one inbound event in, zero or more replies out.

use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{
        config::OpmePolicy,
        replies,
        types::{ChatEvent, MailboxEntry, Void},
    },
    runtime::Runtime,
};

use super::command::Command;

/// Handle one event without letting any failure escape.
///
/// The handler runs in its own task and is awaited, so events stay strictly
/// ordered while errors and panics are logged and the event is dropped.
#[instrument(skip_all)]
pub async fn handle_chat_event(event: ChatEvent, runtime: Runtime) {
    let handle = tokio::spawn(async move { handle_chat_event_internal(event, &runtime).await }.in_current_span());

    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!("Error while handling: {:#}", err),
        Err(err) if err.is_panic() => error!("Recovered from a panic while handling an event."),
        Err(err) => error!("Event handler did not finish: {}", err),
    }
}

async fn handle_chat_event_internal(event: ChatEvent, runtime: &Runtime) -> Void {
    match event {
        ChatEvent::Connected => {
            info!("Joining {} ...", runtime.config.channel);
            runtime.chat.send_raw(&format!("JOIN {}", runtime.config.channel)).await?;
        }
        ChatEvent::Message { nick, target, text } => handle_message(runtime, &nick, &target, &text).await?,
        ChatEvent::NickChange { old, new } => {
            runtime.roster.rename(&old, &new);
            deliver_mail(runtime, &new, &runtime.config.channel).await?;
        }
        // `route_events` resolves these before they reach the queue; callers that
        // drive this handler directly still get their probes completed.
        ChatEvent::IdentityReply { nick } => runtime.probe.resolve(&nick, true),
        ChatEvent::NoSuchNick { nick } => runtime.probe.resolve(&nick, false),
        ChatEvent::Names { channel, members } => {
            if is_our_channel(runtime, &channel) {
                for (nick, operator) in members {
                    runtime.roster.set(&nick, operator);
                }
            }
        }
        ChatEvent::OperatorChange { channel, nick, granted } => {
            if is_our_channel(runtime, &channel) {
                runtime.roster.set(&nick, granted);
            }
        }
        ChatEvent::Departed { channel, nick } => {
            if channel.as_deref().is_none_or(|c| is_our_channel(runtime, c)) {
                runtime.roster.set(&nick, false);
            }
        }
        ChatEvent::Notice { text } => debug!("NOTICE: {}", text),
    }

    Ok(())
}

/// Record presence, hand over waiting mail, then run any command.
#[instrument(skip(runtime, text))]
async fn handle_message(runtime: &Runtime, nick: &str, target: &str, text: &str) -> Void {
    runtime.presence.touch(nick, text, Utc::now());

    let reply_to = reply_target(target, nick);

    deliver_mail(runtime, nick, reply_to).await?;

    let Some(command) = Command::parse(text, &runtime.config.command_prefix) else {
        return Ok(());
    };

    debug!("Dispatching {:?}", command);

    let reply = Replier { runtime, target: reply_to };

    match command {
        Command::Ping => reply.send("pong").await,
        Command::WhoAmI => reply.send(&format!("You are {nick}")).await,
        Command::Help => {
            for line in replies::help_lines(&runtime.config.command_prefix) {
                reply.send(&line).await?;
            }
            Ok(())
        }
        Command::Uptime => {
            let elapsed = (Utc::now() - runtime.started_at).to_std().unwrap_or_default();
            reply.send(&format!("uptime: {}", format_uptime(elapsed))).await
        }
        Command::Seen { nick: None } => reply.send(replies::MISSING_NICK).await,
        Command::Seen { nick: Some(seen) } => seen_reply(runtime, &reply, seen).await,
        Command::Message { nick: Some(recipient), text } if !text.is_empty() => leave_message(runtime, &reply, nick, recipient, text).await,
        Command::Message { .. } => reply.send(replies::MESSAGE_USAGE).await,
        Command::Countdown { minutes: None, .. } => reply.send(replies::COUNTDOWN_USAGE).await,
        Command::Countdown { minutes: Some(minutes), text } => countdown(runtime, &reply, minutes, text).await,
        Command::OpMe => opme(runtime, &reply, nick).await,
        Command::Deprecated { name } => reply.send(&format!("{}{} has been deprecated", runtime.config.command_prefix, name)).await,
        Command::Unknown { .. } => reply.send(replies::UNKNOWN_COMMAND).await,
    }
}

/// Send every entry waiting for `recipient` to `target`, oldest first.
async fn deliver_mail(runtime: &Runtime, recipient: &str, target: &str) -> Void {
    let mut pending = runtime.mailbox.drain(recipient);

    while let Some(entry) = pending.next().await {
        match entry {
            Ok(entry) => {
                let line = format!("On {}, {} said: {}", entry.created_at.format(replies::MOMENT_FORMAT), entry.sender, entry.body);
                runtime.chat.send_message(target, &line).await?;
            }
            Err(err) => {
                error!("Could not read pending messages for {}: {}", recipient, err);
                break;
            }
        }
    }

    Ok(())
}

async fn seen_reply(runtime: &Runtime, reply: &Replier<'_>, nick: &str) -> Void {
    let line = match runtime.presence.lookup(nick) {
        Some(record) => format!(
            "I last saw {} on {} and they said {}",
            nick,
            record.last_seen_at.format(replies::TIME_FORMAT),
            record.last_message
        ),
        None => format!("I have not seen {} since I've started ({})", nick, runtime.started_at.format(replies::TIME_FORMAT)),
    };

    reply.send(&line).await
}

async fn leave_message(runtime: &Runtime, reply: &Replier<'_>, sender: &str, recipient: &str, body: &str) -> Void {
    if runtime.probe.is_online(recipient, runtime.config.probe_timeout()).await {
        return reply
            .send(&format!("Seems {recipient} is online, why don't you just talk to them directly?"))
            .await;
    }

    let entry = MailboxEntry::new(sender, recipient, body, Utc::now());

    match runtime.mailbox.save(&entry).await {
        Ok(()) => reply.send(replies::MESSAGE_SAVED).await,
        Err(err) => {
            warn!("Saving message from {} to {} failed: {}", sender, recipient, err);
            reply.send(&format!("An error occurred while saving the message: {err}")).await
        }
    }
}

async fn countdown(runtime: &Runtime, reply: &Replier<'_>, minutes: &str, text: &str) -> Void {
    let Ok(minutes) = minutes.parse::<u64>() else {
        return reply.send(replies::COUNTDOWN_NOT_A_NUMBER).await;
    };

    reply.send(&format!("I will alert you in {minutes} minutes")).await?;

    let alert = if text.is_empty() {
        format!("You asked me to alert you {minutes} minutes ago")
    } else {
        format!("{text} ({minutes} minutes ago)")
    };

    let chat = runtime.chat.clone();
    let target = reply.target.to_string();

    runtime.countdown.schedule(Duration::from_secs(minutes.saturating_mul(60)), async move {
        if let Err(err) = chat.send_message(&target, &alert).await {
            error!("Could not deliver countdown to {}: {}", target, err);
        }
    });

    Ok(())
}

async fn opme(runtime: &Runtime, reply: &Replier<'_>, nick: &str) -> Void {
    let allowed = match runtime.config.opme_policy {
        OpmePolicy::Permissive => true,
        OpmePolicy::RequireOperator => runtime.roster.is_operator(nick),
    };

    if !allowed {
        info!("Refusing opme for {}", nick);
        return reply.send(replies::OPME_REFUSED).await;
    }

    runtime.chat.send_raw(&format!("MODE {} +o {}", runtime.config.channel, nick)).await
}

/// Sends replies back where the triggering message came from.
struct Replier<'a> {
    runtime: &'a Runtime,
    target: &'a str,
}

impl Replier<'_> {
    async fn send(&self, text: &str) -> Void {
        self.runtime.chat.send_message(self.target, text).await
    }
}

/// Channel messages are answered in the channel, private ones in private.
fn reply_target<'a>(target: &'a str, nick: &'a str) -> &'a str {
    if target.starts_with('#') || target.starts_with('&') { target } else { nick }
}

fn is_our_channel(runtime: &Runtime, channel: &str) -> bool {
    channel.eq_ignore_ascii_case(&runtime.config.channel)
}

/// Render like `3d4h5m6s`, skipping leading zero units.
fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, hours, minutes, seconds) = (secs / 86_400, secs / 3_600 % 24, secs / 60 % 60, secs % 60);

    if days > 0 {
        format!("{days}d{hours}h{minutes}m{seconds}s")
    } else if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(Duration::from_secs(7)), "7s");
        assert_eq!(format_uptime(Duration::from_secs(65)), "1m5s");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h0m0s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d1h1m1s");
    }

    #[test]
    fn private_messages_are_answered_privately() {
        assert_eq!(reply_target("#minibot", "alice"), "#minibot");
        assert_eq!(reply_target("&local", "alice"), "&local");
        assert_eq!(reply_target("minibot", "alice"), "alice");
    }
}
