//! IRC implementation of [`GenericChatClient`].

use anyhow::Context;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt, stream::SplitStream};
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, trace, warn};

use crate::base::{
    config::Config,
    types::{ChatEvent, Res, Void},
};

use super::{
    GenericChatClient,
    wire::{IrcCodec, Message},
};

type Inbound = SplitStream<Framed<TcpStream, IrcCodec>>;

/// A single IRC connection.
///
/// Outgoing lines go through a writer task, so sends never wait on reads.
pub struct IrcChatClient {
    nick: String,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: Mutex<Option<Inbound>>,
}

impl IrcChatClient {
    /// Connect and register; the welcome (`001`) arrives later as [`ChatEvent::Connected`].
    #[instrument(name = "IrcChatClient::connect", skip_all, fields(host = %config.host))]
    pub async fn connect(config: &Config) -> Res<Self> {
        let stream = TcpStream::connect(&config.host)
            .await
            .with_context(|| format!("An error occurred while connecting to {}", config.host))?;

        let (mut writer, reader) = Framed::new(stream, IrcCodec).split();
        let (outbound, mut queue) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                trace!("> {}", message);

                if let Err(err) = writer.send(message).await {
                    warn!("Write to server failed: {}", err);
                    break;
                }
            }
        });

        outbound.send(Message::new("NICK", &[config.nick.as_str()]))?;
        outbound.send(Message::new("USER", &[config.user.as_str(), "0", "*", config.user.as_str()]))?;

        info!("Connected to {} as {}", config.host, config.nick);

        Ok(Self {
            nick: config.nick.clone(),
            outbound,
            inbound: Mutex::new(Some(reader)),
        })
    }

    fn enqueue(&self, message: Message) -> Void {
        self.outbound.send(message).map_err(|_| anyhow::anyhow!("Connection writer has stopped"))
    }
}

#[async_trait]
impl GenericChatClient for IrcChatClient {
    fn nick(&self) -> &str {
        &self.nick
    }

    async fn start(&self, sink: mpsc::Sender<ChatEvent>) -> Void {
        let mut inbound = self.inbound.lock().await.take().ok_or_else(|| anyhow::anyhow!("Chat client already started"))?;

        while let Some(message) = inbound.next().await {
            let message = message?;
            trace!("< {}", message);

            match message.command.as_str() {
                "PING" => {
                    let token = message.param(0).unwrap_or_default();
                    self.enqueue(Message::new("PONG", &[token]))?;
                    continue;
                }
                "ERROR" => {
                    warn!("Server error: {}", message.param(0).unwrap_or_default());
                    continue;
                }
                "433" => return Err(anyhow::anyhow!("Nick `{}` is already in use", self.nick)),
                _ => {}
            }

            for event in translate(&message) {
                if sink.send(event).await.is_err() {
                    debug!("Event sink closed, stopping listener.");
                    return Ok(());
                }
            }
        }

        Err(anyhow::anyhow!("Connection closed by server"))
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, target: &str, text: &str) -> Void {
        self.enqueue(Message::new("PRIVMSG", &[target, text]))
    }

    #[instrument(skip(self))]
    async fn send_raw(&self, line: &str) -> Void {
        let message = Message::parse(line).map_err(|e| anyhow::anyhow!("Invalid raw line `{}`: {}", line, e))?;
        self.enqueue(message)
    }
}

/// Member prefixes that carry operator rights.
const OPERATOR_SIGILS: [char; 3] = ['~', '&', '@'];
/// All member prefixes a NAMES reply may carry.
const MEMBER_SIGILS: [char; 5] = ['~', '&', '@', '%', '+'];

/// Turn one server message into the events the bot cares about.
pub fn translate(message: &Message) -> Vec<ChatEvent> {
    let source = message.source_nick().unwrap_or_default().to_string();

    match message.command.as_str() {
        "001" => vec![ChatEvent::Connected],
        "PRIVMSG" => match (message.param(0), message.param(1)) {
            (Some(target), Some(text)) => vec![ChatEvent::Message {
                nick: source,
                target: target.to_string(),
                text: text.to_string(),
            }],
            _ => vec![],
        },
        "NICK" => match message.param(0) {
            Some(new) => vec![ChatEvent::NickChange { old: source, new: new.to_string() }],
            None => vec![],
        },
        "311" => message.param(1).map(|nick| ChatEvent::IdentityReply { nick: nick.to_string() }).into_iter().collect(),
        "401" => message.param(1).map(|nick| ChatEvent::NoSuchNick { nick: nick.to_string() }).into_iter().collect(),
        "353" => match (message.param(2), message.param(3)) {
            (Some(channel), Some(names)) => vec![ChatEvent::Names {
                channel: channel.to_string(),
                members: names.split_whitespace().map(parse_member).collect(),
            }],
            _ => vec![],
        },
        "MODE" => operator_changes(message),
        "PART" => vec![ChatEvent::Departed {
            channel: message.param(0).map(str::to_string),
            nick: source,
        }],
        "KICK" => match (message.param(0), message.param(1)) {
            (Some(channel), Some(nick)) => vec![ChatEvent::Departed {
                channel: Some(channel.to_string()),
                nick: nick.to_string(),
            }],
            _ => vec![],
        },
        "QUIT" => vec![ChatEvent::Departed { channel: None, nick: source }],
        "NOTICE" => vec![ChatEvent::Notice {
            text: message.params.last().cloned().unwrap_or_default(),
        }],
        _ => vec![],
    }
}

/// `@alice` -> (`alice`, true); `+bob` -> (`bob`, false).
fn parse_member(entry: &str) -> (String, bool) {
    let nick = entry.trim_start_matches(MEMBER_SIGILS);
    let sigils = &entry[..entry.len() - nick.len()];
    (nick.to_string(), sigils.contains(OPERATOR_SIGILS))
}

/// Pull `+o`/`-o` changes out of a channel MODE line.
fn operator_changes(message: &Message) -> Vec<ChatEvent> {
    let Some(channel) = message.param(0).filter(|c| c.starts_with('#') || c.starts_with('&')) else {
        return vec![];
    };
    let Some(modes) = message.param(1) else {
        return vec![];
    };

    let mut args = message.params.iter().skip(2);
    let mut adding = true;
    let mut events = Vec::new();

    for mode in modes.chars() {
        match mode {
            '+' => adding = true,
            '-' => adding = false,
            'o' => {
                if let Some(nick) = args.next() {
                    events.push(ChatEvent::OperatorChange {
                        channel: channel.to_string(),
                        nick: nick.clone(),
                        granted: adding,
                    });
                }
            }
            'v' | 'h' | 'b' | 'e' | 'I' | 'q' | 'a' | 'k' => {
                args.next();
            }
            'l' if adding => {
                args.next();
            }
            _ => {}
        }
    }

    events
}
