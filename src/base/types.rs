use chrono::{DateTime, Utc};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// An event delivered by the chat connection, already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Registration finished (`001`); the bot may join its channel.
    Connected,
    /// A `PRIVMSG` to a channel or to the bot.
    Message { nick: String, target: String, text: String },
    /// A user changed nick.
    NickChange { old: String, new: String },
    /// `311` WHOIS reply: the nick is connected.
    IdentityReply { nick: String },
    /// `401` reply to a WHOIS: the nick is not connected.
    NoSuchNick { nick: String },
    /// `353` NAMES reply; the flag is `true` when the member holds `@`.
    Names { channel: String, members: Vec<(String, bool)> },
    /// `MODE <channel> +o/-o <nick>`.
    OperatorChange { channel: String, nick: String, granted: bool },
    /// PART/KICK (with channel) or QUIT (without).
    Departed { channel: Option<String>, nick: String },
    /// A server or user `NOTICE`.
    Notice { text: String },
}

/// The latest thing a nick said, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    pub nickname: String,
    pub last_message: String,
    pub last_seen_at: DateTime<Utc>,
}

/// A message waiting for its recipient to show up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl MailboxEntry {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, body: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
            created_at,
        }
    }
}

/// Failures of the mailbox store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a message from {sender} to {recipient} at {moment} already exists")]
    Duplicate { sender: String, recipient: String, moment: String },
    #[error("mailbox unavailable: {0}")]
    Unavailable(String),
    #[error("stored timestamp `{0}` is malformed")]
    Timestamp(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
