//! Fixed reply texts.

/// Reply to any command token the bot does not know.
pub const UNKNOWN_COMMAND: &str = "Unknown command. Try help";

/// Help lines; `{p}` is replaced with the configured command prefix.
const HELP_ITEMS: [&str; 7] = [
    "{p}ping : replies pong",
    "{p}whoami : replies 'you are <nick>'",
    "{p}countdown <i> [s]: sleeps i minutes and alerts you, optionally printing s",
    "{p}seen <nick>: tells you the last time <nick> was seen by the bot",
    "{p}message <nick> <text>: saves <text> for when <nick> is online",
    "{p}uptime: prints the bot's uptime",
    "{p}help : prints basic help",
];

pub const MISSING_NICK: &str = "You didn't specify a nick";
pub const MESSAGE_USAGE: &str = "I need a destination and a message to do this.";
pub const MESSAGE_SAVED: &str = "The message has been saved";
pub const COUNTDOWN_USAGE: &str = "I need at least an amount in minutes to wait, and optionally a message to give you when the wait is over.";
pub const COUNTDOWN_NOT_A_NUMBER: &str = "My first argument has to be a number. It will be the number of minutes I will sleep before alerting you.";
pub const OPME_REFUSED: &str = "Only channel operators can use opme.";

/// Timestamp layout used by `seen`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M %Z";
/// Timestamp layout used when delivering stored messages.
pub const MOMENT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Get the help lines for the given command prefix.
pub fn help_lines(prefix: &str) -> Vec<String> {
    HELP_ITEMS.iter().map(|line| line.replace("{p}", prefix)).collect()
}
