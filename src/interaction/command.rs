//! Parsing of command lines like `!message bob see you at 5`.

/// A recognized command and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Ping,
    WhoAmI,
    Help,
    Uptime,
    Seen { nick: Option<&'a str> },
    Message { nick: Option<&'a str>, text: &'a str },
    Countdown { minutes: Option<&'a str>, text: &'a str },
    OpMe,
    Deprecated { name: &'a str },
    Unknown { name: &'a str },
}

impl<'a> Command<'a> {
    /// Parse `line` if its first token carries `prefix`; `None` means ordinary chat.
    pub fn parse(line: &'a str, prefix: &str) -> Option<Self> {
        let (token, rest) = split_token(line);
        let name = token.strip_prefix(prefix).filter(|name| !name.is_empty())?;

        let command = match name {
            "ping" => Self::Ping,
            "whoami" => Self::WhoAmI,
            "help" => Self::Help,
            "uptime" => Self::Uptime,
            "seen" => Self::Seen { nick: first_word(rest) },
            "message" => {
                let (nick, text) = split_token(rest);
                Self::Message {
                    nick: Some(nick).filter(|n| !n.is_empty()),
                    text,
                }
            }
            "countdown" => {
                let (minutes, text) = split_token(rest);
                Self::Countdown {
                    minutes: Some(minutes).filter(|m| !m.is_empty()),
                    text,
                }
            }
            "opme" => Self::OpMe,
            "beer" | "slap" => Self::Deprecated { name },
            _ => Self::Unknown { name },
        };

        Some(command)
    }
}

/// Split off the first whitespace-delimited token; the rest is trimmed.
fn split_token(line: &str) -> (&str, &str) {
    let line = line.trim();

    match line.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (line, ""),
    }
}

fn first_word(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chat_is_not_a_command() {
        assert_eq!(Command::parse("hello there", "!"), None);
        assert_eq!(Command::parse("!", "!"), None);
        assert_eq!(Command::parse("", "!"), None);
        assert_eq!(Command::parse("say !ping", "!"), None);
    }

    #[test]
    fn exact_token_match() {
        assert_eq!(Command::parse("!ping", "!"), Some(Command::Ping));
        assert_eq!(Command::parse("  !ping extra args", "!"), Some(Command::Ping));
        assert_eq!(Command::parse("!pingx", "!"), Some(Command::Unknown { name: "pingx" }));
        assert_eq!(Command::parse("!PING", "!"), Some(Command::Unknown { name: "PING" }));
    }

    #[test]
    fn message_keeps_body_spacing() {
        assert_eq!(
            Command::parse("!message bob hello   there 'friend'", "!"),
            Some(Command::Message {
                nick: Some("bob"),
                text: "hello   there 'friend'",
            })
        );
        assert_eq!(Command::parse("!message bob", "!"), Some(Command::Message { nick: Some("bob"), text: "" }));
        assert_eq!(Command::parse("!message", "!"), Some(Command::Message { nick: None, text: "" }));
    }

    #[test]
    fn countdown_and_seen_arguments() {
        assert_eq!(
            Command::parse("!countdown 5 tea is ready", "!"),
            Some(Command::Countdown {
                minutes: Some("5"),
                text: "tea is ready",
            })
        );
        assert_eq!(Command::parse("!countdown", "!"), Some(Command::Countdown { minutes: None, text: "" }));
        assert_eq!(Command::parse("!seen alice bob", "!"), Some(Command::Seen { nick: Some("alice") }));
        assert_eq!(Command::parse("!seen", "!"), Some(Command::Seen { nick: None }));
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(Command::parse("??help", "??"), Some(Command::Help));
        assert_eq!(Command::parse("!help", "??"), None);
    }
}
