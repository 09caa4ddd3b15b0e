//! IRC message parsing and the line codec used by [`super::irc`].
//!
//! Messages follow RFC 2812:
//!   [`:`prefix SPACE] command [SPACE params] [SPACE `:` trailing]

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// Maximum line length we accept, including the terminator.
const MAX_LINE_LENGTH: usize = 8191;

/// A parsed IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Optional prefix (server name or `nick!user@host`).
    pub prefix: Option<String>,
    /// The command (e.g. `PRIVMSG`, `001`, `NICK`).
    pub command: String,
    /// Parameters; the last may have been a trailing param (with spaces).
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty message")]
    Empty,
    #[error("prefix present but missing command")]
    MissingCommand,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("line exceeds maximum length ({MAX_LINE_LENGTH} bytes)")]
    LineTooLong,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Message {
    pub fn new(command: &str, params: &[&str]) -> Self {
        Self {
            prefix: None,
            command: command.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Parse a single line (without the terminator).
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim_end_matches(['\r', '\n']);

        if input.is_empty() {
            return Err(ParseError::Empty);
        }

        let (prefix, rest) = match input.strip_prefix(':') {
            Some(stripped) => match stripped.split_once(' ') {
                Some((prefix, rest)) => (Some(prefix.to_string()), rest.trim_start_matches(' ')),
                None => return Err(ParseError::MissingCommand),
            },
            None => (None, input),
        };

        let (command, mut remaining) = rest.split_once(' ').unwrap_or((rest, ""));

        if command.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        let mut params = Vec::new();

        while !remaining.is_empty() {
            if let Some(trailing) = remaining.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }

            match remaining.split_once(' ') {
                Some((param, rest)) => {
                    if !param.is_empty() {
                        params.push(param.to_string());
                    }
                    remaining = rest;
                }
                None => {
                    params.push(remaining.to_string());
                    break;
                }
            }
        }

        Ok(Message {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// The nick part of a `nick!user@host` prefix.
    pub fn source_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Serialize to wire format (without the terminator).
    ///
    /// Line breaks inside parameters are replaced with spaces so a parameter
    /// can never smuggle in a second command.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();

        if let Some(prefix) = &self.prefix {
            out.push(':');
            out.push_str(prefix);
            out.push(' ');
        }

        out.push_str(&self.command);

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            out.push(' ');
            if i == last {
                out.push(':');
            }
            out.push_str(&param.replace(['\r', '\n'], " "));
        }

        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Frames a TCP byte stream into IRC messages.
///
/// Lines end in `\n`; a preceding `\r` is dropped. Blank and malformed lines
/// are skipped, and invalid UTF-8 is replaced rather than rejected.
#[derive(Debug, Default)]
pub struct IrcCodec;

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > MAX_LINE_LENGTH {
                    return Err(CodecError::LineTooLong);
                }
                return Ok(None);
            };

            let line = src.split_to(pos);
            src.advance(1);

            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches('\r');

            match Message::parse(line) {
                Ok(message) => return Ok(Some(message)),
                Err(ParseError::Empty) => continue,
                Err(err) => debug!("Skipping malformed line `{}`: {}", line, err),
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let wire = item.to_wire();
        dst.reserve(wire.len() + 2);
        dst.put_slice(wire.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_privmsg_with_prefix() {
        let msg = Message::parse(":alice!a@host PRIVMSG #minibot :!seen bob").unwrap();

        assert_eq!(msg.source_nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#minibot", "!seen bob"]);
    }

    #[test]
    fn parses_numeric_without_trailing() {
        let msg = Message::parse(":irc.example 311 minibot bob ~b host * :Bob").unwrap();

        assert_eq!(msg.command, "311");
        assert_eq!(msg.param(1), Some("bob"));
        assert_eq!(msg.param(5), Some("Bob"));
    }

    #[test]
    fn rejects_prefix_only() {
        assert_eq!(Message::parse(":lonely"), Err(ParseError::MissingCommand));
        assert_eq!(Message::parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn to_wire_strips_line_breaks() {
        let msg = Message::new("PRIVMSG", &["#minibot", "hi\r\nQUIT :bye"]);

        assert_eq!(msg.to_wire(), "PRIVMSG #minibot :hi  QUIT :bye");
    }

    #[test]
    fn decoder_handles_split_and_bare_newlines() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::from("PING :abc\r\n\r\nNICK wi");

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.command, "PING");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"ngs\n");
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.params, vec!["wings"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn decoder_skips_malformed_lines() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::from(":nocommand\r\nPING :x\r\n");

        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.command, "PING");
    }

    #[test]
    fn decoder_rejects_oversized_line() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::from(vec![b'A'; MAX_LINE_LENGTH + 1].as_slice());

        assert!(matches!(codec.decode(&mut buf), Err(CodecError::LineTooLong)));
    }

    #[test]
    fn encoder_appends_crlf() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::new();

        codec.encode(Message::new("WHOIS", &["bob"]), &mut buf).unwrap();

        assert_eq!(&buf[..], b"WHOIS :bob\r\n");
    }
}
