use bytes::BytesMut;
use tokio::time::Instant;
use tracing::warn;

pub const TERMINATOR: &str = "\r\n";
pub const PING_CHALLENGE: &str = "PING :tmi.twitch.tv";
pub const PONG_RESPONSE: &str = "PONG :tmi.twitch.tv";
pub const MEMBERSHIP_CAPABILITY: &str = "twitch.tv/membership";

/// Longest partial line kept while waiting for a terminator.
pub const MAX_LINE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub author: String,
    pub channel: String,
    pub message: String,
    pub received_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub user: String,
    pub channel: String,
    pub received_at: Instant,
}

pub type JoinEvent = MemberEvent;
pub type PartEvent = MemberEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(MessageEvent),
    Join(JoinEvent),
    Part(PartEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Ping,
    Event(Event),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Pass { token: String },
    Nick { nick: String },
    Join { channel: String },
    Part { channel: String },
    Privmsg { channel: String, text: String },
    CapReq { capability: String },
    Pong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn clean_line(line: &str) -> Option<&str> {
    let s = line.trim_end_matches(['\r', '\n']);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Classifies one frame. The receive timestamp is taken here so events are
/// stamped in read order.
pub fn parse_line(line: &str) -> Result<Inbound, ParseError> {
    let Some(clean) = clean_line(line) else {
        return Err(ParseError::new("empty line"));
    };
    if clean == PING_CHALLENGE {
        return Ok(Inbound::Ping);
    }

    let parts: Vec<&str> = clean.split(' ').collect();
    if parts.len() < 3 {
        return Err(ParseError::new("too few tokens"));
    }
    let received_at = Instant::now();
    let event = match parts[1] {
        "PRIVMSG" => {
            if parts.len() < 4 {
                return Err(ParseError::new("PRIVMSG without text"));
            }
            let mut text = parts[3..].join(" ");
            if text.starts_with(':') {
                text.remove(0);
            }
            Event::Message(MessageEvent {
                author: author(parts[0])?,
                channel: channel(parts[2]),
                message: text,
                received_at,
            })
        }
        "JOIN" => Event::Join(MemberEvent {
            user: author(parts[0])?,
            channel: channel(parts[2]),
            received_at,
        }),
        "PART" => Event::Part(MemberEvent {
            user: author(parts[0])?,
            channel: channel(parts[2]),
            received_at,
        }),
        other => return Err(ParseError::new(format!("unhandled command {other}"))),
    };
    Ok(Inbound::Event(event))
}

fn author(prefix: &str) -> Result<String, ParseError> {
    let Some(rest) = prefix.strip_prefix(':') else {
        return Err(ParseError::new("missing prefix"));
    };
    let nick = rest.split('!').next().unwrap_or("");
    if nick.is_empty() {
        return Err(ParseError::new("empty author"));
    }
    Ok(nick.to_string())
}

fn channel(token: &str) -> String {
    token.strip_prefix('#').unwrap_or(token).to_string()
}

/// Renders a command without its terminator. Free text is cut at the first
/// line break.
pub fn format_outbound(msg: &Outbound) -> String {
    match msg {
        Outbound::Pass { token } => format!("PASS {}", token),
        Outbound::Nick { nick } => format!("NICK {}", nick),
        Outbound::Join { channel } => format!("JOIN #{}", channel),
        Outbound::Part { channel } => format!("PART #{}", channel),
        Outbound::Privmsg { channel, text } => {
            format!("PRIVMSG #{} :{}", channel, single_line(text))
        }
        Outbound::CapReq { capability } => format!("CAP REQ :{}", capability),
        Outbound::Pong => PONG_RESPONSE.to_string(),
    }
}

fn single_line(text: &str) -> &str {
    text.split(['\r', '\n']).next().unwrap_or("")
}

/// Accumulates raw reads and hands out complete frames, keeping any trailing
/// fragment for the next read. A line that outgrows `MAX_LINE` is dropped up
/// to and including its terminator.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.buf.iter().position(|b| *b == b'\n') else {
                if self.buf.len() > MAX_LINE {
                    if !self.discarding {
                        warn!(len = self.buf.len(), "discarding oversized partial line");
                    }
                    self.buf.clear();
                    self.discarding = true;
                } else if self.discarding {
                    self.buf.clear();
                }
                return None;
            };
            let frame = self.buf.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }
            let line = String::from_utf8_lossy(&frame);
            if let Some(clean) = clean_line(&line) {
                return Some(clean.to_string());
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(line: &str) -> MessageEvent {
        match parse_line(line).unwrap() {
            Inbound::Event(Event::Message(me)) => me,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn parse_privmsg() {
        let me = message(":alice!alice@host PRIVMSG #somechannel :!ping");
        assert_eq!(me.author, "alice");
        assert_eq!(me.channel, "somechannel");
        assert_eq!(me.message, "!ping");
    }

    #[test]
    fn parse_privmsg_keeps_spaces() {
        let me = message(":bob!bob@bob.tmi.twitch.tv PRIVMSG #chan :hello there  world\r\n");
        assert_eq!(me.message, "hello there  world");
    }

    #[test]
    fn parse_join_and_part() {
        let join = parse_line(":carol!carol@host JOIN #room").unwrap();
        assert!(matches!(
            join,
            Inbound::Event(Event::Join(MemberEvent { ref user, ref channel, .. }))
                if user == "carol" && channel == "room"
        ));
        let part = parse_line(":carol!carol@host PART #room").unwrap();
        assert!(matches!(part, Inbound::Event(Event::Part(_))));
    }

    #[test]
    fn parse_ping() {
        assert_eq!(parse_line("PING :tmi.twitch.tv\r\n").unwrap(), Inbound::Ping);
    }

    #[test]
    fn short_and_unknown_lines_are_rejected() {
        assert!(parse_line("").is_err());
        assert!(parse_line(":alice!a@h PRIVMSG").is_err());
        assert!(parse_line(":alice!a@h PRIVMSG #chan").is_err());
        assert!(parse_line(":tmi.twitch.tv 001 bot :Welcome, GLHF!").is_err());
        assert!(parse_line("alice JOIN #chan").is_err());
    }

    #[test]
    fn format_outbound_lines() {
        assert_eq!(
            format_outbound(&Outbound::Privmsg {
                channel: "chan".into(),
                text: "Pong!".into()
            }),
            "PRIVMSG #chan :Pong!"
        );
        assert_eq!(
            format_outbound(&Outbound::CapReq {
                capability: MEMBERSHIP_CAPABILITY.into()
            }),
            "CAP REQ :twitch.tv/membership"
        );
        assert_eq!(
            format_outbound(&Outbound::Part { channel: "chan".into() }),
            "PART #chan"
        );
    }

    #[test]
    fn privmsg_text_is_single_line() {
        let line = format_outbound(&Outbound::Privmsg {
            channel: "chan".into(),
            text: "hi\r\nPART #chan".into(),
        });
        assert_eq!(line, "PRIVMSG #chan :hi");
    }

    #[test]
    fn line_buffer_carries_fragments() {
        let mut buf = LineBuffer::new();
        buf.extend(b"PING :tmi.tw");
        assert_eq!(buf.next_line(), None);
        buf.extend(b"itch.tv\r\n:a!a@h JOIN #x\r\n:b!b");
        assert_eq!(buf.next_line().as_deref(), Some(PING_CHALLENGE));
        assert_eq!(buf.next_line().as_deref(), Some(":a!a@h JOIN #x"));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.pending(), 4);
        buf.extend(b"@h PART #x\r\n");
        assert_eq!(buf.next_line().as_deref(), Some(":b!b@h PART #x"));
    }

    #[test]
    fn oversized_line_tail_is_not_a_frame() {
        let mut buf = LineBuffer::new();
        buf.extend(&vec![b'x'; MAX_LINE + 1]);
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.pending(), 0);

        buf.extend(b"xxxx");
        assert_eq!(buf.next_line(), None);
        buf.extend(b":evil!e@h PRIVMSG #chan :!ping\r\nPING :tmi.twitch.tv\r\n");
        assert_eq!(buf.next_line().as_deref(), Some(PING_CHALLENGE));
        assert_eq!(buf.next_line(), None);

        buf.extend(b":a!a@h JOIN #x\r\n");
        assert_eq!(buf.next_line().as_deref(), Some(":a!a@h JOIN #x"));
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_stamped_in_read_order() {
        let mut buf = LineBuffer::new();
        buf.extend(b":a!a@h PRIVMSG #x :first\r\n:b!b@h JOIN #x\r\n");
        let first = match parse_line(&buf.next_line().unwrap()).unwrap() {
            Inbound::Event(Event::Message(me)) => me.received_at,
            other => panic!("expected message, got {other:?}"),
        };
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        let second = match parse_line(&buf.next_line().unwrap()).unwrap() {
            Inbound::Event(Event::Join(je)) => je.received_at,
            other => panic!("expected join, got {other:?}"),
        };
        assert!(first <= second);
        assert!(first < second);
    }

    #[test]
    fn line_buffer_skips_blank_frames() {
        let mut buf = LineBuffer::new();
        buf.extend(b"\r\n\r\nPING :tmi.twitch.tv\n");
        assert_eq!(buf.next_line().as_deref(), Some(PING_CHALLENGE));
    }
}
