//! Per-connection streaming parser for the line-oriented wire protocol.
//!
//! The parser owns CRLF framing: callers feed raw socket bytes in whatever
//! chunks the transport delivers, and the parser emits the same event stream
//! regardless of segmentation. Header mode consumes one CRLF-terminated line
//! at a time; payload mode accumulates exactly the advertised byte count
//! (payload bytes may themselves contain CRLF) and requires the trailing
//! CRLF terminator.
//!
//! Parse errors are recoverable: the parser emits the error event, resyncs
//! at the next CRLF where needed, and keeps going. Only `quit` (and the
//! transport itself) ends a connection.

use bytes::{Buf, BytesMut};

use super::command::{self, Argument, ParamKind, Request, Verb};

/// Recoverable wire-level parse errors, each with a fixed response token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Unknown verb, or trailing tokens after a complete command.
    #[error("unknown command or trailing tokens")]
    BadCommand,
    /// Missing or malformed required positional argument.
    #[error("missing or malformed positional argument")]
    BadFormat,
    /// Payload bytes do not match the advertised byte count.
    #[error("payload does not match the advertised byte count")]
    BadPayload,
}

impl WireError {
    /// The exact token written back to the client.
    #[must_use]
    pub fn wire_token(self) -> &'static str {
        match self {
            WireError::BadCommand => command::ERROR,
            WireError::BadFormat => command::CLIENT_ERROR_BAD_FORMAT,
            WireError::BadPayload => command::CLIENT_ERROR_BAD_DATA_CHUNK,
        }
    }
}

/// One unit of parser output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserEvent {
    /// A complete command ready for the interpreter.
    Request(Request),
    /// A recoverable parse error; respond with its token and continue.
    Error(WireError),
    /// The client asked to close the connection.
    Quit,
}

enum State {
    /// Waiting for a CRLF-terminated command line.
    Header,
    /// Waiting for `expected` payload bytes plus the CRLF terminator.
    Payload {
        verb: Verb,
        args: Vec<Argument>,
        expected: usize,
    },
    /// Resynchronizing after a bad payload: drop bytes through the next CRLF.
    Discard,
}

/// Streaming parser: `Header`/`Payload` state machine over an internal
/// buffer. One instance per connection.
pub struct LineParser {
    buffer: BytesMut,
    state: State,
}

impl LineParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            state: State::Header,
        }
    }

    /// Feeds one chunk of bytes and returns every event it completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<ParserEvent> {
        self.buffer.extend_from_slice(data);
        let mut events = Vec::new();
        loop {
            match std::mem::replace(&mut self.state, State::Header) {
                State::Header => {
                    let Some(line_end) = find_crlf(&self.buffer) else {
                        break;
                    };
                    let line = self.buffer.split_to(line_end);
                    self.buffer.advance(2);
                    let line = String::from_utf8_lossy(&line).into_owned();
                    if line.split_whitespace().next().is_none() {
                        // Blank line (e.g. the stray CRLF after a completed
                        // zero-byte payload): no response.
                        continue;
                    }
                    match self.parse_header(&line) {
                        Ok(Some(event)) => events.push(event),
                        Ok(None) => {} // transitioned to Payload
                        Err(error) => events.push(ParserEvent::Error(error)),
                    }
                }
                State::Payload {
                    verb,
                    args,
                    expected,
                } => {
                    if self.buffer.len() < expected + 2 {
                        self.state = State::Payload {
                            verb,
                            args,
                            expected,
                        };
                        break;
                    }
                    if &self.buffer[expected..expected + 2] == b"\r\n" {
                        let payload = self.buffer.split_to(expected).to_vec();
                        self.buffer.advance(2);
                        events.push(ParserEvent::Request(Request {
                            verb,
                            args,
                            payload: Some(payload),
                        }));
                    } else {
                        self.state = State::Discard;
                        events.push(ParserEvent::Error(WireError::BadPayload));
                    }
                }
                State::Discard => match find_crlf(&self.buffer) {
                    Some(line_end) => {
                        self.buffer.advance(line_end + 2);
                    }
                    None => {
                        self.buffer.clear();
                        self.state = State::Discard;
                        break;
                    }
                },
            }
        }
        events
    }

    /// Parses one header line. `Ok(None)` means the parser moved to payload
    /// mode and has nothing to emit yet.
    fn parse_header(&mut self, line: &str) -> Result<Option<ParserEvent>, WireError> {
        let mut tokens = line.split_whitespace();
        let verb_token = tokens.next().unwrap_or_default();
        let verb: Verb = verb_token.parse().map_err(|()| WireError::BadCommand)?;
        if verb == Verb::Quit {
            return Ok(Some(ParserEvent::Quit));
        }

        let syntax = verb.syntax();
        let mut args = Vec::with_capacity(syntax.params.len());
        for kind in syntax.params {
            match tokens.next() {
                Some(token) => args.push(match kind {
                    ParamKind::Str | ParamKind::OptionalStr => Argument::Str(token.to_string()),
                    ParamKind::Num | ParamKind::OptionalNum => Argument::Num(
                        token.parse::<i64>().map_err(|_| WireError::BadFormat)?,
                    ),
                }),
                None if kind.is_required() => return Err(WireError::BadFormat),
                None => break,
            }
        }
        if tokens.next().is_some() {
            return Err(WireError::BadCommand);
        }

        if syntax.takes_payload {
            let Some(Argument::Num(bytes)) = args.get(3) else {
                return Err(WireError::BadFormat);
            };
            let expected = usize::try_from(*bytes).map_err(|_| WireError::BadFormat)?;
            if expected > 0 {
                self.state = State::Payload {
                    verb,
                    args,
                    expected,
                };
                return Ok(None);
            }
            return Ok(Some(ParserEvent::Request(Request {
                verb,
                args,
                payload: Some(Vec::new()),
            })));
        }

        Ok(Some(ParserEvent::Request(Request {
            verb,
            args,
            payload: None,
        })))
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(verb: Verb, args: Vec<Argument>, payload: Option<&[u8]>) -> ParserEvent {
        ParserEvent::Request(Request {
            verb,
            args,
            payload: payload.map(<[u8]>::to_vec),
        })
    }

    #[test]
    fn parses_a_simple_get() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"get foo\r\n");
        assert_eq!(
            events,
            vec![request(
                Verb::Get,
                vec![Argument::Str("foo".to_string())],
                None
            )]
        );
    }

    #[test]
    fn header_split_across_chunks() {
        let mut parser = LineParser::new();
        assert!(parser.feed(b"ge").is_empty());
        assert!(parser.feed(b"t fo").is_empty());
        let events = parser.feed(b"o\r\n");
        assert_eq!(
            events,
            vec![request(
                Verb::Get,
                vec![Argument::Str("foo".to_string())],
                None
            )]
        );
    }

    #[test]
    fn storage_command_carries_payload() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set foo 0 0 5\r\nhello\r\n");
        assert_eq!(
            events,
            vec![request(
                Verb::Set,
                vec![
                    Argument::Str("foo".to_string()),
                    Argument::Num(0),
                    Argument::Num(0),
                    Argument::Num(5),
                ],
                Some(b"hello"),
            )]
        );
    }

    #[test]
    fn payload_split_with_crlf_at_chunk_boundary() {
        let mut parser = LineParser::new();
        assert!(parser.feed(b"set k 0 0 10\r\n01234").is_empty());
        assert!(parser.feed(b"56789").is_empty());
        let events = parser.feed(b"\r\n");
        assert_eq!(events.len(), 1);
        let ParserEvent::Request(req) = &events[0] else {
            panic!("expected a request");
        };
        assert_eq!(req.payload.as_deref(), Some(b"0123456789".as_slice()));
    }

    #[test]
    fn payload_may_contain_crlf() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set k 0 0 12\r\nhello\r\nworld\r\n");
        assert_eq!(events.len(), 1);
        let ParserEvent::Request(req) = &events[0] else {
            panic!("expected a request");
        };
        assert_eq!(req.payload.as_deref(), Some(b"hello\r\nworld".as_slice()));
    }

    #[test]
    fn zero_byte_payload_completes_on_the_header_line() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set k 0 0 0\r\n\r\n");
        assert_eq!(events.len(), 1);
        let ParserEvent::Request(req) = &events[0] else {
            panic!("expected a request");
        };
        assert_eq!(req.payload.as_deref(), Some(b"".as_slice()));
    }

    #[test]
    fn oversized_payload_is_a_bad_data_chunk() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set k 0 0 5\r\ntoolongdata\r\n");
        assert_eq!(events, vec![ParserEvent::Error(WireError::BadPayload)]);
        // The parser resynchronized; the next command parses cleanly.
        let events = parser.feed(b"get k\r\n");
        assert_eq!(
            events,
            vec![request(Verb::Get, vec![Argument::Str("k".to_string())], None)]
        );
    }

    #[test]
    fn unknown_verb_is_an_error_and_parsing_continues() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"frobnicate\r\nversion\r\n");
        assert_eq!(
            events,
            vec![
                ParserEvent::Error(WireError::BadCommand),
                request(Verb::Version, vec![], None),
            ]
        );
    }

    #[test]
    fn missing_required_argument_is_bad_format() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set foo\r\n");
        assert_eq!(events, vec![ParserEvent::Error(WireError::BadFormat)]);
    }

    #[test]
    fn non_numeric_number_token_is_bad_format() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"incr n five\r\n");
        assert_eq!(events, vec![ParserEvent::Error(WireError::BadFormat)]);
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"get foo bar\r\n");
        assert_eq!(events, vec![ParserEvent::Error(WireError::BadCommand)]);
    }

    #[test]
    fn quit_is_a_sentinel_event() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"quit\r\n");
        assert_eq!(events, vec![ParserEvent::Quit]);
    }

    #[test]
    fn blank_lines_produce_no_events() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"\r\n  \r\nget a\r\n");
        assert_eq!(
            events,
            vec![request(Verb::Get, vec![Argument::Str("a".to_string())], None)]
        );
    }

    #[test]
    fn pipelined_commands_in_one_chunk() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set a 0 0 1\r\nx\r\nget a\r\n");
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ParserEvent::Request(r) if r.verb == Verb::Set));
        assert!(matches!(&events[1], ParserEvent::Request(r) if r.verb == Verb::Get));
    }

    #[test]
    fn flush_all_accepts_an_optional_delay() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"flush_all\r\nflush_all 30\r\n");
        assert_eq!(
            events,
            vec![
                request(Verb::FlushAll, vec![], None),
                request(Verb::FlushAll, vec![Argument::Num(30)], None),
            ]
        );
    }

    #[test]
    fn negative_byte_count_is_bad_format() {
        let mut parser = LineParser::new();
        let events = parser.feed(b"set k 0 0 -1\r\n");
        assert_eq!(events, vec![ParserEvent::Error(WireError::BadFormat)]);
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    /// A fixed stream of valid commands covering both parser states.
    const STREAM: &[u8] = b"set foo 1 0 5\r\nhello\r\nget foo\r\nset bin 0 0 10\r\nab\r\ncd\r\nef\r\nincr n 4\r\ndelete foo\r\nstats\r\nversion\r\n";

    proptest! {
        #[test]
        fn event_stream_is_independent_of_segmentation(
            cuts in proptest::collection::vec(0_usize..STREAM.len(), 0..12)
        ) {
            let mut whole = LineParser::new();
            let expected = whole.feed(STREAM);

            let mut cuts = cuts;
            cuts.sort_unstable();
            cuts.dedup();
            let mut split = LineParser::new();
            let mut events = Vec::new();
            let mut start = 0;
            for cut in cuts {
                events.extend(split.feed(&STREAM[start..cut]));
                start = cut;
            }
            events.extend(split.feed(&STREAM[start..]));

            prop_assert_eq!(events, expected);
        }
    }
}
