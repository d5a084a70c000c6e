//! Binds parsed commands to cache operations and renders wire responses.
//!
//! The interpreter owns all side effects against the shared [`Cache`]: the
//! parser hands it a [`Request`], it calls the matching cache method, and it
//! formats the result into the exact response bytes (without the trailing
//! CRLF, which the connection writer appends).

use std::sync::Arc;

use crate::cache::{Cache, CacheError};
use crate::protocol::command::{self, Request, Verb};

/// The interpreter's verdict on one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Response bytes, without the trailing CRLF.
    pub body: Vec<u8>,
    /// Whether the command mutated the cache and a purge pass should run
    /// before the connection reads further input.
    pub mutated: bool,
    /// A `flush_all <delay>` asks the server to schedule a deferred flush.
    pub deferred_flush_secs: Option<i64>,
}

impl Reply {
    fn line(token: impl Into<String>) -> Self {
        Self {
            body: token.into().into_bytes(),
            mutated: false,
            deferred_flush_secs: None,
        }
    }

    fn mutating(token: impl Into<String>) -> Self {
        Self {
            mutated: true,
            ..Self::line(token)
        }
    }
}

/// Per-connection command executor sharing one [`Cache`].
pub struct Interpreter {
    cache: Arc<Cache>,
}

impl Interpreter {
    #[must_use]
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Executes one parsed command against the cache.
    ///
    /// The parser guarantees the arity its syntax table promises, so the
    /// argument accessors here only fail on a parser bug; that surfaces as
    /// the generic `ERROR` token rather than a panic.
    #[must_use]
    pub fn execute(&self, request: &Request) -> Reply {
        match request.verb {
            Verb::Get => self.run_get(request),
            Verb::Set | Verb::Add | Verb::Replace => self.run_store(request),
            Verb::Append | Verb::Prepend => self.run_splice(request),
            Verb::Delete => self.run_delete(request),
            Verb::Incr | Verb::Decr => self.run_counter(request),
            Verb::Touch => self.run_touch(request),
            Verb::Stats => self.run_stats(),
            Verb::Flush => {
                self.cache.flush();
                Reply::line(command::OK)
            }
            Verb::FlushAll => self.run_flush_all(request),
            Verb::Version => Reply::line(format!(
                "{}{}",
                command::VERSION_PREFIX,
                self.cache.version()
            )),
            Verb::Verbosity => {
                self.cache.verbosity(request.num_arg(0).unwrap_or(0));
                Reply::line(command::OK)
            }
            // The parser intercepts quit; reaching here is a caller bug.
            Verb::Quit => Reply::line(command::ERROR),
        }
    }

    fn run_get(&self, request: &Request) -> Reply {
        let Some(key) = request.str_arg(0) else {
            return Reply::line(command::ERROR);
        };
        match self.cache.get_record(key) {
            None => Reply::line(command::END),
            Some(record) => {
                let mut body = format!(
                    "{}{key} {} {}\r\n",
                    command::VALUE_PREFIX,
                    record.flags,
                    record.value.len()
                )
                .into_bytes();
                body.extend_from_slice(&record.value);
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(command::END.as_bytes());
                Reply {
                    body,
                    mutated: false,
                    deferred_flush_secs: None,
                }
            }
        }
    }

    fn run_store(&self, request: &Request) -> Reply {
        let (Some(key), Some(flags), Some(exptime)) = (
            request.str_arg(0),
            request.num_arg(1),
            request.num_arg(2),
        ) else {
            return Reply::line(command::ERROR);
        };
        let value = request.payload.clone().unwrap_or_default();
        let flags = u32::try_from(flags).unwrap_or(0);
        let stored = match request.verb {
            Verb::Set => self.cache.set(key, value, exptime, flags),
            Verb::Add => self.cache.add(key, value, exptime, flags),
            Verb::Replace => self.cache.replace(key, value, exptime, flags),
            _ => return Reply::line(command::ERROR),
        };
        Reply::mutating(if stored {
            command::STORED
        } else {
            command::NOT_STORED
        })
    }

    fn run_splice(&self, request: &Request) -> Reply {
        let Some(key) = request.str_arg(0) else {
            return Reply::line(command::ERROR);
        };
        let value = request.payload.as_deref().unwrap_or_default();
        let stored = match request.verb {
            Verb::Append => self.cache.append(key, value),
            Verb::Prepend => self.cache.prepend(key, value),
            _ => return Reply::line(command::ERROR),
        };
        Reply::mutating(if stored {
            command::STORED
        } else {
            command::NOT_STORED
        })
    }

    fn run_delete(&self, request: &Request) -> Reply {
        let Some(key) = request.str_arg(0) else {
            return Reply::line(command::ERROR);
        };
        Reply::mutating(if self.cache.delete(key) {
            command::DELETED
        } else {
            command::NOT_FOUND
        })
    }

    fn run_counter(&self, request: &Request) -> Reply {
        let (Some(key), Some(delta)) = (request.str_arg(0), request.num_arg(1)) else {
            return Reply::line(command::ERROR);
        };
        let result = match request.verb {
            Verb::Incr => self.cache.incr(key, delta),
            Verb::Decr => self.cache.decr(key, delta),
            _ => return Reply::line(command::ERROR),
        };
        match result {
            Ok(Some(value)) => Reply::line(value.to_string()),
            Ok(None) => Reply::line(command::NOT_FOUND),
            Err(CacheError::NonNumeric) => Reply::line(command::CLIENT_ERROR_NON_NUMERIC),
        }
    }

    fn run_touch(&self, request: &Request) -> Reply {
        let (Some(key), Some(exptime)) = (request.str_arg(0), request.num_arg(1)) else {
            return Reply::line(command::ERROR);
        };
        Reply::mutating(if self.cache.touch(key, exptime) {
            command::TOUCHED
        } else {
            command::NOT_FOUND
        })
    }

    fn run_stats(&self) -> Reply {
        let mut body = String::new();
        for (name, value) in self.cache.stats() {
            body.push_str(command::STATS_PREFIX);
            body.push_str(name);
            body.push(' ');
            body.push_str(&value);
            body.push_str("\r\n");
        }
        body.push_str(command::END);
        Reply::line(body)
    }

    fn run_flush_all(&self, request: &Request) -> Reply {
        let delay_secs = request.num_arg(0).unwrap_or(0);
        if delay_secs > 0 {
            return Reply {
                body: command::OK.as_bytes().to_vec(),
                mutated: false,
                deferred_flush_secs: Some(delay_secs),
            };
        }
        self.cache.flush();
        Reply::line(command::OK)
    }
}
