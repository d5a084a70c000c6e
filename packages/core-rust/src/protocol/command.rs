//! Command verbs, wire syntax table, and response tokens.
//!
//! The syntax table is static: each verb maps to an ordered list of
//! positional parameter kinds and a payload flag. The parser consumes header
//! tokens against it; the interpreter relies on the arity it guarantees.

use std::fmt;
use std::str::FromStr;

/// Every command the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Set,
    Add,
    Replace,
    Append,
    Prepend,
    Delete,
    Incr,
    Decr,
    Touch,
    Stats,
    Flush,
    FlushAll,
    Version,
    Verbosity,
    Quit,
}

impl Verb {
    /// The wire spelling of the verb.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Set => "set",
            Verb::Add => "add",
            Verb::Replace => "replace",
            Verb::Append => "append",
            Verb::Prepend => "prepend",
            Verb::Delete => "delete",
            Verb::Incr => "incr",
            Verb::Decr => "decr",
            Verb::Touch => "touch",
            Verb::Stats => "stats",
            Verb::Flush => "flush",
            Verb::FlushAll => "flush_all",
            Verb::Version => "version",
            Verb::Verbosity => "verbosity",
            Verb::Quit => "quit",
        }
    }

    /// The syntax row for this verb.
    #[must_use]
    pub fn syntax(self) -> &'static Syntax {
        match self {
            Verb::Get => &GET_SYNTAX,
            Verb::Set | Verb::Add | Verb::Replace | Verb::Append | Verb::Prepend => {
                &STORAGE_SYNTAX
            }
            Verb::Delete => &KEY_SYNTAX,
            Verb::Incr | Verb::Decr | Verb::Touch => &KEY_NUMBER_SYNTAX,
            Verb::Stats => &STATS_SYNTAX,
            Verb::Flush | Verb::Version | Verb::Quit => &BARE_SYNTAX,
            Verb::FlushAll | Verb::Verbosity => &OPTIONAL_NUMBER_SYNTAX,
        }
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "get" => Ok(Verb::Get),
            "set" => Ok(Verb::Set),
            "add" => Ok(Verb::Add),
            "replace" => Ok(Verb::Replace),
            "append" => Ok(Verb::Append),
            "prepend" => Ok(Verb::Prepend),
            "delete" => Ok(Verb::Delete),
            "incr" => Ok(Verb::Incr),
            "decr" => Ok(Verb::Decr),
            "touch" => Ok(Verb::Touch),
            "stats" => Ok(Verb::Stats),
            "flush" => Ok(Verb::Flush),
            "flush_all" => Ok(Verb::FlushAll),
            "version" => Ok(Verb::Version),
            "verbosity" => Ok(Verb::Verbosity),
            "quit" => Ok(Verb::Quit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Kind of one positional header parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Required string token.
    Str,
    /// Required base-10 integer token.
    Num,
    /// Optional string token.
    OptionalStr,
    /// Optional base-10 integer token.
    OptionalNum,
}

impl ParamKind {
    /// Whether the header is malformed when this token is missing.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, ParamKind::Str | ParamKind::Num)
    }
}

/// Wire syntax of one verb: positional parameters plus whether a counted
/// payload follows the header line.
#[derive(Debug)]
pub struct Syntax {
    /// Ordered parameter kinds after the verb token.
    pub params: &'static [ParamKind],
    /// Storage verbs carry `<bytes>` of payload after the header line.
    pub takes_payload: bool,
}

static GET_SYNTAX: Syntax = Syntax {
    params: &[ParamKind::Str],
    takes_payload: false,
};

/// `<key> <flags> <exptime> <bytes>` -- the whole `set` family.
static STORAGE_SYNTAX: Syntax = Syntax {
    params: &[ParamKind::Str, ParamKind::Num, ParamKind::Num, ParamKind::Num],
    takes_payload: true,
};

static KEY_SYNTAX: Syntax = Syntax {
    params: &[ParamKind::Str],
    takes_payload: false,
};

static KEY_NUMBER_SYNTAX: Syntax = Syntax {
    params: &[ParamKind::Str, ParamKind::Num],
    takes_payload: false,
};

static STATS_SYNTAX: Syntax = Syntax {
    params: &[ParamKind::OptionalStr],
    takes_payload: false,
};

static BARE_SYNTAX: Syntax = Syntax {
    params: &[],
    takes_payload: false,
};

static OPTIONAL_NUMBER_SYNTAX: Syntax = Syntax {
    params: &[ParamKind::OptionalNum],
    takes_payload: false,
};

/// One parsed positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Str(String),
    Num(i64),
}

/// A fully parsed command: verb, positional arguments, optional payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub verb: Verb,
    pub args: Vec<Argument>,
    pub payload: Option<Vec<u8>>,
}

impl Request {
    /// The string argument at `index`, if present and a string.
    #[must_use]
    pub fn str_arg(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(Argument::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The numeric argument at `index`, if present and numeric.
    #[must_use]
    pub fn num_arg(&self, index: usize) -> Option<i64> {
        match self.args.get(index) {
            Some(Argument::Num(n)) => Some(*n),
            _ => None,
        }
    }
}

// Response tokens. `STATS` (not `STAT`) matches the reply format this
// server's lineage speaks.
pub const STORED: &str = "STORED";
pub const NOT_STORED: &str = "NOT_STORED";
pub const DELETED: &str = "DELETED";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const TOUCHED: &str = "TOUCHED";
pub const END: &str = "END";
pub const OK: &str = "OK";
pub const ERROR: &str = "ERROR";
pub const VALUE_PREFIX: &str = "VALUE ";
pub const STATS_PREFIX: &str = "STATS ";
pub const VERSION_PREFIX: &str = "VERSION ";
pub const CLIENT_ERROR_PREFIX: &str = "CLIENT_ERROR ";
pub const CLIENT_ERROR_BAD_FORMAT: &str = "CLIENT_ERROR bad command line format";
pub const CLIENT_ERROR_BAD_DATA_CHUNK: &str = "CLIENT_ERROR bad data chunk";
pub const CLIENT_ERROR_NON_NUMERIC: &str =
    "CLIENT_ERROR cannot increment or decrement non-numeric value";
