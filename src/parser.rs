use crate::models::LogRecord;
use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};

#[derive(Fail, Debug, PartialEq)]
pub enum ParseError {
    #[fail(display = "Empty log line")]
    EmptyLine,

    #[fail(display = "Text did not match any access log grammar `{}`", _0)]
    UnparseableLine(String),

    #[fail(display = "Unable to parse date `{}`: {}", _0, _1)]
    BadDate(String, #[cause] chrono::ParseError),
}

/// A fixed-field line layout. Tiers are tried in the order of `GRAMMARS` and the first one that
/// matches wins.
pub struct GrammarTier {
    pub name: &'static str,
    pub parse: fn(&str) -> Option<LogRecord>,
}

pub static GRAMMARS: [GrammarTier; 2] = [
    GrammarTier {
        name: "combined",
        parse: parse_combined,
    },
    GrammarTier {
        name: "common",
        parse: parse_common,
    },
];

lazy_static! {
    static ref COMBINED: Regex = Regex::new(r#"(?x)
        ^(?P<remote_addr>\S+)
        \s+\S+
        \s+(?P<remote_user>\S+)
        \s+\[(?P<time_local>[^\]]+)\]
        \s+"(?P<request>[^"]*)"
        \s+(?P<status>\S+)
        \s+(?P<body_bytes_sent>\S+)
        \s+"(?P<referer>[^"]*)"
        \s+"(?P<user_agent>[^"]*)""#).unwrap();

    static ref COMMON: Regex = Regex::new(r#"(?x)
        ^(?P<remote_addr>\S+)
        \s+\S+
        \s+(?P<remote_user>\S+)
        \s+\[(?P<time_local>[^\]]+)\]
        \s+"(?P<request>[^"]*)"
        \s+(?P<status>\S+)
        \s+(?P<body_bytes_sent>\S+)"#).unwrap();
}

/// Parses a single access log line, trying each grammar tier in turn.
pub fn parse_nginx_line(text: &str) -> Result<LogRecord, ParseError> {
    let line = text.trim();
    if line.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    GRAMMARS
        .iter()
        .find_map(|tier| (tier.parse)(line))
        .ok_or_else(|| ParseError::UnparseableLine(String::from(line)))
}

/// The nginx `combined` layout: the common fields followed by the quoted referer and user agent.
pub fn parse_combined(line: &str) -> Option<LogRecord> {
    COMBINED.captures(line).map(|caps| {
        let mut record = common_fields(&caps);
        record.referer = String::from(&caps["referer"]);
        record.user_agent = String::from(&caps["user_agent"]);
        record
    })
}

/// The common log format, without referer and user agent.
pub fn parse_common(line: &str) -> Option<LogRecord> {
    COMMON.captures(line).map(|caps| common_fields(&caps))
}

fn common_fields(caps: &Captures) -> LogRecord {
    let (method, path, version) = split_request(&caps["request"]);
    LogRecord {
        remote_addr: String::from(&caps["remote_addr"]),
        remote_user: String::from(&caps["remote_user"]),
        time_local: String::from(&caps["time_local"]),
        method,
        path,
        version,
        status: String::from(&caps["status"]),
        body_bytes_sent: String::from(&caps["body_bytes_sent"]),
        ..LogRecord::default()
    }
}

/// Splits the request line on single spaces into method, path, and version. Missing tokens are
/// left empty and anything past the third token is dropped.
fn split_request(request: &str) -> (String, String, String) {
    let mut tokens = request.split(' ').map(String::from);
    let method = tokens.next().unwrap_or_default();
    let path = tokens.next().unwrap_or_default();
    let version = tokens.next().unwrap_or_default();
    (method, path, version)
}

/// Parses nginx's `$time_local` layout, e.g. `04/Nov/2017:13:05:35 -0500`.
pub fn parse_date(text: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    DateTime::parse_from_str(text, "%d/%b/%Y:%H:%M:%S %z")
        .map_err(|e| ParseError::BadDate(String::from(text), e))
}
