use crate::schema::access_logs;
use std::fmt;

/// Column names of the CSV output, in the order of `LogRecord::fields`.
pub const CSV_HEADER: [&str; 10] = [
    "IP",
    "Timestamp",
    "RequestMethod",
    "RequestURI",
    "HTTPVersion",
    "ResponseStatus",
    "ResponseSize",
    "Referer",
    "UserAgent",
    "RemoteUser",
];

/// One parsed access log line. Missing values are empty strings so every record has the same
/// number of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub remote_addr: String,
    pub time_local: String,
    pub method: String,
    pub path: String,
    pub version: String,
    pub status: String,
    pub body_bytes_sent: String,
    pub referer: String,
    pub user_agent: String,
    pub remote_user: String,
}

impl LogRecord {
    pub fn fields(&self) -> [&str; 10] {
        [
            self.remote_addr.as_str(),
            self.time_local.as_str(),
            self.method.as_str(),
            self.path.as_str(),
            self.version.as_str(),
            self.status.as_str(),
            self.body_bytes_sent.as_str(),
            self.referer.as_str(),
            self.user_agent.as_str(),
            self.remote_user.as_str(),
        ]
    }
}

fn or_na(s: &str) -> &str {
    if s.is_empty() {
        "NA"
    } else {
        s
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {} {} {} {} {} {} {}",
            or_na(&self.remote_addr),
            or_na(&self.remote_user),
            or_na(&self.time_local),
            or_na(&self.method),
            or_na(&self.path),
            or_na(&self.version),
            or_na(&self.status),
            or_na(&self.body_bytes_sent),
            or_na(&self.referer),
            or_na(&self.user_agent),
        )
    }
}

/// A row read back from the `access_logs` table.
#[derive(Debug, Queryable, PartialEq)]
pub struct StoredLog {
    pub id: String,
    pub host_name: String,
    pub remote_addr: String,
    pub remote_user: String,
    pub time_local: String,
    pub epoch: Option<i64>,
    pub method: String,
    pub path: String,
    pub version: String,
    pub status: String,
    pub body_bytes_sent: String,
    pub referer: String,
    pub user_agent: String,
    pub created_at: i64,
    pub created_by: String,
    pub is_deleted: bool,
}

#[derive(Debug, Insertable, PartialEq)]
#[table_name = "access_logs"]
pub struct NewLog<'a> {
    pub id: String,
    pub host_name: &'a str,
    pub remote_addr: &'a str,
    pub remote_user: &'a str,
    pub time_local: &'a str,
    pub epoch: Option<i64>,
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
    pub status: &'a str,
    pub body_bytes_sent: &'a str,
    pub referer: &'a str,
    pub user_agent: &'a str,
    pub created_at: i64,
    pub created_by: &'a str,
    pub is_deleted: bool,
}
