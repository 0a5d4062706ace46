use crate::errors::DataError;
use crate::models::{LogRecord, NewLog, StoredLog};
use crate::parser::parse_date;
use crate::schema::{self, access_logs};
use chrono::prelude::*;
use diesel::connection::SimpleConnection;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::result::Error;
use diesel::sql_types::BigInt;
use uuid::Uuid;

/// Metadata stamped on every inserted row.
#[derive(Debug, Clone, PartialEq)]
pub struct Audit {
    pub host_name: String,
    pub created_by: String,
}

impl Default for Audit {
    fn default() -> Audit {
        Audit {
            host_name: String::from("-"),
            created_by: String::from("system"),
        }
    }
}

/// Persistence for parsed records. The connection is established by the caller and is released
/// when the store is closed or dropped.
pub struct LogStore {
    conn: SqliteConnection,
    audit: Audit,
}

impl LogStore {
    /// Takes ownership of the connection and creates the `access_logs` table if it is missing.
    pub fn new(conn: SqliteConnection, audit: Audit) -> Result<LogStore, DataError> {
        conn.batch_execute(schema::CREATE_ACCESS_LOGS)
            .map_err(|e| DataError::DbQuery(String::from("create access_logs"), e))?;
        Ok(LogStore { conn, audit })
    }

    /// Inserts the records in a single transaction.
    pub fn save(&self, records: &[LogRecord]) -> Result<(), DataError> {
        if records.is_empty() {
            return Ok(());
        }

        let start = Utc::now();
        let created_at = start.timestamp();
        self.conn
            .transaction::<_, Error, _>(|| {
                for record in records {
                    diesel::insert_into(access_logs::table)
                        .values(&self.new_log(record, created_at))
                        .execute(&self.conn)?;
                }
                Ok(())
            })
            .map_err(|e| DataError::DbQuery(String::from("insert access logs"), e))?;

        let dur = Utc::now().signed_duration_since(start);
        info!(
            "Inserting {} records took {}us",
            records.len(),
            dur.num_microseconds().unwrap_or(i64::max_value())
        );
        Ok(())
    }

    fn new_log<'a>(&'a self, record: &'a LogRecord, created_at: i64) -> NewLog<'a> {
        let epoch = match parse_date(&record.time_local) {
            Ok(date) => Some(date.timestamp()),
            Err(ref e) => {
                debug!("{}", e);
                None
            }
        };

        NewLog {
            id: Uuid::new_v4().to_string(),
            host_name: &self.audit.host_name,
            remote_addr: &record.remote_addr,
            remote_user: &record.remote_user,
            time_local: &record.time_local,
            epoch,
            method: &record.method,
            path: &record.path,
            version: &record.version,
            status: &record.status,
            body_bytes_sent: &record.body_bytes_sent,
            referer: &record.referer,
            user_agent: &record.user_agent,
            created_at,
            created_by: &self.audit.created_by,
            is_deleted: false,
        }
    }

    /// All stored rows in insertion order.
    pub fn records(&self) -> Result<Vec<StoredLog>, DataError> {
        access_logs::table
            .order(sql::<BigInt>("rowid"))
            .load::<StoredLog>(&self.conn)
            .map_err(|e| DataError::DbQuery(String::from("load access logs"), e))
    }

    pub fn close(self) {
        debug!("Closing store for {}", self.audit.host_name);
        drop(self.conn);
    }
}
