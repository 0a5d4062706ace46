table! {
    access_logs (id) {
        id -> Text,
        host_name -> Text,
        remote_addr -> Text,
        remote_user -> Text,
        time_local -> Text,
        epoch -> Nullable<BigInt>,
        method -> Text,
        path -> Text,
        version -> Text,
        status -> Text,
        body_bytes_sent -> Text,
        referer -> Text,
        user_agent -> Text,
        created_at -> BigInt,
        created_by -> Text,
        is_deleted -> Bool,
    }
}

/// Statement run when a store is opened so a fresh database file is usable right away.
pub const CREATE_ACCESS_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS access_logs (
    id              TEXT PRIMARY KEY NOT NULL,
    host_name       TEXT NOT NULL,
    remote_addr     TEXT NOT NULL,
    remote_user     TEXT NOT NULL,
    time_local      TEXT NOT NULL,
    epoch           BIGINT,
    method          TEXT NOT NULL,
    path            TEXT NOT NULL,
    version         TEXT NOT NULL,
    status          TEXT NOT NULL,
    body_bytes_sent TEXT NOT NULL,
    referer         TEXT NOT NULL,
    user_agent      TEXT NOT NULL,
    created_at      BIGINT NOT NULL,
    created_by      TEXT NOT NULL,
    is_deleted      BOOLEAN NOT NULL DEFAULT 0
)
"#;
