use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                full_name   TEXT,
                emp_id      TEXT,
                position    TEXT,
                logo        BLOB,
                status      TEXT NOT NULL DEFAULT 'pending',
                reset_req   INTEGER NOT NULL DEFAULT 0,
                role        TEXT NOT NULL DEFAULT 'user',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Append-only: one row per signing event
            CREATE TABLE documents (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                doc_no      TEXT NOT NULL,
                doc_name    TEXT NOT NULL,
                remarks     TEXT NOT NULL,
                signed_at   TEXT NOT NULL,
                hash        TEXT NOT NULL
            );

            CREATE INDEX idx_documents_user ON documents(user_id);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                sender_id   TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                body        TEXT NOT NULL,
                time        TEXT NOT NULL
            );

            CREATE INDEX idx_messages_pair ON messages(sender_id, receiver_id);

            CREATE TABLE settings (
                id      INTEGER PRIMARY KEY CHECK (id = 1),
                bg_img  BLOB
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
