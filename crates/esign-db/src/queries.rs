use std::str::FromStr;

use crate::Database;
use crate::models::{ActivityRow, DocumentRow, MessageRow, UserRow};
use anyhow::Result;
use esign_types::models::{ADMIN_USERNAME, ResetState, Role, UserStatus};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, password, full_name, emp_id, position, \
     logo IS NOT NULL, status, reset_req, role, created_at";

impl Database {
    // -- Users --

    /// Insert a pending user. Returns false if the username is taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, status, role)
                 VALUES (?1, ?2, ?3, 'pending', 'user')
                 ON CONFLICT(username) DO NOTHING",
                (id, username, password_hash),
            )?;
            Ok(inserted == 1)
        })
    }

    /// Create the bootstrap admin unless it already exists.
    /// Returns true when a new row was written.
    pub fn ensure_admin(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, status, role, full_name)
                 VALUES (?1, ?2, ?3, 'active', 'admin', 'Super Admin')
                 ON CONFLICT(username) DO NOTHING",
                (id, ADMIN_USERNAME, password_hash),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn admin_id(&self) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM users WHERE username = ?1",
                [ADMIN_USERNAME],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn set_status(&self, id: &str, status: UserStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET status = ?1 WHERE id = ?2",
                (status.as_str(), id),
            )?;
            Ok(updated == 1)
        })
    }

    /// Move a user's reset workflow from `from` to `to`.
    /// Returns false if the user was not in state `from`.
    pub fn transition_reset(&self, id: &str, from: ResetState, to: ResetState) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET reset_req = ?1 WHERE id = ?2 AND reset_req = ?3",
                (to.as_i64(), id, from.as_i64()),
            )?;
            Ok(updated == 1)
        })
    }

    /// Store a new password for a user whose reset was granted, closing the
    /// reset workflow.
    pub fn complete_reset(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET password = ?1, reset_req = ?2 WHERE id = ?3 AND reset_req = ?4",
                (
                    password_hash,
                    ResetState::None.as_i64(),
                    id,
                    ResetState::Granted.as_i64(),
                ),
            )?;
            Ok(updated == 1)
        })
    }

    pub fn update_profile(
        &self,
        id: &str,
        full_name: &str,
        emp_id: &str,
        position: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET full_name = ?1, emp_id = ?2, position = ?3 WHERE id = ?4",
                (full_name, emp_id, position, id),
            )?;
            Ok(updated == 1)
        })
    }

    pub fn set_logo(&self, id: &str, logo: &[u8]) -> Result<bool> {
        self.with_conn(|conn| {
            let updated =
                conn.execute("UPDATE users SET logo = ?1 WHERE id = ?2", rusqlite::params![logo, id])?;
            Ok(updated == 1)
        })
    }

    pub fn get_logo(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let logo: Option<Option<Vec<u8>>> = conn
                .query_row("SELECT logo FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(logo.flatten())
        })
    }

    pub fn list_users_by_status(&self, status: UserStatus) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE status = ?1 ORDER BY rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status.as_str()], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_reset_requests(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_req = ?1 ORDER BY rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([ResetState::Requested.as_i64()], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_users_by_role(&self, role: Role) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY username");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([role.as_str()], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self, role: Role) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?1",
                [role.as_str()],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Documents --

    pub fn insert_document(&self, doc: &DocumentRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, user_id, doc_no, doc_name, remarks, signed_at, hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    &doc.id,
                    &doc.user_id,
                    &doc.doc_no,
                    &doc.doc_name,
                    doc.remarks.as_str(),
                    &doc.signed_at,
                    &doc.hash,
                ),
            )?;
            Ok(())
        })
    }

    /// A user's documents, newest first.
    pub fn list_documents(&self, user_id: &str) -> Result<Vec<DocumentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, doc_no, doc_name, remarks, signed_at, hash
                 FROM documents
                 WHERE user_id = ?1
                 ORDER BY rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(DocumentRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        doc_no: row.get(2)?,
                        doc_name: row.get(3)?,
                        remarks: parse_column(row, 4)?,
                        signed_at: row.get(5)?,
                        hash: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Number of documents, for one user or across everyone.
    pub fn count_documents(&self, user_id: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = match user_id {
                Some(uid) => conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE user_id = ?1",
                    [uid],
                    |r| r.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?,
            };
            Ok(count as u64)
        })
    }

    /// Latest signing events with the signer's username.
    pub fn recent_activity(&self, limit: u32) -> Result<Vec<ActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.signed_at, u.username, d.doc_name
                 FROM documents d
                 JOIN users u ON d.user_id = u.id
                 ORDER BY d.rowid DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(ActivityRow {
                        signed_at: row.get(0)?,
                        username: row.get(1)?,
                        doc_name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, msg: &MessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, body, time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (&msg.id, &msg.sender_id, &msg.receiver_id, &msg.body, &msg.time),
            )?;
            Ok(())
        })
    }

    /// Both directions of a two-party conversation, oldest first.
    pub fn get_conversation(&self, a: &str, b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, body, time
                 FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY rowid ASC",
            )?;
            let rows = stmt
                .query_map([a, b], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        receiver_id: row.get(2)?,
                        body: row.get(3)?,
                        time: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Settings --

    pub fn set_background(&self, image: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (id, bg_img) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET bg_img = excluded.bg_img",
                [image],
            )?;
            Ok(())
        })
    }

    pub fn get_background(&self) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let image: Option<Option<Vec<u8>>> = conn
                .query_row("SELECT bg_img FROM settings WHERE id = 1", [], |row| row.get(0))
                .optional()?;
            Ok(image.flatten())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    let reset_code: i64 = row.get(8)?;
    let reset = ResetState::from_i64(reset_code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Integer, Box::new(e)))?;

    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        full_name: row.get(3)?,
        emp_id: row.get(4)?,
        position: row.get(5)?,
        has_logo: row.get(6)?,
        status: parse_column(row, 7)?,
        reset,
        role: parse_column(row, 9)?,
        created_at: row.get(10)?,
    })
}

/// Read a text column into one of the string-backed enums.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esign_types::models::Remarks;
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn add_user(db: &Database, username: &str) -> String {
        let id = new_id();
        assert!(db.create_user(&id, username, "hash").unwrap());
        id
    }

    fn doc(user_id: &str, doc_name: &str) -> DocumentRow {
        DocumentRow {
            id: new_id(),
            user_id: user_id.to_string(),
            doc_no: "N-1".into(),
            doc_name: doc_name.into(),
            remarks: Remarks::Original,
            signed_at: "10:00:00 01/01/2024".into(),
            hash: "ab".repeat(32),
        }
    }

    #[test]
    fn admin_bootstrap_is_idempotent() {
        let db = db();
        assert!(db.ensure_admin(&new_id(), "h1").unwrap());
        assert!(!db.ensure_admin(&new_id(), "h2").unwrap());

        let admin = db.get_user_by_username(ADMIN_USERNAME).unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.status, UserStatus::Active);
        assert_eq!(admin.password, "h1");
        assert_eq!(db.admin_id().unwrap(), Some(admin.id));
        assert_eq!(db.count_users(Role::Admin).unwrap(), 1);
    }

    #[test]
    fn usernames_are_unique_and_start_pending() {
        let db = db();
        let id = add_user(&db, "alice");
        assert!(!db.create_user(&new_id(), "alice", "other").unwrap());

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.reset, ResetState::None);
        assert_eq!(user.role, Role::User);
        assert!(!user.has_logo);
        assert!(!user.profile_complete());

        assert_eq!(db.list_users_by_status(UserStatus::Pending).unwrap().len(), 1);
        assert!(db.set_status(&id, UserStatus::Active).unwrap());
        assert!(db.list_users_by_status(UserStatus::Pending).unwrap().is_empty());
    }

    #[test]
    fn reset_workflow_only_moves_forward() {
        let db = db();
        let id = add_user(&db, "bob");

        // Cannot grant or complete before a request
        assert!(!db.transition_reset(&id, ResetState::Requested, ResetState::Granted).unwrap());
        assert!(!db.complete_reset(&id, "new").unwrap());

        assert!(db.transition_reset(&id, ResetState::None, ResetState::Requested).unwrap());
        assert_eq!(db.list_reset_requests().unwrap().len(), 1);
        assert!(db.transition_reset(&id, ResetState::Requested, ResetState::Granted).unwrap());
        assert!(db.list_reset_requests().unwrap().is_empty());

        assert!(db.complete_reset(&id, "new").unwrap());
        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.password, "new");
        assert_eq!(user.reset, ResetState::None);
    }

    #[test]
    fn profile_and_logo() {
        let db = db();
        let id = add_user(&db, "carol");
        assert!(db.update_profile(&id, "Carol K", "E9", "Clerk").unwrap());
        assert!(db.set_logo(&id, &[1, 2, 3]).unwrap());

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert!(user.profile_complete());
        assert!(user.has_logo);
        assert_eq!(user.position.as_deref(), Some("Clerk"));
        assert_eq!(db.get_logo(&id).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(db.get_logo("missing").unwrap(), None);
    }

    #[test]
    fn documents_history_and_stats() {
        let db = db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");

        db.insert_document(&doc(&alice, "first")).unwrap();
        db.insert_document(&doc(&alice, "second")).unwrap();
        db.insert_document(&doc(&bob, "third")).unwrap();

        let history = db.list_documents(&alice).unwrap();
        let names: Vec<&str> = history.iter().map(|d| d.doc_name.as_str()).collect();
        assert_eq!(names, ["second", "first"]);

        assert_eq!(db.count_documents(Some(&alice)).unwrap(), 2);
        assert_eq!(db.count_documents(None).unwrap(), 3);

        let recent = db.recent_activity(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].username, "bob");
        assert_eq!(recent[1].doc_name, "second");
    }

    #[test]
    fn conversation_is_scoped_to_the_pair() {
        let db = db();
        let (a, b, c) = (new_id(), new_id(), new_id());
        let send = |from: &str, to: &str, body: &str| {
            db.insert_message(&MessageRow {
                id: new_id(),
                sender_id: from.to_string(),
                receiver_id: to.to_string(),
                body: body.to_string(),
                time: "12:00".into(),
            })
            .unwrap();
        };

        send(&a, &b, "hi");
        send(&c, &a, "unrelated");
        send(&b, &a, "hello");

        let convo = db.get_conversation(&a, &b).unwrap();
        let bodies: Vec<&str> = convo.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["hi", "hello"]);
        assert_eq!(db.get_conversation(&b, &a).unwrap().len(), 2);
    }

    #[test]
    fn background_is_a_single_row() {
        let db = db();
        assert_eq!(db.get_background().unwrap(), None);
        db.set_background(&[1]).unwrap();
        db.set_background(&[2, 2]).unwrap();
        assert_eq!(db.get_background().unwrap(), Some(vec![2, 2]));
    }
}
