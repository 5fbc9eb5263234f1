//! SQLite-backed [`ForumStore`] adapter.
//!
//! Each collection is a table holding one JSON document per row, alongside
//! the handful of columns needed for lookups, uniqueness, and optimistic
//! version checks. Composite operations run inside a single transaction.
//!
//! rusqlite is synchronous, so every call moves onto the blocking thread
//! pool; a mutex serialises access to the one connection.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::answer::{Answer, AnswerId};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::ports::{CounterAdjustment, ForumStore, StoreError};
use crate::domain::question::{Question, QuestionId};
use crate::domain::user::{User, UserId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id       TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email    TEXT NOT NULL UNIQUE,
    doc      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS questions (
    id         TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL,
    version    INTEGER NOT NULL,
    doc        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS answers (
    id          TEXT PRIMARY KEY,
    question_id TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    version     INTEGER NOT NULL,
    doc         TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notifications (
    id           TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL,
    question_id  TEXT NOT NULL,
    answer_id    TEXT NOT NULL,
    read         INTEGER NOT NULL,
    doc          TEXT NOT NULL,
    UNIQUE (recipient_id, question_id, answer_id)
);
";

fn db_err(err: rusqlite::Error) -> StoreError {
    StoreError::backend(err.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::serialization(err.to_string()))
}

fn decode<T: DeserializeOwned>(doc: &str) -> Result<T, StoreError> {
    serde_json::from_str(doc).map_err(|err| StoreError::serialization(err.to_string()))
}

fn map_user_constraint(err: rusqlite::Error) -> StoreError {
    let message = err.to_string();
    if message.contains("users.username") {
        StoreError::duplicate("username")
    } else if message.contains("users.email") {
        StoreError::duplicate("email")
    } else {
        StoreError::backend(message)
    }
}

fn apply_adjustments(tx: &Transaction<'_>, adjustments: &[CounterAdjustment]) -> Result<(), StoreError> {
    for adjustment in adjustments {
        let doc: Option<String> = tx
            .query_row(
                "SELECT doc FROM users WHERE id = ?1",
                params![adjustment.user.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        // A counter for a deleted user has nowhere to land; drop it.
        let Some(doc) = doc else { continue };
        let mut user: User = decode(&doc)?;
        user.counters.apply(adjustment.delta);
        tx.execute(
            "UPDATE users SET doc = ?2 WHERE id = ?1",
            params![user.id.to_string(), encode(&user)?],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

/// Load a question for update, enforcing the expected version.
fn question_for_update(
    tx: &Transaction<'_>,
    id: &QuestionId,
    expected: u64,
) -> Result<Question, StoreError> {
    let doc: Option<String> = tx
        .query_row(
            "SELECT doc FROM questions WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    let Some(doc) = doc else {
        return Err(StoreError::Missing { entity: "question" });
    };
    let question: Question = decode(&doc)?;
    if question.version != expected {
        return Err(StoreError::VersionConflict { entity: "question" });
    }
    Ok(question)
}

fn write_question(tx: &Transaction<'_>, question: &Question) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE questions SET version = ?2, doc = ?3 WHERE id = ?1",
        params![
            question.id.to_string(),
            question.version as i64,
            encode(question)?
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

/// JSON-document-per-row store over a single SQLite connection.
pub struct SqliteForumStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteForumStore {
    /// Open (creating if necessary) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database. State is lost on drop.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        conn.pragma_update(None, "foreign_keys", "ON").map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::backend("connection mutex poisoned"))?;
            op(&mut conn)
        })
        .await
        .map_err(|err| StoreError::backend(format!("blocking task failed: {err}")))?
    }

    /// Run `op` inside a transaction on the blocking pool.
    async fn with_tx<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError> + Send + 'static,
    {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(db_err)?;
            let value = op(&tx)?;
            tx.commit().map_err(db_err)?;
            Ok(value)
        })
        .await
    }
}

#[async_trait]
impl ForumStore for SqliteForumStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, doc) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    encode(&user)?
                ],
            )
            .map_err(map_user_constraint)?;
            Ok(())
        })
        .await
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let doc: Option<String> = conn
                .query_row("SELECT doc FROM users WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(db_err)?;
            doc.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_owned();
        self.with_conn(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET username = ?2, email = ?3, doc = ?4 WHERE id = ?1",
                    params![
                        user.id.to_string(),
                        user.username,
                        user.email,
                        encode(&user)?
                    ],
                )
                .map_err(map_user_constraint)?;
            if changed == 0 {
                return Err(StoreError::Missing { entity: "user" });
            }
            Ok(())
        })
        .await
    }

    async fn insert_question(
        &self,
        question: &Question,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let question = question.clone();
        let adjustments = adjustments.to_vec();
        self.with_tx(move |tx| {
            tx.execute(
                "INSERT INTO questions (id, owner_id, version, doc) VALUES (?1, ?2, ?3, ?4)",
                params![
                    question.id.to_string(),
                    question.owner.to_string(),
                    question.version as i64,
                    encode(&question)?
                ],
            )
            .map_err(db_err)?;
            apply_adjustments(tx, &adjustments)
        })
        .await
    }

    async fn find_question(&self, id: &QuestionId) -> Result<Option<Question>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM questions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM questions")
                .map_err(db_err)?;
            let docs = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            docs.iter().map(|doc| decode(doc)).collect()
        })
        .await
    }

    async fn list_questions_by_owner(&self, owner: &UserId) -> Result<Vec<Question>, StoreError> {
        let owner = owner.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM questions WHERE owner_id = ?1")
                .map_err(db_err)?;
            let docs = stmt
                .query_map(params![owner], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            docs.iter().map(|doc| decode(doc)).collect()
        })
        .await
    }

    async fn save_question(
        &self,
        question: &Question,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let question = question.clone();
        self.with_tx(move |tx| {
            question_for_update(tx, &question.id, expected_version)?;
            let mut doc = question;
            doc.version = expected_version + 1;
            write_question(tx, &doc)
        })
        .await
    }

    async fn persist_question_vote(
        &self,
        question: &Question,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let question = question.clone();
        let adjustments = adjustments.to_vec();
        self.with_tx(move |tx| {
            question_for_update(tx, &question.id, expected_version)?;
            let mut doc = question;
            doc.version = expected_version + 1;
            write_question(tx, &doc)?;
            apply_adjustments(tx, &adjustments)
        })
        .await
    }

    async fn delete_question(
        &self,
        id: &QuestionId,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let id = *id;
        let adjustments = adjustments.to_vec();
        self.with_tx(move |tx| {
            question_for_update(tx, &id, expected_version)?;
            let key = id.to_string();
            tx.execute(
                "DELETE FROM notifications WHERE question_id = ?1",
                params![key],
            )
            .map_err(db_err)?;
            tx.execute("DELETE FROM answers WHERE question_id = ?1", params![key])
                .map_err(db_err)?;
            tx.execute("DELETE FROM questions WHERE id = ?1", params![key])
                .map_err(db_err)?;
            apply_adjustments(tx, &adjustments)
        })
        .await
    }

    async fn insert_answer(
        &self,
        answer: &Answer,
        question_version: u64,
        notification: Option<&Notification>,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let answer = answer.clone();
        let notification = notification.cloned();
        let adjustments = adjustments.to_vec();
        self.with_tx(move |tx| {
            let mut question = question_for_update(tx, &answer.question, question_version)?;
            question.answers.push(answer.id);
            question.version = question_version + 1;
            write_question(tx, &question)?;

            tx.execute(
                "INSERT INTO answers (id, question_id, owner_id, version, doc)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    answer.id.to_string(),
                    answer.question.to_string(),
                    answer.owner.to_string(),
                    answer.version as i64,
                    encode(&answer)?
                ],
            )
            .map_err(db_err)?;

            // The unique triple index makes re-delivery a no-op.
            if let Some(notification) = notification {
                tx.execute(
                    "INSERT OR IGNORE INTO notifications
                     (id, recipient_id, question_id, answer_id, read, doc)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        notification.id.to_string(),
                        notification.recipient.to_string(),
                        notification.question.to_string(),
                        notification.answer.to_string(),
                        notification.read,
                        encode(&notification)?
                    ],
                )
                .map_err(db_err)?;
            }
            apply_adjustments(tx, &adjustments)
        })
        .await
    }

    async fn find_answer(&self, id: &AnswerId) -> Result<Option<Answer>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM answers WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn answers_for_question(
        &self,
        question: &QuestionId,
    ) -> Result<Vec<Answer>, StoreError> {
        let question = question.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM answers WHERE question_id = ?1")
                .map_err(db_err)?;
            let docs = stmt
                .query_map(params![question], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            let mut answers = docs
                .iter()
                .map(|doc| decode::<Answer>(doc))
                .collect::<Result<Vec<_>, _>>()?;
            answers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(answers)
        })
        .await
    }

    async fn answers_by_user(&self, user: &UserId) -> Result<Vec<Answer>, StoreError> {
        let user = user.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM answers WHERE owner_id = ?1")
                .map_err(db_err)?;
            let docs = stmt
                .query_map(params![user], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            docs.iter().map(|doc| decode(doc)).collect()
        })
        .await
    }

    async fn save_answer(
        &self,
        answer: &Answer,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        self.persist_answer_vote(answer, expected_version, &[]).await
    }

    async fn persist_answer_vote(
        &self,
        answer: &Answer,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let answer = answer.clone();
        let adjustments = adjustments.to_vec();
        self.with_tx(move |tx| {
            let stored: Option<i64> = tx
                .query_row(
                    "SELECT version FROM answers WHERE id = ?1",
                    params![answer.id.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            let Some(stored) = stored else {
                return Err(StoreError::Missing { entity: "answer" });
            };
            if stored != expected_version as i64 {
                return Err(StoreError::VersionConflict { entity: "answer" });
            }
            let mut doc = answer;
            doc.version = expected_version + 1;
            tx.execute(
                "UPDATE answers SET version = ?2, doc = ?3 WHERE id = ?1",
                params![doc.id.to_string(), doc.version as i64, encode(&doc)?],
            )
            .map_err(db_err)?;
            apply_adjustments(tx, &adjustments)
        })
        .await
    }

    async fn delete_answer(
        &self,
        id: &AnswerId,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let id = *id;
        let adjustments = adjustments.to_vec();
        self.with_tx(move |tx| {
            let doc: Option<String> = tx
                .query_row(
                    "SELECT doc FROM answers WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            let Some(doc) = doc else {
                return Err(StoreError::Missing { entity: "answer" });
            };
            let answer: Answer = decode(&doc)?;
            if answer.version != expected_version {
                return Err(StoreError::VersionConflict { entity: "answer" });
            }

            tx.execute(
                "DELETE FROM notifications WHERE answer_id = ?1",
                params![id.to_string()],
            )
            .map_err(db_err)?;
            tx.execute("DELETE FROM answers WHERE id = ?1", params![id.to_string()])
                .map_err(db_err)?;

            // Unlink from the parent, which may already be gone mid-cascade.
            let parent: Option<String> = tx
                .query_row(
                    "SELECT doc FROM questions WHERE id = ?1",
                    params![answer.question.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            if let Some(parent) = parent {
                let mut question: Question = decode(&parent)?;
                question.answers.retain(|a| *a != id);
                question.version += 1;
                write_question(tx, &question)?;
            }
            apply_adjustments(tx, &adjustments)
        })
        .await
    }

    async fn user_has_answer(
        &self,
        question: &QuestionId,
        user: &UserId,
        exclude: Option<&AnswerId>,
    ) -> Result<bool, StoreError> {
        let question = question.to_string();
        let user = user.to_string();
        let exclude = exclude.map(ToString::to_string);
        self.with_conn(move |conn| {
            let exists: bool = match exclude {
                Some(exclude) => conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM answers
                         WHERE question_id = ?1 AND owner_id = ?2 AND id <> ?3)",
                        params![question, user, exclude],
                        |row| row.get(0),
                    )
                    .map_err(db_err)?,
                None => conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM answers
                         WHERE question_id = ?1 AND owner_id = ?2)",
                        params![question, user],
                        |row| row.get(0),
                    )
                    .map_err(db_err)?,
            };
            Ok(exists)
        })
        .await
    }

    async fn notifications_for_recipient(
        &self,
        recipient: &UserId,
    ) -> Result<Vec<Notification>, StoreError> {
        let recipient = recipient.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM notifications WHERE recipient_id = ?1")
                .map_err(db_err)?;
            let docs = stmt
                .query_map(params![recipient], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            docs.iter().map(|doc| decode(doc)).collect()
        })
        .await
    }

    async fn mark_notifications_read(
        &self,
        recipient: &UserId,
        ids: Option<&[NotificationId]>,
    ) -> Result<usize, StoreError> {
        let recipient = recipient.to_string();
        let ids = ids.map(<[NotificationId]>::to_vec);
        self.with_tx(move |tx| {
            let mut stmt = tx
                .prepare("SELECT doc FROM notifications WHERE recipient_id = ?1 AND read = 0")
                .map_err(db_err)?;
            let docs = stmt
                .query_map(params![recipient], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            drop(stmt);

            let mut changed = 0;
            for doc in &docs {
                let mut notification: Notification = decode(doc)?;
                if let Some(ids) = &ids {
                    if !ids.contains(&notification.id) {
                        continue;
                    }
                }
                notification.read = true;
                tx.execute(
                    "UPDATE notifications SET read = 1, doc = ?2 WHERE id = ?1",
                    params![notification.id.to_string(), encode(&notification)?],
                )
                .map_err(db_err)?;
                changed += 1;
            }
            Ok(changed)
        })
        .await
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
