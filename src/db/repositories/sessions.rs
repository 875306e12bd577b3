use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, format_optional_datetime, parse_datetime, parse_optional_datetime},
    models::{Session, AGGREGATE_SESSION_NUMBER},
};

use super::measurements::load_points;

const SESSION_COLUMNS: &str = "id, number, name, started_at, ended_at, created_at, updated_at";

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Session {
        id: row.get("id")?,
        number: row.get("number")?,
        name: row.get("name")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        points: Vec::new(),
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

/// Runs `sql` and returns every matching session with its points attached.
fn query_sessions<P: rusqlite::Params>(conn: &Connection, sql: &str, args: P) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(args)?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }
    drop(rows);

    for session in &mut sessions {
        session.points = load_points(conn, &session.id)?;
    }
    Ok(sessions)
}

impl Database {
    /// Stores the session row. Points are inserted separately.
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        if session.number == AGGREGATE_SESSION_NUMBER {
            return Err(anyhow!("the aggregate session is never persisted"));
        }
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, number, name, started_at, ended_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.number,
                    record.name,
                    format_datetime(&record.started_at),
                    format_optional_datetime(record.ended_at.as_ref()),
                    format_datetime(&record.created_at),
                    format_datetime(&record.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_session_ended(&self, session_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET ended_at = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![
                    format_datetime(&ended_at),
                    format_datetime(&ended_at),
                    session_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Session not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn rename_session(&self, session_id: &str, name: Option<String>) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET name = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![name, format_datetime(&Utc::now()), session_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Session not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
            Ok(query_sessions(conn, &sql, params![session_id])?.into_iter().next())
        })
        .await
    }

    /// Most recently started real session.
    pub async fn latest_session(&self) -> Result<Option<Session>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE number != ?1
                 ORDER BY started_at DESC, number DESC
                 LIMIT 1"
            );
            Ok(query_sessions(conn, &sql, params![AGGREGATE_SESSION_NUMBER])?
                .into_iter()
                .next())
        })
        .await
    }

    /// Real sessions, oldest start first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE number != ?1
                 ORDER BY started_at ASC, number ASC"
            );
            query_sessions(conn, &sql, params![AGGREGATE_SESSION_NUMBER])
        })
        .await
    }

    /// Highest real session number, 0 when there are none.
    pub async fn max_session_number(&self) -> Result<i64> {
        self.execute(|conn| {
            let max: Option<i64> = conn
                .query_row("SELECT MAX(number) FROM sessions", [], |row| row.get(0))
                .optional()?
                .flatten();
            Ok(max.unwrap_or(0).max(0))
        })
        .await
    }

    pub async fn count_sessions(&self) -> Result<i64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE number != ?1",
                params![AGGREGATE_SESSION_NUMBER],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }

    /// Deletes a session; its points go with it via ON DELETE CASCADE.
    /// Returns whether a row was removed.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
