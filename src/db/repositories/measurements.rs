use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::MeasurementPoint,
};

fn row_to_point(row: &Row) -> Result<MeasurementPoint> {
    let captured_at: String = row.get("captured_at")?;

    Ok(MeasurementPoint {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        captured_at: parse_datetime(&captured_at, "captured_at")?,
        distance_m: row.get("distance_m")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        photo: row.get("photo")?,
    })
}

/// Points of one session in insertion order.
pub(crate) fn load_points(conn: &Connection, session_id: &str) -> Result<Vec<MeasurementPoint>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, captured_at, distance_m, latitude, longitude, photo
         FROM measurement_points
         WHERE session_id = ?1
         ORDER BY rowid ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        points.push(row_to_point(row)?);
    }

    Ok(points)
}

impl Database {
    pub async fn insert_point(&self, point: &MeasurementPoint) -> Result<()> {
        let record = point.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO measurement_points (id, session_id, captured_at, distance_m, latitude, longitude, photo)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.session_id,
                    format_datetime(&record.captured_at),
                    record.distance_m,
                    record.latitude,
                    record.longitude,
                    record.photo,
                ],
            )
            .with_context(|| "failed to insert measurement point")?;
            Ok(())
        })
        .await
    }

    pub async fn get_points_for_session(&self, session_id: &str) -> Result<Vec<MeasurementPoint>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| load_points(conn, &session_id)).await
    }

    /// Returns whether a point was removed.
    pub async fn delete_point(&self, point_id: &str) -> Result<bool> {
        let point_id = point_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM measurement_points WHERE id = ?1",
                params![point_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
