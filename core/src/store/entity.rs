//! Entity snapshot table. The tracker is its only writer.

use super::MapStore;
use crate::{error::MapResult, tracker::EntitySnapshot};
use chrono::DateTime;
use rusqlite::params;
use uuid::Uuid;

impl MapStore {
    /// Make the table hold exactly `snapshots`, in one transaction.
    pub fn replace_entity_snapshots(&self, snapshots: &[EntitySnapshot]) -> MapResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entity_snapshot", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO entity_snapshot (
                    entity_id, world, x, y, z, velocity_x, velocity_y, velocity_z,
                    occupied, passenger, captured_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for s in snapshots {
                insert.execute(params![
                    s.id.to_string(),
                    s.world,
                    s.position[0],
                    s.position[1],
                    s.position[2],
                    s.velocity[0],
                    s.velocity[1],
                    s.velocity[2],
                    if s.occupied { 1 } else { 0 },
                    s.passenger,
                    s.captured_at.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Snapshots for one world. Rows with a malformed id or timestamp are skipped.
    pub fn entity_snapshots(&self, world: &str) -> MapResult<Vec<EntitySnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, x, y, z, velocity_x, velocity_y, velocity_z,
                    occupied, passenger, captured_at
             FROM entity_snapshot WHERE world = ?1
             ORDER BY entity_id ASC",
        )?;
        let rows = stmt
            .query_map(params![world], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    [row.get::<_, f64>(1)?, row.get::<_, f64>(2)?, row.get::<_, f64>(3)?],
                    [row.get::<_, f64>(4)?, row.get::<_, f64>(5)?, row.get::<_, f64>(6)?],
                    row.get::<_, i32>(7)? != 0,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, position, velocity, occupied, passenger, millis)| {
                let id = Uuid::parse_str(&id).ok()?;
                let captured_at = DateTime::from_timestamp_millis(millis)?;
                Some(EntitySnapshot {
                    id,
                    world: world.to_string(),
                    position,
                    velocity,
                    occupied,
                    passenger,
                    captured_at,
                })
            })
            .collect())
    }

    pub fn tracked_entity_count(&self) -> MapResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM entity_snapshot", [], |row| row.get(0))?;
        Ok(count)
    }
}
