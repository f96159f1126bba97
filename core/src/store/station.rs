use super::MapStore;
use crate::{error::MapResult, model::Station, types::CellPos};
use chrono::Utc;
use rusqlite::params;

impl MapStore {
    // ── Stations ──────────────────────────────────────────────────

    /// Add a station, replacing any station at the same cell.
    pub fn add_station(&self, station: &Station) -> MapResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO station (world, x, y, z, name, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                station.world,
                station.pos.x,
                station.pos.y,
                station.pos.z,
                station.name,
                station.created_by,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Returns false when no station stood at the cell.
    pub fn remove_station(&self, world: &str, pos: CellPos) -> MapResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM station WHERE world = ?1 AND x = ?2 AND y = ?3 AND z = ?4",
            params![world, pos.x, pos.y, pos.z],
        )?;
        Ok(removed > 0)
    }

    pub fn stations(&self, world: &str) -> MapResult<Vec<Station>> {
        let mut stmt = self.conn.prepare(
            "SELECT x, y, z, name, created_by FROM station
             WHERE world = ?1
             ORDER BY x ASC, z ASC, y ASC",
        )?;
        let rows = stmt.query_map(params![world], |row| {
            Ok(Station {
                world:      world.to_string(),
                pos:        CellPos::new(row.get(0)?, row.get(1)?, row.get(2)?),
                name:       row.get(3)?,
                created_by: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_stations(&self) -> MapResult<Vec<Station>> {
        let mut stmt = self.conn.prepare(
            "SELECT world, x, y, z, name, created_by FROM station
             ORDER BY world ASC, x ASC, z ASC, y ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Station {
                world:      row.get(0)?,
                pos:        CellPos::new(row.get(1)?, row.get(2)?, row.get(3)?),
                name:       row.get(4)?,
                created_by: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
