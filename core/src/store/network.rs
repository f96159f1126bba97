//! Track inventory, network rows and the serialized line set.

use super::MapStore;
use crate::{
    error::MapResult,
    model::{NetworkSummary, RailLine, RailLineRecord, TrackCell, TrackType},
    scanner::ScanOutcome,
    types::CellPos,
};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

impl MapStore {
    // ── Scan results ──────────────────────────────────────────────

    /// Replace a world's inventory, network rows and line set with a scan outcome.
    pub fn replace_world_scan(&self, outcome: &ScanOutcome) -> MapResult<()> {
        let cells: Vec<TrackCell> = outcome.cells().cloned().collect();
        self.replace_world_records(&outcome.world, &cells, &outcome.lines, &outcome.networks())
    }

    /// All-or-nothing rewrite of one world's scan-owned collections.
    pub fn replace_world_records(
        &self,
        world: &str,
        cells: &[TrackCell],
        lines: &[RailLine],
        networks: &[NetworkSummary],
    ) -> MapResult<()> {
        let records: Vec<RailLineRecord> = lines
            .iter()
            .filter(|l| l.is_renderable())
            .map(RailLine::to_record)
            .collect();
        let lines_json = serde_json::to_string(&records)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM track_cell WHERE world = ?1", params![world])?;
        tx.execute("DELETE FROM rail_network WHERE world = ?1", params![world])?;
        {
            let mut insert_cell = tx.prepare(
                "INSERT INTO track_cell (world, x, y, z, track_type, placer, network_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for cell in cells {
                insert_cell.execute(params![
                    world,
                    cell.pos.x,
                    cell.pos.y,
                    cell.pos.z,
                    cell.track_type.as_str(),
                    cell.placer,
                    cell.network_id,
                ])?;
            }

            let mut insert_network = tx.prepare(
                "INSERT INTO rail_network (world, network_id, cell_count, vertex_count, main_builder, color)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for n in networks {
                insert_network.execute(params![
                    world,
                    n.network_id,
                    n.cell_count,
                    n.vertex_count,
                    n.main_builder,
                    n.color,
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO rail_line_set (world, lines_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(world) DO UPDATE SET
                lines_json = excluded.lines_json,
                updated_at = excluded.updated_at",
            params![world, lines_json, Utc::now().timestamp_millis()],
        )?;
        tx.commit()?;

        log::debug!(
            "stored {world}: {} cell(s), {} line(s)",
            cells.len(),
            records.len()
        );
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────

    /// The serialized line set exactly as stored; `[]` when the world was never scanned.
    pub fn rail_lines_json(&self, world: &str) -> MapResult<String> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT lines_json FROM rail_line_set WHERE world = ?1",
                params![world],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.unwrap_or_else(|| "[]".to_string()))
    }

    /// Parsed line set. A corrupt document reads as empty.
    pub fn rail_lines(&self, world: &str) -> MapResult<Vec<RailLine>> {
        let json = self.rail_lines_json(world)?;
        match serde_json::from_str::<Vec<RailLineRecord>>(&json) {
            Ok(records) => Ok(records.into_iter().map(RailLine::from).collect()),
            Err(e) => {
                log::warn!("line set for {world} is unreadable, treating as empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    pub fn networks(&self, world: &str) -> MapResult<Vec<NetworkSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT network_id, cell_count, vertex_count, main_builder, color
             FROM rail_network WHERE world = ?1
             ORDER BY network_id ASC",
        )?;
        let rows = stmt.query_map(params![world], |row| {
            Ok(NetworkSummary {
                world:        world.to_string(),
                network_id:   row.get(0)?,
                cell_count:   row.get(1)?,
                vertex_count: row.get(2)?,
                main_builder: row.get(3)?,
                color:        row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Raw inventory of a world. Rows with an unknown track type are skipped.
    pub fn track_cells(&self, world: &str) -> MapResult<Vec<TrackCell>> {
        let mut stmt = self.conn.prepare(
            "SELECT x, y, z, track_type, placer, network_id
             FROM track_cell WHERE world = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![world], |row| {
                Ok((
                    CellPos::new(row.get(0)?, row.get(1)?, row.get(2)?),
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<u32>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(pos, tag, placer, network_id)| match tag.parse::<TrackType>() {
                Ok(track_type) => Some(TrackCell {
                    world: world.to_string(),
                    pos,
                    track_type,
                    placer,
                    network_id,
                }),
                Err(e) => {
                    log::warn!("skipping track cell {pos} in {world}: {e}");
                    None
                }
            })
            .collect())
    }

    /// Overwrite a world's line set with raw text (tooling and tests).
    pub fn put_rail_lines_json(&self, world: &str, json: &str) -> MapResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO rail_line_set (world, lines_json, updated_at) VALUES (?1, ?2, ?3)",
            params![world, json, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}
