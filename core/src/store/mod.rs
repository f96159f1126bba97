//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The scanner, tracker and engine call store methods; they never execute SQL.
//!
//! Collections:
//!   - track inventory + line set + network rows (replace-on-scan, per world)
//!   - stations (explicit add/remove)
//!   - entity snapshots (tracker is the only writer)
//!
//! Every multi-row write runs in one transaction. A `Transaction` dropped
//! without `commit()` rolls back, so an early `?` discards the whole batch.

use crate::{error::MapResult, model::NetworkStats};
use rusqlite::{params, Connection};

mod entity;
mod network;
mod station;

pub struct MapStore {
    conn: Connection,
}

impl MapStore {
    pub fn open(path: &str) -> MapResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> MapResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> MapResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_railways.sql"))?;
        Ok(())
    }

    // ── Statistics ─────────────────────────────────────────────

    /// Aggregate counters across every world.
    pub fn stats(&self) -> MapResult<NetworkStats> {
        let track_cells: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM track_cell", [], |row| row.get(0))?;
        let networks: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM rail_network", [], |row| row.get(0))?;
        let placers: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT placer) FROM track_cell",
            [],
            |row| row.get(0),
        )?;
        let tracked_entities: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM entity_snapshot", [], |row| row.get(0))?;
        Ok(NetworkStats { track_cells, networks, placers, tracked_entities })
    }

    /// The same counters restricted to one world.
    pub fn world_stats(&self, world: &str) -> MapResult<NetworkStats> {
        let track_cells: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM track_cell WHERE world = ?1",
            params![world],
            |row| row.get(0),
        )?;
        let networks: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rail_network WHERE world = ?1",
            params![world],
            |row| row.get(0),
        )?;
        let placers: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT placer) FROM track_cell WHERE world = ?1",
            params![world],
            |row| row.get(0),
        )?;
        let tracked_entities: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entity_snapshot WHERE world = ?1",
            params![world],
            |row| row.get(0),
        )?;
        Ok(NetworkStats { track_cells, networks, placers, tracked_entities })
    }

    /// Worlds with a persisted line set, sorted by name.
    pub fn worlds(&self) -> MapResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT world FROM rail_line_set ORDER BY world ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
