//! Render dataset export.
//!
//! Builds the JSON document a rendering layer draws from: lines, stations,
//! live entities and the type colour legend. Read-only against the store.

use crate::{
    config::RenderConfig,
    error::MapResult,
    model::{NetworkStats, RailLineRecord, TrackType},
    store::MapStore,
    tracker::Direction,
    types::WorldName,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DATASET_FILE: &str = "raildata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMarker {
    pub x:    i32,
    pub y:    i32,
    pub z:    i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMarker {
    pub id:        Uuid,
    pub x:         f64,
    pub y:         f64,
    pub z:         f64,
    pub direction: Direction,
    /// Blocks per tick, rounded to two decimals.
    pub speed:     f64,
    pub occupied:  bool,
    pub passenger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDataset {
    pub world:        WorldName,
    pub generated_at: DateTime<Utc>,
    pub lines:        Vec<RailLineRecord>,
    pub stations:     Vec<StationMarker>,
    pub entities:     Vec<EntityMarker>,
    pub type_colors:  BTreeMap<TrackType, String>,
    pub stats:        NetworkStats,
}

pub fn build_dataset(
    store: &MapStore,
    world: &str,
    render: &RenderConfig,
    now: DateTime<Utc>,
) -> MapResult<RenderDataset> {
    let lines = store
        .rail_lines(world)?
        .iter()
        .map(|l| l.to_record())
        .collect();
    let stations = store
        .stations(world)?
        .into_iter()
        .map(|s| StationMarker { x: s.pos.x, y: s.pos.y, z: s.pos.z, name: s.name })
        .collect();
    let entities = store
        .entity_snapshots(world)?
        .into_iter()
        .map(|s| EntityMarker {
            id:        s.id,
            x:         s.position[0],
            y:         s.position[1],
            z:         s.position[2],
            direction: s.direction(),
            speed:     (s.speed() * 100.0).round() / 100.0,
            occupied:  s.occupied,
            passenger: s.passenger,
        })
        .collect();

    Ok(RenderDataset {
        world: world.to_string(),
        generated_at: now,
        lines,
        stations,
        entities,
        type_colors: render.type_colors.clone(),
        stats: store.world_stats(world)?,
    })
}

/// Datasets for every world with a persisted line set.
/// A world that fails to read is logged and left out.
pub fn collect_datasets(
    store: &MapStore,
    render: &RenderConfig,
    now: DateTime<Utc>,
) -> MapResult<Vec<RenderDataset>> {
    let mut out = Vec::new();
    for world in store.worlds()? {
        match build_dataset(store, &world, render, now) {
            Ok(d) => out.push(d),
            Err(e) => log::warn!("render: skipping {world}: {e}"),
        }
    }
    Ok(out)
}

/// Write `<output_dir>/<world>/raildata.json`; returns the file path.
pub fn write_dataset(dataset: &RenderDataset, output_dir: &Path) -> MapResult<PathBuf> {
    let dir = output_dir.join(sanitize_world_name(&dataset.world));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(DATASET_FILE);
    // Readers only ever see a complete file.
    let tmp = dir.join(format!("{DATASET_FILE}.tmp"));
    std::fs::write(&tmp, serde_json::to_string_pretty(dataset)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

fn sanitize_world_name(world: &str) -> String {
    world
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_names_cannot_escape_the_output_dir() {
        assert_eq!(sanitize_world_name("../etc"), "___etc");
        assert_eq!(sanitize_world_name("world_nether"), "world_nether");
    }

    #[test]
    fn rewrite_replaces_the_file_without_leaving_a_temp_behind() {
        let out = std::env::temp_dir().join(format!("railmap-render-unit-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&out);
        let mut dataset = RenderDataset {
            world:        "world".into(),
            generated_at: Utc::now(),
            lines:        Vec::new(),
            stations:     Vec::new(),
            entities:     Vec::new(),
            type_colors:  BTreeMap::new(),
            stats:        NetworkStats::default(),
        };
        write_dataset(&dataset, &out).unwrap();
        dataset.stations.push(StationMarker { x: 1, y: 64, z: 2, name: "Central".into() });
        let path = write_dataset(&dataset, &out).unwrap();

        let read: RenderDataset =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, dataset);
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(DATASET_FILE)]);
        let _ = std::fs::remove_dir_all(&out);
    }
}
