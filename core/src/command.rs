use serde::{Deserialize, Serialize};

use crate::{
    engine::ScanReport,
    model::{NetworkStats, Station},
    types::WorldName,
};

/// Administrative commands. Each maps to exactly one engine operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Scan one world, or every host world when `world` is absent.
    Scan {
        #[serde(default)]
        world: Option<WorldName>,
        #[serde(default)]
        full:  bool,
    },
    AddStation {
        world:      WorldName,
        x:          i32,
        y:          i32,
        z:          i32,
        name:       String,
        #[serde(default)]
        created_by: Option<String>,
    },
    RemoveStation {
        world: WorldName,
        x:     i32,
        y:     i32,
        z:     i32,
    },
    ListStations {
        #[serde(default)]
        world: Option<WorldName>,
    },
    Stats,
    /// Write render datasets now instead of waiting for the auto-render task.
    Render,
    Reload {
        data_dir: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Scanned { report: ScanReport },
    StationAdded { station: Station },
    StationRemoved { removed: bool },
    Stations { stations: Vec<Station> },
    Stats {
        stats:             NetworkStats,
        worlds:            Vec<WorldName>,
        active_entities:   usize,
        occupied_entities: usize,
    },
    Rendered { files: Vec<String> },
    Reloaded,
}
