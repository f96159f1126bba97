//! Persisted records: track cells, rail lines, stations, network summaries.
//!
//! RULE: these are plain values. Only the store writes them, only the
//! scanner produces cells and lines, only administrative commands produce
//! stations.

use crate::types::{CellPos, WorldName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of rail occupying a track cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackType {
    #[serde(rename = "RAIL")]
    Plain,
    PoweredRail,
    DetectorRail,
    ActivatorRail,
}

impl TrackType {
    pub const ALL: [TrackType; 4] = [
        TrackType::Plain,
        TrackType::PoweredRail,
        TrackType::DetectorRail,
        TrackType::ActivatorRail,
    ];

    /// Stable tag used in the database and the render dataset.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain         => "RAIL",
            Self::PoweredRail   => "POWERED_RAIL",
            Self::DetectorRail  => "DETECTOR_RAIL",
            Self::ActivatorRail => "ACTIVATOR_RAIL",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown track type '{s}'"))
    }
}

/// One rail cell recorded during a scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCell {
    pub world:      WorldName,
    pub pos:        CellPos,
    pub track_type: TrackType,
    /// Player who placed the cell, when the audit service knows.
    pub placer:     Option<String>,
    /// Line this cell was folded into; None for degenerate components.
    pub network_id: Option<u32>,
}

/// The simplified polyline of one traced component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailLine {
    pub network_id: u32,
    pub color:      String,
    pub vertices:   Vec<CellPos>,
}

impl RailLine {
    /// Lines shorter than two vertices are never persisted.
    pub fn is_renderable(&self) -> bool {
        self.vertices.len() >= 2
    }

    pub fn to_record(&self) -> RailLineRecord {
        RailLineRecord {
            network_id: self.network_id,
            color:      self.color.clone(),
            vertices:   self.vertices.iter().map(|v| v.to_array()).collect(),
        }
    }
}

/// Serialized form consumed by the rendering layer:
/// `{"networkId":1,"color":"#FF6B6B","vertices":[[x,y,z],...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RailLineRecord {
    pub network_id: u32,
    pub color:      String,
    pub vertices:   Vec<[i32; 3]>,
}

impl From<RailLineRecord> for RailLine {
    fn from(r: RailLineRecord) -> Self {
        Self {
            network_id: r.network_id,
            color:      r.color,
            vertices:   r.vertices.into_iter().map(CellPos::from).collect(),
        }
    }
}

/// A named landmark, also used as a scan anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub world:      WorldName,
    pub pos:        CellPos,
    pub name:       String,
    pub created_by: Option<String>,
}

/// Summary row kept alongside each persisted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub world:        WorldName,
    pub network_id:   u32,
    pub cell_count:   u32,
    pub vertex_count: u32,
    pub main_builder: Option<String>,
    pub color:        String,
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub track_cells:      i64,
    pub networks:         i64,
    pub placers:          i64,
    pub tracked_entities: i64,
}
