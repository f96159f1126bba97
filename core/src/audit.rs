//! Block-provenance filtering.
//!
//! The audit service is optional. When it is absent, disabled, or starts
//! failing, every cell is accepted; an audit failure never fails a scan.

use crate::{
    config::AuditPolicy,
    error::{MapError, MapResult},
    types::{CellPos, WorldName},
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// The most recent placement recorded for a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Raw placer name as the service reports it, e.g. `Steve` or `#natural`.
    pub placer:    String,
    pub placed_at: DateTime<Utc>,
}

pub trait AuditService: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Latest placement at a cell, or None when the service has no record.
    fn lookup(&self, world: &str, pos: CellPos) -> MapResult<Option<Placement>>;
}

/// Map a raw placer name to a player name; synthetic placers become None.
pub fn normalize_placer(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.starts_with('#') || name.eq_ignore_ascii_case("worldedit") {
        return None;
    }
    Some(name.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NotPlayerPlaced,
    TooNew { age_days: i64 },
    TooOld { age_days: i64 },
    Ignored { placer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept { placer: Option<String> },
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept { .. })
    }
}

/// Applies an `AuditPolicy` for the duration of one scan pass.
pub struct AuditFilter<'a> {
    service:  Option<&'a dyn AuditService>,
    policy:   &'a AuditPolicy,
    now:      DateTime<Utc>,
    degraded: bool,
}

impl<'a> AuditFilter<'a> {
    pub fn new(
        service: Option<&'a dyn AuditService>,
        policy: &'a AuditPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let service = service.filter(|s| {
            let up = s.is_available();
            if !up && policy.enabled {
                log::warn!("audit service unavailable, placement filtering disabled");
            }
            up
        });
        Self { service, policy, now, degraded: false }
    }

    /// True when cells can actually be rejected.
    pub fn is_filtering(&self) -> bool {
        self.policy.enabled && self.service.is_some() && !self.degraded
    }

    pub fn check(&mut self, world: &str, pos: CellPos) -> Verdict {
        let placement = match self.lookup(world, pos) {
            Some(p) => p,
            None => return Verdict::Accept { placer: None },
        };
        let placer = placement.as_ref().and_then(|p| normalize_placer(&p.placer));

        if !self.policy.enabled {
            return Verdict::Accept { placer };
        }

        if self.policy.player_placed_only && placer.is_none() {
            return Verdict::Reject(RejectReason::NotPlayerPlaced);
        }

        if let Some(p) = &placement {
            let (min, max) = (self.policy.min_age_days, self.policy.max_age_days);
            if min > 0 || max > 0 {
                let age_days = (self.now - p.placed_at).num_days();
                if min > 0 && age_days < min {
                    return Verdict::Reject(RejectReason::TooNew { age_days });
                }
                if max > 0 && age_days > max {
                    return Verdict::Reject(RejectReason::TooOld { age_days });
                }
            }
        }

        if let Some(name) = &placer {
            let tagged = format!("#{}", name.to_lowercase());
            if self
                .policy
                .ignore_players
                .iter()
                .any(|ignored| ignored == name || *ignored == tagged)
            {
                return Verdict::Reject(RejectReason::Ignored { placer: name.clone() });
            }
        }

        Verdict::Accept { placer }
    }

    /// Outer None: no usable service. Inner None: no record for the cell.
    fn lookup(&mut self, world: &str, pos: CellPos) -> Option<Option<Placement>> {
        if self.degraded {
            return None;
        }
        let service = self.service?;
        match service.lookup(world, pos) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("audit lookup failed at {world} {pos}, filtering disabled for this pass: {e}");
                self.degraded = true;
                None
            }
        }
    }
}

/// In-memory audit log used by tests and the headless runner.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    placements: RwLock<HashMap<(WorldName, CellPos), Placement>>,
    failing:    RwLock<bool>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, world: &str, pos: CellPos, placer: &str, placed_at: DateTime<Utc>) {
        self.placements.write().insert(
            (world.to_string(), pos),
            Placement { placer: placer.to_string(), placed_at },
        );
    }

    /// Make every subsequent lookup fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }
}

impl AuditService for MemoryAuditLog {
    fn lookup(&self, world: &str, pos: CellPos) -> MapResult<Option<Placement>> {
        if *self.failing.read() {
            return Err(MapError::AuditUnavailable { reason: "audit log offline".into() });
        }
        Ok(self.placements.read().get(&(world.to_string(), pos)).cloned())
    }
}
