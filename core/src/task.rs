//! Periodic tasks driven by the host clock.
//!
//! The engine dispatches each due task onto the background executor.
//! A task sees a config snapshot taken at dispatch time, so a reload
//! mid-cycle takes effect on the next cycle.

use crate::{
    config::MapperConfig,
    error::MapResult,
    host::VoxelHost,
    render,
    store::MapStore,
    tracker::{EntityTracker, TrackerView},
    types::Tick,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Everything a task cycle may touch.
pub struct TaskContext {
    pub tick:   Tick,
    pub now:    DateTime<Utc>,
    pub config: MapperConfig,
    pub host:   Arc<dyn VoxelHost>,
    pub store:  Arc<Mutex<MapStore>>,
}

pub trait PeriodicTask: Send {
    /// Unique stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Ticks between cycles under `config`. Zero disables the task.
    fn interval_ticks(&self, config: &MapperConfig) -> Tick;

    fn run(&mut self, ctx: &TaskContext) -> MapResult<()>;
}

/// Sweeps host entities and persists the settled table.
pub struct TrackerTask {
    tracker: EntityTracker,
}

impl TrackerTask {
    pub fn new(tracker: EntityTracker) -> Self {
        Self { tracker }
    }

    pub fn view(&self) -> TrackerView {
        self.tracker.view()
    }
}

impl PeriodicTask for TrackerTask {
    fn name(&self) -> &'static str {
        "entity-tracker"
    }

    fn interval_ticks(&self, config: &MapperConfig) -> Tick {
        config.tracking.update_interval_ticks
    }

    fn run(&mut self, ctx: &TaskContext) -> MapResult<()> {
        // Sweep without the store lock; only the batch write holds it.
        let report = self.tracker.cycle(ctx.host.as_ref(), ctx.now);
        self.tracker.persist(&ctx.store.lock())?;
        log::trace!(
            "tick {}: tracker observed {} entities ({} failed worlds)",
            ctx.tick,
            report.observed,
            report.worlds_failed.len()
        );
        Ok(())
    }
}

/// Exports the render dataset of every persisted world.
#[derive(Debug, Default)]
pub struct RenderTask;

impl PeriodicTask for RenderTask {
    fn name(&self) -> &'static str {
        "auto-render"
    }

    fn interval_ticks(&self, config: &MapperConfig) -> Tick {
        config.render.auto_render_interval_ticks
    }

    fn run(&mut self, ctx: &TaskContext) -> MapResult<()> {
        let datasets = render::collect_datasets(&ctx.store.lock(), &ctx.config.render, ctx.now)?;
        for dataset in &datasets {
            let path = render::write_dataset(dataset, Path::new(&ctx.config.render.output_dir))?;
            log::debug!("render: wrote {}", path.display());
        }
        Ok(())
    }
}
