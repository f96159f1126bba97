//! The mapper engine: host clock, periodic tasks, scans and the
//! administrative surface.
//!
//! RULES:
//!   - `tick()` never blocks on voxel or storage work; everything due is
//!     queued on the background executor.
//!   - Jobs run in submission order on one worker.
//!   - At most one scan per world is in flight.
//!   - A failure in one world's scan never affects another world.

use crate::{
    audit::AuditService,
    clock::HostClock,
    command::{AdminCommand, CommandOutcome},
    config::MapperConfig,
    error::{MapError, MapResult},
    executor::{BackgroundExecutor, JobHandle},
    host::VoxelHost,
    model::{NetworkStats, Station},
    render,
    scanner::{RegionScanner, ScanMode, ScanSummary},
    store::MapStore,
    task::{PeriodicTask, RenderTask, TaskContext, TrackerTask},
    tracker::{EntityTracker, TrackerView},
    types::{CellPos, Tick, WorldName},
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of one scan request across its target worlds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub summaries: Vec<ScanSummary>,
    /// Worlds whose scan or write failed, with the error text.
    pub failures:  Vec<(WorldName, String)>,
}

impl ScanReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ScheduledTask {
    name:    &'static str,
    task:    Arc<Mutex<Box<dyn PeriodicTask>>>,
    pending: Arc<AtomicBool>,
}

/// Clears a task's pending flag when its cycle ends, including by panic.
struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Releases a world's in-flight scan reservation when dropped.
struct ScanReservation {
    worlds:    Vec<WorldName>,
    in_flight: Arc<Mutex<BTreeSet<WorldName>>>,
}

impl Drop for ScanReservation {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock();
        for w in &self.worlds {
            set.remove(w);
        }
    }
}

pub struct MapperEngine {
    pub clock:  HostClock,
    host:       Arc<dyn VoxelHost>,
    audit:      Option<Arc<dyn AuditService>>,
    store:      Arc<Mutex<MapStore>>,
    config:     Arc<RwLock<MapperConfig>>,
    tracker:    TrackerView,
    tasks:      Vec<ScheduledTask>,
    in_flight:  Arc<Mutex<BTreeSet<WorldName>>>,
    executor:   BackgroundExecutor,
}

impl MapperEngine {
    pub fn new(
        host: Arc<dyn VoxelHost>,
        audit: Option<Arc<dyn AuditService>>,
        store: MapStore,
        config: MapperConfig,
    ) -> MapResult<Self> {
        config.validate()?;
        Ok(Self {
            clock: HostClock::new(),
            host,
            audit,
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(RwLock::new(config)),
            tracker: TrackerView::default(),
            tasks: Vec::new(),
            in_flight: Arc::new(Mutex::new(BTreeSet::new())),
            executor: BackgroundExecutor::start("railmap-worker")?,
        })
    }

    /// Build an engine with the tracker and auto-render tasks registered.
    pub fn build(
        host: Arc<dyn VoxelHost>,
        audit: Option<Arc<dyn AuditService>>,
        store: MapStore,
        config: MapperConfig,
    ) -> MapResult<Self> {
        let mut engine = Self::new(host, audit, store, config)?;
        let tracker_task = TrackerTask::new(EntityTracker::new());
        engine.tracker = tracker_task.view();
        engine.register(Box::new(tracker_task));
        engine.register(Box::new(RenderTask));
        Ok(engine)
    }

    /// Engine over a migrated in-memory store with `MapperConfig::default_test()`.
    pub fn build_test(host: Arc<dyn VoxelHost>) -> MapResult<Self> {
        let store = MapStore::in_memory()?;
        store.migrate()?;
        Self::build(host, None, store, MapperConfig::default_test())
    }

    /// Register a periodic task. Due tasks dispatch in registration order.
    pub fn register(&mut self, task: Box<dyn PeriodicTask>) {
        self.tasks.push(ScheduledTask {
            name:    task.name(),
            task:    Arc::new(Mutex::new(task)),
            pending: Arc::new(AtomicBool::new(false)),
        });
    }

    /// Advance one host tick and queue every due task.
    /// Returns the names of the tasks dispatched.
    pub fn tick(&mut self) -> MapResult<Vec<&'static str>> {
        let tick = self.clock.advance();
        let config = self.config.read().clone();
        let mut dispatched = Vec::new();

        for scheduled in &self.tasks {
            // A locked task is mid-cycle on the worker.
            let Some(interval) = scheduled.task.try_lock().map(|t| t.interval_ticks(&config)) else {
                continue;
            };
            if !self.clock.is_due(interval) {
                continue;
            }
            if scheduled.pending.swap(true, Ordering::AcqRel) {
                log::debug!("tick {tick}: {} still running, skipping cycle", scheduled.name);
                continue;
            }
            let ctx = TaskContext {
                tick,
                now: Utc::now(),
                config: config.clone(),
                host: Arc::clone(&self.host),
                store: Arc::clone(&self.store),
            };
            let task = Arc::clone(&scheduled.task);
            let pending = Arc::clone(&scheduled.pending);
            let name = scheduled.name;
            let submitted = self.executor.submit(move || {
                let _pending = PendingGuard(pending);
                if let Err(e) = task.lock().run(&ctx) {
                    log::error!("tick {tick}: task {name} failed: {e}");
                }
            });
            if let Err(e) = submitted {
                scheduled.pending.store(false, Ordering::Release);
                return Err(e);
            }
            dispatched.push(name);
        }
        Ok(dispatched)
    }

    /// Run n ticks, then wait for the queued work. Used for testing and tooling.
    pub fn run_ticks(&mut self, n: Tick) -> MapResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        self.flush()
    }

    /// Block until every queued job has finished.
    pub fn flush(&self) -> MapResult<()> {
        self.executor.flush()
    }

    /// Queue a scan of `world`, or of every host world when `None`.
    ///
    /// Fails with `ScanInProgress` if any target world already has a scan
    /// queued or running.
    pub fn request_scan(
        &self,
        world: Option<&str>,
        full: bool,
    ) -> MapResult<JobHandle<ScanReport>> {
        let worlds: Vec<WorldName> = match world {
            Some(w) => vec![w.to_string()],
            None => self.host.worlds(),
        };

        let reservation = {
            let mut set = self.in_flight.lock();
            if let Some(busy) = worlds.iter().find(|w| set.contains(*w)) {
                return Err(MapError::ScanInProgress { world: busy.clone() });
            }
            set.extend(worlds.iter().cloned());
            ScanReservation { worlds: worlds.clone(), in_flight: Arc::clone(&self.in_flight) }
        };

        let config = self.config.read().clone();
        let mode = if full {
            ScanMode::Full
        } else {
            ScanMode::Anchored { radius_chunks: config.scan.radius_chunks }
        };
        let host = Arc::clone(&self.host);
        let audit = self.audit.clone();
        let store = Arc::clone(&self.store);

        self.executor.submit(move || {
            let _reservation = reservation;
            let mut report = ScanReport::default();
            for world in &worlds {
                match scan_one(host.as_ref(), audit.as_deref(), &store, &config, world, mode) {
                    Ok(summary) => report.summaries.push(summary),
                    Err(e) => {
                        log::error!("scan {world} failed: {e}");
                        report.failures.push((world.clone(), e.to_string()));
                    }
                }
            }
            report
        })
    }

    /// Scan and wait for the report.
    pub fn scan(&self, world: Option<&str>, full: bool) -> MapResult<ScanReport> {
        self.request_scan(world, full)?.wait()
    }

    pub fn add_station(&self, station: Station) -> MapResult<Station> {
        let store = Arc::clone(&self.store);
        self.executor
            .submit(move || -> MapResult<Station> {
                store.lock().add_station(&station)?;
                log::info!("station '{}' added at {} in {}", station.name, station.pos, station.world);
                Ok(station)
            })?
            .wait()?
    }

    pub fn remove_station(&self, world: &str, pos: CellPos) -> MapResult<bool> {
        let store = Arc::clone(&self.store);
        let world = world.to_string();
        self.executor
            .submit(move || store.lock().remove_station(&world, pos))?
            .wait()?
    }

    pub fn stations(&self, world: Option<&str>) -> MapResult<Vec<Station>> {
        let store = self.store.lock();
        match world {
            Some(w) => store.stations(w),
            None => store.all_stations(),
        }
    }

    pub fn stats(&self) -> MapResult<NetworkStats> {
        self.store.lock().stats()
    }

    /// Write every world's render dataset now. Returns the written paths.
    pub fn render(&self) -> MapResult<Vec<String>> {
        let store = Arc::clone(&self.store);
        let render_config = self.config.read().render.clone();
        self.executor
            .submit(move || -> MapResult<Vec<String>> {
                let datasets = render::collect_datasets(&store.lock(), &render_config, Utc::now())?;
                datasets
                    .iter()
                    .map(|d| {
                        render::write_dataset(d, Path::new(&render_config.output_dir))
                            .map(|p| p.display().to_string())
                    })
                    .collect()
            })?
            .wait()?
    }

    /// Reload `<data_dir>/railmap.json`. An invalid file leaves the
    /// current config in place.
    pub fn reload_config(&self, data_dir: &str) -> MapResult<()> {
        let loaded = MapperConfig::load(data_dir)?;
        loaded.validate()?;
        *self.config.write() = loaded;
        log::info!("config reloaded from {data_dir}");
        Ok(())
    }

    pub fn config(&self) -> MapperConfig {
        self.config.read().clone()
    }

    pub fn tracker(&self) -> TrackerView {
        self.tracker.clone()
    }

    /// Run `f` against the store. Used by tooling and tests.
    pub fn with_store<R>(&self, f: impl FnOnce(&MapStore) -> R) -> R {
        f(&self.store.lock())
    }

    pub fn execute(&self, command: AdminCommand) -> MapResult<CommandOutcome> {
        log::debug!("command: {command:?}");
        match command {
            AdminCommand::Scan { world, full } => Ok(CommandOutcome::Scanned {
                report: self.scan(world.as_deref(), full)?,
            }),
            AdminCommand::AddStation { world, x, y, z, name, created_by } => {
                let station = Station { world, pos: CellPos::new(x, y, z), name, created_by };
                Ok(CommandOutcome::StationAdded { station: self.add_station(station)? })
            }
            AdminCommand::RemoveStation { world, x, y, z } => Ok(CommandOutcome::StationRemoved {
                removed: self.remove_station(&world, CellPos::new(x, y, z))?,
            }),
            AdminCommand::ListStations { world } => Ok(CommandOutcome::Stations {
                stations: self.stations(world.as_deref())?,
            }),
            AdminCommand::Stats => Ok(CommandOutcome::Stats {
                stats:             self.stats()?,
                worlds:            self.host.worlds(),
                active_entities:   self.tracker.active_count(),
                occupied_entities: self.tracker.occupied_count(),
            }),
            AdminCommand::Render => Ok(CommandOutcome::Rendered { files: self.render()? }),
            AdminCommand::Reload { data_dir } => {
                self.reload_config(&data_dir)?;
                Ok(CommandOutcome::Reloaded)
            }
        }
    }
}

/// Scan one world and replace its persisted records.
fn scan_one(
    host: &dyn VoxelHost,
    audit: Option<&dyn AuditService>,
    store: &Mutex<MapStore>,
    config: &MapperConfig,
    world: &str,
    mode: ScanMode,
) -> MapResult<ScanSummary> {
    // Stale station rows must not stop the scan; they only cost anchors.
    let stations = store.lock().stations(world).unwrap_or_else(|e| {
        log::warn!("scan {world}: cannot read stations, scanning without them: {e}");
        Vec::new()
    });
    let outcome = RegionScanner::new(host, audit, config).scan_world(world, mode, &stations)?;
    store.lock().replace_world_scan(&outcome)?;
    log::info!(
        "scan {world}: {} cells, {} lines, {} chunk(s) skipped",
        outcome.summary.cells_accepted,
        outcome.summary.lines,
        outcome.summary.chunks_failed
    );
    Ok(outcome.summary)
}
