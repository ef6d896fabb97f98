//! Periodic reporting of a registry.
//!
//! A [`Reporter`] owns a background thread that, at a fixed frequency, takes a [`Batch`] of every
//! metric in a [`Registry`] and hands it to an [`Exporter`], which renders the batch to its
//! destination.  Reporters move through a one-way lifecycle, `Created` → `Running` → `Stopped`,
//! and cannot be restarted once stopped.
//!
//! Failed exports never interrupt the schedule: they are logged, passed to the reporter's error
//! hook if one is installed, and the next export happens at the next tick as usual.  A scheduled
//! export that panics is reported the same way, as [`Error::ExportPanicked`].
use std::{
    any::Any,
    collections::BTreeMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, SystemTime},
};

use crossbeam_channel::{select, tick, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace};

use crate::{Error, Metric, MetricKindMask, Registry, TimeUnit};

mod console;
pub use self::console::{ConsoleBuilder, ConsoleExporter};

/// Callback invoked with every failed export.
pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Lifecycle state of a [`Reporter`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReporterState {
    /// Constructed, but never started.
    Created,
    /// Exporting periodically.
    Running,
    /// Stopped for good.
    Stopped,
}

impl ReporterState {
    /// Gets the string form of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReporterState::Created => "created",
            ReporterState::Running => "running",
            ReporterState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ReporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The metrics handed to an exporter for one export cycle.
#[derive(Debug)]
pub struct Batch<'a> {
    /// Wall-clock time at which the batch was taken.
    pub timestamp: SystemTime,
    /// Every metric selected for export, ordered by name.
    pub metrics: &'a BTreeMap<String, Metric>,
    /// Unit that rates should be expressed per.
    pub rate_unit: TimeUnit,
    /// Unit that durations should be expressed in.
    pub duration_unit: TimeUnit,
}

/// Renders batches of metrics to a destination.
pub trait Exporter: Send + 'static {
    /// Exports one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be delivered.  The reporter keeps running.
    fn export(&mut self, batch: &Batch<'_>) -> Result<(), Error>;

    /// Releases any resources held for the destination, such as open sockets.
    ///
    /// Called once, when the reporter stops.
    fn close(&mut self) {}
}

/// Schedule and rendering preferences of a [`Reporter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReporterConfig {
    /// Number of `frequency_unit`s between exports.  Must be positive.
    pub frequency: u64,
    /// Unit of `frequency`.
    pub frequency_unit: TimeUnit,
    /// Unit that rates are expressed per.
    pub rate_unit: TimeUnit,
    /// Unit that durations are expressed in.
    pub duration_unit: TimeUnit,
    /// Kinds of metrics to export.
    pub filter: MetricKindMask,
}

impl ReporterConfig {
    /// Time between exports.
    pub fn interval(&self) -> Duration {
        self.frequency_unit.duration(self.frequency)
    }
}

impl Default for ReporterConfig {
    /// Exports every metric once a minute, with rates per second and durations in milliseconds.
    fn default() -> Self {
        Self {
            frequency: 1,
            frequency_unit: TimeUnit::Minutes,
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            filter: MetricKindMask::ALL,
        }
    }
}

struct Shared<E> {
    registry: Arc<Registry>,
    exporter: Mutex<E>,
    config: ReporterConfig,
    error_hook: RwLock<Option<ErrorHook>>,
}

impl<E> Shared<E>
where
    E: Exporter,
{
    fn report(&self) -> Result<(), Error> {
        let metrics: BTreeMap<String, Metric> = self
            .registry
            .metrics()
            .into_iter()
            .filter(|(_, metric)| self.config.filter.matches(metric.kind()))
            .collect();

        let batch = Batch {
            timestamp: SystemTime::now(),
            metrics: &metrics,
            rate_unit: self.config.rate_unit,
            duration_unit: self.config.duration_unit,
        };

        trace!(metrics = metrics.len(), "exporting metrics");
        self.exporter.lock().export(&batch)
    }

    fn report_on_schedule(&self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.report()))
            .unwrap_or_else(|payload| Err(Error::ExportPanicked(panic_message(payload.as_ref()))));

        if let Err(e) = result {
            error!(error = %e, "failed to export metrics");
            let hook = self.error_hook.read().clone();
            if let Some(hook) = hook {
                hook(&e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

struct Worker {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

fn run<E>(shared: Arc<Shared<E>>, shutdown: Receiver<()>)
where
    E: Exporter,
{
    // The ticker holds at most one pending tick, so a slow export delays the next one rather than
    // queueing up a backlog.
    let ticker = tick(shared.config.interval());
    loop {
        select! {
            recv(ticker) -> _ => shared.report_on_schedule(),
            // Disconnection is the shutdown signal.
            recv(shutdown) -> _ => break,
        }
    }
}

/// A periodic exporter of a registry.
///
/// Dropping a reporter stops it.
pub struct Reporter<E>
where
    E: Exporter,
{
    shared: Arc<Shared<E>>,
    state: ReporterState,
    worker: Option<Worker>,
}

impl<E> Reporter<E>
where
    E: Exporter,
{
    /// Creates a reporter exporting `registry` through `exporter`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if the configured frequency is zero.
    pub fn new(registry: Arc<Registry>, exporter: E, config: ReporterConfig) -> Result<Self, Error> {
        if config.frequency == 0 {
            return Err(Error::InvalidArgument("reporting frequency must be positive".to_string()));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                registry,
                exporter: Mutex::new(exporter),
                config,
                error_hook: RwLock::new(None),
            }),
            state: ReporterState::Created,
            worker: None,
        })
    }

    /// Installs a callback invoked with the error of every failed scheduled export.
    pub fn with_error_hook<F>(self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.set_error_hook(hook);
        self
    }

    /// Installs or replaces the error hook.  Takes effect from the next scheduled export, even
    /// while the reporter is running.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        *self.shared.error_hook.write() = Some(Arc::new(hook));
    }

    /// The registry being reported.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.shared.registry
    }

    /// The reporter's configuration.
    pub fn config(&self) -> &ReporterConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReporterState {
        self.state
    }

    /// Starts exporting periodically on a background thread.
    ///
    /// The first export happens one interval after starting.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::IllegalState`] unless the reporter is newly created, and with
    /// [`Error::Spawn`] if the background thread cannot be spawned.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.state != ReporterState::Created {
            return Err(Error::IllegalState { operation: "start", state: self.state });
        }

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("metrology-reporter".to_string())
            .spawn(move || run(shared, shutdown_rx))
            .map_err(Error::Spawn)?;

        self.worker = Some(Worker { shutdown: shutdown_tx, handle });
        self.state = ReporterState::Running;
        debug!(interval = ?self.shared.config.interval(), "reporter started");
        Ok(())
    }

    /// Stops the reporter for good.
    ///
    /// Waits for an in-flight export to finish, then closes the exporter.  Stopping a reporter
    /// that is already stopped does nothing.
    pub fn stop(&mut self) {
        if self.state == ReporterState::Stopped {
            return;
        }

        if let Some(Worker { shutdown, handle }) = self.worker.take() {
            drop(shutdown);
            if handle.join().is_err() {
                error!("reporter thread panicked");
            }
        }

        self.shared.exporter.lock().close();
        self.state = ReporterState::Stopped;
        debug!("reporter stopped");
    }

    /// Exports once, immediately, on the calling thread.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::IllegalState`] if the reporter is stopped, or with the exporter's error
    /// if the export fails.
    pub fn report_now(&self) -> Result<(), Error> {
        if self.state == ReporterState::Stopped {
            return Err(Error::IllegalState { operation: "report", state: self.state });
        }

        self.shared.report()
    }

    /// Runs `f` with the reporter running, stopping it afterwards on every exit path.
    ///
    /// # Errors
    ///
    /// Fails if the reporter cannot be started; `f` is not run in that case.
    pub fn scope<F, R>(&mut self, f: F) -> Result<R, Error>
    where
        F: FnOnce() -> R,
    {
        struct StopOnExit<'a, E: Exporter>(&'a mut Reporter<E>);

        impl<E: Exporter> Drop for StopOnExit<'_, E> {
            fn drop(&mut self) {
                self.0.stop();
            }
        }

        self.start()?;
        let _guard = StopOnExit(self);
        Ok(f())
    }

    /// Runs `f` with exclusive access to the exporter.
    pub fn with_exporter<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut E) -> R,
    {
        f(&mut self.shared.exporter.lock())
    }
}

impl<E> Drop for Reporter<E>
where
    E: Exporter,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<E> fmt::Debug for Reporter<E>
where
    E: Exporter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("state", &self.state)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}
