//! The dispatch loop.
//!
//! One tick picks a device, refreshes its alarm, builds the event and hands
//! it to the sink. Ticks are separated by a random pause. A failed send is
//! logged and counted; it never stops the loop.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, EventConfig};
use crate::device::{Fleet, ImageCatalog};
use crate::error::Result;
use crate::event::AlarmEvent;
use crate::sink::EventSink;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The shutdown signal fired (e.g. Ctrl-C).
    Shutdown,
    /// The configured wall-clock limit elapsed.
    DurationElapsed,
    /// The configured number of dispatch attempts was reached.
    EventLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "shutdown"),
            Self::DurationElapsed => write!(f, "duration_elapsed"),
            Self::EventLimit => write!(f, "event_limit"),
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Batches the sink accepted.
    pub sent: u64,
    /// Batches the sink rejected or failed to deliver.
    pub failed: u64,
    /// Wall-clock time the run took, in milliseconds.
    pub elapsed_ms: u64,
    /// Why the run ended.
    pub stop_reason: StopReason,
}

impl RunSummary {
    /// Total dispatch attempts.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.sent + self.failed
    }

    /// True when at least one dispatch was attempted and none succeeded.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.attempts() > 0 && self.sent == 0
    }
}

/// A random number generator seeded from `seed`, or from the OS when unset.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Drives a fleet of simulated devices against an [`EventSink`].
pub struct Simulator {
    fleet: Fleet,
    catalog: ImageCatalog,
    event: EventConfig,
    min_interval: Duration,
    max_interval: Duration,
    max_duration: Option<Duration>,
    max_events: Option<u64>,
    rng: StdRng,
    sink: Box<dyn EventSink>,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("devices", &self.fleet.len())
            .field("sink", &self.sink.name())
            .field("min_interval", &self.min_interval)
            .field("max_interval", &self.max_interval)
            .field("max_duration", &self.max_duration)
            .field("max_events", &self.max_events)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Build the image catalog and fleet from `config`.
    ///
    /// The random number generator is seeded from `schedule.seed` when set,
    /// so the same seed reproduces the same fleet and event sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the image catalog
    /// or fleet cannot be built.
    pub fn new(config: &Config, sink: Box<dyn EventSink>) -> Result<Self> {
        config.validate()?;

        let (min_interval, max_interval) = config.interval_bounds();
        let mut rng = seeded_rng(config.schedule.seed);

        let catalog = ImageCatalog::new(&config.images.root_url, &config.images.names)?;
        let fleet = Fleet::generate(&config.fleet, &catalog, &mut rng)?;

        Ok(Self {
            fleet,
            catalog,
            event: config.event.clone(),
            min_interval,
            max_interval,
            max_duration: config.max_duration(),
            max_events: config.max_events(),
            rng,
            sink,
        })
    }

    /// The simulated fleet.
    #[must_use]
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Pick a device, refresh its alarm and build the event for it.
    pub fn next_event(&mut self) -> AlarmEvent {
        let device = self.fleet.next_alarm(&self.catalog, &mut self.rng);
        AlarmEvent::from_device(device, &self.event)
    }

    fn next_pause(&mut self) -> Duration {
        self.rng.random_range(self.min_interval..=self.max_interval)
    }

    /// Run until shutdown, the wall-clock limit, or the event limit.
    ///
    /// A closed shutdown channel counts as a shutdown signal.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let started = Instant::now();
        // A limit too large to represent as an instant never expires.
        let deadline = self
            .max_duration
            .and_then(|limit| started.checked_add(limit));
        let mut sent = 0_u64;
        let mut failed = 0_u64;

        info!(
            devices = self.fleet.len(),
            sink = self.sink.name(),
            min_interval = ?self.min_interval,
            max_interval = ?self.max_interval,
            max_duration_secs = self.max_duration.map(|d| d.as_secs()),
            max_events = self.max_events,
            "simulator started"
        );

        let stop_reason = loop {
            if *shutdown.borrow() {
                break StopReason::Shutdown;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break StopReason::DurationElapsed;
            }

            let event = self.next_event();
            let device_id = event.data.device_id.clone();
            let status = event.data.status.clone();
            let batch = event.batch();

            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => break StopReason::Shutdown,
                outcome = self.sink.send(&batch) => outcome,
            };

            match outcome {
                Ok(()) => {
                    sent += 1;
                    info!(device_id = %device_id, status = %status, "alarm sent");
                }
                Err(e) => {
                    failed += 1;
                    warn!(device_id = %device_id, error = %e, "failed to send alarm");
                }
            }

            if self.max_events.is_some_and(|max| sent + failed >= max) {
                break StopReason::EventLimit;
            }

            let pause = self.next_pause();
            debug!(?pause, "sleeping");

            let until_deadline = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = shutdown.changed() => break StopReason::Shutdown,
                () = until_deadline => break StopReason::DurationElapsed,
                () = tokio::time::sleep(pause) => {}
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            sent,
            failed,
            elapsed_ms,
            reason = %stop_reason,
            "simulator stopped"
        );

        RunSummary {
            sent,
            failed,
            elapsed_ms,
            stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every batch it receives; optionally fails every send.
    #[derive(Clone, Default)]
    struct RecordingSink {
        batches: Arc<Mutex<Vec<Vec<AlarmEvent>>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, batch: &[AlarmEvent]) -> Result<()> {
            if self.fail {
                return Err(Error::EndpointStatus {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.fleet.device_count = 4;
        config.schedule.min_interval_ms = 1_000;
        config.schedule.max_interval_ms = 1_000;
        config.schedule.seed = Some(42);
        config
    }

    #[test]
    fn test_new_builds_fleet() {
        let sim = Simulator::new(&test_config(), Box::new(RecordingSink::default())).unwrap();
        assert_eq!(sim.fleet().len(), 4);
    }

    #[test]
    fn test_new_rejects_bad_images() {
        let mut config = test_config();
        config.images.names.clear();
        assert!(Simulator::new(&config, Box::new(RecordingSink::default())).is_err());
    }

    #[test]
    fn test_new_rejects_inverted_schedule() {
        let mut config = test_config();
        config.schedule.min_interval_ms = 5_000;
        config.schedule.max_interval_ms = 1_000;

        let err = Simulator::new(&config, Box::new(RecordingSink::default())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_seed_reproduces_fleet() {
        let a = Simulator::new(&test_config(), Box::new(RecordingSink::default())).unwrap();
        let b = Simulator::new(&test_config(), Box::new(RecordingSink::default())).unwrap();
        assert_eq!(a.fleet(), b.fleet());
    }

    #[test]
    fn test_next_event_comes_from_fleet() {
        let mut sim = Simulator::new(&test_config(), Box::new(RecordingSink::default())).unwrap();
        let ids: Vec<String> = sim.fleet().devices().iter().map(|d| d.id.clone()).collect();

        for _ in 0..20 {
            let event = sim.next_event();
            assert!(ids.contains(&event.data.device_id));
            assert!(sim.fleet().bounds().contains(crate::geo::Coordinates {
                latitude: event.data.latitude,
                longitude: event.data.longitude,
            }));
        }
    }

    #[test]
    fn test_next_pause_within_bounds() {
        let mut config = test_config();
        config.schedule.min_interval_ms = 200;
        config.schedule.max_interval_ms = 700;
        let mut sim = Simulator::new(&config, Box::new(RecordingSink::default())).unwrap();

        for _ in 0..100 {
            let pause = sim.next_pause();
            assert!(pause >= Duration::from_millis(200));
            assert!(pause <= Duration::from_millis(700));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_event_limit() {
        let mut config = test_config();
        config.schedule.max_events = 5;
        let sink = RecordingSink::default();
        let mut sim = Simulator::new(&config, Box::new(sink.clone())).unwrap();

        let (_tx, rx) = watch::channel(false);
        let summary = sim.run(rx).await;

        assert_eq!(summary.stop_reason, StopReason::EventLimit);
        assert_eq!(summary.sent, 5);
        assert_eq!(summary.failed, 0);
        // Four pauses between five sends, none after the last.
        assert!((4_000..4_100).contains(&summary.elapsed_ms));

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 5);
        assert!(batches.iter().all(|b| b.len() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_duration_elapses() {
        let mut config = test_config();
        config.schedule.max_duration_secs = 10;
        let mut sim = Simulator::new(&config, Box::new(RecordingSink::default())).unwrap();

        let (_tx, rx) = watch::channel(false);
        let summary = sim.run(rx).await;

        assert_eq!(summary.stop_reason, StopReason::DurationElapsed);
        assert!((10..=11).contains(&summary.sent), "sent {}", summary.sent);
        assert!(summary.elapsed_ms >= 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_unrepresentable_duration_runs_unbounded() {
        let mut config = test_config();
        config.schedule.max_duration_secs = u64::MAX;
        config.schedule.max_events = 3;
        assert!(config.validate().is_ok());
        let mut sim = Simulator::new(&config, Box::new(RecordingSink::default())).unwrap();

        let (_tx, rx) = watch::channel(false);
        let summary = sim.run(rx).await;

        assert_eq!(summary.stop_reason, StopReason::EventLimit);
        assert_eq!(summary.sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline_interrupts_long_pause() {
        let mut config = test_config();
        config.schedule.min_interval_ms = 60_000;
        config.schedule.max_interval_ms = 60_000;
        config.schedule.max_duration_secs = 5;
        let mut sim = Simulator::new(&config, Box::new(RecordingSink::default())).unwrap();

        let (_tx, rx) = watch::channel(false);
        let summary = sim.run(rx).await;

        assert_eq!(summary.stop_reason, StopReason::DurationElapsed);
        assert_eq!(summary.sent, 1);
        assert!((5_000..5_100).contains(&summary.elapsed_ms));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let config = test_config();
        let sink = RecordingSink::default();
        let mut sim = Simulator::new(&config, Box::new(sink.clone())).unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { sim.run(rx).await });

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        tx.send(true).unwrap();

        let summary = handle.await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Shutdown);
        assert_eq!(summary.sent, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_immediately_when_already_shut_down() {
        let mut sim = Simulator::new(&test_config(), Box::new(RecordingSink::default())).unwrap();

        let (_tx, rx) = watch::channel(true);
        let summary = sim.run(rx).await;

        assert_eq!(summary.stop_reason, StopReason::Shutdown);
        assert_eq!(summary.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_continues_after_failures() {
        crate::logging::init_test_logging();

        let mut config = test_config();
        config.schedule.max_events = 3;
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut sim = Simulator::new(&config, Box::new(sink)).unwrap();

        let (_tx, rx) = watch::channel(false);
        let summary = sim.run(rx).await;

        assert_eq!(summary.stop_reason, StopReason::EventLimit);
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.attempts(), 3);
        assert!(summary.all_failed());
    }

    #[test]
    fn test_all_failed() {
        let summary = |sent, failed| RunSummary {
            sent,
            failed,
            elapsed_ms: 0,
            stop_reason: StopReason::Shutdown,
        };

        assert!(summary(0, 4).all_failed());
        assert!(!summary(1, 4).all_failed());
        assert!(!summary(3, 0).all_failed());
        // Nothing attempted is not a failure.
        assert!(!summary(0, 0).all_failed());
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Shutdown.to_string(), "shutdown");
        assert_eq!(StopReason::DurationElapsed.to_string(), "duration_elapsed");
        assert_eq!(StopReason::EventLimit.to_string(), "event_limit");
    }

    #[test]
    fn test_run_summary_serialization() {
        let summary = RunSummary {
            sent: 7,
            failed: 1,
            elapsed_ms: 1_234,
            stop_reason: StopReason::DurationElapsed,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sent"], 7);
        assert_eq!(json["stop_reason"], "duration_elapsed");
    }
}
