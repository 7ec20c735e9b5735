use crate::sample::{now_label, SamplePolicy};
use cuve_core::{CuveError, Message, Notice, RenderSink, Result, RollingSeries};
use cuve_device::{DeviceClient, DistanceReading};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Completions buffered between fetch tasks and the owner loop.
const IN_FLIGHT: usize = 16;

/// Where readings come from. Implemented by [`DeviceClient`]; tests script it.
pub trait TelemetrySource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<DistanceReading>> + Send;
}

impl TelemetrySource for DeviceClient {
    fn fetch(&self) -> impl Future<Output = Result<DistanceReading>> + Send {
        self.distance()
    }
}

/// Poll cadence and buffer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub interval:    Duration,
    pub history_len: usize,
    pub policy:      SamplePolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval:    Duration::from_millis(800),
            history_len: cuve_core::state::DEFAULT_HISTORY_LEN,
            policy:      SamplePolicy::default(),
        }
    }
}

/// What happened to one completed fetch.
#[derive(Debug)]
pub enum PollOutcome {
    /// Appended and rendered.
    Applied,
    /// A newer reading was already applied; this one was dropped.
    Stale,
    /// Fetch or parse failed; the series is untouched.
    Failed(CuveError),
}

struct Completion {
    seq:    u64,
    result: Result<DistanceReading>,
}

/// Owns the rolling series and its sink. The only writer to either.
///
/// Every fetch is tagged with a monotonic sequence number. A completion
/// older than the last applied one is discarded, so the series always
/// follows request order even when responses overtake each other.
pub struct Poller<S, K> {
    source:       Arc<S>,
    sink:         K,
    series:       RollingSeries,
    policy:       SamplePolicy,
    interval:     Duration,
    next_seq:     u64,
    last_applied: u64,
}

impl<S: TelemetrySource, K: RenderSink> Poller<S, K> {
    pub fn new(source: S, sink: K, settings: PollSettings) -> Self {
        Self {
            source:       Arc::new(source),
            sink,
            series:       RollingSeries::new(settings.history_len),
            policy:       settings.policy,
            interval:     settings.interval,
            next_seq:     0,
            last_applied: 0,
        }
    }

    pub fn series(&self) -> &RollingSeries {
        &self.series
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// One serialized tick: fetch, then apply.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let seq = self.next_sequence();
        let result = self.source.fetch().await;
        self.apply(seq, result)
    }

    /// Apply a completed fetch stamped with the current time.
    pub fn apply(&mut self, seq: u64, result: Result<DistanceReading>) -> PollOutcome {
        self.apply_at(seq, result, now_label())
    }

    /// Apply a completed fetch with an explicit time label.
    pub fn apply_at(&mut self, seq: u64, result: Result<DistanceReading>, time: String) -> PollOutcome {
        let reading = match result {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Distance fetch #{seq} failed: {e}");
                let context = if e.is_server_side() { "device refused distance" } else { "distance unavailable" };
                self.sink.notify(Notice::Error, &format!("{context}: {e}"));
                return PollOutcome::Failed(e);
            }
        };

        if seq <= self.last_applied {
            debug!(seq, last = self.last_applied, "Dropping stale reading");
            return PollOutcome::Stale;
        }
        self.last_applied = seq;

        let sample = self.policy.interpret(&reading, time);
        self.series.push(sample);

        if let Some(levels) = reading.levels() {
            self.sink.on_levels(levels);
        }
        self.sink.render(&self.series);
        PollOutcome::Applied
    }

    fn handle(&mut self, msg: Message) {
        match msg {
            Message::Calibrations(calibs) => self.sink.on_calibrations(&calibs),
            Message::Notify(notice, text) => self.sink.notify(notice, &text),
            Message::Reconfigure { history_len, estimated_floor } => {
                info!(history_len, estimated_floor, "Applying new poll settings");
                self.series.set_capacity(history_len);
                self.policy.estimated_floor = estimated_floor;
                self.sink.render(&self.series);
            }
            Message::Shutdown => {}
        }
    }

    fn dispatch(&mut self, done: &mpsc::Sender<Completion>) {
        let seq = self.next_sequence();
        let source = Arc::clone(&self.source);
        let done = done.clone();

        tokio::spawn(async move {
            let result = source.fetch().await;
            // Receiver gone means the poller was torn down; drop the reading.
            let _ = done.send(Completion { seq, result }).await;
        });
    }

    /// Tick every `interval`, one fetch per tick, until `Shutdown` arrives or
    /// every control sender is dropped. Returns the poller for inspection.
    pub async fn run(mut self, mut control: mpsc::Receiver<Message>) -> Self {
        let (done_tx, mut done_rx) = mpsc::channel::<Completion>(IN_FLIGHT);
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling every {} ms", self.interval.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => self.dispatch(&done_tx),
                Some(done) = done_rx.recv() => {
                    self.apply(done.seq, done.result);
                }
                msg = control.recv() => match msg {
                    Some(Message::Shutdown) | None => break,
                    Some(msg) => self.handle(msg),
                },
            }
        }

        info!("Poller stopped after {} requests", self.next_seq);
        self
    }
}

impl<S: TelemetrySource, K: RenderSink + 'static> Poller<S, K> {
    /// Spawn [`run`](Self::run) on the Tokio runtime.
    ///
    /// Returns the task handle and the control channel. Sending
    /// [`Message::Shutdown`] (or dropping the sender) stops the loop.
    pub fn spawn(self) -> (JoinHandle<Self>, mpsc::Sender<Message>) {
        let (tx, rx) = mpsc::channel(8);
        (tokio::spawn(self.run(rx)), tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuve_core::{Calibration, Sample, TankLevels};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Replays a fixed script, then fails with a network error.
    #[derive(Default)]
    struct Scripted {
        script: Mutex<VecDeque<Result<DistanceReading>>>,
    }

    impl Scripted {
        fn new(items: impl IntoIterator<Item = Result<DistanceReading>>) -> Self {
            Self { script: Mutex::new(items.into_iter().collect()) }
        }
    }

    impl TelemetrySource for Scripted {
        fn fetch(&self) -> impl Future<Output = Result<DistanceReading>> + Send {
            let next = self.script.lock().unwrap().pop_front();
            async move { next.unwrap_or_else(|| Err(CuveError::Network("script exhausted".into()))) }
        }
    }

    /// Counts up forever.
    #[derive(Default)]
    struct Counter(Mutex<u32>);

    impl TelemetrySource for Counter {
        fn fetch(&self) -> impl Future<Output = Result<DistanceReading>> + Send {
            let n = {
                let mut n = self.0.lock().unwrap();
                *n += 1;
                *n
            };
            async move { Ok(triple(f64::from(n), 0.0, 0.0)) }
        }
    }

    /// Counts up like [`Counter`], but the first `held` fetches wait for `gate`.
    struct Gated {
        gate:     Arc<Notify>,
        held:     u32,
        calls:    Arc<AtomicU32>,
        released: Arc<AtomicBool>,
    }

    impl Gated {
        fn new(held: u32) -> Self {
            Self {
                gate: Arc::new(Notify::new()),
                held,
                calls: Arc::new(AtomicU32::new(0)),
                released: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl TelemetrySource for Gated {
        fn fetch(&self) -> impl Future<Output = Result<DistanceReading>> + Send {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let hold = n <= self.held;
            let gate = Arc::clone(&self.gate);
            let released = Arc::clone(&self.released);
            async move {
                if hold {
                    gate.notified().await;
                    released.store(true, Ordering::SeqCst);
                }
                Ok(triple(f64::from(n), 0.0, 0.0))
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        renders:  usize,
        errors:   Vec<String>,
        levels:   Option<TankLevels>,
        calibs:   Vec<Calibration>,
        frames:   Option<mpsc::UnboundedSender<Option<f64>>>,
    }

    impl RenderSink for Recorder {
        fn render(&mut self, series: &RollingSeries) {
            self.renders += 1;
            if let Some(tx) = &self.frames {
                let _ = tx.send(series.latest().and_then(|s| s.measured));
            }
        }

        fn notify(&mut self, notice: Notice, message: &str) {
            if notice == Notice::Error {
                self.errors.push(message.to_string());
            }
        }

        fn on_levels(&mut self, levels: TankLevels) {
            self.levels = Some(levels);
        }

        fn on_calibrations(&mut self, calibs: &[Calibration]) {
            self.calibs = calibs.to_vec();
        }
    }

    fn triple(measured: f64, estimated: f64, duration: f64) -> DistanceReading {
        DistanceReading {
            measured_cm:  Some(measured),
            estimated_cm: Some(estimated),
            duration_us:  Some(duration),
            ..Default::default()
        }
    }

    fn settings(history_len: usize) -> PollSettings {
        PollSettings { history_len, ..Default::default() }
    }

    fn values(s: &Sample) -> (Option<f64>, Option<f64>, Option<f64>) {
        (s.measured, s.estimated, s.duration)
    }

    #[tokio::test]
    async fn sixty_one_ticks_keep_the_last_sixty() {
        let inputs: Vec<_> = (0..61)
            .map(|i| {
                let i = f64::from(i);
                triple(100.0 + i, 50.0 + i, 5000.0 + i)
            })
            .collect();
        let mut poller = Poller::new(
            Scripted::new(inputs.iter().cloned().map(Ok)),
            Recorder::default(),
            settings(60),
        );

        for _ in 0..61 {
            assert!(matches!(poller.poll_once().await, PollOutcome::Applied));
        }

        let series = poller.series();
        assert_eq!(series.len(), 60);
        let first = series.get(0).unwrap();
        assert_eq!(values(&first), (Some(101.0), Some(51.0), Some(5001.0)));
        let last = series.latest().unwrap();
        assert_eq!(values(&last), (Some(160.0), Some(110.0), Some(5060.0)));
        assert_eq!(poller.sink().renders, 61);
    }

    #[tokio::test]
    async fn network_failure_leaves_series_untouched() {
        let mut poller = Poller::new(
            Scripted::new([
                Ok(triple(10.0, 5.0, 580.0)),
                Err(CuveError::Network("connection refused".into())),
            ]),
            Recorder::default(),
            settings(60),
        );

        poller.poll_once().await;
        let before: Vec<Sample> = poller.series().iter().collect();

        let outcome = poller.poll_once().await;
        assert!(matches!(outcome, PollOutcome::Failed(CuveError::Network(_))));

        let after: Vec<Sample> = poller.series().iter().collect();
        assert_eq!(before, after);
        assert_eq!(poller.sink().renders, 1);
        assert_eq!(poller.sink().errors, ["distance unavailable: network error: connection refused"]);
    }

    #[tokio::test]
    async fn device_failure_is_reported_as_refusal() {
        let mut poller = Poller::new(
            Scripted::new([Err(CuveError::Server { status: 503, message: "busy".into() })]),
            Recorder::default(),
            settings(60),
        );

        poller.poll_once().await;
        assert_eq!(poller.sink().errors, ["device refused distance: device returned HTTP 503: busy"]);
        assert!(poller.series().is_empty());
    }

    #[tokio::test]
    async fn parse_failure_is_not_fatal() {
        let mut poller = Poller::new(
            Scripted::new([
                Err(CuveError::Parse("expected value".into())),
                Ok(triple(10.0, 5.0, 580.0)),
            ]),
            Recorder::default(),
            settings(60),
        );

        assert!(matches!(poller.poll_once().await, PollOutcome::Failed(_)));
        assert!(matches!(poller.poll_once().await, PollOutcome::Applied));
        assert_eq!(poller.series().len(), 1);
    }

    #[tokio::test]
    async fn absent_fields_are_stored_as_gaps() {
        let no_echo = DistanceReading {
            measured_cm:  None,
            estimated_cm: Some(-1.0),
            duration_us:  Some(0.0),
            ..Default::default()
        };
        let mut poller = Poller::new(Scripted::new([Ok(no_echo)]), Recorder::default(), settings(60));

        poller.poll_once().await;
        let s = poller.series().latest().unwrap();
        assert_eq!(values(&s), (None, None, None));
        // A reading with all gaps still renders.
        assert_eq!(poller.sink().renders, 1);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut poller = Poller::new(Scripted::default(), Recorder::default(), settings(60));

        let newer = poller.apply_at(2, Ok(triple(20.0, 0.0, 0.0)), "t2".into());
        let older = poller.apply_at(1, Ok(triple(10.0, 0.0, 0.0)), "t1".into());

        assert!(matches!(newer, PollOutcome::Applied));
        assert!(matches!(older, PollOutcome::Stale));
        assert_eq!(poller.series().len(), 1);
        assert_eq!(poller.series().latest().unwrap().measured, Some(20.0));
    }

    #[test]
    fn levels_are_forwarded() {
        let mut poller = Poller::new(Scripted::default(), Recorder::default(), settings(60));
        let reading = DistanceReading {
            cuve_vide: Some(180.0),
            cuve_pleine: Some(20.0),
            ..triple(90.0, 60.0, 5220.0)
        };
        poller.apply_at(1, Ok(reading), "t".into());
        assert_eq!(poller.sink().levels, Some(TankLevels { vide: 180.0, pleine: 20.0 }));
    }

    #[test]
    fn reconfigure_shrinks_and_rerenders() {
        let mut poller = Poller::new(Scripted::default(), Recorder::default(), settings(10));
        for seq in 1..=10 {
            poller.apply_at(seq, Ok(triple(seq as f64, 0.0, 0.0)), format!("t{seq}"));
        }
        poller.handle(Message::Reconfigure { history_len: 3, estimated_floor: 5.0 });

        assert_eq!(poller.series().len(), 3);
        assert_eq!(poller.series().get(0).unwrap().measured, Some(8.0));
        assert_eq!(poller.sink().renders, 11);

        poller.apply_at(11, Ok(triple(11.0, 4.0, 0.0)), "t11".into());
        assert_eq!(poller.series().latest().unwrap().estimated, None);
    }

    #[test]
    fn calibrations_reach_the_sink() {
        let mut poller = Poller::new(Scripted::default(), Recorder::default(), settings(10));
        let calib = Calibration { index: 0, measured: 150.0, height: 50.0 };
        poller.handle(Message::Calibrations(vec![calib.clone()]));
        assert_eq!(poller.sink().calibs, vec![calib]);
    }

    #[tokio::test]
    async fn run_ticks_until_shutdown() {
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
        let sink = Recorder { frames: Some(frames_tx), ..Default::default() };
        let poller = Poller::new(
            Counter::default(),
            sink,
            PollSettings { interval: Duration::from_millis(5), history_len: 4, ..Default::default() },
        );

        let (handle, control) = poller.spawn();
        for _ in 0..6 {
            frames_rx.recv().await.unwrap();
        }
        control.send(Message::Shutdown).await.unwrap();

        let poller = handle.await.unwrap();
        let series = poller.series();
        assert_eq!(series.len(), 4);
        let measured: Vec<f64> = series.measured().iter().flatten().copied().collect();
        assert!(measured.windows(2).all(|w| w[0] < w[1]), "out of order: {measured:?}");
    }

    #[tokio::test]
    async fn dropping_control_stops_the_loop() {
        let poller = Poller::new(
            Scripted::default(),
            Recorder::default(),
            PollSettings { interval: Duration::from_millis(5), ..Default::default() },
        );
        let (handle, control) = poller.spawn();
        drop(control);
        let poller = handle.await.unwrap();
        assert!(poller.series().is_empty());
    }

    #[tokio::test]
    async fn overtaken_reading_is_dropped_while_running() {
        let source = Gated::new(1);
        let gate = Arc::clone(&source.gate);
        let released = Arc::clone(&source.released);
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
        let sink = Recorder { frames: Some(frames_tx), ..Default::default() };
        let poller = Poller::new(
            source,
            sink,
            PollSettings { interval: Duration::from_millis(10), ..Default::default() },
        );

        let (handle, control) = poller.spawn();
        let mut rendered = Vec::new();
        // Readings #2 and #3 overtake the held first fetch.
        for _ in 0..2 {
            rendered.push(frames_rx.recv().await.unwrap());
        }
        gate.notify_one();
        for _ in 0..3 {
            rendered.push(frames_rx.recv().await.unwrap());
        }
        control.send(Message::Shutdown).await.unwrap();
        let poller = handle.await.unwrap();

        assert!(released.load(Ordering::SeqCst));
        assert!(!rendered.contains(&Some(1.0)), "late reading rendered: {rendered:?}");
        assert!(
            rendered.windows(2).all(|w| w[0] < w[1]),
            "series regressed: {rendered:?}"
        );
        let measured: Vec<f64> = poller.series().measured().iter().flatten().copied().collect();
        assert!(!measured.contains(&1.0));
        assert!(measured.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn reading_in_flight_at_shutdown_is_ignored() {
        let source = Gated::new(u32::MAX);
        let gate = Arc::clone(&source.gate);
        let calls = Arc::clone(&source.calls);
        let released = Arc::clone(&source.released);
        let poller = Poller::new(
            source,
            Recorder::default(),
            PollSettings { interval: Duration::from_millis(10), ..Default::default() },
        );

        let (handle, control) = poller.spawn();
        while calls.load(Ordering::SeqCst) == 0 {
            time::sleep(Duration::from_millis(1)).await;
        }
        control.send(Message::Shutdown).await.unwrap();
        let poller = handle.await.unwrap();

        // Let the held fetches finish against a closed channel.
        for _ in 0..100 {
            gate.notify_waiters();
            if released.load(Ordering::SeqCst) {
                break;
            }
            time::sleep(Duration::from_millis(1)).await;
        }

        assert!(released.load(Ordering::SeqCst));
        assert!(poller.series().is_empty());
        assert_eq!(poller.sink().renders, 0);
        assert!(poller.sink().errors.is_empty());
    }
}
