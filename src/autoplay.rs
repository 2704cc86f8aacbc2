use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::constants::*;

type TickFn = Arc<dyn Fn(u64) -> bool + Send + Sync>;

/// Keep an autoplay period inside `MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS`.
pub fn clamp_interval(secs: u64) -> u64 {
    secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
}

/// Parse the interval field the way a form input is read: leading digits
/// count ("2.5" is 2, "5s" is 5), blank or garbage falls back to the
/// default, and the result is clamped to the allowed range.
pub fn parse_interval(text: &str) -> u64 {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);

    if digits.is_empty() {
        return DEFAULT_INTERVAL_SECS;
    }
    if negative {
        return MIN_INTERVAL_SECS;
    }
    let secs = digits
        .bytes()
        .fold(0u64, |acc, b| acc.saturating_mul(10).saturating_add(u64::from(b - b'0')));
    clamp_interval(secs)
}

/// Timer that periodically calls `on_tick` with the generation it was
/// started under. At most one timer is alive: every start cancels the
/// previous one first.
pub struct Autoplay {
    enabled: bool,
    interval_secs: u64,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    on_tick: TickFn,
}

impl Autoplay {
    /// `on_tick` returns `false` once nobody listens anymore, which ends the
    /// timer task.
    pub fn new(interval_secs: u64, on_tick: impl Fn(u64) -> bool + Send + Sync + 'static) -> Self {
        Self {
            enabled: false,
            interval_secs: clamp_interval(interval_secs),
            generation: 0,
            timer: None,
            on_tick: Arc::new(on_tick),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Whether a tick stamped with `generation` comes from the live timer.
    pub fn accepts(&self, generation: u64) -> bool {
        self.timer.is_some() && generation == self.generation
    }

    /// Cancel any running timer and start a new one firing every
    /// `interval_secs` (clamped to the allowed range), first tick one full
    /// period from now. Must be called inside a tokio runtime.
    pub fn start(&mut self, interval_secs: u64) -> u64 {
        self.stop();

        let period = Duration::from_secs(clamp_interval(interval_secs));
        self.generation += 1;
        let generation = self.generation;
        let on_tick = Arc::clone(&self.on_tick);

        debug!("autoplay timer {} every {:?}", generation, period);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick(generation) {
                    break;
                }
            }
        }));
        generation
    }

    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.start(self.interval_secs);
        } else {
            self.stop();
        }
    }

    /// Store a new interval; a running autoplay restarts from now with it.
    pub fn set_interval(&mut self, interval_secs: u64) {
        self.interval_secs = clamp_interval(interval_secs);
        if self.enabled {
            self.start(self.interval_secs);
        }
    }

    /// Push the next automatic advance a full period away, e.g. after the
    /// user navigated by hand.
    pub fn restart_if_enabled(&mut self) {
        if self.enabled {
            self.start(self.interval_secs);
        }
    }
}

impl Drop for Autoplay {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // (generation, whole seconds since the test started)
    type Log = Arc<Mutex<Vec<(u64, u64)>>>;

    fn recording() -> (Autoplay, Log) {
        let log: Log = Arc::default();
        let start = Instant::now();
        let sink = Arc::clone(&log);
        let autoplay = Autoplay::new(DEFAULT_INTERVAL_SECS, move |generation| {
            sink.lock().unwrap().push((generation, start.elapsed().as_secs()));
            true
        });
        (autoplay, log)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn interval_text_parsing() {
        assert_eq!(parse_interval("5"), 5);
        assert_eq!(parse_interval(" 12 "), 12);
        assert_eq!(parse_interval(""), DEFAULT_INTERVAL_SECS);
        assert_eq!(parse_interval("abc"), DEFAULT_INTERVAL_SECS);
        assert_eq!(parse_interval("0"), 1);
        assert_eq!(parse_interval("-4"), 1);
        assert_eq!(parse_interval("2.5"), 2);
        assert_eq!(parse_interval("5s"), 5);
        assert_eq!(parse_interval("+7"), 7);
        assert_eq!(parse_interval("-"), DEFAULT_INTERVAL_SECS);
        assert_eq!(parse_interval("18446744073709551615"), MAX_INTERVAL_SECS);
        assert_eq!(parse_interval("99999999999999999999999"), MAX_INTERVAL_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_twice_leaves_one_timer() {
        let (mut autoplay, log) = recording();
        let first = autoplay.start(2);
        let second = autoplay.start(2);
        assert_ne!(first, second);
        assert!(autoplay.accepts(second));
        assert!(!autoplay.accepts(first));

        sleep_ms(4_500).await;
        assert_eq!(*log.lock().unwrap(), vec![(second, 2), (second, 4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_resets_schedule() {
        let (mut autoplay, log) = recording();
        autoplay.set_interval(2);
        autoplay.set_enabled(true);

        sleep_ms(3_000).await;
        assert_eq!(log.lock().unwrap().len(), 1);

        autoplay.set_interval(5);
        let current = autoplay.generation();
        sleep_ms(4_900).await; // t = 7.9
        assert_eq!(log.lock().unwrap().len(), 1);

        sleep_ms(5_200).await; // t = 13.1
        let ticks = log.lock().unwrap().clone();
        assert_eq!(ticks[1..], [(current, 8), (current, 13)]);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_pushes_next_tick_a_full_period_away() {
        let (mut autoplay, log) = recording();
        autoplay.set_interval(2);
        autoplay.set_enabled(true);

        sleep_ms(1_500).await;
        autoplay.restart_if_enabled();
        sleep_ms(1_000).await; // t = 2.5, first timer would have fired at 2
        assert!(log.lock().unwrap().is_empty());

        sleep_ms(1_000).await; // t = 3.5
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(log.lock().unwrap()[0].1, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_is_clamped_to_one_second() {
        let (mut autoplay, log) = recording();
        autoplay.set_interval(0);
        assert_eq!(autoplay.interval_secs(), 1);

        autoplay.start(0);
        sleep_ms(3_500).await;
        let seconds: Vec<u64> = log.lock().unwrap().iter().map(|t| t.1).collect();
        assert_eq!(seconds, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_stops_ticks() {
        let (mut autoplay, log) = recording();
        autoplay.set_interval(1);
        autoplay.set_enabled(true);
        assert!(autoplay.is_running());

        sleep_ms(1_500).await;
        autoplay.set_enabled(false);
        assert!(!autoplay.is_running());
        autoplay.stop();

        sleep_ms(5_000).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn changing_interval_while_disabled_does_not_start() {
        let (mut autoplay, log) = recording();
        autoplay.set_interval(1);
        assert!(!autoplay.is_running());
        autoplay.restart_if_enabled();
        assert!(!autoplay.is_running());

        sleep_ms(3_000).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ends_when_listener_is_gone() {
        let mut autoplay = Autoplay::new(1, |_| false);
        autoplay.start(1);
        sleep_ms(1_500).await;
        assert!(!autoplay.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_keeps_the_timer_alive() {
        let (mut autoplay, log) = recording();
        autoplay.set_interval(u64::MAX);
        assert_eq!(autoplay.interval_secs(), MAX_INTERVAL_SECS);
        autoplay.set_enabled(true);

        sleep_ms(50).await;
        assert!(autoplay.is_running());
        assert!(autoplay.enabled());

        autoplay.start(u64::MAX);
        sleep_ms(50).await;
        assert!(autoplay.is_running());

        tokio::time::sleep(Duration::from_secs(MAX_INTERVAL_SECS)).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
