//! # Progress — Atomic Mining Telemetry
//!
//! Counters shared between mining workers and the background status
//! reporter. Workers only ever `fetch_add`/`fetch_max` atomics; a Mutex
//! guards the current-work label, which changes once per header.
//!
//! ## Background Reporter
//!
//! A dedicated thread logs sieve rounds, chain tests, test rate, primes hit
//! and the longest chain seen at a fixed interval. Between reports it waits
//! on a condition variable that `stop()` signals.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use crate::target;

pub struct Progress {
    pub rounds: AtomicU64,
    pub tests: AtomicU64,
    pub primes_hit: AtomicU64,
    pub found: AtomicU64,
    /// Longest length word measured so far.
    pub best_length: AtomicU32,
    pub current: Mutex<String>,
    start: Instant,
    shutdown: Mutex<bool>,
    wake: Condvar,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            rounds: AtomicU64::new(0),
            tests: AtomicU64::new(0),
            primes_hit: AtomicU64::new(0),
            found: AtomicU64::new(0),
            best_length: AtomicU32::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: Mutex::new(false),
            wake: Condvar::new(),
        })
    }

    pub fn set_current(&self, label: impl Into<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = label.into();
        }
    }

    pub fn record_length(&self, length: u32) {
        self.best_length.fetch_max(length, Ordering::Relaxed);
    }

    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || loop {
            let Ok(guard) = progress.shutdown.lock() else {
                break;
            };
            let stopped = match progress.wake.wait_timeout_while(guard, interval, |stopped| !*stopped) {
                Ok((stopped, _)) => *stopped,
                Err(_) => true,
            };
            if stopped {
                break;
            }
            progress.print_status();
        })
    }

    /// Chain tests per second since start.
    pub fn test_rate(&self) -> f64 {
        let elapsed = self.start.elapsed();
        if elapsed.as_secs() > 0 {
            self.tests.load(Ordering::Relaxed) as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let current = self
            .current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        info!(
            current = %current,
            rounds = self.rounds.load(Ordering::Relaxed),
            tests = self.tests.load(Ordering::Relaxed),
            rate = format_args!("{:.2}", self.test_rate()),
            primes_hit = self.primes_hit.load(Ordering::Relaxed),
            found = self.found.load(Ordering::Relaxed),
            best = %target::format_target(self.best_length.load(Ordering::Relaxed)),
            elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
            "mining progress"
        );
    }

    /// Signals the reporter to exit and wakes it if it is waiting.
    pub fn stop(&self) {
        if let Ok(mut stopped) = self.shutdown.lock() {
            *stopped = true;
        }
        self.wake.notify_all();
    }
}
