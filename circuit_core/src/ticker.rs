//! Periodic tick source for driving an [`Engine`](crate::engine::Engine).
//!
//! A [`Ticker`] owns a background thread that calls a closure once per
//! interval. The thread lives exactly as long as the `Ticker` value: acquire
//! one when the session starts running, drop it on pause, completion and
//! exit. Dropping wakes the thread immediately and joins it, so no timer
//! outlives its session.
//!
//! Ticks usually travel through a channel, so a few may still be queued when
//! their ticker is dropped. A [`TickGate`] stamps each ticker with a
//! generation and lets through only ticks from the one currently held.

use crate::engine::{CueSink, Engine};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background thread calling `on_tick` once per interval
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a tick thread
    ///
    /// The thread stops on its own when `on_tick` returns `false`.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !on_tick() {
                        tracing::debug!("Tick receiver gone, stopping ticker");
                        break;
                    }
                }
                // Explicit stop or the owning Ticker was dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        tracing::debug!("Ticker started ({:?} interval)", interval);
        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Ticker thread panicked");
            }
            tracing::debug!("Ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decides which queued ticks may still reach an engine
#[derive(Debug, Default)]
pub struct TickGate {
    generation: u64,
    held: bool,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a new ticker as held, returning the generation to stamp its ticks with
    pub fn acquire(&mut self) -> u64 {
        self.generation += 1;
        self.held = true;
        self.generation
    }

    /// Mark the current ticker as released; its queued ticks become stale
    pub fn release(&mut self) {
        self.held = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.held && generation == self.generation
    }

    /// Tick `engine` if `generation` belongs to the held ticker
    ///
    /// Returns whether the tick was delivered. Stale ticks are dropped, never
    /// replayed later.
    pub fn deliver<C: CueSink>(&self, engine: &mut Engine<C>, generation: u64) -> bool {
        if !self.accepts(generation) {
            tracing::trace!("Dropping stale tick from generation {}", generation);
            return false;
        }
        engine.tick();
        true
    }
}
