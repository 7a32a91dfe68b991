//! Scriptable mock backend for deterministic engine tests.
//!
//! Tests drive the engine against [`MockBackend`], then inspect what each
//! acquired handle was told to do. Loads can be scripted to fail, hang (for
//! timeout tests), or hand out handles whose operations fail.

use crate::backend::{AcquireFuture, AudioBackend};
use crate::handle::AudioHandle;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stembox_core::{Result, StemBoxError};

/// One operation issued against a mock handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Seek(u64),
    SetVolume(f32),
    SetRate(f32),
    Unload,
}

/// Shared, observable state of one mock handle.
pub type SharedState = Arc<Mutex<MockHandleState>>;

/// Observable state of one mock handle.
#[derive(Debug)]
pub struct MockHandleState {
    pub url: String,
    pub playing: bool,
    pub position_ms: u64,
    pub volume: f32,
    pub rate: f32,
    pub duration_ms: u64,
    pub unloaded: bool,
    pub fail_ops: bool,
    pub log: Vec<Command>,
}

/// A mock audio handle; every operation mutates the shared state the test
/// holds a reference to.
pub struct MockHandle {
    state: Arc<Mutex<MockHandleState>>,
}

impl MockHandle {
    fn op(&mut self, command: Command, apply: impl FnOnce(&mut MockHandleState)) -> Result<()> {
        let mut state = self.state.lock();
        if state.unloaded {
            return Err(StemBoxError::Operation(format!(
                "{:?} on unloaded handle for {}",
                command, state.url
            )));
        }
        state.log.push(command.clone());
        if state.fail_ops {
            return Err(StemBoxError::Operation(format!(
                "scripted {:?} failure for {}",
                command, state.url
            )));
        }
        apply(&mut state);
        Ok(())
    }
}

impl AudioHandle for MockHandle {
    fn play(&mut self) -> Result<()> {
        self.op(Command::Play, |s| s.playing = true)
    }

    fn pause(&mut self) -> Result<()> {
        self.op(Command::Pause, |s| s.playing = false)
    }

    fn stop(&mut self) -> Result<()> {
        self.op(Command::Stop, |s| {
            s.playing = false;
            s.position_ms = 0;
        })
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.op(Command::Seek(position_ms), |s| s.position_ms = position_ms)
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.op(Command::SetVolume(volume), |s| s.volume = volume)
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.op(Command::SetRate(rate), |s| s.rate = rate)
    }

    fn position(&self) -> Result<u64> {
        let state = self.state.lock();
        if state.unloaded || state.fail_ops {
            return Err(StemBoxError::Operation(format!(
                "position query failed for {}",
                state.url
            )));
        }
        Ok(state.position_ms)
    }

    fn duration(&self) -> Result<u64> {
        let state = self.state.lock();
        if state.unloaded {
            return Err(StemBoxError::Operation(format!(
                "duration query on unloaded handle for {}",
                state.url
            )));
        }
        Ok(state.duration_ms)
    }

    fn unload(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.unloaded {
            return Err(StemBoxError::Operation(format!(
                "double unload for {}",
                state.url
            )));
        }
        state.log.push(Command::Unload);
        state.unloaded = true;
        state.playing = false;
        Ok(())
    }
}

#[derive(Default)]
struct BackendState {
    loads: Vec<String>,
    fail: HashSet<String>,
    hang: HashSet<String>,
    fail_ops: HashSet<String>,
    durations: HashMap<String, u64>,
    handles: HashMap<String, Vec<Arc<Mutex<MockHandleState>>>>,
}

/// Scriptable [`AudioBackend`] recording every load and every handle.
#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<BackendState>,
    hung_releases: Arc<AtomicUsize>,
}

/// Marks a hung acquisition as released when its future is dropped.
struct HungGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for HungGuard {
    fn drop(&mut self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script acquisitions of `url` to fail.
    pub fn fail_url(&self, url: &str) {
        self.inner.lock().fail.insert(url.to_string());
    }

    /// Script acquisitions of `url` to never resolve.
    pub fn hang_url(&self, url: &str) {
        self.inner.lock().hang.insert(url.to_string());
    }

    /// Script handles for `url` to fail every operation.
    pub fn fail_ops_url(&self, url: &str) {
        self.inner.lock().fail_ops.insert(url.to_string());
    }

    /// Set the duration reported by handles for `url`.
    pub fn set_duration(&self, url: &str, duration_ms: u64) {
        self.inner.lock().durations.insert(url.to_string(), duration_ms);
    }

    /// Total number of acquisitions attempted.
    pub fn load_count(&self) -> usize {
        self.inner.lock().loads.len()
    }

    /// Number of acquisitions attempted for `url`.
    pub fn load_count_for(&self, url: &str) -> usize {
        self.inner.lock().loads.iter().filter(|u| u.as_str() == url).count()
    }

    /// Hung acquisitions whose futures were dropped.
    pub fn hung_releases(&self) -> usize {
        self.hung_releases.load(Ordering::SeqCst)
    }

    /// All handle states ever created for `url`, oldest first.
    pub fn handles_for(&self, url: &str) -> Vec<Arc<Mutex<MockHandleState>>> {
        self.inner.lock().handles.get(url).cloned().unwrap_or_default()
    }

    /// The most recently created handle state for `url`.
    pub fn last_handle(&self, url: &str) -> Option<Arc<Mutex<MockHandleState>>> {
        self.inner.lock().handles.get(url).and_then(|v| v.last().cloned())
    }

    /// Handles created and not yet unloaded, across all URLs.
    pub fn live_handle_count(&self) -> usize {
        self.inner
            .lock()
            .handles
            .values()
            .flatten()
            .filter(|s| !s.lock().unloaded)
            .count()
    }
}

impl AudioBackend for MockBackend {
    fn acquire(&self, url: &str) -> AcquireFuture<'_> {
        let url = url.to_string();
        Box::pin(async move {
            let (hang, fail, fail_ops, duration_ms) = {
                let mut inner = self.inner.lock();
                inner.loads.push(url.clone());
                (
                    inner.hang.contains(&url),
                    inner.fail.contains(&url),
                    inner.fail_ops.contains(&url),
                    inner.durations.get(&url).copied().unwrap_or(180_000),
                )
            };

            if hang {
                let _guard = HungGuard {
                    counter: self.hung_releases.clone(),
                };
                std::future::pending::<()>().await;
            }

            if fail {
                return Err(StemBoxError::Load(format!("scripted failure for {url}")));
            }

            let state = Arc::new(Mutex::new(MockHandleState {
                url: url.clone(),
                playing: false,
                position_ms: 0,
                volume: 1.0,
                rate: 1.0,
                duration_ms,
                unloaded: false,
                fail_ops,
                log: Vec::new(),
            }));
            self.inner.lock().handles.entry(url).or_default().push(state.clone());

            Ok(Box::new(MockHandle { state }) as Box<dyn AudioHandle>)
        })
    }
}
