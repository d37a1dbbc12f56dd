//! File watching for the dev server.
//!
//! Two independent watchers run on their own threads:
//!
//! ```text
//! pages/ components/ assets/ ──► Debouncer ──► RebuildGate ──► build_site()
//!                                                                  │
//!                                                                  ▼
//! ReloadHub ◄── Debouncer ◄──────────────────────────────────── output/
//! ```
//!
//! A rebuild is always a full run of the pipeline. Bursts of events are
//! collapsed by the debouncer, and changes arriving during a build queue at
//! most one more build.

use crate::{
    build::{BuildMode, build_site},
    config::SiteConfig,
    log,
    reload::{ReloadEvent, ReloadHub},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
        || name == "4913"
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Debounce State
// =============================================================================

/// Collects changed paths until no new event arrived for `window`.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    pub fn add(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.add_at(paths, Instant::now());
    }

    /// Record `paths` as changed at `now`, restarting the quiet window.
    /// Temp files are dropped.
    pub fn add_at(&mut self, paths: impl IntoIterator<Item = PathBuf>, now: Instant) {
        self.pending
            .extend(paths.into_iter().filter(|path| !is_temp_file(path)));
        if !self.pending.is_empty() {
            self.last_event = Some(now);
        }
    }

    pub fn ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    pub fn ready_at(&self, now: Instant) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| now.saturating_duration_since(t) >= self.window)
    }

    /// Drain the collected paths, sorted.
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    /// How long the event loop may block before checking `ready` again.
    pub fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            self.window
        }
    }
}

// =============================================================================
// Rebuild Gate
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevState {
    Idle,
    Building,
    Watching,
}

#[derive(Debug)]
struct GateState {
    state: DevState,
    pending: bool,
}

/// Serializes rebuilds with a single pending slot.
#[derive(Debug)]
pub struct RebuildGate {
    inner: Mutex<GateState>,
}

impl Default for RebuildGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RebuildGate {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(GateState {
                state: DevState::Idle,
                pending: false,
            }),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> DevState {
        self.inner.lock().state
    }

    /// Run `build` unless one is already running.
    ///
    /// While a build runs, further requests only set the pending flag and
    /// return `false`; the running caller then builds once more. Failures are
    /// logged and never stop the gate.
    pub fn run(&self, mut build: impl FnMut() -> Result<()>) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state == DevState::Building {
                inner.pending = true;
                return false;
            }
            inner.state = DevState::Building;
        }

        loop {
            if let Err(e) = build() {
                log!("dev"; "build failed: {e:#}");
            }

            let mut inner = self.inner.lock();
            if inner.pending {
                inner.pending = false;
                continue;
            }
            inner.state = DevState::Watching;
            return true;
        }
    }
}

// =============================================================================
// Watchers
// =============================================================================

/// Block on `paths`, calling `on_ready` with each debounced batch.
fn watch_loop(
    paths: &[PathBuf],
    window: Duration,
    mut on_ready: impl FnMut(Vec<PathBuf>),
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    for path in paths.iter().filter(|p| p.exists()) {
        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
    }

    let mut debouncer = Debouncer::new(window);
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event.paths),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => on_ready(debouncer.take()),
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }
    Ok(())
}

/// Rebuild the site whenever pages, components or assets change.
///
/// Each build runs on its own thread so that changes made meanwhile reach
/// the gate's pending slot.
pub fn spawn_source_watcher(
    config: Arc<SiteConfig>,
    gate: Arc<RebuildGate>,
    mode: BuildMode,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let build = &config.build;
        let sources = [build.pages.clone(), build.components.clone(), build.assets.clone()];
        let root = config.get_root().to_path_buf();
        for dir in sources.iter().filter(|p| p.exists()) {
            log!("watch"; "{}/", rel_path(dir, &root));
        }

        let result = watch_loop(&sources, config.serve.debounce(), |paths| {
            let names: Vec<_> = paths.iter().map(|p| rel_path(p, &root)).collect();
            log!("watch"; "changed: {}", names.join(", "));

            let (config, gate) = (Arc::clone(&config), Arc::clone(&gate));
            thread::spawn(move || {
                gate.run(|| {
                    build_site(&config, mode)?;
                    Ok(())
                });
            });
        });
        if let Err(e) = result {
            log!("watch"; "source watcher stopped: {e:#}");
        }
    })
}

/// Tell browsers to reload whenever the output directory changes.
///
/// Creates the directory when missing, e.g. after a failed first build.
pub fn spawn_output_watcher(config: Arc<SiteConfig>, hub: Arc<ReloadHub>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let output = config.build.output.clone();
        let result = fs::create_dir_all(&output)
            .with_context(|| format!("Failed to create {}", output.display()))
            .and_then(|()| {
                watch_loop(std::slice::from_ref(&output), config.serve.debounce(), |paths| {
                    let event = ReloadEvent { paths };
                    let clients = hub.broadcast(&event);
                    if clients > 0 {
                        let changed = event.paths.len();
                        log!("reload"; "{changed} file(s) changed, reloading {clients} client(s)");
                    }
                })
            });
        if let Err(e) = result {
            log!("watch"; "output watcher stopped: {e:#}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("pages/.index.vue.swp")));
        assert!(is_temp_file(Path::new("pages/index.vue~")));
        assert!(is_temp_file(Path::new("pages/#index.vue#")));
        assert!(is_temp_file(Path::new("pages/4913")));
        assert!(!is_temp_file(Path::new("pages/index.vue")));
    }

    #[test]
    fn test_debouncer_waits_for_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.ready_at(start + WINDOW));

        debouncer.add_at([PathBuf::from("a.vue")], start);
        debouncer.add_at([PathBuf::from("b.vue")], start + Duration::from_millis(200));

        assert!(!debouncer.ready_at(start + Duration::from_millis(400)));
        assert!(debouncer.ready_at(start + Duration::from_millis(500)));
        assert_eq!(debouncer.timeout(), WINDOW);

        let paths = debouncer.take();
        assert_eq!(paths, vec![PathBuf::from("a.vue"), PathBuf::from("b.vue")]);
        assert!(!debouncer.ready_at(start + Duration::from_secs(10)));
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_debouncer_collapses_repeats_and_ignores_temp_files() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.add_at([PathBuf::from(".x.swp"), PathBuf::from("x~")], start);
        assert!(!debouncer.ready_at(start + WINDOW));

        for i in 0..10 {
            debouncer.add_at([PathBuf::from("same.vue")], start + Duration::from_millis(i));
        }
        assert!(debouncer.ready_at(start + Duration::from_millis(9) + WINDOW));
        assert_eq!(debouncer.take().len(), 1);
    }

    #[test]
    fn test_gate_absorbs_requests_while_building() {
        let gate = Arc::new(RebuildGate::new());
        assert_eq!(gate.state(), DevState::Idle);

        let runs = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let worker = {
            let (gate, runs) = (Arc::clone(&gate), Arc::clone(&runs));
            thread::spawn(move || {
                gate.run(|| {
                    if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                        started_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                    }
                    Ok(())
                })
            })
        };

        started_rx.recv().unwrap();
        assert_eq!(gate.state(), DevState::Building);
        assert!(!gate.run(|| unreachable!("absorbed request must not build")));
        assert!(!gate.run(|| unreachable!("absorbed request must not build")));

        release_tx.send(()).unwrap();
        assert!(worker.join().unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(gate.state(), DevState::Watching);
    }

    #[test]
    fn test_output_watcher_reloads_when_output_appears_later() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::compiler::testing::config(dir.path());
        config.serve.debounce_ms = 50;
        let output = config.build.output.clone();
        assert!(!output.exists());

        let hub = Arc::new(ReloadHub::new());
        let (tx, rx) = mpsc::channel();
        hub.subscribe(move |event: &ReloadEvent| {
            let _ = tx.send(event.paths.len());
        });
        spawn_output_watcher(Arc::new(config), Arc::clone(&hub));

        let deadline = Instant::now() + Duration::from_secs(10);
        for i in 0.. {
            assert!(Instant::now() < deadline, "no reload after the output was written");
            if output.is_dir() {
                fs::write(output.join(format!("page{i}.html")), "x").unwrap();
            }
            if let Ok(changed) = rx.recv_timeout(Duration::from_millis(200)) {
                assert!(changed > 0);
                break;
            }
        }
    }

    #[test]
    fn test_gate_survives_failed_build() {
        let gate = RebuildGate::new();
        assert!(gate.run(|| anyhow::bail!("broken template")));
        assert_eq!(gate.state(), DevState::Watching);

        let mut ran = false;
        assert!(gate.run(|| {
            ran = true;
            Ok(())
        }));
        assert!(ran);
    }
}
