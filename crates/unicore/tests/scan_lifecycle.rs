// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Scan lifecycle integration tests
//!
//! Scan state machine, partial enumeration, background detection, scheduler
//! registry behavior and file-driven setup.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use unicore::{
    DiscoveredType, Error, ScanState, TypeCatalog, TypeContext, TypeEnumeration, TypeHandle,
    TypeLoader, TypeSource, UnicoreConfig,
};

const WAIT: Duration = Duration::from_secs(5);

/// Source that counts passes and can fail after a number of items.
struct ScriptedSource {
    types: Vec<DiscoveredType>,
    fail_after: Option<usize>,
    passes: AtomicUsize,
}

impl ScriptedSource {
    fn new(names: &[(&str, Option<&str>)]) -> Self {
        Self {
            types: names
                .iter()
                .map(|(name, parent)| DiscoveredType::new(*name, *parent))
                .collect(),
            fail_after: None,
            passes: AtomicUsize::new(0),
        }
    }

    fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

impl TypeSource for ScriptedSource {
    fn enumerate(&self) -> unicore::Result<TypeEnumeration<'_>> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        let fail_after = self.fail_after;
        Ok(Box::new(self.types.iter().enumerate().map(move |(i, ty)| {
            if fail_after.is_some_and(|n| i >= n) {
                Err(Error::Enumeration(format!("class path entry {} unreadable", i)))
            } else {
                Ok(ty.clone())
            }
        })))
    }
}

struct NoLoader;

impl TypeLoader for NoLoader {
    fn load_by_name(&self, _name: &str, _initialize: bool) -> Option<TypeHandle> {
        None
    }
}

fn context_over(source: Arc<ScriptedSource>) -> TypeContext {
    TypeContext::new(UnicoreConfig::bare(), Arc::new(NoLoader), source)
}

/// Source whose first pass stops between its two types until released.
///
/// Pass `n` yields `p<n>.First` and `p<n>.Second`.
struct GatedSource {
    passes: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    paused: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedSource {
    fn new() -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (paused_tx, paused_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = Self {
            passes: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            paused: Mutex::new(paused_tx),
            release: Mutex::new(release_rx),
        };
        (source, paused_rx, release_tx)
    }
}

/// Counts a pass as running for as long as its enumeration is alive.
struct ActivePass<'a>(&'a AtomicUsize);

impl Drop for ActivePass<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TypeSource for GatedSource {
    fn enumerate(&self) -> unicore::Result<TypeEnumeration<'_>> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        let guard = ActivePass(&self.active);

        Ok(Box::new(["First", "Second"].into_iter().enumerate().map(
            move |(i, suffix)| {
                let _alive = &guard;
                if pass == 0 && i == 1 {
                    let _ = self.paused.lock().expect("paused lock").send(());
                    let _ = self.release.lock().expect("release lock").recv_timeout(WAIT);
                }
                Ok(DiscoveredType::new(format!("p{}.{}", pass, suffix), None))
            },
        )))
    }
}

#[test]
fn test_scan_enumerates_once() {
    let source = Arc::new(ScriptedSource::new(&[("a.A", None), ("a.B", Some("a.A"))]));
    let ctx = context_over(Arc::clone(&source));

    let first = ctx.scan();
    let second = ctx.scan();
    assert_eq!(source.passes(), 1);
    assert_eq!(first, second);

    ctx.get_filtered(&["a."]);
    assert_eq!(source.passes(), 1);
}

#[test]
fn test_clear_false_freezes_until_clear_true() {
    let source = Arc::new(ScriptedSource::new(&[("a.A", None)]));
    let ctx = context_over(Arc::clone(&source));

    assert_eq!(ctx.scan().len(), 1);
    ctx.clear(false);
    assert!(ctx.get_map().is_empty());
    assert!(ctx.scan().is_empty());
    assert_eq!(ctx.scan_state(), ScanState::Scanned);
    assert_eq!(source.passes(), 1);

    ctx.clear(true);
    assert_eq!(ctx.scan_state(), ScanState::Idle);
    assert_eq!(ctx.scan().len(), 1);
    assert_eq!(source.passes(), 2);
}

#[test]
fn test_partial_enumeration_keeps_records() {
    let source = Arc::new(
        ScriptedSource::new(&[("a.One", None), ("a.Two", None), ("a.Three", None)])
            .failing_after(2),
    );
    let ctx = context_over(Arc::clone(&source));

    let snapshot = ctx.scan();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.contains_key("a.One"));
    assert!(snapshot.contains_key("a.Two"));
    assert_eq!(ctx.scan_state(), ScanState::Scanned);

    // Not retried until an explicit clear.
    ctx.scan();
    assert_eq!(source.passes(), 1);
    ctx.clear(true);
    ctx.scan();
    assert_eq!(source.passes(), 2);
}

#[test]
fn test_disabled_scanning_is_consistently_empty() {
    let source = Arc::new(ScriptedSource::new(&[("a.A", None)]));
    let ctx = context_over(Arc::clone(&source));
    ctx.set_scanning_enabled(false);

    assert!(ctx.scan().is_empty());
    assert!(ctx.get_filtered(&[]).is_empty());
    assert!(ctx.find_subtypes_of_names(&["a.A"], &[]).is_empty());
    ctx.detect_classes().expect("no-op while disabled");
    assert_eq!(source.passes(), 0);
    assert_eq!(ctx.scan_state(), ScanState::Idle);
}

#[test]
fn test_concurrent_scans_enumerate_once() {
    let source = Arc::new(ScriptedSource::new(&[("a.A", None), ("a.B", None)]));
    let ctx = Arc::new(context_over(Arc::clone(&source)));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.scan().len()
            })
        })
        .collect();

    for handle in handles {
        let len = handle.join().expect("scan thread");
        assert!(len <= 2);
    }
    assert_eq!(source.passes(), 1);
    assert_eq!(ctx.get_map().len(), 2);
}

#[test]
fn test_clear_true_during_scan_defers_rescan() {
    let (source, paused, release) = GatedSource::new();
    let source = Arc::new(source);
    let ctx = Arc::new(TypeContext::new(
        UnicoreConfig::bare(),
        Arc::new(NoLoader),
        Arc::clone(&source) as Arc<dyn TypeSource>,
    ));

    let worker = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || ctx.scan())
    };
    paused.recv_timeout(WAIT).expect("first pass paused");
    assert!(ctx.index().get("p0.First").is_some());

    ctx.clear(true);
    assert_eq!(ctx.scan_state(), ScanState::Scanning);
    assert!(ctx.scan().is_empty());
    assert_eq!(source.passes.load(Ordering::SeqCst), 1);

    release.send(()).expect("release first pass");
    let first = worker.join().expect("scan thread");
    assert!(first.is_empty());
    assert_eq!(ctx.scan_state(), ScanState::Idle);

    let snapshot = ctx.scan();
    let mut keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["p1.First", "p1.Second"]);
    assert_eq!(source.passes.load(Ordering::SeqCst), 2);
    assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
}

#[test]
fn test_clear_false_during_scan_freezes_empty() {
    let (source, paused, release) = GatedSource::new();
    let source = Arc::new(source);
    let ctx = Arc::new(TypeContext::new(
        UnicoreConfig::bare(),
        Arc::new(NoLoader),
        Arc::clone(&source) as Arc<dyn TypeSource>,
    ));

    let worker = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || ctx.scan())
    };
    paused.recv_timeout(WAIT).expect("first pass paused");

    ctx.clear(false);
    release.send(()).expect("release first pass");
    assert!(worker.join().expect("scan thread").is_empty());

    assert_eq!(ctx.scan_state(), ScanState::Scanned);
    assert!(ctx.scan().is_empty());
    assert_eq!(source.passes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_alias_resolution_memoized_through_context() {
    struct CountingLoader {
        inner: TypeCatalog,
        calls: AtomicUsize,
    }

    impl TypeLoader for CountingLoader {
        fn load_by_name(&self, name: &str, initialize: bool) -> Option<TypeHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.load_by_name(name, initialize)
        }
    }

    let loader = Arc::new(CountingLoader {
        inner: TypeCatalog::new().with("abc", None),
        calls: AtomicUsize::new(0),
    });
    let ctx = TypeContext::new(
        UnicoreConfig::bare(),
        Arc::clone(&loader) as Arc<dyn TypeLoader>,
        Arc::new(ScriptedSource::new(&[])),
    );
    ctx.mappings().load_from_str("CL: abc com.acme.Client\n");

    let first = ctx.find(&["com.acme.Client"]).expect("resolved via alias");
    let after_first = loader.calls.load(Ordering::SeqCst);
    let second = ctx.find(&["com.acme.Client"]).expect("cached");

    assert_eq!(first.name(), "abc");
    assert!(first.ptr_eq(&second));
    assert_eq!(loader.calls.load(Ordering::SeqCst), after_first);
    assert!(ctx.cache().get("com.acme.Client").is_some());
}

#[test]
fn test_detect_classes_runs_in_background() {
    let catalog = Arc::new(TypeCatalog::new().with("b.A", None).with("b.B", Some("b.A")));
    let ctx = TypeContext::from_catalog(UnicoreConfig::bare(), catalog);

    ctx.detect_classes().expect("submit background scan");
    let entry = ctx
        .get_or_create_scheduler(&ctx.config().scheduler_name)
        .expect("scheduler");

    // A job queued behind the scan observes the finished index.
    let (tx, rx) = std::sync::mpsc::channel();
    let index = Arc::clone(ctx.index());
    entry
        .scheduler()
        .execute(move || {
            let _ = tx.send(index.len());
        })
        .expect("probe job");

    assert_eq!(rx.recv_timeout(WAIT).expect("probe ran"), 2);
    assert!(ctx.index().has_scanned());
}

#[test]
fn test_scheduler_first_call_wins() {
    let ctx = Arc::new(TypeContext::from_catalog(
        UnicoreConfig::bare(),
        Arc::new(TypeCatalog::new()),
    ));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.get_or_create_scheduler("race").expect("create")
            })
        })
        .collect();

    let entries: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();
    for entry in &entries[1..] {
        assert!(Arc::ptr_eq(&entries[0], entry));
    }
    assert_eq!(ctx.schedulers().len(), 1);

    ctx.shutdown_all_schedulers();
    assert!(ctx.schedulers().is_empty());
    assert!(entries[0].scheduler().await_termination(WAIT));
    assert!(matches!(
        entries[0].scheduler().execute(|| {}),
        Err(Error::SchedulerShutdown(_))
    ));
}

#[test]
fn test_context_from_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("client.srg"),
        "PK: ./ com/acme\nCL: abc com.acme.Client\nCL: abd com.acme.ClientMixin\n",
    )
    .expect("write mappings");
    std::fs::write(
        dir.path().join("types.json"),
        r#"{ "types": [
            { "name": "abc" },
            { "name": "abd", "superclass": "abc" },
            { "name": "jdk.internal.Unsafe" }
        ] }"#,
    )
    .expect("write manifest");

    let config_path = dir.path().join("unicore.toml");
    std::fs::write(
        &config_path,
        format!(
            "mapping_path = \"client.srg\"\nresource_roots = [{:?}]\n",
            dir.path().display().to_string()
        ),
    )
    .expect("write config");

    let config = UnicoreConfig::from_file(&config_path).expect("config");
    let catalog =
        TypeCatalog::from_manifest_file(dir.path().join("types.json")).expect("manifest");
    let ctx = TypeContext::from_catalog(config, Arc::new(catalog));

    // Default exclusions: jdk package and the mixin marker are dropped.
    let snapshot = ctx.scan();
    let keys: Vec<&String> = snapshot.keys().collect();
    assert_eq!(keys, vec!["com.acme.Client"]);

    assert_eq!(ctx.to_canonical("abc"), "com.acme.Client");
    assert_eq!(ctx.to_mapped("com.acme.Client", true), "abc");
    assert!(ctx.mappings().is_loaded());
}

#[test]
fn test_missing_mapping_resource_degrades_to_identity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = UnicoreConfig::bare()
        .mapping_path("absent.srg")
        .resource_root(dir.path());
    let catalog = Arc::new(TypeCatalog::new().with("abc", None));
    let ctx = TypeContext::from_catalog(config, catalog);

    let snapshot = ctx.scan();
    assert!(snapshot.contains_key("abc"));
    assert_eq!(ctx.to_canonical("abc"), "abc");
    assert_eq!(ctx.to_mapped("a.b.C", true), "C");
}
