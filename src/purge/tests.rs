use super::*;
use crate::api::{ApiError, PurgeApi, PurgeOutcome};
use crate::context::PageContext;
use crate::store::{FileStore, MemoryStore};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Store wrapper that counts every access
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    reads: Cell<usize>,
    writes: usize,
}

impl PersistedStore for CountingStore {
    fn is_available(&self) -> bool {
        self.reads.set(self.reads.get() + 1);
        self.inner.is_available()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.reads.set(self.reads.get() + 1);
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        self.writes += 1;
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &str) -> bool {
        self.writes += 1;
        self.inner.delete(key)
    }
}

/// Store that reads fine but drops every write, like a read-only disk
#[derive(Default)]
struct ReadOnlyStore {
    inner: MemoryStore,
}

impl PersistedStore for ReadOnlyStore {
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }

    fn set(&mut self, _key: &str, _value: Value) -> bool {
        false
    }

    fn delete(&mut self, _key: &str) -> bool {
        false
    }
}

/// Handle onto a store that a page host can also reach
#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl PersistedStore for SharedStore {
    fn is_available(&self) -> bool {
        self.0.borrow().is_available()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        self.0.borrow_mut().set(key, value)
    }

    fn delete(&mut self, key: &str) -> bool {
        self.0.borrow_mut().delete(key)
    }
}

/// Page whose reload wipes site data, as another tab clearing storage would
struct WipingPage {
    context: PageContext,
    store: SharedStore,
    reloads: usize,
}

impl PageHost for WipingPage {
    type Error = std::convert::Infallible;

    async fn context(&mut self) -> Result<PageContext, Self::Error> {
        Ok(self.context.clone())
    }

    async fn reload(&mut self) -> Result<(), Self::Error> {
        self.reloads += 1;
        self.store.0.borrow_mut().clear();
        Ok(())
    }
}

enum Reply {
    Purged,
    Rejected,
    Broken,
}

/// Purge API that answers from a fixed script and records the titles
struct ScriptedApi {
    reply: Reply,
    calls: RefCell<Vec<String>>,
}

impl ScriptedApi {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl PurgeApi for ScriptedApi {
    async fn purge(&self, title: &str) -> Result<PurgeOutcome, ApiError> {
        self.calls.borrow_mut().push(title.to_string());
        match self.reply {
            Reply::Purged => Ok(PurgeOutcome::Purged),
            Reply::Rejected => Ok(PurgeOutcome::Rejected(json!({"code": "ratelimited"}))),
            Reply::Broken => Err(ApiError::MissingRevision(title.to_string())),
        }
    }
}

fn qualifying(pages: &[&str]) -> QualifyingPageSet {
    pages.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_flag_key_format() {
    assert_eq!(flag_key("Main_Page", "example wiki"), "Main_Page-example wiki-AP");
}

#[test]
fn test_transition_alternates() {
    assert_eq!(
        FlagState::Idle.transition(),
        (FlagState::Pending, PurgeAction::RequestPurgeAndReload)
    );
    assert_eq!(
        FlagState::Pending.transition(),
        (FlagState::Idle, PurgeAction::None)
    );
}

#[test]
fn test_evaluate_alternates_over_many_loads() {
    let mut store = MemoryStore::new();
    let pages = qualifying(&["Main_Page"]);

    for i in 0..10 {
        let action = evaluate(&mut store, "Main_Page", "wiki", &pages);
        let expected = if i % 2 == 0 {
            PurgeAction::RequestPurgeAndReload
        } else {
            PurgeAction::None
        };
        assert_eq!(action, expected, "load {}", i);
    }
}

#[test]
fn test_purge_sets_and_clear_deletes_flag() {
    let mut store = MemoryStore::new();
    let pages = qualifying(&["Main_Page"]);

    evaluate(&mut store, "Main_Page", "wiki", &pages);
    assert_eq!(store.get("Main_Page-wiki-AP"), Some(json!(true)));

    evaluate(&mut store, "Main_Page", "wiki", &pages);
    assert!(!store.has("Main_Page-wiki-AP"));
}

#[test]
fn test_non_qualifying_page_never_touches_store() {
    let mut store = CountingStore::default();
    let pages = qualifying(&["Main_Page"]);

    for _ in 0..3 {
        assert_eq!(
            evaluate(&mut store, "Other_Page", "wiki", &pages),
            PurgeAction::None
        );
    }
    assert_eq!(store.reads.get(), 0);
    assert_eq!(store.writes, 0);
}

#[test]
fn test_unavailable_store_never_purges() {
    let mut store = MemoryStore::unavailable();
    let pages = qualifying(&["Main_Page"]);

    for _ in 0..4 {
        assert_eq!(
            evaluate(&mut store, "Main_Page", "wiki", &pages),
            PurgeAction::None
        );
    }
}

#[test]
fn test_corrupt_flag_value_counts_as_pending() {
    let mut store = MemoryStore::new();
    store.set("Main_Page-wiki-AP", json!("garbage"));
    let pages = qualifying(&["Main_Page"]);

    assert_eq!(
        evaluate(&mut store, "Main_Page", "wiki", &pages),
        PurgeAction::None
    );
    assert!(!store.has("Main_Page-wiki-AP"));
}

#[test]
fn test_flags_are_per_site() {
    let mut store = MemoryStore::new();
    let pages = qualifying(&["Main_Page"]);

    assert_eq!(
        evaluate(&mut store, "Main_Page", "alpha", &pages),
        PurgeAction::RequestPurgeAndReload
    );
    assert_eq!(
        evaluate(&mut store, "Main_Page", "beta", &pages),
        PurgeAction::RequestPurgeAndReload
    );
}

#[test]
fn test_clearing_store_restarts_cycle() {
    let mut store = MemoryStore::new();
    let pages = qualifying(&["Main_Page"]);

    evaluate(&mut store, "Main_Page", "wiki", &pages);
    store.clear();
    assert_eq!(
        evaluate(&mut store, "Main_Page", "wiki", &pages),
        PurgeAction::RequestPurgeAndReload
    );
}

#[test]
fn test_unsaved_flag_never_purges() {
    let mut store = ReadOnlyStore::default();
    let pages = qualifying(&["Main_Page"]);

    for _ in 0..3 {
        assert_eq!(
            evaluate(&mut store, "Main_Page", "wiki", &pages),
            PurgeAction::None
        );
    }
}

#[test]
#[cfg(target_os = "linux")]
fn test_unwritable_file_store_never_purges() {
    let pages = qualifying(&["Main_Page"]);

    // Each load opens the store afresh, as separate CLI runs do
    for _ in 0..3 {
        let mut store = FileStore::open("/proc/wiki-widgets-flags.json");
        assert_eq!(
            evaluate(&mut store, "Main_Page", "wiki", &pages),
            PurgeAction::None
        );
        assert!(!store.is_available());
    }
}

#[tokio::test]
async fn test_unsaved_flag_sends_no_purge() {
    let mut auto = AutoPurge::new(
        ReadOnlyStore::default(),
        ScriptedApi::new(Reply::Purged),
        qualifying(&["Main_Page"]),
    );
    let mut page = DetachedPage::new(PageContext::new("Main_Page", "wiki"));

    let loads = auto.run(&mut page).await.unwrap();

    assert_eq!(loads, vec![LoadOutcome::Idle]);
    assert!(auto.api().calls().is_empty());
    assert_eq!(page.reloads(), 0);
}

#[tokio::test]
async fn test_visit_stops_after_two_loads_when_flag_is_wiped() {
    let store = SharedStore::default();
    let mut auto = AutoPurge::new(
        store.clone(),
        ScriptedApi::new(Reply::Purged),
        qualifying(&["Main_Page"]),
    );
    let mut page = WipingPage {
        context: PageContext::new("Main_Page", "wiki"),
        store,
        reloads: 0,
    };

    let loads = auto.run(&mut page).await.unwrap();

    assert_eq!(loads, vec![LoadOutcome::Reloaded, LoadOutcome::Reloaded]);
    assert_eq!(page.reloads, 2);
    assert_eq!(auto.api().calls().len(), 2);
}

#[tokio::test]
async fn test_visit_purges_once_and_terminates() {
    let mut auto = AutoPurge::new(
        MemoryStore::new(),
        ScriptedApi::new(Reply::Purged),
        qualifying(&["Main_Page"]),
    );
    let mut page = DetachedPage::new(PageContext::new("Main_Page", "Wiki"));

    let loads = auto.run(&mut page).await.unwrap();

    assert_eq!(loads, vec![LoadOutcome::Reloaded, LoadOutcome::Idle]);
    assert_eq!(page.reloads(), 1);
    assert_eq!(auto.api().calls(), vec!["Main_Page".to_string()]);
    assert!(auto.store().is_empty());
}

#[tokio::test]
async fn test_rejected_purge_does_not_reload_and_keeps_flag() {
    let mut auto = AutoPurge::new(
        MemoryStore::new(),
        ScriptedApi::new(Reply::Rejected),
        qualifying(&["Main_Page"]),
    );
    let mut page = DetachedPage::new(PageContext::new("Main_Page", "wiki"));

    let loads = auto.run(&mut page).await.unwrap();

    assert_eq!(loads, vec![LoadOutcome::Rejected(json!({"code": "ratelimited"}))]);
    assert_eq!(page.reloads(), 0);
    assert!(auto.store().has("Main_Page-wiki-AP"));

    // The next visit clears the flag without purging
    let loads = auto.run(&mut page).await.unwrap();
    assert_eq!(loads, vec![LoadOutcome::Idle]);
    assert_eq!(auto.api().calls().len(), 1);
    assert!(!auto.store().has("Main_Page-wiki-AP"));
}

#[tokio::test]
async fn test_failed_request_does_not_reload() {
    let mut auto = AutoPurge::new(
        MemoryStore::new(),
        ScriptedApi::new(Reply::Broken),
        qualifying(&["Main_Page"]),
    );
    let mut page = DetachedPage::new(PageContext::new("Main_Page", "wiki"));

    let loads = auto.run(&mut page).await.unwrap();

    assert!(matches!(loads.as_slice(), [LoadOutcome::Failed(_)]));
    assert_eq!(page.reloads(), 0);
    assert!(auto.store().has("Main_Page-wiki-AP"));
}

#[tokio::test]
async fn test_non_qualifying_visit_sends_nothing() {
    let mut auto = AutoPurge::new(
        MemoryStore::new(),
        ScriptedApi::new(Reply::Purged),
        qualifying(&["Main_Page"]),
    );
    let mut page = DetachedPage::new(PageContext::new("Sandbox", "wiki"));

    let loads = auto.run(&mut page).await.unwrap();

    assert_eq!(loads, vec![LoadOutcome::Idle]);
    assert!(auto.api().calls().is_empty());
}
