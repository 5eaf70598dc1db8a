//! Purge debouncing
//!
//! A qualifying page is purged and reloaded on one load, and left alone on
//! the next. The only state is a flag in the persisted store, so the reload
//! triggered by a purge always finds the flag set and stops there.

pub mod driver;

#[cfg(test)]
mod tests;

pub use driver::{AutoPurge, DetachedPage, LoadOutcome, PageHost};

use crate::store::PersistedStore;
use serde_json::Value;
use std::collections::HashSet;

/// Suffix shared by every flag key this module owns
const FLAG_SUFFIX: &str = "AP";

/// Page identifiers auto purge applies to
pub type QualifyingPageSet = HashSet<String>;

/// What the caller should do for the current page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeAction {
    None,
    RequestPurgeAndReload,
}

/// Typed view of a page's persisted flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    /// No flag stored: the next load purges
    Idle,
    /// Flag stored: a purge was just issued, the next load clears it
    Pending,
}

impl FlagState {
    /// Reads the state for `key`; any stored value counts as pending
    pub fn read<S: PersistedStore + ?Sized>(store: &S, key: &str) -> Self {
        if store.has(key) {
            FlagState::Pending
        } else {
            FlagState::Idle
        }
    }

    /// Advances the automaton by one page load
    pub fn transition(self) -> (FlagState, PurgeAction) {
        match self {
            FlagState::Idle => (FlagState::Pending, PurgeAction::RequestPurgeAndReload),
            FlagState::Pending => (FlagState::Idle, PurgeAction::None),
        }
    }

    /// Persists the state for `key`, returning whether it stuck
    pub fn write<S: PersistedStore + ?Sized>(self, store: &mut S, key: &str) -> bool {
        match self {
            FlagState::Pending => store.set(key, Value::Bool(true)),
            FlagState::Idle => store.delete(key),
        }
    }
}

/// Key under which the flag for a page on a site is stored
pub fn flag_key(page_id: &str, site_id: &str) -> String {
    format!("{}-{}-{}", page_id, site_id, FLAG_SUFFIX)
}

/// Decides whether this load of `page_id` should purge.
///
/// Pages outside `qualifying` never touch the store. An unavailable store
/// turns the feature off for this load, and so does a flag that could not
/// be saved.
pub fn evaluate<S: PersistedStore + ?Sized>(
    store: &mut S,
    page_id: &str,
    site_id: &str,
    qualifying: &QualifyingPageSet,
) -> PurgeAction {
    if !qualifying.contains(page_id) {
        return PurgeAction::None;
    }

    let key = flag_key(page_id, site_id);

    if !store.is_available() {
        ::log::debug!("Persisted store unavailable, skipping auto purge for {}", page_id);
        return PurgeAction::None;
    }

    let (next, action) = FlagState::read(store, &key).transition();
    let persisted = next.write(store, &key);

    match next {
        FlagState::Pending if !persisted => {
            ::log::warn!("Flag {} could not be saved, skipping auto purge", key);
            return PurgeAction::None;
        }
        FlagState::Pending => ::log::info!("Flag {} set, requesting purge", key),
        FlagState::Idle => ::log::debug!("Flag {} cleared, page left alone", key),
    }

    action
}
