use super::{PurgeAction, QualifyingPageSet, evaluate};
use crate::api::{PurgeApi, PurgeOutcome};
use crate::context::PageContext;
use crate::store::PersistedStore;

/// A reload always lands on a set flag, so one visit needs at most two loads
const MAX_LOADS_PER_VISIT: usize = 2;

/// The page auto purge runs against
#[allow(async_fn_in_trait)]
pub trait PageHost {
    type Error: std::error::Error;

    /// Context of the currently loaded page
    async fn context(&mut self) -> Result<PageContext, Self::Error>;

    /// Reloads the current page
    async fn reload(&mut self) -> Result<(), Self::Error>;
}

/// A page with no browser behind it: the context is fixed and reloads are
/// only counted
#[derive(Debug, Clone)]
pub struct DetachedPage {
    context: PageContext,
    reloads: usize,
}

impl DetachedPage {
    pub fn new(context: PageContext) -> Self {
        Self {
            context,
            reloads: 0,
        }
    }

    pub fn reloads(&self) -> usize {
        self.reloads
    }
}

impl PageHost for DetachedPage {
    type Error = std::convert::Infallible;

    async fn context(&mut self) -> Result<PageContext, Self::Error> {
        Ok(self.context.clone())
    }

    async fn reload(&mut self) -> Result<(), Self::Error> {
        self.reloads += 1;
        ::log::debug!("Reload of detached page {} requested", self.context.page_name);
        Ok(())
    }
}

/// What happened on one page load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing to do: not qualifying, flag just cleared, or no storage
    Idle,
    /// Purge succeeded and the page was reloaded
    Reloaded,
    /// The API answered with an error; the flag stays set
    Rejected(serde_json::Value),
    /// The purge request never got an answer; the flag stays set
    Failed(String),
}

/// Ties the debounce flag to the purge API and the page host
pub struct AutoPurge<S, A> {
    store: S,
    api: A,
    qualifying: QualifyingPageSet,
}

impl<S: PersistedStore, A: PurgeApi> AutoPurge<S, A> {
    pub fn new(store: S, api: A, qualifying: QualifyingPageSet) -> Self {
        Self {
            store,
            api,
            qualifying,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Handles one load of `ctx`, reloading `host` only after a successful purge
    pub async fn on_page_load<H: PageHost>(
        &mut self,
        ctx: &PageContext,
        host: &mut H,
    ) -> Result<LoadOutcome, H::Error> {
        let action = evaluate(
            &mut self.store,
            &ctx.page_name,
            &ctx.site_name,
            &self.qualifying,
        );

        if action == PurgeAction::None {
            return Ok(LoadOutcome::Idle);
        }

        match self.api.purge(&ctx.page_name).await {
            Ok(PurgeOutcome::Purged) => {
                ::log::info!("Purged {}, reloading", ctx.page_name);
                host.reload().await?;
                Ok(LoadOutcome::Reloaded)
            }
            Ok(PurgeOutcome::Rejected(error)) => Ok(LoadOutcome::Rejected(error)),
            Err(e) => {
                ::log::warn!("Purge request for {} failed: {}", ctx.page_name, e);
                Ok(LoadOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Runs a whole visit: handles the current load and any reload it causes
    pub async fn run<H: PageHost>(&mut self, host: &mut H) -> Result<Vec<LoadOutcome>, H::Error> {
        let mut loads = Vec::with_capacity(MAX_LOADS_PER_VISIT);

        while loads.len() < MAX_LOADS_PER_VISIT {
            let ctx = host.context().await?;
            let outcome = self.on_page_load(&ctx, host).await?;
            let reloaded = outcome == LoadOutcome::Reloaded;
            loads.push(outcome);
            if !reloaded {
                return Ok(loads);
            }
        }

        ::log::warn!(
            "Page still reloading after {} loads, stopping",
            MAX_LOADS_PER_VISIT
        );
        Ok(loads)
    }
}
