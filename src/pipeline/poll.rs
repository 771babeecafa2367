// src/pipeline/poll.rs

//! The poll cycle controller.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Config;
use crate::services::{ItemExtractor, Notifier, PageSource};
use crate::storage::SeenStore;

/// Inter-cycle delay primitive, injectable so the loop can be tested
/// without wall-clock waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Summary of one completed poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Items extracted from the page
    pub extracted: usize,
    /// Items skipped by the keyword gate
    pub skipped_keyword: usize,
    /// Items already present in the store
    pub already_seen: usize,
    /// Items recorded without notification during seeding
    pub seeded: usize,
    /// Notifications successfully dispatched
    pub notified: usize,
    /// Notification attempts that failed (items are still marked seen)
    pub notify_failures: usize,
}

/// Drives the fetch -> extract -> notify -> persist cycle.
pub struct Watcher {
    source: Box<dyn PageSource>,
    extractor: ItemExtractor,
    notifier: Box<dyn Notifier>,
    store: SeenStore,
    keywords: Vec<String>,
    use_keywords: bool,
    max_items: usize,
    poll_delay: Duration,
    sleeper: Box<dyn Sleeper>,
    seeding: bool,
}

impl Watcher {
    /// Build a watcher. Seed mode is entered only when seeding is enabled
    /// and the store is empty at startup.
    pub fn new(
        config: &Config,
        source: Box<dyn PageSource>,
        notifier: Box<dyn Notifier>,
        store: SeenStore,
    ) -> Result<Self> {
        let seeding = config.seed_existing && store.is_empty()?;
        if seeding {
            log::info!("Store is empty, first cycle will seed without notifying");
        }

        Ok(Self {
            source,
            extractor: ItemExtractor::new(config)?,
            notifier,
            store,
            keywords: config.keywords.clone(),
            use_keywords: config.use_keywords,
            max_items: config.max_items,
            poll_delay: config.poll_delay(),
            sleeper: Box::new(TokioSleeper),
            seeding,
        })
    }

    /// Replace the inter-cycle sleeper (used by tests).
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run one poll cycle.
    ///
    /// The first cycle ends seed mode when it finishes, regardless of
    /// outcome, so a failed seed cycle never silently swallows a second
    /// page-load's worth of notifications.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let seeding = std::mem::take(&mut self.seeding);
        let outcome = self.poll_once(seeding).await;
        if seeding {
            log::info!("Seed cycle finished, new items will be notified from now on");
        }
        outcome
    }

    async fn poll_once(&mut self, seeding: bool) -> Result<CycleReport> {
        let markup = self.source.fetch().await?;
        let items = self.extractor.extract(&markup);

        let mut report = CycleReport {
            extracted: items.len(),
            ..CycleReport::default()
        };

        for item in &items {
            if self.use_keywords && !item.matches_keywords(&self.keywords) {
                report.skipped_keyword += 1;
                continue;
            }
            if self.store.is_seen(item)? {
                report.already_seen += 1;
                continue;
            }
            if seeding {
                self.store.mark_seen(item)?;
                report.seeded += 1;
                continue;
            }

            // At-most-once delivery: the seen-mark proceeds even when the
            // send fails, so a flapping notifier cannot re-alert next cycle.
            match self.notifier.notify(item).await {
                Ok(()) => report.notified += 1,
                Err(error) => {
                    report.notify_failures += 1;
                    log::error!("Notification failed for '{}': {}", item.title, error);
                }
            }
            self.store.mark_seen(item)?;
        }

        self.store.prune_keep_latest(self.max_items)?;
        Ok(report)
    }

    /// Run the poll loop until the process is stopped externally.
    ///
    /// A cycle failure is logged and the loop continues after the sleep;
    /// the daemon never terminates on its own.
    pub async fn run(&mut self) {
        loop {
            match self.run_cycle().await {
                Ok(report) if report.notified > 0 || report.seeded > 0 => log::info!(
                    "Cycle done: {} extracted, {} notified, {} seeded, {} already seen",
                    report.extracted,
                    report.notified,
                    report.seeded,
                    report.already_seen
                ),
                Ok(report) => log::debug!(
                    "Cycle done: {} extracted, nothing new",
                    report.extracted
                ),
                Err(error) => log::error!("Poll cycle failed: {}", error),
            }

            self.sleeper.sleep(self.poll_delay).await;
        }
    }
}
