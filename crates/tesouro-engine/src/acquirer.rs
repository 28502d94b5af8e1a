//! Scheduled acquisition of bond data.
//!
//! The [`Acquirer`] owns the fetch-normalize-publish cycle: it pulls raw
//! datasets from a [`BondSource`], builds a fresh [`Snapshot`](crate::Snapshot)
//! and swaps it into the [`SnapshotStore`]. Failures are soft: the cycle is
//! logged and dropped, the published snapshot stays as it was.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use tesouro_traits::{BondSource, SourceError};

use crate::gate::ScrapeGate;
use crate::merge::{build_snapshot, SortPriority};
use crate::runtime::Shutdown;
use crate::store::SnapshotStore;

/// Schedule and ordering settings for an [`Acquirer`].
#[derive(Debug, Clone)]
pub struct AcquirerSettings {
    /// Period between scheduled ticks
    pub interval: Duration,
    /// Window in which ticks are allowed to fetch
    pub gate: ScrapeGate,
    /// Listing order for merged datasets
    pub sort_priority: SortPriority,
}

/// Periodically refreshes the published snapshot.
pub struct Acquirer {
    source: Arc<dyn BondSource>,
    store: Arc<SnapshotStore>,
    settings: AcquirerSettings,
}

impl Acquirer {
    /// Create an acquirer publishing into `store`.
    pub fn new(
        source: Arc<dyn BondSource>,
        store: Arc<SnapshotStore>,
        settings: AcquirerSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Run until `shutdown` is triggered.
    ///
    /// The first cycle runs immediately and ignores the gate so a fresh
    /// process has data after one fetch. After that, each tick fetches only
    /// inside the gate. Cycles never overlap; shutdown is observed between
    /// cycles, never in the middle of one.
    pub async fn run(&self, shutdown: Shutdown) {
        if shutdown.is_triggered() {
            info!("Acquirer stopped before first fetch");
            return;
        }

        self.fetch_and_publish().await;
        info!("Initial fetch finished");

        let period = self.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Shutdown wins over a tick that became ready during a long cycle.
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Acquirer stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if self.settings.gate.is_open_now() {
                        debug!("Scheduled fetch started");
                        self.fetch_and_publish().await;
                        debug!("Scheduled fetch finished");
                    } else {
                        debug!("Outside fetch window, skipping tick");
                    }
                }
            }
        }
    }

    /// Run one cycle, logging any failure.
    ///
    /// Returns the published generation, or `None` if the cycle was dropped.
    pub async fn fetch_and_publish(&self) -> Option<u64> {
        match self.refresh().await {
            Ok(generation) => Some(generation),
            Err(e) if e.is_transport() => {
                error!(error = %e, source = %self.source.kind(), "Failed to fetch bond data");
                None
            }
            Err(e) => {
                error!(error = %e, source = %self.source.kind(), "Failed to parse bond data");
                None
            }
        }
    }

    /// Run one cycle, returning the failure instead of logging it.
    pub async fn refresh(&self) -> Result<u64, SourceError> {
        let raw = self.source.fetch().await?;
        let parsed = self.source.parse(raw)?;
        let rows = parsed.row_count();

        let snapshot = build_snapshot(parsed, &self.settings.sort_priority, self.acquired_at());
        let bonds = snapshot.len();
        let generation = self.store.publish(snapshot);

        info!(generation, rows, bonds, "Bond snapshot refreshed");
        Ok(generation)
    }

    /// Wall-clock stamp for sources without a business timestamp.
    fn acquired_at(&self) -> String {
        Utc::now()
            .with_timezone(&self.settings.gate.timezone())
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// The store this acquirer publishes into.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono_tz::America::Sao_Paulo;
    use rust_decimal_macros::dec;
    use tesouro_traits::{
        BondRecord, InvestQuote, ParsedBonds, Rate, RawDatasets, RedeemQuote, SourceKind,
    };

    /// Source that succeeds for the first `successes` fetches, then fails.
    struct ScriptedSource {
        fetches: AtomicUsize,
        successes: usize,
        fail_parse: bool,
    }

    impl ScriptedSource {
        fn healthy() -> Self {
            Self::failing_after(usize::MAX)
        }

        fn failing_after(successes: usize) -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                successes,
                fail_parse: false,
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BondSource for ScriptedSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Json
        }

        async fn fetch(&self) -> Result<RawDatasets, SourceError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if n >= self.successes {
                return Err(SourceError::UnexpectedStatus {
                    status: 503,
                    url: "https://example.test".into(),
                });
            }
            Ok(RawDatasets::Json(Bytes::from(format!("{n}"))))
        }

        fn parse(&self, raw: RawDatasets) -> Result<ParsedBonds, SourceError> {
            if self.fail_parse {
                return Err(SourceError::ParseError("unexpected end of input".into()));
            }
            let RawDatasets::Json(body) = raw else {
                return Err(SourceError::UnexpectedDataset("delimited".into()));
            };
            let n = String::from_utf8_lossy(&body).to_string();
            let mut bond = BondRecord::new("Tesouro Selic 2029");
            bond.investable = true;
            bond.unitary_investment_value = Some(dec!(16000.00));
            Ok(ParsedBonds::Unified {
                bonds: vec![bond],
                business_time: format!("cycle-{n}"),
            })
        }
    }

    /// Source whose fetch outlasts the acquirer interval.
    struct SlowSource {
        inner: ScriptedSource,
        delay: Duration,
    }

    #[async_trait]
    impl BondSource for SlowSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Json
        }

        async fn fetch(&self) -> Result<RawDatasets, SourceError> {
            let raw = self.inner.fetch().await;
            tokio::time::sleep(self.delay).await;
            raw
        }

        fn parse(&self, raw: RawDatasets) -> Result<ParsedBonds, SourceError> {
            self.inner.parse(raw)
        }
    }

    /// Source returning split datasets.
    struct SplitSource;

    #[async_trait]
    impl BondSource for SplitSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Csv
        }

        async fn fetch(&self) -> Result<RawDatasets, SourceError> {
            Ok(RawDatasets::Delimited {
                investable: Bytes::new(),
                redeemable: Bytes::new(),
            })
        }

        fn parse(&self, _raw: RawDatasets) -> Result<ParsedBonds, SourceError> {
            Ok(ParsedBonds::Split {
                invest: vec![InvestQuote {
                    name: "Tesouro Selic 2027".into(),
                    annual_investment_rate: Rate::from("SELIC + 0,05%"),
                    unitary_investment_value: dec!(15000.00),
                    minimum_investment_amount: dec!(150.00),
                    maturity: None,
                }],
                redeem: vec![RedeemQuote {
                    name: "Tesouro Prefixado 2026".into(),
                    annual_redemption_rate: Rate::from("12,00%"),
                    unitary_redemption_value: dec!(900.00),
                    maturity: None,
                }],
            })
        }
    }

    fn settings(gate: ScrapeGate) -> AcquirerSettings {
        AcquirerSettings {
            interval: Duration::from_secs(60),
            gate,
            sort_priority: SortPriority::new(["Tesouro Prefixado", "Tesouro Selic"]),
        }
    }

    fn acquirer(source: Arc<dyn BondSource>, gate: ScrapeGate) -> Acquirer {
        Acquirer::new(source, Arc::new(SnapshotStore::new()), settings(gate))
    }

    fn closed_gate() -> ScrapeGate {
        ScrapeGate::new(Sao_Paulo, 0..=6, 0..0)
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let acquirer = acquirer(Arc::new(ScriptedSource::healthy()), closed_gate());

        assert_eq!(acquirer.fetch_and_publish().await, Some(1));

        let listing = acquirer.store().get_all();
        assert_eq!(listing.bonds.len(), 1);
        assert_eq!(listing.updated_at.as_deref(), Some("cycle-0"));
    }

    #[tokio::test]
    async fn test_stale_on_fetch_failure() {
        let acquirer = acquirer(Arc::new(ScriptedSource::failing_after(1)), closed_gate());

        assert_eq!(acquirer.fetch_and_publish().await, Some(1));
        let before = acquirer.store().get_all();

        assert_eq!(acquirer.fetch_and_publish().await, None);
        assert!(acquirer.refresh().await.unwrap_err().is_transport());

        let after = acquirer.store().get_all();
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after.bonds, before.bonds);
        assert_eq!(acquirer.store().generation(), 1);
        assert!(acquirer.store().get_by_name("tesouro_selic_2029").is_some());
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_store_untouched() {
        let source = ScriptedSource {
            fail_parse: true,
            ..ScriptedSource::healthy()
        };
        let acquirer = acquirer(Arc::new(source), closed_gate());

        assert_eq!(acquirer.fetch_and_publish().await, None);
        assert_eq!(acquirer.store().generation(), 0);
        assert!(acquirer.store().get_all().bonds.is_empty());
    }

    #[tokio::test]
    async fn test_split_source_is_merged_and_stamped() {
        let acquirer = acquirer(Arc::new(SplitSource), closed_gate());
        acquirer.refresh().await.unwrap();

        let listing = acquirer.store().get_all();
        let names: Vec<&str> = listing.bonds.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Tesouro Prefixado 2026", "Tesouro Selic 2027"]);
        assert!(!listing.bonds[0].investable);
        assert!(listing.bonds[1].investable);

        let stamp = listing.updated_at.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
        assert!(stamp.ends_with("-03:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fetches_on_each_open_tick() {
        let source = Arc::new(ScriptedSource::healthy());
        let acquirer = acquirer(source.clone(), ScrapeGate::always_open(Sao_Paulo));
        let shutdown = Shutdown::new();

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { acquirer.run(shutdown).await })
        };

        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown.trigger();
        handle.await.unwrap();

        // initial + ticks at 60s and 120s
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_slow_fetch_starts_no_new_fetch() {
        for _ in 0..20 {
            let source = Arc::new(SlowSource {
                inner: ScriptedSource::healthy(),
                delay: Duration::from_secs(90),
            });
            let acquirer = acquirer(source.clone(), ScrapeGate::always_open(Sao_Paulo));
            let shutdown = Shutdown::new();

            let handle = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { acquirer.run(shutdown).await })
            };

            // initial fetch runs 0..90s, the first tick fetch runs 150..240s
            tokio::time::sleep(Duration::from_secs(200)).await;
            let started = source.inner.fetch_count();
            shutdown.trigger();
            handle.await.unwrap();

            assert_eq!(started, 2);
            assert_eq!(source.inner.fetch_count(), started);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_skips_ticks_outside_gate() {
        let source = Arc::new(ScriptedSource::healthy());
        let acquirer = acquirer(source.clone(), closed_gate());
        let shutdown = Shutdown::new();

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { acquirer.run(shutdown).await })
        };

        tokio::time::sleep(Duration::from_secs(600)).await;
        shutdown.trigger();
        handle.await.unwrap();

        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_already_cancelled() {
        let source = Arc::new(ScriptedSource::healthy());
        let acquirer = acquirer(source.clone(), ScrapeGate::always_open(Sao_Paulo));
        let shutdown = Shutdown::new();
        shutdown.trigger();

        acquirer.run(shutdown).await;
        assert_eq!(source.fetch_count(), 0);
    }
}
