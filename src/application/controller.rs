use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ReportQuery, ReportSource};
use crate::domain::Report;

use super::DashboardError;

/// Fixed auto-refresh period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Everything the presentation reads. Only the named transitions below
/// mutate it.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    report: Option<Report>,
    loading: bool,
    error: Option<DashboardError>,
    polling: bool,
    in_flight: usize,
    next_seq: u64,
    applied_seq: Option<u64>,
    stale_overwrites: u64,
    updated_at: Option<DateTime<Local>>,
}

impl DashboardState {
    /// Mark a fetch as started and hand out its sequence number.
    pub fn begin_fetch(&mut self) -> u64 {
        self.next_seq += 1;
        self.in_flight += 1;
        self.loading = true;
        self.error = None;
        self.next_seq
    }

    /// Replace the report wholesale. Results apply in resolution order, so
    /// an older fetch resolving late still wins; that case is only counted.
    pub fn set_report(&mut self, seq: u64, report: Report) {
        self.finish(seq);
        self.report = Some(report);
        self.updated_at = Some(Local::now());
    }

    /// Record a failed fetch. The previous report stays in place.
    pub fn set_error(&mut self, seq: u64, error: DashboardError) {
        self.finish(seq);
        self.error = Some(error);
    }

    pub fn set_polling(&mut self, enabled: bool) {
        self.polling = enabled;
    }

    fn finish(&mut self, seq: u64) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = false;
        if let Some(applied) = self.applied_seq {
            if seq < applied {
                self.stale_overwrites += 1;
                warn!(seq, newer = applied, "stale fetch result overwrites a newer one");
            }
        }
        self.applied_seq = Some(seq);
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&DashboardError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn fetches_started(&self) -> u64 {
        self.next_seq
    }

    pub fn applied_seq(&self) -> Option<u64> {
        self.applied_seq
    }

    pub fn stale_overwrites(&self) -> u64 {
        self.stale_overwrites
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }
}

/// What woke the dashboard up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// A fetch resolved and its outcome was applied to the state.
    Applied { seq: u64, ok: bool },
    /// The auto-refresh timer fired and started fetch `seq`.
    PollTick { seq: u64 },
}

struct FetchOutcome {
    seq: u64,
    result: Result<Report, DashboardError>,
}

enum Wake {
    Outcome(FetchOutcome),
    Tick,
}

/// Owns the filters, the state and the polling timer. Fetches run as
/// spawned tasks and report back through a channel; outcomes are applied
/// one at a time from `next_event`, so state is never shared.
///
/// Dropping the dashboard drops its timer; fetches still in flight finish
/// and their results are discarded.
pub struct Dashboard {
    source: Arc<dyn ReportSource>,
    filters: ReportQuery,
    state: DashboardState,
    poller: Option<Interval>,
    mounted: bool,
    outcomes_tx: UnboundedSender<FetchOutcome>,
    outcomes_rx: UnboundedReceiver<FetchOutcome>,
}

impl Dashboard {
    pub fn new(source: Arc<dyn ReportSource>, filters: ReportQuery) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            source,
            filters,
            state: DashboardState::default(),
            poller: None,
            mounted: false,
            outcomes_tx,
            outcomes_rx,
        }
    }

    /// Issue the initial fetch. Only the first call does anything.
    pub fn mount(&mut self) -> Option<u64> {
        if self.mounted {
            return None;
        }
        self.mounted = true;
        Some(self.start_fetch())
    }

    /// Explicit user refresh with the current filters.
    pub fn refresh(&mut self) -> u64 {
        self.start_fetch()
    }

    pub fn filters(&self) -> &ReportQuery {
        &self.filters
    }

    /// Edit one filter. Returns false for unknown names. Never fetches;
    /// while polling, a value that actually changes restarts the timer.
    pub fn update_filter(&mut self, field: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let changed = self.filters.get(field).is_some_and(|current| current != value);
        let known = self.filters.set(field, value);
        if changed && self.poller.is_some() {
            self.arm_poller();
        }
        known
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        if enabled {
            self.arm_poller();
        } else if self.poller.take().is_some() {
            debug!("auto-refresh disarmed");
        }
        self.state.set_polling(enabled);
    }

    pub fn auto_refresh(&self) -> bool {
        self.state.is_polling()
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn report(&self) -> Option<&Report> {
        self.state.report()
    }

    /// Wait for the next fetch outcome or timer tick and apply it.
    pub async fn next_event(&mut self) -> DashboardEvent {
        let wake = tokio::select! {
            Some(outcome) = self.outcomes_rx.recv() => Wake::Outcome(outcome),
            _ = next_tick(self.poller.as_mut()) => Wake::Tick,
        };

        match wake {
            Wake::Outcome(outcome) => {
                let seq = outcome.seq;
                let ok = outcome.result.is_ok();
                self.apply(outcome);
                DashboardEvent::Applied { seq, ok }
            }
            Wake::Tick => {
                debug!("auto-refresh tick");
                DashboardEvent::PollTick {
                    seq: self.start_fetch(),
                }
            }
        }
    }

    /// Apply outcomes until no fetch is in flight. Timer ticks are not
    /// processed while settling.
    pub async fn settle(&mut self) {
        while self.state.in_flight() > 0 {
            match self.outcomes_rx.recv().await {
                Some(outcome) => self.apply(outcome),
                None => break,
            }
        }
    }

    fn start_fetch(&mut self) -> u64 {
        let seq = self.state.begin_fetch();
        let source = Arc::clone(&self.source);
        let query = self.filters.clone();
        let tx = self.outcomes_tx.clone();
        query.warn_malformed();
        debug!(seq, "fetch started");

        tokio::spawn(async move {
            let result = source.fetch(&query).await;
            // a closed channel means the dashboard is gone
            let _ = tx.send(FetchOutcome { seq, result });
        });
        seq
    }

    fn apply(&mut self, outcome: FetchOutcome) {
        let FetchOutcome { seq, result } = outcome;
        match result {
            Ok(report) => {
                info!(seq, "report updated");
                self.state.set_report(seq, report);
            }
            Err(error) => {
                warn!(seq, kind = error.kind(), %error, "fetch failed");
                self.state.set_error(seq, error);
            }
        }
    }

    fn arm_poller(&mut self) {
        // replacing the interval drops the previous one
        let mut interval = interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poller = Some(interval);
        debug!(period_secs = POLL_INTERVAL.as_secs(), "auto-refresh armed");
    }
}

async fn next_tick(poller: Option<&mut Interval>) {
    match poller {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
