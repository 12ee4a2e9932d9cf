//! Dashboard view state machine.
//!
//! ```text
//!            mount / select / apply / retry
//!   Idle ─────────────────────────────────▶ Loading{id}
//!   Loaded ───────────────────────────────▶ Loading{id'}   (supersedes)
//!   Error  ───────────────────────────────▶ Loading{id'}
//!   Loading{id} ── settle(id, Ok)  ──▶ Loaded
//!   Loading{id} ── settle(id, Err) ──▶ Error
//!   any ── logout / no session ──▶ SignedOut
//! ```
//!
//! Every fetch is tagged with an increasing request id. A response is
//! applied only if its id is the latest one issued, so a slow earlier
//! fetch can never overwrite a newer one.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use payout_core::{CommissionReport, DateWindow, Token};
use payout_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::error::DashboardResult;
use crate::fetcher::{CommissionFetcher, FetchError};
use crate::range::{RangePreset, RangeSelection};
use crate::session::{Session, SessionContext};

/// What the dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// No stored session.
    SignedOut,
    /// Signed in, nothing requested yet.
    Idle,
    Loading {
        request_id: u64,
        selection: RangeSelection,
        window: DateWindow,
    },
    Loaded {
        selection: RangeSelection,
        report: CommissionReport,
    },
    Error {
        selection: RangeSelection,
        error: FetchError,
    },
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// Everything needed to run one fetch outside the controller.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub request_id: u64,
    pub token: Token,
    pub window: DateWindow,
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct DashboardController {
    session: SessionContext,
    fetcher: Arc<dyn CommissionFetcher>,
    state: ViewState,
    /// Selection of the latest fetch; retry reuses it.
    selection: RangeSelection,
    last_request_id: u64,
    today: Clock,
}

impl DashboardController {
    pub fn new(session: SessionContext, fetcher: Arc<dyn CommissionFetcher>) -> Self {
        Self {
            session,
            fetcher,
            state: ViewState::Idle,
            selection: RangeSelection::default(),
            last_request_id: 0,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Override the calendar (tests).
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn selection(&self) -> RangeSelection {
        self.selection
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /// Session currently stored, if any.
    pub fn session(&self) -> DashboardResult<Option<Session>> {
        self.session.current()
    }

    /// Enter `Loading` for `selection` and hand out the ticket to fetch
    /// with. Without a stored session the view goes to `SignedOut` and no
    /// ticket is issued.
    pub fn begin(&mut self, selection: RangeSelection) -> DashboardResult<Option<FetchTicket>> {
        let Some(session) = self.session.current()? else {
            debug!("No stored session");
            self.state = ViewState::SignedOut;
            return Ok(None);
        };

        self.last_request_id += 1;
        let request_id = self.last_request_id;
        let window = selection.window(self.today());
        self.selection = selection;
        self.state = ViewState::Loading {
            request_id,
            selection,
            window,
        };
        debug!(request_id, %window, "Fetch started");

        Ok(Some(FetchTicket {
            request_id,
            token: session.token,
            window,
        }))
    }

    /// Apply the result of fetch `request_id`. Returns false, leaving the
    /// view untouched, when that fetch has been superseded.
    pub fn settle(
        &mut self,
        request_id: u64,
        result: Result<CommissionReport, FetchError>,
    ) -> bool {
        let selection = match &self.state {
            ViewState::Loading {
                request_id: current,
                selection,
                ..
            } if *current == request_id => *selection,
            _ => {
                debug!(request_id, latest = self.last_request_id, "Dropping stale response");
                return false;
            }
        };

        self.state = match result {
            Ok(report) => {
                info!(
                    request_id,
                    count = report.summary.count(),
                    total = %report.summary.total(),
                    "Commissions loaded"
                );
                ViewState::Loaded { selection, report }
            }
            Err(error) => {
                warn!(request_id, kind = error.kind.as_str(), error = %error, "Fetch failed");
                ViewState::Error { selection, error }
            }
        };
        true
    }

    /// Begin, fetch and settle in one go.
    pub async fn load(&mut self, selection: RangeSelection) -> DashboardResult<&ViewState> {
        let Some(ticket) = self.begin(selection)? else {
            return Ok(&self.state);
        };

        let started = Instant::now();
        let result = self.fetcher.fetch(&ticket.token, ticket.window).await;
        Metrics::upstream_latency(
            self.fetcher.transport(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        match &result {
            Ok(report) => {
                Metrics::session_outcome("ok");
                Metrics::commissions_extracted(report.summary.count());
            }
            Err(e) => Metrics::session_outcome(e.kind.as_str()),
        }

        self.settle(ticket.request_id, result);
        Ok(&self.state)
    }

    /// Initial load: the 30-day preset.
    pub async fn mount(&mut self) -> DashboardResult<&ViewState> {
        self.load(RangeSelection::default()).await
    }

    pub async fn select_preset(&mut self, preset: RangePreset) -> DashboardResult<&ViewState> {
        self.load(RangeSelection::Preset(preset)).await
    }

    /// Submit a custom range. An invalid range is rejected before any
    /// state change.
    pub async fn apply_custom(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DashboardResult<&ViewState> {
        let selection = RangeSelection::custom(start, end, self.today())?;
        self.load(selection).await
    }

    /// Re-run the latest selection.
    pub async fn retry(&mut self) -> DashboardResult<&ViewState> {
        self.load(self.selection).await
    }

    /// Clear the stored session. Any fetch still in flight is dropped
    /// when it settles.
    pub fn logout(&mut self) -> DashboardResult<()> {
        self.session.logout()?;
        self.last_request_id += 1;
        self.state = ViewState::SignedOut;
        Ok(())
    }
}
