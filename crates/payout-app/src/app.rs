//! Application orchestration.

use std::sync::Arc;

use payout_dashboard::{
    render_view, CommissionFetcher, DashboardController, FileSessionStore, ProxyFetcher,
    RangeSelection, Session, SessionContext, ViewState,
};
use payout_proxy::{run_server, ProxyState};
use payout_session::StatementClient;
use payout_upstream::StatementApiClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{AppConfig, Transport};
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn session_context(&self) -> SessionContext {
        SessionContext::new(Arc::new(FileSessionStore::new(
            &self.config.dashboard.session_file,
        )))
    }

    fn statement_client(&self) -> StatementClient {
        StatementClient::new(self.config.upstream.session_config())
    }

    fn fetcher(&self, transport: Transport) -> AppResult<Arc<dyn CommissionFetcher>> {
        let fetcher: Arc<dyn CommissionFetcher> = match transport {
            Transport::Socket => Arc::new(self.statement_client()),
            Transport::Proxy => Arc::new(ProxyFetcher::new(
                &self.config.dashboard.proxy_url,
                self.config.upstream.timeout(),
            )?),
        };
        Ok(fetcher)
    }

    /// Run the proxy until Ctrl-C or `shutdown` is cancelled.
    pub async fn serve(&self, shutdown: CancellationToken) -> AppResult<()> {
        let source = StatementApiClient::with_timeout(
            &self.config.upstream.api_url,
            self.config.upstream.timeout(),
        )?;
        let state = ProxyState::new(Arc::new(source), self.config.proxy.clone());
        info!(
            port = self.config.proxy.port,
            upstream = %self.config.upstream.api_url,
            allowed_origin = %self.config.proxy.allowed_origin,
            "Starting proxy"
        );

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    signal_token.cancel();
                }
                _ = signal_token.cancelled() => {}
            }
        });

        run_server(state, shutdown).await?;
        Ok(())
    }

    /// Verify `raw_token` and store the session.
    pub async fn login(&self, raw_token: &str) -> AppResult<Session> {
        let verifier = self.statement_client();
        let session = self.session_context().login(&verifier, raw_token).await?;
        Ok(session)
    }

    pub fn logout(&self) -> AppResult<()> {
        self.session_context().logout()?;
        Ok(())
    }

    /// Load commissions for `selection` and render the dashboard view.
    /// The returned state tells the caller whether the load succeeded.
    pub async fn report(
        &self,
        selection: RangeSelection,
        transport: Option<Transport>,
    ) -> AppResult<(ViewState, String)> {
        let transport = transport.unwrap_or(self.config.dashboard.transport);
        let mut controller =
            DashboardController::new(self.session_context(), self.fetcher(transport)?);

        let state = controller.load(selection).await?.clone();
        if let ViewState::Error { error, .. } = &state {
            warn!(kind = error.kind.as_str(), "Report failed");
        }
        let text = render_view(&state);
        Ok((state, text))
    }
}
