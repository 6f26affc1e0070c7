//! Operations context for dependency injection

use pinst_config::Config;
use pinst_errors::Error;
use pinst_events::EventSender;
use pinst_net::{FetchConfig, Fetcher, NetClient};
use tokio_util::sync::CancellationToken;

/// Everything an operation needs; built once per command
pub struct OpsCtx {
    /// Effective configuration (file, environment and flags merged)
    pub config: Config,
    /// Shared HTTP client
    pub net: NetClient,
    /// Fetcher using `net` with the configured retry policy
    pub fetcher: Fetcher,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// Cancelled by the caller to stop the running operation; the
    /// operation still returns, after cleaning up
    pub cancel: CancellationToken,
}

/// Builder for the operations context
#[derive(Default)]
pub struct OpsContextBuilder {
    config: Option<Config>,
    net: Option<NetClient>,
    tx: Option<EventSender>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set network client
    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context. Configuration defaults when unset; the network
    /// client is created from defaults when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the event sender is missing or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let tx = self
            .tx
            .ok_or_else(|| Error::internal("event sender is required"))?;
        let config = self.config.unwrap_or_default();
        let net = match self.net {
            Some(net) => net,
            None => NetClient::with_defaults()?,
        };
        let fetcher = Fetcher::new(net.clone(), FetchConfig::from(&config.network));

        Ok(OpsCtx {
            config,
            net,
            fetcher,
            tx,
            cancel: CancellationToken::new(),
        })
    }
}
