//! Client configuration

use std::time::Duration;

/// When proxies enlist their backing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnlistmentPolicy {
    /// Enlist with the transaction in scope on the first forwarded call
    #[default]
    OnFirstCall,
    /// Only `attach_resource` enlists; proxies forward calls untouched
    Explicit,
}

/// Configuration for a transaction client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name used in log output
    pub client_name: String,

    /// Enlistment triggering policy for proxies
    pub enlistment: EnlistmentPolicy,

    /// Sweep on SIGINT, SIGTERM or SIGHUP, then exit the process
    pub install_signal_handler: bool,

    /// Upper bound on the whole shutdown sweep
    pub sweep_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: "txlink-client".to_string(),
            enlistment: EnlistmentPolicy::OnFirstCall,
            install_signal_handler: true,
            sweep_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new config with the given client name
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            ..Default::default()
        }
    }

    /// Set the enlistment policy
    pub fn with_enlistment(mut self, policy: EnlistmentPolicy) -> Self {
        self.enlistment = policy;
        self
    }

    /// Enable or disable the termination signal listener
    pub fn with_signal_handler(mut self, install: bool) -> Self {
        self.install_signal_handler = install;
        self
    }

    /// Set the shutdown sweep timeout
    pub fn with_sweep_timeout(mut self, timeout: Duration) -> Self {
        self.sweep_timeout = timeout;
        self
    }
}
