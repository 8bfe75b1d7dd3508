//! Gateway implementations for development and testing.
//!
//! The production adapter lives in the `fiber-mikrotik` crate; these stand in
//! where no real device is reachable.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::domain::aggregates::Router;
use crate::ports::outbound::{GatewayAck, GatewayError, PppAccountStatus, RouterControlGateway};

/// Gateway that acknowledges every call without touching a device. Used in
/// development deployments with no router configured.
#[derive(Default)]
pub struct NoopRouterGateway;

impl NoopRouterGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RouterControlGateway for NoopRouterGateway {
    async fn enable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError> {
        info!(router = router.name(), account, "noop gateway: enable");
        Ok(GatewayAck {
            message: format!("{} enabled (noop)", account),
        })
    }

    async fn disable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError> {
        info!(router = router.name(), account, "noop gateway: disable");
        Ok(GatewayAck {
            message: format!("{} disabled (noop)", account),
        })
    }

    async fn check_status(
        &self,
        router: &Router,
        account: &str,
    ) -> Result<PppAccountStatus, GatewayError> {
        info!(router = router.name(), account, "noop gateway: check status");
        Ok(PppAccountStatus {
            found: true,
            disabled: false,
            profile: None,
            service: None,
        })
    }
}

enum GatewayScript {
    Succeed,
    FailAll(String),
    FailAccount { account: String, message: String },
}

/// Scriptable gateway double that counts calls. For testing.
pub struct RecordingGateway {
    script: GatewayScript,
    enable_calls: AtomicUsize,
    disable_calls: AtomicUsize,
}

impl RecordingGateway {
    pub fn succeeding() -> Self {
        Self {
            script: GatewayScript::Succeed,
            enable_calls: AtomicUsize::new(0),
            disable_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: GatewayScript::FailAll(message.into()),
            enable_calls: AtomicUsize::new(0),
            disable_calls: AtomicUsize::new(0),
        }
    }

    /// Fail only calls addressing the given account.
    pub fn failing_for(account: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            script: GatewayScript::FailAccount {
                account: account.into(),
                message: message.into(),
            },
            enable_calls: AtomicUsize::new(0),
            disable_calls: AtomicUsize::new(0),
        }
    }

    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }

    pub fn disable_calls(&self) -> usize {
        self.disable_calls.load(Ordering::SeqCst)
    }

    fn outcome(&self, router: &Router, account: &str, verb: &str) -> Result<GatewayAck, GatewayError> {
        match &self.script {
            GatewayScript::Succeed => Ok(GatewayAck {
                message: format!("{} {}d", account, verb),
            }),
            GatewayScript::FailAll(message) => Err(GatewayError::Unreachable {
                router: router.name().to_string(),
                message: message.clone(),
            }),
            GatewayScript::FailAccount {
                account: target,
                message,
            } => {
                if account == target {
                    Err(GatewayError::Rejected {
                        router: router.name().to_string(),
                        message: message.clone(),
                    })
                } else {
                    Ok(GatewayAck {
                        message: format!("{} {}d", account, verb),
                    })
                }
            }
        }
    }
}

#[async_trait]
impl RouterControlGateway for RecordingGateway {
    async fn enable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(router, account, "enable")
    }

    async fn disable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError> {
        self.disable_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(router, account, "disable")
    }

    async fn check_status(
        &self,
        router: &Router,
        account: &str,
    ) -> Result<PppAccountStatus, GatewayError> {
        match self.outcome(router, account, "check") {
            Ok(_) => Ok(PppAccountStatus {
                found: true,
                disabled: false,
                profile: Some("default".into()),
                service: Some("pppoe".into()),
            }),
            Err(err) => Err(err),
        }
    }
}
