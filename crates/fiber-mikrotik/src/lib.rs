//! MikroTik RouterOS Gateway Adapter
//!
//! Implements the router control gateway against the RouterOS v7 REST API:
//! PPP secrets are toggled via the `disabled` flag and any live PPP session
//! of a disabled account is dropped. Devices are addressed by router name;
//! every call is bounded by the configured timeout.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fiber_billing::{GatewayAck, GatewayError, PppAccountStatus, Router, RouterControlGateway};

/// Connection settings for one RouterOS device
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MikrotikDevice {
    /// Router name as stored on the Router entity.
    pub name: String,
    /// REST endpoint, e.g. `https://10.0.0.1`.
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// RouterOS REST gateway
pub struct MikrotikRestGateway {
    client: Client,
    devices: HashMap<String, MikrotikDevice>,
    timeout_secs: u64,
}

impl MikrotikRestGateway {
    /// Build a gateway over the configured devices. `timeout_secs` bounds
    /// every request; a timed-out call is the same failure outcome as an
    /// explicit error.
    pub fn new(devices: Vec<MikrotikDevice>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        let devices = devices
            .into_iter()
            .map(|d| (d.name.to_lowercase(), d))
            .collect();
        Self {
            client,
            devices,
            timeout_secs,
        }
    }

    fn device(&self, router: &Router) -> Result<&MikrotikDevice, GatewayError> {
        self.devices
            .get(&router.name().to_lowercase())
            .ok_or_else(|| GatewayError::Unreachable {
                router: router.name().to_string(),
                message: "no RouterOS device configured under this name".into(),
            })
    }

    fn transport_error(&self, router: &Router, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                router: router.name().to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            GatewayError::Unreachable {
                router: router.name().to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Look up the PPP secret for an account on a device.
    async fn find_secret(
        &self,
        router: &Router,
        device: &MikrotikDevice,
        account: &str,
    ) -> Result<Option<PppSecret>, GatewayError> {
        let url = format!("{}/rest/ppp/secret?name={}", device.base_url, account);
        let response = self
            .client
            .get(&url)
            .basic_auth(&device.username, Some(&device.password))
            .send()
            .await
            .map_err(|e| self.transport_error(router, e))?;

        if !response.status().is_success() {
            return Err(self.rejected(router, response).await);
        }

        let mut secrets: Vec<PppSecret> = response
            .json()
            .await
            .map_err(|e| self.transport_error(router, e))?;
        Ok(if secrets.is_empty() {
            None
        } else {
            Some(secrets.remove(0))
        })
    }

    /// Set the `disabled` flag on a PPP secret.
    async fn set_disabled(
        &self,
        router: &Router,
        device: &MikrotikDevice,
        secret: &PppSecret,
        disabled: bool,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/rest/ppp/secret/{}", device.base_url, secret.id);
        let response = self
            .client
            .patch(&url)
            .basic_auth(&device.username, Some(&device.password))
            .json(&serde_json::json!({ "disabled": if disabled { "true" } else { "false" } }))
            .send()
            .await
            .map_err(|e| self.transport_error(router, e))?;

        if !response.status().is_success() {
            return Err(self.rejected(router, response).await);
        }
        Ok(())
    }

    /// Drop any live PPP session of the account so the disable takes effect
    /// immediately. Best effort: the secret flag is authoritative.
    async fn drop_active_session(&self, router: &Router, device: &MikrotikDevice, account: &str) {
        let url = format!("{}/rest/ppp/active?name={}", device.base_url, account);
        let sessions: Vec<PppActive> = match self
            .client
            .get(&url)
            .basic_auth(&device.username, Some(&device.password))
            .send()
            .await
        {
            Ok(response) => response.json().await.unwrap_or_default(),
            Err(err) => {
                debug!(router = router.name(), error = %err, "active session lookup failed");
                return;
            }
        };

        for session in sessions {
            let url = format!("{}/rest/ppp/active/{}", device.base_url, session.id);
            if let Err(err) = self
                .client
                .delete(&url)
                .basic_auth(&device.username, Some(&device.password))
                .send()
                .await
            {
                warn!(
                    router = router.name(),
                    account,
                    error = %err,
                    "failed to drop active PPP session"
                );
            }
        }
    }

    async fn rejected(&self, router: &Router, response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let detail = response
            .json::<RouterOsError>()
            .await
            .map(|e| e.message())
            .unwrap_or_else(|_| status.to_string());
        GatewayError::Rejected {
            router: router.name().to_string(),
            message: detail,
        }
    }

    async fn require_secret(
        &self,
        router: &Router,
        device: &MikrotikDevice,
        account: &str,
    ) -> Result<PppSecret, GatewayError> {
        self.find_secret(router, device, account)
            .await?
            .ok_or_else(|| GatewayError::Rejected {
                router: router.name().to_string(),
                message: format!("no PPP secret named {}", account),
            })
    }
}

#[async_trait]
impl RouterControlGateway for MikrotikRestGateway {
    async fn enable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError> {
        let device = self.device(router)?;
        let secret = self.require_secret(router, device, account).await?;
        self.set_disabled(router, device, &secret, false).await?;

        info!(router = router.name(), account, "PPP secret enabled");
        Ok(GatewayAck {
            message: format!("{} enabled on {}", account, router.name()),
        })
    }

    async fn disable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError> {
        let device = self.device(router)?;
        let secret = self.require_secret(router, device, account).await?;
        self.set_disabled(router, device, &secret, true).await?;
        self.drop_active_session(router, device, account).await;

        info!(router = router.name(), account, "PPP secret disabled");
        Ok(GatewayAck {
            message: format!("{} disabled on {}", account, router.name()),
        })
    }

    async fn check_status(
        &self,
        router: &Router,
        account: &str,
    ) -> Result<PppAccountStatus, GatewayError> {
        let device = self.device(router)?;
        match self.find_secret(router, device, account).await? {
            Some(secret) => Ok(PppAccountStatus {
                found: true,
                disabled: secret.is_disabled(),
                profile: secret.profile,
                service: secret.service,
            }),
            None => Ok(PppAccountStatus {
                found: false,
                disabled: false,
                profile: None,
                service: None,
            }),
        }
    }
}

// RouterOS REST types

#[derive(Debug, Clone, Deserialize)]
struct PppSecret {
    #[serde(rename = ".id")]
    id: String,
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    disabled: Option<String>,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    service: Option<String>,
}

impl PppSecret {
    /// RouterOS reports booleans as strings, "true"/"yes" depending on
    /// version.
    fn is_disabled(&self) -> bool {
        matches!(self.disabled.as_deref(), Some("true") | Some("yes"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct PppActive {
    #[serde(rename = ".id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct RouterOsError {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RouterOsError {
    fn message(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "request rejected".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_deserializes_routeros_shape() {
        let body = r#"[{
            ".id": "*3",
            "name": "budi@ppp",
            "disabled": "true",
            "profile": "default",
            "service": "pppoe"
        }]"#;
        let secrets: Vec<PppSecret> = serde_json::from_str(body).unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].id, "*3");
        assert!(secrets[0].is_disabled());
        assert_eq!(secrets[0].profile.as_deref(), Some("default"));
    }

    #[test]
    fn test_disabled_flag_variants() {
        for (raw, expected) in [
            (Some("true"), true),
            (Some("yes"), true),
            (Some("false"), false),
            (Some("no"), false),
            (None, false),
        ] {
            let secret = PppSecret {
                id: "*1".into(),
                name: "x".into(),
                disabled: raw.map(String::from),
                profile: None,
                service: None,
            };
            assert_eq!(secret.is_disabled(), expected, "raw={:?}", raw);
        }
    }

    #[test]
    fn test_routeros_error_prefers_detail() {
        let err: RouterOsError =
            serde_json::from_str(r#"{"detail": "no such item", "message": "bad"}"#).unwrap();
        assert_eq!(err.message(), "no such item");

        let err: RouterOsError = serde_json::from_str(r#"{"message": "bad request"}"#).unwrap();
        assert_eq!(err.message(), "bad request");

        let err: RouterOsError = serde_json::from_str("{}").unwrap();
        assert_eq!(err.message(), "request rejected");
    }

    #[tokio::test]
    async fn test_unconfigured_router_is_unreachable() {
        let gateway = MikrotikRestGateway::new(vec![], 5);
        let router = Router::new("mikrotik-core-1", "10.0.0.1");

        let err = gateway.disable(&router, "budi@ppp").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unreachable { .. }));
    }

    #[test]
    fn test_device_lookup_is_case_insensitive() {
        let gateway = MikrotikRestGateway::new(
            vec![MikrotikDevice {
                name: "Mikrotik-Core-1".into(),
                base_url: "https://10.0.0.1".into(),
                username: "api".into(),
                password: "secret".into(),
            }],
            5,
        );
        let router = Router::new("MIKROTIK-CORE-1", "10.0.0.1");
        assert!(gateway.device(&router).is_ok());
    }
}
