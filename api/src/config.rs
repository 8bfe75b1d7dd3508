//! Platform Configuration

use serde::{Deserialize, Serialize};

use fiber_mikrotik::MikrotikDevice;

/// Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Listen address
    pub listen_addr: String,
    /// Business timezone offset, whole hours east of UTC
    pub business_offset_hours: i32,
    /// Router gateway call timeout
    pub gateway_timeout_secs: u64,
    /// RouterOS devices, addressed by router name
    pub routers: Vec<MikrotikDevice>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            // Western Indonesia Time.
            business_offset_hours: 7,
            gateway_timeout_secs: 10,
            routers: vec![],
        }
    }
}

impl PlatformConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to file
    pub fn save(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
