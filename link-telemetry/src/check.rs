//! Basic reachability checks: ICMP ping and an HTTP HEAD request

use std::net::IpAddr;
use std::process::{Command, Stdio};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{error, info};

use crate::error::TelemetryError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(3);

/// Results of one round of checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub ping: bool,
    pub http: bool,
}

impl CheckReport {
    pub fn all_ok(&self) -> bool {
        self.ping && self.http
    }
}

pub struct ConnectionChecker {
    ping_ip: IpAddr,
    http_url: Option<String>,
    client: Client,
}

impl ConnectionChecker {
    pub fn new(ping_ip: &str, http_url: Option<&str>) -> Result<Self, TelemetryError> {
        let ping_ip: IpAddr = ping_ip
            .trim()
            .parse()
            .map_err(|_| TelemetryError::InvalidAddress(ping_ip.to_string()))?;
        let http_url = http_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from);
        let client = Client::builder()
            .connect_timeout(HTTP_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        info!(ping_ip = %ping_ip, http_url = http_url.as_deref().unwrap_or(""), "Connection checker ready");
        Ok(Self {
            ping_ip,
            http_url,
            client,
        })
    }

    pub fn ping_ip(&self) -> IpAddr {
        self.ping_ip
    }

    /// Three pings with a 2 second reply timeout each; true if ping exits successfully
    pub fn check_ping(&self) -> bool {
        let status = Command::new("ping")
            .args(["-c", "3", "-W", "2"])
            .arg(self.ping_ip.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                error!(error = %e, "Ping check failed");
                false
            }
        }
    }

    /// HEAD request; true for a 2xx or 3xx status
    pub fn check_http(&self) -> bool {
        let Some(url) = self.http_url.as_deref() else {
            error!("No URL configured for HTTP check");
            return false;
        };

        match self.client.head(url).send() {
            Ok(resp) => {
                let code = resp.status().as_u16();
                (200..400).contains(&code)
            }
            Err(e) => {
                error!(url, error = %e, "HTTP check failed");
                false
            }
        }
    }

    pub fn check_all(&self) -> CheckReport {
        CheckReport {
            ping: self.check_ping(),
            http: self.check_http(),
        }
    }
}
