//! Signal readings from the router's RCI interface report
//!
//! The router exposes `GET /rci/show/interface`, a JSON object keyed by
//! interface name. The Wi-Fi station entry carries `rssi` and `noise` in dBm.
//! Requests are sent on an already authorised session; the vendor login
//! handshake is not performed here.

use std::time::Duration;

use adaptive_bitrate::SignalReading;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::TelemetryError;

/// Interface entry holding the Wi-Fi station statistics
pub const DEFAULT_INTERFACE: &str = "WifiMaster0/WifiStation0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can produce a signal reading on demand
pub trait SignalSource {
    /// Current reading, or `Ok(None)` when the source has no data this cycle
    fn signal_info(&mut self) -> Result<Option<SignalReading>, TelemetryError>;
}

/// Wi-Fi station statistics as reported by the router
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiStatus {
    pub ssid: Option<String>,
    /// dBm
    pub rssi: Option<i32>,
    /// dBm
    pub noise: Option<i32>,
    /// Mbps
    pub rate: Option<i64>,
}

impl WifiStatus {
    pub fn reading(&self) -> SignalReading {
        SignalReading {
            rssi: self.rssi,
            noise: self.noise,
        }
    }

    /// Link quality percentage derived from RSSI
    pub fn quality(&self) -> Option<u8> {
        self.rssi.map(rssi_to_quality)
    }
}

/// Map RSSI to a 0..=100 quality percentage: -100 dBm is 0%, -50 dBm and above is 100%
pub fn rssi_to_quality(rssi: i32) -> u8 {
    (2 * (rssi as i64 + 100)).clamp(0, 100) as u8
}

/// Extract the named interface's Wi-Fi statistics from an interface report
pub fn parse_interface_report(report: &Value, interface: &str) -> Option<WifiStatus> {
    let entry = report.get(interface)?.as_object()?;
    Some(WifiStatus {
        ssid: entry.get("ssid").and_then(Value::as_str).map(String::from),
        rssi: entry.get("rssi").and_then(as_int).map(|v| v as i32),
        noise: entry.get("noise").and_then(as_int).map(|v| v as i32),
        rate: entry.get("rate").and_then(as_int),
    })
}

/// Numbers sometimes arrive as strings
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads the Wi-Fi station entry from the router over HTTP
pub struct RciSignalSource {
    client: Client,
    base_url: String,
    interface: String,
}

impl RciSignalSource {
    /// `address` is a host or host:port, optionally with an `http://` prefix
    pub fn new(address: &str, interface: &str) -> Result<Self, TelemetryError> {
        let address = address.trim().trim_end_matches('/');
        if address.is_empty() {
            return Err(TelemetryError::InvalidAddress(address.to_string()));
        }
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            interface: interface.to_string(),
        })
    }

    pub fn interface_url(&self) -> String {
        format!("{}/rci/show/interface", self.base_url)
    }

    /// Fetch the full Wi-Fi status of the configured interface
    pub fn wifi_status(&mut self) -> Result<Option<WifiStatus>, TelemetryError> {
        let resp = self.client.get(self.interface_url()).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status));
        }

        let report: Value = resp.json()?;
        let wifi = parse_interface_report(&report, &self.interface);
        match &wifi {
            Some(wifi) => info!(
                interface = %self.interface,
                ssid = wifi.ssid.as_deref().unwrap_or(""),
                rssi = wifi.rssi,
                noise = wifi.noise,
                rate = wifi.rate,
                quality = wifi.quality(),
                "Wi-Fi status"
            ),
            None => warn!(interface = %self.interface, "Wi-Fi information not found"),
        }
        Ok(wifi)
    }
}

impl SignalSource for RciSignalSource {
    fn signal_info(&mut self) -> Result<Option<SignalReading>, TelemetryError> {
        Ok(self.wifi_status()?.map(|wifi| wifi.reading()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_once;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_interface_report() {
        let report = json!({
            "WifiMaster0/WifiStation0": {
                "ssid": "uplink",
                "rssi": -61,
                "noise": "-95",
                "rate": 144
            },
            "GigabitEthernet0": { "link": "up" }
        });

        let wifi = parse_interface_report(&report, DEFAULT_INTERFACE).unwrap();
        assert_eq!(wifi.ssid.as_deref(), Some("uplink"));
        assert_eq!(wifi.reading(), SignalReading::new(-61, -95));
        assert_eq!(wifi.rate, Some(144));
        assert_eq!(wifi.quality(), Some(78));
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let report = json!({ "WifiMaster0/WifiStation0": { "ssid": "uplink" } });
        let wifi = parse_interface_report(&report, DEFAULT_INTERFACE).unwrap();
        assert_eq!(wifi.reading(), SignalReading::default());
        assert_eq!(wifi.quality(), None);
    }

    #[test]
    fn test_missing_interface() {
        let report = json!({ "GigabitEthernet0": {} });
        assert!(parse_interface_report(&report, DEFAULT_INTERFACE).is_none());
        assert!(parse_interface_report(&json!([]), DEFAULT_INTERFACE).is_none());
    }

    #[test]
    fn test_rssi_to_quality() {
        assert_eq!(rssi_to_quality(-100), 0);
        assert_eq!(rssi_to_quality(-120), 0);
        assert_eq!(rssi_to_quality(-75), 50);
        assert_eq!(rssi_to_quality(-50), 100);
        assert_eq!(rssi_to_quality(-20), 100);
    }

    #[test]
    fn test_address_forms() {
        let source = RciSignalSource::new("192.168.1.1", DEFAULT_INTERFACE).unwrap();
        assert_eq!(source.interface_url(), "http://192.168.1.1/rci/show/interface");

        let source = RciSignalSource::new("http://router.lan:8080/", DEFAULT_INTERFACE).unwrap();
        assert_eq!(source.interface_url(), "http://router.lan:8080/rci/show/interface");

        assert!(matches!(
            RciSignalSource::new("  ", DEFAULT_INTERFACE),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_signal_info_over_http() {
        let body = r#"{"WifiMaster0/WifiStation0":{"rssi":-58,"noise":-96}}"#;
        let address = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));

        let mut source = RciSignalSource::new(&address, DEFAULT_INTERFACE).unwrap();
        assert_eq!(source.signal_info().unwrap(), Some(SignalReading::new(-58, -96)));
    }

    #[test]
    fn test_wifi_status_logged_at_info() {
        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let body = r#"{"WifiMaster0/WifiStation0":{"ssid":"field","rssi":-58,"noise":-96}}"#;
        let address = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));

        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut source = RciSignalSource::new(&address, DEFAULT_INTERFACE).unwrap();
            assert!(source.wifi_status().unwrap().is_some());
        });

        let text = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
        let line = text
            .lines()
            .find(|l| l.contains("Wi-Fi status"))
            .expect("status logged at info");
        assert!(line.contains("INFO"));
        assert!(line.contains("rssi=-58"));
    }

    #[test]
    fn test_error_status() {
        let address = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
        );

        let mut source = RciSignalSource::new(&address, DEFAULT_INTERFACE).unwrap();
        assert!(matches!(
            source.signal_info(),
            Err(TelemetryError::Status(s)) if s == reqwest::StatusCode::UNAUTHORIZED
        ));
    }
}
