//! Telemetry acquisition from the NGSI-v2 context broker.
//!
//! The broker (FIWARE Orion) exposes the tracked athlete as a single entity
//! whose attributes carry the vitals. This module owns the wire types, the
//! fetch-by-identifier source abstraction, and the normalized [`Reading`]
//! built from each successful fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to every broker fetch. Kept below the minimum refresh
/// interval so slow fetches cannot pile up behind the scheduler.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// One NGSI-v2 attribute wrapper (`{"value": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute<T> {
    pub value: T,
}

/// Raw entity payload as returned by the broker.
///
/// Attribute names match the broker schema. Every attribute is optional:
/// a missing field is substituted with a default (0 for numbers, empty
/// string for the blink token) instead of failing the whole fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTelemetry {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(rename = "TimeInstant", default)]
    pub time_instant: Option<Attribute<String>>,
    #[serde(rename = "batimento", default)]
    pub heart_rate: Option<Attribute<u32>>,
    #[serde(rename = "saturacao", default)]
    pub saturation: Option<Attribute<f64>>,
    #[serde(rename = "piscar", default)]
    pub blink: Option<Attribute<String>>,
}

/// One normalized telemetry snapshot for the tracked athlete.
///
/// Immutable once built; the monitor owns it until it is evicted from the
/// rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Entity identifier of the athlete
    pub subject_id: String,
    /// Entity type tag from the broker
    pub type_tag: String,
    /// Capture instant as reported by the broker (may be empty)
    pub source_instant: String,
    /// When this process received the reading
    pub received_at: DateTime<Utc>,
    /// Heart rate in bpm
    pub heart_rate: u32,
    /// Blood-oxygen saturation in percent
    pub saturation: f64,
    /// Blink indicator token
    pub blink: String,
}

impl Reading {
    /// Normalize a raw broker payload, substituting defaults for any
    /// attribute the broker omitted.
    pub fn from_raw(raw: RawTelemetry) -> Self {
        Self {
            subject_id: raw.id,
            type_tag: raw.entity_type,
            source_instant: raw.time_instant.map(|a| a.value).unwrap_or_default(),
            received_at: Utc::now(),
            heart_rate: raw.heart_rate.map(|a| a.value).unwrap_or(0),
            saturation: raw.saturation.map(|a| a.value).unwrap_or(0.0),
            blink: raw.blink.map(|a| a.value).unwrap_or_default(),
        }
    }
}

/// Telemetry fetch errors. All non-fatal: the monitor surfaces them as a
/// failed refresh and a dropped connectivity flag.
#[derive(Debug)]
pub enum FetchError {
    /// Request exceeded [`FETCH_TIMEOUT`]
    Timeout,
    /// Transport-level failure
    Network(String),
    /// Broker answered with a non-success status
    Status(u16),
    /// Response body did not parse as an entity
    Payload(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "broker fetch timed out"),
            FetchError::Network(msg) => write!(f, "broker network error: {msg}"),
            FetchError::Status(code) => write!(f, "broker returned HTTP {code}"),
            FetchError::Payload(msg) => write!(f, "malformed broker payload: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// A source of current readings for a subject identifier.
///
/// The production implementation is [`OrionSource`]; tests substitute a
/// scripted stub.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch(&self, subject_id: &str) -> Result<RawTelemetry, FetchError>;
}

/// Connection settings for the Orion context broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Base URL of the broker, e.g. `http://20.171.8.213:1026`
    pub base_url: String,
    /// Value of the `fiware-service` header
    pub service: String,
    /// Value of the `fiware-servicepath` header
    pub service_path: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1026".to_string(),
            service: "smart".to_string(),
            service_path: "/".to_string(),
        }
    }
}

impl BrokerConfig {
    /// URL of the v2 entity resource for a subject.
    pub fn entity_url(&self, subject_id: &str) -> String {
        format!("{}/v2/entities/{}", self.base_url.trim_end_matches('/'), subject_id)
    }
}

/// Telemetry source backed by a FIWARE Orion context broker.
pub struct OrionSource {
    config: BrokerConfig,
    client: reqwest::Client,
}

impl OrionSource {
    /// Create a source with a bounded-timeout HTTP client.
    pub fn new(config: BrokerConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl TelemetrySource for OrionSource {
    async fn fetch(&self, subject_id: &str) -> Result<RawTelemetry, FetchError> {
        let response = self
            .client
            .get(self.config.entity_url(subject_id))
            .header("fiware-service", &self.config.service)
            .header("fiware-servicepath", &self.config.service_path)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<RawTelemetry>()
            .await
            .map_err(|e| FetchError::Payload(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_url() {
        let config = BrokerConfig {
            base_url: "http://broker:1026/".to_string(),
            ..BrokerConfig::default()
        };
        assert_eq!(
            config.entity_url("urn:ngsi-ld:Atleta:0001"),
            "http://broker:1026/v2/entities/urn:ngsi-ld:Atleta:0001"
        );
    }

    #[test]
    fn test_raw_telemetry_full_payload() {
        let json = serde_json::json!({
            "id": "urn:ngsi-ld:Atleta:0001",
            "type": "Atleta",
            "TimeInstant": {"value": "2024-05-01T12:00:00.000Z"},
            "batimento": {"value": 118},
            "saturacao": {"value": 97.5},
            "piscar": {"value": "on"}
        });

        let raw: RawTelemetry = serde_json::from_value(json).unwrap();
        let reading = Reading::from_raw(raw);

        assert_eq!(reading.subject_id, "urn:ngsi-ld:Atleta:0001");
        assert_eq!(reading.type_tag, "Atleta");
        assert_eq!(reading.heart_rate, 118);
        assert_eq!(reading.saturation, 97.5);
        assert_eq!(reading.blink, "on");
        assert_eq!(reading.source_instant, "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn test_missing_attributes_take_defaults() {
        let json = serde_json::json!({
            "id": "urn:ngsi-ld:Atleta:0001",
            "type": "Atleta"
        });

        let raw: RawTelemetry = serde_json::from_value(json).unwrap();
        let reading = Reading::from_raw(raw);

        assert_eq!(reading.heart_rate, 0);
        assert_eq!(reading.saturation, 0.0);
        assert_eq!(reading.blink, "");
        assert_eq!(reading.source_instant, "");
    }
}
