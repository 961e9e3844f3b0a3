use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("request body is not a JSON object - {0}")]
    MalformedPayload(String),
    #[error("callConfigJson is missing or not a valid JSON document - {0}")]
    MalformedConfig(String),
    #[error("request context carries no source ip")]
    MissingSourceIp,
    #[error("callConfigJson.iceServers is missing or malformed - {0}")]
    MalformedIceServers(String),
    #[error("report.callEndTime is missing")]
    MissingCallEndTime,
}

/// A call report as posted by the agent's browser. Only the fields the
/// enrichment touches are named; everything else rides along untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundReport {
    pub call_config_json: Option<Value>,
    pub report: Option<Value>,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

/// The connection configuration nested inside `callConfigJson`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallConfig {
    signaling_endpoint: String,
    #[serde(default)]
    ice_servers: Value,
}

#[derive(Debug, Deserialize)]
struct IceServer {
    urls: Vec<String>,
}

/// The document written to the index: the inbound report with
/// `callConfigJson` replaced by the derived connection fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedDocument {
    pub report: Value,
    pub agent_public_ip: String,
    pub signaling_endpoint: String,
    pub ice_servers: String,
    pub timestamp: Value,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

/// Index request body: the document store expects the report under `doc` so
/// the ingest pipeline can route it to the daily index.
#[derive(Debug, Serialize)]
pub struct IndexRecord {
    pub doc: EnrichedDocument,
}

pub fn parse_inbound(body: &str) -> Result<InboundReport, ReportError> {
    serde_json::from_str(body).map_err(|e| ReportError::MalformedPayload(e.to_string()))
}

pub fn enrich(
    inbound: InboundReport,
    source_ip: Option<String>,
) -> Result<EnrichedDocument, ReportError> {
    let config_text = inbound
        .call_config_json
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| ReportError::MalformedConfig("field absent or not a string".to_string()))?;
    let call_config: CallConfig = serde_json::from_str(config_text)
        .map_err(|e| ReportError::MalformedConfig(e.to_string()))?;

    let agent_public_ip = source_ip.ok_or(ReportError::MissingSourceIp)?;

    let ice_servers = join_ice_servers(&call_config.ice_servers)?;

    // TODO: coerce report metrics that arrive as strings into numbers before indexing
    let report = inbound.report.ok_or(ReportError::MissingCallEndTime)?;
    let timestamp = report
        .get("callEndTime")
        .cloned()
        .ok_or(ReportError::MissingCallEndTime)?;

    Ok(EnrichedDocument {
        report,
        agent_public_ip,
        signaling_endpoint: call_config.signaling_endpoint,
        ice_servers,
        timestamp,
        passthrough: inbound.passthrough,
    })
}

// Dashboards key on the exact joined shape: the first URL of each descriptor,
// "?transport=udp" removed as a literal substring rather than by URL parsing,
// entries joined with ", " in config order.
fn join_ice_servers(raw: &Value) -> Result<String, ReportError> {
    if !raw.is_array() {
        return Err(ReportError::MalformedIceServers(
            "not a list".to_string(),
        ));
    }
    let servers: Vec<IceServer> = serde_json::from_value(raw.clone())
        .map_err(|e| ReportError::MalformedIceServers(e.to_string()))?;

    let mut urls = Vec::with_capacity(servers.len());
    for server in &servers {
        let first = server.urls.first().ok_or_else(|| {
            ReportError::MalformedIceServers("descriptor has an empty urls list".to_string())
        })?;
        urls.push(first.replace("?transport=udp", ""));
    }

    Ok(urls.join(", "))
}
