use log::info;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::Config;
use crate::fault::Fault;

/// One arrival forecast from the Bus Tracker `getpredictions` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Prediction {
    #[serde(rename = "rt", deserialize_with = "lenient_string")]
    pub route: String,
    #[serde(rename = "des", deserialize_with = "lenient_string")]
    pub destination: String,
    #[serde(rename = "rtdir", deserialize_with = "lenient_string")]
    pub direction: String,
    /// "DUE" or whole minutes, as text.
    #[serde(rename = "prdctdn", deserialize_with = "lenient_string")]
    pub countdown: String,
    /// `YYYYMMDD HH:MM`, local to the agency.
    #[serde(rename = "prdtm", deserialize_with = "lenient_opt_string")]
    pub predicted_timestamp: Option<String>,
    #[serde(rename = "stpnm", deserialize_with = "lenient_string")]
    pub stop_name: String,
}

/// Accept strings, numbers and null where the API promises a string.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_text(Value::deserialize(d)?))
}

fn value_to_text(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parsed `bustime-response`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiResponse {
    pub predictions: Vec<Prediction>,
    /// `error[].msg` entries, e.g. "No arrival times".
    pub errors: Vec<String>,
}

/// Build the `getpredictions` request for the configured stop.
pub fn predictions_url(cfg: &Config) -> String {
    format!(
        "http://{}/bustime/api/v3/getpredictions?key={}&stpid={}&rt={}&top={}&format=json",
        cfg.api_host,
        cfg.api_key,
        cfg.stop_id,
        cfg.routes.join(","),
        cfg.max_results
    )
}

/// Coerce the `prd` member into a list: absent → empty, a lone object → one
/// element, an array → its elements, anything else → empty. Array elements
/// that are not records become blank predictions so they sort last.
pub fn normalize_predictions(prd: Option<&Value>) -> Vec<Prediction> {
    match prd {
        Some(Value::Array(items)) => items.iter().map(record).collect(),
        Some(obj @ Value::Object(_)) => vec![record(obj)],
        _ => Vec::new(),
    }
}

fn record(v: &Value) -> Prediction {
    Prediction::deserialize(v).unwrap_or_default()
}

fn error_messages(err: Option<&Value>) -> Vec<String> {
    let msg = |v: &Value| v.get("msg").and_then(Value::as_str).map(str::to_string);
    match err {
        Some(Value::Array(items)) => items.iter().filter_map(msg).collect(),
        Some(obj @ Value::Object(_)) => msg(obj).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Parse a `getpredictions` body. Only malformed JSON is a fault; a missing
/// `bustime-response` is an empty answer.
pub fn parse_predictions(json: &str) -> Result<ApiResponse, Fault> {
    let root: Value = serde_json::from_str(json)?;
    let res = root.get("bustime-response");
    let predictions = normalize_predictions(res.and_then(|r| r.get("prd")));
    let errors = error_messages(res.and_then(|r| r.get("error")));
    for msg in &errors {
        info!("bustime: {}", msg);
    }
    Ok(ApiResponse {
        predictions,
        errors,
    })
}
