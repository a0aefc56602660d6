use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A call to the analytics dispatch function (`gtag(...)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GtagCommand {
    /// Initialization event stamped with the load time.
    Js { at: DateTime<Utc> },
    Config {
        measurement_id: String,
        params: Map<String, Value>,
    },
}

impl GtagCommand {
    pub fn js(at: DateTime<Utc>) -> Self {
        Self::Js { at }
    }

    pub fn config(measurement_id: impl Into<String>, anonymize_ip: bool) -> Self {
        let mut params = Map::new();
        params.insert("anonymize_ip".to_string(), Value::Bool(anonymize_ip));
        Self::Config {
            measurement_id: measurement_id.into(),
            params,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Js { .. } => "js",
            Self::Config { .. } => "config",
        }
    }

    /// Positional arguments exactly as the dispatch function receives them.
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            Self::Js { at } => vec![
                json!(self.name()),
                json!(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ],
            Self::Config {
                measurement_id,
                params,
            } => vec![
                json!(self.name()),
                json!(measurement_id),
                Value::Object(params.clone()),
            ],
        }
    }
}

/// One entry of the analytics queue: the argument list of one dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataLayerEntry(pub Vec<Value>);

impl DataLayerEntry {
    pub fn command_name(&self) -> Option<&str> {
        self.0.first().and_then(Value::as_str)
    }
}

impl From<&GtagCommand> for DataLayerEntry {
    fn from(command: &GtagCommand) -> Self {
        Self(command.arguments())
    }
}
