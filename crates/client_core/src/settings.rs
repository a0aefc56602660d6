//! Tunables for the consent gate: store key, analytics property and banner copy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::{domain::CONSENT_STORAGE_KEY, error::ConsentError};
use url::Url;

pub const DEFAULT_MEASUREMENT_ID: &str = "G-NDB2TZPVDS";
pub const DEFAULT_SCRIPT_ENDPOINT: &str = "https://www.googletagmanager.com/gtag/js";
/// Matches the banner's CSS transform transition.
pub const DEFAULT_TRANSITION_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentSettings {
    pub storage_key: String,
    pub measurement_id: String,
    pub script_endpoint: String,
    pub anonymize_ip: bool,
    pub transition_ms: u64,
    pub copy: BannerCopy,
}

impl Default for ConsentSettings {
    fn default() -> Self {
        Self {
            storage_key: CONSENT_STORAGE_KEY.into(),
            measurement_id: DEFAULT_MEASUREMENT_ID.into(),
            script_endpoint: DEFAULT_SCRIPT_ENDPOINT.into(),
            anonymize_ip: true,
            transition_ms: DEFAULT_TRANSITION_MS,
            copy: BannerCopy::default(),
        }
    }
}

impl ConsentSettings {
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Loader URL for the configured property, e.g. `.../gtag/js?id=G-XXXX`.
    pub fn script_url(&self) -> Result<Url, ConsentError> {
        let invalid = |message: String| ConsentError::InvalidEndpoint {
            endpoint: self.script_endpoint.clone(),
            message,
        };

        let mut url = Url::parse(&self.script_endpoint).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if self.measurement_id.trim().is_empty() {
            return Err(invalid("measurement id is empty".to_string()));
        }
        url.query_pairs_mut().append_pair("id", &self.measurement_id);
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerCopy {
    pub title: String,
    /// Trusted markup, inserted without escaping.
    pub body_html: String,
    pub note: String,
    pub accept_label: String,
    pub decline_label: String,
}

impl Default for BannerCopy {
    fn default() -> Self {
        Self {
            title: "Website Privacy".into(),
            body_html: "We use cookies to analyze <strong>website traffic</strong>.".into(),
            note: "(The App itself is 100% private and tracks nothing).".into(),
            accept_label: "Accept".into(),
            decline_label: "Decline".into(),
        }
    }
}
