use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::DashboardError;

pub const DEFAULT_ALIQUOTA_IBS: &str = "18.5";
pub const DEFAULT_ALIQUOTA_CBS: &str = "8.5";
pub const DEFAULT_ALIQUOTA_IS: &str = "0";

/// The six filters sent with every report request. Values are kept as the
/// user typed them; the API does the parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    pub empresa: String,
    pub periodo_inicial: String,
    pub periodo_final: String,
    pub aliquota_ibs: String,
    pub aliquota_cbs: String,
    pub aliquota_is: String,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            empresa: String::new(),
            periodo_inicial: String::new(),
            periodo_final: String::new(),
            aliquota_ibs: DEFAULT_ALIQUOTA_IBS.to_string(),
            aliquota_cbs: DEFAULT_ALIQUOTA_CBS.to_string(),
            aliquota_is: DEFAULT_ALIQUOTA_IS.to_string(),
        }
    }
}

impl ReportQuery {
    pub const FIELDS: [&'static str; 6] = [
        "empresa",
        "periodo_inicial",
        "periodo_final",
        "aliquota_ibs",
        "aliquota_cbs",
        "aliquota_is",
    ];

    /// Seed filters from query pairs. Unknown keys are ignored and empty
    /// values keep the default.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let value: String = value.into();
            if !value.is_empty() {
                query.set(key.as_ref(), value);
            }
        }
        query
    }

    /// Seed filters from the query string of a dashboard URL.
    pub fn from_dashboard_url(url: &str) -> Result<Self, DashboardError> {
        let parsed =
            Url::parse(url).map_err(|e| DashboardError::InvalidDashboardUrl(format!("{}: {}", url, e)))?;
        Ok(Self::from_pairs(
            parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())),
        ))
    }

    /// Update one filter by its wire name. Returns false for unknown names.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        let slot = match field {
            "empresa" => &mut self.empresa,
            "periodo_inicial" => &mut self.periodo_inicial,
            "periodo_final" => &mut self.periodo_final,
            "aliquota_ibs" => &mut self.aliquota_ibs,
            "aliquota_cbs" => &mut self.aliquota_cbs,
            "aliquota_is" => &mut self.aliquota_is,
            _ => return false,
        };
        *slot = value.into();
        true
    }

    /// Current value of one filter by its wire name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.pairs()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("empresa", self.empresa.as_str()),
            ("periodo_inicial", self.periodo_inicial.as_str()),
            ("periodo_final", self.periodo_final.as_str()),
            ("aliquota_ibs", self.aliquota_ibs.as_str()),
            ("aliquota_cbs", self.aliquota_cbs.as_str()),
            ("aliquota_is", self.aliquota_is.as_str()),
        ]
    }

    /// Periods that are set but not `YYYY-MM`. They are still sent.
    pub fn malformed_periods(&self) -> Vec<&'static str> {
        [
            ("periodo_inicial", self.periodo_inicial.as_str()),
            ("periodo_final", self.periodo_final.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty() && !is_year_month(value))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn warn_malformed(&self) {
        for field in self.malformed_periods() {
            warn!(field, "period is not in YYYY-MM format, sending as-is");
        }
    }
}

fn is_year_month(value: &str) -> bool {
    value.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok()
}
