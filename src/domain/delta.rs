use serde::{Deserialize, Serialize};

use super::{Report, SummaryAggregate};

/// Reform minus current, field by field. Positive means the reform figure
/// is numerically larger; color semantics belong to the presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactDelta {
    pub debitos: f64,
    pub creditos: f64,
    pub resultado: f64,
    pub carga: f64,
}

impl ImpactDelta {
    pub fn between(current: &SummaryAggregate, reform: &SummaryAggregate) -> Self {
        Self {
            debitos: reform.debitos - current.debitos,
            creditos: reform.creditos - current.creditos,
            resultado: reform.resultado - current.resultado,
            carga: reform.carga_tributaria_efetiva - current.carga_tributaria_efetiva,
        }
    }
}

/// Delta for a report; absent unless both summaries are present.
pub fn impact_delta(report: &Report) -> Option<ImpactDelta> {
    match (report.current_summary(), report.reform_summary()) {
        (Some(current), Some(reform)) => Some(ImpactDelta::between(current, reform)),
        _ => None,
    }
}
