use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Report, Side};

/// One way of deriving a widget input; `None` hands over to the next step.
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&Report, Side) -> Option<T>,
}

/// Ordered list of strategies tried in sequence; the first success wins.
pub struct DerivationChain<T> {
    widget: &'static str,
    steps: Vec<Strategy<T>>,
}

impl<T> DerivationChain<T> {
    pub fn new(widget: &'static str) -> Self {
        Self {
            widget,
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, name: &'static str, run: fn(&Report, Side) -> Option<T>) -> Self {
        self.steps.push(Strategy { name, run });
        self
    }

    pub fn derive(&self, report: &Report, side: Side) -> Option<T> {
        for step in &self.steps {
            if let Some(result) = (step.run)(report, side) {
                debug!(widget = self.widget, %side, strategy = step.name, "derived");
                return Some(result);
            }
        }
        debug!(widget = self.widget, %side, "no data");
        None
    }
}

/// Effective burden, current vs reform, for one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurdenBar {
    pub side: Side,
    pub atual: f64,
    pub reforma: f64,
}

impl BurdenBar {
    pub fn difference(&self) -> f64 {
        self.reforma - self.atual
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonutSlice {
    pub name: String,
    pub value: f64,
    /// Fraction of the donut total in [0, 1]; 0 when the total is 0.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComparison {
    pub tributo: String,
    pub atual: f64,
    pub reforma: f64,
}

/// Fixed composition buckets, in emission order.
pub const COMPOSITION_BUCKETS: [&str; 4] = ["ICMS", "PIS", "COFINS", "IBS/CBS"];

pub fn burden_chain() -> DerivationChain<BurdenBar> {
    DerivationChain::new("burden")
        .then("graficos", burden_from_chart)
        .then("aggregate", burden_from_aggregate)
}

pub fn composition_chain() -> DerivationChain<Vec<DonutSlice>> {
    DerivationChain::new("composition")
        .then("graficos", composition_from_chart)
        .then("products", composition_from_products)
}

pub fn comparison_chain() -> DerivationChain<Vec<TaxComparison>> {
    DerivationChain::new("comparison").then("graficos", comparison_from_chart)
}

pub fn burden_bar(report: &Report, side: Side) -> Option<BurdenBar> {
    burden_chain().derive(report, side)
}

pub fn composition(report: &Report, side: Side) -> Vec<DonutSlice> {
    composition_chain().derive(report, side).unwrap_or_default()
}

pub fn comparison(report: &Report, side: Side) -> Option<Vec<TaxComparison>> {
    comparison_chain().derive(report, side)
}

fn burden_from_chart(report: &Report, side: Side) -> Option<BurdenBar> {
    let chart = report.chart(side.burden_chart())?;
    if !chart.has_data(0) {
        return None;
    }
    Some(BurdenBar {
        side,
        atual: chart.value_at(0, 0),
        reforma: chart.value_at(0, 1),
    })
}

fn burden_from_aggregate(report: &Report, side: Side) -> Option<BurdenBar> {
    let aggregate = report.side(side)?;
    Some(BurdenBar {
        side,
        atual: aggregate.carga_tributaria_atual,
        reforma: aggregate.carga_tributaria_reforma,
    })
}

fn composition_from_chart(report: &Report, side: Side) -> Option<Vec<DonutSlice>> {
    let chart = report.chart(side.composition_chart())?;
    let pairs = chart
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.clone(), chart.value_at(0, i)))
        .collect();
    Some(with_shares(pairs))
}

fn composition_from_products(report: &Report, side: Side) -> Option<Vec<DonutSlice>> {
    let products = report.products(side);
    if products.is_empty() {
        return None;
    }

    let mut totals = [0.0_f64; 4];
    for p in products {
        totals[0] += p.icms.unwrap_or(0.0);
        totals[1] += p.pis.unwrap_or(0.0);
        totals[2] += p.cofins.unwrap_or(0.0);
        totals[3] += p.ibs_cbs.unwrap_or(0.0);
    }

    let pairs = COMPOSITION_BUCKETS
        .iter()
        .zip(totals)
        .filter(|(_, total)| *total > 0.0)
        .map(|(name, total)| (name.to_string(), total))
        .collect();
    Some(with_shares(pairs))
}

fn comparison_from_chart(report: &Report, side: Side) -> Option<Vec<TaxComparison>> {
    let chart = report.chart(side.comparison_chart())?;
    Some(
        chart
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| TaxComparison {
                tributo: label.clone(),
                atual: chart.value_at(0, i),
                reforma: chart.value_at(1, i),
            })
            .collect(),
    )
}

fn with_shares(pairs: Vec<(String, f64)>) -> Vec<DonutSlice> {
    let total: f64 = pairs.iter().map(|(_, v)| v).sum();
    pairs
        .into_iter()
        .map(|(name, value)| DonutSlice {
            name,
            value,
            share: if total == 0.0 { 0.0 } else { value / total },
        })
        .collect()
}
