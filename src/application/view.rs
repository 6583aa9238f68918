use serde::{Deserialize, Serialize};

use crate::domain::charts::{self, BurdenBar, DonutSlice, TaxComparison};
use crate::domain::format::ValueKind;
use crate::domain::products::{self, ProductDetail, RankedProduct, TOP_PRODUCTS};
use crate::domain::{impact_delta, ImpactDelta, Report, Side, SideAggregate, SummaryAggregate};

/// Every widget input derived from one report. Widgets without data are
/// left out rather than filled with zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub delta: Option<ImpactDelta>,
    pub atual: Option<SummaryAggregate>,
    pub reforma: Option<SummaryAggregate>,
    pub burden: Vec<BurdenBar>,
    pub composition: Vec<SideComposition>,
    pub comparisons: Vec<SideComparison>,
    pub rankings: Vec<SideRanking>,
    pub side_summaries: Vec<SideSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideComposition {
    pub side: Side,
    pub slices: Vec<DonutSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideComparison {
    pub side: Side,
    pub rows: Vec<TaxComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideRanking {
    pub side: Side,
    pub products: Vec<RankedProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub side: Side,
    pub title: String,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub value: f64,
    pub kind: ValueKind,
    /// Reform-side figures are emphasized.
    pub highlight: bool,
}

impl DashboardView {
    /// The summary cards need both regimes.
    pub fn has_summaries(&self) -> bool {
        self.atual.is_some() && self.reforma.is_some()
    }

    pub fn ranking(&self, side: Side) -> Option<&SideRanking> {
        self.rankings.iter().find(|r| r.side == side)
    }
}

pub fn build_view(report: &Report) -> DashboardView {
    DashboardView {
        delta: impact_delta(report),
        atual: report.current_summary().copied(),
        reforma: report.reform_summary().copied(),
        burden: Side::ALL
            .iter()
            .filter_map(|side| charts::burden_bar(report, *side))
            .collect(),
        composition: Side::ALL
            .iter()
            .map(|side| SideComposition {
                side: *side,
                slices: charts::composition(report, *side),
            })
            .filter(|c| !c.slices.is_empty())
            .collect(),
        comparisons: Side::ALL
            .iter()
            .filter_map(|side| {
                charts::comparison(report, *side).map(|rows| SideComparison { side: *side, rows })
            })
            .filter(|c| !c.rows.is_empty())
            .collect(),
        rankings: Side::ALL
            .iter()
            .map(|side| SideRanking {
                side: *side,
                products: products::top_products(report.products(*side)),
            })
            .filter(|r| !r.products.is_empty())
            .collect(),
        side_summaries: Side::ALL
            .iter()
            .filter_map(|side| report.side(*side).map(|agg| side_summary(*side, agg)))
            .collect(),
    }
}

/// Detail of the product at 1-based `rank` in the side's top ranking.
pub fn product_detail_at(report: &Report, side: Side, rank: usize) -> Option<ProductDetail> {
    let ranked = products::rank_products(report.products(side), TOP_PRODUCTS);
    let product = ranked.get(rank.checked_sub(1)?)?;
    Some(products::product_detail(product, side))
}

fn side_summary(side: Side, agg: &SideAggregate) -> SideSummary {
    use ValueKind::{Currency, Percent};

    let rows: [(&str, f64, ValueKind, bool); 7] = match side {
        Side::Compras => [
            ("Compra Bruta", agg.compra_bruta, Currency, false),
            ("Créditos", agg.creditos, Currency, false),
            ("Compra Líquida", agg.compra_liquida, Currency, false),
            ("Carga Atual", agg.carga_tributaria_atual, Percent, false),
            ("Créditos IBS/CBS", agg.creditos_ibs_cbs, Currency, true),
            ("Compra Reforma", agg.compra_total_reforma, Currency, true),
            ("Carga Reforma", agg.carga_tributaria_reforma, Percent, true),
        ],
        Side::Vendas => [
            ("Venda Bruta", agg.venda_bruta, Currency, false),
            ("Débitos", agg.debitos, Currency, false),
            ("Venda Líquida", agg.venda_liquida, Currency, false),
            ("Carga Atual", agg.carga_tributaria_atual, Percent, false),
            ("Débitos IBS/CBS", agg.debitos_ibs_cbs, Currency, true),
            ("Venda Reforma", agg.venda_total_reforma, Currency, true),
            ("Carga Reforma", agg.carga_tributaria_reforma, Percent, true),
        ],
    };

    SideSummary {
        side,
        title: match side {
            Side::Compras => "Resumo Entradas (Compras)".to_string(),
            Side::Vendas => "Resumo Saídas (Vendas)".to_string(),
        },
        rows: rows
            .into_iter()
            .map(|(label, value, kind, highlight)| SummaryRow {
                label: label.to_string(),
                value,
                kind,
                highlight,
            })
            .collect(),
    }
}
