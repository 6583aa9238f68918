use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::format::{humanize_key, truncate, NEUTRAL_THRESHOLD};
use super::{ProductLine, Side};

pub const TOP_PRODUCTS: usize = 10;
pub const CHART_LABEL_LEN: usize = 18;
/// Fewer axes than this make a radar chart meaningless.
pub const MIN_RADAR_AXES: usize = 3;

/// Field-name fragments that mark identifier-like numeric fields.
const IDENTIFIER_MARKERS: [&str; 3] = ["id", "codigo", "ncm"];
/// Field-name fragments that mark percentage fields.
const PERCENT_MARKERS: [&str; 3] = ["carga", "aliquota", "percentual"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    pub rank: usize,
    pub name: String,
    pub chart_label: String,
    pub valor_total: f64,
    pub total_reforma: f64,
    pub dif_total: f64,
    pub diff_percent: f64,
}

/// Top `limit` products by `valor_total`, descending. Equal values keep
/// their input order.
pub fn rank_products(products: &[ProductLine], limit: usize) -> Vec<&ProductLine> {
    let mut sorted: Vec<&ProductLine> = products.iter().collect();
    sorted.sort_by(|a, b| {
        b.valor_total
            .partial_cmp(&a.valor_total)
            .unwrap_or(Ordering::Equal)
    });
    sorted.truncate(limit);
    sorted
}

pub fn top_products(products: &[ProductLine]) -> Vec<RankedProduct> {
    rank_products(products, TOP_PRODUCTS)
        .into_iter()
        .enumerate()
        .map(|(i, p)| RankedProduct {
            rank: i + 1,
            name: p.name.clone(),
            chart_label: truncate(&p.name, CHART_LABEL_LEN),
            valor_total: p.valor_total,
            total_reforma: p.total_reforma,
            dif_total: p.dif_total,
            diff_percent: diff_percent(p),
        })
        .collect()
}

/// `dif_total` as a percentage of `valor_total`; 0 when there is no base.
pub fn diff_percent(product: &ProductLine) -> f64 {
    if product.valor_total == 0.0 {
        0.0
    } else {
        product.dif_total / product.valor_total * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Neutral,
    Increase,
    Decrease,
}

impl Impact {
    pub fn of(diff: f64) -> Self {
        if diff.abs() < NEUTRAL_THRESHOLD {
            Impact::Neutral
        } else if diff > 0.0 {
            Impact::Increase
        } else {
            Impact::Decrease
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarAxis {
    pub metric: String,
    pub atual: f64,
    pub reforma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailBar {
    pub name: String,
    pub atual: f64,
    pub reforma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Percent,
    Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailField {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub side: Side,
    pub name: String,
    pub dif_total: f64,
    pub diff_percent: f64,
    pub impact: Impact,
    pub radar: Vec<RadarAxis>,
    pub bars: Vec<DetailBar>,
    pub fields: Vec<DetailField>,
}

impl ProductDetail {
    pub fn radar_renderable(&self) -> bool {
        self.radar.len() >= MIN_RADAR_AXES
    }
}

pub fn product_detail(product: &ProductLine, side: Side) -> ProductDetail {
    ProductDetail {
        side,
        name: product.name.clone(),
        dif_total: product.dif_total,
        diff_percent: diff_percent(product),
        impact: Impact::of(product.dif_total),
        radar: radar_axes(product),
        bars: detail_bars(product, side),
        fields: detail_fields(product),
    }
}

/// Legacy taxes only have a current value, reform taxes only a reform one.
pub fn radar_axes(product: &ProductLine) -> Vec<RadarAxis> {
    let mut axes = Vec::new();
    let legacy = [("ICMS", product.icms), ("PIS", product.pis), ("COFINS", product.cofins)];
    for (metric, value) in legacy {
        if let Some(v) = value {
            axes.push(RadarAxis {
                metric: metric.to_string(),
                atual: v,
                reforma: 0.0,
            });
        }
    }
    if product.ibs.is_some() || product.ibs_cbs.is_some() {
        let reforma = product
            .ibs_cbs
            .filter(|v| *v != 0.0)
            .or(product.ibs)
            .unwrap_or(0.0);
        axes.push(RadarAxis {
            metric: "IBS/CBS".to_string(),
            atual: 0.0,
            reforma,
        });
    }
    if let Some(v) = product.is {
        axes.push(RadarAxis {
            metric: "IS".to_string(),
            atual: 0.0,
            reforma: v,
        });
    }
    axes
}

pub fn detail_bars(product: &ProductLine, side: Side) -> Vec<DetailBar> {
    let (total_label, tax_label) = match side {
        Side::Compras => ("Custo Total", "Créditos"),
        Side::Vendas => ("Preço Venda", "Débitos"),
    };
    let mut bars = vec![DetailBar {
        name: total_label.to_string(),
        atual: product.valor_total,
        reforma: product.total_reforma,
    }];
    if product.creditos.is_some() || product.debitos.is_some() {
        bars.push(DetailBar {
            name: tax_label.to_string(),
            atual: product.creditos.or(product.debitos).unwrap_or(0.0),
            reforma: product
                .creditos_reforma
                .or(product.debitos_reforma)
                .or(product.ibs_cbs)
                .unwrap_or(0.0),
        });
    }
    bars
}

pub fn detail_fields(product: &ProductLine) -> Vec<DetailField> {
    product
        .numeric_fields
        .iter()
        .filter(|(key, _)| !IDENTIFIER_MARKERS.iter().any(|m| key.contains(m)))
        .map(|(key, value)| DetailField {
            key: key.clone(),
            label: humanize_key(key),
            value: *value,
            kind: if PERCENT_MARKERS.iter().any(|m| key.contains(m)) {
                FieldKind::Percent
            } else {
                FieldKind::Currency
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format::format_delta_percent;

    fn line(name: &str, valor_total: f64) -> ProductLine {
        ProductLine {
            valor_total,
            ..ProductLine::named(name)
        }
    }

    #[test]
    fn test_ranking_is_descending_and_capped() {
        let products: Vec<_> = (0..15).map(|i| line(&format!("p{}", i), i as f64)).collect();
        let top = top_products(&products);
        assert_eq!(top.len(), TOP_PRODUCTS);
        assert_eq!(top[0].name, "p14");
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[9].name, "p5");
        assert!(top.windows(2).all(|w| w[0].valor_total >= w[1].valor_total));
    }

    #[test]
    fn test_ranking_is_stable() {
        let products = vec![
            line("a", 5.0),
            line("b", 10.0),
            line("c", 5.0),
            line("d", 10.0),
            line("e", 0.0),
        ];
        let names: Vec<_> = rank_products(&products, 10)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_ranking_short_input() {
        let products = vec![line("x", 1.0), line("y", 2.0)];
        assert_eq!(rank_products(&products, TOP_PRODUCTS).len(), 2);
        assert!(rank_products(&[], TOP_PRODUCTS).is_empty());
    }

    #[test]
    fn test_diff_percent_scenario() {
        let product = ProductLine {
            valor_total: 1000.0,
            total_reforma: 1200.0,
            dif_total: 200.0,
            ..ProductLine::named("Produto")
        };
        assert_eq!(diff_percent(&product), 20.0);
        assert_eq!(format_delta_percent(diff_percent(&product)), "+20.0%");
    }

    #[test]
    fn test_diff_percent_without_base() {
        let product = ProductLine {
            dif_total: 50.0,
            ..ProductLine::named("Sem base")
        };
        assert_eq!(diff_percent(&product), 0.0);
        assert_eq!(Impact::of(product.dif_total), Impact::Increase);
        assert_eq!(Impact::of(-0.005), Impact::Neutral);
    }

    #[test]
    fn test_radar_uses_presence_not_value() {
        let product = ProductLine {
            icms: Some(0.0),
            cofins: Some(7.6),
            ibs: Some(3.0),
            ibs_cbs: Some(0.0),
            ..ProductLine::named("p")
        };
        let axes = radar_axes(&product);
        let metrics: Vec<_> = axes.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(metrics, vec!["ICMS", "COFINS", "IBS/CBS"]);
        assert_eq!(axes[1].reforma, 0.0);
        assert_eq!(axes[2].atual, 0.0);
        assert_eq!(axes[2].reforma, 3.0);
    }

    #[test]
    fn test_detail_bars_for_sales() {
        let product = ProductLine {
            valor_total: 100.0,
            total_reforma: 110.0,
            debitos: Some(18.0),
            ibs_cbs: Some(27.0),
            ..ProductLine::named("p")
        };
        let bars = detail_bars(&product, Side::Vendas);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].name, "Preço Venda");
        assert_eq!(bars[1], DetailBar { name: "Débitos".into(), atual: 18.0, reforma: 27.0 });
        assert_eq!(detail_bars(&ProductLine::named("q"), Side::Compras).len(), 1);
    }

    #[test]
    fn test_detail_fields_skip_identifiers() {
        let product = ProductLine {
            numeric_fields: vec![
                ("id".into(), 1.0),
                ("produto_id".into(), 2.0),
                ("codigo_barras".into(), 3.0),
                ("ncm".into(), 4.0),
                ("valor_total".into(), 1000.0),
                ("carga_tributaria".into(), 12.5),
                ("aliquota_icms".into(), 18.0),
            ],
            ..ProductLine::named("p")
        };
        let fields = detail_fields(&product);
        let got: Vec<_> = fields.iter().map(|f| (f.key.as_str(), f.kind)).collect();
        assert_eq!(
            got,
            vec![
                ("valor_total", FieldKind::Currency),
                ("carga_tributaria", FieldKind::Percent),
                ("aliquota_icms", FieldKind::Percent),
            ]
        );
        assert_eq!(fields[1].label, "Carga Tributaria");
    }
}
