use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized report payload. Every section is optional; numbers inside a
/// present section are already defaulted, so derivations never deal with
/// missing keys except where presence itself carries meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub resumo: Option<Resumo>,
    pub entradas: Option<SideAggregate>,
    pub saidas: Option<SideAggregate>,
    pub graficos: BTreeMap<String, ChartSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resumo {
    pub apuracao_atual: Option<SummaryAggregate>,
    pub apuracao_reforma: Option<SummaryAggregate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryAggregate {
    pub debitos: f64,
    pub creditos: f64,
    pub resultado: f64,
    pub carga_tributaria_efetiva: f64,
}

/// Purchase (`entradas`) or sale (`saidas`) aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideAggregate {
    pub carga_tributaria_atual: f64,
    pub carga_tributaria_reforma: f64,
    pub compra_bruta: f64,
    pub creditos: f64,
    pub compra_liquida: f64,
    pub creditos_ibs_cbs: f64,
    pub compra_total_reforma: f64,
    pub venda_bruta: f64,
    pub debitos: f64,
    pub venda_liquida: f64,
    pub debitos_ibs_cbs: f64,
    pub venda_total_reforma: f64,
    pub produtos: Vec<ProductLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub name: String,
    pub valor_total: f64,
    pub total_reforma: f64,
    pub dif_total: f64,
    pub icms: Option<f64>,
    pub pis: Option<f64>,
    pub cofins: Option<f64>,
    pub ibs: Option<f64>,
    pub ibs_cbs: Option<f64>,
    pub is: Option<f64>,
    pub creditos: Option<f64>,
    pub debitos: Option<f64>,
    pub creditos_reforma: Option<f64>,
    pub debitos_reforma: Option<f64>,
    /// Every numeric field of the line, in payload order.
    pub numeric_fields: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: Option<String>,
    /// `None` when the payload has no `data` array for this dataset.
    pub data: Option<Vec<f64>>,
}

pub const DEFAULT_PRODUCT_NAME: &str = "Produto";

impl Report {
    /// Normalize a raw API body. A `{ "dados": ... }` envelope is unwrapped
    /// when its payload is truthy; non-object roots yield an empty report.
    pub fn from_payload(body: &Value) -> Self {
        let root = match body.get("dados") {
            Some(dados) if is_truthy(dados) => dados,
            _ => body,
        };
        let Some(root) = root.as_object() else {
            return Self::default();
        };

        Self {
            resumo: root.get("resumo").and_then(Value::as_object).map(Resumo::from_map),
            entradas: root
                .get("entradas")
                .and_then(Value::as_object)
                .map(SideAggregate::from_map),
            saidas: root
                .get("saidas")
                .and_then(Value::as_object)
                .map(SideAggregate::from_map),
            graficos: root
                .get("graficos")
                .and_then(Value::as_object)
                .map(|charts| {
                    charts
                        .iter()
                        .filter_map(|(name, chart)| {
                            chart
                                .as_object()
                                .map(|c| (name.clone(), ChartSeries::from_map(c)))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn chart(&self, name: &str) -> Option<&ChartSeries> {
        self.graficos.get(name)
    }

    pub fn current_summary(&self) -> Option<&SummaryAggregate> {
        self.resumo.as_ref()?.apuracao_atual.as_ref()
    }

    pub fn reform_summary(&self) -> Option<&SummaryAggregate> {
        self.resumo.as_ref()?.apuracao_reforma.as_ref()
    }

    pub fn side(&self, side: Side) -> Option<&SideAggregate> {
        match side {
            Side::Compras => self.entradas.as_ref(),
            Side::Vendas => self.saidas.as_ref(),
        }
    }

    pub fn products(&self, side: Side) -> &[ProductLine] {
        self.side(side).map(|s| s.produtos.as_slice()).unwrap_or(&[])
    }
}

impl Resumo {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            apuracao_atual: object(map, "apuracao_atual").map(SummaryAggregate::from_map),
            apuracao_reforma: object(map, "apuracao_reforma").map(SummaryAggregate::from_map),
        }
    }
}

impl SummaryAggregate {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            debitos: number_or_zero(map, "debitos"),
            creditos: number_or_zero(map, "creditos"),
            resultado: number_or_zero(map, "resultado"),
            carga_tributaria_efetiva: number_or_zero(map, "carga_tributaria_efetiva"),
        }
    }
}

impl SideAggregate {
    fn from_map(map: &Map<String, Value>) -> Self {
        let produtos = map
            .get("produtos")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(ProductLine::from_map)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            carga_tributaria_atual: number_or_zero(map, "carga_tributaria_atual"),
            carga_tributaria_reforma: number_or_zero(map, "carga_tributaria_reforma"),
            compra_bruta: number_or_zero(map, "compra_bruta"),
            creditos: number_or_zero(map, "creditos"),
            compra_liquida: number_or_zero(map, "compra_liquida"),
            creditos_ibs_cbs: number_or_zero(map, "creditos_ibs_cbs"),
            compra_total_reforma: number_or_zero(map, "compra_total_reforma"),
            venda_bruta: number_or_zero(map, "venda_bruta"),
            debitos: number_or_zero(map, "debitos"),
            venda_liquida: number_or_zero(map, "venda_liquida"),
            debitos_ibs_cbs: number_or_zero(map, "debitos_ibs_cbs"),
            venda_total_reforma: number_or_zero(map, "venda_total_reforma"),
            produtos,
        }
    }
}

impl ProductLine {
    fn from_map(map: &Map<String, Value>) -> Self {
        let name = ["descricao", "nome", "produto"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PRODUCT_NAME)
            .to_string();

        let numeric_fields = map
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|n| (key.clone(), n)))
            .collect();

        Self {
            name,
            valor_total: number_or_zero(map, "valor_total"),
            total_reforma: number_or_zero(map, "total_reforma"),
            dif_total: number_or_zero(map, "dif_total"),
            icms: number(map, "icms"),
            pis: number(map, "pis"),
            cofins: number(map, "cofins"),
            ibs: number(map, "ibs"),
            ibs_cbs: number(map, "ibs_cbs"),
            is: number(map, "is"),
            creditos: number(map, "creditos"),
            debitos: number(map, "debitos"),
            creditos_reforma: number(map, "creditos_reforma"),
            debitos_reforma: number(map, "debitos_reforma"),
            numeric_fields,
        }
    }

    /// Builder used by callers that assemble lines by hand.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl ChartSeries {
    fn from_map(map: &Map<String, Value>) -> Self {
        let labels = map
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| labels.iter().map(label_text).collect())
            .unwrap_or_default();
        let datasets = map
            .get("datasets")
            .and_then(Value::as_array)
            .map(|sets| {
                // malformed entries keep their slot so later indices hold
                sets.iter()
                    .map(|set| set.as_object().map(Dataset::from_map).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        Self { labels, datasets }
    }

    /// Value of `dataset` at `index`; anything missing reads as 0.
    pub fn value_at(&self, dataset: usize, index: usize) -> f64 {
        self.datasets
            .get(dataset)
            .and_then(|d| d.data.as_ref())
            .and_then(|data| data.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether `dataset` exists and carries a `data` array.
    pub fn has_data(&self, dataset: usize) -> bool {
        self.datasets
            .get(dataset)
            .is_some_and(|d| d.data.is_some())
    }
}

impl Dataset {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            label: map.get("label").and_then(Value::as_str).map(str::to_string),
            data: map
                .get("data")
                .and_then(Value::as_array)
                .map(|points| points.iter().map(|p| p.as_f64().unwrap_or(0.0)).collect()),
        }
    }
}

/// Purchase or sale side of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Purchases, backed by `entradas`
    Compras,
    /// Sales, backed by `saidas`
    Vendas,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Compras, Side::Vendas];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Compras => "compras",
            Side::Vendas => "vendas",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compras" | "compra" | "entradas" => Some(Side::Compras),
            "vendas" | "venda" | "saidas" => Some(Side::Vendas),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Side::Compras => "Compras",
            Side::Vendas => "Vendas",
        }
    }

    pub fn burden_chart(&self) -> &'static str {
        match self {
            Side::Compras => "carga_tributaria_compras",
            Side::Vendas => "carga_tributaria_vendas",
        }
    }

    pub fn composition_chart(&self) -> &'static str {
        match self {
            Side::Compras => "tributos_entradas",
            Side::Vendas => "tributos_saidas",
        }
    }

    pub fn comparison_chart(&self) -> &'static str {
        match self {
            Side::Compras => "comparativo_entradas",
            Side::Vendas => "comparativo_saidas",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn object<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    map.get(key).and_then(Value::as_object)
}

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

fn number_or_zero(map: &Map<String, Value>, key: &str) -> f64 {
    number(map, key).unwrap_or(0.0)
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
