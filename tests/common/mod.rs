// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reforma::api::{ReportQuery, ReportSource};
use reforma::application::DashboardError;
use reforma::domain::Report;
use serde_json::{json, Value};

/// Payload shaped like the reporting API's `dados-relatorio` response.
pub fn sample_payload() -> Value {
    json!({
        "dados": {
            "resumo": {
                "apuracao_atual": { "debitos": 100, "creditos": 40, "resultado": 60, "carga_tributaria_efetiva": 12.0 },
                "apuracao_reforma": { "debitos": 90, "creditos": 50, "resultado": 40, "carga_tributaria_efetiva": 9.5 }
            },
            "entradas": {
                "compra_bruta": 5000.0,
                "creditos": 600.0,
                "carga_tributaria_atual": 14.0,
                "carga_tributaria_reforma": 17.5,
                "produtos": [
                    { "id": 1, "descricao": "Farinha de trigo", "valor_total": 1000, "total_reforma": 1200, "dif_total": 200, "icms": 120, "pis": 16.5, "cofins": 76 },
                    { "id": 2, "descricao": "Açúcar cristal", "valor_total": 800, "total_reforma": 780, "dif_total": -20, "icms": 96, "ibs_cbs": 50 },
                    { "id": 3, "nome": "Óleo de soja", "valor_total": 1000, "total_reforma": 1000, "dif_total": 0, "icms": 0 }
                ]
            },
            "saidas": {
                "venda_bruta": 9000.0,
                "debitos": 1500.0,
                "produtos": [
                    { "produto": "Pão francês", "valor_total": 3000, "total_reforma": 3300, "dif_total": 300, "debitos": 540, "ibs_cbs": 810 }
                ]
            },
            "graficos": {
                "carga_tributaria_vendas": { "labels": ["Atual", "Reforma"], "datasets": [{ "data": [16.7, 26.5] }] },
                "comparativo_saidas": {
                    "labels": ["ICMS", "PIS/COFINS", "IBS/CBS"],
                    "datasets": [{ "label": "Atual", "data": [540, 277.5, 0] }, { "label": "Reforma", "data": [0, 0, 810] }]
                }
            }
        }
    })
}

pub fn sample_report() -> Report {
    Report::from_payload(&sample_payload())
}

/// Report distinguishable by its purchase-side burden.
pub fn marked_report(marker: f64) -> Report {
    Report::from_payload(&json!({ "entradas": { "carga_tributaria_atual": marker } }))
}

pub fn marker_of(report: &Report) -> Option<f64> {
    report.entradas.as_ref().map(|e| e.carga_tributaria_atual)
}

pub struct Scripted {
    pub delay: Duration,
    pub result: Result<Report, DashboardError>,
}

/// Report source that replays queued results in call order and records
/// every query it receives. Once the queue is empty it returns an empty
/// report.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Scripted>>,
    queries: Mutex<Vec<ReportQuery>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, result: Result<Report, DashboardError>) {
        self.push_delayed(Duration::ZERO, result);
    }

    pub fn push_delayed(&self, delay: Duration, result: Result<Report, DashboardError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted { delay, result });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<ReportQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSource for ScriptedSource {
    async fn fetch(&self, query: &ReportQuery) -> Result<Report, DashboardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        let next = self.responses.lock().unwrap().pop_front();
        let Scripted { delay, result } = next.unwrap_or(Scripted {
            delay: Duration::ZERO,
            result: Ok(Report::default()),
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
