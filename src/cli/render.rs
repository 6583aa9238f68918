use std::io::{self, Write};

use anyhow::Result;

use crate::api::ReportQuery;
use crate::application::{DashboardState, DashboardView, SummaryRow};
use crate::domain::format::{
    format_badge, format_currency, format_delta_percent, format_impact, format_number,
    format_percent, impact_sign, truncate, ValueKind,
};
use crate::domain::products::{FieldKind, Impact, ProductDetail};
use crate::domain::{Side, SummaryAggregate};

const RULE: usize = 72;

pub fn write_dashboard<W: Write>(w: &mut W, view: &DashboardView) -> io::Result<()> {
    writeln!(w, "Dashboard Reforma Tributária")?;
    if let Some(delta) = &view.delta {
        writeln!(
            w,
            "Impacto Carga: {}   Impacto Resultado: {}",
            format_badge(delta.carga, None, Some("pp")),
            format_badge(delta.resultado, Some("R$"), None)
        )?;
        writeln!(w)?;
        writeln!(w, "Impacto da Reforma")?;
        writeln!(w, "{}", "-".repeat(RULE))?;
        let rows = [
            ("Variação Débitos", delta.debitos, ValueKind::Currency),
            ("Variação Créditos", delta.creditos, ValueKind::Currency),
            ("Variação Resultado", delta.resultado, ValueKind::Currency),
            ("Variação Carga", delta.carga, ValueKind::Percent),
        ];
        for (label, value, kind) in rows {
            writeln!(w, "  {:<22} {:>20}", label, format_impact(value, kind))?;
        }
    }

    if let (Some(atual), Some(reforma)) = (&view.atual, &view.reforma) {
        writeln!(w)?;
        write_summaries(w, atual, reforma)?;
    }

    for ranking in &view.rankings {
        writeln!(w)?;
        writeln!(w, "Top {} - {}", ranking.products.len(), ranking.side.title())?;
        writeln!(
            w,
            "{:>4}  {:<18} {:>16} {:>16} {:>16} {:>12}",
            "#", "PRODUTO", "VALOR ATUAL", "VALOR REFORMA", "DIFERENÇA", "IMPACTO"
        )?;
        writeln!(w, "{}", "-".repeat(RULE + 16))?;
        for p in &ranking.products {
            writeln!(
                w,
                "{:>4}  {:<18} {:>16} {:>16} {:>16} {:>12}",
                p.rank,
                p.chart_label,
                format_currency(p.valor_total),
                format_currency(p.total_reforma),
                format_currency(p.dif_total),
                format_delta_percent(p.diff_percent)
            )?;
        }
    }

    if !view.burden.is_empty() {
        writeln!(w)?;
        writeln!(w, "Carga Tributária")?;
        writeln!(w, "{}", "-".repeat(RULE))?;
        for bar in &view.burden {
            writeln!(
                w,
                "  {:<10} Atual {:>9}   Reforma {:>9}   Diferença {}{}",
                bar.side.title(),
                format_percent(bar.atual),
                format_percent(bar.reforma),
                impact_sign(bar.difference()),
                format_percent(bar.difference().abs())
            )?;
        }
    }

    for comparison in &view.comparisons {
        writeln!(w)?;
        writeln!(w, "Comparativo por Tributo - {}", side_label(comparison.side))?;
        writeln!(w, "  {:<16} {:>20} {:>20}", "TRIBUTO", "ATUAL", "REFORMA")?;
        for row in &comparison.rows {
            writeln!(
                w,
                "  {:<16} {:>20} {:>20}",
                truncate(&row.tributo, 16),
                format_currency(row.atual),
                format_currency(row.reforma)
            )?;
        }
    }

    for composition in &view.composition {
        writeln!(w)?;
        writeln!(w, "Composição Tributária - {}", side_label(composition.side))?;
        for slice in &composition.slices {
            writeln!(
                w,
                "  {:<16} {:>20} {:>7.1}%",
                truncate(&slice.name, 16),
                format_currency(slice.value),
                slice.share * 100.0
            )?;
        }
    }

    for summary in &view.side_summaries {
        writeln!(w)?;
        writeln!(w, "{}", summary.title)?;
        for row in &summary.rows {
            writeln!(w, "  {}", summary_row(row))?;
        }
    }

    Ok(())
}

pub fn write_status<W: Write>(
    w: &mut W,
    state: &DashboardState,
    filters: &ReportQuery,
) -> io::Result<()> {
    let updated = state
        .updated_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(
        w,
        "[empresa: {}  período: {} a {}  IBS {}%  CBS {}%  IS {}%]  atualizado: {}  auto: {}{}",
        or_dash(&filters.empresa),
        or_dash(&filters.periodo_inicial),
        or_dash(&filters.periodo_final),
        filters.aliquota_ibs,
        filters.aliquota_cbs,
        filters.aliquota_is,
        updated,
        if state.is_polling() { "on" } else { "off" },
        if state.is_loading() { "  (carregando...)" } else { "" }
    )?;
    if let Some(message) = state.error_message() {
        writeln!(w, "! {}", message)?;
    }
    Ok(())
}

pub fn write_product_detail<W: Write>(w: &mut W, detail: &ProductDetail) -> io::Result<()> {
    let impact = match detail.impact {
        Impact::Neutral => "Sem impacto",
        Impact::Increase => "Aumento",
        Impact::Decrease => "Redução",
    };
    writeln!(w, "Produto: {} ({})", detail.name, detail.side.title())?;
    writeln!(
        w,
        "Diferença: {}{} ({})  {}",
        if detail.dif_total > 0.0 { "+" } else { "" },
        format_currency(detail.dif_total),
        format_delta_percent(detail.diff_percent),
        impact
    )?;

    writeln!(w)?;
    writeln!(w, "  {:<16} {:>20} {:>20}", "", "ATUAL", "REFORMA")?;
    for bar in &detail.bars {
        writeln!(
            w,
            "  {:<16} {:>20} {:>20}",
            bar.name,
            format_currency(bar.atual),
            format_currency(bar.reforma)
        )?;
    }

    if detail.radar_renderable() {
        writeln!(w)?;
        writeln!(w, "Composição por tributo")?;
        for axis in &detail.radar {
            writeln!(
                w,
                "  {:<16} {:>20} {:>20}",
                axis.metric,
                format_currency(axis.atual),
                format_currency(axis.reforma)
            )?;
        }
    }

    if !detail.fields.is_empty() {
        writeln!(w)?;
        writeln!(w, "Detalhes")?;
        for field in &detail.fields {
            let value = match field.kind {
                FieldKind::Percent => format_percent(field.value),
                FieldKind::Currency => format_currency(field.value),
            };
            writeln!(w, "  {:<32} {:>20}", field.label, value)?;
        }
    }
    Ok(())
}

/// Rankings of both sides as CSV. Returns the number of rows written.
pub fn write_rankings_csv<W: Write>(writer: W, view: &DashboardView) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "lado",
        "posicao",
        "produto",
        "valor_total",
        "total_reforma",
        "dif_total",
        "dif_percentual",
    ])?;

    let mut count = 0;
    for ranking in &view.rankings {
        for p in &ranking.products {
            csv_writer.write_record([
                ranking.side.as_str().to_string(),
                p.rank.to_string(),
                p.name.clone(),
                p.valor_total.to_string(),
                p.total_reforma.to_string(),
                p.dif_total.to_string(),
                format!("{:.2}", p.diff_percent),
            ])?;
            count += 1;
        }
    }

    csv_writer.flush()?;
    Ok(count)
}

fn write_summaries<W: Write>(
    w: &mut W,
    atual: &SummaryAggregate,
    reforma: &SummaryAggregate,
) -> io::Result<()> {
    writeln!(w, "  {:<16} {:>20} {:>20}", "", "SISTEMA ATUAL", "REFORMA")?;
    writeln!(w, "{}", "-".repeat(RULE))?;
    let rows = [
        ("Débitos", atual.debitos, reforma.debitos),
        ("Créditos", atual.creditos, reforma.creditos),
        ("Resultado", atual.resultado, reforma.resultado),
    ];
    for (label, a, r) in rows {
        writeln!(
            w,
            "  {:<16} {:>20} {:>20}",
            label,
            format_currency(a),
            format_currency(r)
        )?;
    }
    writeln!(
        w,
        "  {:<16} {:>20} {:>20}",
        "Carga Efetiva",
        format_percent(atual.carga_tributaria_efetiva),
        format_percent(reforma.carga_tributaria_efetiva)
    )
}

fn summary_row(row: &SummaryRow) -> String {
    let value = match row.kind {
        ValueKind::Currency => format_currency(row.value),
        ValueKind::Percent => format_percent(row.value),
        ValueKind::Plain => format_number(row.value),
    };
    let marker = if row.highlight { "*" } else { " " };
    format!("{}{:<20} {:>20}", marker, row.label, value)
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Compras => "Entradas",
        Side::Vendas => "Saídas",
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
