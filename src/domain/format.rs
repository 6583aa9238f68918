use serde::{Deserialize, Serialize};

/// Values whose magnitude is below this threshold are shown as "no impact".
pub const NEUTRAL_THRESHOLD: f64 = 0.01;

/// Format a value as Brazilian reais.
/// Example: 1234.5 -> "R$ 1.234,50", -10.0 -> "-R$ 10,00"
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}R$ {},{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Compact currency for axis ticks and badges.
/// Example: 1_500_000.0 -> "R$ 1.5M", 2500.0 -> "R$ 2.5K", 999.0 -> "R$ 999,00"
pub fn format_currency_short(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        format!("R$ {:.1}M", value / 1_000_000.0)
    } else if value.abs() >= 1_000.0 {
        format!("R$ {:.1}K", value / 1_000.0)
    } else {
        format_currency(value)
    }
}

/// Percentage with two decimals. Example: 12.0 -> "12.00%"
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", positive_zero(value))
}

/// Plain number with pt-BR grouping and at most three decimals.
/// Example: 1234567.891 -> "1.234.567,891", 2.5 -> "2,5"
pub fn format_number(value: f64) -> String {
    let scaled = (value.abs() * 1000.0).round() as u64;
    let sign = if value < 0.0 && scaled > 0 { "-" } else { "" };
    let mut out = format!("{}{}", sign, group_thousands(scaled / 1000));
    let fraction = scaled % 1000;
    if fraction > 0 {
        let digits = format!("{:03}", fraction);
        out.push(',');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// Percent delta of a product, one decimal with an explicit plus sign.
/// Example: 20.0 -> "+20.0%", -3.26 -> "-3.3%", 0.0 -> "Sem impacto"
pub fn format_delta_percent(value: f64) -> String {
    if value.abs() < NEUTRAL_THRESHOLD {
        return "Sem impacto".to_string();
    }
    let sign = if value > 0.0 { "+" } else { "" };
    format!("{}{:.1}%", sign, value)
}

/// How an impact value should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Currency,
    Percent,
    Plain,
}

/// Render an impact value as sign + absolute magnitude.
/// Near-zero values carry no sign at all.
pub fn format_impact(value: f64, kind: ValueKind) -> String {
    let magnitude = match kind {
        ValueKind::Currency => format_currency(value.abs()),
        ValueKind::Percent => format_percent(value.abs()),
        ValueKind::Plain => format!("{:.2}", value.abs()),
    };
    format!("{}{}", impact_sign(value), magnitude)
}

/// Header badge text, e.g. "-2.50 pp" or "+R$ 20.00".
pub fn format_badge(value: f64, prefix: Option<&str>, suffix: Option<&str>) -> String {
    let mut out = impact_sign(value).to_string();
    if let Some(prefix) = prefix {
        out.push_str(prefix);
        out.push(' ');
    }
    out.push_str(&format!("{:.2}", value.abs()));
    if let Some(suffix) = suffix {
        out.push(' ');
        out.push_str(suffix);
    }
    out
}

pub fn impact_sign(value: f64) -> &'static str {
    if value.abs() < NEUTRAL_THRESHOLD {
        ""
    } else if value > 0.0 {
        "+"
    } else {
        "-"
    }
}

/// Truncate to at most `max` characters (not bytes).
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Turn a payload key into a label: "carga_tributaria" -> "Carga Tributaria".
pub fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut at_word_start = true;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn group_thousands(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut groups = Vec::new();
    while n > 0 {
        groups.push(n % 1000);
        n /= 1000;
    }
    let mut out = groups.pop().map(|g| g.to_string()).unwrap_or_default();
    while let Some(g) = groups.pop() {
        out.push_str(&format!(".{:03}", g));
    }
    out
}

fn positive_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}
