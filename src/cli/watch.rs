use std::io::{self, Write};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error};

use crate::application::{build_view, product_detail_at, Dashboard, DashboardEvent};
use crate::domain::Side;

use super::render::{write_dashboard, write_product_detail, write_status};

pub const HELP: &str = "comandos: r (atualizar)  p (auto-atualização)  set <campo>=<valor>  \
d <compras|vendas> <posição>  f (filtros)  h (ajuda)  q (sair)";

/// One line typed by the user while watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Refresh,
    TogglePolling,
    Set { field: String, value: String },
    Detail { side: Side, rank: usize },
    Filters,
    Help,
    Quit,
}

impl WatchCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err("comando vazio".to_string());
        };

        match head {
            "r" | "refresh" | "atualizar" => Ok(WatchCommand::Refresh),
            "p" | "poll" | "auto" => Ok(WatchCommand::TogglePolling),
            "f" | "filtros" => Ok(WatchCommand::Filters),
            "h" | "?" | "ajuda" => Ok(WatchCommand::Help),
            "q" | "quit" | "sair" => Ok(WatchCommand::Quit),
            "set" => {
                let rest = line.trim_start()[head.len()..].trim();
                let (field, value) = rest
                    .split_once('=')
                    .ok_or_else(|| "uso: set <campo>=<valor>".to_string())?;
                Ok(WatchCommand::Set {
                    field: field.trim().to_string(),
                    value: value.trim().to_string(),
                })
            }
            "d" | "detalhe" => {
                let side = parts
                    .next()
                    .and_then(Side::from_str)
                    .ok_or_else(|| "uso: d <compras|vendas> <posição>".to_string())?;
                let rank = parts
                    .next()
                    .and_then(|r| r.parse().ok())
                    .ok_or_else(|| "posição inválida".to_string())?;
                Ok(WatchCommand::Detail { side, rank })
            }
            other => Err(format!("comando desconhecido: {}", other)),
        }
    }
}

enum Wake {
    Dashboard(DashboardEvent),
    Line(Option<String>),
    Interrupt,
}

/// Interactive loop: mount, react to fetch outcomes, timer ticks and stdin
/// commands until `q`, end of input without polling, or Ctrl-C.
pub async fn run_watch(mut dashboard: Dashboard, auto_refresh: bool) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    dashboard.mount();
    dashboard.set_auto_refresh(auto_refresh);
    eprintln!("{}", HELP);

    loop {
        let wake = tokio::select! {
            event = dashboard.next_event() => Wake::Dashboard(event),
            line = stdin.next_line(), if stdin_open => Wake::Line(line?),
            _ = &mut ctrl_c => Wake::Interrupt,
        };

        match wake {
            Wake::Dashboard(DashboardEvent::Applied { seq, .. }) => {
                debug!(seq, "redrawing");
                redraw(&dashboard);
            }
            Wake::Dashboard(DashboardEvent::PollTick { seq }) => {
                debug!(seq, "auto-refresh fetch started");
            }
            Wake::Line(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match WatchCommand::parse(&line) {
                    Ok(WatchCommand::Quit) => break,
                    Ok(command) => apply_command(&mut dashboard, command),
                    Err(message) => eprintln!("{}", message),
                }
            }
            Wake::Line(None) => {
                stdin_open = false;
                if !dashboard.auto_refresh() {
                    dashboard.settle().await;
                    redraw(&dashboard);
                    break;
                }
            }
            Wake::Interrupt => break,
        }
    }

    Ok(())
}

fn apply_command(dashboard: &mut Dashboard, command: WatchCommand) {
    match command {
        WatchCommand::Refresh => {
            dashboard.refresh();
        }
        WatchCommand::TogglePolling => {
            let enabled = !dashboard.auto_refresh();
            dashboard.set_auto_refresh(enabled);
            eprintln!(
                "auto-atualização {}",
                if enabled { "ativada (30s)" } else { "desativada" }
            );
        }
        WatchCommand::Set { field, value } => {
            if dashboard.update_filter(&field, value) {
                eprintln!("filtro {} alterado; use r para atualizar", field);
            } else {
                eprintln!("campo desconhecido: {}", field);
            }
        }
        WatchCommand::Detail { side, rank } => {
            let detail = dashboard
                .report()
                .and_then(|report| product_detail_at(report, side, rank));
            match detail {
                Some(detail) => {
                    let mut out = io::stdout().lock();
                    if let Err(e) = write_product_detail(&mut out, &detail) {
                        error!(error = %e, "failed to render product detail");
                    }
                }
                None => eprintln!("nenhum produto na posição {} de {}", rank, side),
            }
        }
        WatchCommand::Filters => {
            let mut out = io::stdout().lock();
            if let Err(e) = write_status(&mut out, dashboard.state(), dashboard.filters()) {
                error!(error = %e, "failed to render status");
            }
        }
        WatchCommand::Help => eprintln!("{}", HELP),
        WatchCommand::Quit => {}
    }
}

/// A failed redraw is logged and the loop keeps going.
fn redraw(dashboard: &Dashboard) {
    let mut out = io::stdout().lock();
    if let Err(e) = draw(&mut out, dashboard) {
        error!(error = %e, "failed to render dashboard");
    }
}

fn draw<W: Write>(out: &mut W, dashboard: &Dashboard) -> io::Result<()> {
    writeln!(out)?;
    write_status(out, dashboard.state(), dashboard.filters())?;
    if let Some(report) = dashboard.report() {
        if !dashboard.state().is_loading() {
            write_dashboard(out, &build_view(report))?;
        }
    }
    out.flush()
}
