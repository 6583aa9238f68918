mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{marked_report, marker_of, sample_report, ScriptedSource};
use reforma::api::ReportQuery;
use reforma::application::{Dashboard, DashboardError, DashboardEvent, POLL_INTERVAL};
use tokio::time::{advance, timeout, Instant};

fn dashboard_with(source: &Arc<ScriptedSource>) -> Dashboard {
    Dashboard::new(source.clone(), ReportQuery::default())
}

#[tokio::test(start_paused = true)]
async fn test_mount_fetches_exactly_once() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    source.push(Ok(sample_report()));
    let mut dashboard = dashboard_with(&source);

    assert_eq!(dashboard.mount(), Some(1));
    assert!(dashboard.state().is_loading());
    assert_eq!(dashboard.mount(), None);
    dashboard.settle().await;

    assert_eq!(source.calls(), 1);
    assert!(!dashboard.state().is_loading());
    assert_eq!(dashboard.report(), Some(&sample_report()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_filter_edits_do_not_fetch() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    assert!(dashboard.update_filter("empresa", "Acme"));
    assert!(dashboard.update_filter("aliquota_cbs", "9"));
    assert!(!dashboard.update_filter("desconhecido", "x"));

    let idle = timeout(Duration::from_secs(120), dashboard.next_event()).await;
    assert!(idle.is_err());
    assert_eq!(source.calls(), 1);

    dashboard.refresh();
    dashboard.settle().await;
    assert_eq!(source.calls(), 2);
    let sent = &source.queries()[1];
    assert_eq!(sent.empresa, "Acme");
    assert_eq!(sent.aliquota_cbs, "9");
    assert_eq!(sent.aliquota_ibs, "18.5");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_http_error_keeps_previous_report() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    source.push(Ok(sample_report()));
    source.push(Err(DashboardError::HttpStatus(500)));
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    dashboard.refresh();
    assert!(dashboard.state().is_loading());
    let event = dashboard.next_event().await;
    assert_eq!(event, DashboardEvent::Applied { seq: 2, ok: false });

    let state = dashboard.state();
    assert_eq!(state.error_message().as_deref(), Some("Erro HTTP 500"));
    assert!(!state.is_loading());
    assert_eq!(state.report(), Some(&sample_report()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_next_fetch_clears_error() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    source.push(Err(DashboardError::HtmlResponse));
    source.push(Ok(sample_report()));
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;
    assert!(dashboard.state().error().is_some());
    assert!(dashboard.report().is_none());

    dashboard.refresh();
    assert!(dashboard.state().error().is_none());
    dashboard.settle().await;
    assert!(dashboard.state().error().is_none());
    assert!(dashboard.report().is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_polling_uses_filters_current_at_tick() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    dashboard.set_auto_refresh(true);
    assert!(dashboard.state().is_polling());
    advance(Duration::from_secs(10)).await;
    dashboard.update_filter("empresa", "Nova");

    let event = timeout(POLL_INTERVAL + Duration::from_secs(1), dashboard.next_event()).await?;
    assert_eq!(event, DashboardEvent::PollTick { seq: 2 });
    dashboard.settle().await;

    assert_eq!(source.calls(), 2);
    assert_eq!(source.queries()[1].empresa, "Nova");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_polling_ticks_every_thirty_seconds() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    let start = Instant::now();
    dashboard.set_auto_refresh(true);
    for expected in 2..=4u64 {
        let event = dashboard.next_event().await;
        assert_eq!(event, DashboardEvent::PollTick { seq: expected });
        dashboard.settle().await;
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= POLL_INTERVAL * 3);
    assert!(elapsed < POLL_INTERVAL * 3 + Duration::from_secs(1));
    assert_eq!(source.calls(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_filter_keeps_timer_phase() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    dashboard.set_auto_refresh(true);
    advance(Duration::from_secs(20)).await;
    assert!(dashboard.update_filter("aliquota_ibs", "18.5"));
    assert!(dashboard.update_filter("empresa", ""));

    // still due at 30s, not 50s
    let event = timeout(Duration::from_secs(11), dashboard.next_event()).await?;
    assert_eq!(event, DashboardEvent::PollTick { seq: 2 });

    // a real change restarts the period
    dashboard.settle().await;
    advance(Duration::from_secs(20)).await;
    assert!(dashboard.update_filter("empresa", "Acme"));
    let idle = timeout(Duration::from_secs(15), dashboard.next_event()).await;
    assert!(idle.is_err());
    let event = dashboard.next_event().await;
    assert_eq!(event, DashboardEvent::PollTick { seq: 3 });
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disabling_polling_stops_fetches() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    dashboard.set_auto_refresh(true);
    advance(Duration::from_secs(20)).await;
    dashboard.set_auto_refresh(false);
    assert!(!dashboard.state().is_polling());

    let idle = timeout(POLL_INTERVAL * 3, dashboard.next_event()).await;
    assert!(idle.is_err());
    assert_eq!(source.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rearming_replaces_previous_timer() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.settle().await;

    let start = Instant::now();
    dashboard.set_auto_refresh(true);
    advance(Duration::from_secs(20)).await;
    dashboard.set_auto_refresh(true);

    // the first timer would have fired at 30s
    let idle = timeout(Duration::from_secs(15), dashboard.next_event()).await;
    assert!(idle.is_err());

    let event = dashboard.next_event().await;
    assert!(matches!(event, DashboardEvent::PollTick { .. }));
    assert!(start.elapsed() >= Duration::from_secs(50));
    dashboard.settle().await;
    assert_eq!(source.calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_late_older_result_overwrites_newer() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    source.push_delayed(Duration::from_secs(10), Ok(marked_report(1.0)));
    source.push_delayed(Duration::from_secs(1), Ok(marked_report(2.0)));
    let mut dashboard = dashboard_with(&source);

    let first = dashboard.mount();
    let second = dashboard.refresh();
    assert_eq!(first, Some(1));
    assert_eq!(second, 2);

    let event = dashboard.next_event().await;
    assert_eq!(event, DashboardEvent::Applied { seq: 2, ok: true });
    assert_eq!(marker_of(dashboard.report().unwrap()), Some(2.0));
    assert!(!dashboard.state().is_loading());
    assert_eq!(dashboard.state().in_flight(), 1);

    dashboard.settle().await;
    assert_eq!(marker_of(dashboard.report().unwrap()), Some(1.0));
    assert_eq!(dashboard.state().applied_seq(), Some(1));
    assert_eq!(dashboard.state().stale_overwrites(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropped_dashboard_issues_no_more_fetches() -> Result<()> {
    let source = Arc::new(ScriptedSource::new());
    source.push_delayed(Duration::from_secs(5), Ok(sample_report()));
    let mut dashboard = dashboard_with(&source);
    dashboard.mount();
    dashboard.set_auto_refresh(true);
    tokio::task::yield_now().await;
    drop(dashboard);

    advance(POLL_INTERVAL * 4).await;
    tokio::task::yield_now().await;
    assert_eq!(source.calls(), 1);
    Ok(())
}
