//! Incremental Refresh Example
//!
//! Simulates a dashboard panel refreshing every 30 seconds against a
//! synthetic backend and shows how much of each window the cache saves.

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tsq_cache::{CacheConfig, QueryCache, TemplateInterpolator};
use tsq_core::{Field, Frame, QueryRequest, QueryTarget, RawTimeRange, TimeRange};

const STEP_MS: i64 = 15_000;
const HOUR_MS: i64 = 3_600_000;
const REFRESH_MS: i64 = 30_000;
const START_MS: i64 = 1_675_262_550_000;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tsq_cache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Incremental Refresh Example ===\n");

    // Example 1: Auto-refreshing panel
    auto_refresh()?;

    // Example 2: Changing the query invalidates the cache
    query_change()?;

    println!("\n=== All refresh examples completed! ===");
    Ok(())
}

/// Backend stand-in: one sample per step for every label value, inside the range
fn backend(request: &QueryRequest) -> Vec<Frame> {
    let first = (request.range.from + STEP_MS - 1) / STEP_MS * STEP_MS;
    let times: Vec<i64> = (first..=request.range.to).step_by(STEP_MS as usize).collect();

    request
        .targets
        .iter()
        .flat_map(|target| {
            ["200", "500"].into_iter().map(|code| {
                let values = times
                    .iter()
                    .map(|t| ((t / STEP_MS) % 100) as f64 / 10.0)
                    .collect();
                Frame::new(vec![
                    Field::time("Time", times.clone()),
                    Field::number("Value", values).with_label("code", code),
                ])
                .with_name(code)
                .with_ref_id(target.ref_id.clone())
            })
        })
        .collect()
}

fn panel_request(now: i64, expr: &str) -> QueryRequest {
    QueryRequest::new(
        vec![QueryTarget::new("A", expr)],
        TimeRange::new(now - HOUR_MS, now, RawTimeRange::new("now-1h", "now")),
        STEP_MS,
    )
    .with_panel("demo", 1)
    .with_interval("15s")
    .with_scoped_var("job", "api")
}

fn refresh(cache: &QueryCache, request: &QueryRequest) -> Result<Vec<Frame>> {
    let info = cache.request_info(request);
    let query = info.request().context("no request to execute")?;
    let fresh = backend(query);

    let fetched: usize = fresh.iter().map(Frame::len).sum();
    let frames = cache.proc_frames(request, &info, fresh)?;
    let returned: usize = frames.iter().map(Frame::len).sum();

    println!(
        "  {} query over {:>5}s: fetched {:>4} rows, returned {:>4} rows",
        if info.partial { "partial" } else { "full   " },
        query.range.span_ms() / 1000,
        fetched,
        returned
    );
    Ok(frames)
}

/// Example 1: Ten refreshes of a one-hour panel
fn auto_refresh() -> Result<()> {
    println!("--- Example 1: Auto Refresh ---\n");

    let config = CacheConfig::default().with_overlap("2m")?;
    println!("Cache created with overlap window {:?}\n", config.overlap_window);
    let cache = QueryCache::new(config).with_interpolator(TemplateInterpolator);

    let mut frames = Vec::new();
    for tick in 0..10 {
        info!(tick, "panel refresh");
        let request = panel_request(START_MS + tick * REFRESH_MS, "rate(http_requests{job=\"$job\"}[5m])");
        frames = refresh(&cache, &request)?;
    }

    if let Some(frame) = frames.first() {
        let batch = frame.to_record_batch()?;
        let tail = batch.slice(batch.num_rows().saturating_sub(3), batch.num_rows().min(3));
        println!("\nLast rows of series {:?}:", frame.name().unwrap_or_default());
        println!("{}", pretty_format_batches(&[tail])?);
    }

    let stats = cache.stats();
    println!("Cache Statistics:");
    println!("  Requests:         {}", stats.requests());
    println!("  Partial requests: {}", stats.partial_requests());
    println!("  Hit rate:         {:.1}%", stats.hit_rate() * 100.0);
    println!("  Span saved:       {:.1}%", stats.span_savings() * 100.0);
    println!("  Series amended:   {}", stats.frames_amended());
    println!("  Entries:          {}", stats.entry_count());

    Ok(())
}

/// Example 2: Editing the expression drops the cached frames
fn query_change() -> Result<()> {
    println!("\n--- Example 2: Query Change ---\n");

    let cache = QueryCache::with_defaults();

    refresh(&cache, &panel_request(START_MS, "up"))?;
    refresh(&cache, &panel_request(START_MS + REFRESH_MS, "up"))?;
    refresh(&cache, &panel_request(START_MS + 2 * REFRESH_MS, "up{job=\"api\"}"))?;

    println!("\n  Invalidations: {}", cache.stats().invalidations());
    Ok(())
}
