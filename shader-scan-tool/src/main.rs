use anyhow::{Context, Result};
use shader_scan::{RefreshRequest, ScanCache, ScanEvent, ScanOutcome};
use shader_scan_tool::tool_config::{Command, ToolConfig};
use shader_scan_tool::tracing_config::{TracingConfig, initialize_tracing};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Runs one refresh of `paths` to completion.
async fn scan_once(cache: &ScanCache, scope: &str, paths: &[String], category: &str) -> Result<()> {
    let request = RefreshRequest::new(scope, paths.to_vec(), category);

    let Some(handle) = cache.request_refresh(request) else {
        // Nothing else shares this cache, so a refresh can always start.
        anyhow::bail!("a refresh is already running");
    };

    match handle.await.context("Refresh task failed")? {
        ScanOutcome::Fresh => debug!(scope, "Shader directories unchanged"),
        ScanOutcome::Rebuilt {
            items,
            hidden,
            skipped,
        } => {
            info!(scope, items, hidden, skipped, "Shader directories scanned");
            if skipped > 0 {
                warn!(skipped, "Some shaders could not be described");
            }
        }
    }

    Ok(())
}

async fn watch(
    cache: &ScanCache,
    scope: &str,
    paths: &[String],
    category: &str,
    interval: Duration,
) -> Result<()> {
    let mut events = cache.subscribe();
    let mut ticker = tokio::time::interval(interval);
    let mut last_shown: Option<Vec<String>> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let shaders = cache.shaders_in_path(scope, paths, category);
                if last_shown.as_ref() != Some(&shaders) {
                    println!("{}", shaders.join(" "));
                    last_shown = Some(shaders);
                }
            }
            event = events.recv() => {
                match event {
                    Ok(ScanEvent::Updated { scope: updated }) => {
                        debug!(scope = %updated, "Scope rebuilt");
                        // Show the new list without waiting for the next tick
                        ticker.reset_immediately();
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(missed = n, "Scan events lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let tool_config = ToolConfig::new()?;

    initialize_tracing(TracingConfig::default().with_log_level(tool_config.log_level.clone()))?;

    info!(
        paths = ?tool_config.config.scan.paths,
        program = %tool_config.config.extractor.program,
        "Starting shader scan tool"
    );

    let cache = ScanCache::new(
        Handle::current(),
        Arc::new(tool_config.extractor()),
        tool_config.scan_options(),
    );

    let scope = tool_config.scope.as_str();
    let paths = &tool_config.config.scan.paths;

    match &tool_config.command {
        Command::List { category } => {
            scan_once(&cache, scope, paths, category).await?;
            for shader in cache.shaders_in_path(scope, paths, category) {
                println!("{}", shader);
            }
        }
        Command::Categories => {
            scan_once(&cache, scope, paths, "surface").await?;
            for (category, count) in cache.categories(scope) {
                println!("{}\t{}", category, count);
            }
        }
        Command::Watch {
            category,
            interval_ms,
        } => {
            let interval = Duration::from_millis((*interval_ms).max(1));
            watch(&cache, scope, paths, category, interval).await?;
        }
    }

    let stats = cache.refresh_stats();
    debug!(
        started = stats.started,
        dropped = stats.dropped,
        "Refresh statistics"
    );

    Ok(())
}
