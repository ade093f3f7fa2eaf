//! Command-level operations behind the CLI surface.
//!
//! Storage failures abort the command in progress; enrichment and insight
//! failures are logged and the operation carries on. A report is either
//! complete for both windows or the command fails outright.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::ValueEnum;
use tracing::warn;

use crate::geoloc::GeoProvider;
use crate::insight::InsightGenerator;
use crate::models::{Location, UNKNOWN_LOCATION};
use crate::report::render::{render_html, render_json, render_plain, PROJECT_URL};
use crate::report::{
    generate_report, DAYS_WINDOW_A, DAYS_WINDOW_B, OLDER_REPORT_OFFSET_DAYS,
};
use crate::storage::SqliteStorage;
use crate::telegraph::PagePublisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Plain,
    Json,
    Telegraph,
}

/// Save a ban action and enrich it with a geolocation.
///
/// The insert is the only fatal step. Afterwards: reuse the cached location
/// if one exists (including "Unknown"); otherwise ask the provider, degrade
/// an error or empty answer to "Unknown", cache the outcome, and back-fill
/// the freshly created ban action. Every enrichment failure is logged and
/// swallowed so the event itself is never lost.
pub async fn save(
    storage: &SqliteStorage,
    geo: Option<&dyn GeoProvider>,
    protocol: &str,
    ip: &str,
) -> Result<()> {
    let id = storage
        .save_ban_action(protocol, ip)
        .await
        .context("failed to save ban action")?;

    let country_name = match storage.lookup_location(ip).await {
        Ok(Some(cached)) => Some(cached.country_name),
        Ok(None) => {
            let fetched = match geo {
                Some(geo) => match geo.fetch_location(ip).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("failed to fetch location for '{ip}': {e:#}");
                        String::new()
                    }
                },
                None => String::new(),
            };
            let fetched = if fetched.is_empty() {
                UNKNOWN_LOCATION.to_string()
            } else {
                fetched
            };

            match storage.save_location(ip, &fetched).await {
                // the canonical cached row wins if another invocation raced us
                Ok(cached) => Some(cached.country_name),
                Err(e) => {
                    warn!("failed to cache location for '{ip}': {e}");
                    Some(fetched)
                }
            }
        }
        Err(e) => {
            warn!("failed to look up cached location for '{ip}': {e}");
            None
        }
    };

    if let Some(country_name) = country_name {
        match storage.update_ban_action_location(id, &country_name).await {
            Ok(true) => {}
            Ok(false) => warn!("ban action {id} not found for location update"),
            Err(e) => warn!("failed to update location of ban action {id}: {e}"),
        }
    }

    Ok(())
}

/// Generate a report in the requested format.
///
/// `offset_days` shifts the reference instant (0 = now, negative =
/// reproduce a past report). When an insight generator is configured, a
/// second report anchored [`OLDER_REPORT_OFFSET_DAYS`] further back serves
/// as the comparison baseline; its failure only costs the insight section.
///
/// Plain and JSON return the rendered body; telegraph publishes the HTML
/// body as a page and returns the public URL instead.
pub async fn report(
    storage: &SqliteStorage,
    format: ReportFormat,
    offset_days: i64,
    publisher: Option<&dyn PagePublisher>,
    insight: Option<&dyn InsightGenerator>,
) -> Result<Vec<u8>> {
    let reference = Utc::now() + Duration::days(offset_days);
    let mut recent = generate_report(storage, reference, DAYS_WINDOW_A, DAYS_WINDOW_B)
        .await
        .context("failed to generate report")?;

    match format {
        ReportFormat::Plain => {
            let recent_text = render_plain(&recent, DAYS_WINDOW_A, DAYS_WINDOW_B);
            recent.insight = older_and_insight(
                storage,
                reference,
                insight,
                |older| Ok(render_plain(older, DAYS_WINDOW_A, DAYS_WINDOW_B)),
                &recent_text,
            )
            .await;

            Ok(render_plain(&recent, DAYS_WINDOW_A, DAYS_WINDOW_B).into_bytes())
        }
        ReportFormat::Json => {
            let recent_bytes =
                render_json(&recent).context("failed to encode report as JSON")?;
            let recent_text = String::from_utf8_lossy(&recent_bytes).into_owned();
            recent.insight = older_and_insight(
                storage,
                reference,
                insight,
                |older| {
                    let bytes = render_json(older)?;
                    Ok(String::from_utf8_lossy(&bytes).into_owned())
                },
                &recent_text,
            )
            .await;

            render_json(&recent).context("failed to encode report as JSON")
        }
        ReportFormat::Telegraph => {
            let publisher =
                publisher.ok_or_else(|| anyhow::anyhow!("no telegra.ph publisher configured"))?;

            let recent_html = render_html(&recent, DAYS_WINDOW_A, DAYS_WINDOW_B);
            // the baseline side of the comparison uses the JSON encoding
            recent.insight = older_and_insight(
                storage,
                reference,
                insight,
                |older| {
                    let bytes = render_json(older)?;
                    Ok(String::from_utf8_lossy(&bytes).into_owned())
                },
                &recent_html,
            )
            .await;

            let html = render_html(&recent, DAYS_WINDOW_A, DAYS_WINDOW_B);
            let timestamp = reference.format("%Y-%m-%d %H:%M:%S");
            let (title, author_name) = match hostname() {
                Some(host) => (
                    format!("[{host}] Banlog Report: {timestamp}"),
                    format!("banlog ({host})"),
                ),
                None => (format!("Banlog Report: {timestamp}"), "banlog".to_string()),
            };

            let url = publisher
                .create_page(&title, &author_name, PROJECT_URL, &html)
                .await
                .context("failed to publish report")?;

            Ok(url.into_bytes())
        }
    }
}

/// Render the older comparison report and ask the summarizer for a
/// narrative. Any failure along the way is logged and yields `None`.
async fn older_and_insight<F>(
    storage: &SqliteStorage,
    reference: chrono::DateTime<Utc>,
    insight: Option<&dyn InsightGenerator>,
    render_older: F,
    recent_text: &str,
) -> Option<String>
where
    F: FnOnce(&crate::report::Report) -> Result<String>,
{
    let generator = insight?;

    let older_reference = reference - Duration::days(OLDER_REPORT_OFFSET_DAYS);
    let older = match generate_report(storage, older_reference, DAYS_WINDOW_A, DAYS_WINDOW_B).await
    {
        Ok(older) => older,
        Err(e) => {
            warn!("failed to generate older report for insights: {e}");
            return None;
        }
    };

    let older_text = match render_older(&older) {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to render older report for insights: {e:#}");
            return None;
        }
    };

    match generator.generate_insight(&older_text, recent_text).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("failed to generate insights: {e:#}");
            None
        }
    }
}

/// IPs whose cached location is still the "Unknown" sentinel.
pub async fn list_unknown_ips(storage: &SqliteStorage) -> Result<Vec<Location>> {
    Ok(storage.list_unknown_ips().await?)
}

/// Re-fetch every unknown IP and update the cache rows that resolve.
///
/// Historical ban actions keep the location they captured at save time;
/// only the cache learns the new answer. Returned records carry the
/// post-resolution country name so the caller can partition resolved from
/// still-unknown.
pub async fn resolve_unknown_ips(
    storage: &SqliteStorage,
    geo: Option<&dyn GeoProvider>,
) -> Result<Vec<Location>> {
    let mut results = Vec::new();

    for mut location in storage.list_unknown_ips().await? {
        if let Some(geo) = geo {
            match geo.fetch_location(&location.ip).await {
                Ok(name) if !name.is_empty() => {
                    match storage.update_location(&location.ip, &name).await {
                        Ok(_) => location.country_name = name,
                        Err(e) => warn!("failed to update location of '{}': {e}", location.ip),
                    }
                }
                // still nothing usable, e.g. reserved ranges like 127.0.0.1
                Ok(_) => {}
                Err(e) => warn!("failed to fetch location for '{}': {e:#}", location.ip),
            }
        }
        results.push(location);
    }

    Ok(results)
}

/// Delete all ban actions and return how many were removed. The location
/// cache is untouched.
pub async fn purge_logs(storage: &SqliteStorage) -> Result<u64> {
    Ok(storage.purge_logs().await?)
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}
