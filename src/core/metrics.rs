use std::sync::OnceLock;

use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let _ = PROM_HANDLE.set(handle);
    }

    metrics::describe_counter!(
        "evaluations_total",
        "Per-student AI evaluations, labelled by outcome status"
    );
    metrics::describe_histogram!(
        "evaluation_duration_seconds",
        Unit::Seconds,
        "Wall time of a single AI evaluation call"
    );
    metrics::describe_counter!("exports_total", "Export downloads, labelled by format");

    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
