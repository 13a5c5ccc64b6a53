//! One-shot commands: run an order file, check the link.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use brewer_core::{BrewOrder, CodeVocabulary, DeviceStatus, decode_status_line, run_order};
use eyre::{Result, WrapErr};

use crate::link::Link;

fn print_status(s: &DeviceStatus, json: bool) {
    if json {
        println!("{}", s.to_json());
    } else {
        println!(
            "{:<8} {:>6.1} °C {:>6.1} min left",
            s.status.name(),
            s.temperature,
            s.remaining_time
        );
    }
}

pub fn run_brew(cfg: &brewer_config::Config, link: Link, order_path: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(order_path)
        .wrap_err_with(|| format!("read order file {}", order_path.display()))?;
    let order = BrewOrder::from_json(&text)?;
    tracing::info!(order = %order.name, steps = order.steps.len(), "brewing");

    let controller = crate::controller_for(cfg, link.writer);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        let controller = controller.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::Relaxed);
            if let Err(e) = controller.stop_order() {
                tracing::error!(error = %e, "failed to stop order on interrupt");
            }
        }) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let report = run_order(&controller, link.reader, order, |s| print_status(s, json))?;
    if interrupted.load(Ordering::Relaxed) {
        eyre::bail!("brew interrupted; order {} stopped", report.order);
    }

    let log = report
        .log_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "order": report.order,
                "steps": report.steps,
                "observations": report.observations,
                "log": log,
                "complete": true,
            })
        );
    } else {
        println!(
            "order {} complete: {} steps, {} observations, log {}",
            report.order, report.steps, report.observations, log
        );
    }
    Ok(())
}

pub fn self_check(cfg: &brewer_config::Config, mut link: Link, json: bool) -> Result<()> {
    let vocab = CodeVocabulary::from(&cfg.protocol);
    let timeout = std::time::Duration::from_millis(cfg.serial.read_timeout_ms);
    let line = link.reader.read_line(timeout).map_err(|e| {
        eyre::Report::new(brewer_core::BrewError::Link(
            brewer_core::hw_error::map_link_error(e.as_ref()),
        ))
    })?;
    let report = decode_status_line(&line, &vocab).map_err(brewer_core::BrewError::Decode)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "ok": true, "line": line, "status": report.code.name() })
        );
    } else {
        println!("ok: device reports {} ({line})", report.code);
    }
    Ok(())
}
