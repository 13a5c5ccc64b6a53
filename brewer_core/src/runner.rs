use std::path::PathBuf;
use std::time::Duration;

use brewer_traits::LineReader;

use crate::controller::{OrderController, Phase};
use crate::error::{BrewError, Result};
use crate::order::BrewOrder;
use crate::status::DeviceStatus;

/// Summary of a completed order run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub order: String,
    pub steps: usize,
    /// Status observations seen while the order ran.
    pub observations: usize,
    pub log_path: Option<PathBuf>,
}

/// Submit `order`, monitor the device through `reader` and block until the
/// order finishes. `on_status` sees every new status observation.
///
/// Fails with the monitor's last error if it gives up on the link, or with
/// `BrewError::State` if something else stopped the order.
pub fn run_order<R, F>(
    controller: &OrderController,
    reader: R,
    order: BrewOrder,
    mut on_status: F,
) -> Result<RunReport>
where
    R: LineReader + Send + 'static,
    F: FnMut(&DeviceStatus),
{
    let name = order.name.clone();
    let steps = order.steps.len();
    controller.submit_order(order)?;
    let log_path = controller.order_log_path();
    let mut monitor = controller.spawn_monitor(reader);

    // Poll a few times per tick so no observation is missed.
    let poll = (controller.settings().tick / 4).max(Duration::from_millis(1));
    let mut last_ts = controller.current_status().timestamp;
    let mut observations = 0usize;
    loop {
        let status = controller.current_status();
        if status.timestamp != last_ts {
            last_ts = status.timestamp;
            observations += 1;
            on_status(&status);
        }
        if controller.phase() == Phase::Idle || !monitor.is_running() {
            break;
        }
        std::thread::sleep(poll);
    }
    monitor.shutdown();
    let status = controller.current_status();
    if status.timestamp != last_ts {
        observations += 1;
        on_status(&status);
    }

    if let Some(e) = monitor.failure() {
        return Err(e.into());
    }
    if controller.phase() != Phase::Idle {
        return Err(BrewError::State("monitor stopped before the order finished".into()).into());
    }
    tracing::info!(order = %name, steps, observations, "order run complete");
    Ok(RunReport {
        order: name,
        steps,
        observations,
        log_path,
    })
}
