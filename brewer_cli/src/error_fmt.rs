//! Human-readable error descriptions and structured JSON error formatting.

use brewer_core::error::{BrewError, LinkError, OrderError};

fn link_hint(le: &LinkError) -> String {
    match le {
        LinkError::Timeout => "What happened: The controller board did not report a status in time.\nLikely causes: Board unplugged or resetting, wrong serial.port, or serial.read_timeout_ms too low.\nHow to fix: Check the USB cable and port name, then rerun; raise serial.read_timeout_ms if the board is slow.".to_string(),
        LinkError::Closed => "What happened: The serial link to the controller board closed.\nLikely causes: Board unplugged or power-cycled.\nHow to fix: Reconnect the board and restart the controller.".to_string(),
        LinkError::Undecodable(raw) => format!(
            "What happened: The board sent bytes that are not text ({raw}).\nLikely causes: Wrong serial.baud or electrical noise.\nHow to fix: Match serial.baud to the firmware (usually 9600)."
        ),
        LinkError::Io(msg) => format!(
            "What happened: Serial I/O failed ({msg}).\nLikely causes: Port in use by another program or missing permissions.\nHow to fix: Close other serial monitors and make sure the user is in the dialout group."
        ),
    }
}

fn order_hint(oe: &OrderError) -> String {
    format!(
        "What happened: The order was rejected: {oe}.\nLikely causes: Missing name or steps, negative values, or a document that is neither a native order nor a BrauOrder.\nHow to fix: Provide {{\"name\": ..., \"steps\": [{{\"temperature\": 65, \"duration\": 30}}]}} and try again."
    )
}

fn find_order_error(err: &eyre::Report) -> Option<&OrderError> {
    err.downcast_ref::<OrderError>().or(match err.downcast_ref::<BrewError>() {
        Some(BrewError::Order(oe)) => Some(oe),
        _ => None,
    })
}

fn find_link_error(err: &eyre::Report) -> Option<&LinkError> {
    err.downcast_ref::<LinkError>().or(match err.downcast_ref::<BrewError>() {
        Some(BrewError::Link(le)) => Some(le),
        _ => None,
    })
}

fn chain_text(err: &eyre::Report) -> String {
    err.chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

fn is_config_error(lower: &str) -> bool {
    lower.contains("invalid configuration") || lower.contains("read config")
}

fn is_port_error(err: &eyre::Report) -> bool {
    err.chain()
        .any(|e| e.downcast_ref::<brewer_hardware::HwError>().is_some())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(oe) = find_order_error(err) {
        return order_hint(oe);
    }
    if let Some(le) = find_link_error(err) {
        return link_hint(le);
    }
    if let Some(be) = err.downcast_ref::<BrewError>() {
        return match be {
            BrewError::UnknownCode(code) => format!(
                "What happened: {code:?} is not a status code.\nLikely causes: Typo or a vocabulary mismatch.\nHow to fix: Use idle, heat or done (or 0, 1, 2 with protocol.codes = \"numeric\")."
            ),
            BrewError::Storage(msg) => format!(
                "What happened: The order log could not be written ({msg}).\nLikely causes: storage.dir missing or not writable, or the disk is full.\nHow to fix: Create the directory or point storage.dir somewhere writable."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = chain_text(err);
    let lower = msg.to_ascii_lowercase();

    if is_port_error(err) || lower.contains("open serial port") {
        return format!(
            "What happened: Failed to open the serial port.\nLikely causes: Wrong serial.port, board not connected, or no permission.\nHow to fix: Check the port name (ls /dev/tty*) and permissions, or run with --sim. Detail: {msg}"
        );
    }

    if is_config_error(&lower) || lower.contains(" must ") {
        return format!(
            "What happened: Configuration is invalid or missing.\nLikely causes: No [serial] section, a typo, or an out-of-range value.\nHow to fix: Edit the TOML config and try again. Detail: {msg}"
        );
    }

    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: config 2, order 3, device link 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if find_order_error(err).is_some() {
        return 3;
    }
    if find_link_error(err).is_some() || is_port_error(err) {
        return 4;
    }
    if is_config_error(&chain_text(err).to_ascii_lowercase()) {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if find_order_error(err).is_some() {
        "Order"
    } else if find_link_error(err).is_some() || is_port_error(err) {
        "Link"
    } else if is_config_error(&chain_text(err).to_ascii_lowercase()) {
        "Config"
    } else {
        "Error"
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_errors_exit_3() {
        let e: eyre::Report = OrderError::NoSteps.into();
        assert_eq!(exit_code_for_error(&e), 3);
        assert!(humanize(&e).contains("order was rejected"));
        let e: eyre::Report = BrewError::Order(OrderError::EmptyName).into();
        assert_eq!(exit_code_for_error(&e), 3);
    }

    #[test]
    fn link_errors_exit_4() {
        let e: eyre::Report = BrewError::Link(LinkError::Timeout).into();
        assert_eq!(exit_code_for_error(&e), 4);
        assert!(humanize(&e).contains("did not report"));
    }

    #[test]
    fn config_errors_exit_2() {
        let e = eyre::eyre!("serial.baud must be > 0")
            .wrap_err("invalid configuration etc/brewer.toml");
        assert_eq!(exit_code_for_error(&e), 2);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], 2);
    }
}
