//! Maps `Box<dyn Error>` from the link traits to typed `LinkError`.
//!
//! The traits in `brewer_traits` use `Box<dyn Error + Send + Sync>` so any
//! transport can sit behind them; this module converts those to our typed
//! error enum, with an optional feature-gated path for
//! `brewer_hardware::HwError` downcasting.

use crate::error::LinkError;

/// Map a trait-boundary error to a typed `LinkError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> LinkError {
    #[cfg(feature = "hardware-errors")]
    {
        use brewer_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => LinkError::Timeout,
                HwError::Closed => LinkError::Closed,
                HwError::Undecodable(bytes) => {
                    LinkError::Undecodable(String::from_utf8_lossy(bytes).into_owned())
                }
                other => LinkError::Io(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return match io.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => LinkError::Timeout,
            std::io::ErrorKind::InvalidData => LinkError::Undecodable(io.to_string()),
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::BrokenPipe => {
                LinkError::Closed
            }
            _ => LinkError::Io(io.to_string()),
        };
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        LinkError::Timeout
    } else if lower.contains("utf-8") || lower.contains("undecodable") {
        LinkError::Undecodable(s)
    } else {
        LinkError::Io(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeouts_map_to_timeout() {
        let e = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(map_link_error(&e), LinkError::Timeout);
    }

    #[test]
    fn string_errors_fall_back_to_heuristics() {
        let e: Box<dyn std::error::Error + Send + Sync> = "sensor timeout".into();
        assert_eq!(map_link_error(e.as_ref()), LinkError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> = "port vanished".into();
        assert_eq!(map_link_error(e.as_ref()), LinkError::Io("port vanished".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_downcast() {
        use brewer_hardware::error::HwError;
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::Timeout);
        assert_eq!(map_link_error(e.as_ref()), LinkError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(HwError::Undecodable(vec![b'x', 0xff]));
        assert!(matches!(map_link_error(e.as_ref()), LinkError::Undecodable(_)));
    }
}
