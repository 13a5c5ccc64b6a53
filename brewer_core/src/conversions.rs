//! `From` implementations bridging `brewer_config` types to `brewer_core` types.

use crate::config::ControllerSettings;
use crate::history::DEFAULT_HISTORY_LEN;
use crate::order_log::OrderLog;
use crate::protocol::CodeVocabulary;
use crate::util::period_from_ms;

// ── ControllerSettings ───────────────────────────────────────────────────────

impl From<&brewer_config::Config> for ControllerSettings {
    fn from(c: &brewer_config::Config) -> Self {
        Self {
            tick: period_from_ms(c.controller.tick_ms),
            settle: std::time::Duration::from_millis(c.controller.settle_ms),
            read_timeout: period_from_ms(c.serial.read_timeout_ms),
            history_len: c.controller.history_len.clamp(1, DEFAULT_HISTORY_LEN),
            read_failure_limit: c.controller.read_failure_limit.max(1),
            read_failure_backoff: std::time::Duration::from_millis(
                c.controller.read_failure_backoff_ms,
            ),
        }
    }
}

// ── CodeVocabulary ───────────────────────────────────────────────────────────

impl From<brewer_config::CodeStyle> for CodeVocabulary {
    fn from(style: brewer_config::CodeStyle) -> Self {
        match style {
            brewer_config::CodeStyle::Named => CodeVocabulary::named(),
            brewer_config::CodeStyle::Numeric => CodeVocabulary::numeric(),
        }
    }
}

impl From<&brewer_config::Protocol> for CodeVocabulary {
    fn from(p: &brewer_config::Protocol) -> Self {
        p.codes.into()
    }
}

// ── OrderLog ─────────────────────────────────────────────────────────────────

impl From<&brewer_config::Storage> for OrderLog {
    fn from(s: &brewer_config::Storage) -> Self {
        OrderLog::new(s.dir.clone())
    }
}
