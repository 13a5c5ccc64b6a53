//! Type-state builder for `OrderController`.
//!
//! The link writer is the only mandatory part, so `build()` and
//! `try_build()` become available once `with_writer` was called. `build()`
//! clamps out-of-range settings; `try_build()` rejects them.
use std::path::PathBuf;
use std::sync::Arc;

use brewer_traits::LineWriter;
use brewer_traits::clock::{Clock, MonotonicClock};

use crate::config::ControllerSettings;
use crate::controller::OrderController;
use crate::error::{BrewError, Result};
use crate::history::DEFAULT_HISTORY_LEN;
use crate::order_log::OrderLog;
use crate::protocol::CodeVocabulary;

pub struct Missing;
/// Holds the writer once provided.
pub struct Set(Box<dyn LineWriter + Send>);

pub struct ControllerBuilder<W> {
    writer: W,
    order_log: Option<OrderLog>,
    settings: Option<ControllerSettings>,
    vocab: Option<CodeVocabulary>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl Default for ControllerBuilder<Missing> {
    fn default() -> Self {
        Self {
            writer: Missing,
            order_log: None,
            settings: None,
            vocab: None,
            clock: None,
        }
    }
}

impl<W> ControllerBuilder<W> {
    /// Sending half of the device link.
    pub fn with_writer(self, writer: impl LineWriter + Send + 'static) -> ControllerBuilder<Set> {
        ControllerBuilder {
            writer: Set(Box::new(writer)),
            order_log: self.order_log,
            settings: self.settings,
            vocab: self.vocab,
            clock: self.clock,
        }
    }

    pub fn with_order_log(mut self, log: OrderLog) -> Self {
        self.order_log = Some(log);
        self
    }

    /// Shorthand for `with_order_log(OrderLog::new(dir))`.
    pub fn with_storage_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_order_log(OrderLog::new(dir))
    }

    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_vocabulary(mut self, vocab: CodeVocabulary) -> Self {
        self.vocab = Some(vocab);
        self
    }

    /// Inject a custom clock (tests use a deterministic one).
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Apply the `[controller]`, `[protocol]` and `[storage]` sections.
    pub fn apply_config(self, cfg: &brewer_config::Config) -> Self {
        self.with_settings(ControllerSettings::from(cfg))
            .with_vocabulary(CodeVocabulary::from(&cfg.protocol))
            .with_order_log(OrderLog::from(&cfg.storage))
    }
}

impl ControllerBuilder<Set> {
    /// Build with defaults for everything not provided. Out-of-range
    /// settings are clamped.
    pub fn build(mut self) -> OrderController {
        if let Some(s) = self.settings.as_mut() {
            s.history_len = s.history_len.clamp(1, DEFAULT_HISTORY_LEN);
            s.read_failure_limit = s.read_failure_limit.max(1);
        }
        self.finish()
    }

    pub fn try_build(self) -> Result<OrderController> {
        if let Some(s) = &self.settings {
            if s.history_len == 0 || s.history_len > DEFAULT_HISTORY_LEN {
                return Err(BrewError::State(format!(
                    "history_len must be in 1..={DEFAULT_HISTORY_LEN}"
                ))
                .into());
            }
            if s.read_failure_limit == 0 {
                return Err(BrewError::State("read_failure_limit must be >= 1".into()).into());
            }
        }
        Ok(self.finish())
    }

    fn finish(self) -> OrderController {
        let log = self
            .order_log
            .unwrap_or_else(|| OrderLog::new(std::env::temp_dir().join("brewer")));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        OrderController::from_parts(
            self.writer.0,
            log,
            self.settings.unwrap_or_default(),
            self.vocab.unwrap_or_default(),
            clock,
        )
    }
}
