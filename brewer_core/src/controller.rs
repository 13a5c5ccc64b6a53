//! Order controller: the brew order state machine.
//!
//! `OrderController` owns the current order, the step cursor, the link's
//! writing half, the order log and the observed device status. It is a cheap
//! `Clone` handle; request handlers and the monitor thread each hold one.
//!
//! Locking: `control` guards phase, generation, writer and order log;
//! `observed` guards the status and history ring. `control` is always taken
//! first. `submit_gate` serializes whole submissions, which span the settle
//! interval with `control` released.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use brewer_traits::{Clock, LineWriter};
use serde::Serialize;

use crate::config::ControllerSettings;
use crate::error::{BrewError, OrderError, Result};
use crate::history::HistoryRing;
use crate::hw_error::map_link_error;
use crate::order::{BrewOrder, MashStep};
use crate::order_log::OrderLog;
use crate::protocol::{CodeVocabulary, Command, decode_status_line};
use crate::status::{DeviceStatus, StatusCode};
use crate::util::epoch_secs;

/// Execution phase of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// No order. Device reports cause no commands.
    Idle,
    /// A running order was forced idle and its replacement is waiting out the
    /// settle interval.
    Stopping,
    /// `order` is active and `step` is the mash step the device is working on.
    Running { order: BrewOrder, step: usize },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Stopping => "stopping",
            Phase::Running { .. } => "running",
        }
    }

    fn cursor(&self) -> Cursor {
        match self {
            Phase::Running { step, .. } => Cursor {
                step: *step,
                executing: true,
            },
            _ => Cursor {
                step: 0,
                executing: false,
            },
        }
    }

    fn order(&self) -> Option<BrewOrder> {
        match self {
            Phase::Running { order, .. } => Some(order.clone()),
            _ => None,
        }
    }
}

/// Copy of the execution cursor. `executing` implies `step` indexes the
/// current order's steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub step: usize,
    pub executing: bool,
}

/// Phase, cursor and order read under one lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSnapshot {
    pub phase: &'static str,
    pub cursor: Cursor,
    pub order: Option<BrewOrder>,
}

/// What a processed status line did to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// The device finished a step and the next one was commanded.
    Advanced { step: usize },
    /// The device finished the last step; the order is complete.
    Finished,
}

pub(crate) struct ControlState {
    phase: Phase,
    /// Bumped whenever a submit or stop changes which order a status line
    /// belongs to.
    generation: u64,
    writer: Box<dyn LineWriter + Send>,
    log: OrderLog,
}

impl ControlState {
    fn send(&mut self, command: Command, vocab: &CodeVocabulary) -> Result<()> {
        let line = command.encode(vocab);
        self.writer.write_line(&line).map_err(|e| {
            let link = map_link_error(e.as_ref());
            tracing::error!(line = %line, error = %link, "device write failed");
            eyre::Report::new(BrewError::Link(link))
        })?;
        tracing::debug!(line = %line, "command sent");
        Ok(())
    }
}

struct Observed {
    status: DeviceStatus,
    history: HistoryRing,
}

struct Shared {
    control: Mutex<ControlState>,
    observed: RwLock<Observed>,
    submit_gate: Mutex<()>,
    settings: ControllerSettings,
    vocab: CodeVocabulary,
    clock: Arc<dyn Clock + Send + Sync>,
}

#[derive(Clone)]
pub struct OrderController {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OrderController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderController")
            .field("phase", &self.phase().name())
            .field("cursor", &self.cursor())
            .field("status", &self.current_status())
            .finish()
    }
}

impl OrderController {
    pub fn builder() -> crate::builder::ControllerBuilder<crate::builder::Missing> {
        crate::builder::ControllerBuilder::default()
    }

    pub(crate) fn from_parts(
        writer: Box<dyn LineWriter + Send>,
        log: OrderLog,
        settings: ControllerSettings,
        vocab: CodeVocabulary,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let status = DeviceStatus::initial(clock.unix_time());
        let history = HistoryRing::with_capacity(settings.history_len);
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(ControlState {
                    phase: Phase::Idle,
                    generation: 0,
                    writer,
                    log,
                }),
                observed: RwLock::new(Observed { status, history }),
                submit_gate: Mutex::new(()),
                settings,
                vocab,
                clock,
            }),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.shared.settings
    }

    pub fn vocabulary(&self) -> &CodeVocabulary {
        &self.shared.vocab
    }

    // A panic while holding a lock leaves plain data behind; keep serving it.
    fn control(&self) -> MutexGuard<'_, ControlState> {
        self.shared
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `order`, replacing any order that is running.
    ///
    /// Blocks for the settle interval when an order had to be stopped first.
    /// An invalid order is rejected before anything is sent.
    pub fn submit_order(&self, order: BrewOrder) -> Result<()> {
        order.validate()?;
        let first = *order.steps.first().ok_or(OrderError::NoSteps)?;
        let vocab = &self.shared.vocab;

        let _gate = self
            .shared
            .submit_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let replaced = {
            let mut ctl = self.control();
            if matches!(ctl.phase, Phase::Idle) {
                false
            } else {
                tracing::info!(phase = ctl.phase.name(), "stopping current order for replacement");
                ctl.send(Command::Idle, vocab)?;
                ctl.phase = Phase::Stopping;
                ctl.generation += 1;
                true
            }
        };
        if replaced {
            self.shared.clock.sleep(self.shared.settings.settle);
        }

        let mut ctl = self.control();
        let epoch = epoch_secs(self.shared.clock.unix_time());
        if let Err(e) = ctl.log.rotate(&order.name, epoch) {
            ctl.phase = Phase::Idle;
            return Err(e);
        }
        ctl.phase = Phase::Running {
            order: order.clone(),
            step: 0,
        };
        ctl.generation += 1;
        if let Err(e) = ctl.send(heat(first), vocab) {
            ctl.phase = Phase::Idle;
            ctl.generation += 1;
            return Err(e);
        }
        tracing::info!(order = %order.name, steps = order.steps.len(), "order started");
        Ok(())
    }

    /// Force the device idle and drop the current order.
    pub fn stop_order(&self) -> Result<()> {
        let mut ctl = self.control();
        let was = ctl.phase.name();
        ctl.phase = Phase::Idle;
        ctl.generation += 1;
        ctl.send(Command::Idle, &self.shared.vocab)?;
        tracing::info!(was, "order stopped");
        Ok(())
    }

    /// Put the device into `code` directly (maintenance and testing).
    ///
    /// `code` is a wire token of the vocabulary or a status name. Anything
    /// else is rejected with `BrewError::UnknownCode` and nothing is sent.
    pub fn force_status(&self, code: &str) -> Result<()> {
        let Some(status) = self.shared.vocab.parse_code(code) else {
            tracing::warn!(code, "rejected unknown status code");
            return Err(BrewError::UnknownCode(code.to_string()).into());
        };
        let mut ctl = self.control();
        ctl.send(Command::Force(status), &self.shared.vocab)?;
        tracing::info!(code = %status, "status forced");
        Ok(())
    }

    /// Process one status line from the device: decode, update status and
    /// history, append to the order log when not idle, and advance or finish
    /// the order on a done report.
    pub fn handle_line(&self, line: &str) -> Result<Transition> {
        self.process_line(line, None)
    }

    /// `handle_line` for a line read while generation `read_at` was current.
    /// If a submit or stop happened in between, the line still updates the
    /// status but is neither logged nor allowed to drive a transition.
    pub(crate) fn process_line(&self, line: &str, read_at: Option<u64>) -> Result<Transition> {
        let vocab = &self.shared.vocab;
        let report = decode_status_line(line, vocab).map_err(|e| {
            let phase = self.phase().name();
            tracing::warn!(line, phase, error = %e, "undecodable status line");
            BrewError::Decode(e)
        })?;
        let now = self.shared.clock.unix_time();

        let mut ctl = self.control();
        let snapshot = {
            let mut obs = self
                .shared
                .observed
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            obs.status = obs.status.observe(&report, now);
            let s = obs.status;
            obs.history.push(s);
            s
        };

        if read_at.is_some_and(|g| g != ctl.generation) {
            tracing::debug!(line, "discarding status read before the last submit/stop");
            return Ok(Transition::None);
        }

        if !snapshot.is_idle() {
            if let Err(e) = ctl.log.append(&snapshot) {
                tracing::warn!(error = %e, "order log append failed");
            }
        }

        if report.code != StatusCode::Done {
            return Ok(Transition::None);
        }
        let (next, total) = match &ctl.phase {
            Phase::Running { order, step } => (
                order.steps.get(step + 1).copied().map(|s| (step + 1, s)),
                order.steps.len(),
            ),
            _ => {
                tracing::trace!(phase = ctl.phase.name(), "done reported with no order running");
                return Ok(Transition::None);
            }
        };
        match next {
            Some((step, mash)) => {
                ctl.send(heat(mash), vocab)?;
                if let Phase::Running { step: cur, .. } = &mut ctl.phase {
                    *cur = step;
                }
                tracing::info!(step, total, "mash step complete, advancing");
                Ok(Transition::Advanced { step })
            }
            None => {
                ctl.send(Command::Idle, vocab)?;
                ctl.phase = Phase::Idle;
                ctl.generation += 1;
                tracing::info!(total, "order finished");
                Ok(Transition::Finished)
            }
        }
    }

    pub fn current_status(&self) -> DeviceStatus {
        self.shared
            .observed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Recent status snapshots, oldest first.
    pub fn recent_history(&self) -> Vec<DeviceStatus> {
        self.shared
            .observed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.control().phase.clone()
    }

    pub fn cursor(&self) -> Cursor {
        self.control().phase.cursor()
    }

    /// The order currently running, if any.
    pub fn current_order(&self) -> Option<BrewOrder> {
        self.control().phase.order()
    }

    /// Consistent view of the order state for status endpoints.
    pub fn order_snapshot(&self) -> OrderSnapshot {
        let ctl = self.control();
        OrderSnapshot {
            phase: ctl.phase.name(),
            cursor: ctl.phase.cursor(),
            order: ctl.phase.order(),
        }
    }

    pub fn order_log_path(&self) -> Option<std::path::PathBuf> {
        self.control().log.current_path().map(|p| p.to_path_buf())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.control().generation
    }

    pub(crate) fn close_log(&self) {
        self.control().log.close();
    }
}

fn heat(step: MashStep) -> Command {
    Command::Heat {
        temperature: step.temperature,
        duration: step.duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingWriter;
    use brewer_traits::clock::test_clock::TestClock;
    use std::time::Duration;

    fn controller(dir: &std::path::Path) -> (OrderController, RecordingWriter, TestClock) {
        let writer = RecordingWriter::default();
        let clock = TestClock::new();
        let ctl = OrderController::builder()
            .with_writer(writer.clone())
            .with_order_log(OrderLog::new(dir))
            .with_clock(clock.clone())
            .build();
        (ctl, writer, clock)
    }

    fn ipa() -> BrewOrder {
        BrewOrder::new(
            "IPA",
            vec![MashStep::new(65.0, 30.0), MashStep::new(70.0, 15.0)],
        )
    }

    #[test]
    fn starts_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, _) = controller(dir.path());
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.cursor(), Cursor { step: 0, executing: false });
        assert!(ctl.current_status().is_idle());
        assert!(ctl.recent_history().is_empty());
        assert!(writer.lines().is_empty());
    }

    #[test]
    fn order_snapshot_matches_phase() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, _, _) = controller(dir.path());
        let idle = ctl.order_snapshot();
        assert_eq!(idle.phase, "idle");
        assert!(!idle.cursor.executing);
        assert!(idle.order.is_none());

        ctl.submit_order(ipa()).unwrap();
        ctl.handle_line("done;").unwrap();
        let snap = ctl.order_snapshot();
        assert_eq!(snap.phase, "running");
        assert_eq!(snap.cursor, Cursor { step: 1, executing: true });
        assert_eq!(snap.order, Some(ipa()));
    }

    #[test]
    fn submit_from_idle_does_not_settle() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, clock) = controller(dir.path());
        ctl.submit_order(ipa()).unwrap();
        assert_eq!(writer.lines(), vec!["heat;65;30;"]);
        assert!(clock.sleeps().is_empty());
        assert_eq!(ctl.cursor(), Cursor { step: 0, executing: true });
    }

    #[test]
    fn replacement_settles_between_idle_and_heat() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, clock) = controller(dir.path());
        ctl.submit_order(ipa()).unwrap();
        ctl.submit_order(BrewOrder::new("Stout", vec![MashStep::new(67.0, 60.0)]))
            .unwrap();
        assert_eq!(writer.lines(), vec!["heat;65;30;", "idle;", "heat;67;60;"]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
        assert_eq!(ctl.current_order().unwrap().name, "Stout");
    }

    #[test]
    fn invalid_order_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, _) = controller(dir.path());
        ctl.submit_order(ipa()).unwrap();
        let err = ctl
            .submit_order(BrewOrder::new("Empty", vec![]))
            .unwrap_err();
        assert_eq!(err.downcast_ref::<OrderError>(), Some(&OrderError::NoSteps));
        assert_eq!(writer.lines(), vec!["heat;65;30;"]);
        assert_eq!(ctl.current_order().unwrap().name, "IPA");
    }

    #[test]
    fn stale_line_does_not_advance_new_order() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, _) = controller(dir.path());
        ctl.submit_order(ipa()).unwrap();
        let read_at = ctl.generation();
        ctl.submit_order(ipa()).unwrap();
        let t = ctl.process_line("done;", Some(read_at)).unwrap();
        assert_eq!(t, Transition::None);
        assert_eq!(ctl.cursor().step, 0);
        assert_eq!(writer.lines().last().map(String::as_str), Some("heat;65;30;"));
        // the observation itself is still recorded
        assert_eq!(ctl.current_status().status, StatusCode::Done);
    }

    #[test]
    fn failed_write_is_a_link_error() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, _) = controller(dir.path());
        writer.fail_writes(true);
        let err = ctl.stop_order().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BrewError>(),
            Some(BrewError::Link(_))
        ));
        assert_eq!(ctl.phase(), Phase::Idle);
    }

    #[test]
    fn force_accepts_tokens_and_names() {
        let dir = tempfile::tempdir().unwrap();
        let (ctl, writer, _) = controller(dir.path());
        ctl.force_status("done").unwrap();
        ctl.force_status("Heating").unwrap();
        assert_eq!(writer.lines(), vec!["done;", "heat;"]);
    }
}
