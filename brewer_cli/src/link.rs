//! Device link selection: serial port or the built-in simulator.

use std::time::Duration;

use brewer_traits::{LineReader, LineWriter};
use eyre::Result;

pub struct Link {
    pub reader: Box<dyn LineReader + Send>,
    pub writer: Box<dyn LineWriter + Send>,
}

fn sim_link(cfg: &brewer_config::Config) -> Link {
    use brewer_hardware::{SimCodes, SimParams, SimulatedBrewer};
    let codes = match cfg.protocol.codes {
        brewer_config::CodeStyle::Named => SimCodes::named(),
        brewer_config::CodeStyle::Numeric => SimCodes::numeric(),
    };
    // the board reports about once per tick
    let read_delay = Duration::from_millis(cfg.controller.tick_ms.min(200));
    let sim = SimulatedBrewer::new(SimParams {
        codes,
        read_delay,
        ..SimParams::default()
    });
    let (reader, writer) = sim.split();
    tracing::info!("using simulated brewer");
    Link {
        reader: Box::new(reader),
        writer: Box::new(writer),
    }
}

#[cfg(feature = "hardware")]
pub fn open(cfg: &brewer_config::Config, sim: bool) -> Result<Link> {
    use eyre::WrapErr;
    if sim {
        return Ok(sim_link(cfg));
    }
    let (reader, writer) = brewer_hardware::serial::open(
        &cfg.serial.port,
        cfg.serial.baud,
        Duration::from_millis(cfg.serial.read_timeout_ms),
    )
    .wrap_err_with(|| format!("open serial port {}", cfg.serial.port))?;
    tracing::info!(port = %cfg.serial.port, baud = cfg.serial.baud, "serial link open");
    Ok(Link {
        reader: Box::new(reader),
        writer: Box::new(writer),
    })
}

#[cfg(not(feature = "hardware"))]
pub fn open(cfg: &brewer_config::Config, sim: bool) -> Result<Link> {
    if !sim {
        tracing::warn!(
            port = %cfg.serial.port,
            "built without the hardware feature; falling back to the simulated brewer"
        );
    }
    Ok(sim_link(cfg))
}
