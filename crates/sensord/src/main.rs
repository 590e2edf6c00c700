//! sensord
//!
//! Opens the accelerometer and ambient-light adapters, runs a single-threaded
//! readiness loop over their input devices, and writes every emitted sample
//! to stdout as one JSON object per line.
//!
//! Usage: `sensord [CONFIG]`

use anyhow::{Context, Result, bail};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use sensord_config::SensordConfig;
use sensord_hal::{AccelerationSensor, ID_A, ID_L, LightSensor, SensorAdapter, SensorEvent};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

const EVENT_BUFFER_LEN: usize = 16;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// One adapter and the handle the daemon enables it under
struct Sensor {
    name: &'static str,
    handle: i32,
    adapter: Box<dyn SensorAdapter>,
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SensordConfig::load(Path::new(&path))
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => SensordConfig::load_default().context("Failed to load configuration")?,
    };

    setup_logging(&config.logging.filter);
    info!("sensord starting...");

    setup_signal_handlers()?;

    let mut sensors = open_sensors(&config)?;
    if sensors.is_empty() {
        bail!("No sensors enabled in configuration");
    }

    for sensor in &mut sensors {
        sensor
            .adapter
            .enable(sensor.handle, true)
            .with_context(|| format!("Failed to enable {}", sensor.name))?;
    }

    let result = run(&mut sensors);

    for sensor in &mut sensors {
        if let Err(e) = sensor.adapter.enable(sensor.handle, false) {
            warn!("Failed to disable {}: {}", sensor.name, e);
        }
    }

    info!("sensord stopped");
    result
}

/// Setup logging
fn setup_logging(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(std::io::stderr))
        .init();
}

/// Setup signal handlers for graceful shutdown
fn setup_signal_handlers() -> Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    // no SA_RESTART: a signal must interrupt poll()
    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );

    unsafe {
        sigaction(Signal::SIGTERM, &action)?;
        sigaction(Signal::SIGINT, &action)?;
    }

    Ok(())
}

extern "C" fn handle_signal(sig: i32) {
    if sig == libc::SIGTERM || sig == libc::SIGINT {
        SHUTDOWN.store(true, Ordering::SeqCst);
    }
}

fn open_sensors(config: &SensordConfig) -> Result<Vec<Sensor>> {
    let mut sensors = Vec::new();

    let accel = &config.accelerometer;
    if accel.enabled {
        let mut adapter = AccelerationSensor::open(&accel.control_path, &accel.input_name)
            .context("Failed to open accelerometer")?;
        adapter
            .set_delay(accel.delay_ns())
            .context("Failed to set accelerometer delay")?;
        sensors.push(Sensor {
            name: "accelerometer",
            handle: ID_A,
            adapter: Box::new(adapter),
        });
    }

    let light = &config.light;
    if light.enabled {
        let adapter = LightSensor::open(light.control_path.as_deref(), &light.input_name)
            .context("Failed to open light sensor")?;
        sensors.push(Sensor {
            name: "light",
            handle: ID_L,
            adapter: Box::new(adapter),
        });
    }

    Ok(sensors)
}

fn run(sensors: &mut [Sensor]) -> Result<()> {
    let mut events = [SensorEvent::default(); EVENT_BUFFER_LEN];
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    while !SHUTDOWN.load(Ordering::SeqCst) {
        let ready = wait_ready(sensors)?;

        for (sensor, ready) in sensors.iter_mut().zip(ready) {
            if !ready {
                continue;
            }
            let n = sensor.adapter.read_events(&mut events).map_err(|e| {
                error!("{}: read failed ({})", sensor.name, e.status());
                e
            })?;
            debug!("{}: {} event(s)", sensor.name, n);
            for event in &events[..n] {
                serde_json::to_writer(&mut out, event)?;
                writeln!(out)?;
            }
        }
        out.flush()?;
    }

    info!("Received shutdown signal");
    Ok(())
}

/// Which adapters to read next.
///
/// An adapter holding a pending sample is read without waiting on its
/// descriptor, and keeps the poll from blocking the others.
fn wait_ready(sensors: &[Sensor]) -> Result<Vec<bool>> {
    let pending: Vec<bool> = sensors
        .iter()
        .map(|s| s.adapter.has_pending_events())
        .collect();
    let timeout = if pending.iter().any(|&p| p) {
        PollTimeout::ZERO
    } else {
        PollTimeout::NONE
    };

    let mut fds: Vec<PollFd> = sensors
        .iter()
        .map(|s| PollFd::new(s.adapter.poll_fd(), PollFlags::POLLIN))
        .collect();

    match poll(&mut fds, timeout) {
        Ok(_) => {}
        Err(Errno::EINTR) => return Ok(pending),
        Err(e) => return Err(e).context("poll failed"),
    }

    let readable = PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP;
    Ok(fds
        .iter()
        .zip(pending)
        .map(|(fd, pending)| pending || fd.revents().is_some_and(|r| r.intersects(readable)))
        .collect())
}
