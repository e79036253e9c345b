//! Stress driver for the hostirq software interrupt controller.
//!
//! `irqsim` plays both sides of a hosted kernel:
//! 1. **Producers:** Host threads (and optionally a `SIGUSR1` handler) raise lines concurrently.
//! 2. **Guest:** The main thread toggles the enable gate, parking while nothing is pending,
//!    and delivers each batch through the built-in handler table.
//!
//! When every producer has finished, it checks that each raised line was
//! delivered at least once and never more often than it was raised.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use clap::Parser;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use hostirq_core::config::PendingBackend;
use hostirq_core::host::{HostOps, yield_to_irqs};
use hostirq_core::{Controller, ControllerConfig, LineId};

/// How long the guest parks when nothing is pending.
const IDLE_PARK: Duration = Duration::from_millis(1);

#[derive(Parser, Debug)]
#[command(
    name = "irqsim",
    author,
    version,
    about = "Drive the hostirq controller with concurrent producers",
    long_about = "Spawns producer threads that raise interrupt lines while the main thread acts as the guest kernel, \
                  toggling the enable gate and delivering pending lines.\n\nExamples:\n  irqsim --producers 8 --raises 100000\n  irqsim --config irq.json --signal --json"
)]
struct Cli {
    /// JSON controller configuration (defaults are used when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of producer threads; each gets its own line.
    #[arg(short, long, default_value_t = 4)]
    producers: u32,

    /// Raises issued by each producer.
    #[arg(short, long, default_value_t = 10_000)]
    raises: u64,

    /// Also raise a line from a SIGUSR1 handler.
    ///
    /// Needs the atomic pending backend: with `"backend": "Locked"` a signal
    /// landing while the guest holds the bitmask lock would deadlock, so that
    /// combination is refused.
    #[arg(long)]
    signal: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

/// Host whose wake hook unparks the guest thread.
#[derive(Debug, Default)]
struct ParkingHost {
    guest: OnceLock<Thread>,
}

impl HostOps for ParkingHost {
    fn wake(&self) {
        if let Some(guest) = self.guest.get() {
            guest.unpark();
        }
    }
}

/// Controller and line targeted by the signal handler.
static SIGNAL_TARGET: OnceLock<Arc<Controller>> = OnceLock::new();
static SIGNAL_LINE: AtomicU32 = AtomicU32::new(0);

extern "C" fn on_sigusr1(_sig: libc::c_int) {
    if let Some(ctl) = SIGNAL_TARGET.get() {
        let _ = ctl.raise(SIGNAL_LINE.load(Ordering::Relaxed));
    }
}

fn install_signal_producer(ctl: &Arc<Controller>, line: LineId) -> Result<(), Box<dyn Error>> {
    SIGNAL_LINE.store(line.get(), Ordering::Relaxed);
    if SIGNAL_TARGET.set(Arc::clone(ctl)).is_err() {
        return Err("signal producer installed twice".into());
    }
    let handler: extern "C" fn(libc::c_int) = on_sigusr1;
    // SAFETY: the handler only does atomic loads, an atomic OR on the pending
    // word, and a thread unpark; none of these take locks or allocate.
    let prev = unsafe { libc::signal(libc::SIGUSR1, handler as libc::sighandler_t) };
    if prev == libc::SIG_ERR {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// One line driven by one producer.
struct Source {
    name: String,
    line: LineId,
    raised: Arc<AtomicUsize>,
    delivered: Arc<AtomicUsize>,
}

fn load_config(path: Option<&PathBuf>) -> Result<ControllerConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(ControllerConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ControllerConfig::default()),
    }
}

/// Rejects `--signal` when raises would take the pending-bitmask mutex.
fn check_signal_backend(config: &ControllerConfig, signal: bool) -> Result<(), Box<dyn Error>> {
    if signal && config.resolved_backend() == PendingBackend::Locked {
        return Err("--signal requires the atomic pending backend; \
                    the locked backend is not async-signal-safe"
            .into());
    }
    Ok(())
}

fn register_source(ctl: &Controller, name: String) -> Result<Source, Box<dyn Error>> {
    let line = ctl.allocate_line(&name)?;
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    ctl.handlers().request_irq(line, &name, move |_| {
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    })?;
    Ok(Source {
        name,
        line,
        raised: Arc::new(AtomicUsize::new(0)),
        delivered,
    })
}

/// Acts as the guest kernel until `done` is set and the final batch is delivered.
fn run_guest(ctl: &Controller, done: &AtomicBool) {
    loop {
        let finished = done.load(Ordering::Acquire);
        ctl.local_irq_disable();
        if ctl.pending_lines().is_empty() && !finished {
            thread::park_timeout(IDLE_PARK);
        }
        ctl.local_irq_enable();
        if finished {
            break;
        }
        // Guest work inside a critical section; producers keep raising.
        let _guard = ctl.irq_guard();
        for _ in 0..64 {
            yield_to_irqs();
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn Error>> {
    let config = load_config(cli.config.as_ref())?;
    check_signal_backend(&config, cli.signal)?;
    let host = Arc::new(ParkingHost::default());
    let _ = host.guest.set(thread::current());
    let ctl = Arc::new(Controller::new(config, Arc::clone(&host) as Arc<dyn HostOps>)?);
    ctl.init();

    let mut sources = (0..cli.producers)
        .map(|i| register_source(&ctl, format!("producer{i}")))
        .collect::<Result<Vec<_>, _>>()?;
    if cli.signal {
        let source = register_source(&ctl, "sigusr1".to_owned())?;
        install_signal_producer(&ctl, source.line)?;
        sources.push(source);
    }
    info!(lines = sources.len(), raises = cli.raises, "starting producers");

    let done = AtomicBool::new(false);
    let started = Instant::now();
    thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let ctl = Arc::clone(&ctl);
                let line = source.line;
                let raised = Arc::clone(&source.raised);
                let via_signal = source.name == "sigusr1";
                let raises = cli.raises;
                scope.spawn(move || {
                    for _ in 0..raises {
                        if via_signal {
                            // SAFETY: raise(3) targets this thread, so the handler has
                            // run before the call returns; SIGUSR1 is handled.
                            let _ = unsafe { libc::raise(libc::SIGUSR1) };
                        } else {
                            let _ = ctl.raise(line.get());
                        }
                        let _ = raised.fetch_add(1, Ordering::Relaxed);
                        thread::yield_now();
                    }
                    debug!(%line, "producer finished");
                })
            })
            .collect();

        let _ = scope.spawn(|| {
            for handle in handles {
                let _ = handle.join();
            }
            done.store(true, Ordering::Release);
            host.wake();
        });

        run_guest(&ctl, &done);
    });
    let elapsed = started.elapsed();

    let mut consistent = true;
    let mut lines = Vec::with_capacity(sources.len());
    for source in &sources {
        let raised = source.raised.load(Ordering::Relaxed);
        let delivered = source.delivered.load(Ordering::Relaxed);
        let ok = raised == 0 || (1..=raised).contains(&delivered);
        consistent &= ok;
        lines.push(json!({
            "name": source.name,
            "line": source.line.get(),
            "raised": raised,
            "delivered": delivered,
            "ok": ok,
        }));
    }

    let stats = ctl.stats();
    if cli.json {
        let report = json!({
            "elapsed_ms": elapsed.as_millis(),
            "stats": stats,
            "lines": lines,
            "consistent": consistent,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{stats}");
        println!("elapsed          {elapsed:.2?}");
        println!();
        print!("{}", ctl.handlers().show_interrupts());
    }
    Ok(consistent)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("[!] delivery counts inconsistent with raises");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("[!] irqsim: {e}");
            ExitCode::FAILURE
        }
    }
}
