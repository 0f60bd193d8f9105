use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use zwlink::tools::{self, format_hex, parse_hex};
use zwlink::{init_logging, list_ports, open_session, LinkConfig, LinkSession, SerialByteSource};

/// Talk to a Z-Wave SerialAPI controller over its serial port.
#[derive(Parser, Debug)]
#[command(
    name = "zwlink",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")")
)]
struct Cli {
    /// Config file (.toml or .json); defaults to the platform config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port, overriding the config file (e.g. COM7, /dev/ttyACM0)
    #[arg(long, short, global = true)]
    port: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List serial ports that may hold a controller.
    Ports,
    /// Send a raw request payload, e.g. `send "15"`.
    Send {
        /// Payload bytes in hex, function id first
        payload: String,
        /// Wait for and print the reply frame
        #[arg(long)]
        reply: bool,
    },
    /// List the node ids in the controller's network.
    Nodes,
    /// Sample the background RSSI.
    Rssi {
        /// Repeat every N seconds until Enter is pressed (0 = once)
        #[arg(long, default_value_t = 0)]
        interval: u64,
    },
    /// Print every inbound frame until Enter is pressed.
    Listen,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    if let Cmd::Ports = cli.cmd {
        for port in list_ports()? {
            println!("{:<24} {}", port.port_name, port.description);
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let mut session = open_session(&config)
        .with_context(|| format!("Unable to open serial port {}", config.serial.port))?;

    match cli.cmd {
        Cmd::Ports => Ok(()),
        Cmd::Send { payload, reply } => send_raw(&mut session, &payload, reply),
        Cmd::Nodes => {
            let ids = tools::node_ids(&mut session)?;
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            println!("NodeIDs={}", ids.join(","));
            Ok(())
        }
        Cmd::Rssi { interval } => sample_rssi(&mut session, interval),
        Cmd::Listen => {
            let stop = stop_on_enter();
            println!("Listening, press Enter to stop");
            let count = session.listen(&stop, |frame| {
                let marker = if frame.checksum_valid { "" } else { " (bad checksum)" };
                println!("{:?}: {}{}", frame.kind, format_hex(&frame.payload), marker);
            })?;
            println!("{} frames", count);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<LinkConfig> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => LinkConfig::load_or_default(&LinkConfig::default_path()?)?,
    };
    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    Ok(config)
}

fn send_raw(
    session: &mut LinkSession<SerialByteSource>,
    payload: &str,
    reply: bool,
) -> anyhow::Result<()> {
    let payload = parse_hex(payload)?;
    match session.execute(&payload, reply)? {
        Some(reply) => println!("{}", format_hex(&reply)),
        None => println!("ACK"),
    }
    Ok(())
}

fn sample_rssi(session: &mut LinkSession<SerialByteSource>, interval: u64) -> anyhow::Result<()> {
    let stop = stop_on_enter();
    loop {
        let readings = tools::background_rssi(session)?;
        let readings: Vec<String> = readings.iter().map(|r| r.to_string()).collect();
        println!("RSSI={}", readings.join(" "));

        if interval == 0 || wait_or_stop(&stop, Duration::from_secs(interval)) {
            break;
        }
    }

    match tools::network_stats(session) {
        Ok(stats) => println!("Stats: {}", stats),
        Err(e) => tracing::warn!("Network stats unavailable: {}", e),
    }
    tools::clear_network_stats(session)?;
    Ok(())
}

/// Sleep for `total`, returning early with `true` once `stop` is set.
fn wait_or_stop(stop: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    stop.load(Ordering::Relaxed)
}

/// A flag raised when a line is read from stdin
fn stop_on_enter() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        flag.store(true, Ordering::Relaxed);
    });
    stop
}
