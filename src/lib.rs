pub mod cli;
pub mod console;
pub mod models;
pub mod psychro;
pub mod recording;
pub mod run;
pub mod sensing;
pub mod settings;
mod utils;

use anyhow::{anyhow, Context, Result};
use log::{error, info};

use cli::CliArgs;
use console::{Console, ConsoleNotifier};
use models::SensorLayout;
use run::{ControllerSettings, RunController};
use sensing::{
    available_ports, Acquire, DualHumidity, SerialTransport, SimulatedBoard, SingleTemperature,
};
use settings::{resolve_settings_path, LoggerSettings, SettingsStore};

const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;

pub fn run() {
    // RUST_LOG overrides the default level.
    env_logger::Builder::new()
        .filter_level(DEFAULT_LOG_LEVEL)
        .parse_default_env()
        .init();

    let result = CliArgs::parse(std::env::args().skip(1)).and_then(|args| {
        let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
        runtime.block_on(run_logger(args))
    });

    if let Err(err) = result {
        error!("{err:#}");
        eprintln!("An error occurred: {err:#}");
        std::process::exit(1);
    }
}

async fn run_logger(args: CliArgs) -> Result<()> {
    if args.list_ports {
        return list_ports();
    }

    let store = SettingsStore::new(resolve_settings_path(args.settings.clone()))?;
    let mut settings = store.current();
    if args.temperature {
        settings.layout = SensorLayout::Temperature;
    }
    settings.simulate |= args.simulate;

    match settings.layout {
        SensorLayout::Humidity => {
            println!("Dual Arduino Humidity Data Logger");
        }
        SensorLayout::Temperature => {
            println!("Temperature Data Logger");
        }
    }
    println!("Press 'q' to stop recording and create a new file");
    println!("{}", "=".repeat(60));

    let mut console = Console::spawn()?;
    let read_timeout = settings.serial_options().read_timeout;

    match (settings.layout, settings.simulate) {
        (SensorLayout::Humidity, true) => {
            let source = DualHumidity::new(
                SimulatedBoard::new("inflow", SensorLayout::Humidity, read_timeout),
                SimulatedBoard::new("outflow", SensorLayout::Humidity, read_timeout),
            );
            println!("Connected to {}", source.describe());
            record(source, console, &settings).await
        }
        (SensorLayout::Temperature, true) => {
            let source = SingleTemperature::new(SimulatedBoard::new(
                "temperature",
                SensorLayout::Temperature,
                read_timeout,
            ));
            println!("Connected to {}", source.describe());
            record(source, console, &settings).await
        }
        (SensorLayout::Humidity, false) => {
            println!("Setting up serial connections...");
            println!("Available ports: run with --list-ports if unsure");
            let inflow_port = resolve_port(
                &mut console,
                &store,
                args.inflow_port.or_else(|| settings.inflow_port.clone()),
                "INFLOW",
                |s, port| s.inflow_port = Some(port),
            )
            .await?;
            let outflow_port = resolve_port(
                &mut console,
                &store,
                args.outflow_port.or_else(|| settings.outflow_port.clone()),
                "OUTFLOW",
                |s, port| s.outflow_port = Some(port),
            )
            .await?;

            let options = settings.serial_options();
            let opened = SerialTransport::open(&inflow_port, options).and_then(|inflow| {
                SerialTransport::open(&outflow_port, options).map(|outflow| (inflow, outflow))
            });
            let (inflow, outflow) = match opened {
                Ok(pair) => pair,
                Err(err) => {
                    println!("Error connecting to serial ports: {err:#}");
                    println!("Failed to setup serial connections. Exiting...");
                    return Err(err);
                }
            };

            let source = DualHumidity::new(inflow, outflow);
            println!("Connected to {}", source.describe());
            tokio::time::sleep(settings.settle_delay()).await;
            record(source, console, &settings).await
        }
        (SensorLayout::Temperature, false) => {
            let port = resolve_port(
                &mut console,
                &store,
                args.temperature_port.or_else(|| settings.temperature_port.clone()),
                "TEMPERATURE",
                |s, port| s.temperature_port = Some(port),
            )
            .await?;

            let transport = match SerialTransport::open(&port, settings.serial_options()) {
                Ok(transport) => transport,
                Err(err) => {
                    println!("Error connecting to serial port: {err:#}");
                    return Err(err);
                }
            };

            let source = SingleTemperature::new(transport);
            println!("Connected to {}", source.describe());
            tokio::time::sleep(settings.settle_delay()).await;
            record(source, console, &settings).await
        }
    }
}

/// Hands the open channels to a run controller until the operator quits.
async fn record<A>(source: A, console: Console, settings: &LoggerSettings) -> Result<()>
where
    A: Acquire,
    A::Record: recording::CsvRecord,
{
    let controller = RunController::new(
        source,
        console,
        ConsoleNotifier::new(settings.layout),
        ControllerSettings {
            layout: settings.layout,
            output_dir: settings.output_dir.clone(),
            loop_settings: settings.loop_settings(),
        },
    );

    println!();
    let summaries = controller.run_all().await?;
    info!("session ended after {} runs", summaries.len());

    println!("Serial connections closed.");
    println!("Exiting logger...");
    Ok(())
}

/// Known port, or ask for one and remember the answer.
async fn resolve_port(
    console: &mut Console,
    store: &SettingsStore,
    known: Option<String>,
    label: &str,
    remember: impl FnOnce(&mut LoggerSettings, String),
) -> Result<String> {
    if let Some(port) = known {
        return Ok(port);
    }

    let example = if cfg!(target_os = "windows") {
        "COM3"
    } else {
        "/dev/ttyUSB0"
    };
    let port = console
        .ask_port(label, example)
        .await?
        .ok_or_else(|| anyhow!("no serial port given for the {label} board"))?;

    if let Err(err) = store.update(|s| remember(s, port.clone())) {
        log::warn!("could not remember {label} port: {err:#}");
    }
    Ok(port)
}

fn list_ports() -> Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for (name, description) in ports {
        println!("{name}\t{description}");
    }
    Ok(())
}
