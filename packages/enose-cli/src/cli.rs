use clap::{Args, Parser, Subcommand, ValueEnum};
use enose_rs::backend::Operation;
use enose_rs::surface::Surface;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "enose",
    version,
    about = "E-Nouse sensor rig operator console",
    long_about = "Monitor the E-Nouse backend streams and drive sampling sessions from the terminal.\n\
                  The backend location comes from $ENOSE_API_URL (default http://localhost:3000) or --api-url."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Backend base URL, overrides $ENOSE_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Subscribe to the live streams and print a summary every render tick
    Monitor(MonitorArgs),
    /// List serial ports visible to the backend
    Ports(PortsArgs),
    /// Connect the backend to a serial port
    Connect(ConnectArgs),
    /// Start a labeled sampling session
    Start(StartArgs),
    /// Stop the current sampling session
    Stop,
    /// Reset the backend session
    Reset,
    /// Have the backend save its session buffer on its own host
    Save(SaveArgs),
    /// Print the backend session buffer as JSON
    Session(SessionArgs),
    /// Check the backend's time-series database connection
    Influx,
    /// Control the signal simulator
    #[command(subcommand)]
    Sim(SimCommand),
    /// Upload the backend session buffer to the ingestion service
    Upload(UploadArgs),
    /// Write the backend session buffer as a gnuplot table and script
    ExportGnuplot(ExportGnuplotArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SurfaceArg {
    Telemetry,
    Simulation,
}

impl From<SurfaceArg> for Surface {
    fn from(arg: SurfaceArg) -> Self {
        match arg {
            SurfaceArg::Telemetry => Surface::Telemetry,
            SurfaceArg::Simulation => Surface::Simulation,
        }
    }
}

#[derive(Args)]
pub struct MonitorArgs {
    /// Surface to summarize
    #[arg(long, value_enum, default_value_t = SurfaceArg::Telemetry)]
    pub surface: SurfaceArg,

    /// Stop after this many seconds (runs until Ctrl-C otherwise)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Render tick in milliseconds
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,

    /// Display gain
    #[arg(long)]
    pub gain: Option<f64>,

    /// Vertical spacing between traces
    #[arg(long)]
    pub spacing: Option<f64>,

    /// Re-estimate spacing from the buffered window on every tick
    #[arg(long)]
    pub auto_space: bool,

    /// Write the buffered window as <BASE>.dat / <BASE>.gp on exit
    #[arg(long, value_name = "BASE")]
    pub gnuplot: Option<PathBuf>,
}

#[derive(Args)]
pub struct PortsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Serial port name, e.g. /dev/ttyUSB0 or COM3
    pub port: String,
}

#[derive(Args)]
pub struct StartArgs {
    /// Sample label
    #[arg(long, default_value = "test")]
    pub label: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SaveFormat {
    Csv,
    Json,
}

#[derive(Args)]
pub struct SaveArgs {
    /// File format
    #[arg(long, value_enum, default_value_t = SaveFormat::Csv)]
    pub format: SaveFormat,

    /// Destination path on the backend host
    pub path: String,
}

#[derive(Args)]
pub struct SessionArgs {
    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Write to a file instead of stdout
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Subcommand)]
pub enum SimCommand {
    /// Start the simulator
    Start,
    /// Stop the simulator
    Stop,
    /// Set signal parameters and the combining operation
    Params(SimParamsArgs),
    /// Record the simulation stream for a while and save it locally
    Record(SimRecordArgs),
}

#[derive(Args)]
pub struct SimParamsArgs {
    #[arg(long, default_value_t = 1.0)]
    pub amp1: f64,
    #[arg(long, default_value_t = 1.0)]
    pub freq1: f64,
    /// Degrees
    #[arg(long, default_value_t = 0.0)]
    pub phase1: f64,
    #[arg(long, default_value_t = 1.0)]
    pub amp2: f64,
    #[arg(long, default_value_t = 1.0)]
    pub freq2: f64,
    /// Degrees
    #[arg(long, default_value_t = 0.0)]
    pub phase2: f64,
    /// add, subtract or multiply
    #[arg(long, default_value = "add")]
    pub operation: Operation,
}

#[derive(Args)]
pub struct SimRecordArgs {
    /// Seconds to record
    #[arg(long, default_value_t = 5.0)]
    pub duration: f64,

    /// File format
    #[arg(long, value_enum, default_value_t = SaveFormat::Csv)]
    pub format: SaveFormat,

    /// Local destination path
    pub path: PathBuf,
}

#[derive(Args)]
pub struct UploadArgs {
    /// Sample label (defaults to "unknown")
    #[arg(long, default_value = "")]
    pub label: String,
}

#[derive(Args)]
pub struct ExportGnuplotArgs {
    /// Output base path; .dat and .gp are appended
    pub base: PathBuf,
}
