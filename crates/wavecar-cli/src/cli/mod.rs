mod commands;

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wavecar_core::{ErrorCategory, WavecarError, WavecarLayout};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("wavecar".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.verbose);
            dispatch_parsed(cli)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `-v` enables debug output and `-vv` trace output; otherwise `RUST_LOG`
/// applies, falling back to warnings only.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "wavecar",
    version,
    about = "Inspect VASP WAVECAR files and reconstruct wavefunctions"
)]
struct Cli {
    /// WAVECAR file to read
    #[arg(long, global = true, default_value = "WAVECAR")]
    wavecar: PathBuf,

    /// Coefficient layout written by the producing VASP build
    #[arg(long, global = true, value_enum, default_value_t = LayoutArg::Standard)]
    layout: LayoutArg,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    /// Full plane-wave sphere (vasp_std)
    Standard,
    /// Gamma-only half sphere, reduced along z (vasp_gam)
    GammaHalfZ,
    /// Gamma-only half sphere, reduced along x (older vasp_gam builds)
    GammaHalfX,
    /// Two-component spinors (vasp_ncl)
    SpinOrbit,
}

impl From<LayoutArg> for WavecarLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Standard => Self::Standard,
            LayoutArg::GammaHalfZ => Self::GammaHalfZ,
            LayoutArg::GammaHalfX => Self::GammaHalfX,
            LayoutArg::SpinOrbit => Self::SpinOrbit,
        }
    }
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Print the header and band table as JSON
    Info,
    /// List the G-vectors of one k-point
    Gvectors(commands::GvectorsArgs),
    /// Reconstruct one state on a real-space grid and write VESTA files
    Realspace(commands::RealspaceArgs),
    /// Inverse participation ratio of every state
    Ipr(commands::IprArgs),
    /// Transition dipole moment between two bands
    Tdm(commands::TdmArgs),
    /// Electron localization function, one VESTA file per spin channel
    Elf(commands::ElfArgs),
}

fn dispatch_parsed(cli: Cli) -> Result<i32, CliError> {
    let input = commands::InputArgs {
        wavecar: cli.wavecar,
        layout: cli.layout.into(),
    };
    match cli.command {
        CliCommand::Info => commands::run_info_command(&input),
        CliCommand::Gvectors(args) => commands::run_gvectors_command(&input, args),
        CliCommand::Realspace(args) => commands::run_realspace_command(&input, args),
        CliCommand::Ipr(args) => commands::run_ipr_command(&input, args),
        CliCommand::Tdm(args) => commands::run_tdm_command(&input, args),
        CliCommand::Elf(args) => commands::run_elf_command(&input, args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(WavecarError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => ErrorCategory::InputValidationError.exit_code(),
            Self::Compute(error) => error.exit_code(),
            Self::Internal(_) => ErrorCategory::IoSystemError.exit_code(),
        }
    }

    pub fn diagnostic_line(&self) -> String {
        match self {
            Self::Usage(message) => format!("ERROR: [INPUT.CLI_USAGE] {}", message.trim_end()),
            Self::Compute(error) => error.diagnostic_line(),
            Self::Internal(error) => format!("ERROR: [IO.CLI] {error:#}"),
        }
    }
}
