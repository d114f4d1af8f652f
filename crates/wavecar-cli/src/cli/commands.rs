use super::CliError;
use anyhow::Context;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use wavecar_core::export::{read_structure_header, write_volumetric, write_wavefunction};
use wavecar_core::observables::{
    electron_localization_function, inverse_participation_ratios, transition_dipole_moment,
};
use wavecar_core::{GammaReduction, ReconstructionRequest, StateIndex, Wavecar, WavecarLayout};

pub(super) struct InputArgs {
    pub(super) wavecar: PathBuf,
    pub(super) layout: WavecarLayout,
}

impl InputArgs {
    fn open(&self) -> Result<Wavecar, CliError> {
        debug!(path = %self.wavecar.display(), layout = %self.layout, "opening WAVECAR");
        Wavecar::open(&self.wavecar, self.layout).map_err(CliError::Compute)
    }
}

#[derive(clap::Args)]
pub(super) struct GvectorsArgs {
    /// 1-based k-point index
    #[arg(long, default_value_t = 1)]
    kpoint: usize,

    /// Enumerate the gamma half sphere reduced along x or z regardless of --layout
    #[arg(long, value_enum)]
    force_gamma: Option<ForceGammaArg>,

    /// Skip the comparison with the stored plane-wave count
    #[arg(long)]
    no_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum ForceGammaArg {
    X,
    Z,
}

impl From<ForceGammaArg> for GammaReduction {
    fn from(axis: ForceGammaArg) -> Self {
        match axis {
            ForceGammaArg::X => Self::HalfX,
            ForceGammaArg::Z => Self::HalfZ,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct StateArgs {
    /// 1-based spin channel
    #[arg(long, default_value_t = 1)]
    spin: usize,

    /// 1-based k-point index
    #[arg(long, default_value_t = 1)]
    kpoint: usize,
}

#[derive(clap::Args)]
pub(super) struct RealspaceArgs {
    #[command(flatten)]
    state: StateArgs,

    /// 1-based band index
    #[arg(long, default_value_t = 1)]
    band: usize,

    /// Real-space grid; defaults to the minimum grid
    #[arg(long, num_args = 3, value_names = ["NX", "NY", "NZ"])]
    grid: Option<Vec<usize>>,

    /// Explicit normalization scale applied after the inverse transform
    #[arg(long)]
    scale: Option<f64>,

    /// Use the stored coefficients without normalizing them
    #[arg(long)]
    no_normalize: bool,

    /// Structure file whose header starts every output file
    #[arg(long, default_value = "POSCAR")]
    poscar: PathBuf,

    /// Output file prefix; `_r.vasp` and `_i.vasp` are appended
    #[arg(long, default_value = "wfc")]
    prefix: PathBuf,

    /// Skip the imaginary part of complex fields
    #[arg(long)]
    real_only: bool,
}

#[derive(clap::Args)]
pub(super) struct IprArgs {
    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct TdmArgs {
    #[command(flatten)]
    state: StateArgs,

    /// 1-based band index of the initial state
    #[arg(long)]
    initial: usize,

    /// 1-based band index of the final state
    #[arg(long = "final")]
    final_band: usize,

    /// Use the stored coefficients without normalizing them
    #[arg(long)]
    no_normalize: bool,
}

#[derive(clap::Args)]
pub(super) struct ElfArgs {
    /// Comma-separated k-point weights; uniform when omitted
    #[arg(long, value_delimiter = ',')]
    weights: Option<Vec<f64>>,

    /// Real-space grid; defaults to twice the minimum grid
    #[arg(long, num_args = 3, value_names = ["NX", "NY", "NZ"])]
    grid: Option<Vec<usize>>,

    /// Structure file whose header starts every output file
    #[arg(long, default_value = "POSCAR")]
    poscar: PathBuf,

    /// Output file prefix; `_spin_NN.vasp` is appended
    #[arg(long, default_value = "ELF")]
    prefix: PathBuf,
}

pub(super) fn run_info_command(input: &InputArgs) -> Result<i32, CliError> {
    let wavecar = input.open()?;
    let json = wavecar
        .summary()
        .to_json()
        .context("failed to serialize WAVECAR summary")?;
    println!("{json}");
    Ok(0)
}

pub(super) fn run_gvectors_command(input: &InputArgs, args: GvectorsArgs) -> Result<i32, CliError> {
    let wavecar = input.open()?;
    let reduction = args
        .force_gamma
        .map_or_else(|| input.layout.reduction(), GammaReduction::from);
    let gvectors = wavecar
        .gvectors_with(args.kpoint, reduction, !args.no_check)
        .map_err(CliError::Compute)?;

    let mut stdout = std::io::stdout().lock();
    for [fx, fy, fz] in gvectors {
        writeln!(stdout, "{fx:5}{fy:5}{fz:5}").context("failed to write G-vectors")?;
    }
    Ok(0)
}

pub(super) fn run_realspace_command(input: &InputArgs, args: RealspaceArgs) -> Result<i32, CliError> {
    let wavecar = input.open()?;
    let state = StateIndex::new(args.state.spin, args.state.kpoint, args.band);
    let mut request = ReconstructionRequest::new(state).with_normalize(!args.no_normalize);
    if let Some(grid) = grid_from_values(args.grid)? {
        request = request.with_grid(grid);
    }
    if let Some(scale) = args.scale {
        request = request.with_scale(scale);
    }

    let field = wavecar.reconstruct(&request).map_err(CliError::Compute)?;
    let header = read_structure_header(&args.poscar).map_err(CliError::Compute)?;
    let written =
        write_wavefunction(&args.prefix, &header, &field, args.real_only).map_err(CliError::Compute)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(0)
}

pub(super) fn run_ipr_command(input: &InputArgs, args: IprArgs) -> Result<i32, CliError> {
    let wavecar = input.open()?;
    let ratios = inverse_participation_ratios(&wavecar, true).map_err(CliError::Compute)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&ratios).context("failed to serialize IPR table")?;
        println!("{json}");
        return Ok(0);
    }

    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "#{:>4}{:>6}{:>6}{:>12}{:>14}{:>16}",
        "spin", "kpt", "band", "kpath", "energy(eV)", "ipr"
    )
    .context("failed to write IPR table")?;
    for ratio in ratios {
        writeln!(
            stdout,
            "{:>5}{:>6}{:>6}{:>12.6}{:>14.6}{:>16.8e}",
            ratio.state.spin, ratio.state.kpoint, ratio.state.band, ratio.kpath, ratio.energy,
            ratio.ipr
        )
        .context("failed to write IPR table")?;
    }
    Ok(0)
}

pub(super) fn run_tdm_command(input: &InputArgs, args: TdmArgs) -> Result<i32, CliError> {
    let wavecar = input.open()?;
    let initial = StateIndex::new(args.state.spin, args.state.kpoint, args.initial);
    let final_state = StateIndex::new(args.state.spin, args.state.kpoint, args.final_band);
    let dipole = transition_dipole_moment(&wavecar, initial, final_state, !args.no_normalize)
        .map_err(CliError::Compute)?;

    let report = json!({
        "initial": initial,
        "final": final_state,
        "energy_difference": dipole.energy_difference,
        "overlap": [dipole.overlap.re, dipole.overlap.im],
        "moment": dipole.moment.map(|value| [value.re, value.im]),
        "strength": dipole.strength(),
    });
    let json =
        serde_json::to_string_pretty(&report).context("failed to serialize transition dipole")?;
    println!("{json}");
    Ok(0)
}

pub(super) fn run_elf_command(input: &InputArgs, args: ElfArgs) -> Result<i32, CliError> {
    let wavecar = input.open()?;
    let weights = args
        .weights
        .unwrap_or_else(|| vec![1.0; wavecar.header().kpoint_count()]);
    let grid = grid_from_values(args.grid)?;

    let channels =
        electron_localization_function(&wavecar, &weights, grid).map_err(CliError::Compute)?;
    let header = read_structure_header(&args.poscar).map_err(CliError::Compute)?;
    for (index, channel) in channels.iter().enumerate() {
        let path = channel_path(&args.prefix, index + 1);
        write_volumetric(&path, &header, channel).map_err(CliError::Compute)?;
        println!("{}", path.display());
    }
    Ok(0)
}

fn grid_from_values(values: Option<Vec<usize>>) -> Result<Option<[usize; 3]>, CliError> {
    match values {
        None => Ok(None),
        Some(values) => <[usize; 3]>::try_from(values.as_slice())
            .map(Some)
            .map_err(|_| {
                CliError::Usage(format!(
                    "--grid expects three sizes, got {}",
                    values.len()
                ))
            }),
    }
}

fn channel_path(prefix: &Path, spin: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("_spin_{spin:02}.vasp"));
    PathBuf::from(name)
}
