//! VESTA-readable volumetric text: a structure header, a blank line, the
//! grid dimensions and the values with x varying fastest, ten per line.

use crate::domain::{WavecarError, WavecarResult};
use crate::reconstruct::RealSpaceWavefunction;
use ndarray::Array3;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const VALUES_PER_LINE: usize = 10;

/// Lines of a structure file up to, not including, the first blank line.
pub fn read_structure_header(path: &Path) -> WavecarResult<String> {
    let content = fs::read_to_string(path).map_err(|source| {
        WavecarError::stream(format!("failed to read '{}'", path.display()), source)
    })?;
    let mut header = String::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        header.push_str(line);
        header.push('\n');
    }
    Ok(header)
}

/// C `%16.8E`: eight mantissa digits, signed exponent of at least two
/// digits, right-aligned in sixteen columns.
pub fn format_scientific(value: f64) -> String {
    if !value.is_finite() {
        let text = if value.is_nan() {
            "NAN"
        } else if value > 0.0 {
            "INF"
        } else {
            "-INF"
        };
        return format!("{text:>16}");
    }

    let rendered = format!("{value:.8E}");
    let (mantissa, exponent) = rendered.split_once('E').unwrap_or((rendered.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{:>16}", format!("{mantissa}E{sign}{:02}", exponent.abs()))
}

pub fn render_volumetric(header: &str, values: &Array3<f64>) -> String {
    let (nx, ny, nz) = values.dim();
    let mut out = String::with_capacity(header.len() + 24 + 17 * nx * ny * nz);
    out.push_str(header);
    out.push('\n');
    let _ = writeln!(out, "{nx:5}{ny:5}{nz:5}");

    let mut written = 0;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                out.push_str(&format_scientific(values[[i, j, k]]));
                out.push(' ');
                written += 1;
                if written % VALUES_PER_LINE == 0 {
                    out.push('\n');
                }
            }
        }
    }
    out
}

pub fn write_volumetric(path: &Path, header: &str, values: &Array3<f64>) -> WavecarResult<()> {
    fs::write(path, render_volumetric(header, values)).map_err(|source| {
        WavecarError::stream(format!("failed to write '{}'", path.display()), source)
    })?;
    debug!(path = %path.display(), grid = ?values.dim(), "wrote volumetric data");
    Ok(())
}

/// Write `<prefix>_r.vasp` and, for complex fields unless `real_only`,
/// `<prefix>_i.vasp`. Spinor channels are written under
/// `<prefix>_spinor_01` and `<prefix>_spinor_02`. Returns the paths written.
pub fn write_wavefunction(
    prefix: &Path,
    header: &str,
    field: &RealSpaceWavefunction,
    real_only: bool,
) -> WavecarResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    match field {
        RealSpaceWavefunction::Real(values) => {
            let path = suffixed(prefix, "_r.vasp");
            write_volumetric(&path, header, values)?;
            written.push(path);
        }
        RealSpaceWavefunction::Complex(values) => {
            write_complex(prefix, header, values, real_only, &mut written)?;
        }
        RealSpaceWavefunction::Spinor(channels) => {
            for (index, values) in channels.iter().enumerate() {
                let channel_prefix = suffixed(prefix, &format!("_spinor_{:02}", index + 1));
                write_complex(&channel_prefix, header, values, real_only, &mut written)?;
            }
        }
    }
    Ok(written)
}

fn write_complex(
    prefix: &Path,
    header: &str,
    values: &Array3<num_complex::Complex64>,
    real_only: bool,
    written: &mut Vec<PathBuf>,
) -> WavecarResult<()> {
    let path = suffixed(prefix, "_r.vasp");
    write_volumetric(&path, header, &values.mapv(|value| value.re))?;
    written.push(path);
    if !real_only {
        let path = suffixed(prefix, "_i.vasp");
        write_volumetric(&path, header, &values.mapv(|value| value.im))?;
        written.push(path);
    }
    Ok(())
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
