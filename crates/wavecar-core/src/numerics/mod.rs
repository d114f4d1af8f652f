pub mod fft;
pub mod linalg;

pub use fft::{forward_fft3, hermitian_length, inverse_fft3, Fft3d, TransformDirection};
pub use linalg::{
    lu_factorize, norm3, reciprocal_lattice, row_times_matrix, LuDecomposition, LuError,
};

use faer::Mat;
use num_complex::Complex64;

pub type DenseRealMatrix = Mat<f64>;

/// Euclidean norm of a coefficient vector.
pub fn complex_norm(values: &[Complex64]) -> f64 {
    values
        .iter()
        .map(|value| value.norm_sqr())
        .sum::<f64>()
        .sqrt()
}

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

/// Compensated sum; grids reach millions of points and the norm checks are
/// sensitive to accumulated rounding.
pub fn stable_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}
