//! Separable 3-D FFTs on `ndarray` grids.
//!
//! Every transform is unnormalized, matching `rustfft`: a forward followed by
//! an inverse transform scales the data by the number of grid points. Callers
//! apply whatever normalization their convention needs.

use ndarray::{Array3, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformDirection {
    Forward,
    Inverse,
}

/// Plans for one grid shape, reusable across many transforms.
pub struct Fft3d {
    shape: [usize; 3],
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
}

impl std::fmt::Debug for Fft3d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft3d")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl Fft3d {
    pub fn new(shape: [usize; 3]) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let forward = shape.map(|length| planner.plan_fft_forward(length));
        let inverse = shape.map(|length| planner.plan_fft_inverse(length));
        Self {
            shape,
            forward,
            inverse,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn process(&self, grid: &mut Array3<Complex64>, direction: TransformDirection) {
        debug_assert_eq!(grid.shape(), &self.shape[..]);
        let plans = match direction {
            TransformDirection::Forward => &self.forward,
            TransformDirection::Inverse => &self.inverse,
        };
        for (axis, plan) in plans.iter().enumerate() {
            transform_lanes(grid, axis, plan.as_ref());
        }
    }

    /// Inverse transform of a Hermitian spectrum stored as the
    /// `hermitian_length(nz)` non-negative frequencies of the last axis,
    /// returning the real field on the full grid.
    pub fn inverse_hermitian(&self, mut half: Array3<Complex64>) -> Array3<f64> {
        let [nx, ny, nz] = self.shape;
        debug_assert_eq!(half.dim(), (nx, ny, hermitian_length(nz)));
        for axis in 0..2 {
            transform_lanes(&mut half, axis, self.inverse[axis].as_ref());
        }

        let plan = self.inverse[2].as_ref();
        let mut line = vec![Complex64::new(0.0, 0.0); nz];
        let mut scratch = vec![Complex64::new(0.0, 0.0); plan.get_inplace_scratch_len()];
        let mut field = Array3::<f64>::zeros((nx, ny, nz));
        for (lane, mut output) in half.lanes(Axis(2)).into_iter().zip(field.lanes_mut(Axis(2))) {
            let stored = lane.len();
            for (k, slot) in line.iter_mut().enumerate() {
                *slot = if k < stored { lane[k] } else { lane[nz - k].conj() };
            }
            plan.process_with_scratch(&mut line, &mut scratch);
            for (value, slot) in output.iter_mut().zip(line.iter()) {
                *value = slot.re;
            }
        }
        field
    }

    pub fn forward(&self, grid: &mut Array3<Complex64>) {
        self.process(grid, TransformDirection::Forward);
    }

    pub fn inverse(&self, grid: &mut Array3<Complex64>) {
        self.process(grid, TransformDirection::Inverse);
    }
}

/// Unnormalized inverse transform with a one-off plan.
pub fn inverse_fft3(grid: &mut Array3<Complex64>) {
    let shape = grid_shape(grid);
    Fft3d::new(shape).inverse(grid);
}

/// Unnormalized forward transform with a one-off plan.
pub fn forward_fft3(grid: &mut Array3<Complex64>) {
    let shape = grid_shape(grid);
    Fft3d::new(shape).forward(grid);
}

/// Stored length of the last axis of a Hermitian half spectrum.
pub const fn hermitian_length(n: usize) -> usize {
    n / 2 + 1
}

fn transform_lanes(grid: &mut Array3<Complex64>, axis: usize, plan: &dyn Fft<f64>) {
    let mut buffer = vec![Complex64::new(0.0, 0.0); grid.len_of(Axis(axis))];
    let mut scratch = vec![Complex64::new(0.0, 0.0); plan.get_inplace_scratch_len()];
    for mut lane in grid.lanes_mut(Axis(axis)) {
        for (slot, value) in buffer.iter_mut().zip(lane.iter()) {
            *slot = *value;
        }
        plan.process_with_scratch(&mut buffer, &mut scratch);
        for (value, slot) in lane.iter_mut().zip(buffer.iter()) {
            *value = *slot;
        }
    }
}

fn grid_shape(grid: &Array3<Complex64>) -> [usize; 3] {
    let (nx, ny, nz) = grid.dim();
    [nx, ny, nz]
}

#[cfg(test)]
mod tests {
    use super::{forward_fft3, hermitian_length, inverse_fft3, Fft3d};
    use ndarray::Array3;
    use num_complex::Complex64;
    use std::f64::consts::PI;

    #[test]
    fn inverse_of_delta_at_origin_is_constant() {
        let mut grid = Array3::<Complex64>::zeros((3, 4, 5));
        grid[[0, 0, 0]] = Complex64::new(1.0, 0.0);
        inverse_fft3(&mut grid);
        for value in grid.iter() {
            assert!((value - Complex64::new(1.0, 0.0)).norm() <= 1.0e-12);
        }
    }

    #[test]
    fn inverse_transform_uses_positive_exponent() {
        let (nx, ny, nz) = (4, 3, 5);
        let mut grid = Array3::<Complex64>::zeros((nx, ny, nz));
        grid[[1, 0, 2]] = Complex64::new(1.0, 0.0);
        inverse_fft3(&mut grid);

        for ((i, j, k), value) in grid.indexed_iter() {
            let phase = 2.0 * PI * (i as f64 / nx as f64 + 2.0 * k as f64 / nz as f64);
            let expected = Complex64::new(phase.cos(), phase.sin());
            assert!((value - expected).norm() <= 1.0e-12, "({i},{j},{k})");
        }
    }

    #[test]
    fn forward_then_inverse_scales_by_grid_volume() {
        let shape = [4, 6, 3];
        let plans = Fft3d::new(shape);
        let original = Array3::from_shape_fn((4, 6, 3), |(i, j, k)| {
            Complex64::new((i + 2 * j) as f64 * 0.1, k as f64 - 1.0)
        });

        let mut grid = original.clone();
        plans.forward(&mut grid);
        plans.inverse(&mut grid);

        let volume = (shape[0] * shape[1] * shape[2]) as f64;
        for (actual, expected) in grid.iter().zip(original.iter()) {
            assert!((actual / volume - expected).norm() <= 1.0e-12);
        }
    }

    #[test]
    fn forward_transform_of_constant_concentrates_at_origin() {
        let mut grid = Array3::from_elem((3, 3, 3), Complex64::new(2.0, 0.0));
        forward_fft3(&mut grid);
        assert!((grid[[0, 0, 0]] - Complex64::new(54.0, 0.0)).norm() <= 1.0e-12);
        let rest: f64 = grid.iter().skip(1).map(|value| value.norm()).sum();
        assert!(rest <= 1.0e-10);
    }

    #[test]
    fn hermitian_half_matches_full_inverse() {
        for shape in [[4, 5, 6], [3, 4, 7]] {
            let [nx, ny, nz] = shape;
            let real = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
                (0.7 * i as f64 + 0.3).sin() + (j * k) as f64 * 0.05 - 0.2 * k as f64
            });
            let mut spectrum = real.mapv(|value| Complex64::new(value, 0.0));
            let plans = Fft3d::new(shape);
            plans.forward(&mut spectrum);

            let half = spectrum
                .slice(ndarray::s![.., .., ..hermitian_length(nz)])
                .to_owned();
            let recovered = plans.inverse_hermitian(half);
            let volume = (nx * ny * nz) as f64;
            for (actual, expected) in recovered.iter().zip(real.iter()) {
                assert!((actual / volume - expected).abs() <= 1.0e-12, "{shape:?}");
            }
        }
    }
}
