use super::DenseRealMatrix;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LuError {
    #[error("LU factorization requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("LU factorization requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is singular at pivot index {pivot_index}")]
    SingularMatrix { pivot_index: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: DenseRealMatrix,
    pivots: Vec<usize>,
    pivot_sign: f64,
}

impl LuDecomposition {
    pub fn dimension(&self) -> usize {
        self.lu.nrows()
    }

    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    pub fn determinant(&self) -> f64 {
        (0..self.dimension()).fold(self.pivot_sign, |product, index| {
            product * self.lu[(index, index)]
        })
    }

    pub fn invert(&self) -> Result<DenseRealMatrix, LuError> {
        let dimension = self.dimension();
        let mut inverse = DenseRealMatrix::zeros(dimension, dimension);
        let mut basis = vec![0.0; dimension];

        for col in 0..dimension {
            basis.fill(0.0);
            basis[col] = 1.0;

            let solution = self.solve(&basis)?;
            for row in 0..dimension {
                inverse[(row, col)] = solution[row];
            }
        }

        Ok(inverse)
    }

    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, LuError> {
        let dimension = self.dimension();
        if rhs.len() != dimension {
            return Err(LuError::RhsLengthMismatch {
                expected: dimension,
                actual: rhs.len(),
            });
        }

        let mut forward = vec![0.0; dimension];
        for row in 0..dimension {
            let mut value = rhs[self.pivots[row]];
            for col in 0..row {
                value -= self.lu[(row, col)] * forward[col];
            }
            forward[row] = value;
        }

        let mut solution = vec![0.0; dimension];
        for row in (0..dimension).rev() {
            let mut value = forward[row];
            for col in (row + 1)..dimension {
                value -= self.lu[(row, col)] * solution[col];
            }

            let diagonal = self.lu[(row, row)];
            if diagonal.abs() <= SINGULAR_PIVOT_EPSILON {
                return Err(LuError::SingularMatrix { pivot_index: row });
            }

            solution[row] = value / diagonal;
        }

        Ok(solution)
    }
}

pub fn lu_factorize(matrix: &DenseRealMatrix) -> Result<LuDecomposition, LuError> {
    let dimension = validate_square_shape(matrix)?;
    let mut lu = matrix.clone();
    let mut pivots: Vec<usize> = (0..dimension).collect();
    let mut pivot_sign = 1.0;

    for pivot_col in 0..dimension {
        let (pivot_row, pivot_abs) = select_pivot_row(&lu, pivot_col);
        if pivot_abs <= SINGULAR_PIVOT_EPSILON {
            return Err(LuError::SingularMatrix {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            swap_rows(&mut lu, pivot_col, pivot_row);
            pivots.swap(pivot_col, pivot_row);
            pivot_sign = -pivot_sign;
        }

        let pivot = lu[(pivot_col, pivot_col)];
        for row in (pivot_col + 1)..dimension {
            lu[(row, pivot_col)] /= pivot;
            let multiplier = lu[(row, pivot_col)];
            for col in (pivot_col + 1)..dimension {
                let updated = lu[(row, col)] - multiplier * lu[(pivot_col, col)];
                lu[(row, col)] = updated;
            }
        }
    }

    Ok(LuDecomposition {
        lu,
        pivots,
        pivot_sign,
    })
}

/// Row-major 3x3 array into a dense matrix.
pub fn matrix_from_rows(rows: &[[f64; 3]; 3]) -> DenseRealMatrix {
    DenseRealMatrix::from_fn(3, 3, |row, col| rows[row][col])
}

pub fn rows_from_matrix(matrix: &DenseRealMatrix) -> [[f64; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (row, values) in rows.iter_mut().enumerate() {
        for (col, value) in values.iter_mut().enumerate() {
            *value = matrix[(row, col)];
        }
    }
    rows
}

/// Reciprocal basis (rows `b_i` with `a_i . b_j = delta_ij`, no 2*pi) and the
/// signed cell volume of a row-major real-space lattice.
pub fn reciprocal_lattice(lattice: &[[f64; 3]; 3]) -> Result<([[f64; 3]; 3], f64), LuError> {
    let decomposition = lu_factorize(&matrix_from_rows(lattice))?;
    let volume = decomposition.determinant();
    let inverse = rows_from_matrix(&decomposition.invert()?);

    let mut reciprocal = [[0.0; 3]; 3];
    for (row, values) in reciprocal.iter_mut().enumerate() {
        for (col, value) in values.iter_mut().enumerate() {
            *value = inverse[col][row];
        }
    }

    Ok((reciprocal, volume))
}

/// `vector . matrix` for a row vector and a row-major matrix.
pub fn row_times_matrix(vector: [f64; 3], matrix: &[[f64; 3]; 3]) -> [f64; 3] {
    let mut output = [0.0; 3];
    for (col, value) in output.iter_mut().enumerate() {
        *value = (0..3).map(|row| vector[row] * matrix[row][col]).sum();
    }
    output
}

pub fn norm3(vector: [f64; 3]) -> f64 {
    vector.iter().map(|component| component * component).sum::<f64>().sqrt()
}

fn validate_square_shape(matrix: &DenseRealMatrix) -> Result<usize, LuError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if rows != cols {
        return Err(LuError::NonSquareMatrix { rows, cols });
    }

    Ok(rows)
}

fn select_pivot_row(matrix: &DenseRealMatrix, pivot_col: usize) -> (usize, f64) {
    let dimension = matrix.nrows();
    let mut best_row = pivot_col;
    let mut best_abs = matrix[(pivot_col, pivot_col)].abs();

    for row in (pivot_col + 1)..dimension {
        let candidate = matrix[(row, pivot_col)].abs();
        if candidate > best_abs {
            best_abs = candidate;
            best_row = row;
        }
    }

    (best_row, best_abs)
}

fn swap_rows(matrix: &mut DenseRealMatrix, lhs: usize, rhs: usize) {
    if lhs == rhs {
        return;
    }

    for col in 0..matrix.ncols() {
        let value = matrix[(lhs, col)];
        matrix[(lhs, col)] = matrix[(rhs, col)];
        matrix[(rhs, col)] = value;
    }
}
