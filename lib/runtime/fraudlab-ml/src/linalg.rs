use ndarray::{Array1, Array2};

use crate::error::MlError;

/// Solves `a · x = b` for symmetric positive definite `a` via its Cholesky
/// factor `a = l · lᵀ`. Only the lower triangle of `a` is read.
pub(crate) fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, MlError> {
    let l = cholesky(a)?;
    let n = b.len();

    // l · y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let head: f64 = (0..i).map(|k| l[[i, k]] * y[k]).sum();
        y[i] = (b[i] - head) / l[[i, i]];
    }
    // lᵀ · x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|k| l[[k, i]] * x[k]).sum();
        x[i] = (y[i] - tail) / l[[i, i]];
    }
    Ok(x)
}

fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, MlError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(MlError::Singular);
    }
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let diag = a[[j, j]] - (0..j).map(|k| l[[j, k]] * l[[j, k]]).sum::<f64>();
        if !diag.is_finite() || diag <= 0.0 {
            return Err(MlError::Singular);
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;
        for i in (j + 1)..n {
            let dot: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            l[[i, j]] = (a[[i, j]] - dot) / pivot;
        }
    }
    Ok(l)
}
