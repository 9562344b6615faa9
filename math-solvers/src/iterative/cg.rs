//! CG (Conjugate Gradient) solver
//!
//! The Conjugate Gradient method for symmetric positive definite systems,
//! optionally preconditioned with the inverse diagonal (Jacobi).

use crate::traits::{ComplexField, LinearOperator};
use ndarray::Array1;

/// CG solver configuration
#[derive(Debug, Clone)]
pub struct CgConfig {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Relative tolerance for convergence
    pub tolerance: f64,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            print_interval: 0,
        }
    }
}

/// CG solver result
#[derive(Debug)]
pub struct CgSolution<T: ComplexField> {
    /// Solution vector
    pub x: Array1<T>,
    /// Number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether convergence was achieved
    pub converged: bool,
}

/// Solve Ax = b using the Conjugate Gradient method
///
/// When `diagonal` is given, the diagonal of `A` is used as a Jacobi
/// preconditioner. Only correct for symmetric (Hermitian) positive definite
/// operators.
pub fn cg<T, A>(
    operator: &A,
    b: &Array1<T>,
    diagonal: Option<&Array1<T>>,
    config: &CgConfig,
) -> CgSolution<T>
where
    T: ComplexField,
    A: LinearOperator<T>,
{
    let n = b.len();
    let mut x = Array1::from_elem(n, T::zero());

    let b_norm = vector_norm(b);
    if b_norm < 1e-300 {
        return CgSolution {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let inv_diag: Option<Array1<T>> = diagonal.map(|d| {
        d.mapv(|v| {
            if v.norm() > 0.0 {
                v.inv()
            } else {
                T::one()
            }
        })
    });
    let precondition = |r: &Array1<T>| match &inv_diag {
        Some(m) => r * m,
        None => r.clone(),
    };

    let mut r = b.clone();
    let mut z = precondition(&r);
    let mut p = z.clone();
    let mut rho = inner_product(&r, &z);

    for iter in 0..config.max_iterations {
        let q = operator.apply(&p);

        let pq = inner_product(&p, &q);
        if pq.norm() < 1e-300 {
            return CgSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }

        let alpha = rho / pq;
        x.scaled_add(alpha, &p);
        r.scaled_add(-alpha, &q);

        let rel_residual = vector_norm(&r) / b_norm;

        if config.print_interval > 0 && (iter + 1) % config.print_interval == 0 {
            log::info!(
                "CG iteration {}: relative residual = {:.6e}",
                iter + 1,
                rel_residual
            );
        }

        if rel_residual < config.tolerance {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: true,
            };
        }

        z = precondition(&r);
        let rho_new = inner_product(&r, &z);
        if rho.norm() < 1e-300 {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: false,
            };
        }

        let beta = rho_new / rho;
        rho = rho_new;
        p = &z + &p.mapv(|pi| pi * beta);
    }

    CgSolution {
        residual: vector_norm(&r) / b_norm,
        x,
        iterations: config.max_iterations,
        converged: false,
    }
}

#[inline]
fn inner_product<T: ComplexField>(x: &Array1<T>, y: &Array1<T>) -> T {
    x.iter()
        .zip(y.iter())
        .fold(T::zero(), |acc, (&xi, &yi)| acc + xi.conj() * yi)
}

#[inline]
fn vector_norm<T: ComplexField>(x: &Array1<T>) -> f64 {
    x.iter().map(|xi| xi.norm_sqr()).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::CsrMatrix;
    use ndarray::array;

    fn laplacian_1d(n: usize) -> CsrMatrix<f64> {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, triplets)
    }

    #[test]
    fn test_cg_spd() {
        let a = CsrMatrix::from_triplets(
            2,
            2,
            vec![(0, 0, 4.0_f64), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)],
        );
        let b = array![1.0_f64, 2.0];

        let solution = cg(&a, &b, None, &CgConfig::default());

        assert!(solution.converged, "CG should converge for SPD matrix");
        let ax = a.matvec(&solution.x);
        let error: f64 = (&ax - &b).iter().map(|e| e * e).sum::<f64>().sqrt();
        assert!(error < 1e-8, "Solution should satisfy Ax = b");
    }

    #[test]
    fn test_jacobi_preconditioned() {
        let a = laplacian_1d(50);
        let b = Array1::from_iter((0..50).map(|i| (i as f64 * 0.3).sin()));
        let diag = a.diagonal();

        let plain = cg(&a, &b, None, &CgConfig::default());
        let jacobi = cg(&a, &b, Some(&diag), &CgConfig::default());

        assert!(plain.converged);
        assert!(jacobi.converged);
        for i in 0..50 {
            assert!((plain.x[i] - jacobi.x[i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_cg_identity() {
        let n = 5;
        let id: CsrMatrix<f64> = CsrMatrix::identity(n);
        let b = Array1::from_iter((1..=n).map(|i| i as f64));

        let solution = cg(&id, &b, None, &CgConfig::default());

        assert!(solution.converged);
        assert!(solution.iterations <= 2);
        let error: f64 = (&solution.x - &b).iter().map(|e| e * e).sum::<f64>().sqrt();
        assert!(error < 1e-10);
    }

    #[test]
    fn test_iteration_cap() {
        let a = laplacian_1d(40);
        let b = Array1::from_elem(40, 1.0);
        let config = CgConfig {
            max_iterations: 3,
            ..Default::default()
        };
        let solution = cg(&a, &b, None, &config);
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 3);
    }
}
