//! EIT forward model
//!
//! Solves the point-electrode Neumann problem
//! `K(σ)·f = b` for every stimulation line and derives boundary voltages and
//! the sensitivity (Jacobian) of each measurement to each element.
//!
//! `K` is symmetric, so `K⁻¹` is too: the potential generated by a unit
//! current at electrode `i` (row `i` of `r_el`) doubles as the lead field of
//! electrode `i`. One solve per electrode therefore serves every line.

use crate::error::{FemError, Result};
use crate::protocol::Protocol;
use crate::stiffness::{ElementStiffness, assemble, compute_ke};
use math_eit_mesh::{ElectrodeSet, Mesh};
use math_eit_solvers::{CgConfig, ComplexField, CsrMatrix, cg, lu_factorize};
use ndarray::{Array1, Array2, ArrayView1};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Linear solver used for the stiffness system
#[derive(Debug, Clone, Default)]
pub enum SolverKind {
    /// Dense LU factorization, one factorization per solve
    #[default]
    Direct,
    /// Jacobi-preconditioned conjugate gradient (real conductivity only)
    ConjugateGradient(CgConfig),
}

/// Result of a forward solve for a whole protocol
#[derive(Debug, Clone)]
pub struct ForwardSolution<T: ComplexField> {
    /// Boundary voltages, one per measurement, in protocol order
    pub v: Array1<T>,
    /// Sensitivity matrix, `n_measurements × n_elements`
    pub jac: Array2<T>,
    /// Smear matrix, `n_measurements × n_nodes`, entries 0 or 1
    pub b_matrix: Array2<f64>,
}

/// Per-line output before stacking
struct LineSolution<T> {
    v: Vec<T>,
    jac: Vec<Vec<T>>,
    smear: Vec<Vec<f64>>,
}

/// FEM forward solver bound to one mesh and electrode placement
#[derive(Debug, Clone)]
pub struct Forward {
    elements: Vec<[usize; 3]>,
    n_nodes: usize,
    electrodes: Vec<usize>,
    ke: Vec<ElementStiffness>,
    ref_node: usize,
    solver: SolverKind,
}

impl Forward {
    /// Cache element stiffness and choose the grounded node.
    ///
    /// The reference is the first node that is not an electrode.
    pub fn new(mesh: &Mesh, electrodes: &ElectrodeSet) -> Result<Self> {
        let ref_node = (0..mesh.num_nodes())
            .find(|n| !electrodes.contains(*n))
            .ok_or_else(|| {
                FemError::Configuration("every mesh node is an electrode".into())
            })?;
        let ke = compute_ke(mesh);
        log::debug!(
            "forward model: {} nodes, {} elements, reference node {}",
            mesh.num_nodes(),
            mesh.num_elements(),
            ref_node
        );
        Ok(Self {
            elements: mesh.elements.clone(),
            n_nodes: mesh.num_nodes(),
            electrodes: electrodes.as_slice().to_vec(),
            ke,
            ref_node,
            solver: SolverKind::Direct,
        })
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn ref_node(&self) -> usize {
        self.ref_node
    }

    pub fn num_electrodes(&self) -> usize {
        self.electrodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn element_stiffness(&self) -> &[ElementStiffness] {
        &self.ke
    }

    fn check_perm<T: ComplexField>(&self, perm: &[T]) -> Result<()> {
        if perm.len() != self.elements.len() {
            return Err(FemError::DimensionMismatch {
                what: "element permittivity",
                expected: self.elements.len(),
                actual: perm.len(),
            });
        }
        if perm.iter().any(|p| !p.is_finite()) {
            return Err(FemError::NonFinite);
        }
        Ok(())
    }

    fn stiffness<T: ComplexField>(&self, perm: &[T]) -> CsrMatrix<T> {
        assemble(&self.elements, &self.ke, perm, self.n_nodes, self.ref_node)
    }

    /// Solve `K·X = B` for the columns of `rhs` (`n_nodes × k`)
    fn solve_columns<T: ComplexField>(
        &self,
        k: &CsrMatrix<T>,
        rhs: &Array2<T>,
    ) -> Result<Array2<T>> {
        let x = match &self.solver {
            SolverKind::Direct => lu_factorize(&k.to_dense())?.solve_matrix(rhs)?,
            SolverKind::ConjugateGradient(config) => {
                let diagonal = k.diagonal();
                let mut x = Array2::from_elem(rhs.raw_dim(), T::zero());
                for (j, col) in rhs.columns().into_iter().enumerate() {
                    let solution = cg(k, &col.to_owned(), Some(&diagonal), config);
                    if !solution.converged {
                        return Err(FemError::ConvergenceFailure {
                            iterations: solution.iterations,
                            residual: solution.residual,
                        });
                    }
                    x.column_mut(j).assign(&solution.x);
                }
                x
            }
        };
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FemError::NonFinite);
        }
        Ok(x)
    }

    fn check_solver<T: ComplexField>(&self, perm: &[T]) -> Result<()> {
        if matches!(self.solver, SolverKind::ConjugateGradient(_))
            && perm.iter().any(|p| p.im() != 0.0)
        {
            return Err(FemError::Configuration(
                "conjugate gradient requires a real conductivity".into(),
            ));
        }
        Ok(())
    }

    /// Lead fields: row `i` is the node potential for a unit current at
    /// electrode `i`
    fn electrode_responses<T: ComplexField>(&self, perm: &[T]) -> Result<Array2<T>> {
        let k = self.stiffness(perm);
        let mut rhs = Array2::from_elem((self.n_nodes, self.electrodes.len()), T::zero());
        for (i, &node) in self.electrodes.iter().enumerate() {
            rhs[[node, i]] = T::one();
        }
        Ok(self.solve_columns(&k, &rhs)?.reversed_axes())
    }

    /// Node potentials for a single driven pair of electrodes
    pub fn solve<T: ComplexField>(&self, line: [usize; 2], perm: &[T]) -> Result<Array1<T>> {
        self.check_perm(perm)?;
        self.check_solver(perm)?;
        let n_el = self.electrodes.len();
        if line[0] >= n_el || line[1] >= n_el {
            return Err(FemError::Configuration(format!(
                "line ({}, {}) exceeds {n_el} electrodes",
                line[0], line[1]
            )));
        }
        let k = self.stiffness(perm);
        let mut rhs = Array2::from_elem((self.n_nodes, 1), T::zero());
        rhs[[self.electrodes[line[0]], 0]] = T::one();
        rhs[[self.electrodes[line[1]], 0]] = -T::one();
        let x = self.solve_columns(&k, &rhs)?;
        Ok(x.column(0).to_owned())
    }

    /// Voltages, Jacobian and smear matrix for every line of `protocol`
    pub fn solve_eit<T: ComplexField>(
        &self,
        protocol: &Protocol,
        perm: &[T],
    ) -> Result<ForwardSolution<T>> {
        self.check_perm(perm)?;
        self.check_solver(perm)?;
        if protocol.n_el != self.electrodes.len() {
            return Err(FemError::DimensionMismatch {
                what: "protocol electrodes",
                expected: self.electrodes.len(),
                actual: protocol.n_el,
            });
        }

        let start = Instant::now();
        let r_el = self.electrode_responses(perm)?;

        let lines: Vec<usize> = (0..protocol.pattern.len()).collect();
        #[cfg(feature = "parallel")]
        let per_line: Vec<LineSolution<T>> = lines
            .par_iter()
            .map(|&i| self.solve_line(protocol, i, &r_el))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let per_line: Vec<LineSolution<T>> = lines
            .iter()
            .map(|&i| self.solve_line(protocol, i, &r_el))
            .collect();

        let n_meas: usize = per_line.iter().map(|l| l.v.len()).sum();
        let n_elems = self.elements.len();
        let mut v = Array1::from_elem(n_meas, T::zero());
        let mut jac = Array2::from_elem((n_meas, n_elems), T::zero());
        let mut b_matrix = Array2::zeros((n_meas, self.n_nodes));
        let mut row = 0;
        for line in per_line {
            for ((vi, jrow), brow) in line.v.into_iter().zip(line.jac).zip(line.smear) {
                v[row] = vi;
                jac.row_mut(row).assign(&Array1::from(jrow));
                b_matrix.row_mut(row).assign(&Array1::from(brow));
                row += 1;
            }
        }

        log::info!(
            "forward solve: {} lines, {} measurements, {} elements in {:.2?}",
            protocol.pattern.len(),
            n_meas,
            n_elems,
            start.elapsed()
        );
        Ok(ForwardSolution { v, jac, b_matrix })
    }

    fn solve_line<T: ComplexField>(
        &self,
        protocol: &Protocol,
        line: usize,
        r_el: &Array2<T>,
    ) -> LineSolution<T> {
        let [a, b] = protocol.pattern.lines()[line];
        let f = &r_el.row(a) - &r_el.row(b);
        let f_el: Vec<T> = self.electrodes.iter().map(|&n| f[n]).collect();

        // sensitivity of each electrode's potential to each element
        let jac_el: Vec<Vec<T>> = (0..self.electrodes.len())
            .map(|i| self.element_sensitivity(r_el.row(i), f.view()))
            .collect();

        let pairs = protocol.pairs(line);
        let mut out = LineSolution {
            v: Vec::with_capacity(pairs.len()),
            jac: Vec::with_capacity(pairs.len()),
            smear: Vec::with_capacity(pairs.len()),
        };
        for [n, m] in pairs {
            out.v.push(f_el[n] - f_el[m]);
            out.jac.push(
                jac_el[n]
                    .iter()
                    .zip(&jac_el[m])
                    .map(|(&jn, &jm)| jn - jm)
                    .collect(),
            );
            out.smear.push(smear(f.view(), f_el[n], f_el[m]));
        }
        out
    }

    /// `r[tri]ᵀ · K_e · f[tri]` for every element
    fn element_sensitivity<T: ComplexField>(
        &self,
        r: ArrayView1<'_, T>,
        f: ArrayView1<'_, T>,
    ) -> Vec<T> {
        self.elements
            .iter()
            .zip(&self.ke)
            .map(|(tri, ke)| {
                let mut acc = T::zero();
                for i in 0..3 {
                    for j in 0..3 {
                        acc += r[tri[i]] * T::from_real(ke[i][j]) * f[tri[j]];
                    }
                }
                acc
            })
            .collect()
    }
}

/// Nodes whose (real) potential lies between the two measured potentials
fn smear<T: ComplexField>(f: ArrayView1<'_, T>, v_n: T, v_m: T) -> Vec<f64> {
    let lo = v_n.re().min(v_m.re());
    let hi = v_n.re().max(v_m.re());
    f.iter()
        .map(|x| if lo < x.re() && x.re() <= hi { 1.0 } else { 0.0 })
        .collect()
}
