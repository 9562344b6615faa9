//! Element and global stiffness for linear triangles
//!
//! For a P1 triangle the gradient of each hat function is constant, so the
//! local matrix is `K_e = s·sᵀ / (4·A)` where row `i` of `s` is the edge
//! vector opposite vertex `i` and `A` the element area.

use math_eit_mesh::Mesh;
use math_eit_solvers::{ComplexField, CsrMatrix};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Local 3x3 stiffness of one triangle
pub type ElementStiffness = [[f64; 3]; 3];

/// Closed-form stiffness of the triangle with vertices `xy`
pub fn element_stiffness(xy: [[f64; 2]; 3]) -> ElementStiffness {
    // edge vectors opposite vertex 0, 1, 2
    let s = [
        [xy[2][0] - xy[1][0], xy[2][1] - xy[1][1]],
        [xy[0][0] - xy[2][0], xy[0][1] - xy[2][1]],
        [xy[1][0] - xy[0][0], xy[1][1] - xy[0][1]],
    ];
    let area = 0.5 * (s[0][0] * s[1][1] - s[0][1] * s[1][0]);

    let mut ke = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            ke[i][j] = (s[i][0] * s[j][0] + s[i][1] * s[j][1]) / (4.0 * area);
        }
    }
    ke
}

fn element_coords(mesh: &Mesh, elem: usize) -> [[f64; 2]; 3] {
    mesh.element_points(elem).map(|p| [p.x, p.y])
}

/// Local stiffness of every element
pub fn compute_ke(mesh: &Mesh) -> Vec<ElementStiffness> {
    #[cfg(feature = "parallel")]
    {
        (0..mesh.num_elements())
            .into_par_iter()
            .map(|e| element_stiffness(element_coords(mesh, e)))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..mesh.num_elements())
            .map(|e| element_stiffness(element_coords(mesh, e)))
            .collect()
    }
}

/// Global stiffness `Σ perm_e·K_e`, with `ref_node` grounded.
///
/// The reference row and column are replaced by the identity so the
/// Neumann problem has a unique solution.
pub fn assemble<T: ComplexField>(
    elements: &[[usize; 3]],
    ke: &[ElementStiffness],
    perm: &[T],
    n_nodes: usize,
    ref_node: usize,
) -> CsrMatrix<T> {
    let mut triplets = Vec::with_capacity(9 * elements.len());
    for ((tri, k), &p) in elements.iter().zip(ke).zip(perm) {
        for i in 0..3 {
            for j in 0..3 {
                triplets.push((tri[i], tri[j], p * T::from_real(k[i][j])));
            }
        }
    }
    let mut matrix = CsrMatrix::from_triplets(n_nodes, n_nodes, triplets);
    matrix.pin_dof(ref_node);
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use math_eit_mesh::layer_circle;
    use num_complex::Complex64;

    #[test]
    fn test_reference_triangle() {
        let ke = element_stiffness([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let expected = [[1.0, -0.5, -0.5], [-0.5, 0.5, 0.0], [-0.5, 0.0, 0.5]];
        for i in 0..3 {
            for j in 0..3 {
                assert!((ke[i][j] - expected[i][j]).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_rows_sum_to_zero_and_symmetric() {
        let ke = element_stiffness([[0.3, -0.2], [1.1, 0.4], [-0.5, 0.9]]);
        for i in 0..3 {
            let row: f64 = ke[i].iter().sum();
            assert!(row.abs() < 1e-12);
            for j in 0..3 {
                assert!((ke[i][j] - ke[j][i]).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_scale_invariance() {
        let small = element_stiffness([[0.0, 0.0], [1.0, 0.0], [0.2, 0.7]]);
        let large = element_stiffness([[0.0, 0.0], [10.0, 0.0], [2.0, 7.0]]);
        for i in 0..3 {
            for j in 0..3 {
                assert!((small[i][j] - large[i][j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_global_assembly() {
        let (mesh, _) = layer_circle(8, 4, 2).expect("mesh");
        let ke = compute_ke(&mesh);
        let perm = vec![1.0; mesh.num_elements()];
        let k = assemble(&mesh.elements, &ke, &perm, mesh.num_nodes(), 0);
        let dense = k.to_dense();

        let n = mesh.num_nodes();
        for i in 0..n {
            for j in 0..n {
                assert!((dense[[i, j]] - dense[[j, i]]).abs() < 1e-12);
            }
        }
        assert_eq!(dense[[0, 0]], 1.0);
        for j in 1..n {
            assert_eq!(dense[[0, j]], 0.0);
        }
        // rows not coupled to the reference node still sum to zero
        let coupled: Vec<usize> = mesh
            .elements
            .iter()
            .filter(|tri| tri.contains(&0))
            .flatten()
            .copied()
            .collect();
        for i in 1..n {
            if !coupled.contains(&i) {
                let row: f64 = dense.row(i).sum();
                assert!(row.abs() < 1e-12, "row {i} sums to {row}");
            }
        }
    }

    #[test]
    fn test_complex_assembly_scales_by_perm() {
        let (mesh, _) = layer_circle(8, 4, 2).expect("mesh");
        let ke = compute_ke(&mesh);
        let perm = vec![Complex64::new(2.0, 0.5); mesh.num_elements()];
        let k = assemble(&mesh.elements, &ke, &perm, mesh.num_nodes(), 0);
        let real = assemble(
            &mesh.elements,
            &ke,
            &vec![1.0; mesh.num_elements()],
            mesh.num_nodes(),
            0,
        );
        let (kd, rd) = (k.to_dense(), real.to_dense());
        for i in 1..mesh.num_nodes() {
            for j in 1..mesh.num_nodes() {
                let expected = Complex64::new(2.0, 0.5) * rd[[i, j]];
                assert!((kd[[i, j]] - expected).norm() < 1e-12);
            }
        }
    }
}
