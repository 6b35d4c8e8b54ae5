//! Support-graph algorithms for non-negative square matrices.
//!
//! Purpose
//! -------
//! Answer the purely combinatorial questions about a matrix `M` (which
//! entries are non-zero, not how large they are): strong connectivity,
//! strongly connected components, periods of classes and primitivity.
//!
//! Key behaviors
//! -------------
//! - The graph has an edge `j → i` whenever `m_ij ≠ 0` (class `j` contributes
//!   to class `i` at the next step).
//! - [`strongly_connected_components`] runs Tarjan's algorithm and returns
//!   the components in topological order (a component only feeds components
//!   listed after it), each sorted increasingly.
//! - [`periods`] derives the period of each component from breadth-first
//!   levels, so it is exact for any dimension.
//! - [`is_primitive`] uses Wielandt's bound `n² − 2n + 2`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are square; entries are only compared against zero.
//!
//! Testing notes
//! -------------
//! - Unit tests use small matrices whose components, normal forms and periods
//!   can be read off by hand.
use ndarray::Array2;

use crate::linalg::numeric::gcd;

/// Boolean support `m ≠ 0`.
pub fn support(m: &Array2<f64>) -> Array2<bool> {
    m.mapv(|x| x != 0.0)
}

fn bool_product(x: &Array2<bool>, y: &Array2<bool>) -> Array2<bool> {
    let n = x.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| (0..n).any(|k| x[[i, k]] && y[[k, j]]))
}

/// Boolean `B^k` by binary exponentiation (`B^0 = I`).
pub fn bool_power(b: &Array2<bool>, mut k: usize) -> Array2<bool> {
    let n = b.nrows();
    let mut result = Array2::from_shape_fn((n, n), |(i, j)| i == j);
    let mut base = b.clone();
    while k > 0 {
        if k & 1 == 1 {
            result = bool_product(&result, &base);
        }
        k >>= 1;
        if k > 0 {
            base = bool_product(&base, &base);
        }
    }
    result
}

/// Whether the support graph is strongly connected (for dimension 1, whether
/// the single entry is non-zero).
pub fn is_irreducible(m: &Array2<f64>) -> bool {
    let n = m.nrows();
    if n == 1 {
        return m[[0, 0]] != 0.0;
    }
    strongly_connected_components(m).len() == 1
}

/// Whether some power of `m` is entrywise positive.
pub fn is_primitive(m: &Array2<f64>) -> bool {
    let n = m.nrows();
    let exponent = n * n + 2 - 2 * n;
    bool_power(&support(m), exponent).iter().all(|&x| x)
}

struct Tarjan<'a> {
    m: &'a Array2<f64>,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl Tarjan<'_> {
    fn open(&mut self, v: usize) {
        self.index[v] = Some(self.next_index);
        self.lowlink[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }

    /// Depth-first search from `root` with an explicit call stack of
    /// `(vertex, next successor to examine)` frames.
    fn visit(&mut self, root: usize) {
        let n = self.m.nrows();
        self.open(root);
        let mut frames = vec![(root, 0usize)];
        while let Some(frame) = frames.last_mut() {
            let (v, next) = *frame;
            if let Some(w) = (next..n).find(|&w| self.m[[w, v]] != 0.0) {
                frame.1 = w + 1;
                match self.index[w] {
                    None => {
                        self.open(w);
                        frames.push((w, 0));
                    }
                    Some(w_index) if self.on_stack[w] => {
                        self.lowlink[v] = self.lowlink[v].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[v]);
            }
            if Some(self.lowlink[v]) == self.index[v] {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                self.components.push(component);
            }
        }
    }
}

/// Strongly connected components in topological order.
pub fn strongly_connected_components(m: &Array2<f64>) -> Vec<Vec<usize>> {
    let n = m.nrows();
    let mut tarjan = Tarjan {
        m,
        index: vec![None; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::with_capacity(n),
        next_index: 0,
        components: Vec::new(),
    };
    for v in 0..n {
        if tarjan.index[v].is_none() {
            tarjan.visit(v);
        }
    }
    // Tarjan emits sinks first.
    tarjan.components.reverse();
    tarjan.components
}

/// Principal submatrix on `classes`.
pub fn submatrix(m: &Array2<f64>, classes: &[usize]) -> Array2<f64> {
    let k = classes.len();
    Array2::from_shape_fn((k, k), |(i, j)| m[[classes[i], classes[j]]])
}

/// Irreducible components as `(submatrices, classes)`, dropping single
/// classes without a self-loop.
pub fn irreducible_components(m: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Vec<usize>>) {
    let classes: Vec<Vec<usize>> = strongly_connected_components(m)
        .into_iter()
        .filter(|c| !(c.len() == 1 && m[[c[0], c[0]]] == 0.0))
        .collect();
    let blocks = classes.iter().map(|c| submatrix(m, c)).collect();
    (blocks, classes)
}

/// Block lower-triangular reordering of `m` and its permutation.
pub fn normal_form(m: &Array2<f64>) -> (Array2<f64>, Vec<usize>) {
    let permutation: Vec<usize> =
        strongly_connected_components(m).into_iter().flatten().collect();
    (submatrix(m, &permutation), permutation)
}

/// Period of every class; `None` for classes on no cycle.
///
/// Notes
/// -----
/// - Within a strongly connected component, a breadth-first search assigns
///   levels and the period is the gcd of `level(u) + 1 − level(v)` over the
///   component's edges `u → v`; every class of the component shares it.
pub fn periods(m: &Array2<f64>) -> Vec<Option<usize>> {
    let n = m.nrows();
    let mut result = vec![None; n];
    for component in strongly_connected_components(m) {
        let mut member = vec![false; n];
        for &c in &component {
            member[c] = true;
        }
        let mut level: Vec<Option<usize>> = vec![None; n];
        let mut queue = std::collections::VecDeque::from([component[0]]);
        level[component[0]] = Some(0);
        while let Some(u) = queue.pop_front() {
            let lu = level[u].unwrap_or(0);
            for v in 0..n {
                if member[v] && m[[v, u]] != 0.0 && level[v].is_none() {
                    level[v] = Some(lu + 1);
                    queue.push_back(v);
                }
            }
        }
        let mut g = 0usize;
        for &u in &component {
            for &v in &component {
                if m[[v, u]] != 0.0 {
                    let (lu, lv) = (level[u].unwrap_or(0), level[v].unwrap_or(0));
                    g = gcd(g, (lu + 1).abs_diff(lv));
                }
            }
        }
        if g > 0 {
            for &c in &component {
                result[c] = Some(g);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // ---- Scope ----
    // These tests cover:
    // - Component order, dropped trivial components, normal form permutation.
    // - Irreducibility, primitivity and periods on small hand-checked graphs.
    // - Component search on long chains with a small thread stack.

    #[test]
    // Purpose
    // -------
    // Components come out in topological order and trivial ones are dropped.
    //
    // Given
    // -----
    // - [[1,0,0,0],[2,0,3,0],[0,4,0,0],[0,0,5,0]]: a self-loop on 0 feeding
    //   the 2-cycle {1, 2}, which feeds the acyclic class 3.
    //
    // Expect
    // ------
    // - SCCs [[0], [1, 2], [3]]; irreducible classes [[0], [1, 2]].
    fn components_in_topological_order() {
        // Arrange
        let m = array![
            [1.0, 0.0, 0.0, 0.0],
            [2.0, 0.0, 3.0, 0.0],
            [0.0, 4.0, 0.0, 0.0],
            [0.0, 0.0, 5.0, 0.0]
        ];

        // Act
        let sccs = strongly_connected_components(&m);
        let (blocks, classes) = irreducible_components(&m);

        // Assert
        assert_eq!(sccs, vec![vec![0], vec![1, 2], vec![3]]);
        assert_eq!(classes, vec![vec![0], vec![1, 2]]);
        assert_eq!(blocks[1], array![[0.0, 3.0], [4.0, 0.0]]);
    }

    #[test]
    // Purpose
    // -------
    // The normal form groups each component contiguously.
    //
    // Given
    // -----
    // - [[1,0,2,0],[3,0,0,4],[5,0,0,0],[0,6,7,0]].
    //
    // Expect
    // ------
    // - Permutation [0, 2, 1, 3] and a zero upper-right block.
    fn normal_form_permutation() {
        // Arrange
        let m = array![
            [1.0, 0.0, 2.0, 0.0],
            [3.0, 0.0, 0.0, 4.0],
            [5.0, 0.0, 0.0, 0.0],
            [0.0, 6.0, 7.0, 0.0]
        ];

        // Act
        let (nf, perm) = normal_form(&m);

        // Assert
        assert_eq!(perm, vec![0, 2, 1, 3]);
        assert_eq!(nf[[0, 2]], 0.0);
        assert_eq!(nf[[0, 3]], 0.0);
        assert_eq!(nf[[1, 2]], 0.0);
        assert_eq!(nf[[1, 3]], 0.0);
        assert_eq!(nf[[1, 0]], 5.0);
    }

    #[test]
    // Purpose
    // -------
    // Irreducible but periodic versus primitive.
    //
    // Given
    // -----
    // - The 3-cycle permutation and a 3-cycle with one self-loop.
    //
    // Expect
    // ------
    // - Both irreducible; only the second primitive; periods 3 and 1.
    fn irreducible_primitive_and_periods() {
        // Arrange
        let cycle = array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let looped = array![[0.5, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

        // Act / Assert
        assert!(is_irreducible(&cycle));
        assert!(!is_primitive(&cycle));
        assert_eq!(periods(&cycle), vec![Some(3); 3]);
        assert!(is_irreducible(&looped));
        assert!(is_primitive(&looped));
        assert_eq!(periods(&looped), vec![Some(1); 3]);
    }

    #[test]
    // Purpose
    // -------
    // Dimension-one and acyclic edge cases.
    //
    // Given
    // -----
    // - [[0]], [[2]] and a strictly lower-triangular matrix.
    //
    // Expect
    // ------
    // - [[0]] reducible, [[2]] primitive, no periods for the acyclic matrix.
    fn degenerate_cases() {
        assert!(!is_irreducible(&array![[0.0]]));
        assert!(is_primitive(&array![[2.0]]));
        assert_eq!(periods(&array![[0.0, 0.0], [1.0, 0.0]]), vec![None, None]);
    }

    #[test]
    // Purpose
    // -------
    // Search depth is not limited by the thread stack.
    //
    // Given
    // -----
    // - A 2000-class chain 0 → 1 → … → 1999 (a Leslie survival diagonal),
    //   searched on a thread with a 64 KiB stack.
    //
    // Expect
    // ------
    // - 2000 singleton components in chain order; no stack overflow.
    fn long_chain_on_small_stack() {
        // Arrange
        let n = 2000;
        let mut m = Array2::<f64>::zeros((n, n));
        for i in 0..n - 1 {
            m[[i + 1, i]] = 0.9;
        }

        // Act
        let sccs = std::thread::Builder::new()
            .stack_size(64 * 1024)
            .spawn(move || strongly_connected_components(&m))
            .unwrap()
            .join()
            .unwrap();

        // Assert
        assert_eq!(sccs.len(), n);
        assert!(sccs.iter().enumerate().all(|(i, c)| c == &vec![i]));
    }
}
