use nalgebra::Vector2;

/// Symmetric matrix stored as its lower band: `data[i * (bw + 1) + k] = A[i][i - k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricBand {
    n: usize,
    bw: usize,
    data: Vec<f64>,
}

impl SymmetricBand {
    pub fn zeros(n: usize, bw: usize) -> Self {
        Self {
            n,
            bw,
            data: vec![0.0; n * (bw + 1)],
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        debug_assert!(i - j <= self.bw, "({i}, {j}) is outside the band");
        i * (self.bw + 1) + (i - j)
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i.abs_diff(j) > self.bw {
            return 0.0;
        }
        self.data[self.index(i, j)]
    }

    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.data[idx] += value;
    }

    pub fn trace(&self) -> f64 {
        (0..self.n).map(|i| self.get(i, i)).sum()
    }

    /// `self + factor * other`, both of the same size.
    pub fn plus_scaled(&self, other: &SymmetricBand, factor: f64) -> SymmetricBand {
        let bw = self.bw.max(other.bw);
        let mut res = SymmetricBand::zeros(self.n, bw);
        for i in 0..self.n {
            for j in i.saturating_sub(bw)..=i {
                res.add(i, j, self.get(i, j) + factor * other.get(i, j));
            }
        }
        res
    }

    pub fn cholesky(&self) -> Option<BandCholesky> {
        let bw = self.bw;
        let mut l = SymmetricBand::zeros(self.n, bw);

        for i in 0..self.n {
            let first = i.saturating_sub(bw);
            for j in first..=i {
                let mut sum = self.get(i, j);
                for k in first..j {
                    sum -= l.get(i, k) * l.get(j, k);
                }

                if i == j {
                    let pivot_floor = f64::EPSILON * self.get(i, i).abs();
                    if !sum.is_finite() || sum <= pivot_floor {
                        return None;
                    }
                    l.add(i, i, sum.sqrt());
                } else {
                    l.add(i, j, sum / l.get(j, j));
                }
            }
        }

        Some(BandCholesky { l })
    }
}

/// Lower factor `L` with `A = L Lᵀ`.
#[derive(Debug, Clone)]
pub struct BandCholesky {
    l: SymmetricBand,
}

impl BandCholesky {
    pub fn solve(&self, rhs: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
        let n = self.l.n;
        let bw = self.l.bw;
        debug_assert_eq!(rhs.len(), n);

        // L z = b
        let mut z = vec![Vector2::zeros(); n];
        for i in 0..n {
            let mut acc = rhs[i];
            for k in i.saturating_sub(bw)..i {
                acc -= z[k] * self.l.get(i, k);
            }
            z[i] = acc / self.l.get(i, i);
        }

        // Lᵀ x = z
        let mut x = vec![Vector2::zeros(); n];
        for i in (0..n).rev() {
            let mut acc = z[i];
            for k in (i + 1)..(i + bw + 1).min(n) {
                acc -= x[k] * self.l.get(k, i);
            }
            x[i] = acc / self.l.get(i, i);
        }

        x
    }
}
