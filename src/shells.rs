use serde::{
    Serialize,
    Deserialize,
};


/// Orbital shell on one atomic site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shell {
    pub atom: usize,
    pub sort: usize,
    pub l:    usize,
    pub dim:  usize,
}


/// Correlated shell as declared in the `.inp` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedShell {
    pub atom: usize,
    pub sort: usize,
    pub l:    usize,
    pub dim:  usize,
    /// Spin-orbit flag, must be 0 since spin-orbit coupling is not handled.
    pub so:   usize,
    pub irep: usize,
}

impl CorrelatedShell {
    pub fn to_shell(&self) -> Shell {
        Shell {
            atom: self.atom,
            sort: self.sort,
            l:    self.l,
            dim:  self.dim,
        }
    }

    /// Dimension of the placeholder symmetry matrix T, (2l+1)(SO+1).
    pub fn t_dim(&self) -> usize {
        (2 * self.l + 1) * (self.so + 1)
    }
}


pub fn total_dim(shells: &[CorrelatedShell]) -> usize {
    shells.iter().map(|s| s.dim).sum()
}

pub fn max_dim(shells: &[CorrelatedShell]) -> usize {
    shells.iter().map(|s| s.dim).max().unwrap_or(0)
}


/// Partition of correlated shells into classes of equivalent shells.
///
/// Shells are equivalent if they share both `sort` and `l`. The first shell of a class
/// is its representative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellEquivalence {
    pub n_inequiv_shells: usize,
    pub corr_to_inequiv:  Vec<usize>,
    pub inequiv_to_corr:  Vec<usize>,
}

impl ShellEquivalence {
    pub fn detect(shells: &[CorrelatedShell]) -> Self {
        let mut corr_to_inequiv = Vec::with_capacity(shells.len());
        let mut inequiv_to_corr: Vec<usize> = vec![];

        for (ish, sh) in shells.iter().enumerate() {
            let found = inequiv_to_corr.iter()
                .position(|&rep| shells[rep].sort == sh.sort && shells[rep].l == sh.l);
            match found {
                Some(iineq) => corr_to_inequiv.push(iineq),
                None => {
                    corr_to_inequiv.push(inequiv_to_corr.len());
                    inequiv_to_corr.push(ish);
                },
            }
        }

        Self {
            n_inequiv_shells: inequiv_to_corr.len(),
            corr_to_inequiv,
            inequiv_to_corr,
        }
    }

    /// For each shell, index of the representative shell of its class.
    pub fn shells_map(&self) -> Vec<usize> {
        self.corr_to_inequiv.iter()
            .map(|&i| self.inequiv_to_corr[i])
            .collect()
    }

    /// Number of shells in the class of shell `ish`.
    pub fn class_size(&self, ish: usize) -> usize {
        let class = self.corr_to_inequiv[ish];
        self.corr_to_inequiv.iter().filter(|&&c| c == class).count()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn shell(atom: usize, sort: usize, l: usize, dim: usize) -> CorrelatedShell {
        CorrelatedShell { atom, sort, l, dim, so: 0, irep: 0 }
    }

    #[test]
    fn test_detect_equivalence() {
        let shells = vec![
            shell(0, 0, 2, 3),
            shell(1, 1, 2, 5),
            shell(2, 0, 2, 3),
            shell(3, 0, 1, 3),
        ];
        let eq = ShellEquivalence::detect(&shells);
        assert_eq!(eq.n_inequiv_shells, 3);
        assert_eq!(eq.corr_to_inequiv, vec![0, 1, 0, 2]);
        assert_eq!(eq.inequiv_to_corr, vec![0, 1, 3]);
        assert_eq!(eq.shells_map(), vec![0, 1, 0, 3]);
        assert_eq!(eq.class_size(2), 2);
        assert_eq!(eq.class_size(1), 1);
    }

    #[test]
    fn test_dims() {
        let shells = vec![shell(0, 0, 2, 3), shell(1, 1, 3, 7)];
        assert_eq!(total_dim(&shells), 10);
        assert_eq!(max_dim(&shells), 7);
        assert_eq!(shells[1].t_dim(), 7);
        assert_eq!(shells[0].to_shell(), Shell { atom: 0, sort: 0, l: 2, dim: 3 });
    }
}
