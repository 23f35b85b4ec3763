//! Reverse communication seam
//!
//! After a pass with Newton's third law applied across process boundaries,
//! contributions written into ghost slots must be added back into the
//! owning particles. Across processes that is the host's job; [`GhostFold`]
//! covers ghosts that are periodic images owned by this same process.

/// Folds ghost contributions back to their owners.
pub trait ReverseComm {
    fn reverse_scalar(&mut self, buffer: &mut [f64]);
    fn reverse_vector(&mut self, buffer: &mut [[f64; 3]]);
}

/// Single-process reverse communication: every ghost slot is added into its
/// owning local slot, then cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GhostFold {
    /// (ghost, owner), kept sorted by ghost index
    pairs: Vec<(usize, usize)>,
}

impl GhostFold {
    /// No ghosts: folding is a no-op.
    pub fn none() -> Self {
        Self::default()
    }

    /// Declare `ghost` as a copy of local particle `owner`.
    pub fn with_ghost(mut self, ghost: usize, owner: usize) -> Self {
        match self.pairs.binary_search_by_key(&ghost, |&(g, _)| g) {
            Ok(pos) => self.pairs[pos].1 = owner,
            Err(pos) => self.pairs.insert(pos, (ghost, owner)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl ReverseComm for GhostFold {
    fn reverse_scalar(&mut self, buffer: &mut [f64]) {
        for &(ghost, owner) in &self.pairs {
            if ghost < buffer.len() && owner < buffer.len() {
                buffer[owner] += buffer[ghost];
                buffer[ghost] = 0.0;
            }
        }
    }

    fn reverse_vector(&mut self, buffer: &mut [[f64; 3]]) {
        for &(ghost, owner) in &self.pairs {
            if ghost < buffer.len() && owner < buffer.len() {
                let g = buffer[ghost];
                for (dst, src) in buffer[owner].iter_mut().zip(g) {
                    *dst += src;
                }
                buffer[ghost] = [0.0; 3];
            }
        }
    }
}
