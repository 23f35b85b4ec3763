//! Neighbor-list view
//!
//! The host builds and maintains the list; this module only reads it. Layout
//! is compressed rows: for every local particle `i` listed in `ilist`, its
//! neighbors are `neighbors[firstneigh[i]..firstneigh[i] + numneigh[i]]`.
//! History-tracking contact models also hand over one persistent contact flag
//! per neighbor slot.
//!
//! The top two bits of a neighbor index carry special-bond information and
//! must be masked off with [`NEIGHMASK`] before indexing particle arrays.

use crate::error::HeatGranError;

/// Mask removing the special-bond bits from a neighbor index.
pub const NEIGHMASK: u32 = 0x3FFF_FFFF;

/// How contact is decided for a neighbor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactDetection {
    /// Fresh geometric test every step
    Geometric,
    /// Persistent contact flag from the previous step, re-checked against geometry
    History,
}

#[inline]
pub fn mask_index(j: u32) -> usize {
    (j & NEIGHMASK) as usize
}

/// Borrowed half neighbor list.
#[derive(Debug, Clone, Copy)]
pub struct NeighborList<'a> {
    pub ilist: &'a [u32],
    /// Indexed by particle
    pub numneigh: &'a [u32],
    /// Indexed by particle, offset into `neighbors`
    pub firstneigh: &'a [usize],
    pub neighbors: &'a [u32],
    /// Parallel to `neighbors`; non-zero means "in contact last step"
    pub contact_flags: Option<&'a [u32]>,
}

impl<'a> NeighborList<'a> {
    #[inline]
    pub fn inum(&self) -> usize {
        self.ilist.len()
    }

    #[inline]
    pub fn detection(&self) -> ContactDetection {
        if self.contact_flags.is_some() {
            ContactDetection::History
        } else {
            ContactDetection::Geometric
        }
    }

    #[inline]
    fn range(&self, i: usize) -> std::ops::Range<usize> {
        let start = self.firstneigh[i];
        start..start + self.numneigh[i] as usize
    }

    #[inline]
    pub fn neighbors_of(&self, i: usize) -> &'a [u32] {
        &self.neighbors[self.range(i)]
    }

    #[inline]
    pub fn contact_flags_of(&self, i: usize) -> Option<&'a [u32]> {
        self.contact_flags.map(|flags| &flags[self.range(i)])
    }

    /// Bounds-check every row against the particle arrays.
    ///
    /// # Errors
    /// [`HeatGranError::BufferLength`] for short per-particle arrays or flags,
    /// [`HeatGranError::NeighborOutOfRange`] for rows or indices past `nall`.
    pub fn validate(&self, nlocal: usize, nall: usize) -> Result<(), HeatGranError> {
        if let Some(flags) = self.contact_flags {
            if flags.len() != self.neighbors.len() {
                return Err(HeatGranError::BufferLength {
                    buffer: "contact_flags",
                    expected: self.neighbors.len(),
                    actual: flags.len(),
                });
            }
        }
        for &i in self.ilist {
            let i = i as usize;
            if i >= nlocal || i >= self.numneigh.len() || i >= self.firstneigh.len() {
                return Err(HeatGranError::NeighborOutOfRange {
                    particle: i,
                    index: i,
                    nall: nlocal,
                });
            }
            let range = self.range(i);
            if range.end > self.neighbors.len() {
                return Err(HeatGranError::BufferLength {
                    buffer: "neighbors",
                    expected: range.end,
                    actual: self.neighbors.len(),
                });
            }
            if let Some(&bad) = self.neighbors[range]
                .iter()
                .find(|&&j| mask_index(j) >= nall)
            {
                return Err(HeatGranError::NeighborOutOfRange {
                    particle: i,
                    index: mask_index(bad),
                    nall,
                });
            }
        }
        Ok(())
    }
}

/// Owned neighbor list, built row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedNeighborList {
    ilist: Vec<u32>,
    numneigh: Vec<u32>,
    firstneigh: Vec<usize>,
    neighbors: Vec<u32>,
    contact_flags: Option<Vec<u32>>,
}

impl OwnedNeighborList {
    /// One row per local particle, in particle order.
    pub fn from_rows(rows: &[Vec<u32>]) -> Self {
        let mut list = Self::default();
        for (i, row) in rows.iter().enumerate() {
            list.ilist.push(i as u32);
            list.firstneigh.push(list.neighbors.len());
            list.numneigh.push(row.len() as u32);
            list.neighbors.extend_from_slice(row);
        }
        list
    }

    /// Rows of `(neighbor, in_contact_last_step)`.
    pub fn from_rows_with_history(rows: &[Vec<(u32, bool)>]) -> Self {
        let plain: Vec<Vec<u32>> = rows
            .iter()
            .map(|row| row.iter().map(|&(j, _)| j).collect())
            .collect();
        let mut list = Self::from_rows(&plain);
        list.contact_flags = Some(
            rows.iter()
                .flat_map(|row| row.iter().map(|&(_, touching)| u32::from(touching)))
                .collect(),
        );
        list
    }

    pub fn view(&self) -> NeighborList<'_> {
        NeighborList {
            ilist: &self.ilist,
            numneigh: &self.numneigh,
            firstneigh: &self.firstneigh,
            neighbors: &self.neighbors,
            contact_flags: self.contact_flags.as_deref(),
        }
    }
}
