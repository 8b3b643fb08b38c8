//! Neighborhood enumeration on a key's own level.
//!
//! Box stencil (2D, s = 1), enumeration order shown by index:
//!
//! ```text
//!        x-1  x  x+1
//!  y+1 │  6   7   8
//!  y   │  3   4   5      4 = the key itself
//!  y-1 │  0   1   2
//! ```
//!
//! Moves outside the domain produce void keys, which stay in the list so that
//! positions in the result keep their meaning.

use smallvec::SmallVec;

use super::spatial::{Axis, SpatialKey};

/// Up to 27 keys: a 3D box of stencil 1.
pub type BoxNeighbors<'a> = SmallVec<[SpatialKey<'a>; 27]>;

/// Up to 6 keys: a 3D star of stencil 1.
pub type StarNeighbors<'a> = SmallVec<[SpatialKey<'a>; 6]>;

/// Signed move along one axis.
#[inline]
fn step<'a>(key: SpatialKey<'a>, axis: Axis, offset: isize) -> SpatialKey<'a> {
  if offset < 0 {
    key.minus(axis, offset.unsigned_abs())
  } else {
    key.plus(axis, offset as usize)
  }
}

impl<'a> SpatialKey<'a> {
  /// All `(2s+1)^dim` cells within `stencil` steps on every axis.
  ///
  /// Ordered z outermost, then y, then x; each entry is reached by moving the
  /// key along z, then y, then x.
  pub fn box_neighbors(&self, stencil: usize) -> BoxNeighbors<'a> {
    let layout = self.layout();
    let s = stencil as isize;
    let span = |present: bool| if present { -s..=s } else { 0..=0 };
    let (has_y, has_z) = (layout.dim() >= 2, layout.dim() == 3);

    let mut out = BoxNeighbors::new();
    for dz in span(has_z) {
      let kz = step(*self, Axis::Z, dz);
      for dy in span(has_y) {
        let ky = step(kz, Axis::Y, dy);
        for dx in -s..=s {
          out.push(step(ky, Axis::X, dx));
        }
      }
    }
    out
  }

  /// The `2·dim·s` cells reached by moving along a single axis.
  ///
  /// Axis-major, offsets `-s..=s` skipping zero.
  pub fn star_neighbors(&self, stencil: usize) -> StarNeighbors<'a> {
    let s = stencil as isize;
    let mut out = StarNeighbors::new();
    for axis in self.layout().axes() {
      for offset in (-s..=s).filter(|&o| o != 0) {
        out.push(step(*self, axis, offset));
      }
    }
    out
  }
}

#[cfg(test)]
#[path = "neighbor_test.rs"]
mod neighbor_test;
