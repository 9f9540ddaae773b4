//! Detail tiers and the distance policy that picks between them.
//!
//! Tier 0 is the closest and most detailed. Tiers 0 and 1 render through GPU
//! instancing; tier 2 (the impostor tier) is statically batched.

/// Number of detail tiers built for every tile.
pub const LOD_COUNT: usize = 3;

/// Coarsest tier index.
pub const MAX_LOD: usize = LOD_COUNT - 1;

/// How a species' mesh parts are realized at one tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
  /// One shared per-instance transform buffer, template mesh reused.
  Instanced,
  /// All placements merged into one static mesh per part.
  Batched,
}

impl RenderMode {
  /// Fixed policy: the last tier is batched, everything else is instanced.
  #[inline]
  pub fn for_tier(lod: usize) -> Self {
    if lod < MAX_LOD {
      RenderMode::Instanced
    } else {
      RenderMode::Batched
    }
  }
}

/// Detail tier for a tile at cell offset `(dx, dy, dz)` from the viewer's
/// tile.
///
/// `min(|dx|, |dz|)`, less one when non-zero, clamped to the coarsest tier.
/// Height is ignored.
#[inline]
pub fn detail_tier(dx: i32, _dy: i32, dz: i32) -> usize {
  let level = dx.unsigned_abs().min(dz.unsigned_abs()).saturating_sub(1);
  (level as usize).min(MAX_LOD)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_render_mode_policy() {
    assert_eq!(RenderMode::for_tier(0), RenderMode::Instanced);
    assert_eq!(RenderMode::for_tier(1), RenderMode::Instanced);
    assert_eq!(RenderMode::for_tier(2), RenderMode::Batched);
  }

  #[test]
  fn test_detail_tier_origin_and_neighbors() {
    assert_eq!(detail_tier(0, 0, 0), 0);
    assert_eq!(detail_tier(1, 0, 1), 0);
    assert_eq!(detail_tier(-1, 5, -1), 0);
  }

  #[test]
  fn test_detail_tier_uses_min_axis() {
    // Straight along an axis the smaller offset stays zero.
    assert_eq!(detail_tier(9, 0, 0), 0);
    assert_eq!(detail_tier(2, 0, 5), 1);
    assert_eq!(detail_tier(-5, 0, 2), 1);
  }

  #[test]
  fn test_detail_tier_clamps() {
    assert_eq!(detail_tier(3, 0, 3), 2);
    assert_eq!(detail_tier(100, 0, -100), 2);
    assert_eq!(detail_tier(i32::MIN, 0, i32::MIN), 2);
  }
}
