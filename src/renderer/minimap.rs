use crate::{
    text_overlay::quad,
    types::TILE_SIZE,
    vertex::OverlayVertex,
    world::TileSource,
};
use nalgebra_glm as glm;

/// Edge of one map tile on screen, in pixels
pub const MINIMAP_TILE: f32 = 3.0;
/// Gap between the minimap and the top right window corner
pub const MINIMAP_MARGIN: f32 = 10.0;
const MARKER: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Coloured quads for every visible tile plus a marker at the player. The
/// map is anchored to the top right corner with row 0 at the top.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn quads(
    tiles: &dyn TileSource,
    dimensions: [u32; 2],
    player: &glm::Vec3,
) -> Vec<OverlayVertex> {
    let (w, h) = (tiles.width(), tiles.height());
    let left = MINIMAP_TILE.mul_add(
        -(w as f32),
        dimensions[0] as f32 - MINIMAP_MARGIN,
    );
    let top = dimensions[1] as f32 - MINIMAP_MARGIN;
    let cell = |x: f32, y: f32, colour| {
        quad(
            [left + x * MINIMAP_TILE, top - (y + 1.0) * MINIMAP_TILE],
            [left + (x + 1.0) * MINIMAP_TILE, top - y * MINIMAP_TILE],
            [0.0; 4],
            colour,
        )
    };

    let mut out = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if let Some(colour) = tiles.tile_at(x, y).minimap_colour() {
                out.extend(cell(x as f32, y as f32, colour));
            }
        }
    }
    let px = (player.x / TILE_SIZE).floor();
    let py = (player.z / TILE_SIZE).floor();
    if (0.0..w as f32).contains(&px) && (0.0..h as f32).contains(&py) {
        out.extend(cell(px, py, MARKER));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::TileGrid;

    #[test]
    fn unused_tiles_are_skipped() {
        let grid = TileGrid::parse("#.#\n   ").unwrap();
        let v = quads(&grid, [800, 600], &glm::vec3(-10.0, 0.0, 0.0));
        assert_eq!(v.len(), 5 * 6);
        // First wall sits at the top left of a 3 tile wide map
        assert!((v[0].position[0] - 781.0).abs() < 0.0001);
        assert!((v[0].position[1] - 590.0).abs() < 0.0001);
    }

    #[test]
    fn player_marker_follows_position() {
        let grid = TileGrid::parse("   \n   ").unwrap();
        let player = glm::vec3(TILE_SIZE * 2.5, 0.0, TILE_SIZE * 1.5);
        let v = quads(&grid, [800, 600], &player);
        assert_eq!(v.len(), 7 * 6);
        let marker = &v[6 * 6..];
        assert_eq!(marker[0].colour, MARKER);
        assert!((marker[0].position[0] - 787.0).abs() < 0.0001);
        assert!((marker[0].position[1] - 587.0).abs() < 0.0001);
    }
}
