//! Interfaces to the map generator and physics engine. Neither is part of
//! this crate; the renderer only reads tiles and body transforms through
//! these traits.
use crate::um_error::UmError;
use nalgebra_glm as glm;

/// Map cell kinds. The characters are the map generator's text format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileCode {
    #[default]
    Unused,
    Floor,
    Corridor,
    Wall,
    ClosedDoor,
    OpenDoor,
    Trap,
    Key,
    TreasureTrap,
    Torch,
    Player,
    Spawn,
}

impl TileCode {
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '.' => Self::Unused,
            ' ' => Self::Floor,
            ',' => Self::Corridor,
            '#' => Self::Wall,
            '+' => Self::ClosedDoor,
            '-' => Self::OpenDoor,
            '$' => Self::Trap,
            'K' => Self::Key,
            'X' => Self::TreasureTrap,
            '*' => Self::Torch,
            'P' => Self::Player,
            'S' => Self::Spawn,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn to_char(self) -> char {
        match self {
            Self::Unused => '.',
            Self::Floor => ' ',
            Self::Corridor => ',',
            Self::Wall => '#',
            Self::ClosedDoor => '+',
            Self::OpenDoor => '-',
            Self::Trap => '$',
            Self::Key => 'K',
            Self::TreasureTrap => 'X',
            Self::Torch => '*',
            Self::Player => 'P',
            Self::Spawn => 'S',
        }
    }

    /// Whether a character can stand on the tile
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Unused | Self::Wall | Self::ClosedDoor)
    }

    /// RGBA used to draw the tile on the minimap, `None` for tiles that are
    /// left out
    #[must_use]
    pub const fn minimap_colour(self) -> Option<[f32; 4]> {
        match self {
            Self::Unused => None,
            Self::Wall => Some([0.55, 0.55, 0.6, 0.8]),
            Self::ClosedDoor | Self::OpenDoor => Some([0.6, 0.4, 0.2, 0.8]),
            Self::Torch => Some([1.0, 0.6, 0.1, 0.9]),
            Self::Player => Some([0.2, 0.9, 0.2, 1.0]),
            Self::Spawn | Self::Trap | Self::TreasureTrap => {
                Some([0.8, 0.15, 0.15, 0.8])
            }
            Self::Key => Some([1.0, 0.9, 0.2, 0.9]),
            Self::Floor | Self::Corridor => Some([0.15, 0.15, 0.18, 0.6]),
        }
    }
}

/// Read access to a generated map
pub trait TileSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Tile at a cell. Cells outside the map are `Unused`.
    fn tile_at(&self, x: u32, y: u32) -> TileCode;
}

/// A rigid body owned by the physics engine
pub trait PhysicsBody {
    fn position(&self) -> glm::Vec3;
    fn rotation(&self) -> glm::Quat;
    fn set_linear_velocity(&mut self, velocity: glm::Vec3);
    fn set_angular_velocity(&mut self, velocity: glm::Vec3);
    fn apply_impulse(&mut self, impulse: glm::Vec3, relative_pos: glm::Vec3);
}

/// Tiles held in memory, parsed from the map generator's text format
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<TileCode>,
}

impl TileGrid {
    /// Parses one line per row. Rows shorter than the longest are padded
    /// with `Unused`.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn parse(text: &str) -> Result<Self, UmError> {
        let rows: Vec<&str> = text.lines().collect();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut tiles = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let mut count = 0;
            for (x, c) in row.chars().enumerate() {
                let tile = TileCode::from_char(c).ok_or_else(|| {
                    UmError::invalid_parameter(
                        format!("unknown tile '{c}' at {x},{y}"),
                        "TileGrid::parse",
                    )
                })?;
                tiles.push(tile);
                count += 1;
            }
            tiles.resize(tiles.len() + width - count, TileCode::Unused);
        }
        let to_u32 = |n: usize| {
            u32::try_from(n).map_err(|_| {
                UmError::invalid_parameter("map too large", "TileGrid::parse")
            })
        };
        Ok(Self {
            width: to_u32(width)?,
            height: to_u32(rows.len())?,
            tiles,
        })
    }
}

impl TileSource for TileGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn tile_at(&self, x: u32, y: u32) -> TileCode {
        if x >= self.width || y >= self.height {
            return TileCode::Unused;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.tiles.get(index).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chars_round_trip() {
        for c in ". ,#+-$KX*PS".chars() {
            assert_eq!(TileCode::from_char(c).unwrap().to_char(), c);
        }
        assert!(TileCode::from_char('?').is_none());
    }

    #[test]
    fn grid_pads_short_rows() {
        let grid = TileGrid::parse("###\n#P\n").unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.tile_at(1, 1), TileCode::Player);
        assert_eq!(grid.tile_at(2, 1), TileCode::Unused);
        assert_eq!(grid.tile_at(9, 9), TileCode::Unused);
        assert!(!grid.tile_at(0, 0).is_walkable());
    }
}
