//! The sirocco grid world: terrain, gems, switches, beepers, locks, and
//! portals, with stamina-bound actors. Implements `sirocco_lang::World` so
//! scripts drive it through the language's world intrinsics.

mod grid;
mod playground;

pub use grid::{
    Actor, Block, Coordinate, Direction, INITIAL_STAMINA, Item, Portal, Role, Tile, TileColor,
};
pub use playground::Playground;
