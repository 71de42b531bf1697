use serde::Serialize;

/// Facing of an actor on the grid. `y` grows downward, so `Up` decrements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn left(self) -> Self {
        match self {
            Self::Up => Self::Left,
            Self::Left => Self::Down,
            Self::Down => Self::Right,
            Self::Right => Self::Up,
        }
    }

    pub fn right(self) -> Self {
        self.left().left().left()
    }

    pub(crate) fn letter(self) -> char {
        match self {
            Self::Up => 'U',
            Self::Down => 'D',
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }
}

/// Terrain of a cell. Trees and desert drain extra stamina; home restores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Block {
    Open,
    Blocked,
    Water,
    Tree,
    Desert,
    Home,
}

/// What sits on top of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Item {
    None,
    Gem,
    ClosedSwitch,
    OpenedSwitch,
    Beeper,
    Lock,
    Portal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TileColor {
    Black,
    Silver,
    Grey,
    White,
    Red,
    Orange,
    Gold,
    Pink,
    Yellow,
    Beige,
    Brown,
    Green,
    Azure,
    Cyan,
    AliceBlue,
    Purple,
}

/// Decoration layer of a cell: paint color plus a height level. Liftable
/// tiles move when a specialist operates a lock.
#[derive(Debug, Clone, Serialize)]
pub struct Tile {
    pub color: TileColor,
    pub level: i32,
    pub liftable: bool,
}

impl Default for Tile {
    fn default() -> Self {
        Self { color: TileColor::White, level: 0, liftable: false }
    }
}

impl Tile {
    pub fn liftable(level: i32) -> Self {
        Self { color: TileColor::White, level, liftable: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
}

impl Coordinate {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A one-way teleport pad. Stepping onto an active portal relocates the
/// actor to its destination.
#[derive(Debug, Clone, Serialize)]
pub struct Portal {
    pub coo: Coordinate,
    pub dest: Coordinate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Player,
    Specialist,
}

pub const INITIAL_STAMINA: i32 = 90;
pub const HOME_STAMINA_BONUS: i32 = 25;
pub const MAX_TILE_LEVEL: i32 = 10;

/// A scripted character. Only specialists can operate locks.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: usize,
    pub coo: Coordinate,
    pub dir: Direction,
    pub role: Role,
    pub stamina: i32,
    pub collected_gems: i64,
    pub beepers_in_bag: i64,
}

impl Actor {
    pub fn player(id: usize, coo: Coordinate, dir: Direction) -> Self {
        Self::with_role(id, coo, dir, Role::Player)
    }

    pub fn specialist(id: usize, coo: Coordinate, dir: Direction) -> Self {
        Self::with_role(id, coo, dir, Role::Specialist)
    }

    fn with_role(id: usize, coo: Coordinate, dir: Direction, role: Role) -> Self {
        Self {
            id,
            coo,
            dir,
            role,
            stamina: INITIAL_STAMINA,
            collected_gems: 0,
            beepers_in_bag: 0,
        }
    }
}
