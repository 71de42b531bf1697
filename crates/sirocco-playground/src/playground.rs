use serde::Serialize;
use sirocco_lang::{ActorId, World};

use crate::grid::{
    Actor, Block, Coordinate, Direction, HOME_STAMINA_BONUS, Item, MAX_TILE_LEVEL, Portal, Role,
    Tile, TileColor,
};

/// The grid world: terrain, an item layer, a decoration layer, portals, and
/// the actors moving through it. Implements [`World`] so sirocco scripts can
/// drive the first actor through the intrinsic calls.
#[derive(Debug, Clone, Serialize)]
pub struct Playground {
    pub grid: Vec<Vec<Block>>,
    pub items: Vec<Vec<Item>>,
    pub tiles: Vec<Vec<Tile>>,
    pub portals: Vec<Portal>,
    pub actors: Vec<Actor>,
}

impl Playground {
    pub fn new(
        grid: Vec<Vec<Block>>,
        items: Vec<Vec<Item>>,
        tiles: Vec<Vec<Tile>>,
        portals: Vec<Portal>,
        actors: Vec<Actor>,
    ) -> Self {
        Self { grid, items, tiles, portals, actors }
    }

    /// Uniform flat world with default tiles and no portals.
    pub fn open(width: usize, height: usize, actors: Vec<Actor>) -> Self {
        Self::new(
            vec![vec![Block::Open; width]; height],
            vec![vec![Item::None; width]; height],
            vec![vec![Tile::default(); width]; height],
            Vec::new(),
            actors,
        )
    }

    // ─── Scoring ─────────────────────────────────────────────────────────────

    /// Won when every gem is collected and every switch is open.
    pub fn win(&self) -> bool {
        !self
            .items
            .iter()
            .flatten()
            .any(|item| matches!(item, Item::Gem | Item::ClosedSwitch))
    }

    pub fn gem_count(&self) -> i64 {
        self.actors.iter().map(|a| a.collected_gems).sum()
    }

    pub fn switch_count(&self) -> usize {
        self.items
            .iter()
            .flatten()
            .filter(|item| **item == Item::OpenedSwitch)
            .count()
    }

    // ─── Geometry ────────────────────────────────────────────────────────────

    fn rows(&self) -> usize {
        self.grid.len()
    }

    fn cols(&self) -> usize {
        self.grid.first().map_or(0, Vec::len)
    }

    fn actor_index(&self, id: ActorId) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }

    fn item_at(&self, coo: Coordinate) -> Item {
        self.items[coo.y][coo.x]
    }

    fn block_at(&self, coo: Coordinate) -> Block {
        self.grid[coo.y][coo.x]
    }

    fn level_at(&self, coo: Coordinate) -> i32 {
        self.tiles[coo.y][coo.x].level
    }

    fn neighbor(&self, coo: Coordinate, dir: Direction) -> Option<Coordinate> {
        let (x, y) = (coo.x, coo.y);
        let next = match dir {
            Direction::Up if y >= 1 => Coordinate::new(x, y - 1),
            Direction::Down if y + 1 < self.rows() => Coordinate::new(x, y + 1),
            Direction::Left if x >= 1 => Coordinate::new(x - 1, y),
            Direction::Right if x + 1 < self.cols() => Coordinate::new(x + 1, y),
            _ => return None,
        };
        Some(next)
    }

    /// The grid edge, impassable terrain, and any height difference all block.
    fn blocked_towards(&self, from: Coordinate, dir: Direction) -> bool {
        match self.neighbor(from, dir) {
            None => true,
            Some(next) => {
                matches!(self.block_at(next), Block::Blocked | Block::Water)
                    || self.level_at(next) != self.level_at(from)
            }
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────────

    /// Standing in desert or forest costs stamina on every action attempt,
    /// even one that fails.
    fn pay_terrain(&mut self, idx: usize) {
        let cost = match self.block_at(self.actors[idx].coo) {
            Block::Desert => 2,
            Block::Tree => 1,
            _ => 0,
        };
        self.actors[idx].stamina -= cost;
    }

    fn step_forward(&mut self, idx: usize) -> bool {
        self.pay_terrain(idx);
        let (coo, dir) = (self.actors[idx].coo, self.actors[idx].dir);
        if self.blocked_towards(coo, dir) || self.actors[idx].stamina <= 0 {
            return false;
        }
        let next = match self.neighbor(coo, dir) {
            Some(n) => n,
            None => return false,
        };
        self.actors[idx].coo = next;
        self.actors[idx].stamina -= 1;

        if self.block_at(next) == Block::Home {
            self.actors[idx].stamina += HOME_STAMINA_BONUS;
        }
        if self.item_at(next) == Item::Portal {
            let hop = self
                .portals
                .iter()
                .find(|p| p.coo == next && p.is_active)
                .map(|p| p.dest);
            if let Some(dest) = hop {
                self.actors[idx].coo = dest;
            }
        }
        true
    }

    fn pick_gem(&mut self, idx: usize) -> bool {
        self.pay_terrain(idx);
        let coo = self.actors[idx].coo;
        if self.item_at(coo) == Item::Gem && self.actors[idx].stamina > 0 {
            self.actors[idx].collected_gems += 1;
            self.items[coo.y][coo.x] = Item::None;
            self.actors[idx].stamina -= 1;
            true
        } else {
            false
        }
    }

    fn flip_switch(&mut self, idx: usize) -> bool {
        self.pay_terrain(idx);
        let coo = self.actors[idx].coo;
        if self.actors[idx].stamina <= 0 {
            return false;
        }
        let flipped = match self.item_at(coo) {
            Item::OpenedSwitch => Item::ClosedSwitch,
            Item::ClosedSwitch => Item::OpenedSwitch,
            _ => return false,
        };
        self.items[coo.y][coo.x] = flipped;
        self.actors[idx].stamina -= 1;
        true
    }

    fn grab_beeper(&mut self, idx: usize) -> bool {
        self.pay_terrain(idx);
        let coo = self.actors[idx].coo;
        if self.item_at(coo) == Item::Beeper && self.actors[idx].stamina > 0 {
            self.items[coo.y][coo.x] = Item::None;
            self.actors[idx].beepers_in_bag += 1;
            self.actors[idx].stamina -= 1;
            true
        } else {
            false
        }
    }

    fn put_beeper(&mut self, idx: usize) -> bool {
        if self.actors[idx].beepers_in_bag == 0 {
            return false;
        }
        self.pay_terrain(idx);
        let coo = self.actors[idx].coo;
        self.items[coo.y][coo.x] = Item::Beeper;
        self.actors[idx].beepers_in_bag -= 1;
        self.actors[idx].stamina -= 1;
        true
    }

    fn before_lock(&self, idx: usize) -> bool {
        let actor = &self.actors[idx];
        self.neighbor(actor.coo, actor.dir)
            .is_some_and(|next| self.item_at(next) == Item::Lock)
    }

    /// Raises or lowers every liftable tile by one level, clamped to
    /// `0..=MAX_TILE_LEVEL`. Specialist-only, and only while facing a lock.
    fn operate_lock(&mut self, idx: usize, delta: i32) -> bool {
        if self.actors[idx].role != Role::Specialist || !self.before_lock(idx) {
            return false;
        }
        for tile in self.tiles.iter_mut().flatten() {
            if tile.liftable {
                tile.level = (tile.level + delta).clamp(0, MAX_TILE_LEVEL);
            }
        }
        self.actors[idx].stamina -= 1;
        true
    }

    pub fn change_color(&mut self, id: ActorId, color: TileColor) {
        if let Some(idx) = self.actor_index(id) {
            let coo = self.actors[idx].coo;
            self.tiles[coo.y][coo.x].color = color;
        }
    }

    // ─── Rendering ───────────────────────────────────────────────────────────

    /// Text picture of the grid: actor facing letters first, then the item
    /// letter, then the terrain letter for empty cells.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for y in 0..self.rows() {
            for x in 0..self.cols() {
                out.push_str(&self.render_cell(Coordinate::new(x, y)));
            }
            out.push('\n');
        }
        out
    }

    fn render_cell(&self, coo: Coordinate) -> String {
        let here: String = self
            .actors
            .iter()
            .filter(|a| a.coo == coo)
            .map(|a| a.dir.letter())
            .collect();
        if !here.is_empty() {
            return here;
        }
        let c = match self.item_at(coo) {
            Item::None => match self.block_at(coo) {
                Block::Open => '_',
                Block::Blocked => 'B',
                Block::Water => 'W',
                Block::Tree => 'T',
                Block::Desert => 'S',
                Block::Home => 'H',
            },
            Item::Gem => 'G',
            Item::ClosedSwitch => 'C',
            Item::OpenedSwitch => 'O',
            Item::Beeper => 'V',
            Item::Lock => 'A',
            Item::Portal => 'P',
        };
        c.to_string()
    }
}

// ─── World wiring ────────────────────────────────────────────────────────────

impl World for Playground {
    fn first_id(&self) -> Option<ActorId> {
        self.actors.first().map(|a| a.id)
    }

    fn is_on_gem(&self, id: ActorId) -> bool {
        self.actor_index(id)
            .is_some_and(|i| self.item_at(self.actors[i].coo) == Item::Gem)
    }

    fn is_on_opened_switch(&self, id: ActorId) -> bool {
        self.actor_index(id)
            .is_some_and(|i| self.item_at(self.actors[i].coo) == Item::OpenedSwitch)
    }

    fn is_on_closed_switch(&self, id: ActorId) -> bool {
        self.actor_index(id)
            .is_some_and(|i| self.item_at(self.actors[i].coo) == Item::ClosedSwitch)
    }

    fn is_blocked(&self, id: ActorId) -> bool {
        self.actor_index(id)
            .is_some_and(|i| self.blocked_towards(self.actors[i].coo, self.actors[i].dir))
    }

    fn is_blocked_left(&self, id: ActorId) -> bool {
        self.actor_index(id)
            .is_some_and(|i| self.blocked_towards(self.actors[i].coo, self.actors[i].dir.left()))
    }

    fn is_blocked_right(&self, id: ActorId) -> bool {
        self.actor_index(id)
            .is_some_and(|i| self.blocked_towards(self.actors[i].coo, self.actors[i].dir.right()))
    }

    fn collected_gem(&self, id: ActorId) -> i64 {
        self.actor_index(id)
            .map_or(0, |i| self.actors[i].collected_gems)
    }

    fn move_forward(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.step_forward(i))
    }

    fn turn_left(&mut self, id: ActorId) -> bool {
        match self.actor_index(id) {
            Some(i) => {
                self.actors[i].dir = self.actors[i].dir.left();
                true
            }
            None => false,
        }
    }

    fn collect_gem(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.pick_gem(i))
    }

    fn toggle_switch(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.flip_switch(i))
    }

    fn take_beeper(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.grab_beeper(i))
    }

    fn drop_beeper(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.put_beeper(i))
    }

    fn turn_lock_up(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.operate_lock(i, 1))
    }

    fn turn_lock_down(&mut self, id: ActorId) -> bool {
        self.actor_index(id).is_some_and(|i| self.operate_lock(i, -1))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::INITIAL_STAMINA;
    use pretty_assertions::assert_eq;

    fn one_player(width: usize, height: usize) -> Playground {
        Playground::open(width, height, vec![Actor::player(0, Coordinate::new(0, 0), Direction::Right)])
    }

    #[test]
    fn moving_costs_one_stamina() {
        let mut pg = one_player(3, 1);
        assert!(pg.move_forward(0));
        assert_eq!(pg.actors[0].coo, Coordinate::new(1, 0));
        assert_eq!(pg.actors[0].stamina, INITIAL_STAMINA - 1);
    }

    #[test]
    fn the_grid_edge_blocks() {
        let mut pg = one_player(1, 1);
        assert!(pg.is_blocked(0));
        assert!(!pg.move_forward(0));
        assert_eq!(pg.actors[0].coo, Coordinate::new(0, 0));
    }

    #[test]
    fn water_and_walls_block() {
        let mut pg = one_player(3, 1);
        pg.grid[0][1] = Block::Water;
        assert!(pg.is_blocked(0));
        assert!(!pg.move_forward(0));
    }

    #[test]
    fn a_level_difference_blocks() {
        let mut pg = one_player(3, 1);
        pg.tiles[0][1].level = 1;
        assert!(pg.is_blocked(0));
    }

    #[test]
    fn desert_drains_even_failed_attempts() {
        let mut pg = one_player(2, 1);
        pg.grid[0][0] = Block::Desert;
        pg.grid[0][1] = Block::Blocked;
        assert!(!pg.move_forward(0));
        assert_eq!(pg.actors[0].stamina, INITIAL_STAMINA - 2);
    }

    #[test]
    fn home_restores_stamina() {
        let mut pg = one_player(2, 1);
        pg.grid[0][1] = Block::Home;
        pg.move_forward(0);
        assert_eq!(pg.actors[0].stamina, INITIAL_STAMINA - 1 + HOME_STAMINA_BONUS);
    }

    #[test]
    fn active_portal_relocates() {
        let mut pg = one_player(3, 1);
        pg.items[0][1] = Item::Portal;
        pg.portals.push(Portal {
            coo: Coordinate::new(1, 0),
            dest: Coordinate::new(2, 0),
            is_active: true,
        });
        pg.move_forward(0);
        assert_eq!(pg.actors[0].coo, Coordinate::new(2, 0));
    }

    #[test]
    fn inactive_portal_is_ordinary_ground() {
        let mut pg = one_player(3, 1);
        pg.items[0][1] = Item::Portal;
        pg.portals.push(Portal {
            coo: Coordinate::new(1, 0),
            dest: Coordinate::new(2, 0),
            is_active: false,
        });
        pg.move_forward(0);
        assert_eq!(pg.actors[0].coo, Coordinate::new(1, 0));
    }

    #[test]
    fn gems_and_switches_drive_the_win_condition() {
        let mut pg = one_player(2, 1);
        pg.items[0][0] = Item::Gem;
        pg.items[0][1] = Item::ClosedSwitch;

        assert!(!pg.win());
        assert!(pg.collect_gem(0));
        assert_eq!(pg.gem_count(), 1);
        assert!(!pg.win());

        pg.move_forward(0);
        assert!(pg.toggle_switch(0));
        assert_eq!(pg.switch_count(), 1);
        assert!(pg.win());
    }

    #[test]
    fn toggling_flips_both_ways() {
        let mut pg = one_player(1, 1);
        pg.items[0][0] = Item::OpenedSwitch;
        assert!(pg.toggle_switch(0));
        assert_eq!(pg.items[0][0], Item::ClosedSwitch);
        assert!(pg.toggle_switch(0));
        assert_eq!(pg.items[0][0], Item::OpenedSwitch);
    }

    #[test]
    fn beepers_move_between_ground_and_bag() {
        let mut pg = one_player(2, 1);
        pg.items[0][0] = Item::Beeper;
        assert!(pg.take_beeper(0));
        assert_eq!(pg.actors[0].beepers_in_bag, 1);
        assert_eq!(pg.items[0][0], Item::None);

        pg.move_forward(0);
        assert!(pg.drop_beeper(0));
        assert_eq!(pg.items[0][1], Item::Beeper);
        assert!(!pg.drop_beeper(0));
    }

    #[test]
    fn only_a_specialist_before_a_lock_lifts_tiles() {
        let mut pg = Playground::open(
            2,
            1,
            vec![Actor::player(0, Coordinate::new(0, 0), Direction::Right)],
        );
        pg.items[0][1] = Item::Lock;
        pg.tiles[0][0] = Tile::liftable(0);
        assert!(!pg.turn_lock_up(0));

        pg.actors[0] = Actor::specialist(0, Coordinate::new(0, 0), Direction::Right);
        assert!(pg.turn_lock_up(0));
        assert_eq!(pg.tiles[0][0].level, 1);
        assert!(pg.turn_lock_down(0));
        assert_eq!(pg.tiles[0][0].level, 0);
        assert!(pg.turn_lock_down(0));
        assert_eq!(pg.tiles[0][0].level, 0, "level clamps at zero");
    }

    #[test]
    fn render_shows_actors_items_and_terrain() {
        let mut pg = one_player(3, 2);
        pg.items[0][1] = Item::Gem;
        pg.grid[1][2] = Block::Water;
        assert_eq!(pg.render(), "RG_\n__W\n");
    }

    #[test]
    fn change_color_paints_the_cell_underfoot() {
        let mut pg = one_player(2, 1);
        pg.move_forward(0);
        pg.change_color(0, TileColor::Azure);
        assert_eq!(pg.tiles[0][1].color, TileColor::Azure);
        assert_eq!(pg.tiles[0][0].color, TileColor::White);
    }

    #[test]
    fn turning_left_cycles_all_four_ways() {
        let mut pg = one_player(1, 1);
        for expected in [Direction::Up, Direction::Left, Direction::Down, Direction::Right] {
            pg.turn_left(0);
            assert_eq!(pg.actors[0].dir, expected);
        }
    }
}
