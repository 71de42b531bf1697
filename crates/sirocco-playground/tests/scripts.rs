//! End-to-end tests: sirocco scripts steering a real playground.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use sirocco_lang::{Interpreter, WorldRef, compile};
use sirocco_playground::{
    Actor, Block, Coordinate, Direction, Item, Playground, Portal, Tile,
};

fn drive(source: &str, playground: Playground) -> (Rc<RefCell<Playground>>, Interpreter) {
    let world = Rc::new(RefCell::new(playground));
    let program = match compile(source) {
        Ok(p) => p,
        Err(errors) => panic!("compile failed: {errors:?}"),
    };
    let mut interp = Interpreter::with_world(program, Rc::clone(&world) as WorldRef);
    if let Err(e) = interp.run() {
        panic!("script failed: {e}");
    }
    (world, interp)
}

fn corridor(len: usize) -> Playground {
    Playground::open(
        len,
        1,
        vec![Actor::player(1, Coordinate::new(0, 0), Direction::Right)],
    )
}

#[test]
fn walk_until_the_gem_and_collect_it() {
    let mut pg = corridor(5);
    pg.items[0][3] = Item::Gem;
    let src = "
        while !isOnGem() {
            moveForward()
        }
        collectGem()
    ";
    let (world, _) = drive(src, pg);
    let world = world.borrow();
    assert!(world.win());
    assert_eq!(world.gem_count(), 1);
    assert_eq!(world.actors[0].coo, Coordinate::new(3, 0));
}

#[test]
fn toggle_every_switch_in_the_row() {
    let mut pg = corridor(4);
    pg.items[0][1] = Item::ClosedSwitch;
    pg.items[0][3] = Item::ClosedSwitch;
    let src = "
        while !isBlocked() {
            moveForward()
            if isOnClosedSwitch() {
                toggleSwitch()
            }
        }
    ";
    let (world, _) = drive(src, pg);
    let world = world.borrow();
    assert!(world.win());
    assert_eq!(world.switch_count(), 2);
}

#[test]
fn a_function_turns_the_actor_right() {
    let pg = corridor(2);
    let src = "
        func turnRight() {
            turnLeft()
            turnLeft()
            turnLeft()
        }
        turnRight()
    ";
    let (world, _) = drive(src, pg);
    assert_eq!(world.borrow().actors[0].dir, Direction::Up);
}

#[test]
fn collected_gem_tracks_the_bag() {
    let mut pg = corridor(4);
    pg.items[0][1] = Item::Gem;
    pg.items[0][2] = Item::Gem;
    let src = "
        for _ in 1 through 2 {
            moveForward()
            collectGem()
        }
        let n = collectedGem()
    ";
    let (_, interp) = drive(src, pg);
    let n = interp.lookup("n").and_then(|v| v.as_int());
    assert_eq!(n, Some(2));
}

#[test]
fn the_script_sees_walls_through_queries() {
    let mut pg = corridor(3);
    pg.grid[0][2] = Block::Blocked;
    let src = "
        var steps = 0
        while !isBlocked() {
            moveForward()
            steps += 1
        }
    ";
    let (world, interp) = drive(src, pg);
    assert_eq!(world.borrow().actors[0].coo, Coordinate::new(1, 0));
    let steps = interp.lookup("steps").and_then(|v| v.as_int());
    assert_eq!(steps, Some(1));
}

#[test]
fn portals_carry_the_actor_across_the_map() {
    let mut pg = corridor(6);
    pg.items[0][1] = Item::Portal;
    pg.portals.push(Portal {
        coo: Coordinate::new(1, 0),
        dest: Coordinate::new(4, 0),
        is_active: true,
    });
    let (world, _) = drive("moveForward()", pg);
    assert_eq!(world.borrow().actors[0].coo, Coordinate::new(4, 0));
}

#[test]
fn a_specialist_lifts_tiles_to_cross_a_ridge() {
    let mut pg = Playground::open(
        4,
        1,
        vec![Actor::specialist(1, Coordinate::new(0, 0), Direction::Right)],
    );
    pg.tiles[0][2] = Tile::liftable(1);
    pg.items[0][1] = Item::Lock;
    pg.items[0][3] = Item::Gem;
    // Lowering the liftable tile to level 0 opens the path.
    let src = "
        turnLockDown()
        moveForward()
        moveForward()
        moveForward()
        collectGem()
    ";
    let (world, _) = drive(src, pg);
    let world = world.borrow();
    assert!(world.win());
    assert_eq!(world.tiles[0][2].level, 0);
}

#[test]
fn beepers_round_trip_through_the_bag() {
    let mut pg = corridor(3);
    pg.items[0][0] = Item::Beeper;
    let src = "
        takeBeeper()
        moveForward()
        moveForward()
        dropBeeper()
    ";
    let (world, _) = drive(src, pg);
    let world = world.borrow();
    assert_eq!(world.items[0][0], Item::None);
    assert_eq!(world.items[0][2], Item::Beeper);
    assert_eq!(world.actors[0].beepers_in_bag, 0);
}

#[test]
fn render_reflects_a_scripted_run() {
    let mut pg = corridor(3);
    pg.items[0][2] = Item::Gem;
    let (world, _) = drive("moveForward()\nturnLeft()", pg);
    assert_eq!(world.borrow().render(), "_UG\n");
}

#[test]
fn the_world_state_serializes_to_json() {
    let pg = corridor(2);
    let json = serde_json::to_value(&pg).unwrap();
    assert_eq!(json["actors"][0]["stamina"], 90);
    assert_eq!(json["actors"][0]["dir"], "Right");
    assert_eq!(json["grid"][0][1], "Open");
}
