use std::cell::RefCell;
use std::rc::Rc;

pub type ActorId = usize;

/// Shared world handle. The host keeps its own clone so it can inspect the
/// world after a script run.
pub type WorldRef = Rc<RefCell<dyn World>>;

/// The grid world as the script intrinsics see it. Queries are read-only;
/// commands mutate and report whether they took effect. All calls act on the
/// given actor; scripts address the world's first actor.
pub trait World {
    /// Id of the actor the intrinsics drive, if the world has one.
    fn first_id(&self) -> Option<ActorId>;

    // queries
    fn is_on_gem(&self, id: ActorId) -> bool;
    fn is_on_opened_switch(&self, id: ActorId) -> bool;
    fn is_on_closed_switch(&self, id: ActorId) -> bool;
    fn is_blocked(&self, id: ActorId) -> bool;
    fn is_blocked_left(&self, id: ActorId) -> bool;
    fn is_blocked_right(&self, id: ActorId) -> bool;
    fn collected_gem(&self, id: ActorId) -> i64;

    // commands
    fn move_forward(&mut self, id: ActorId) -> bool;
    fn turn_left(&mut self, id: ActorId) -> bool;
    fn collect_gem(&mut self, id: ActorId) -> bool;
    fn toggle_switch(&mut self, id: ActorId) -> bool;
    fn take_beeper(&mut self, id: ActorId) -> bool;
    fn drop_beeper(&mut self, id: ActorId) -> bool;
    fn turn_lock_up(&mut self, id: ActorId) -> bool;
    fn turn_lock_down(&mut self, id: ActorId) -> bool;
}

/// Backs world-less programs: no actor, every query is vacuously false and
/// every command fails.
pub struct NullWorld;

impl World for NullWorld {
    fn first_id(&self) -> Option<ActorId> {
        None
    }

    fn is_on_gem(&self, _id: ActorId) -> bool {
        false
    }
    fn is_on_opened_switch(&self, _id: ActorId) -> bool {
        false
    }
    fn is_on_closed_switch(&self, _id: ActorId) -> bool {
        false
    }
    fn is_blocked(&self, _id: ActorId) -> bool {
        false
    }
    fn is_blocked_left(&self, _id: ActorId) -> bool {
        false
    }
    fn is_blocked_right(&self, _id: ActorId) -> bool {
        false
    }
    fn collected_gem(&self, _id: ActorId) -> i64 {
        0
    }

    fn move_forward(&mut self, _id: ActorId) -> bool {
        false
    }
    fn turn_left(&mut self, _id: ActorId) -> bool {
        false
    }
    fn collect_gem(&mut self, _id: ActorId) -> bool {
        false
    }
    fn toggle_switch(&mut self, _id: ActorId) -> bool {
        false
    }
    fn take_beeper(&mut self, _id: ActorId) -> bool {
        false
    }
    fn drop_beeper(&mut self, _id: ActorId) -> bool {
        false
    }
    fn turn_lock_up(&mut self, _id: ActorId) -> bool {
        false
    }
    fn turn_lock_down(&mut self, _id: ActorId) -> bool {
        false
    }
}
