pub mod builtins;
pub mod functions;
pub mod interpreter;
pub mod prototype;
pub mod scope;
pub mod value;
pub mod world;
