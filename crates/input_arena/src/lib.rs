// crates/input_arena/src/lib.rs
//! Generational handles and the slot arena the action runtime uses for
//! devices, action maps, callbacks and pending timeouts.

mod arena;
mod handle;

pub use arena::Arena;
pub use handle::Handle;
