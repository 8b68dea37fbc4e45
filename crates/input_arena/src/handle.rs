// crates/input_arena/src/handle.rs
use std::fmt;

// Low 32 bits: slot index. High 32 bits: generation of that slot when the
// handle was issued. A removed slot bumps its generation, so old handles
// stop resolving.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    bits: u64,
}

impl Handle {
    const SLOT_BITS: u64 = 32;

    /// Never returned by an arena; useful as a placeholder.
    pub const INVALID: Handle = Handle { bits: u64::MAX };

    pub fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: u64::from(index) | (u64::from(generation) << Self::SLOT_BITS),
        }
    }

    pub fn index(&self) -> usize {
        (self.bits as u32) as usize
    }

    pub fn generation(&self) -> u32 {
        (self.bits >> Self::SLOT_BITS) as u32
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            return write!(f, "Handle(invalid)");
        }
        write!(f, "Handle({}:{})", self.index(), self.generation())
    }
}
