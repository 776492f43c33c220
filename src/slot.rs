//! A checked index into the machine's register file of argument slots.

use std::fmt::{Display, Formatter};

use crate::error::EmitError;

/// The number of argument slots available to a single execution.
pub const SLOT_COUNT: usize = 8;

/// An index into the argument vector `A`. A `Slot` can only be constructed in range, so every
/// instruction that carries one is known to address a real slot.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Slot(u8);

impl Slot {
  /// Checks `index` against the register file size.
  pub fn new(index: usize) -> Result<Slot, EmitError> {
    match index < SLOT_COUNT {
      true  => Ok(Slot(index as u8)),
      false => Err(EmitError::InvalidSlot(index))
    }
  }

  /// Converts the slot to an index into the argument vector.
  pub fn idx(&self) -> usize {
    self.0 as usize
  }

  /// Every slot, in register order.
  #[cfg(test)]
  pub fn all() -> impl Iterator<Item = Slot> {
    (0..SLOT_COUNT as u8).map(Slot)
  }
}

impl Display for Slot {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "A[{}]", self.0)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_every_register() {
    for index in 0..SLOT_COUNT {
      assert_eq!(Slot::new(index).map(|slot| slot.idx()), Ok(index));
    }
    assert_eq!(Slot::all().count(), SLOT_COUNT);
  }

  #[test]
  fn rejects_past_the_register_file() {
    assert_eq!(Slot::new(SLOT_COUNT), Err(EmitError::InvalidSlot(SLOT_COUNT)));
    assert_eq!(Slot::new(255), Err(EmitError::InvalidSlot(255)));
  }
}
