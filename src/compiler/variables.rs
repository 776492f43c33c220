use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::error::CompileError;
use crate::slot::{Slot, SLOT_COUNT};

/**
  The lexical variable table of one lambda: a one-to-one mapping between bound names and the
  argument slots that hold them. Slots are handed out in binding order and never reused, so a
  name that is shadowed keeps its slot but loses its name.
*/
#[derive(Clone)]
pub struct Variables {
  table     : BiMap<DefaultAtom, Slot>,
  next_slot : usize
}

impl Variables {

  pub fn new() -> Variables {
    Variables {
      table     : BiMap::new(),
      next_slot : 0
    }
  }

  /// The slot currently bound to `name`.
  pub fn lookup(&self, name: &str) -> Option<Slot> {
    self.table.get_by_left(&DefaultAtom::from(name)).copied()
  }

  /// The name currently bound to `slot`, if it has not been shadowed.
  #[cfg(test)]
  pub fn name_of(&self, slot: Slot) -> Option<&str> {
    self.table.get_by_right(&slot).map(|name| &**name)
  }

  /// Number of slots allocated so far, named or shadowed.
  #[cfg(test)]
  pub fn slots_used(&self) -> usize {
    self.next_slot
  }

  /**
    Binds `name` to the next free slot, shadowing any earlier binding of the same name. Fails
    once the register file is full.
  */
  pub fn bind(&mut self, name: &str) -> Result<Slot, CompileError> {
    let slot =
      match self.next_slot < SLOT_COUNT {
        true  => Slot::new(self.next_slot)?,
        false => {
          return Err(CompileError::RegisterFileExhausted {
            name : name.to_string(),
            slot : self.next_slot
          });
        }
      };

    self.table.insert(DefaultAtom::from(name), slot);
    self.next_slot += 1;
    Ok(slot)
  }

  /**
    Returns a copy of this table extended with the two names a fold body binds, along with
    their slots `(element, accumulator)`. `self` is left as it is for the code
    that follows the fold.
  */
  pub fn with_fold_bindings(&self, element: &str, accumulator: &str)
    -> Result<(Variables, Slot, Slot), CompileError>
  {
    let mut body = self.clone();
    let element_slot     = body.bind(element)?;
    let accumulator_slot = body.bind(accumulator)?;
    Ok((body, element_slot, accumulator_slot))
  }
}

impl Default for Variables {
  fn default() -> Self {
    Variables::new()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn binds_in_order() {
    let mut variables = Variables::new();
    assert_eq!(variables.bind("x").unwrap().idx(), 0);
    assert_eq!(variables.bind("y").unwrap().idx(), 1);
    assert_eq!(variables.lookup("y").map(|s| s.idx()), Some(1));
    assert_eq!(variables.lookup("z"), None);
    assert_eq!(variables.name_of(Slot::new(0).unwrap()), Some("x"));
  }

  #[test]
  fn shadowing_keeps_the_old_slot_allocated() {
    let mut variables = Variables::new();
    variables.bind("x").unwrap();
    variables.bind("x").unwrap();
    assert_eq!(variables.lookup("x").map(|s| s.idx()), Some(1));
    assert_eq!(variables.name_of(Slot::new(0).unwrap()), None);
    assert_eq!(variables.slots_used(), 2);
    assert_eq!(variables.bind("y").unwrap().idx(), 2);
  }

  #[test]
  fn fold_bindings_follow_the_outer_slots() {
    let mut variables = Variables::new();
    variables.bind("x").unwrap();
    let (body, element, accumulator) = variables.with_fold_bindings("x", "acc").unwrap();
    assert_eq!((element.idx(), accumulator.idx()), (1, 2));
    assert_eq!(body.lookup("x"), Some(element));
    assert_eq!(variables.lookup("x").map(|s| s.idx()), Some(0));
  }

  #[test]
  fn register_file_is_finite() {
    let mut variables = Variables::new();
    for name in ["a", "b", "c", "d", "e", "f", "g"].iter() {
      variables.bind(name).unwrap();
    }
    assert!(variables.with_fold_bindings("y", "z").is_err());
    variables.bind("h").unwrap();
    assert_eq!(
      variables.bind("i"),
      Err(CompileError::RegisterFileExhausted { name: "i".to_string(), slot: 8 })
    );
  }

  #[test]
  fn clones_are_independent() {
    let mut outer = Variables::new();
    outer.bind("x").unwrap();
    let mut inner = outer.clone();
    inner.bind("y").unwrap();
    assert_eq!(inner.lookup("x"), outer.lookup("x"));
    assert_eq!(outer.lookup("y"), None);
    assert_eq!((outer.slots_used(), inner.slots_used()), (1, 2));
  }
}
