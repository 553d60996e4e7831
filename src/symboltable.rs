use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::address::{Address, MEMORY_SIZE};
use crate::error::ExecutionError;

/**
  The allocation table maps variable names to the memory address holding their value. A name
  owns at most one address and an address has at most one owner, so the table is really just a
  convenience wrapper around a BiMap. Allocation is first fit: the lowest address without an
  owner is handed out.
*/
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  table: BiMap<DefaultAtom, Address>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable {
      table: BiMap::new()
    }
  }

  pub fn get_name(&self, address: &Address) -> Option<DefaultAtom> {
    self.table.get_by_right(address).cloned()
  }

  pub fn get_address(&self, name: &DefaultAtom) -> Option<Address> {
    self.table.get_by_left(name).cloned()
  }

  pub fn contains(&self, name: &DefaultAtom) -> bool {
    self.table.contains_left(name)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  /// The lowest address that no name owns.
  pub fn first_free(&self) -> Option<Address> {
    (0..MEMORY_SIZE)
      .filter_map(Address::from_idx)
      .find(|address| !self.table.contains_right(address))
  }

  /**
    Binds `name` to the lowest free address and returns it. A name that is already bound keeps
    its address.
  */
  pub fn insert(&mut self, name: DefaultAtom) -> Result<Address, ExecutionError> {
    if let Some(address) = self.get_address(&name) {
      return Ok(address);
    }
    let address = self.first_free().ok_or(ExecutionError::NoFreeSlot)?;
    // Neither side is bound, so this cannot overwrite.
    let _ = self.table.insert_no_overwrite(name, address);
    Ok(address)
  }

  /// Unbinds `name`, returning the address it owned.
  pub fn remove(&mut self, name: &DefaultAtom) -> Option<Address> {
    self.table.remove_by_left(name).map(|(_name, address)| address)
  }

  pub fn clear(&mut self) {
    self.table = BiMap::new();
  }

  /// Bindings in ascending address order.
  pub fn iter(&self) -> impl Iterator<Item = (DefaultAtom, Address)> + '_ {
    let mut bindings: Vec<(DefaultAtom, Address)> =
      self.table.iter().map(|(name, address)| (name.clone(), *address)).collect();
    bindings.sort_by_key(|(_name, address)| *address);
    bindings.into_iter()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn atom(name: &str) -> DefaultAtom {
    DefaultAtom::from(name)
  }

  #[test]
  fn first_fit(){
    let mut table = SymbolTable::new();
    assert_eq!(table.insert(atom("abc")), Ok(Address::new(0)));
    assert_eq!(table.insert(atom("def")), Ok(Address::new(1)));
    assert_eq!(table.insert(atom("ghi")), Ok(Address::new(2)));
    // Rebinding keeps the address.
    assert_eq!(table.insert(atom("def")), Ok(Address::new(1)));
    assert_eq!(table.len(), 3);
  }

  #[test]
  fn freed_address_reused_lowest_first(){
    let mut table = SymbolTable::new();
    for name in &["aaa", "bbb", "ccc", "ddd"] {
      table.insert(atom(name)).unwrap();
    }
    assert_eq!(table.remove(&atom("ccc")), Some(Address::new(2)));
    assert_eq!(table.remove(&atom("bbb")), Some(Address::new(1)));
    assert_eq!(table.insert(atom("eee")), Ok(Address::new(1)));
    assert_eq!(table.insert(atom("fff")), Ok(Address::new(2)));
    assert_eq!(table.insert(atom("ggg")), Ok(Address::new(4)));
    assert_eq!(table.remove(&atom("zzz")), None);
  }

  #[test]
  fn exhaustion(){
    let mut table = SymbolTable::new();
    for i in 0..MEMORY_SIZE {
      assert_eq!(table.insert(atom(&format!("v{}", i))), Ok(Address::new(i as u16)));
    }
    assert_eq!(table.first_free(), None);
    assert_eq!(table.insert(atom("one_more")), Err(ExecutionError::NoFreeSlot));
    assert_eq!(table.insert(atom("v7")), Ok(Address::new(7)));
  }

  #[test]
  fn lookups_both_ways(){
    let mut table = SymbolTable::new();
    table.insert(atom("xyz")).unwrap();
    assert_eq!(table.get_name(&Address::new(0)), Some(atom("xyz")));
    assert_eq!(table.get_address(&atom("xyz")), Some(Address::new(0)));
    assert_eq!(table.get_name(&Address::new(1)), None);
    let bindings: Vec<_> = table.iter().collect();
    assert_eq!(bindings, vec![(atom("xyz"), Address::new(0))]);
  }

}
