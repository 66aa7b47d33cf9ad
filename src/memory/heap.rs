//! Heap implementation for the virtual machine
//!
//! This module provides manually managed heap memory with:
//! - Explicit allocation/deallocation (`ALLOC_HEAP` / `FREE_HEAP`)
//! - Tombstones for freed blocks, so stale pointers are diagnosed rather
//!   than silently reading reused storage
//! - Per-block generation counters checked on every access
//! - A cell budget shared by all live blocks
//!
//! Block addresses grow monotonically from [`HEAP_ADDRESS_START`] and are
//! never handed out twice, so a freed block stays a tombstone for the rest
//! of the run.

use super::value::{Address, Pointer, Slot, Space, Value};
use crate::interpreter::constants::HEAP_ADDRESS_START;
use crate::interpreter::errors::{AddressError, RuntimeError};
use rustc_hash::FxHashMap;

/// State of a heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Allocated,
    Tombstone,
}

/// A block of heap cells
#[derive(Debug, Clone)]
pub struct HeapBlock {
    pub address: Address,
    pub cells: Vec<Value>,
    pub state: BlockState,
    pub generation: u32,
}

impl HeapBlock {
    fn new(address: Address, size: usize) -> Self {
        HeapBlock {
            address,
            cells: vec![Value::Uninitialized; size],
            state: BlockState::Allocated,
            generation: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn is_freed(&self) -> bool {
        self.state == BlockState::Tombstone
    }

    fn cell_index(&self, offset: i64, index: i64) -> Result<usize, AddressError> {
        let out_of_bounds = |index| AddressError::IndexOutOfBounds {
            index,
            size: self.size(),
        };
        let absolute = offset
            .checked_add(index)
            .ok_or_else(|| out_of_bounds(i64::MAX))?;
        usize::try_from(absolute)
            .ok()
            .filter(|&i| i < self.size())
            .ok_or_else(|| out_of_bounds(absolute))
    }
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    allocations: FxHashMap<Address, HeapBlock>,
    next_address: Address,
    live_cells: usize,
    max_cells: usize,
}

impl Heap {
    /// Create a heap that holds at most `max_cells` live cells.
    pub fn new(max_cells: usize) -> Self {
        Heap {
            allocations: FxHashMap::default(),
            next_address: HEAP_ADDRESS_START,
            live_cells: 0,
            max_cells,
        }
    }

    /// Reserve `size` uninitialized cells and return a pointer to cell 0.
    pub fn allocate(&mut self, size: usize) -> Result<Pointer, RuntimeError> {
        if size == 0 {
            return Err(RuntimeError::InvalidAllocation { size: 0 });
        }
        let available = self.max_cells - self.live_cells;
        if size > available {
            return Err(RuntimeError::OutOfMemory {
                requested: size,
                available,
            });
        }

        let address = self.next_address;
        self.next_address += size as u64;
        self.allocations
            .insert(address, HeapBlock::new(address, size));
        self.live_cells += size;

        Ok(Pointer::heap(address, 0))
    }

    /// Free the block `ptr` points at. Only the block base (offset 0) of a
    /// live block can be freed.
    pub fn free(&mut self, ptr: &Pointer) -> Result<Address, AddressError> {
        let rejected = || AddressError::UseAfterFree {
            target: ptr.to_string(),
        };
        let (Space::Heap(address), Slot::Offset(0)) = (&ptr.space, &ptr.slot) else {
            return Err(rejected());
        };

        let block = self.allocations.get_mut(address).ok_or_else(rejected)?;
        if block.is_freed() || block.generation != ptr.generation {
            return Err(rejected());
        }

        block.state = BlockState::Tombstone;
        block.generation += 1;
        self.live_cells -= block.size();
        Ok(*address)
    }

    /// Resolve a heap pointer to its live block.
    pub fn block(&self, ptr: &Pointer) -> Result<&HeapBlock, AddressError> {
        let rejected = || AddressError::UseAfterFree {
            target: ptr.to_string(),
        };
        let Space::Heap(address) = ptr.space else {
            return Err(rejected());
        };
        match self.allocations.get(&address) {
            Some(block) if !block.is_freed() && block.generation == ptr.generation => Ok(block),
            _ => Err(rejected()),
        }
    }

    /// Read `cells[offset + index]`.
    pub fn read(&self, ptr: &Pointer, index: i64) -> Result<Value, AddressError> {
        let block = self.block(ptr)?;
        let cell = block.cell_index(pointer_offset(ptr), index)?;
        Ok(block.cells[cell].clone())
    }

    /// Write `cells[offset + index]`.
    pub fn write(&mut self, ptr: &Pointer, index: i64, value: Value) -> Result<(), AddressError> {
        let cell = {
            let block = self.block(ptr)?;
            block.cell_index(pointer_offset(ptr), index)?
        };
        // block() only accepts heap pointers
        if let Space::Heap(address) = ptr.space {
            if let Some(block) = self.allocations.get_mut(&address) {
                block.cells[cell] = value;
            }
        }
        Ok(())
    }

    /// All blocks including tombstones, ordered by address (for display).
    pub fn blocks(&self) -> Vec<&HeapBlock> {
        let mut blocks: Vec<_> = self.allocations.values().collect();
        blocks.sort_by_key(|b| b.address);
        blocks
    }

    /// Number of blocks not yet freed.
    pub fn live_blocks(&self) -> usize {
        self.allocations.values().filter(|b| !b.is_freed()).count()
    }

    pub fn live_cells(&self) -> usize {
        self.live_cells
    }

    pub fn max_cells(&self) -> usize {
        self.max_cells
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_HEAP_CELLS)
    }
}

fn pointer_offset(ptr: &Pointer) -> i64 {
    match ptr.slot {
        Slot::Offset(offset) => offset,
        Slot::Name(_) => 0,
    }
}
