//! Memory model for the virtual machine
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation (Integer, Float, Boolean, Text, Pointer)
//! - [`stack`]: Call stack with generational frames and local variables
//! - [`heap`]: Heap allocation with explicit free and tombstone tracking
//!
//! [`Memory`] ties the three address spaces together behind one addressing
//! scheme: every variable or heap cell is reachable through a [`Pointer`].
//!
//! # Scoping
//!
//! Names resolve in the current frame first, then in global memory. At top
//! level (empty call stack) every write goes to globals; inside a frame a
//! write creates or updates a local, unless the name is a reference
//! parameter, in which case it goes through to the caller's storage.
//!
//! # Extents
//!
//! A named variable is a one-cell extent: indexed access through a pointer
//! to it accepts only index 0. Heap pointers index into their block.

pub mod heap;
pub mod stack;
pub mod value;

use crate::interpreter::errors::AddressError;
use heap::Heap;
use rustc_hash::FxHashMap;
use stack::Stack;
use value::{Pointer, Slot, Space, Value};

/// Global variables, in order of first assignment.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    values: FxHashMap<String, Value>,
    insertion_order: Vec<String>,
}

impl Globals {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
        } else {
            self.insertion_order.push(name.to_string());
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// `(name, value)` pairs in first-assignment order (for display).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.insertion_order
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Global memory, the call stack and the heap.
#[derive(Debug, Clone)]
pub struct Memory {
    pub globals: Globals,
    pub stack: Stack,
    pub heap: Heap,
}

impl Memory {
    pub fn new(max_heap_cells: usize) -> Self {
        Memory {
            globals: Globals::default(),
            stack: Stack::new(),
            heap: Heap::new(max_heap_cells),
        }
    }

    /// Resolve `name` to a pointer: current frame first, then globals.
    /// A reference parameter resolves to the pointer it was bound to.
    pub fn address_of(&self, name: &str) -> Result<Pointer, AddressError> {
        if let Some(frame) = self.stack.current_frame() {
            if let Some(target) = frame.reference(name) {
                return Ok(target.clone());
            }
            if frame.local(name).is_some() {
                return Ok(Pointer::local(frame.id.index, frame.id.generation, name));
            }
        }
        if self.globals.contains(name) {
            return Ok(Pointer::global(name));
        }
        Err(out_of_scope(name))
    }

    /// Dereference a pointer.
    pub fn read(&self, ptr: &Pointer) -> Result<Value, AddressError> {
        self.read_indexed(ptr, 0)
    }

    /// Write through a pointer.
    pub fn write(&mut self, ptr: &Pointer, value: Value) -> Result<(), AddressError> {
        self.write_indexed(ptr, 0, value)
    }

    /// Read the cell `index` positions past `ptr`.
    pub fn read_indexed(&self, ptr: &Pointer, index: i64) -> Result<Value, AddressError> {
        match (&ptr.space, &ptr.slot) {
            (Space::Heap(_), _) => self.heap.read(ptr, index),
            (Space::Global, Slot::Name(name)) => {
                single_cell(index)?;
                self.globals.get(name).cloned().ok_or_else(|| out_of_scope(name))
            }
            (Space::Stack(frame), Slot::Name(name)) => {
                let frame = self.stack.frame(*frame, ptr.generation)?;
                single_cell(index)?;
                frame.local(name).cloned().ok_or_else(|| out_of_scope(name))
            }
            (_, Slot::Offset(_)) => Err(out_of_scope(&ptr.to_string())),
        }
    }

    /// Write the cell `index` positions past `ptr`.
    pub fn write_indexed(&mut self, ptr: &Pointer, index: i64, value: Value) -> Result<(), AddressError> {
        match (&ptr.space, &ptr.slot) {
            (Space::Heap(_), _) => self.heap.write(ptr, index, value),
            (Space::Global, Slot::Name(name)) => {
                single_cell(index)?;
                self.globals.set(name, value);
                Ok(())
            }
            (Space::Stack(frame), Slot::Name(name)) => {
                let frame = self.stack.frame_mut(*frame, ptr.generation)?;
                single_cell(index)?;
                frame.set_local(name, value);
                Ok(())
            }
            (_, Slot::Offset(_)) => Err(out_of_scope(&ptr.to_string())),
        }
    }

    /// Read a variable by name, following reference parameters.
    pub fn load_var(&self, name: &str) -> Result<Value, AddressError> {
        if let Some(frame) = self.stack.current_frame() {
            if let Some(target) = frame.reference(name) {
                return self.read(target);
            }
            if let Some(value) = frame.local(name) {
                return Ok(value.clone());
            }
        }
        self.globals.get(name).cloned().ok_or_else(|| out_of_scope(name))
    }

    /// Assign a variable by name (see the module docs for scoping).
    pub fn store_var(&mut self, name: &str, value: Value) -> Result<(), AddressError> {
        let target = match self.stack.current_frame_mut() {
            Some(frame) => match frame.reference(name) {
                Some(target) => target.clone(),
                None => {
                    frame.set_local(name, value);
                    return Ok(());
                }
            },
            None => {
                self.globals.set(name, value);
                return Ok(());
            }
        };
        self.write(&target, value)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_HEAP_CELLS)
    }
}

fn out_of_scope(name: &str) -> AddressError {
    AddressError::OutOfScope {
        name: name.to_string(),
    }
}

fn single_cell(index: i64) -> Result<(), AddressError> {
    if index == 0 {
        Ok(())
    } else {
        Err(AddressError::IndexOutOfBounds { index, size: 1 })
    }
}
