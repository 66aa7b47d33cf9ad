//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single function's activation record
//! - [`FrameId`]: Generational identifier of a frame slot
//!
//! # Frame Generations
//!
//! Frame slots are recycled through a free list. Each slot carries a
//! generation counter: odd while a frame occupies it, even while it is free.
//! Popping a frame bumps the counter, so a [`Pointer`] taken into a returned
//! frame no longer matches and dereferencing it fails with
//! [`AddressError::StaleFrame`], even after the slot is reused by a later
//! call.

use super::value::{Pointer, Value};
use crate::interpreter::errors::AddressError;
use rustc_hash::FxHashMap;

/// Slot index plus the generation the frame was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    pub index: u32,
    pub generation: u32,
}

/// Stack frame for a function call
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub id: FrameId,
    pub function: String,
    pub locals: FxHashMap<String, Value>,
    /// Reference parameters: name → pointer into the caller's storage
    pub references: FxHashMap<String, Pointer>,
    pub insertion_order: Vec<String>, // Track order of first writes / bindings
    /// Instruction index to resume at (the instruction after `CALL`)
    pub return_address: usize,
    /// Caller variable that receives the return value, if the call named one
    pub result_dest: Option<String>,
}

impl StackFrame {
    fn new(id: FrameId, function: String, return_address: usize, result_dest: Option<String>) -> Self {
        StackFrame {
            id,
            function,
            locals: FxHashMap::default(),
            references: FxHashMap::default(),
            insertion_order: Vec::new(),
            return_address,
            result_dest,
        }
    }

    /// Bind a by-value parameter or write a local.
    pub fn set_local(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.locals.get_mut(name) {
            *slot = value;
        } else {
            self.insertion_order.push(name.to_string());
            self.locals.insert(name.to_string(), value);
        }
    }

    /// Bind a by-reference parameter.
    pub fn bind_reference(&mut self, name: &str, target: Pointer) {
        if !self.locals.contains_key(name) && !self.references.contains_key(name) {
            self.insertion_order.push(name.to_string());
        }
        self.references.insert(name.to_string(), target);
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    pub fn reference(&self, name: &str) -> Option<&Pointer> {
        self.references.get(name)
    }

    /// Whether `name` is bound in this frame at all.
    pub fn has(&self, name: &str) -> bool {
        self.locals.contains_key(name) || self.references.contains_key(name)
    }
}

/// The call stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    frames: Vec<StackFrame>,
    /// Generation counter per frame slot. Odd = occupied, even = free.
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new stack frame
    pub fn push_frame(
        &mut self,
        function: impl Into<String>,
        return_address: usize,
        result_dest: Option<String>,
    ) -> FrameId {
        let id = if let Some(index) = self.free_list.pop() {
            let generation = &mut self.generations[index as usize];
            *generation = generation.wrapping_add(1);
            FrameId {
                index,
                generation: *generation,
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(1);
            FrameId {
                index,
                generation: 1,
            }
        };

        self.frames.push(StackFrame::new(
            id,
            function.into(),
            return_address,
            result_dest,
        ));
        id
    }

    /// Pop the top stack frame, retiring its generation.
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        let frame = self.frames.pop()?;
        let index = frame.id.index;
        let generation = &mut self.generations[index as usize];
        *generation = generation.wrapping_add(1);
        self.free_list.push(index);
        Some(frame)
    }

    /// Undo the most recent [`Stack::pop_frame`], putting `frame` back on top
    /// with its original generation.
    pub(crate) fn restore_frame(&mut self, frame: StackFrame) {
        let index = frame.id.index;
        if let Some(pos) = self.free_list.iter().rposition(|&i| i == index) {
            self.free_list.remove(pos);
        }
        self.generations[index as usize] = frame.id.generation;
        self.frames.push(frame);
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Get a mutable reference to the current frame
    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// Get all frames, outermost first (for UI display)
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Get the depth of the call stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check that a frame slot still holds the frame of that generation.
    pub fn validate(&self, index: u32, generation: u32) -> Result<(), AddressError> {
        match self.generations.get(index as usize) {
            Some(&current) if current == generation && current % 2 == 1 => Ok(()),
            _ => Err(AddressError::StaleFrame {
                frame: index,
                generation,
            }),
        }
    }

    /// The live frame in slot `index` created with `generation`.
    pub fn frame(&self, index: u32, generation: u32) -> Result<&StackFrame, AddressError> {
        self.validate(index, generation)?;
        self.frames
            .iter()
            .rev()
            .find(|f| f.id.index == index)
            .ok_or(AddressError::StaleFrame {
                frame: index,
                generation,
            })
    }

    /// Mutable variant of [`Stack::frame`].
    pub fn frame_mut(&mut self, index: u32, generation: u32) -> Result<&mut StackFrame, AddressError> {
        self.validate(index, generation)?;
        self.frames
            .iter_mut()
            .rev()
            .find(|f| f.id.index == index)
            .ok_or(AddressError::StaleFrame {
                frame: index,
                generation,
            })
    }
}
