//! Instruction model produced by the loader
//!
//! An [`Instruction`] is a fixed-arity record: an [`Opcode`] plus operands
//! already classified as [`Operand::Immediate`], [`Operand::Variable`],
//! [`Operand::Label`] or [`Operand::Pointer`]. The arity and operand kinds of
//! every opcode live in a single table ([`Opcode::signature`]) so the loader
//! can reject malformed programs before execution starts.

use super::loader::LoadError;
use crate::memory::value::Value;
use rustc_hash::FxHashMap;
use std::fmt;

/// Every opcode the engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Assign,
    ConstAssign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Uminus,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Concat,
    Strlen,
    Getchar,
    Jump,
    JumpT,
    JumpF,
    Param,
    RefParam,
    Call,
    Return,
    AllocHeap,
    FreeHeap,
    AddrOf,
    DerefLoad,
    DerefStore,
    IndexLoad,
    IndexStore,
    Print,
    Halt,
}

/// What the loader expects in one operand position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Variable that receives the result.
    Dest,
    /// Immediate literal or variable.
    Value,
    /// Immediate literal only.
    Immediate,
    /// Label declared somewhere in the program.
    Label,
    /// Bare variable name (not evaluated).
    VarName,
    /// Variable expected to hold a pointer.
    Pointer,
    /// Non-negative integer literal.
    Count,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OperandKind::Dest => "a writable variable",
            OperandKind::Value => "a literal or variable",
            OperandKind::Immediate => "a literal",
            OperandKind::Label => "a label",
            OperandKind::VarName => "a variable name",
            OperandKind::Pointer => "a pointer variable",
            OperandKind::Count => "a non-negative integer literal",
        };
        f.write_str(text)
    }
}

use OperandKind::{Count, Dest, Immediate, Label, Pointer, VarName, Value as Val};

impl Opcode {
    pub const ALL: [Opcode; 35] = [
        Opcode::Assign,
        Opcode::ConstAssign,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Uminus,
        Opcode::And,
        Opcode::Or,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Le,
        Opcode::Ge,
        Opcode::Concat,
        Opcode::Strlen,
        Opcode::Getchar,
        Opcode::Jump,
        Opcode::JumpT,
        Opcode::JumpF,
        Opcode::Param,
        Opcode::RefParam,
        Opcode::Call,
        Opcode::Return,
        Opcode::AllocHeap,
        Opcode::FreeHeap,
        Opcode::AddrOf,
        Opcode::DerefLoad,
        Opcode::DerefStore,
        Opcode::IndexLoad,
        Opcode::IndexStore,
        Opcode::Print,
        Opcode::Halt,
    ];

    /// Mnemonic as written in source.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Assign => "ASSIGN",
            Opcode::ConstAssign => "CONST_ASSIGN",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Uminus => "UMINUS",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Le => "LE",
            Opcode::Ge => "GE",
            Opcode::Concat => "CONCAT",
            Opcode::Strlen => "STRLEN",
            Opcode::Getchar => "GETCHAR",
            Opcode::Jump => "JUMP",
            Opcode::JumpT => "JUMPT",
            Opcode::JumpF => "JUMPF",
            Opcode::Param => "PARAM",
            Opcode::RefParam => "REF_PARAM",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::AllocHeap => "ALLOC_HEAP",
            Opcode::FreeHeap => "FREE_HEAP",
            Opcode::AddrOf => "ADDR_OF",
            Opcode::DerefLoad => "DEREF_LOAD",
            Opcode::DerefStore => "DEREF_STORE",
            Opcode::IndexLoad => "INDEX_LOAD",
            Opcode::IndexStore => "INDEX_STORE",
            Opcode::Print => "PRINT",
            Opcode::Halt => "HALT",
        }
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    /// Operand kinds in positional order, including trailing optional ones.
    pub fn signature(self) -> &'static [OperandKind] {
        match self {
            Opcode::Assign | Opcode::Uminus | Opcode::Strlen | Opcode::AllocHeap => &[Dest, Val],
            Opcode::ConstAssign => &[Dest, Immediate],
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::And
            | Opcode::Or
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Le
            | Opcode::Ge
            | Opcode::Concat
            | Opcode::Getchar => &[Dest, Val, Val],
            Opcode::Jump => &[Label],
            Opcode::JumpT | Opcode::JumpF => &[Val, Label],
            Opcode::Param | Opcode::Print | Opcode::Return => &[Val],
            Opcode::RefParam => &[VarName],
            Opcode::Call => &[Label, Count, Dest],
            Opcode::FreeHeap => &[Pointer],
            Opcode::AddrOf => &[Dest, VarName],
            Opcode::DerefLoad => &[Dest, Pointer],
            Opcode::DerefStore => &[Pointer, Val],
            Opcode::IndexLoad => &[Dest, Pointer, Val],
            Opcode::IndexStore => &[Pointer, Val, Val],
            Opcode::Halt => &[],
        }
    }

    /// How many trailing operands of [`Opcode::signature`] may be omitted.
    pub fn optional_operands(self) -> usize {
        match self {
            Opcode::Call | Opcode::Return => 1,
            _ => 0,
        }
    }

    /// Whether operand 0 names the variable that receives a result.
    pub fn writes_dest(self) -> bool {
        self.signature().first() == Some(&Dest)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A label operand, resolved to its instruction index at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRef {
    pub name: String,
    pub target: usize,
}

/// A classified operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Immediate(Value),
    Variable(String),
    Label(LabelRef),
    Pointer(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(Value::Text(s)) => write!(f, "{:?}", s),
            Operand::Immediate(value) => write!(f, "{}", value),
            Operand::Variable(name) | Operand::Pointer(name) => f.write_str(name),
            Operand::Label(label) => f.write_str(&label.name),
        }
    }
}

/// One executable instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// 1-based source line.
    pub line: usize,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

/// A declared label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDef {
    pub name: String,
    /// Instruction index the label points at (may equal the program length).
    pub index: usize,
    /// Declared parameter names for `name(a, b):` labels.
    pub params: Option<Vec<String>>,
    pub line: usize,
}

/// Label name → definition. Only the loader can add entries; the table is
/// read-only once a [`Program`] exists.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: FxHashMap<String, LabelDef>,
}

impl LabelTable {
    pub(crate) fn declare(&mut self, def: LabelDef) -> Result<(), LoadError> {
        if self.labels.contains_key(&def.name) {
            return Err(LoadError::DuplicateLabel {
                line: def.line,
                label: def.name,
            });
        }
        self.labels.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&LabelDef> {
        self.labels.get(name)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A loaded, linked program.
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: LabelTable,
}

impl Program {
    pub(crate) fn new(instructions: Vec<Instruction>, labels: LabelTable) -> Self {
        Program {
            instructions,
            labels,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Source line of the instruction at `pc`, if any.
    pub fn line_of(&self, pc: usize) -> Option<usize> {
        self.instructions.get(pc).map(|i| i.line)
    }
}
