//! Two-pass loader: source lines → linked [`Program`]
//!
//! Pass one lexes every line and records label declarations against the
//! index of the next instruction. Pass two classifies each operand against
//! its opcode's signature and resolves label references. Any failure is a
//! [`LoadError`] and execution never starts.

use super::instruction::{
    Instruction, LabelDef, LabelRef, LabelTable, Opcode, Operand, OperandKind, Program,
};
use super::lexer::{lex_line, SourceLine, Token};
use crate::interpreter::constants::RETURN_SLOT;
use crate::memory::value::Value;
use thiserror::Error;

/// Load-time errors. These are reported once, before execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("line {line}: syntax error: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown opcode '{name}'")]
    UnknownOpcode { line: usize, name: String },

    /// Operand count does not match the opcode's arity.
    #[error("line {line}: {opcode} expects {expected} operand(s), got {got}")]
    Arity {
        line: usize,
        opcode: Opcode,
        expected: String,
        got: usize,
    },

    /// Operand present but of the wrong kind.
    #[error("line {line}: operand {position} of {opcode} must be {expected}, got '{found}'")]
    OperandKind {
        line: usize,
        opcode: Opcode,
        position: usize,
        expected: OperandKind,
        found: String,
    },

    /// A jump or call names a label that is never declared.
    #[error("line {line}: undefined label '{label}'")]
    Link { line: usize, label: String },

    #[error("line {line}: label '{label}' is already declared")]
    DuplicateLabel { line: usize, label: String },
}

impl LoadError {
    pub fn line(&self) -> usize {
        match self {
            LoadError::Syntax { line, .. }
            | LoadError::UnknownOpcode { line, .. }
            | LoadError::Arity { line, .. }
            | LoadError::OperandKind { line, .. }
            | LoadError::Link { line, .. }
            | LoadError::DuplicateLabel { line, .. } => *line,
        }
    }
}

struct RawInstruction {
    mnemonic: String,
    operands: Vec<Token>,
    line: usize,
}

/// Load a whole source text.
pub fn load_program(source: &str) -> Result<Program, LoadError> {
    load_lines(source.lines())
}

/// Load from an ordered sequence of lines.
pub fn load_lines<I, S>(lines: I) -> Result<Program, LoadError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut labels = LabelTable::default();
    let mut raw = Vec::new();

    for (i, text) in lines.into_iter().enumerate() {
        let line = i + 1;
        match lex_line(text.as_ref(), line)? {
            SourceLine::Blank => {}
            SourceLine::Label { params: Some(params), .. }
                if params.iter().any(|p| p == RETURN_SLOT) =>
            {
                return Err(LoadError::Syntax {
                    line,
                    message: format!("'{}' cannot be a parameter name", RETURN_SLOT),
                });
            }
            SourceLine::Label { name, params } => labels.declare(LabelDef {
                name,
                index: raw.len(),
                params,
                line,
            })?,
            SourceLine::Instruction { mnemonic, operands } => raw.push(RawInstruction {
                mnemonic,
                operands,
                line,
            }),
        }
    }

    let instructions = raw
        .into_iter()
        .map(|r| assemble(r, &labels))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program::new(instructions, labels))
}

fn assemble(raw: RawInstruction, labels: &LabelTable) -> Result<Instruction, LoadError> {
    let line = raw.line;
    let opcode = Opcode::from_name(&raw.mnemonic).ok_or_else(|| LoadError::UnknownOpcode {
        line,
        name: raw.mnemonic.clone(),
    })?;

    let signature = opcode.signature();
    let required = signature.len() - opcode.optional_operands();
    let got = raw.operands.len();
    if got < required || got > signature.len() {
        let expected = if required == signature.len() {
            required.to_string()
        } else {
            format!("{} to {}", required, signature.len())
        };
        return Err(LoadError::Arity {
            line,
            opcode,
            expected,
            got,
        });
    }

    let operands = raw
        .operands
        .into_iter()
        .zip(signature.iter().copied())
        .enumerate()
        .map(|(position, (token, kind))| classify(token, kind, opcode, position + 1, line, labels))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Instruction {
        opcode,
        operands,
        line,
    })
}

fn classify(
    token: Token,
    kind: OperandKind,
    opcode: Opcode,
    position: usize,
    line: usize,
    labels: &LabelTable,
) -> Result<Operand, LoadError> {
    let mismatch = |token: &Token| LoadError::OperandKind {
        line,
        opcode,
        position,
        expected: kind,
        found: token.describe(),
    };

    match (kind, token) {
        // RETVAL is read-only; writes or addresses through it could never be read back
        (OperandKind::Dest | OperandKind::VarName, Token::Ident(name)) if name == RETURN_SLOT => {
            Err(LoadError::OperandKind {
                line,
                opcode,
                position,
                expected: kind,
                found: name,
            })
        }
        (OperandKind::Dest | OperandKind::VarName, Token::Ident(name)) => {
            Ok(Operand::Variable(name))
        }
        (OperandKind::Pointer, Token::Ident(name)) => Ok(Operand::Pointer(name)),
        (OperandKind::Value, Token::Ident(name)) => Ok(Operand::Variable(name)),
        (OperandKind::Value | OperandKind::Immediate, token) => literal(token)
            .map(Operand::Immediate)
            .map_err(|token| mismatch(&token)),
        (OperandKind::Label, Token::Ident(name)) => match labels.resolve(&name) {
            Some(def) => Ok(Operand::Label(LabelRef {
                target: def.index,
                name,
            })),
            None => Err(LoadError::Link { line, label: name }),
        },
        (OperandKind::Count, Token::Integer(n)) if n >= 0 => {
            Ok(Operand::Immediate(Value::Integer(n)))
        }
        (_, token) => Err(mismatch(&token)),
    }
}

/// Literal tokens become values; identifiers are handed back.
fn literal(token: Token) -> Result<Value, Token> {
    match token {
        Token::Integer(n) => Ok(Value::Integer(n)),
        Token::Float(x) => Ok(Value::Float(x)),
        Token::Boolean(b) => Ok(Value::Boolean(b)),
        Token::Text(s) => Ok(Value::Text(s)),
        ident @ Token::Ident(_) => Err(ident),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_point_at_next_instruction() {
        let program = load_program("JUMP my_label\nHALT\nmy_label:\nASSIGN y, 20\n").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.labels().resolve("my_label").unwrap().index, 2);
        assert_eq!(
            program.instructions()[0].operands[0],
            Operand::Label(LabelRef {
                name: "my_label".to_string(),
                target: 2
            })
        );
    }

    #[test]
    fn forward_and_backward_references_resolve() {
        let src = "top:\nJUMPT c, bottom\nJUMP top\nbottom:\n";
        let program = load_program(src).unwrap();
        assert_eq!(program.labels().resolve("bottom").unwrap().index, 2);
        assert_eq!(program.labels().resolve("top").unwrap().index, 0);
    }

    #[test]
    fn undefined_label_is_a_link_error() {
        let err = load_program("JUMP non_existent_label").unwrap_err();
        assert_eq!(
            err,
            LoadError::Link {
                line: 1,
                label: "non_existent_label".to_string()
            }
        );
    }

    #[test]
    fn undefined_call_target_is_a_link_error() {
        assert!(matches!(
            load_program("PARAM 1\nCALL nowhere, 1"),
            Err(LoadError::Link { line: 2, .. })
        ));
    }

    #[test]
    fn wrong_operand_count_is_an_arity_error() {
        assert!(matches!(
            load_program("ADD x, 1"),
            Err(LoadError::Arity {
                opcode: Opcode::Add,
                got: 2,
                ..
            })
        ));
        assert!(matches!(
            load_program("HALT now"),
            Err(LoadError::Arity { .. })
        ));
    }

    #[test]
    fn optional_operands() {
        let program = load_program("f:\nRETURN\nRETURN 1\nCALL f, 0\nCALL f, 0, r").unwrap();
        assert!(program.instructions()[0].operands.is_empty());
        assert_eq!(program.instructions()[1].operands.len(), 1);
        assert_eq!(program.instructions()[3].operands.len(), 3);
    }

    #[test]
    fn literal_destination_is_rejected() {
        assert!(matches!(
            load_program("ADD 3, 1, 2"),
            Err(LoadError::OperandKind {
                position: 1,
                expected: OperandKind::Dest,
                ..
            })
        ));
    }

    #[test]
    fn return_slot_is_not_writable() {
        for src in [
            "ASSIGN RETVAL, 5\nPRINT RETVAL",
            "f:\nRETURN 1\nCALL f, 0, RETVAL",
            "ADDR_OF p, RETVAL",
            "ADD RETVAL, 1, 2",
        ] {
            assert!(
                matches!(
                    load_program(src),
                    Err(LoadError::OperandKind { ref found, .. }) if found == "RETVAL"
                ),
                "{}",
                src
            );
        }
        assert!(matches!(
            load_program("f(RETVAL):\nRETURN"),
            Err(LoadError::Syntax { line: 1, .. })
        ));
        // Reading it stays legal.
        assert!(load_program("f:\nRETURN 1\nCALL f, 0\nPRINT RETVAL\nASSIGN x, RETVAL").is_ok());
    }

    #[test]
    fn call_count_must_be_a_literal() {
        assert!(matches!(
            load_program("f:\nCALL f, n"),
            Err(LoadError::OperandKind {
                expected: OperandKind::Count,
                ..
            })
        ));
        assert!(load_program("f:\nCALL f, -1").is_err());
    }

    #[test]
    fn const_assign_requires_literal() {
        assert!(load_program("CONST_ASSIGN x, y").is_err());
        let program = load_program("CONST_ASSIGN x, \"hi\"").unwrap();
        assert_eq!(
            program.instructions()[0].operands[1],
            Operand::Immediate(Value::Text("hi".to_string()))
        );
    }

    #[test]
    fn pointer_operands_are_classified() {
        let program = load_program("DEREF_LOAD v, p").unwrap();
        assert_eq!(
            program.instructions()[0].operands[1],
            Operand::Pointer("p".to_string())
        );
    }

    #[test]
    fn unknown_opcode() {
        assert!(matches!(
            load_program("\n\nFROB x"),
            Err(LoadError::UnknownOpcode { line: 3, .. })
        ));
    }

    #[test]
    fn source_lines_are_recorded() {
        let program = load_program("# header\n\nASSIGN x, 1\n  PRINT x\n").unwrap();
        assert_eq!(program.line_of(0), Some(3));
        assert_eq!(program.line_of(1), Some(4));
        assert_eq!(program.line_of(2), None);
    }

    #[test]
    fn parameter_lists_are_kept() {
        let program = load_program("add(a, b):\nADD r, a, b\nRETURN r").unwrap();
        let def = program.labels().resolve("add").unwrap();
        assert_eq!(def.params.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    }
}
