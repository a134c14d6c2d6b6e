use std::{io, sync::Arc};

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::symbol::{Word, MEMORY_SIZE};

// Assembler errors

#[derive(Error, Diagnostic, Debug)]
pub enum AsmError {
    #[error("line {line}: unknown mnemonic `{token}`")]
    #[diagnostic(
        code(asm::unknown_mnemonic),
        help("valid mnemonics are HLT, ADD, SUB, STA, LDA, BRA, BRZ, BRP, INP, OUT and DAT")
    )]
    UnknownMnemonic {
        line: usize,
        token: String,
        #[label("not a mnemonic")]
        span: SourceSpan,
    },

    #[error("line {line}: undefined label `{label}`")]
    #[diagnostic(
        code(asm::undefined_label),
        help("operands must be integer literals or labels defined at the start of a line")
    )]
    UndefinedLabel {
        line: usize,
        label: String,
        #[label("undefined label")]
        span: SourceSpan,
    },

    #[error("line {line}: invalid integer literal `{text}`")]
    #[diagnostic(code(asm::bad_lit), help("DAT takes an optional integer literal like 42 or -7"))]
    InvalidLiteral {
        line: usize,
        text: String,
        #[label("incorrect literal")]
        span: SourceSpan,
    },

    #[error("line {line}: operand `{text}` does not fit in an instruction word")]
    #[diagnostic(
        code(asm::operand_overflow),
        help("instruction operands are addresses from 0 to 99 or label names")
    )]
    OperandOverflow {
        line: usize,
        text: String,
        #[label("operand too large")]
        span: SourceSpan,
    },

    #[error("line {line}: duplicate label `{label}`")]
    #[diagnostic(
        code(asm::duplicate_label),
        help("label `{label}` was first defined for address {first}")
    )]
    DuplicateLabel {
        line: usize,
        label: String,
        first: usize,
        #[label("duplicate label")]
        span: SourceSpan,
    },

    #[error("line {line}: unexpected token `{token}`")]
    #[diagnostic(
        code(asm::trailing_tokens),
        help("instructions take at most one operand")
    )]
    TrailingTokens {
        line: usize,
        token: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("program is {len} words long but memory only holds {}", MEMORY_SIZE)]
    #[diagnostic(code(asm::too_large), help("remove instructions or DAT cells"))]
    ProgramTooLarge {
        len: usize,
        #[label("does not fit in memory")]
        span: SourceSpan,
    },
}

// Runtime errors

#[derive(Error, Diagnostic, Clone, Debug)]
pub enum RunError {
    #[error("invalid instruction {word} at address {addr}")]
    #[diagnostic(
        code(run::invalid_instruction),
        help("HLT only accepts operand 0 and IO only accepts 1 (INP) or 2 (OUT)")
    )]
    InvalidInstruction { addr: usize, word: Word },

    #[error("unknown opcode in word {word} at address {addr}")]
    #[diagnostic(code(run::unknown_opcode), help("opcode 4 is reserved"))]
    UnknownOpcode { addr: usize, word: Word },

    #[error("program counter ran past the end of memory ({pc})")]
    #[diagnostic(
        code(run::pc_out_of_range),
        help("make sure every path through the program ends in HLT")
    )]
    PcOutOfRange { pc: usize },

    #[error("accumulator overflow executing {word} at address {addr}")]
    #[diagnostic(code(run::overflow))]
    Overflow { addr: usize, word: Word },

    #[error("input `{text}` is not an integer")]
    #[diagnostic(code(run::bad_input))]
    InvalidInput { text: String },

    #[error("input closed while waiting for INP")]
    #[diagnostic(code(run::input_closed))]
    InputClosed,

    #[error("console I/O failed: {0}")]
    #[diagnostic(code(run::io))]
    Io(#[source] Arc<io::Error>),
}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        RunError::Io(Arc::new(err))
    }
}
