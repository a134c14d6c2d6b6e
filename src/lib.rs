// Assembling
mod lexer;
mod parser;
pub use parser::{assemble, AsmParser, Program};
mod symbol;
pub use symbol::{decode, Mnemonic, Opcode, SymbolTable, Word, MEMORY_SIZE};

// Running
mod runtime;
pub use runtime::{Machine, MachineState, INPUT_PROMPT, OUTPUT_PREFIX};

mod error;
pub use error::{AsmError, RunError};

pub mod output;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
