use std::str::FromStr;

use crate::{
    error::AsmError,
    lexer::{tokenize, SourceLine, Token},
    symbol::{Mnemonic, SymbolTable, Word, DAT, MEMORY_SIZE},
};

/// Assembled machine words together with the labels that were resolved for them.
#[derive(Debug)]
pub struct Program {
    words: Vec<Word>,
    symbols: SymbolTable,
}

impl Program {
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn into_words(self) -> Vec<Word> {
        self.words
    }
}

/// Assemble source text into machine words, one per instruction or `DAT` line.
pub fn assemble(src: &str) -> Result<Program, AsmError> {
    AsmParser::new(src).parse()
}

/// Single source line after its label (if any) has been stripped.
#[derive(Debug)]
struct Stmt<'a> {
    line: usize,
    op: Token<'a>,
    operand: Option<Token<'a>>,
    trailing: Option<Token<'a>>,
}

/// Transforms token lines into machine words in two passes: labels first, encoding second.
pub struct AsmParser<'a> {
    lines: Vec<SourceLine<'a>>,
    symbols: SymbolTable,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            lines: tokenize(src),
            symbols: SymbolTable::new(),
        }
    }

    pub fn parse(mut self) -> Result<Program, AsmError> {
        if self.lines.len() > MEMORY_SIZE {
            let overflow = &self.lines[MEMORY_SIZE];
            return Err(AsmError::ProgramTooLarge {
                len: self.lines.len(),
                span: overflow.span().into(),
            });
        }

        let lines = std::mem::take(&mut self.lines);
        let stmts = self.resolve_labels(&lines)?;

        let mut words = Vec::with_capacity(stmts.len());
        for stmt in &stmts {
            words.push(self.encode(stmt)?);
        }

        Ok(Program {
            words,
            symbols: self.symbols,
        })
    }

    /// First pass. A line of two or more tokens starting with anything other than a mnemonic
    /// or `DAT` defines a label for the address of that line.
    fn resolve_labels(&mut self, lines: &[SourceLine<'a>]) -> Result<Vec<Stmt<'a>>, AsmError> {
        let mut stmts = Vec::with_capacity(lines.len());
        for (addr, src_line) in lines.iter().enumerate() {
            let tokens = &src_line.tokens;
            let first = src_line.first();

            let rest = if tokens.len() >= 2 && !is_opcode_token(first.val) {
                self.symbols
                    .define(first.val, addr)
                    .map_err(|prev| AsmError::DuplicateLabel {
                        line: src_line.line,
                        label: first.val.to_string(),
                        first: prev,
                        span: first.span.into(),
                    })?;
                &tokens[1..]
            } else {
                &tokens[..]
            };

            stmts.push(Stmt {
                line: src_line.line,
                op: rest[0],
                operand: rest.get(1).copied(),
                trailing: rest.get(2).copied(),
            });
        }
        Ok(stmts)
    }

    /// Second pass.
    fn encode(&self, stmt: &Stmt<'a>) -> Result<Word, AsmError> {
        if let Some(tok) = stmt.trailing {
            return Err(AsmError::TrailingTokens {
                line: stmt.line,
                token: tok.val.to_string(),
                span: tok.span.into(),
            });
        }

        if stmt.op.val == DAT {
            return match stmt.operand {
                None => Ok(0),
                Some(tok) => Word::from_str(tok.val).map_err(|_| AsmError::InvalidLiteral {
                    line: stmt.line,
                    text: tok.val.to_string(),
                    span: tok.span.into(),
                }),
            };
        }

        let mnemonic =
            Mnemonic::from_str(stmt.op.val).map_err(|_| AsmError::UnknownMnemonic {
                line: stmt.line,
                token: stmt.op.val.to_string(),
                span: stmt.op.span.into(),
            })?;

        let Some(operand) = stmt.operand else {
            return Ok(mnemonic.code());
        };
        let addr = match Word::from_str(operand.val) {
            Ok(lit) => lit,
            Err(_) => self
                .symbols
                .get(operand.val)
                .map(|addr| addr as Word)
                .ok_or_else(|| AsmError::UndefinedLabel {
                    line: stmt.line,
                    label: operand.val.to_string(),
                    span: operand.span.into(),
                })?,
        };

        mnemonic
            .code()
            .checked_mul(100)
            .and_then(|code| code.checked_add(addr))
            .ok_or_else(|| AsmError::OperandOverflow {
                line: stmt.line,
                text: operand.val.to_string(),
                span: operand.span.into(),
            })
    }
}

fn is_opcode_token(token: &str) -> bool {
    token == DAT || Mnemonic::from_str(token).is_ok()
}
