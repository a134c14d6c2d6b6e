use std::{collections::HashMap, fmt, ops::Range, str::FromStr};

use miette::SourceSpan;

/// Contents of a single memory cell or register.
pub type Word = i64;

/// Number of addressable memory cells.
pub const MEMORY_SIZE: usize = 100;

/// Label table of label -> memory address (instruction position)
#[derive(Default, Debug)]
pub struct SymbolTable {
    table: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Define a label. Returns the previous address if the label was already defined.
    pub fn define(&mut self, label: &str, addr: usize) -> Result<(), usize> {
        match self.table.get(label) {
            Some(&prev) => Err(prev),
            None => {
                self.table.insert(label.to_string(), addr);
                Ok(())
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.table.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn range(&self) -> Range<usize> {
        self.offs.0..self.offs.0 + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub struct SrcOffset(pub usize);

/// Symbolic instruction names accepted by the assembler.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Hlt,
    Add,
    Sub,
    Sta,
    Lda,
    Bra,
    Brz,
    Brp,
    Inp,
    Out,
}

impl Mnemonic {
    /// Value the mnemonic encodes to. `INP` and `OUT` are already complete words and
    /// are never combined with an operand.
    pub fn code(self) -> Word {
        match self {
            Mnemonic::Hlt => 0,
            Mnemonic::Add => 1,
            Mnemonic::Sub => 2,
            Mnemonic::Sta => 3,
            Mnemonic::Lda => 5,
            Mnemonic::Bra => 6,
            Mnemonic::Brz => 7,
            Mnemonic::Brp => 8,
            Mnemonic::Inp => 901,
            Mnemonic::Out => 902,
        }
    }
}

impl FromStr for Mnemonic {
    type Err = ();

    // Case-sensitive, exact match only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HLT" => Ok(Mnemonic::Hlt),
            "ADD" => Ok(Mnemonic::Add),
            "SUB" => Ok(Mnemonic::Sub),
            "STA" => Ok(Mnemonic::Sta),
            "LDA" => Ok(Mnemonic::Lda),
            "BRA" => Ok(Mnemonic::Bra),
            "BRZ" => Ok(Mnemonic::Brz),
            "BRP" => Ok(Mnemonic::Brp),
            "INP" => Ok(Mnemonic::Inp),
            "OUT" => Ok(Mnemonic::Out),
            _ => Err(()),
        }
    }
}

/// Pseudo-op reserving one memory cell.
pub const DAT: &str = "DAT";

/// Operation selected by the hundreds digit of an instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Hlt = 0,
    Add = 1,
    Sub = 2,
    Sta = 3,
    Lda = 5,
    Bra = 6,
    Brz = 7,
    Brp = 8,
    Io = 9,
}

impl TryFrom<Word> for Opcode {
    type Error = ();

    // Opcode 4 is reserved.
    fn try_from(value: Word) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Hlt),
            1 => Ok(Opcode::Add),
            2 => Ok(Opcode::Sub),
            3 => Ok(Opcode::Sta),
            5 => Ok(Opcode::Lda),
            6 => Ok(Opcode::Bra),
            7 => Ok(Opcode::Brz),
            8 => Ok(Opcode::Brp),
            9 => Ok(Opcode::Io),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Hlt => "HLT",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Sta => "STA",
            Opcode::Lda => "LDA",
            Opcode::Bra => "BRA",
            Opcode::Brz => "BRZ",
            Opcode::Brp => "BRP",
            Opcode::Io => "IO",
        };
        f.pad(name)
    }
}

/// Split a word into `(opcode, operand)`.
///
/// Euclidean division keeps the operand within `0..100` for every word, so negative
/// words decode to a negative opcode instead of a negative address.
pub fn decode(word: Word) -> (Word, usize) {
    let opcode = word.div_euclid(100);
    let operand = word.rem_euclid(100) as usize;
    (opcode, operand)
}
