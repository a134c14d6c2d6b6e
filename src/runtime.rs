use std::io::{self, BufRead, Write};

use crate::{
    error::{AsmError, RunError},
    output::Output,
    parser::assemble,
    symbol::{decode, Opcode, Word, MEMORY_SIZE},
};

/// Prompt written before blocking on `INP`.
pub const INPUT_PROMPT: &str = "Input required:";
/// Prefix of every line written by `OUT`.
pub const OUTPUT_PREFIX: &str = "Output: ";

/// Lifecycle of the fetch-decode-execute loop.
#[derive(Clone, Debug)]
pub enum MachineState {
    Running,
    Halted,
    /// Holds the fault that stopped the machine
    Faulted(RunError),
}

/// Result of executing a single instruction.
#[derive(Debug)]
enum Step {
    Continue,
    Halt,
    Fault(RunError),
}

/// Represents complete machine state during runtime.
pub struct Machine {
    /// 100 cells, shared by program and data
    mem: [Word; MEMORY_SIZE],
    /// Program counter
    pc: usize,
    /// Accumulator
    acc: Word,
    state: MachineState,
    /// Print every executed instruction
    trace: bool,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            mem: [0; MEMORY_SIZE],
            pc: 0,
            acc: 0,
            state: MachineState::Running,
            trace: false,
        }
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Assemble `src` and load the result from address 0. Nothing is loaded on error.
    pub fn assemble(&mut self, src: &str) -> Result<Vec<Word>, AsmError> {
        let words = assemble(src)?.into_words();
        self.load(&words);
        Ok(words)
    }

    /// Copy raw words into memory starting at address 0. Cells past the end of `words` keep
    /// their previous value; anything past the end of memory is ignored.
    pub fn load(&mut self, words: &[Word]) {
        let len = words.len().min(MEMORY_SIZE);
        self.mem[..len].copy_from_slice(&words[..len]);
    }

    pub fn accumulator(&self) -> Word {
        self.acc
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn memory(&self) -> &[Word] {
        &self.mem
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Run against the process console until the program halts.
    pub fn run(&mut self) -> Result<(), RunError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(&mut stdin.lock(), &mut stdout.lock())
    }

    /// Run until the program halts, reading `INP` lines from `input` and writing to `output`.
    ///
    /// A program that never reaches `HLT` runs forever. Once halted or faulted the machine
    /// does not execute again: a halted machine returns `Ok(())` and a faulted one returns
    /// the fault that stopped it.
    pub fn run_with(
        &mut self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), RunError> {
        match &self.state {
            MachineState::Running => {}
            MachineState::Halted => return Ok(()),
            MachineState::Faulted(err) => return Err(err.clone()),
        }
        loop {
            match self.step(input, output) {
                Step::Continue => {}
                Step::Halt => {
                    self.state = MachineState::Halted;
                    return Ok(());
                }
                Step::Fault(err) => {
                    self.state = MachineState::Faulted(err.clone());
                    return Err(err);
                }
            }
        }
    }

    fn step(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Step {
        let addr = self.pc;
        let Some(&word) = self.mem.get(addr) else {
            return Step::Fault(RunError::PcOutOfRange { pc: addr });
        };
        // PC incremented before instruction is performed
        self.pc += 1;

        let (opcode, operand) = decode(word);
        let Ok(opcode) = Opcode::try_from(opcode) else {
            return Step::Fault(RunError::UnknownOpcode { addr, word });
        };

        if self.trace {
            Output::Trace.print_str(&format!(
                "{addr:02} {word:>4}  {opcode:<3} {operand:02}  acc {}\n",
                self.acc
            ));
        }

        match opcode {
            Opcode::Hlt => self.hlt(addr, word, operand),
            Opcode::Add => self.add(addr, word, operand),
            Opcode::Sub => self.sub(addr, word, operand),
            Opcode::Sta => self.sta(operand),
            Opcode::Lda => self.lda(operand),
            Opcode::Bra => self.bra(operand),
            Opcode::Brz => self.brz(operand),
            Opcode::Brp => self.brp(operand),
            Opcode::Io => self.io(addr, word, operand, input, output),
        }
    }

    fn hlt(&mut self, addr: usize, word: Word, operand: usize) -> Step {
        if operand == 0 {
            Step::Halt
        } else {
            Step::Fault(RunError::InvalidInstruction { addr, word })
        }
    }

    fn add(&mut self, addr: usize, word: Word, operand: usize) -> Step {
        match self.acc.checked_add(self.mem[operand]) {
            Some(val) => {
                self.acc = val;
                Step::Continue
            }
            None => Step::Fault(RunError::Overflow { addr, word }),
        }
    }

    fn sub(&mut self, addr: usize, word: Word, operand: usize) -> Step {
        match self.acc.checked_sub(self.mem[operand]) {
            Some(val) => {
                self.acc = val;
                Step::Continue
            }
            None => Step::Fault(RunError::Overflow { addr, word }),
        }
    }

    fn sta(&mut self, operand: usize) -> Step {
        self.mem[operand] = self.acc;
        Step::Continue
    }

    fn lda(&mut self, operand: usize) -> Step {
        self.acc = self.mem[operand];
        Step::Continue
    }

    fn bra(&mut self, operand: usize) -> Step {
        self.pc = operand;
        Step::Continue
    }

    fn brz(&mut self, operand: usize) -> Step {
        if self.acc == 0 {
            self.pc = operand;
        }
        Step::Continue
    }

    fn brp(&mut self, operand: usize) -> Step {
        // Zero does not count as positive
        if self.acc > 0 {
            self.pc = operand;
        }
        Step::Continue
    }

    fn io(
        &mut self,
        addr: usize,
        word: Word,
        operand: usize,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Step {
        let res = match operand {
            1 => self.inp(input, output),
            2 => self.out(output),
            _ => Err(RunError::InvalidInstruction { addr, word }),
        };
        match res {
            Ok(()) => Step::Continue,
            Err(err) => Step::Fault(err),
        }
    }

    fn inp(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<(), RunError> {
        write!(output, "{INPUT_PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(RunError::InputClosed);
        }
        let text = line.trim();
        self.acc = text.parse().map_err(|_| RunError::InvalidInput {
            text: text.to_string(),
        })?;
        Ok(())
    }

    fn out(&mut self, output: &mut impl Write) -> Result<(), RunError> {
        writeln!(output, "{OUTPUT_PREFIX}{}", self.acc)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Assemble and run `src`, feeding `input` to `INP`. Returns the machine and everything
    /// written to the console.
    fn run(src: &str, input: &str) -> (Machine, Result<(), RunError>, String) {
        let mut machine = Machine::new();
        machine.assemble(src).unwrap();
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::<u8>::new();
        let res = machine.run_with(&mut input, &mut output);
        (machine, res, String::from_utf8(output).unwrap())
    }

    #[test]
    fn adds_two_cells() {
        let mut machine = Machine::new();
        let words = machine
            .assemble("LDA 5\nADD 6\nHLT\nDAT 0\nDAT 10\nDAT 20")
            .unwrap();
        assert_eq!(words, vec![503, 106, 0, 0, 10, 20]);
        assert_eq!(&machine.memory()[..6], &[503, 106, 0, 0, 10, 20]);
        assert!(machine.memory()[6..].iter().all(|&cell| cell == 0));

        let mut output = Vec::<u8>::new();
        machine
            .run_with(&mut io::empty(), &mut output)
            .unwrap();
        assert_eq!(machine.accumulator(), 30);
        assert!(matches!(machine.state(), MachineState::Halted));
        assert_eq!(machine.pc(), 3);
        assert!(output.is_empty());
    }

    #[test]
    fn load_keeps_higher_cells() {
        let mut machine = Machine::new();
        machine.load(&[1, 2, 3]);
        machine.load(&[9]);
        assert_eq!(&machine.memory()[..4], &[9, 2, 3, 0]);
    }

    #[test]
    fn branch_skips_data() {
        let (machine, res, _) = run("BRA SKIP\nDAT 99\nSKIP HLT", "");
        assert!(res.is_ok());
        assert_eq!(machine.accumulator(), 0);
        assert_eq!(machine.pc(), 3);
    }

    #[test]
    fn brp_does_not_branch_on_zero() {
        // acc = 0: falls through to OUT
        let src = "LDA ZERO\nBRP END\nOUT\nEND HLT\nZERO DAT 0";
        let (_, res, out) = run(src, "");
        assert!(res.is_ok());
        assert_eq!(out, "Output: 0\n");

        // acc = 5: skips OUT
        let src = "LDA FIVE\nBRP END\nOUT\nEND HLT\nFIVE DAT 5";
        let (_, res, out) = run(src, "");
        assert!(res.is_ok());
        assert_eq!(out, "");
    }

    #[test]
    fn brp_does_not_branch_on_negative() {
        let src = "LDA NEG\nBRP END\nOUT\nEND HLT\nNEG DAT -3";
        let (_, res, out) = run(src, "");
        assert!(res.is_ok());
        assert_eq!(out, "Output: -3\n");
    }

    #[test]
    fn brz_only_on_zero() {
        let src = "LDA ONE\nBRZ END\nOUT\nEND HLT\nONE DAT 1";
        let (_, _, out) = run(src, "");
        assert_eq!(out, "Output: 1\n");

        let src = "LDA ZERO\nBRZ END\nOUT\nEND HLT\nZERO DAT 0";
        let (_, _, out) = run(src, "");
        assert_eq!(out, "");
    }

    #[test]
    fn countdown_loop() {
        let src = "\
# count down from the input to 1
        INP
LOOP    OUT
        SUB ONE
        BRP LOOP
        HLT
ONE     DAT 1
";
        let (machine, res, out) = run(src, "3\n");
        assert!(res.is_ok());
        assert_eq!(
            out,
            "Input required:Output: 3\nOutput: 2\nOutput: 1\n"
        );
        assert_eq!(machine.accumulator(), 0);
    }

    #[test]
    fn input_output_round_trip() {
        let (machine, res, out) = run("INP\nSTA 99\nLDA 99\nOUT\nHLT", "7\n");
        assert!(res.is_ok());
        assert_eq!(out, "Input required:Output: 7\n");
        assert_eq!(machine.memory()[99], 7);
    }

    #[test]
    fn input_is_trimmed_and_signed() {
        let (machine, res, _) = run("INP\nHLT", "  -12  \n");
        assert!(res.is_ok());
        assert_eq!(machine.accumulator(), -12);
    }

    #[test]
    fn bad_input() {
        let (machine, res, _) = run("INP\nHLT", "seven\n");
        assert!(matches!(res, Err(RunError::InvalidInput { ref text }) if text == "seven"));
        assert!(matches!(machine.state(), MachineState::Faulted(_)));

        let (_, res, _) = run("INP\nHLT", "");
        assert!(matches!(res, Err(RunError::InputClosed)));
    }

    #[test]
    fn hlt_with_operand_is_invalid() {
        let (machine, res, _) = run("HLT 5", "");
        assert!(matches!(
            res,
            Err(RunError::InvalidInstruction { addr: 0, word: 5 })
        ));
        assert!(matches!(machine.state(), MachineState::Faulted(_)));
    }

    #[test]
    fn io_sub_selector_is_checked() {
        let mut machine = Machine::new();
        machine.load(&[903]);
        let res = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(
            res,
            Err(RunError::InvalidInstruction { addr: 0, word: 903 })
        ));
    }

    #[test]
    fn reserved_opcode_faults() {
        let mut machine = Machine::new();
        machine.load(&[401]);
        let res = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(res, Err(RunError::UnknownOpcode { addr: 0, word: 401 })));

        let mut machine = Machine::new();
        machine.load(&[-1]);
        let res = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(res, Err(RunError::UnknownOpcode { word: -1, .. })));
    }

    #[test]
    fn running_off_the_end() {
        let mut machine = Machine::new();
        // Jump to the last cell, which holds `LDA 0` and falls through
        machine.load(&[699]);
        machine.mem[99] = 500;
        let res = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(res, Err(RunError::PcOutOfRange { pc: 100 })));
    }

    #[test]
    fn overflow_faults() {
        let mut machine = Machine::new();
        machine.load(&[103, 103, 0, Word::MAX]);
        let res = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(res, Err(RunError::Overflow { addr: 1, word: 103 })));
        assert_eq!(machine.accumulator(), Word::MAX);
    }

    #[test]
    fn self_modifying_program() {
        // `HLT 5` at address 2 is patched into a plain `HLT` before it runs
        let src = "LDA FIX\nSTA 2\nHLT 5\nFIX DAT 0";
        let (machine, res, _) = run(src, "");
        assert!(res.is_ok());
        assert_eq!(machine.memory()[2], 0);
        assert_eq!(machine.pc(), 3);
    }

    #[test]
    fn faulted_machine_keeps_its_fault() {
        let mut machine = Machine::new();
        machine.load(&[5]);
        let first = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(
            first,
            Err(RunError::InvalidInstruction { addr: 0, word: 5 })
        ));

        let second = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(matches!(
            second,
            Err(RunError::InvalidInstruction { addr: 0, word: 5 })
        ));
        assert!(matches!(
            machine.state(),
            MachineState::Faulted(RunError::InvalidInstruction { .. })
        ));
        // Nothing past the faulting instruction ran
        assert_eq!(machine.pc(), 1);
    }

    #[test]
    fn failed_assembly_leaves_memory_untouched() {
        let mut machine = Machine::new();
        machine.load(&[503, 106, 0, 0, 10, 20]);
        let before = machine.memory().to_vec();

        let err = machine.assemble("LDA 1\nBRA NOWHERE\nHLT").unwrap_err();
        assert!(matches!(err, AsmError::UndefinedLabel { .. }));
        assert_eq!(machine.memory(), before.as_slice());
    }

    #[test]
    fn halted_machine_stays_halted() {
        let (mut machine, res, _) = run("HLT", "");
        assert!(res.is_ok());
        let res = machine.run_with(&mut io::empty(), &mut io::sink());
        assert!(res.is_ok());
        assert_eq!(machine.pc(), 1);
    }
}
