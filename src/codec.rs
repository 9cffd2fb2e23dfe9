use crate::opcodes::{self, InstructionSet};
use thiserror::Error;

/// Decoding failures
///
/// `ExtendedArg` is the documented bail-out condition: the wide-operand
/// encoding is not implemented, and rewriting a stream we cannot fully decode
/// would corrupt it. `Truncated` means the input violates the codec contract
/// (a validly compiled body never ends mid-instruction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Wide-operand escape opcode met at the given byte offset
    #[error("extended-argument opcode at byte offset {offset}: 32-bit operands are not supported")]
    ExtendedArg { offset: usize },

    /// Input exhausted in the middle of an instruction
    #[error("bytecode truncated mid-instruction at byte offset {offset}")]
    Truncated { offset: usize },
}

/// A single decoded instruction
///
/// The operand is present iff the opcode is at or above the instruction set's
/// has-argument threshold. Both forms re-encode to exactly the bytes they were
/// decoded from, so a stream of instructions carries its own byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: Option<u16>,
}

impl Instruction {
    /// An argument-less instruction
    pub fn op(opcode: u8) -> Self {
        Instruction {
            opcode,
            operand: None,
        }
    }

    /// An instruction with a u16 operand
    pub fn with_operand(opcode: u8, operand: u16) -> Self {
        Instruction {
            opcode,
            operand: Some(operand),
        }
    }

    /// Number of bytes this instruction occupies when encoded
    pub fn encoded_len(&self) -> usize {
        match self.operand {
            Some(_) => 3,
            None => 1,
        }
    }
}

/// Lazy forward-only decoder over a raw bytecode stream
///
/// Yields one `Instruction` per step. Iteration ends cleanly when the input
/// is exhausted at an opcode boundary; any error is yielded once and the
/// decoder is fused afterwards.
pub struct Decoder<'a> {
    code: &'a [u8],
    pos: usize,
    isa: InstructionSet,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over `code` using the given instruction set
    pub fn new(code: &'a [u8], isa: &InstructionSet) -> Self {
        Decoder {
            code,
            pos: 0,
            isa: *isa,
        }
    }

    /// Byte offset of the next instruction to decode
    pub fn offset(&self) -> usize {
        self.pos
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.code.len() {
            return None;
        }

        let offset = self.pos;
        let opcode = self.code[offset];

        if opcode == self.isa.extended_arg {
            self.pos = self.code.len();
            return Some(Err(DecodeError::ExtendedArg { offset }));
        }

        if !self.isa.has_argument(opcode) {
            self.pos += 1;
            return Some(Ok(Instruction::op(opcode)));
        }

        match opcodes::read_u16(self.code, offset + 1) {
            Ok(operand) => {
                self.pos += 3;
                Some(Ok(Instruction::with_operand(opcode, operand)))
            }
            Err(_) => {
                self.pos = self.code.len();
                Some(Err(DecodeError::Truncated { offset }))
            }
        }
    }
}

/// Decode a full bytecode stream into an instruction sequence
pub fn decode(code: &[u8], isa: &InstructionSet) -> Result<Vec<Instruction>, DecodeError> {
    Decoder::new(code, isa).collect()
}

/// Encode an instruction sequence back into a flat byte stream
///
/// Each opcode byte is followed by its operand bytes (low, high) when
/// present. Opcode legality is not validated; the rewriter only ever feeds
/// back opcodes it decoded or substituted itself.
pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
    let mut code = Vec::with_capacity(instructions.iter().map(Instruction::encoded_len).sum());

    for instruction in instructions {
        code.push(instruction.opcode);
        if let Some(operand) = instruction.operand {
            code.extend_from_slice(&opcodes::split_u16(operand));
        }
    }

    code
}
