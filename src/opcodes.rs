/// Instruction encoding for compiled function bodies
///
/// Opcodes are single bytes (u8) for compact representation. Opcodes below
/// `HAVE_ARGUMENT` stand alone; opcodes at or above it are followed by a
/// two-byte operand, low byte first (little-endian u16).

/// Threshold separating argument-less opcodes from opcodes with a u16 operand
pub const HAVE_ARGUMENT: u8 = 0x40;

// Argument-less opcodes

/// Pop top value from stack and discard
pub const POP_TOP: u8 = 0x01;

/// Pop two values, push their sum/concatenation
pub const BINARY_ADD: u8 = 0x02;

/// Pop top value from stack and return it, ending execution
pub const RETURN_VALUE: u8 = 0x03;

// Opcodes with a u16 operand

/// Push constant from constant pool onto stack
/// Operand: u16 (constant pool index)
pub const LOAD_CONST: u8 = 0x40;

/// Look up a global by name and push it onto stack
/// Operand: u16 (name table index)
pub const LOAD_GLOBAL: u8 = 0x41;

/// Push local variable onto stack
/// Operand: u16 (local slot)
pub const LOAD_FAST: u8 = 0x42;

/// Pop top of stack into local variable
/// Operand: u16 (local slot)
pub const STORE_FAST: u8 = 0x43;

/// Call the function below N arguments on the stack
/// Operand: u16 (argument count)
/// Stack: [callee, arg0, ..., argN-1] -> [result]
pub const CALL_FUNCTION: u8 = 0x44;

/// Pop N values, push a tuple of them
/// Operand: u16 (element count)
pub const BUILD_TUPLE: u8 = 0x45;

/// Pop N values, push a list of them
/// Operand: u16 (element count)
pub const BUILD_LIST: u8 = 0x46;

/// Escape prefix widening the next instruction's operand to 32 bits.
/// The codec does not implement the wide encoding; meeting this opcode
/// aborts decoding.
pub const EXTENDED_ARG: u8 = 0x7F;

/// Instruction-set parameters the codec and rewriter operate against
///
/// The rewrite algorithm never interprets opcodes beyond these four facts:
/// where the has-argument range starts, which opcode is the wide-operand
/// escape, which opcode loads a global by name, and which loads a constant
/// by pool index. Everything else passes through untouched, so an embedding
/// with a different opcode assignment can supply its own values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSet {
    /// Opcodes at or above this value carry a u16 operand
    pub have_argument: u8,

    /// Wide-operand escape opcode (decoding aborts on it)
    pub extended_arg: u8,

    /// Opcode that loads a global by name table index
    pub load_global: u8,

    /// Opcode that loads a constant by pool index
    pub load_const: u8,
}

impl InstructionSet {
    /// The instruction set defined by the constants in this module
    pub const DEFAULT: InstructionSet = InstructionSet {
        have_argument: HAVE_ARGUMENT,
        extended_arg: EXTENDED_ARG,
        load_global: LOAD_GLOBAL,
        load_const: LOAD_CONST,
    };

    /// Whether this opcode is followed by a u16 operand
    pub fn has_argument(&self, opcode: u8) -> bool {
        opcode >= self.have_argument
    }
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Helper to read a u16 from bytecode in little-endian format
#[inline]
pub fn read_u16(bytecode: &[u8], offset: usize) -> Result<u16, String> {
    if offset + 2 > bytecode.len() {
        return Err("Unexpected end of bytecode while reading u16".to_string());
    }
    Ok(u16::from_le_bytes([bytecode[offset], bytecode[offset + 1]]))
}

/// Helper to split a u16 into its little-endian byte pair (low, high)
#[inline]
pub fn split_u16(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}
