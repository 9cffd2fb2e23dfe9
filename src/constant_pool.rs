use crate::value::Value;

/// Constant pool holding the literal values of one compiled body
///
/// Constants are accessed by index (u16) from bytecode instructions. During a
/// rewrite the pool is append-only: existing entries keep their index forever,
/// new entries go at the end. Nothing is ever removed or reordered, so indices
/// already baked into the instruction stream stay valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    constants: Vec<Value>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        ConstantPool {
            constants: Vec::new(),
        }
    }

    /// Create a constant pool from a vector of constants
    pub fn from_vec(constants: Vec<Value>) -> Self {
        ConstantPool { constants }
    }

    /// Add a constant to the pool and return its index
    pub fn add(&mut self, constant: Value) -> u16 {
        let index = self.constants.len();
        if index >= u16::MAX as usize {
            panic!("Constant pool overflow: too many constants");
        }
        self.constants.push(constant);
        index as u16
    }

    /// Get a constant by index
    pub fn get(&self, index: u16) -> Result<&Value, String> {
        self.constants
            .get(index as usize)
            .ok_or_else(|| format!("Constant pool index {} out of bounds", index))
    }

    /// Get the number of constants in the pool
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// View the pool as a slice, in index order
    pub fn as_slice(&self) -> &[Value] {
        &self.constants
    }
}
