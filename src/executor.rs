use std::collections::HashMap;

use crate::code::CodeObject;
use crate::opcodes::{
    self, BINARY_ADD, BUILD_LIST, BUILD_TUPLE, CALL_FUNCTION, EXTENDED_ARG, LOAD_CONST,
    LOAD_FAST, LOAD_GLOBAL, POP_TOP, RETURN_VALUE, STORE_FAST,
};
use crate::value::Value;

/// Bytecode executor for compiled function bodies
///
/// This is a stack-based machine with no control flow. Execution proceeds
/// linearly from start to end; `RETURN_VALUE` ends it early, otherwise the
/// final stack value (or `None` for an empty stack) is the result.
///
/// Globals are resolved by name at execution time, which is exactly the
/// late-binding cost the rewriter removes: after a rewrite the same body hits
/// the constant pool instead of the globals map.
pub struct Executor<'a> {
    /// The body being executed
    code: &'a CodeObject,

    /// Global namespace for LOAD_GLOBAL lookups
    globals: &'a HashMap<String, Value>,

    /// Value stack
    stack: Vec<Value>,

    /// Local variable slots
    locals: Vec<Value>,
}

impl<'a> Executor<'a> {
    /// Create a new executor for one invocation
    ///
    /// `args` fills the leading local slots; remaining slots start as `None`.
    pub fn new(code: &'a CodeObject, globals: &'a HashMap<String, Value>, args: &[Value]) -> Self {
        let mut locals = vec![Value::None; (code.n_locals as usize).max(args.len())];
        locals[..args.len()].clone_from_slice(args);

        Executor {
            code,
            globals,
            stack: Vec::with_capacity((code.stack_size as usize).max(8)),
            locals,
        }
    }

    /// Execute the body and return the result
    ///
    /// Returns Err on a runtime fault (stack underflow, undefined name,
    /// uncallable value, unknown opcode).
    pub fn run(&mut self) -> Result<Value, String> {
        let bytecode = &self.code.code;
        let mut i = 0;

        while i < bytecode.len() {
            let opcode = bytecode[i];
            i += 1;

            let operand = if opcode >= opcodes::HAVE_ARGUMENT {
                let value = opcodes::read_u16(bytecode, i)?;
                i += 2;
                Some(value)
            } else {
                None
            };

            match opcode {
                POP_TOP => {
                    self.pop()?;
                }

                BINARY_ADD => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.stack.push(Self::add(left, right)?);
                }

                RETURN_VALUE => return self.pop(),

                LOAD_CONST => {
                    let index = operand.unwrap_or_default();
                    let value = self.code.consts.get(index)?.clone();
                    self.stack.push(value);
                }

                LOAD_GLOBAL => {
                    let name = self.name(operand.unwrap_or_default())?;
                    let value = self
                        .globals
                        .get(name)
                        .cloned()
                        .ok_or_else(|| format!("Name '{}' is not defined", name))?;
                    self.stack.push(value);
                }

                LOAD_FAST => {
                    let slot = operand.unwrap_or_default() as usize;
                    let value = self
                        .locals
                        .get(slot)
                        .cloned()
                        .ok_or_else(|| format!("Local slot {} out of range", slot))?;
                    self.stack.push(value);
                }

                STORE_FAST => {
                    let slot = operand.unwrap_or_default() as usize;
                    let value = self.pop()?;
                    match self.locals.get_mut(slot) {
                        Some(local) => *local = value,
                        None => return Err(format!("Local slot {} out of range", slot)),
                    }
                }

                CALL_FUNCTION => {
                    let argc = operand.unwrap_or_default() as usize;
                    let args = self.pop_many(argc)?;
                    let callee = self.pop()?;
                    let result = match callee {
                        Value::Function(func) => func.call(&args)?,
                        other => {
                            return Err(format!("Value of type {} is not callable", other.type_name()))
                        }
                    };
                    self.stack.push(result);
                }

                BUILD_TUPLE => {
                    let count = operand.unwrap_or_default() as usize;
                    let items = self.pop_many(count)?;
                    self.stack.push(Value::Tuple(items));
                }

                BUILD_LIST => {
                    let count = operand.unwrap_or_default() as usize;
                    let items = self.pop_many(count)?;
                    self.stack.push(Value::List(items));
                }

                EXTENDED_ARG => {
                    return Err("EXTENDED_ARG instruction not supported".to_string());
                }

                _ => {
                    return Err(format!("Unknown opcode: 0x{:02x}", opcode));
                }
            }
        }

        Ok(self.stack.pop().unwrap_or(Value::None))
    }

    /// Pop a value from the stack
    fn pop(&mut self) -> Result<Value, String> {
        self.stack
            .pop()
            .ok_or_else(|| "Stack underflow".to_string())
    }

    /// Pop the top `count` values, preserving push order
    fn pop_many(&mut self, count: usize) -> Result<Vec<Value>, String> {
        if self.stack.len() < count {
            return Err("Stack underflow".to_string());
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    /// Resolve a name table index
    fn name(&self, index: u16) -> Result<&'a str, String> {
        self.code
            .names
            .get(index as usize)
            .map(String::as_str)
            .ok_or_else(|| format!("Name table index {} out of bounds", index))
    }

    /// Addition/concatenation for the BINARY_ADD opcode
    fn add(left: Value, right: Value) -> Result<Value, String> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (left, right) => Err(format!(
                "Cannot add {} and {}",
                left.type_name(),
                right.type_name()
            )),
        }
    }
}
