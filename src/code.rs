use crate::codec::{self, DecodeError};
use crate::constant_pool::ConstantPool;
use crate::opcodes::InstructionSet;
use crate::rewriter::{self, RewriteError};
use crate::value::Value;
use indexmap::IndexMap;
use thiserror::Error;

/// Failures of the whole-body transform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// A self-naming binding was not a function and so carries no name
    #[error("a self-naming binding must be a function, got a {type_name}")]
    UnnamedBinding { type_name: &'static str },
}

/// A compiled function body and its metadata
///
/// The field set mirrors what a host compiler records alongside the raw
/// instruction stream: interface shape (argument count, local slots, stack
/// size, flags), the two tables the stream indexes into (names, consts), and
/// debug metadata. The transform reads all of it and writes none of it in
/// place; rewriting always builds a fresh `CodeObject`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeObject {
    /// Number of positional arguments
    pub arg_count: u16,

    /// Number of local variable slots (arguments included)
    pub n_locals: u16,

    /// Evaluation stack depth hint
    pub stack_size: u16,

    /// Compiler flag bits, opaque to the transform
    pub flags: u32,

    /// Raw encoded instruction stream
    pub code: Vec<u8>,

    /// Constant pool indexed by load-const operands
    pub consts: ConstantPool,

    /// Name table indexed by load-global operands; never mutated
    pub names: Vec<String>,

    /// Local variable names, slot order
    pub var_names: Vec<String>,

    /// Source file the body was compiled from
    pub filename: String,

    /// Qualified name of the function
    pub name: String,

    /// First source line number
    pub first_line: u32,

    /// Compressed line-number table, opaque to the transform
    pub line_table: Vec<u8>,

    /// Free variable names (closed over from an enclosing scope)
    pub free_vars: Vec<String>,

    /// Cell variable names (closed over by a nested scope)
    pub cell_vars: Vec<String>,
}

impl CodeObject {
    /// Rebuild this body with selected global-name lookups bound to constants
    ///
    /// Decodes the instruction stream, substitutes a load-const for every
    /// load-global whose name is in `mapping`, appends the replacement values
    /// to the constant pool, and re-encodes. Every other field is carried over
    /// verbatim into the returned object; `self` is left untouched.
    ///
    /// If the stream uses the extended-argument encoding anywhere, the body
    /// cannot be safely rewritten and an unmodified clone of the original is
    /// returned instead. A truncated stream is an input-contract violation
    /// and fails outright.
    pub fn rewrite_globals(
        &self,
        mapping: &IndexMap<String, Value>,
        isa: &InstructionSet,
    ) -> Result<CodeObject, CodeError> {
        let instructions = match codec::decode(&self.code, isa) {
            Ok(instructions) => instructions,
            Err(DecodeError::ExtendedArg { .. }) => return Ok(self.clone()),
            Err(err) => return Err(err.into()),
        };

        let rewrite = rewriter::rewrite(&instructions, &self.names, &self.consts, mapping, isa)?;

        Ok(CodeObject {
            code: codec::encode(&rewrite.instructions),
            consts: rewrite.consts,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::codec::Instruction;
    use crate::opcodes::{EXTENDED_ARG, LOAD_CONST, LOAD_GLOBAL, RETURN_VALUE};

    const ISA: InstructionSet = InstructionSet::DEFAULT;

    fn body_returning_global(name: &str) -> CodeObject {
        CodeObject {
            stack_size: 1,
            code: encode(&[
                Instruction::with_operand(LOAD_GLOBAL, 0),
                Instruction::op(RETURN_VALUE),
            ]),
            names: vec![name.to_string()],
            name: "f".to_string(),
            filename: "<test>".to_string(),
            ..CodeObject::default()
        }
    }

    #[test]
    fn test_rewrite_globals_substitutes_and_copies_metadata() {
        let original = body_returning_global("answer");
        let mapping: IndexMap<String, Value> =
            [("answer".to_string(), Value::Int(42))].into_iter().collect();

        let rewritten = original.rewrite_globals(&mapping, &ISA).unwrap();

        assert_eq!(
            rewritten.code,
            encode(&[
                Instruction::with_operand(LOAD_CONST, 0),
                Instruction::op(RETURN_VALUE),
            ])
        );
        assert_eq!(rewritten.consts.get(0).unwrap(), &Value::Int(42));

        // name table and the rest of the metadata are untouched
        assert_eq!(rewritten.names, original.names);
        assert_eq!(rewritten.arg_count, original.arg_count);
        assert_eq!(rewritten.flags, original.flags);
        assert_eq!(rewritten.name, original.name);
        assert_eq!(rewritten.filename, original.filename);
        assert_eq!(rewritten.line_table, original.line_table);
    }

    #[test]
    fn test_receiver_is_not_mutated() {
        let original = body_returning_global("answer");
        let snapshot = original.clone();
        let mapping: IndexMap<String, Value> =
            [("answer".to_string(), Value::Int(42))].into_iter().collect();

        let _ = original.rewrite_globals(&mapping, &ISA).unwrap();

        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_extended_arg_falls_back_to_original() {
        let mut body = body_returning_global("answer");
        body.code = vec![EXTENDED_ARG, 0x01, 0x00, LOAD_GLOBAL, 0x00, 0x00];
        let mapping: IndexMap<String, Value> =
            [("answer".to_string(), Value::Int(42))].into_iter().collect();

        let result = body.rewrite_globals(&mapping, &ISA).unwrap();

        assert_eq!(result, body);
    }

    #[test]
    fn test_truncated_stream_is_fatal() {
        let mut body = body_returning_global("answer");
        body.code = vec![LOAD_GLOBAL, 0x00];

        let err = body.rewrite_globals(&IndexMap::new(), &ISA).unwrap_err();
        assert_eq!(err, CodeError::Decode(DecodeError::Truncated { offset: 0 }));
    }
}
