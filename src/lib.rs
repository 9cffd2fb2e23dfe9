//! Global-to-constant bytecode rewriter
//!
//! Rewrites a compiled function body so that selected global-name lookups
//! become direct constant loads, trading late binding for earlier binding and
//! faster access. The instruction stream is decoded into a structured form,
//! rewritten in a single pass, and re-encoded; the constant pool grows
//! append-only and every other piece of metadata is carried over verbatim.
//!
//! # Architecture
//!
//! - **Codec**: variable-length instruction decode/encode (opcode byte plus
//!   an optional little-endian u16 operand)
//! - **Rewriter**: load-global to load-const substitution with a per-run
//!   name-to-pool-index cache
//! - **Reassembly**: [`CodeObject::rewrite_globals`] builds a fresh body,
//!   falling back to an unmodified clone when the stream uses the
//!   unsupported extended-argument encoding
//! - **Executor**: a linear stack machine over [`CodeObject`]s, so that
//!   original and specialized functions can be run and compared
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use constantize::{builtins, Function, Specializer, Value};
//! use constantize::codec::{encode, Instruction};
//! use constantize::opcodes::{CALL_FUNCTION, LOAD_FAST, LOAD_GLOBAL, RETURN_VALUE};
//! use constantize::CodeObject;
//!
//! // f(x) = len(x), with `len` looked up in globals on every call
//! let code = CodeObject {
//!     arg_count: 1,
//!     n_locals: 1,
//!     stack_size: 2,
//!     code: encode(&[
//!         Instruction::with_operand(LOAD_GLOBAL, 0),
//!         Instruction::with_operand(LOAD_FAST, 0),
//!         Instruction::with_operand(CALL_FUNCTION, 1),
//!         Instruction::op(RETURN_VALUE),
//!     ]),
//!     names: vec!["len".to_string()],
//!     var_names: vec!["x".to_string()],
//!     name: "f".to_string(),
//!     ..CodeObject::default()
//! };
//! let f = Function::new(code, Rc::new(builtins::globals()));
//!
//! // bind `len` ahead of time; the lookup disappears from the body
//! let fast = Specializer::new()
//!     .bind_value(Value::Function(builtins::len()))?
//!     .apply(&f)?;
//!
//! let arg = Value::List(vec![Value::Int(7), Value::Int(8)]);
//! assert_eq!(fast.call(&[arg.clone()]).unwrap(), f.call(&[arg]).unwrap());
//! # Ok::<(), constantize::CodeError>(())
//! ```

// Core modules
pub mod builtins;
pub mod code;
pub mod codec;
pub mod constant_pool;
pub mod executor;
pub mod function;
pub mod opcodes;
pub mod rewriter;
pub mod value;

// Re-export main types for convenience
pub use code::{CodeError, CodeObject};
pub use codec::{DecodeError, Decoder, Instruction};
pub use constant_pool::ConstantPool;
pub use executor::Executor;
pub use function::{Function, Specializer};
pub use opcodes::InstructionSet;
pub use rewriter::{Rewrite, RewriteError};
pub use value::{NativeFunction, Value};
