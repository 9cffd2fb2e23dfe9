use std::collections::HashMap;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::code::{CodeError, CodeObject};
use crate::executor::Executor;
use crate::opcodes::InstructionSet;
use crate::value::Value;

/// A callable: a compiled body plus the bindings it runs with
///
/// The globals map is shared by reference, the way a module namespace is
/// shared between every function defined in it. A specialized copy of a
/// function keeps pointing at the same globals; only its code and constant
/// pool differ.
#[derive(Debug, Clone)]
pub struct Function {
    /// Compiled body
    pub code: CodeObject,

    /// Global namespace for dynamic name lookups
    pub globals: Rc<HashMap<String, Value>>,

    /// Default values for trailing arguments
    pub defaults: Vec<Value>,

    /// Display name, independent of the code object's qualified name
    pub name: String,
}

impl Function {
    /// Create a function over a globals namespace
    pub fn new(code: CodeObject, globals: Rc<HashMap<String, Value>>) -> Self {
        let name = code.name.clone();
        Function {
            code,
            globals,
            defaults: Vec::new(),
            name,
        }
    }

    /// Attach default values for the trailing arguments
    pub fn with_defaults(mut self, defaults: Vec<Value>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Invoke the function
    ///
    /// Missing trailing arguments are filled from the defaults, right-aligned
    /// against the argument list.
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        let arg_count = self.code.arg_count as usize;
        let required = arg_count.saturating_sub(self.defaults.len());

        if args.len() < required || args.len() > arg_count {
            return Err(format!(
                "{}() takes {} to {} arguments, got {}",
                self.name,
                required,
                arg_count,
                args.len()
            ));
        }

        let mut filled = args.to_vec();
        let defaults_used = arg_count - args.len();
        filled.extend_from_slice(&self.defaults[self.defaults.len() - defaults_used..]);

        Executor::new(&self.code, &self.globals, &filled).run()
    }
}

/// Decorator-style entry point for the rewrite
///
/// Collects a substitution mapping, then stamps out specialized copies of
/// functions: each targeted global-name lookup in the body is replaced by a
/// constant load of the bound value. The original function is never modified;
/// its globals, defaults, and display name carry over to the copy.
///
/// ```
/// use constantize::{builtins, Specializer, Value};
/// # use std::rc::Rc;
/// # use constantize::Function;
/// # let func = Function::new(Default::default(), Rc::new(builtins::globals()));
/// let specialized = Specializer::new()
///     .bind_value(Value::Function(builtins::len()))?
///     .bind("limit", Value::Int(100))
///     .apply(&func)?;
/// # Ok::<(), constantize::CodeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Specializer {
    mapping: IndexMap<String, Value>,
    self_named: IndexSet<String>,
    isa: InstructionSet,
}

impl Specializer {
    /// Start an empty specializer over the default instruction set
    pub fn new() -> Self {
        Specializer::default()
    }

    /// Start an empty specializer over a custom instruction set
    pub fn with_instruction_set(isa: InstructionSet) -> Self {
        Specializer {
            mapping: IndexMap::new(),
            self_named: IndexSet::new(),
            isa,
        }
    }

    /// Bind a name to a replacement value
    ///
    /// Binding the same name again overwrites the earlier value, except when
    /// the name was bound by a self-naming value: self-naming bindings take
    /// precedence regardless of call order.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        if !self.self_named.contains(&name) {
            self.mapping.insert(name, value);
        }
        self
    }

    /// Bind a self-naming value under its own name
    ///
    /// Only functions carry a name of their own; anything else is rejected.
    /// A self-naming binding overrides any explicit binding of the same name,
    /// earlier or later.
    pub fn bind_value(mut self, value: Value) -> Result<Self, CodeError> {
        let name = match &value {
            Value::Function(func) => func.name().to_string(),
            other => {
                return Err(CodeError::UnnamedBinding {
                    type_name: other.type_name(),
                })
            }
        };
        self.self_named.insert(name.clone());
        self.mapping.insert(name, value);
        Ok(self)
    }

    /// The substitution mapping accumulated so far
    pub fn mapping(&self) -> &IndexMap<String, Value> {
        &self.mapping
    }

    /// Produce a specialized copy of `func`
    ///
    /// If the body uses the extended-argument encoding, the copy is
    /// behaviorally identical to the original (no substitution applied);
    /// see [`CodeObject::rewrite_globals`].
    pub fn apply(&self, func: &Function) -> Result<Function, CodeError> {
        let code = func.code.rewrite_globals(&self.mapping, &self.isa)?;

        Ok(Function {
            code,
            globals: Rc::clone(&func.globals),
            defaults: func.defaults.clone(),
            name: func.name.clone(),
        })
    }
}
