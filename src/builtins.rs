use std::collections::HashMap;

use crate::value::{NativeFunction, Value};

/// Built-in functions for the default global namespace
///
/// These are the dynamic lookups a typical body pays for on every call and
/// the first candidates for binding as constants: sequence length, a sequence
/// type check, and the two sequence constructors.

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), String> {
    if args.len() != expected {
        return Err(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected,
            args.len()
        ));
    }
    Ok(())
}

/// len(v): length of a sequence or string
pub fn len() -> NativeFunction {
    NativeFunction::new("len", |args| {
        arity("len", args, 1)?;
        match &args[0] {
            Value::List(items) | Value::Tuple(items) => Ok(Value::Int(items.len() as i64)),
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            other => Err(format!("Object of type {} has no length", other.type_name())),
        }
    })
}

/// is_sequence(v): whether v is a list or a tuple
pub fn is_sequence() -> NativeFunction {
    NativeFunction::new("is_sequence", |args| {
        arity("is_sequence", args, 1)?;
        Ok(Value::Bool(matches!(
            args[0],
            Value::List(_) | Value::Tuple(_)
        )))
    })
}

/// to_list(v): copy a sequence into a list
pub fn to_list() -> NativeFunction {
    NativeFunction::new("to_list", |args| {
        arity("to_list", args, 1)?;
        match &args[0] {
            Value::List(items) | Value::Tuple(items) => Ok(Value::List(items.clone())),
            other => Err(format!("Cannot make a list from {}", other.type_name())),
        }
    })
}

/// to_tuple(v): copy a sequence into a tuple
pub fn to_tuple() -> NativeFunction {
    NativeFunction::new("to_tuple", |args| {
        arity("to_tuple", args, 1)?;
        match &args[0] {
            Value::List(items) | Value::Tuple(items) => Ok(Value::Tuple(items.clone())),
            other => Err(format!("Cannot make a tuple from {}", other.type_name())),
        }
    })
}

/// A globals map populated with all of the built-ins
pub fn globals() -> HashMap<String, Value> {
    [len(), is_sequence(), to_list(), to_tuple()]
        .into_iter()
        .map(|func| (func.name().to_string(), Value::Function(func)))
        .collect()
}
