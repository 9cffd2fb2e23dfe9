use crate::codec::Instruction;
use crate::constant_pool::ConstantPool;
use crate::opcodes::InstructionSet;
use crate::value::Value;
use indexmap::IndexMap;
use thiserror::Error;

/// Rewriting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// A load-global operand pointed past the end of the name table
    #[error("load-global operand {index} is out of range for a name table of {len} entries")]
    BadNameIndex { index: u16, len: usize },
}

/// Result of one rewrite pass
#[derive(Debug, Clone)]
pub struct Rewrite {
    /// The rewritten instruction sequence, same length as the input
    pub instructions: Vec<Instruction>,

    /// The original pool with one entry appended per substituted name
    pub consts: ConstantPool,

    /// Newly bound names in first-encounter order, with the pool index each received
    pub bound: IndexMap<String, u16>,
}

/// Replace global-name loads with constant loads in a single forward pass
///
/// Every instruction that is not a load-global for a mapped name is copied
/// through unchanged, so the output has the same instruction count and, since
/// load-global and load-const share the one-operand shape, the same encoded
/// byte length as the input. The name table is never touched: other
/// instructions may still reference its entries by index.
///
/// Each mapped name gets exactly one new pool entry, on first encounter; later
/// occurrences reuse the cached index.
pub fn rewrite(
    instructions: &[Instruction],
    names: &[String],
    consts: &ConstantPool,
    mapping: &IndexMap<String, Value>,
    isa: &InstructionSet,
) -> Result<Rewrite, RewriteError> {
    let mut output = Vec::with_capacity(instructions.len());
    let mut consts = consts.clone();
    let mut bound: IndexMap<String, u16> = IndexMap::new();

    for instruction in instructions {
        let index = match (instruction.opcode == isa.load_global, instruction.operand) {
            (true, Some(index)) => index,
            _ => {
                output.push(*instruction);
                continue;
            }
        };

        let name = names
            .get(index as usize)
            .ok_or(RewriteError::BadNameIndex {
                index,
                len: names.len(),
            })?;

        let Some(replacement) = mapping.get(name) else {
            // not targeted, the lookup stays dynamic
            output.push(*instruction);
            continue;
        };

        let const_index = match bound.get(name) {
            Some(cached) => *cached,
            None => {
                let new_index = consts.add(replacement.clone());
                bound.insert(name.clone(), new_index);
                new_index
            }
        };

        output.push(Instruction::with_operand(isa.load_const, const_index));
    }

    Ok(Rewrite {
        instructions: output,
        consts,
        bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::opcodes::{BINARY_ADD, LOAD_CONST, LOAD_FAST, LOAD_GLOBAL, RETURN_VALUE};

    const ISA: InstructionSet = InstructionSet::DEFAULT;

    fn names(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn mapping(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_mapped_name_becomes_constant() {
        let instructions = vec![
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::op(RETURN_VALUE),
        ];
        let names = names(&["answer"]);
        let consts = ConstantPool::from_vec(vec![Value::None]);
        let mapping = mapping(&[("answer", Value::Int(42))]);

        let result = rewrite(&instructions, &names, &consts, &mapping, &ISA).unwrap();

        assert_eq!(
            result.instructions,
            vec![
                Instruction::with_operand(LOAD_CONST, 1),
                Instruction::op(RETURN_VALUE),
            ]
        );
        assert_eq!(result.consts.len(), 2);
        assert_eq!(result.consts.get(1).unwrap(), &Value::Int(42));
        assert_eq!(result.bound.get("answer"), Some(&1));
    }

    #[test]
    fn test_unmapped_name_passes_through() {
        let instructions = vec![
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::with_operand(LOAD_GLOBAL, 1),
            Instruction::op(BINARY_ADD),
            Instruction::op(RETURN_VALUE),
        ];
        let names = names(&["mapped", "free"]);
        let consts = ConstantPool::new();
        let mapping = mapping(&[("mapped", Value::Int(1))]);

        let result = rewrite(&instructions, &names, &consts, &mapping, &ISA).unwrap();

        // the untargeted lookup is byte-identical to the original
        assert_eq!(result.instructions[1], instructions[1]);
        assert_eq!(result.bound.len(), 1);
    }

    #[test]
    fn test_repeated_name_gets_single_pool_entry() {
        let instructions = vec![
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::op(RETURN_VALUE),
        ];
        let names = names(&["thrice"]);
        let consts = ConstantPool::from_vec(vec![Value::Int(0), Value::Int(1)]);
        let mapping = mapping(&[("thrice", Value::Str("shared".to_string()))]);

        let result = rewrite(&instructions, &names, &consts, &mapping, &ISA).unwrap();

        assert_eq!(result.consts.len(), 3);
        for instruction in &result.instructions[..3] {
            assert_eq!(*instruction, Instruction::with_operand(LOAD_CONST, 2));
        }
    }

    #[test]
    fn test_pool_prefix_untouched_and_appends_in_encounter_order() {
        let instructions = vec![
            Instruction::with_operand(LOAD_GLOBAL, 1),
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::op(RETURN_VALUE),
        ];
        let names = names(&["alpha", "beta"]);
        let original = vec![Value::Int(10), Value::Int(20)];
        let consts = ConstantPool::from_vec(original.clone());
        // mapping order differs from stream order on purpose
        let mapping = mapping(&[("alpha", Value::Int(-1)), ("beta", Value::Int(-2))]);

        let result = rewrite(&instructions, &names, &consts, &mapping, &ISA).unwrap();

        assert_eq!(&result.consts.as_slice()[..2], &original[..]);
        // beta is encountered first in the stream, so it binds first
        let bound: Vec<_> = result.bound.keys().cloned().collect();
        assert_eq!(bound, vec!["beta".to_string(), "alpha".to_string()]);
        assert_eq!(result.consts.get(2).unwrap(), &Value::Int(-2));
        assert_eq!(result.consts.get(3).unwrap(), &Value::Int(-1));
    }

    #[test]
    fn test_rewritten_stream_length_is_preserved() {
        let code = encode(&[
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::with_operand(LOAD_FAST, 0),
            Instruction::op(BINARY_ADD),
            Instruction::op(RETURN_VALUE),
        ]);
        let instructions = decode(&code, &ISA).unwrap();
        let names = names(&["offset"]);
        let consts = ConstantPool::new();
        let mapping = mapping(&[("offset", Value::Int(7))]);

        let result = rewrite(&instructions, &names, &consts, &mapping, &ISA).unwrap();

        assert_eq!(encode(&result.instructions).len(), code.len());
    }

    #[test]
    fn test_bad_name_index_is_an_error() {
        let instructions = vec![Instruction::with_operand(LOAD_GLOBAL, 5)];
        let names = names(&["only"]);
        let consts = ConstantPool::new();
        let mapping = mapping(&[("only", Value::Int(1))]);

        let err = rewrite(&instructions, &names, &consts, &mapping, &ISA).unwrap_err();
        assert_eq!(err, RewriteError::BadNameIndex { index: 5, len: 1 });
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        let instructions = vec![
            Instruction::with_operand(LOAD_GLOBAL, 0),
            Instruction::op(RETURN_VALUE),
        ];
        let names = names(&["anything"]);
        let consts = ConstantPool::from_vec(vec![Value::Int(9)]);

        let result = rewrite(&instructions, &names, &consts, &IndexMap::new(), &ISA).unwrap();

        assert_eq!(result.instructions, instructions);
        assert_eq!(result.consts.len(), 1);
        assert!(result.bound.is_empty());
    }
}
