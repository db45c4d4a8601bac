use std::fmt::Write;

use serde::Serialize;

use crate::typechecker::types::{TypeId, TypeRegistry, TypeTag};
use crate::vm::value::Value;

/// Single-byte opcodes. Inline operands follow the opcode byte; multibyte
/// operands are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum OpCode {
    /// `k8`: push constant table entry `k`.
    LoadConstant = 0,
    /// `s8`: push the value in frame slot `s`.
    GetLocal = 1,
    /// `s8`: write the top of stack (without popping) to frame slot `s`.
    SetLocal = 2,
    /// `size32`: reserve zeroed heap bytes, push the pointer value.
    StructAlloc = 3,
    /// `off32 size32`: pop a pointer, push the primitive field at
    /// `off`.
    GetField = 4,
    /// `off32 size32`: pop the value, store it through the pointer
    /// below it; the pointer stays on the stack.
    SetField = 5,
    /// `off32 size32`: like GetField but the field is itself a struct;
    /// copies `size` bytes into a fresh heap block.
    GetFieldStruct = 6,
    /// `off32 size32`: like SetField but copies `size` bytes from the
    /// popped pointer.
    SetFieldStruct = 7,
    /// All arithmetic/comparison opcodes carry a `type8` operand tag.
    Add = 8,
    Subtract = 9,
    Multiply = 10,
    Divide = 11,
    Greater = 12,
    Less = 13,
    GreaterEqual = 14,
    LessEqual = 15,
    Equal = 16,
    NotEqual = 17,
    /// `type8`
    Negate = 18,
    /// `type8`
    Not = 19,
    /// `from8 to8`
    Cast = 20,
    Pop = 21,
    /// `off16`: unconditional forward jump.
    Jmp = 22,
    /// `off16`: forward jump when the (unconsumed) top of stack is
    /// false.
    JmpIfFalse = 23,
    /// `off16`: dual of JmpIfFalse.
    JmpIfTrue = 24,
    /// `off16`: unconditional backward jump.
    Loop = 25,
    /// `argc8`: call the function value sitting below the arguments.
    Call = 26,
    Return = 27,
    /// `type8`: pop and print one value.
    Print = 28,
}

impl OpCode {
    /// Number of inline operand bytes following the opcode byte.
    pub fn operand_len(self) -> usize {
        match self {
            OpCode::Pop | OpCode::Return => 0,
            OpCode::LoadConstant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Greater
            | OpCode::Less
            | OpCode::GreaterEqual
            | OpCode::LessEqual
            | OpCode::Equal
            | OpCode::NotEqual
            | OpCode::Negate
            | OpCode::Not
            | OpCode::Call
            | OpCode::Print => 1,
            OpCode::Cast | OpCode::Jmp | OpCode::JmpIfFalse | OpCode::JmpIfTrue | OpCode::Loop => {
                2
            }
            OpCode::StructAlloc => 4,
            OpCode::GetField
            | OpCode::SetField
            | OpCode::GetFieldStruct
            | OpCode::SetFieldStruct => 8,
        }
    }

    pub fn from_u8(byte: u8) -> Option<OpCode> {
        let op = match byte {
            0 => OpCode::LoadConstant,
            1 => OpCode::GetLocal,
            2 => OpCode::SetLocal,
            3 => OpCode::StructAlloc,
            4 => OpCode::GetField,
            5 => OpCode::SetField,
            6 => OpCode::GetFieldStruct,
            7 => OpCode::SetFieldStruct,
            8 => OpCode::Add,
            9 => OpCode::Subtract,
            10 => OpCode::Multiply,
            11 => OpCode::Divide,
            12 => OpCode::Greater,
            13 => OpCode::Less,
            14 => OpCode::GreaterEqual,
            15 => OpCode::LessEqual,
            16 => OpCode::Equal,
            17 => OpCode::NotEqual,
            18 => OpCode::Negate,
            19 => OpCode::Not,
            20 => OpCode::Cast,
            21 => OpCode::Pop,
            22 => OpCode::Jmp,
            23 => OpCode::JmpIfFalse,
            24 => OpCode::JmpIfTrue,
            25 => OpCode::Loop,
            26 => OpCode::Call,
            27 => OpCode::Return,
            28 => OpCode::Print,
            _ => return None,
        };
        Some(op)
    }
}

pub type FunctionId = usize;

/// One compiled function: a flat byte sequence plus a line number for
/// every code byte (the two vectors always have the same length).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Function {
    pub name: String,
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
}

/// The compiled program: a shared constant table, all compiled functions
/// and the id of the synthetic `<main>` the VM starts in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub constants: Vec<Value>,
    /// Parallel to `constants`; only used for disassembly.
    pub debug_constant_types: Vec<TypeId>,
    pub functions: Vec<Function>,
    pub main: FunctionId,
}

impl Program {
    pub fn disassemble(&self, registry: &TypeRegistry) -> String {
        let mut out = String::new();
        for (id, function) in self.functions.iter().enumerate() {
            let _ = writeln!(out, "== {} (fn {id}) ==", function.name);
            let mut offset = 0;
            while offset < function.code.len() {
                offset = self.disassemble_instruction(function, offset, registry, &mut out);
            }
        }
        out
    }

    fn render_constant(&self, index: usize, registry: &TypeRegistry) -> String {
        let value = self.constants[index];
        let ty = self.debug_constant_types[index];
        match registry.tag(ty) {
            TypeTag::I32 => format!("{}", value.as_i32()),
            TypeTag::F32 => format!("{}", value.as_f32()),
            TypeTag::Bool => format!("{}", value.as_bool()),
            TypeTag::Type => registry.name(value.as_type()).to_string(),
            TypeTag::Function => {
                let id = value.as_function();
                match self.functions.get(id) {
                    Some(f) => format!("<fn {}>", f.name),
                    None => format!("<fn #{id}>"),
                }
            }
            TypeTag::Void => "void".to_string(),
            _ => format!("0x{:x}", value.raw()),
        }
    }

    fn disassemble_instruction(
        &self,
        function: &Function,
        offset: usize,
        registry: &TypeRegistry,
        out: &mut String,
    ) -> usize {
        let code = &function.code;
        let line = function.lines[offset];
        let _ = write!(out, "{offset:04} {line:>4} ");

        let Some(op) = OpCode::from_u8(code[offset]) else {
            let _ = writeln!(out, "??? 0x{:02x}", code[offset]);
            return offset + 1;
        };

        let u8_at = |i: usize| code[i];
        let u16_at = |i: usize| u16::from_be_bytes([code[i], code[i + 1]]);
        let u32_at = |i: usize| {
            u32::from_be_bytes([code[i], code[i + 1], code[i + 2], code[i + 3]])
        };
        let tag_name = |byte: u8| match TypeTag::from_u8(byte) {
            Some(TypeTag::I32) => "i32",
            Some(TypeTag::F32) => "f32",
            Some(TypeTag::Bool) => "bool",
            Some(TypeTag::Type) => "type",
            Some(TypeTag::Function) => "func",
            Some(TypeTag::Struct) => "struct",
            Some(TypeTag::Pointer) => "ptr",
            Some(TypeTag::Array) => "array",
            Some(TypeTag::Void) => "void",
            _ => "?",
        };

        match op {
            OpCode::LoadConstant => {
                let index = u8_at(offset + 1) as usize;
                let _ = writeln!(
                    out,
                    "OpLoadConstant {index} ({})",
                    self.render_constant(index, registry)
                );
                offset + 2
            }
            OpCode::GetLocal => {
                let _ = writeln!(out, "OpGetLocal {}", u8_at(offset + 1));
                offset + 2
            }
            OpCode::SetLocal => {
                let _ = writeln!(out, "OpSetLocal {}", u8_at(offset + 1));
                offset + 2
            }
            OpCode::StructAlloc => {
                let _ = writeln!(out, "OpStructAlloc {}", u32_at(offset + 1));
                offset + 5
            }
            OpCode::GetField
            | OpCode::SetField
            | OpCode::GetFieldStruct
            | OpCode::SetFieldStruct => {
                let name = match op {
                    OpCode::GetField => "OpGetField",
                    OpCode::SetField => "OpSetField",
                    OpCode::GetFieldStruct => "OpGetFieldStruct",
                    _ => "OpSetFieldStruct",
                };
                let _ = writeln!(
                    out,
                    "{name} off={} size={}",
                    u32_at(offset + 1),
                    u32_at(offset + 5)
                );
                offset + 9
            }
            OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Greater
            | OpCode::Less
            | OpCode::GreaterEqual
            | OpCode::LessEqual
            | OpCode::Equal
            | OpCode::NotEqual
            | OpCode::Negate
            | OpCode::Not => {
                let _ = writeln!(out, "Op{op:?} {}", tag_name(u8_at(offset + 1)));
                offset + 2
            }
            OpCode::Cast => {
                let _ = writeln!(
                    out,
                    "OpCast {} -> {}",
                    tag_name(u8_at(offset + 1)),
                    tag_name(u8_at(offset + 2))
                );
                offset + 3
            }
            OpCode::Pop => {
                let _ = writeln!(out, "OpPop");
                offset + 1
            }
            OpCode::Jmp | OpCode::JmpIfFalse | OpCode::JmpIfTrue => {
                let distance = u16_at(offset + 1) as usize;
                let _ = writeln!(out, "Op{op:?} -> {:04}", offset + 3 + distance);
                offset + 3
            }
            OpCode::Loop => {
                let distance = u16_at(offset + 1) as usize;
                let target = (offset + 3).saturating_sub(distance);
                let _ = writeln!(out, "OpLoop -> {target:04}");
                offset + 3
            }
            OpCode::Call => {
                let _ = writeln!(out, "OpCall argc={}", u8_at(offset + 1));
                offset + 2
            }
            OpCode::Return => {
                let _ = writeln!(out, "OpReturn");
                offset + 1
            }
            OpCode::Print => {
                let _ = writeln!(out, "OpPrint {}", tag_name(u8_at(offset + 1)));
                offset + 2
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let ops = [
            OpCode::LoadConstant,
            OpCode::GetLocal,
            OpCode::SetLocal,
            OpCode::StructAlloc,
            OpCode::GetField,
            OpCode::SetField,
            OpCode::GetFieldStruct,
            OpCode::SetFieldStruct,
            OpCode::Add,
            OpCode::Subtract,
            OpCode::Multiply,
            OpCode::Divide,
            OpCode::Greater,
            OpCode::Less,
            OpCode::GreaterEqual,
            OpCode::LessEqual,
            OpCode::Equal,
            OpCode::NotEqual,
            OpCode::Negate,
            OpCode::Not,
            OpCode::Cast,
            OpCode::Pop,
            OpCode::Jmp,
            OpCode::JmpIfFalse,
            OpCode::JmpIfTrue,
            OpCode::Loop,
            OpCode::Call,
            OpCode::Return,
            OpCode::Print,
        ];
        for op in ops {
            assert_eq!(OpCode::from_u8(op as u8), Some(op));
        }
        assert_eq!(OpCode::from_u8(200), None);
    }

    #[test]
    fn test_disassemble_simple_chunk() {
        let registry = TypeRegistry::new();
        let mut program = Program::default();
        program.constants.push(Value::from_i32(7));
        program.debug_constant_types.push(TypeId::I32);
        program.functions.push(Function {
            name: "<main>".into(),
            code: vec![
                OpCode::LoadConstant as u8,
                0,
                OpCode::Print as u8,
                TypeTag::I32 as u8,
                OpCode::Return as u8,
            ],
            lines: vec![1, 1, 1, 1, 1],
        });

        let listing = program.disassemble(&registry);
        assert!(listing.contains("<main>"));
        assert!(listing.contains("OpLoadConstant 0 (7)"));
        assert!(listing.contains("OpPrint i32"));
        assert!(listing.contains("OpReturn"));
    }
}
