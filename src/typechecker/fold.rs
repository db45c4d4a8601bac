use crate::parser::ast::{BinaryOperator, UnaryOperator};
use crate::vm::value::Value;

use super::types::TypeTag;

/// Compile-time evaluation of a binary operator over constant operands.
/// `tag` is the shared operand type after implicit casts. Returns `None`
/// when the combination is not foldable (notably integer division by a
/// constant zero, which is left for the runtime trap).
pub(crate) fn binary(tag: TypeTag, op: BinaryOperator, left: Value, right: Value) -> Option<Value> {
    match tag {
        TypeTag::I32 => {
            let (l, r) = (left.as_i32(), right.as_i32());
            let value = match op {
                BinaryOperator::Add => Value::from_i32(l.wrapping_add(r)),
                BinaryOperator::Subtract => Value::from_i32(l.wrapping_sub(r)),
                BinaryOperator::Multiply => Value::from_i32(l.wrapping_mul(r)),
                BinaryOperator::Divide => {
                    if r == 0 {
                        return None;
                    }
                    Value::from_i32(l.wrapping_div(r))
                }
                BinaryOperator::Less => Value::from_bool(l < r),
                BinaryOperator::LessEqual => Value::from_bool(l <= r),
                BinaryOperator::Greater => Value::from_bool(l > r),
                BinaryOperator::GreaterEqual => Value::from_bool(l >= r),
                BinaryOperator::Equal => Value::from_bool(l == r),
                BinaryOperator::NotEqual => Value::from_bool(l != r),
                _ => return None,
            };
            Some(value)
        }
        TypeTag::F32 => {
            let (l, r) = (left.as_f32(), right.as_f32());
            let value = match op {
                BinaryOperator::Add => Value::from_f32(l + r),
                BinaryOperator::Subtract => Value::from_f32(l - r),
                BinaryOperator::Multiply => Value::from_f32(l * r),
                BinaryOperator::Divide => Value::from_f32(l / r),
                BinaryOperator::Less => Value::from_bool(l < r),
                BinaryOperator::LessEqual => Value::from_bool(l <= r),
                BinaryOperator::Greater => Value::from_bool(l > r),
                BinaryOperator::GreaterEqual => Value::from_bool(l >= r),
                BinaryOperator::Equal => Value::from_bool(l == r),
                BinaryOperator::NotEqual => Value::from_bool(l != r),
                _ => return None,
            };
            Some(value)
        }
        TypeTag::Bool => {
            let (l, r) = (left.as_bool(), right.as_bool());
            let value = match op {
                BinaryOperator::And => Value::from_bool(l && r),
                BinaryOperator::Or => Value::from_bool(l || r),
                BinaryOperator::Equal => Value::from_bool(l == r),
                BinaryOperator::NotEqual => Value::from_bool(l != r),
                _ => return None,
            };
            Some(value)
        }
        // Type values compare by id.
        TypeTag::Type => match op {
            BinaryOperator::Equal => Some(Value::from_bool(left.raw() == right.raw())),
            BinaryOperator::NotEqual => Some(Value::from_bool(left.raw() != right.raw())),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn unary(tag: TypeTag, op: UnaryOperator, operand: Value) -> Option<Value> {
    match (tag, op) {
        (TypeTag::I32, UnaryOperator::Negate) => {
            Some(Value::from_i32(operand.as_i32().wrapping_neg()))
        }
        (TypeTag::F32, UnaryOperator::Negate) => Some(Value::from_f32(-operand.as_f32())),
        (TypeTag::Bool, UnaryOperator::Not) => Some(Value::from_bool(!operand.as_bool())),
        _ => None,
    }
}

pub(crate) fn cast(value: Value, from: TypeTag, to: TypeTag) -> Option<Value> {
    let result = match (from, to) {
        (TypeTag::I32, TypeTag::F32) => Value::from_f32(value.as_i32() as f32),
        (TypeTag::I32, TypeTag::Bool) => Value::from_bool(value.as_i32() != 0),
        (TypeTag::F32, TypeTag::I32) => Value::from_i32(value.as_f32() as i32),
        (TypeTag::F32, TypeTag::Bool) => Value::from_bool(value.as_f32() != 0.0),
        (TypeTag::Bool, TypeTag::I32) => Value::from_i32(value.as_bool() as i32),
        (TypeTag::Bool, TypeTag::F32) => Value::from_f32(value.as_bool() as i32 as f32),
        _ => return None,
    };
    Some(result)
}
