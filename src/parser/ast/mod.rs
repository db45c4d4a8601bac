mod expression;
mod statement;

pub use expression::*;
pub use statement::*;

use std::fmt::Write;

use crate::typechecker::types::{TypeId, TypeRegistry};

/// Render the syntax tree as an indented debug listing. Used by the
/// driver's print-AST flag after type checking, so resolved types and
/// folded constants are included where present.
pub fn debug_tree(statements: &[Statement], registry: &TypeRegistry) -> String {
    let mut out = String::new();
    for stmt in statements {
        write_statement(&mut out, stmt, registry, 0);
    }
    out
}

fn type_name<'a>(registry: &'a TypeRegistry, ty: TypeId) -> &'a str {
    if ty == TypeId::INVALID {
        "none"
    } else {
        registry.name(ty)
    }
}

fn write_statement(out: &mut String, stmt: &Statement, registry: &TypeRegistry, indent: usize) {
    let pad = "  ".repeat(indent);
    match stmt {
        Statement::Declaration(decl) => {
            let decl = decl.borrow();
            let marker = if decl.is_constant { "const" } else { "var" };
            let _ = writeln!(out, "{pad}+ Decl {} ({marker})", decl.name);
            if let Some(annotation) = &decl.type_annotation {
                write_expression(out, annotation, registry, indent + 1);
            }
            if let Some(init) = &decl.initializer {
                write_expression(out, init, registry, indent + 1);
            }
        }
        Statement::Expression { expr, .. } => {
            let _ = writeln!(out, "{pad}> ExpressionStmt");
            write_expression(out, expr, registry, indent + 1);
        }
        Statement::Print { expr, .. } => {
            let _ = writeln!(out, "{pad}> Print");
            write_expression(out, expr, registry, indent + 1);
        }
        Statement::Return { expr, .. } => {
            let _ = writeln!(out, "{pad}> Return");
            if let Some(expr) = expr {
                write_expression(out, expr, registry, indent + 1);
            }
        }
        Statement::If(stmt) => {
            let _ = writeln!(out, "{pad}> If");
            write_expression(out, &stmt.condition, registry, indent + 1);
            write_statement(out, &stmt.then_branch, registry, indent + 1);
            if let Some(else_branch) = &stmt.else_branch {
                write_statement(out, else_branch, registry, indent + 1);
            }
        }
        Statement::While(stmt) => {
            let _ = writeln!(out, "{pad}> While");
            write_expression(out, &stmt.condition, registry, indent + 1);
            write_statement(out, &stmt.body, registry, indent + 1);
        }
        Statement::Block(block) => {
            let _ = writeln!(out, "{pad}> Block");
            for stmt in &block.statements {
                write_statement(out, stmt, registry, indent + 1);
            }
        }
        Statement::Bad { .. } => {
            let _ = writeln!(out, "{pad}> Bad Statement");
        }
    }
}

fn write_expression(out: &mut String, expr: &Expression, registry: &TypeRegistry, indent: usize) {
    let pad = "  ".repeat(indent);
    let ty = type_name(registry, expr.ty);
    match &expr.kind {
        ExprKind::Literal => {
            let rendered = match expr.ty {
                TypeId::F32 => format!("{}", expr.constant.as_f32()),
                TypeId::BOOL => format!("{}", expr.constant.as_bool()),
                _ => format!("{}", expr.constant.as_i32()),
            };
            let _ = writeln!(out, "{pad}- Literal ({rendered}:{ty})");
        }
        ExprKind::Identifier(name) => {
            let _ = writeln!(out, "{pad}- Identifier ({name}:{ty})");
        }
        ExprKind::Grouping(inner) => {
            let _ = writeln!(out, "{pad}- Group (:{ty})");
            write_expression(out, inner, registry, indent + 1);
        }
        ExprKind::Unary { op, operand } => {
            let _ = writeln!(out, "{pad}- Unary ({}:{ty})", op.symbol());
            write_expression(out, operand, registry, indent + 1);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let _ = writeln!(out, "{pad}- Binary ({}:{ty})", op.symbol());
            write_expression(out, lhs, registry, indent + 1);
            write_expression(out, rhs, registry, indent + 1);
        }
        ExprKind::Cast { target, operand } => {
            let _ = writeln!(out, "{pad}- Cast (:{ty})");
            write_expression(out, target, registry, indent + 1);
            write_expression(out, operand, registry, indent + 1);
        }
        ExprKind::Call { callee, args } => {
            let _ = writeln!(out, "{pad}- Call (:{ty})");
            write_expression(out, callee, registry, indent + 1);
            for arg in args {
                write_expression(out, arg, registry, indent + 2);
            }
        }
        ExprKind::Selector { target, select } => {
            match select {
                Selector::Field(name) => {
                    let _ = writeln!(out, "{pad}- Selector .{name} (:{ty})");
                }
                Selector::Index(_) => {
                    let _ = writeln!(out, "{pad}- Subscript (:{ty})");
                }
            }
            write_expression(out, target, registry, indent + 1);
            if let Selector::Index(index) = select {
                write_expression(out, index, registry, indent + 1);
            }
        }
        ExprKind::Dereference(inner) => {
            let _ = writeln!(out, "{pad}- Dereference (:{ty})");
            write_expression(out, inner, registry, indent + 1);
        }
        ExprKind::Assignment { target, value } => {
            let _ = writeln!(out, "{pad}- Assignment (:{ty})");
            write_expression(out, target, registry, indent + 1);
            write_expression(out, value, registry, indent + 1);
        }
        ExprKind::FunctionType(_) | ExprKind::TypeLiteral => {
            let rendered = if expr.is_constant {
                type_name(registry, expr.constant.as_type())
            } else {
                "none"
            };
            let _ = writeln!(out, "{pad}- Type Literal ({rendered}:{ty})");
        }
        ExprKind::Function(function) => {
            let _ = writeln!(out, "{pad}- Function (:{ty})");
            write_statement(out, &function.body, registry, indent + 1);
        }
        ExprKind::Structure(structure) => {
            let _ = writeln!(out, "{pad}- Struct");
            for member in &structure.members {
                write_statement(out, member, registry, indent + 1);
            }
        }
        ExprKind::StructLiteral { members, .. } => {
            let _ = writeln!(out, "{pad}- Struct Literal (:{ty})");
            for member in members {
                write_expression(out, member, registry, indent + 2);
            }
        }
        ExprKind::ArrayLiteral { elements, .. } => {
            let _ = writeln!(out, "{pad}- Array Literal (:{ty})");
            for element in elements {
                write_expression(out, element, registry, indent + 2);
            }
        }
        ExprKind::ArrayType { .. } | ExprKind::PointerType(_) => {
            let rendered = if expr.is_constant {
                type_name(registry, expr.constant.as_type())
            } else {
                "none"
            };
            let _ = writeln!(out, "{pad}- Type Literal ({rendered}:{ty})");
        }
        ExprKind::Bad => {
            let _ = writeln!(out, "{pad}> Bad Expression");
        }
    }
}
