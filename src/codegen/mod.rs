pub mod program;

pub use program::{Function, FunctionId, OpCode, Program};

use crate::error::ErrorState;
use crate::lexer::Span;
use crate::parser::ast::{
    BinaryOperator, ExprKind, Expression, FunctionLiteral, Param, Selector, Statement,
    UnaryOperator,
};
use crate::typechecker::scope::{EntityKind, ScopeArena, ScopeId};
use crate::typechecker::types::{Member, TypeDetails, TypeId, TypeRegistry};
use crate::vm::value::Value;

/// Translate the checked program into bytecode. Only ever invoked with an
/// empty error list; the handful of errors it can still produce (locals
/// or constant table overflow, jumps beyond 16 bits, closure captures)
/// invalidate the program.
pub fn generate(
    statements: &[Statement],
    end_line: u32,
    arena: &mut ScopeArena,
    registry: &TypeRegistry,
    errors: &mut ErrorState,
) -> Program {
    let mut generator = CodeGen {
        arena,
        registry,
        errors,
        program: Program::default(),
        current_function: 0,
        current_scope: ScopeId::GLOBAL,
        locals: vec![],
        scope_bases: vec![],
        constant_overflow: false,
    };

    generator.program.functions.push(Function {
        name: "<main>".to_string(),
        ..Default::default()
    });
    generator.program.main = 0;

    // Constants (and in particular function objects) go into the table
    // before any code is generated, so mutually recursive constants can
    // reference each other.
    generator.allocate_constant_entities(ScopeId::GLOBAL);

    generator.gen_statements(statements);

    let index = generator.make_constant(Value::nil(), TypeId::VOID);
    generator.emit_op(OpCode::LoadConstant, end_line);
    generator.emit(index, end_line);
    generator.emit_op(OpCode::Return, end_line);

    generator.program
}

struct CodeGen<'a> {
    arena: &'a mut ScopeArena,
    registry: &'a TypeRegistry,
    errors: &'a mut ErrorState,
    program: Program,
    current_function: FunctionId,
    current_scope: ScopeId,
    /// Names of the live locals of the current function; a name's index
    /// is its VM frame slot.
    locals: Vec<String>,
    /// Locals stack height at each enclosing block entry.
    scope_bases: Vec<usize>,
    constant_overflow: bool,
}

impl CodeGen<'_> {
    // ------------------------------------------------------------------
    // Emission plumbing

    fn code_len(&self) -> usize {
        self.program.functions[self.current_function].code.len()
    }

    fn emit(&mut self, byte: u8, line: u32) {
        let function = &mut self.program.functions[self.current_function];
        function.code.push(byte);
        function.lines.push(line);
    }

    fn emit_op(&mut self, op: OpCode, line: u32) {
        self.emit(op as u8, line);
    }

    fn emit_u16(&mut self, value: u16, line: u32) {
        self.emit((value >> 8) as u8, line);
        self.emit(value as u8, line);
    }

    fn emit_u32(&mut self, value: u32, line: u32) {
        for byte in value.to_be_bytes() {
            self.emit(byte, line);
        }
    }

    /// Emit a jump with a placeholder operand; returns the operand
    /// position for patching.
    fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.emit_op(op, line);
        self.emit(0xff, line);
        self.emit(0xff, line);
        self.code_len() - 2
    }

    fn patch_jump(&mut self, operand_pos: usize) {
        let distance = self.code_len() - operand_pos - 2;
        if distance > u16::MAX as usize {
            let line = self.program.functions[self.current_function].lines[operand_pos];
            self.codegen_error(line, "Too much code to jump over".to_string());
            return;
        }
        let function = &mut self.program.functions[self.current_function];
        function.code[operand_pos] = (distance >> 8) as u8;
        function.code[operand_pos + 1] = distance as u8;
    }

    fn emit_loop(&mut self, target: usize, line: u32) {
        self.emit_op(OpCode::Loop, line);
        let distance = self.code_len() - target + 2;
        if distance > u16::MAX as usize {
            self.codegen_error(line, "Loop body is too large to jump over".to_string());
            self.emit_u16(0, line);
            return;
        }
        self.emit_u16(distance as u16, line);
    }

    fn codegen_error(&mut self, line: u32, message: String) {
        self.errors.push(
            Span {
                offset: 0,
                line,
                line_start: 0,
            },
            message,
        );
    }

    /// Add a value to the constant table, reusing an existing identical
    /// entry.
    fn make_constant(&mut self, value: Value, ty: TypeId) -> u8 {
        for (i, existing) in self.program.constants.iter().enumerate() {
            if *existing == value && self.program.debug_constant_types[i] == ty {
                return i as u8;
            }
        }
        if self.program.constants.len() >= u8::MAX as usize + 1 {
            if !self.constant_overflow {
                self.constant_overflow = true;
                self.codegen_error(0, "Too many constants in one program".to_string());
            }
            return 0;
        }
        self.program.constants.push(value);
        self.program.debug_constant_types.push(ty);
        (self.program.constants.len() - 1) as u8
    }

    fn resolve_local(&self, name: &str) -> Option<u8> {
        self.locals
            .iter()
            .rposition(|local| local == name)
            .map(|slot| slot as u8)
    }

    // ------------------------------------------------------------------
    // Constant table pre-pass

    fn allocate_constant_entities(&mut self, scope: ScopeId) {
        for entity_id in self.arena.entities_in(scope) {
            let kind = self.arena.entity(entity_id).kind;
            match kind {
                EntityKind::Function => {
                    let function_id = self.program.functions.len();
                    self.program.functions.push(Function {
                        name: self.arena.entity(entity_id).name.clone(),
                        ..Default::default()
                    });
                    let value = Value::from_function(function_id);
                    let ty = self.arena.entity(entity_id).ty;
                    let index = self.make_constant(value, ty);
                    let entity = self.arena.entity_mut(entity_id);
                    entity.function = Some(function_id);
                    entity.constant = value;
                    entity.const_index = Some(index);
                }
                EntityKind::Constant => {
                    let has_initializer = self
                        .arena
                        .entity(entity_id)
                        .declaration
                        .as_ref()
                        .map(|decl| decl.borrow().initializer.is_some())
                        .unwrap_or(false);
                    if has_initializer {
                        let value = self.arena.entity(entity_id).constant;
                        let ty = self.arena.entity(entity_id).ty;
                        let index = self.make_constant(value, ty);
                        self.arena.entity_mut(entity_id).const_index = Some(index);
                    }
                }
                EntityKind::Variable => {}
            }
        }

        let children = self.arena.scope(scope).children.clone();
        for child in children {
            self.allocate_constant_entities(child);
        }
    }

    // ------------------------------------------------------------------
    // Statements

    fn gen_statements(&mut self, statements: &[Statement]) {
        for stmt in statements {
            self.gen_statement(stmt);
        }
    }

    fn gen_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Declaration(decl_ref) => {
                let decl = decl_ref.borrow();
                let line = decl.span.line;

                if decl.is_constant {
                    // Only function bodies still need code; every other
                    // constant already sits in the table.
                    if let Some(Expression {
                        kind: ExprKind::Function(function),
                        ..
                    }) = &decl.initializer
                    {
                        if let Some(entity_id) = self.arena.lookup(self.current_scope, &decl.name)
                        {
                            if let Some(function_id) = self.arena.entity(entity_id).function {
                                self.gen_function_body(function_id, decl.name.clone(), function);
                            }
                        }
                    }
                    return;
                }

                self.locals.push(decl.name.clone());
                if self.locals.len() > u8::MAX as usize + 1 {
                    self.codegen_error(line, "Too many local variables".to_string());
                }
                match &decl.initializer {
                    Some(init) => self.gen_expression(init),
                    None => {
                        if self.registry.is_boxed(decl.ty) {
                            self.emit_op(OpCode::StructAlloc, line);
                            self.emit_u32(self.registry.size(decl.ty), line);
                        } else {
                            // Zero bits double as 0, 0.0 and false.
                            let index = self.make_constant(Value::nil(), decl.ty);
                            self.emit_op(OpCode::LoadConstant, line);
                            self.emit(index, line);
                        }
                    }
                }
            }
            Statement::Print { expr, span } => {
                self.gen_expression(expr);
                self.emit_op(OpCode::Print, span.line);
                self.emit(self.registry.tag(expr.ty) as u8, span.line);
            }
            Statement::Return { expr, span } => {
                match expr {
                    Some(expr) => self.gen_expression(expr),
                    None => {
                        let index = self.make_constant(Value::nil(), TypeId::VOID);
                        self.emit_op(OpCode::LoadConstant, span.line);
                        self.emit(index, span.line);
                    }
                }
                self.emit_op(OpCode::Return, span.line);
            }
            Statement::Expression { expr, span } => {
                self.gen_expression(expr);
                self.emit_op(OpCode::Pop, span.line);
            }
            Statement::If(if_stmt) => {
                let line = if_stmt.span.line;
                self.gen_expression(&if_stmt.condition);

                // The branch does not consume the condition; both paths
                // pop it themselves.
                let jump_false = self.emit_jump(OpCode::JmpIfFalse, line);
                self.emit_op(OpCode::Pop, if_stmt.then_branch.span().line);
                self.gen_statement(&if_stmt.then_branch);
                let jump_out = self.emit_jump(OpCode::Jmp, line);

                self.patch_jump(jump_false);
                self.emit_op(OpCode::Pop, line);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.gen_statement(else_branch);
                }
                self.patch_jump(jump_out);
            }
            Statement::While(while_stmt) => {
                let line = while_stmt.span.line;
                let loop_start = self.code_len();
                self.gen_expression(&while_stmt.condition);

                let jump_out = self.emit_jump(OpCode::JmpIfFalse, line);
                self.emit_op(OpCode::Pop, line);
                self.gen_statement(&while_stmt.body);
                self.emit_loop(loop_start, while_stmt.body.span().line);

                self.patch_jump(jump_out);
                self.emit_op(OpCode::Pop, while_stmt.body.span().line);
            }
            Statement::Block(block) => {
                let saved_scope = self.current_scope;
                if block.scope != ScopeId::UNSET {
                    self.current_scope = block.scope;
                }
                self.scope_bases.push(self.locals.len());

                self.gen_statements(&block.statements);

                let base = self.scope_bases.pop().unwrap_or(0);
                let line = block.end_span.line;
                while self.locals.len() > base {
                    self.locals.pop();
                    self.emit_op(OpCode::Pop, line);
                }
                self.current_scope = saved_scope;
            }
            Statement::Bad { .. } => {}
        }
    }

    /// Compile a function literal's body into `function_id`. The callee
    /// itself occupies slot 0, its parameters the following slots.
    fn gen_function_body(
        &mut self,
        function_id: FunctionId,
        name: String,
        literal: &FunctionLiteral,
    ) {
        let saved_function = self.current_function;
        let saved_scope = self.current_scope;
        let saved_locals = std::mem::take(&mut self.locals);
        let saved_bases = std::mem::take(&mut self.scope_bases);

        self.current_function = function_id;
        self.program.functions[function_id].name = name.clone();
        if literal.scope != ScopeId::UNSET {
            self.current_scope = literal.scope;
        }

        self.locals.push(name);
        if let ExprKind::FunctionType(func_type) = &literal.func_type.kind {
            for param in &func_type.params {
                match param {
                    Param::Named(decl) => self.locals.push(decl.borrow().name.clone()),
                    // Unnamed parameters still occupy their stack slot.
                    Param::Anonymous(_) => self.locals.push(String::new()),
                }
            }
        }

        self.gen_statement(&literal.body);

        let end_line = match &*literal.body {
            Statement::Block(block) => block.end_span.line,
            other => other.span().line,
        };
        let index = self.make_constant(Value::nil(), TypeId::VOID);
        self.emit_op(OpCode::LoadConstant, end_line);
        self.emit(index, end_line);
        self.emit_op(OpCode::Return, end_line);

        self.current_function = saved_function;
        self.current_scope = saved_scope;
        self.locals = saved_locals;
        self.scope_bases = saved_bases;
    }

    // ------------------------------------------------------------------
    // Expressions

    fn gen_expression(&mut self, expr: &Expression) {
        let line = expr.span.line;

        // Folded expressions load their value directly. Functions still
        // need their bodies compiled; constant identifiers go through
        // the entity so the table entry is shared.
        if expr.is_constant
            && !matches!(expr.kind, ExprKind::Function(_) | ExprKind::Identifier(_))
        {
            let index = self.make_constant(expr.constant, expr.ty);
            self.emit_op(OpCode::LoadConstant, line);
            self.emit(index, line);
            return;
        }

        match &expr.kind {
            ExprKind::Identifier(name) => {
                if expr.is_constant {
                    if let Some(entity_id) = self.arena.lookup(self.current_scope, name) {
                        let index = match self.arena.entity(entity_id).const_index {
                            Some(index) => index,
                            None => {
                                let value = self.arena.entity(entity_id).constant;
                                let ty = self.arena.entity(entity_id).ty;
                                let index = self.make_constant(value, ty);
                                self.arena.entity_mut(entity_id).const_index = Some(index);
                                index
                            }
                        };
                        self.emit_op(OpCode::LoadConstant, line);
                        self.emit(index, line);
                    }
                } else {
                    match self.resolve_local(name) {
                        Some(slot) => {
                            self.emit_op(OpCode::GetLocal, line);
                            self.emit(slot, line);
                        }
                        None => {
                            // The bytecode has no closures; an inner
                            // function referencing an outer variable has
                            // no slot to read.
                            self.errors.push(
                                expr.span,
                                format!("Variable '{name}' is not accessible from this function"),
                            );
                        }
                    }
                }
            }
            ExprKind::Grouping(inner) => self.gen_expression(inner),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOperator::And => {
                    self.gen_expression(lhs);
                    let jump = self.emit_jump(OpCode::JmpIfFalse, line);
                    self.emit_op(OpCode::Pop, line);
                    self.gen_expression(rhs);
                    self.patch_jump(jump);
                }
                BinaryOperator::Or => {
                    self.gen_expression(lhs);
                    let jump = self.emit_jump(OpCode::JmpIfTrue, line);
                    self.emit_op(OpCode::Pop, line);
                    self.gen_expression(rhs);
                    self.patch_jump(jump);
                }
                _ => {
                    self.gen_expression(lhs);
                    self.gen_expression(rhs);
                    let opcode = match op {
                        BinaryOperator::Add => OpCode::Add,
                        BinaryOperator::Subtract => OpCode::Subtract,
                        BinaryOperator::Multiply => OpCode::Multiply,
                        BinaryOperator::Divide => OpCode::Divide,
                        BinaryOperator::Greater => OpCode::Greater,
                        BinaryOperator::Less => OpCode::Less,
                        BinaryOperator::GreaterEqual => OpCode::GreaterEqual,
                        BinaryOperator::LessEqual => OpCode::LessEqual,
                        BinaryOperator::Equal => OpCode::Equal,
                        _ => OpCode::NotEqual,
                    };
                    self.emit_op(opcode, line);
                    self.emit(self.registry.tag(lhs.ty) as u8, line);
                }
            },
            ExprKind::Unary { op, operand } => match op {
                UnaryOperator::Negate => {
                    self.gen_expression(operand);
                    self.emit_op(OpCode::Negate, line);
                    self.emit(self.registry.tag(operand.ty) as u8, line);
                }
                UnaryOperator::Not => {
                    self.gen_expression(operand);
                    self.emit_op(OpCode::Not, line);
                    self.emit(self.registry.tag(operand.ty) as u8, line);
                }
                // Struct values are heap pointers already; taking the
                // address is the identity at runtime.
                UnaryOperator::AddressOf => self.gen_expression(operand),
            },
            ExprKind::Cast { operand, .. } => {
                self.gen_expression(operand);
                self.emit_op(OpCode::Cast, line);
                self.emit(self.registry.tag(operand.ty) as u8, line);
                self.emit(self.registry.tag(expr.ty) as u8, line);
            }
            ExprKind::Call { callee, args } => {
                self.gen_expression(callee);
                for arg in args {
                    self.gen_expression(arg);
                }
                self.emit_op(OpCode::Call, line);
                self.emit(args.len() as u8, line);
            }
            ExprKind::Selector { target, select } => {
                self.gen_expression(target);
                match select {
                    Selector::Field(field) => {
                        if let Some(member) = self.struct_member(target.ty, field) {
                            self.emit_field_load(member.offset, member.ty, line);
                        }
                    }
                    Selector::Index(index) => {
                        if let TypeDetails::Array { base, .. } =
                            self.registry.get(target.ty).details.clone()
                        {
                            let idx = index.constant.as_i32() as u32;
                            let offset = idx * self.registry.size(base);
                            self.emit_field_load(offset, base, line);
                        }
                    }
                }
            }
            // A pointer to a struct is the struct's heap pointer.
            ExprKind::Dereference(inner) => self.gen_expression(inner),
            ExprKind::Assignment { target, value } => self.gen_assignment(target, value, line),
            ExprKind::Function(literal) => {
                let function_id = self.program.functions.len();
                self.program.functions.push(Function::default());
                let name = literal
                    .declared_name
                    .clone()
                    .unwrap_or_else(|| self.registry.name(expr.ty).to_string());
                self.gen_function_body(function_id, name, literal);

                let index = self.make_constant(Value::from_function(function_id), expr.ty);
                self.emit_op(OpCode::LoadConstant, line);
                self.emit(index, line);
            }
            ExprKind::StructLiteral {
                members,
                designated,
                ..
            } => {
                self.emit_op(OpCode::StructAlloc, line);
                self.emit_u32(self.registry.size(expr.ty), line);

                let struct_members = match &self.registry.get(expr.ty).details {
                    TypeDetails::Struct { members } => members.clone(),
                    _ => vec![],
                };

                if *designated {
                    for member in members {
                        let ExprKind::Assignment { target, value } = &member.kind else {
                            continue;
                        };
                        let ExprKind::Identifier(field) = &target.kind else {
                            continue;
                        };
                        if let Some(m) = struct_members.iter().find(|m| m.name == *field) {
                            let (offset, ty) = (m.offset, m.ty);
                            self.gen_expression(value);
                            self.emit_field_store(offset, ty, member.span.line);
                        }
                    }
                } else {
                    for (member, m) in members.iter().zip(struct_members.iter()) {
                        self.gen_expression(member);
                        self.emit_field_store(m.offset, m.ty, member.span.line);
                    }
                }
            }
            ExprKind::ArrayLiteral { elements, .. } => {
                self.emit_op(OpCode::StructAlloc, line);
                self.emit_u32(self.registry.size(expr.ty), line);

                if let TypeDetails::Array { base, .. } =
                    self.registry.get(expr.ty).details.clone()
                {
                    let element_size = self.registry.size(base);
                    for (i, element) in elements.iter().enumerate() {
                        self.gen_expression(element);
                        self.emit_field_store(i as u32 * element_size, base, element.span.line);
                    }
                }
            }
            // Everything below is either constant-folded (handled above)
            // or only reachable after errors, which gate codegen.
            ExprKind::Literal
            | ExprKind::TypeLiteral
            | ExprKind::FunctionType(_)
            | ExprKind::PointerType(_)
            | ExprKind::ArrayType { .. }
            | ExprKind::Structure(_)
            | ExprKind::Bad => {}
        }
    }

    fn gen_assignment(&mut self, target: &Expression, value: &Expression, line: u32) {
        match &target.kind {
            ExprKind::Identifier(name) => {
                self.gen_expression(value);
                match self.resolve_local(name) {
                    Some(slot) => {
                        self.emit_op(OpCode::SetLocal, line);
                        self.emit(slot, line);
                    }
                    None => {
                        self.errors.push(
                            target.span,
                            format!("Variable '{name}' is not accessible from this function"),
                        );
                    }
                }
            }
            ExprKind::Selector {
                target: base,
                select,
            } => {
                self.gen_expression(base);
                self.gen_expression(value);
                match select {
                    Selector::Field(field) => {
                        if let Some(member) = self.struct_member(base.ty, field) {
                            self.emit_field_store(member.offset, member.ty, line);
                        }
                    }
                    Selector::Index(index) => {
                        if let TypeDetails::Array { base: element, .. } =
                            self.registry.get(base.ty).details.clone()
                        {
                            let idx = index.constant.as_i32() as u32;
                            let offset = idx * self.registry.size(element);
                            self.emit_field_store(offset, element, line);
                        }
                    }
                }
            }
            ExprKind::Dereference(pointer) => {
                // Whole-object store through a pointer. Only boxed
                // pointees have an address to write to.
                let pointee = target.ty;
                if self.registry.is_boxed(pointee) {
                    self.gen_expression(pointer);
                    self.gen_expression(value);
                    self.emit_op(OpCode::SetFieldStruct, line);
                    self.emit_u32(0, line);
                    self.emit_u32(self.registry.size(pointee), line);
                } else {
                    self.errors.push(
                        target.span,
                        "Cannot store through a pointer to a primitive value".to_string(),
                    );
                }
            }
            // Invalid L-values were reported by the checker.
            _ => {}
        }
    }

    fn struct_member(&self, ty: TypeId, field: &str) -> Option<Member> {
        match &self.registry.get(ty).details {
            TypeDetails::Struct { members } => members.iter().find(|m| m.name == field).cloned(),
            _ => None,
        }
    }

    fn emit_field_load(&mut self, offset: u32, ty: TypeId, line: u32) {
        let op = if self.registry.is_boxed(ty) {
            OpCode::GetFieldStruct
        } else {
            OpCode::GetField
        };
        self.emit_op(op, line);
        self.emit_u32(offset, line);
        self.emit_u32(self.registry.size(ty), line);
    }

    fn emit_field_store(&mut self, offset: u32, ty: TypeId, line: u32) {
        let op = if self.registry.is_boxed(ty) {
            OpCode::SetFieldStruct
        } else {
            OpCode::SetField
        };
        self.emit_op(op, line);
        self.emit_u32(offset, line);
        self.emit_u32(self.registry.size(ty), line);
    }
}
