use crate::error::ErrorState;
use crate::parser::ast::{DeclRef, ExprKind, Expression, Param, Selector, Statement};

use super::scope::{Entity, EntityKind, ScopeArena, ScopeId, ScopeKind};
use super::types::TypeId;

/// First semantic pass: build the scope tree, install one entity per
/// declaration and attach scope ids onto block/function/struct nodes.
/// No expressions are evaluated here; the pass only discovers names.
pub(crate) struct Collector<'a> {
    arena: &'a mut ScopeArena,
    errors: &'a mut ErrorState,
    current: ScopeId,
}

impl<'a> Collector<'a> {
    pub fn run(
        program: &mut [Statement],
        arena: &'a mut ScopeArena,
        errors: &'a mut ErrorState,
    ) {
        let mut collector = Collector {
            arena,
            errors,
            current: ScopeId::GLOBAL,
        };
        for stmt in program {
            collector.collect_statement(stmt);
        }
    }

    fn collect_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Declaration(decl) => {
                let decl = decl.clone();
                self.collect_declaration(&decl);
            }
            Statement::Expression { expr, .. } => self.collect_expression(expr),
            Statement::Print { expr, .. } => self.collect_expression(expr),
            Statement::Return { expr, .. } => {
                if let Some(expr) = expr {
                    self.collect_expression(expr);
                }
            }
            Statement::If(if_stmt) => {
                self.collect_expression(&mut if_stmt.condition);
                self.collect_statement(&mut if_stmt.then_branch);
                if let Some(else_branch) = &mut if_stmt.else_branch {
                    self.collect_statement(else_branch);
                }
            }
            Statement::While(while_stmt) => {
                self.collect_expression(&mut while_stmt.condition);
                self.collect_statement(&mut while_stmt.body);
            }
            Statement::Block(block) => {
                let scope = self.arena.create_scope(ScopeKind::Block, self.current);
                block.scope = scope;
                self.arena.scope_mut(scope).start_line = block.span.line;
                self.arena.scope_mut(scope).end_line = block.end_span.line;

                let saved = self.current;
                self.current = scope;
                for stmt in &mut block.statements {
                    self.collect_statement(stmt);
                }
                self.current = saved;
            }
            Statement::Bad { .. } => {}
        }
    }

    fn collect_declaration(&mut self, decl_ref: &DeclRef) {
        let mut decl = decl_ref.borrow_mut();
        let name = decl.name.clone();

        if let Some(existing) = self.arena.lookup(self.current, &name) {
            // A function parameter may shadow a variable of the same name
            // from an enclosing scope; everything else is a redefinition.
            let current_kind = self.arena.scope(self.current).kind;
            let is_param_scope =
                current_kind == ScopeKind::Function || current_kind == ScopeKind::FunctionType;
            let in_other_scope = self.arena.lookup_local(self.current, &name).is_none();
            let shadows_variable = self.arena.entity(existing).kind == EntityKind::Variable;
            if !(is_param_scope && in_other_scope && shadows_variable) {
                self.errors
                    .push(decl.span, format!("Redefinition of variable '{name}'"));
                decl.ty = TypeId::INVALID;
                return;
            }
        }

        let mut kind = if decl.is_constant {
            EntityKind::Constant
        } else {
            EntityKind::Variable
        };

        if let Some(init) = decl.initializer.as_mut() {
            match &mut init.kind {
                ExprKind::Function(function) => {
                    function.declared_name = Some(name.clone());
                    if decl.is_constant {
                        kind = EntityKind::Function;
                    }
                }
                ExprKind::Structure(structure) => {
                    structure.declared_name = Some(name.clone());
                }
                _ => {}
            }
        }

        self.arena.add_entity(
            self.current,
            Entity::new(name, kind, Some(decl_ref.clone())),
        );

        if let Some(annotation) = decl.type_annotation.as_mut() {
            self.collect_expression(annotation);
        }
        if let Some(init) = decl.initializer.as_mut() {
            self.collect_expression(init);
        }
    }

    fn collect_expression(&mut self, expr: &mut Expression) {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                self.collect_expression(lhs);
                self.collect_expression(rhs);
            }
            ExprKind::Unary { operand, .. } => self.collect_expression(operand),
            ExprKind::Grouping(inner) => self.collect_expression(inner),
            ExprKind::Dereference(inner) => self.collect_expression(inner),
            ExprKind::PointerType(inner) => self.collect_expression(inner),
            ExprKind::Cast { target, operand } => {
                self.collect_expression(target);
                self.collect_expression(operand);
            }
            ExprKind::Call { callee, args } => {
                self.collect_expression(callee);
                for arg in args {
                    self.collect_expression(arg);
                }
            }
            ExprKind::Selector { target, select } => {
                self.collect_expression(target);
                if let Selector::Index(index) = select {
                    self.collect_expression(index);
                }
            }
            ExprKind::Assignment { target, value } => {
                self.collect_expression(target);
                self.collect_expression(value);
            }
            ExprKind::ArrayType { dimension, element } => {
                self.collect_expression(dimension);
                self.collect_expression(element);
            }
            ExprKind::ArrayLiteral { element, elements } => {
                if let Some(element) = element {
                    self.collect_expression(element);
                }
                for e in elements {
                    self.collect_expression(e);
                }
            }
            ExprKind::StructLiteral { target, members, .. } => {
                // Remember the literal so the checker can lay it out once
                // the struct type is known.
                self.arena.scope_mut(self.current).temporaries.push(span);
                if let Some(target) = target {
                    self.collect_expression(target);
                }
                for member in members {
                    self.collect_expression(member);
                }
            }
            ExprKind::FunctionType(func_type) => {
                let scope = self.arena.create_scope(ScopeKind::FunctionType, self.current);
                func_type.scope = scope;
                self.arena.scope_mut(scope).start_line = span.line;
                self.arena.scope_mut(scope).end_line = span.line;

                let saved = self.current;
                self.current = scope;
                for param in &mut func_type.params {
                    match param {
                        Param::Named(decl) => {
                            let decl = decl.clone();
                            self.collect_declaration(&decl);
                        }
                        Param::Anonymous(ty) => self.collect_expression(ty),
                    }
                }
                if let Some(ret) = func_type.return_type.as_mut() {
                    self.collect_expression(ret);
                }
                self.current = saved;
            }
            ExprKind::Function(function) => {
                let scope = self.arena.create_scope(ScopeKind::Function, self.current);
                function.scope = scope;
                self.arena.scope_mut(scope).start_line = span.line;
                self.arena.scope_mut(scope).end_line = span.line;

                let saved = self.current;
                self.current = scope;
                // Parameters are installed directly into the function
                // scope; the inner function-type node gets no scope of
                // its own.
                if let ExprKind::FunctionType(func_type) = &mut function.func_type.kind {
                    for param in &mut func_type.params {
                        match param {
                            Param::Named(decl) => {
                                let decl = decl.clone();
                                self.collect_declaration(&decl);
                            }
                            Param::Anonymous(ty) => self.collect_expression(ty),
                        }
                    }
                    if let Some(ret) = func_type.return_type.as_mut() {
                        self.collect_expression(ret);
                    }
                }
                self.collect_statement(&mut function.body);
                self.current = saved;
            }
            ExprKind::Structure(structure) => {
                let scope = self.arena.create_scope(ScopeKind::Struct, self.current);
                structure.scope = scope;
                self.arena.scope_mut(scope).start_line = span.line;
                self.arena.scope_mut(scope).end_line = structure.end_span.line;

                let saved = self.current;
                self.current = scope;
                for member in &mut structure.members {
                    self.collect_statement(member);
                }
                self.current = saved;
            }
            ExprKind::Literal
            | ExprKind::Identifier(_)
            | ExprKind::TypeLiteral
            | ExprKind::Bad => {}
        }
    }
}
