//! # Type Checker
//!
//! Second and third stages of the semantic pipeline. The collector walks
//! the fresh syntax tree once, building the scope tree and installing an
//! entity per declared name; the checker then resolves every entity and
//! annotates every expression with its type, inserting implicit casts
//! and folding constants along the way.
//!
//! Constants are order independent: referencing a not-yet-resolved
//! constant recursively checks its declaration first, with an
//! `Unresolved → InProgress → Resolved` status on the entity to detect
//! cycles. Variables instead become usable only once their declaration
//! has been checked, which is what allows a constant function to call
//! itself while a function stored in a variable cannot.
//!
//! Errors never abort a pass. Every diagnostic is appended to the shared
//! error state and the offending node is typed `invalid`, which keeps
//! later passes quiet about the same subtree.

mod collect;
mod expression;
mod fold;
pub mod scope;
pub mod types;

use crate::error::ErrorState;
use crate::parser::ast::{DeclRef, ExprKind, Expression, Statement};
use crate::vm::value::Value;

use self::collect::Collector;
use self::scope::{
    Entity, EntityId, EntityKind, EntityStatus, ScopeArena, ScopeId, ScopeKind,
};
use self::types::{TypeDetails, TypeId, TypeRegistry, TypeTag};

/// Run name collection and type checking over the parsed program. The
/// returned arena carries the resolved scope/entity table consumed by
/// code generation.
pub fn check_program(
    program: &mut [Statement],
    registry: &mut TypeRegistry,
    errors: &mut ErrorState,
) -> ScopeArena {
    let mut arena = ScopeArena::new();
    Collector::run(program, &mut arena, errors);

    let mut checker = TypeChecker {
        arena: &mut arena,
        registry,
        errors,
        current: ScopeId::GLOBAL,
    };
    checker.install_core_types();
    for stmt in program.iter_mut() {
        checker.check_statement(stmt);
    }
    arena
}

pub(crate) struct TypeChecker<'a> {
    pub(crate) arena: &'a mut ScopeArena,
    pub(crate) registry: &'a mut TypeRegistry,
    pub(crate) errors: &'a mut ErrorState,
    pub(crate) current: ScopeId,
}

impl TypeChecker<'_> {
    /// The core types are ordinary constant entities of type `type` in
    /// the global scope, so `i32`, `bool` etc. resolve like any name.
    fn install_core_types(&mut self) {
        let core = [
            ("i32", TypeId::I32),
            ("f32", TypeId::F32),
            ("bool", TypeId::BOOL),
            ("void", TypeId::VOID),
            ("type", TypeId::TYPE),
        ];
        for (name, id) in core {
            let mut entity = Entity::new(name.to_string(), EntityKind::Constant, None);
            entity.status = EntityStatus::Resolved;
            entity.ty = TypeId::TYPE;
            entity.constant = Value::from_type(id);
            self.arena.add_entity(ScopeId::GLOBAL, entity);
        }
    }

    pub(crate) fn error(&mut self, span: crate::lexer::Span, message: String) {
        self.errors.push(span, message);
    }

    pub(crate) fn in_data_scope(&self) -> bool {
        self.arena.scope(self.current).kind.is_data_scope()
    }

    pub(crate) fn implicitly_castable(&self, from: TypeId, to: TypeId) -> bool {
        from == TypeId::I32 && to == TypeId::F32
    }

    /// Wrap `operand` in a synthesized cast to `to` and type check the
    /// new node (which also folds constant operands).
    pub(crate) fn make_implicit_cast(&mut self, operand: Expression, to: TypeId) -> Expression {
        let span = operand.span;
        let mut target = Expression::new(ExprKind::TypeLiteral, span);
        target.is_constant = true;
        target.constant = Value::from_type(to);
        let mut cast = Expression::new(
            ExprKind::Cast {
                target: Box::new(target),
                operand: Box::new(operand),
            },
            span,
        );
        self.check_expression(&mut cast, None);
        cast
    }

    pub(crate) fn check_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Declaration(decl) => {
                let decl = decl.clone();
                let name = decl.borrow().name.clone();
                if let Some(entity) = self.arena.lookup(self.current, &name) {
                    self.check_declaration(&decl, entity);
                }
            }
            Statement::Print { expr, span } => {
                if self.in_data_scope() {
                    let span = *span;
                    self.error(span, "Cannot execute imperative code in data scope".into());
                }
                self.check_expression(expr, None);
                let tag = self.registry.tag(expr.ty);
                if matches!(
                    tag,
                    TypeTag::Void | TypeTag::Struct | TypeTag::Array | TypeTag::Pointer
                ) {
                    let span = expr.span;
                    let name = self.registry.name(expr.ty).to_string();
                    self.error(span, format!("Cannot print a value of type '{name}'"));
                }
            }
            Statement::Return { expr, span } => {
                let span = *span;
                let Some(expr) = expr else {
                    return;
                };
                self.check_expression(expr, None);

                if self.in_data_scope() {
                    self.error(span, "Cannot execute imperative code in data scope".into());
                    return;
                }

                // Find the function this return belongs to; a top level
                // return (from the implicit main) is left unchecked.
                let mut cursor = Some(self.current);
                let mut function_scope = None;
                while let Some(id) = cursor {
                    if self.arena.scope(id).kind == ScopeKind::Function {
                        function_scope = Some(id);
                        break;
                    }
                    cursor = self.arena.scope(id).parent;
                }
                let Some(function_scope) = function_scope else {
                    return;
                };
                let Some(function_ty) = self.arena.scope(function_scope).function_type else {
                    return;
                };
                let return_ty = match &self.registry.get(function_ty).details {
                    TypeDetails::Function { return_type, .. } => *return_type,
                    _ => return,
                };

                if expr.ty != return_ty && expr.ty != TypeId::INVALID {
                    if self.implicitly_castable(expr.ty, return_ty) {
                        let old = std::mem::replace(expr, Expression::bad(expr.span));
                        *expr = self.make_implicit_cast(old, return_ty);
                    } else {
                        let message = format!(
                            "Type mismatch in return, function has type {}, but return expression is type {}",
                            self.registry.name(return_ty),
                            self.registry.name(expr.ty)
                        );
                        self.error(span, message);
                    }
                }
            }
            Statement::Expression { expr, span } => {
                self.check_expression(expr, None);
                if self.in_data_scope() && !expr.is_constant {
                    let span = *span;
                    self.error(span, "Cannot execute imperative code in data scope".into());
                }
            }
            Statement::If(if_stmt) => {
                if self.in_data_scope() {
                    let span = if_stmt.span;
                    self.error(span, "Cannot execute imperative code in data scope".into());
                }
                self.check_expression(&mut if_stmt.condition, None);
                if if_stmt.condition.ty != TypeId::BOOL && if_stmt.condition.ty != TypeId::INVALID
                {
                    let span = if_stmt.condition.span;
                    self.error(
                        span,
                        "if conditional expression does not evaluate to a boolean".into(),
                    );
                }
                self.check_statement(&mut if_stmt.then_branch);
                if let Some(else_branch) = &mut if_stmt.else_branch {
                    self.check_statement(else_branch);
                }
            }
            Statement::While(while_stmt) => {
                if self.in_data_scope() {
                    let span = while_stmt.span;
                    self.error(span, "Cannot execute imperative code in data scope".into());
                }
                self.check_expression(&mut while_stmt.condition, None);
                if while_stmt.condition.ty != TypeId::BOOL
                    && while_stmt.condition.ty != TypeId::INVALID
                {
                    let span = while_stmt.condition.span;
                    self.error(
                        span,
                        "while conditional expression does not evaluate to a boolean".into(),
                    );
                }
                self.check_statement(&mut while_stmt.body);
            }
            Statement::Block(block) => {
                if self.in_data_scope() && self.arena.scope(self.current).kind != ScopeKind::Function
                {
                    let span = block.span;
                    self.error(span, "Cannot execute imperative code in data scope".into());
                }
                if block.scope == ScopeId::UNSET {
                    return;
                }
                let saved = self.current;
                self.current = block.scope;
                for stmt in &mut block.statements {
                    self.check_statement(stmt);
                }
                self.current = saved;

                // Variables of the block fall out of liveness.
                for id in self.arena.entities_in(block.scope) {
                    if self.arena.entity(id).kind == EntityKind::Variable {
                        self.arena.entity_mut(id).is_live = false;
                    }
                }
            }
            Statement::Bad { .. } => {}
        }
    }

    /// Resolve one declaration. Called in statement order and lazily from
    /// identifier references, so constants resolve independent of their
    /// position; the status field breaks cycles.
    pub(crate) fn check_declaration(&mut self, decl_ref: &DeclRef, entity_id: EntityId) {
        match self.arena.entity(entity_id).status {
            EntityStatus::Resolved => return,
            // The cycle is reported at the referencing identifier.
            EntityStatus::InProgress => return,
            EntityStatus::Unresolved => {}
        }
        self.arena.entity_mut(entity_id).status = EntityStatus::InProgress;

        let mut decl = decl_ref.borrow_mut();
        let decl_span = decl.span;
        let name = decl.name.clone();
        let is_constant_decl = decl.is_constant;
        let has_annotation = decl.type_annotation.is_some();

        let mut declared_ty = TypeId::INVALID;

        // The annotation is checked first so the initializer can be
        // checked with an inference hint.
        let mut annotation_info = None;
        if let Some(annotation) = decl.type_annotation.as_mut() {
            self.check_expression(annotation, None);
            annotation_info = Some((
                annotation.is_bad(),
                annotation.ty,
                annotation.is_constant,
                annotation.constant,
                annotation.span,
            ));
        }
        if let Some((bad, ty, constant, value, span)) = annotation_info {
            if !bad && ty != TypeId::INVALID {
                if !constant {
                    self.error(
                        span,
                        "Type annotation for declaration must be a constant".into(),
                    );
                } else if ty != TypeId::TYPE {
                    self.error(span, "Type annotation for declaration must be a type".into());
                } else {
                    declared_ty = value.as_type();
                }
            }
        }

        let hint = if declared_ty == TypeId::INVALID {
            None
        } else {
            Some(declared_ty)
        };

        let mut init_info = None;
        if let Some(init) = decl.initializer.as_mut() {
            self.check_expression(init, hint);
            init_info = Some((init.ty, init.is_constant, init.constant));
        }
        if let Some((init_ty, init_constant, init_value)) = init_info {
            if init_ty == TypeId::INVALID {
                declared_ty = TypeId::INVALID;
            } else {
                if !init_constant && self.in_data_scope() {
                    self.error(
                        decl_span,
                        "Cannot execute non-constant initializers in data scope".into(),
                    );
                }

                if is_constant_decl {
                    if !init_constant {
                        self.error(
                            decl_span,
                            format!(
                                "Constant declaration '{name}' is not initialized with a constant expression"
                            ),
                        );
                    } else {
                        self.arena.entity_mut(entity_id).constant = init_value;
                    }
                }

                if has_annotation && declared_ty != TypeId::INVALID {
                    if declared_ty != init_ty {
                        let annotation_span =
                            annotation_info.map(|(_, _, _, _, span)| span).unwrap_or(decl_span);
                        let message = format!(
                            "Type mismatch in declaration, declared as {} and initialized as {}",
                            self.registry.name(declared_ty),
                            self.registry.name(init_ty)
                        );
                        self.error(annotation_span, message);
                    }
                } else {
                    declared_ty = init_ty;
                }
            }
        }

        decl.ty = declared_ty;
        drop(decl);

        let entity = self.arena.entity_mut(entity_id);
        entity.ty = declared_ty;
        entity.status = EntityStatus::Resolved;
        if entity.kind == EntityKind::Variable {
            entity.is_live = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn check(source: &str) -> (Vec<Statement>, TypeRegistry, ErrorState) {
        let mut errors = ErrorState::new();
        let tokens = Lexer::new(source).tokenize(&mut errors);
        let mut statements = Parser::new(&tokens, source, &mut errors).parse();
        let mut registry = TypeRegistry::new();
        check_program(&mut statements, &mut registry, &mut errors);
        (statements, registry, errors)
    }

    fn first_declaration(statements: &[Statement]) -> crate::parser::ast::Declaration {
        match &statements[0] {
            Statement::Declaration(decl) => decl.borrow().clone(),
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_literal_declaration_types() {
        let (statements, _, errors) = check("x := 5;");
        assert!(errors.is_empty(), "{:?}", errors.messages());
        assert_eq!(first_declaration(&statements).ty, TypeId::I32);

        let (statements, _, errors) = check("x := 5.5;");
        assert!(errors.is_empty());
        assert_eq!(first_declaration(&statements).ty, TypeId::F32);

        let (statements, _, errors) = check("x : type = i32;");
        assert!(errors.is_empty());
        assert_eq!(first_declaration(&statements).ty, TypeId::TYPE);
    }

    #[test]
    fn test_declaration_mismatch() {
        let (_, _, errors) = check("k:i32 = true;");
        assert_eq!(errors.count(), 1);
        assert!(errors.messages()[0]
            .contains("Type mismatch in declaration, declared as i32 and initialized as bool"));
    }

    #[test]
    fn test_undeclared_identifier() {
        let (_, _, errors) = check("print(j);");
        assert_eq!(errors.count(), 1);
        assert!(errors.messages()[0]
            .contains("Undeclared identifier 'j', not found in any available scope"));
    }

    #[test]
    fn test_constants_resolve_out_of_order() {
        let (_, _, errors) = check("a := b + 1;\nb :: 41;");
        assert!(errors.is_empty(), "{:?}", errors.messages());
    }

    #[test]
    fn test_circular_constants() {
        let (_, _, errors) = check("a :: b;\nb :: a;");
        assert!(errors
            .messages()
            .iter()
            .any(|m| m.contains("Circular dependency detected")));
    }

    #[test]
    fn test_implicit_cast_inserted_on_binary() {
        let (statements, _, errors) = check("x := 5 + 5.0;");
        assert!(errors.is_empty(), "{:?}", errors.messages());
        let decl = first_declaration(&statements);
        assert_eq!(decl.ty, TypeId::F32);
        let init = decl.initializer.unwrap();
        // The fold over the inserted cast produced a constant 10.0.
        assert!(init.is_constant);
        assert_eq!(init.constant.as_f32(), 10.0);
        let ExprKind::Binary { lhs, .. } = &init.kind else {
            panic!("expected binary expression");
        };
        assert!(matches!(lhs.kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn test_return_type_mismatch() {
        let (_, _, errors) = check("f :: func () -> i32 { return 1.5; };");
        assert_eq!(errors.count(), 1);
        assert!(errors.messages()[0].contains(
            "Type mismatch in return, function has type i32, but return expression is type f32"
        ));
    }

    #[test]
    fn test_return_is_implicitly_cast() {
        let (_, _, errors) = check("f :: func () -> f32 { v:i32 = 2; return v; };");
        assert!(errors.is_empty(), "{:?}", errors.messages());
    }

    #[test]
    fn test_non_boolean_condition() {
        let (_, _, errors) = check("if 1 { print(1); }");
        assert_eq!(errors.count(), 1);
        assert!(errors.messages()[0]
            .contains("if conditional expression does not evaluate to a boolean"));
    }

    #[test]
    fn test_imperative_code_in_struct_scope() {
        let (_, _, errors) = check("S :: struct { x: i32;\nprint(1);\n};");
        assert!(errors
            .messages()
            .iter()
            .any(|m| m.contains("Cannot execute imperative code in data scope")));
    }

    #[test]
    fn test_non_constant_initializer_in_struct_scope() {
        let (_, _, errors) = check("v := 5.0;\nS :: struct { f: f32 = v; };");
        assert!(errors
            .messages()
            .iter()
            .any(|m| m.contains("Cannot execute non-constant initializers in data scope")));
    }

    #[test]
    fn test_non_constant_type_annotation() {
        let (_, _, errors) = check("T := struct { m: i32; };\nx : T;");
        assert!(errors
            .messages()
            .iter()
            .any(|m| m.contains("Type annotation for declaration must be a constant")));
    }

    #[test]
    fn test_registry_is_deterministic() {
        let source = "S :: struct { a: i32; b: f32; };\nf :: func (n: i32) -> ^S { return &g; };\ng : S;";
        let (_, first, _) = check(source);
        let (_, second, _) = check(source);
        assert_eq!(first, second);
    }

    #[test]
    fn test_struct_member_offsets() {
        let (_, registry, errors) = check("S :: struct { a: i32; b: bool; c: f32; };\nx : S;");
        assert!(errors.is_empty(), "{:?}", errors.messages());
        let id = (0..registry.len() as u32)
            .map(TypeId)
            .find(|id| registry.name(*id) == "S")
            .expect("struct S interned");
        let TypeDetails::Struct { members } = &registry.get(id).details else {
            panic!("expected struct details");
        };
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].offset, 0);
        assert_eq!(members[1].offset, 4);
        assert_eq!(members[2].offset, 5);
        assert_eq!(registry.size(id), 9);
    }
}
