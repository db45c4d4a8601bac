use crate::parser::ast::{
    ExprKind, Expression, FunctionType, Param, Selector, UnaryOperator,
};
use crate::vm::value::Value;

use super::fold;
use super::scope::{EntityKind, EntityStatus, ScopeId};
use super::types::{Member, TypeDetails, TypeId, TypeInfo, TypeTag};
use super::TypeChecker;

impl TypeChecker<'_> {
    /// Type one expression, filling in the node's `ty`, constant-ness and
    /// folded value. `hint` carries the expected type where the context
    /// knows one (declaration annotations, call arguments); it only
    /// guides inference, it never forces a conversion.
    pub(crate) fn check_expression(&mut self, expr: &mut Expression, hint: Option<TypeId>) {
        let span = expr.span;
        let Expression {
            kind,
            ty,
            is_constant,
            constant,
            ..
        } = expr;

        match kind {
            // Literals are fully typed by the parser.
            ExprKind::Literal => {}

            ExprKind::TypeLiteral => {
                *ty = TypeId::TYPE;
            }

            ExprKind::Identifier(name) => {
                let Some(entity_id) = self.arena.lookup(self.current, name) else {
                    let message = format!(
                        "Undeclared identifier '{name}', not found in any available scope"
                    );
                    self.error(span, message);
                    *ty = TypeId::INVALID;
                    return;
                };

                if self.arena.entity(entity_id).status == EntityStatus::InProgress {
                    let message =
                        format!("Circular dependency detected on identifier '{name}'");
                    self.error(span, message);
                    *ty = TypeId::INVALID;
                    return;
                }

                let entity_kind = self.arena.entity(entity_id).kind;
                if entity_kind == EntityKind::Constant || entity_kind == EntityKind::Function {
                    if self.arena.entity(entity_id).status == EntityStatus::Unresolved {
                        if let Some(decl) = self.arena.entity(entity_id).declaration.clone() {
                            self.check_declaration(&decl, entity_id);
                        }
                    }
                    *is_constant = true;
                    *constant = self.arena.entity(entity_id).constant;
                } else {
                    *is_constant = false;
                    if !self.arena.entity(entity_id).is_live {
                        let message =
                            format!("Can't use variable '{name}', it's not defined yet");
                        self.error(span, message);
                    }
                }
                *ty = self.arena.entity(entity_id).ty;
            }

            ExprKind::Grouping(inner) => {
                self.check_expression(inner, hint);
                *ty = inner.ty;
                if inner.is_constant {
                    *is_constant = true;
                    *constant = inner.constant;
                }
            }

            ExprKind::Unary { op, operand } => {
                self.check_expression(operand, None);
                let op = *op;
                match op {
                    UnaryOperator::Not => {
                        *ty = TypeId::BOOL;
                        if operand.ty != TypeId::BOOL && operand.ty != TypeId::INVALID {
                            let message = format!(
                                "Invalid type ({}) used with op \"!\"",
                                self.registry.name(operand.ty)
                            );
                            self.error(span, message);
                        }
                    }
                    UnaryOperator::Negate => {
                        *ty = operand.ty;
                        if !self.registry.is_numeric(operand.ty)
                            && operand.ty != TypeId::INVALID
                        {
                            let message = format!(
                                "Invalid type ({}) used with op \"-\"",
                                self.registry.name(operand.ty)
                            );
                            self.error(span, message);
                        }
                    }
                    UnaryOperator::AddressOf => {
                        let addressable = matches!(
                            operand.kind,
                            ExprKind::Identifier(_) | ExprKind::Selector { .. }
                        );
                        if !addressable {
                            self.error(
                                span,
                                "Can only take the address of a variable or member".into(),
                            );
                            *ty = TypeId::INVALID;
                        } else if operand.is_constant {
                            self.error(span, "Cannot take address of constant".into());
                            *ty = TypeId::INVALID;
                        } else {
                            let base = operand.ty;
                            let info = TypeInfo {
                                tag: TypeTag::Pointer,
                                size: 4,
                                name: format!("^{}", self.registry.name(base)),
                                details: TypeDetails::Pointer { base },
                            };
                            *ty = self.registry.intern(info);
                        }
                    }
                }

                if operand.is_constant && op != UnaryOperator::AddressOf {
                    if let Some(value) =
                        fold::unary(self.registry.tag(*ty), op, operand.constant)
                    {
                        *is_constant = true;
                        *constant = value;
                    }
                }
            }

            ExprKind::Binary { op, lhs, rhs } => {
                self.check_expression(lhs, None);
                self.check_expression(rhs, None);
                let op = *op;

                // Mismatched operands get one implicit i32 -> f32 cast if
                // that reconciles them, otherwise a single error.
                let mut mismatch = false;
                if lhs.ty != rhs.ty {
                    if self.implicitly_castable(lhs.ty, rhs.ty) {
                        let old = std::mem::replace(&mut **lhs, Expression::bad(span));
                        **lhs = self.make_implicit_cast(old, rhs.ty);
                    } else if self.implicitly_castable(rhs.ty, lhs.ty) {
                        let old = std::mem::replace(&mut **rhs, Expression::bad(span));
                        **rhs = self.make_implicit_cast(old, lhs.ty);
                    } else {
                        let message = format!(
                            "Invalid types ({}, {}) used with op \"{}\"",
                            self.registry.name(lhs.ty),
                            self.registry.name(rhs.ty),
                            op.symbol()
                        );
                        self.error(span, message);
                        mismatch = true;
                    }
                }

                if op.is_logical() && lhs.ty != TypeId::BOOL && rhs.ty != TypeId::BOOL {
                    let message = format!(
                        "Invalid types ({}, {}) used with op \"{}\"",
                        self.registry.name(lhs.ty),
                        self.registry.name(rhs.ty),
                        op.symbol()
                    );
                    self.error(span, message);
                }

                if !mismatch
                    && (op.is_comparison() || op.is_arithmetic())
                    && !self.registry.is_numeric(lhs.ty)
                    && lhs.ty != TypeId::INVALID
                {
                    let message = format!(
                        "Invalid types ({}, {}) used with op \"{}\"",
                        self.registry.name(lhs.ty),
                        self.registry.name(rhs.ty),
                        op.symbol()
                    );
                    self.error(span, message);
                }

                *ty = if op.is_arithmetic() {
                    lhs.ty
                } else {
                    TypeId::BOOL
                };

                // Folding runs last so inserted implicit casts are
                // already evaluated.
                if lhs.is_constant && rhs.is_constant && !mismatch {
                    if let Some(value) =
                        fold::binary(self.registry.tag(lhs.ty), op, lhs.constant, rhs.constant)
                    {
                        *is_constant = true;
                        *constant = value;
                    }
                }
            }

            ExprKind::Cast { target, operand } => {
                self.check_expression(target, None);
                self.check_expression(operand, None);

                if target.ty != TypeId::TYPE || !target.is_constant {
                    if target.ty != TypeId::INVALID {
                        let target_span = target.span;
                        self.error(target_span, "Cast target must be a constant type".into());
                    }
                    *ty = TypeId::INVALID;
                    return;
                }

                let from = operand.ty;
                let to = target.constant.as_type();
                let is_base = |checker: &Self, t: TypeId| {
                    matches!(
                        checker.registry.tag(t),
                        TypeTag::I32 | TypeTag::F32 | TypeTag::Bool
                    )
                };
                let suppress = from == TypeId::INVALID || to == TypeId::INVALID;

                if !suppress {
                    if from == to {
                        let message = format!(
                            "Cast from \"{}\" to \"{}\" is pointless",
                            self.registry.name(from),
                            self.registry.name(to)
                        );
                        self.error(span, message);
                    } else if !is_base(self, from) || !is_base(self, to) {
                        let message = format!(
                            "Not possible to cast from type \"{}\" to \"{}\"",
                            self.registry.name(from),
                            self.registry.name(to)
                        );
                        self.error(span, message);
                    }
                }

                if operand.is_constant {
                    if let Some(value) = fold::cast(
                        operand.constant,
                        self.registry.tag(from),
                        self.registry.tag(to),
                    ) {
                        *is_constant = true;
                        *constant = value;
                    }
                }
                *ty = to;
            }

            ExprKind::Call { callee, args } => {
                *is_constant = false;
                self.check_expression(callee, None);

                if matches!(callee.kind, ExprKind::Selector { .. }) {
                    self.error(span, "Calling fields not currently supported".into());
                    *ty = TypeId::INVALID;
                    return;
                }
                if callee.ty == TypeId::INVALID {
                    *ty = TypeId::INVALID;
                    return;
                }

                let TypeDetails::Function {
                    params,
                    return_type,
                } = self.registry.get(callee.ty).details.clone()
                else {
                    self.error(span, "Attempt to call a value which is not a function".into());
                    *ty = TypeId::INVALID;
                    return;
                };

                for (i, arg) in args.iter_mut().enumerate() {
                    let param_hint = params.get(i).copied();
                    self.check_expression(arg, param_hint);
                }

                if args.len() != params.len() {
                    let callee_name = match &callee.kind {
                        ExprKind::Identifier(name) => name.clone(),
                        _ => "<expression>".to_string(),
                    };
                    let message = format!(
                        "Mismatched number of arguments in call to function '{}', expected {}, got {}",
                        callee_name,
                        params.len(),
                        args.len()
                    );
                    self.error(span, message);
                }

                for (arg, &param_ty) in args.iter().zip(params.iter()) {
                    if arg.ty != param_ty && arg.ty != TypeId::INVALID {
                        let arg_span = arg.span;
                        let message = format!(
                            "Type mismatch in function argument, expected {}, got {}",
                            self.registry.name(param_ty),
                            self.registry.name(arg.ty)
                        );
                        self.error(arg_span, message);
                    }
                }

                *ty = return_type;
            }

            ExprKind::Selector { target, select } => {
                *is_constant = false;
                self.check_expression(target, None);
                if target.ty == TypeId::INVALID {
                    *ty = TypeId::INVALID;
                    return;
                }

                match select {
                    Selector::Field(field) => {
                        let TypeDetails::Struct { members } =
                            self.registry.get(target.ty).details.clone()
                        else {
                            let message = format!(
                                "Attempting to access a field on type '{}' which is not a struct",
                                self.registry.name(target.ty)
                            );
                            self.error(span, message);
                            *ty = TypeId::INVALID;
                            return;
                        };
                        match members.iter().find(|m| m.name == *field) {
                            Some(member) => *ty = member.ty,
                            None => {
                                let message = format!(
                                    "Specified field does not exist in struct '{}'",
                                    self.registry.name(target.ty)
                                );
                                self.error(span, message);
                                *ty = TypeId::INVALID;
                            }
                        }
                    }
                    Selector::Index(index) => {
                        self.check_expression(index, Some(TypeId::I32));
                        let TypeDetails::Array { base, dimension } =
                            self.registry.get(target.ty).details.clone()
                        else {
                            let message = format!(
                                "Attempting to subscript a value of type '{}' which is not an array",
                                self.registry.name(target.ty)
                            );
                            self.error(span, message);
                            *ty = TypeId::INVALID;
                            return;
                        };
                        let index_span = index.span;
                        if index.ty != TypeId::I32 {
                            if index.ty != TypeId::INVALID {
                                let message = format!(
                                    "Array subscript must have type i32, got {}",
                                    self.registry.name(index.ty)
                                );
                                self.error(index_span, message);
                            }
                        } else if !index.is_constant {
                            self.error(
                                index_span,
                                "Array subscripts must be constant expressions".into(),
                            );
                        } else {
                            let idx = index.constant.as_i32();
                            if idx < 0 || idx as u32 >= dimension {
                                let message = format!(
                                    "Array subscript {idx} is out of bounds, array has {dimension} elements"
                                );
                                self.error(index_span, message);
                            }
                        }
                        *ty = base;
                    }
                }
            }

            ExprKind::Dereference(inner) => {
                self.check_expression(inner, None);
                let details = self.registry.get(inner.ty).details.clone();
                if let TypeDetails::Pointer { base } = details {
                    *ty = base;
                } else {
                    if inner.ty != TypeId::INVALID {
                        let inner_span = inner.span;
                        self.error(
                            inner_span,
                            "Attempting to dereference a value which is not a pointer".into(),
                        );
                    }
                    *ty = TypeId::INVALID;
                }
            }

            ExprKind::Assignment { target, value } => {
                *is_constant = false;
                self.check_expression(target, None);
                if target.ty == TypeId::INVALID {
                    *ty = TypeId::INVALID;
                    return;
                }
                self.check_expression(value, Some(target.ty));

                let valid_lvalue = matches!(
                    target.kind,
                    ExprKind::Identifier(_)
                        | ExprKind::Selector { .. }
                        | ExprKind::Dereference(_)
                );
                if !valid_lvalue {
                    self.error(
                        span,
                        "Left of assignment is not a valid Lvalue that we can assign to".into(),
                    );
                }
                if let ExprKind::Identifier(name) = &target.kind {
                    if target.is_constant {
                        let message = format!("Can't assign to constant '{name}'");
                        self.error(span, message);
                    }
                }

                if target.ty != value.ty && value.ty != TypeId::INVALID {
                    let message = match &target.kind {
                        ExprKind::Identifier(name) => format!(
                            "Type mismatch on assignment, '{}' has type '{}', but is being assigned a value with type '{}'",
                            name,
                            self.registry.name(target.ty),
                            self.registry.name(value.ty)
                        ),
                        _ => format!(
                            "Type mismatch on assignment, left of assignment has type '{}', but is being assigned a value with type '{}'",
                            self.registry.name(target.ty),
                            self.registry.name(value.ty)
                        ),
                    };
                    self.error(span, message);
                }
                *ty = target.ty;
            }

            ExprKind::FunctionType(func_type) => {
                let saved = self.current;
                if func_type.scope != ScopeId::UNSET {
                    self.current = func_type.scope;
                }
                let function_ty = self.check_function_type(func_type);
                self.current = saved;

                *ty = TypeId::TYPE;
                *is_constant = true;
                *constant = Value::from_type(function_ty);
            }

            ExprKind::Function(function) => {
                *is_constant = true;
                let saved = self.current;
                if function.scope != ScopeId::UNSET {
                    self.current = function.scope;
                }

                let function_ty = match &mut function.func_type.kind {
                    ExprKind::FunctionType(func_type) => self.check_function_type(func_type),
                    _ => TypeId::INVALID,
                };
                function.func_type.ty = TypeId::TYPE;
                function.func_type.is_constant = true;
                function.func_type.constant = Value::from_type(function_ty);
                self.arena.scope_mut(self.current).function_type = Some(function_ty);

                // Resolve the declared entity before the body is checked
                // so recursive references see a finished signature.
                if let Some(declared) = function.declared_name.clone() {
                    if let Some(entity) = self.arena.lookup(self.current, &declared) {
                        self.arena.entity_mut(entity).ty = function_ty;
                        self.arena.entity_mut(entity).status = EntityStatus::Resolved;
                    }
                }

                *ty = function_ty;
                self.check_statement(&mut function.body);
                self.current = saved;
            }

            ExprKind::Structure(structure) => {
                *is_constant = true;
                let saved = self.current;
                if structure.scope != ScopeId::UNSET {
                    self.current = structure.scope;
                }
                for member in &mut structure.members {
                    self.check_statement(member);
                }
                self.current = saved;

                // Lay the struct out: offsets are prefix sums of sizes.
                let mut members = vec![];
                let mut size = 0u32;
                for member_stmt in &structure.members {
                    if let crate::parser::ast::Statement::Declaration(decl) = member_stmt {
                        let decl = decl.borrow();
                        members.push(Member {
                            name: decl.name.clone(),
                            ty: decl.ty,
                            offset: size,
                        });
                        if decl.ty != TypeId::INVALID {
                            size += self.registry.size(decl.ty);
                        }
                    }
                }

                let name = structure
                    .declared_name
                    .clone()
                    .unwrap_or_else(|| "<struct>".to_string());
                let id = self.registry.intern(TypeInfo {
                    tag: TypeTag::Struct,
                    size,
                    name,
                    details: TypeDetails::Struct { members },
                });
                *ty = TypeId::TYPE;
                *constant = Value::from_type(id);
            }

            ExprKind::StructLiteral {
                target,
                members,
                designated,
            } => {
                let struct_ty = if let Some(target) = target {
                    self.check_expression(target, None);
                    if target.ty == TypeId::INVALID {
                        *ty = TypeId::INVALID;
                        return;
                    }
                    if target.ty != TypeId::TYPE || !target.is_constant {
                        let target_span = target.span;
                        self.error(target_span, "Struct literal requires a struct type".into());
                        *ty = TypeId::INVALID;
                        return;
                    }
                    let t = target.constant.as_type();
                    if self.registry.tag(t) != TypeTag::Struct {
                        let message = format!(
                            "Type '{}' is not a struct",
                            self.registry.name(t)
                        );
                        self.error(span, message);
                        *ty = TypeId::INVALID;
                        return;
                    }
                    t
                } else if let Some(h) = hint.filter(|h| self.registry.tag(*h) == TypeTag::Struct)
                {
                    h
                } else {
                    self.error(
                        span,
                        "Not enough information provided to do type inference on this struct literal, potentially missing a type annotation?".into(),
                    );
                    *ty = TypeId::INVALID;
                    return;
                };
                *ty = struct_ty;

                // The collector noted this literal on the scope; the
                // layout is now known, so consume the marker.
                let scope = self.current;
                if let Some(pos) = self
                    .arena
                    .scope(scope)
                    .temporaries
                    .iter()
                    .position(|s| *s == span)
                {
                    self.arena.scope_mut(scope).temporaries.remove(pos);
                }

                if members.is_empty() {
                    return;
                }

                let has_assignments = members
                    .iter()
                    .any(|m| matches!(m.kind, ExprKind::Assignment { .. }));
                let has_values = members
                    .iter()
                    .any(|m| !matches!(m.kind, ExprKind::Assignment { .. }));
                if has_assignments && has_values {
                    self.error(
                        span,
                        "Cannot have a mix of lvalues and rvalues in a struct literal".into(),
                    );
                    return;
                }

                let struct_members = match &self.registry.get(struct_ty).details {
                    TypeDetails::Struct { members } => members.clone(),
                    _ => vec![],
                };

                if has_assignments {
                    *designated = true;
                    for member in members.iter_mut() {
                        let member_span = member.span;
                        let ExprKind::Assignment { target, value } = &mut member.kind else {
                            continue;
                        };
                        let ExprKind::Identifier(field) = &target.kind else {
                            self.error(
                                member_span,
                                "Struct literal member must assign to a field name".into(),
                            );
                            continue;
                        };
                        let Some(m) = struct_members.iter().find(|m| m.name == *field) else {
                            let message = format!(
                                "Specified field does not exist in struct '{}'",
                                self.registry.name(struct_ty)
                            );
                            self.error(member_span, message);
                            continue;
                        };
                        let member_ty = m.ty;
                        let member_name = m.name.clone();
                        target.ty = member_ty;
                        self.check_expression(value, Some(member_ty));
                        if value.ty != member_ty && value.ty != TypeId::INVALID {
                            let value_span = value.span;
                            let message = format!(
                                "Incorrect type for member '{member_name}' in struct literal"
                            );
                            self.error(value_span, message);
                        }
                    }
                } else {
                    *designated = false;
                    if members.len() != struct_members.len() {
                        let message = format!(
                            "Incorrect number of members provided to struct initializer for struct '{}'",
                            self.registry.name(struct_ty)
                        );
                        self.error(span, message);
                        return;
                    }
                    for (member, m) in members.iter_mut().zip(struct_members.iter()) {
                        self.check_expression(member, Some(m.ty));
                        if member.ty != m.ty && member.ty != TypeId::INVALID {
                            let member_span = member.span;
                            let message = format!(
                                "Incorrect type for member '{}' in struct literal",
                                m.name
                            );
                            self.error(member_span, message);
                        }
                    }
                }
            }

            ExprKind::ArrayLiteral { element, elements } => {
                let array_ty = if let Some(element) = element {
                    self.check_expression(element, None);
                    if element.is_constant
                        && element.ty == TypeId::TYPE
                        && self.registry.tag(element.constant.as_type()) == TypeTag::Array
                    {
                        element.constant.as_type()
                    } else {
                        if element.ty != TypeId::INVALID {
                            let element_span = element.span;
                            self.error(
                                element_span,
                                "Array literal requires an array type".into(),
                            );
                        }
                        TypeId::INVALID
                    }
                } else if let Some(h) = hint.filter(|h| self.registry.tag(*h) == TypeTag::Array) {
                    h
                } else {
                    self.error(
                        span,
                        "Not enough information provided to do type inference on this array literal, potentially missing a type annotation?".into(),
                    );
                    TypeId::INVALID
                };
                if array_ty == TypeId::INVALID {
                    *ty = TypeId::INVALID;
                    return;
                }

                let TypeDetails::Array { base, dimension } =
                    self.registry.get(array_ty).details.clone()
                else {
                    *ty = TypeId::INVALID;
                    return;
                };

                if elements.len() as u32 != dimension {
                    let message = format!(
                        "Incorrect number of elements in array literal, expected {}, got {}",
                        dimension,
                        elements.len()
                    );
                    self.error(span, message);
                }
                for el in elements.iter_mut() {
                    self.check_expression(el, Some(base));
                    if el.ty != base && el.ty != TypeId::INVALID {
                        let el_span = el.span;
                        let message = format!(
                            "Incorrect type for array element, expected {}, got {}",
                            self.registry.name(base),
                            self.registry.name(el.ty)
                        );
                        self.error(el_span, message);
                    }
                }
                *ty = array_ty;
            }

            ExprKind::ArrayType { dimension, element } => {
                self.check_expression(dimension, None);
                self.check_expression(element, None);
                *ty = TypeId::TYPE;
                *is_constant = true;

                let dim = if dimension.is_constant
                    && dimension.ty == TypeId::I32
                    && dimension.constant.as_i32() > 0
                {
                    dimension.constant.as_i32() as u32
                } else {
                    if dimension.ty != TypeId::INVALID {
                        let dimension_span = dimension.span;
                        self.error(
                            dimension_span,
                            "Array dimension must be a positive constant integer".into(),
                        );
                    }
                    0
                };
                let base = if element.is_constant && element.ty == TypeId::TYPE {
                    element.constant.as_type()
                } else {
                    if element.ty != TypeId::INVALID {
                        let element_span = element.span;
                        self.error(element_span, "Array element type must be a type".into());
                    }
                    TypeId::INVALID
                };

                let info = TypeInfo {
                    tag: TypeTag::Array,
                    size: dim * self.registry.size(base),
                    name: format!("[{}]{}", dim, self.registry.name(base)),
                    details: TypeDetails::Array {
                        base,
                        dimension: dim,
                    },
                };
                *constant = Value::from_type(self.registry.intern(info));
            }

            ExprKind::PointerType(inner) => {
                self.check_expression(inner, None);
                *ty = TypeId::TYPE;
                *is_constant = true;

                let base = if inner.is_constant && inner.ty == TypeId::TYPE {
                    inner.constant.as_type()
                } else {
                    if inner.ty != TypeId::INVALID {
                        let inner_span = inner.span;
                        self.error(inner_span, "Pointer base must be a type".into());
                    }
                    TypeId::INVALID
                };
                let info = TypeInfo {
                    tag: TypeTag::Pointer,
                    size: 4,
                    name: format!("^{}", self.registry.name(base)),
                    details: TypeDetails::Pointer { base },
                };
                *constant = Value::from_type(self.registry.intern(info));
            }

            ExprKind::Bad => {
                *is_constant = false;
                *ty = TypeId::INVALID;
            }
        }
    }

    /// Resolve a function type node into an interned function type.
    /// Parameter entities live in the current scope, which is either the
    /// function-type scope (bare signatures) or the function scope
    /// (literals with bodies).
    pub(crate) fn check_function_type(&mut self, func_type: &mut FunctionType) -> TypeId {
        let mut param_tys = vec![];
        let mut rendered = vec![];

        for param in &mut func_type.params {
            let param_ty = match param {
                Param::Anonymous(type_expr) => {
                    self.check_expression(type_expr, None);
                    if type_expr.ty == TypeId::TYPE && type_expr.is_constant {
                        type_expr.constant.as_type()
                    } else {
                        if type_expr.ty != TypeId::INVALID {
                            let type_expr_span = type_expr.span;
                            self.error(
                                type_expr_span,
                                "Invalid parameter, expected a typename or a parameter declaration"
                                    .into(),
                            );
                        }
                        TypeId::INVALID
                    }
                }
                Param::Named(decl_ref) => {
                    let decl_ref = decl_ref.clone();
                    let name = decl_ref.borrow().name.clone();
                    if let Some(entity) = self.arena.lookup_local(self.current, &name) {
                        self.check_declaration(&decl_ref, entity);
                    }
                    let ty = decl_ref.borrow().ty;
                    ty
                }
            };
            param_tys.push(param_ty);
            rendered.push(self.registry.name(param_ty).to_string());
        }

        let (return_ty, has_return) = match func_type.return_type.as_mut() {
            Some(ret) => {
                self.check_expression(ret, None);
                if ret.ty == TypeId::TYPE && ret.is_constant {
                    (ret.constant.as_type(), true)
                } else {
                    if ret.ty != TypeId::INVALID {
                        let ret_span = ret.span;
                        self.error(ret_span, "Function return type must be a type".into());
                    }
                    (TypeId::INVALID, true)
                }
            }
            None => (TypeId::VOID, false),
        };

        let mut name = format!("func ({})", rendered.join(", "));
        if has_return {
            name.push_str(&format!(" -> {}", self.registry.name(return_ty)));
        }

        self.registry.intern(TypeInfo {
            tag: TypeTag::Function,
            size: 4,
            name,
            details: TypeDetails::Function {
                params: param_tys,
                return_type: return_ty,
            },
        })
    }
}
