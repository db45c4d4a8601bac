use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::lexer::Span;
use crate::parser::ast::DeclRef;
use crate::vm::value::Value;

use super::types::TypeId;

/// Handle to a scope in the arena. Scopes form a tree with stable ids,
/// which resolves the parent/child cycles without reference counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
    /// Placeholder on freshly parsed nodes, replaced by the collector.
    pub const UNSET: ScopeId = ScopeId(u32::MAX);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Block,
    Function,
    FunctionType,
    Struct,
}

impl ScopeKind {
    /// Data scopes describe layout rather than execution; imperative
    /// statements inside them are errors.
    pub fn is_data_scope(&self) -> bool {
        matches!(
            self,
            ScopeKind::Struct | ScopeKind::Function | ScopeKind::FunctionType
        )
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub entities: HashMap<String, EntityId>,
    /// Struct-literal positions noted by the collector, drained by the
    /// checker as the literals are resolved against their struct layout.
    pub temporaries: Vec<Span>,
    pub start_line: u32,
    pub end_line: u32,
    /// Signature of the enclosing function, set once it is known. Read
    /// back when checking `return` statements.
    pub function_type: Option<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Variable,
    Constant,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStatus {
    Unresolved,
    InProgress,
    Resolved,
}

/// Compile-time record for one declared name. Created by the collector,
/// resolved by the checker, consumed by codegen.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub status: EntityStatus,
    /// Core type entities injected by the checker have no declaration.
    pub declaration: Option<DeclRef>,
    pub ty: TypeId,
    /// Variables only: becomes true once the declaration has been
    /// checked; references before that are use-before-definition errors.
    pub is_live: bool,
    /// Constants and functions: the resolved compile-time value.
    pub constant: Value,
    /// Slot in the program constant table, assigned by codegen.
    pub const_index: Option<u8>,
    /// Compiled function object for function entities, assigned by
    /// codegen before any body is generated.
    pub function: Option<usize>,
}

impl Entity {
    pub fn new(name: String, kind: EntityKind, declaration: Option<DeclRef>) -> Entity {
        Entity {
            name,
            kind,
            status: EntityStatus::Unresolved,
            declaration,
            ty: TypeId::INVALID,
            is_live: false,
            constant: Value::nil(),
            const_index: None,
            function: None,
        }
    }
}

/// Owning store for the scope tree and all entities. Everything is
/// referenced through ids so the tree can be walked and mutated freely
/// across the checker and codegen.
#[derive(Debug, Clone)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    entities: Vec<Entity>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        ScopeArena::new()
    }
}

impl ScopeArena {
    pub fn new() -> ScopeArena {
        ScopeArena {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                children: vec![],
                entities: HashMap::new(),
                temporaries: vec![],
                start_line: 1,
                end_line: 1,
                function_type: None,
            }],
            entities: vec![],
        }
    }

    pub fn create_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            children: vec![],
            entities: HashMap::new(),
            temporaries: vec![],
            start_line: 0,
            end_line: 0,
            function_type: None,
        });
        self.scopes[parent.0 as usize].children.push(id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0 as usize]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn add_entity(&mut self, scope: ScopeId, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        let name = entity.name.clone();
        self.entities.push(entity);
        self.scope_mut(scope).entities.insert(name, id);
        id
    }

    /// Look a name up in one scope only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<EntityId> {
        self.scope(scope).entities.get(name).copied()
    }

    /// Look a name up through the scope chain, innermost first.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<EntityId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(entity) = self.lookup_local(id, name) {
                return Some(entity);
            }
            current = self.scope(id).parent;
        }
        None
    }

    /// Ids of the entities declared directly in `scope`.
    pub fn entities_in(&self, scope: ScopeId) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.scope(scope).entities.values().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }
}
