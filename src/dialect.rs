//! [Dialect]s are namespaces under which [Op](crate::op::Op)s,
//! [Type](crate::type::Type)s and [Attribute](crate::attribute::Attribute)s
//! are registered. A dialect is identified by its namespace name and by
//! the [TypeID] of the Rust type that defines it; the context rejects
//! two distinct definitions claiming one namespace.

use crate::{
    attribute::AttrId,
    context::Context,
    identifier::Identifier,
    op::OpId,
    printable::{self, Printable},
    r#type::TypeId,
    type_id::TypeID,
};

/// Dialect name: a valid [Identifier] without any '.' in it.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct DialectName(Identifier);

impl DialectName {
    /// Create a new DialectName.
    pub fn new(name: &str) -> DialectName {
        assert!(!name.contains('.'), "dialect names may not contain '.'");
        DialectName(name.into())
    }
}

impl Printable for DialectName {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for DialectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DialectName {
    fn from(name: &str) -> Self {
        DialectName::new(name)
    }
}

/// A loaded dialect: its namespace, its identity, and the kinds
/// registered under it.
pub struct Dialect {
    name: DialectName,
    type_id: TypeID,
    ops: Vec<OpId>,
    types: Vec<TypeId>,
    attributes: Vec<AttrId>,
}

impl Dialect {
    /// Create a new unregistered dialect. Install it into a context by
    /// returning it from the `init` closure of
    /// [Context::get_or_load_dialect].
    pub fn new(name: DialectName, type_id: TypeID) -> Dialect {
        Dialect {
            name,
            type_id,
            ops: vec![],
            types: vec![],
            attributes: vec![],
        }
    }

    /// This dialect's namespace.
    pub fn name(&self) -> &DialectName {
        &self.name
    }

    /// Identity of the Rust type defining this dialect.
    pub fn type_id(&self) -> TypeID {
        self.type_id
    }

    /// Add an [Op](crate::op::Op) to this dialect.
    pub fn add_op(&mut self, op: OpId) {
        assert!(op.dialect == self.name, "op registered to wrong dialect");
        self.ops.push(op);
    }

    /// Add a [Type](crate::type::Type) to this dialect.
    pub fn add_type(&mut self, ty: TypeId) {
        assert!(ty.dialect == self.name, "type registered to wrong dialect");
        self.types.push(ty);
    }

    /// Add an [Attribute](crate::attribute::Attribute) to this dialect.
    pub fn add_attr(&mut self, attr: AttrId) {
        assert!(
            attr.dialect == self.name,
            "attribute registered to wrong dialect"
        );
        self.attributes.push(attr);
    }

    /// [Op](crate::op::Op)s registered under this dialect.
    pub fn ops(&self) -> &[OpId] {
        &self.ops
    }

    /// [Type](crate::type::Type)s registered under this dialect.
    pub fn types(&self) -> &[TypeId] {
        &self.types
    }

    /// [Attribute](crate::attribute::Attribute)s registered under this
    /// dialect.
    pub fn attributes(&self) -> &[AttrId] {
        &self.attributes
    }
}

impl Printable for Dialect {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        self.name.fmt(ctx, state, f)
    }
}
