//! The builtin dialect: common types, attributes and the top level
//! [ModuleOp](ops::ModuleOp). It is loaded eagerly by
//! [Context::new], and its singleton entities are pre-built and cached
//! in the context.

use crate::{
    attribute::AttrObj,
    context::{Context, Ptr},
    dialect::{Dialect, DialectName},
    dialect_registry::{DialectDefinition, DialectRegistry},
    r#type::TypeObj,
    type_id::TypeID,
};

pub mod attributes;
pub mod ops;
pub mod types;

/// Namespace of the builtin dialect.
pub const DIALECT_NAME: &str = "builtin";

/// The builtin [Dialect]'s defining type.
pub struct BuiltinDialect;

impl DialectDefinition for BuiltinDialect {
    const NAMESPACE: &'static str = DIALECT_NAME;

    fn init(ctx: &mut Context) -> Dialect {
        let mut dialect = Dialect::new(DialectName::new(DIALECT_NAME), TypeID::get::<Self>());
        types::register(ctx, &mut dialect);
        attributes::register(ctx, &mut dialect);
        ops::register(ctx, &mut dialect);
        // Types must be interned before the cached attributes that
        // refer to them are built.
        ctx.cached_entities = Some(CachedEntities::create(ctx));
        dialect
    }
}

/// Register the builtin dialect into `registry`.
pub fn register(registry: &mut DialectRegistry) {
    registry.insert::<BuiltinDialect>();
}

/// Frequently used builtin entities, interned once at [Context::new].
pub struct CachedEntities {
    pub i1_type: Ptr<TypeObj>,
    pub i8_type: Ptr<TypeObj>,
    pub i16_type: Ptr<TypeObj>,
    pub i32_type: Ptr<TypeObj>,
    pub i64_type: Ptr<TypeObj>,
    pub index_type: Ptr<TypeObj>,
    pub none_type: Ptr<TypeObj>,
    pub unit_attr: AttrObj,
    pub true_attr: AttrObj,
    pub false_attr: AttrObj,
    pub empty_string_attr: AttrObj,
    pub empty_dict_attr: AttrObj,
}

impl CachedEntities {
    fn create(ctx: &mut Context) -> CachedEntities {
        use attributes::{BoolAttr, DictAttr, StringAttr, UnitAttr};
        use types::{IndexType, IntegerType, NoneType, Signedness};
        CachedEntities {
            i1_type: IntegerType::get(ctx, 1, Signedness::Signless),
            i8_type: IntegerType::get(ctx, 8, Signedness::Signless),
            i16_type: IntegerType::get(ctx, 16, Signedness::Signless),
            i32_type: IntegerType::get(ctx, 32, Signedness::Signless),
            i64_type: IntegerType::get(ctx, 64, Signedness::Signless),
            index_type: IndexType::get(ctx),
            none_type: NoneType::get(ctx),
            unit_attr: UnitAttr::create(),
            true_attr: BoolAttr::create(true),
            false_attr: BoolAttr::create(false),
            empty_string_attr: StringAttr::create(String::new()),
            empty_dict_attr: DictAttr::create(vec![]),
        }
    }
}
