//! Lazy dialect loading, registry composition and extensions.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::TestDialect;
use corion::{
    context::Context,
    dialect::{Dialect, DialectName},
    dialect_registry::{DialectDefinition, DialectExtension, DialectRegistry},
    type_id::TypeID,
};

fn name(s: &str) -> DialectName {
    DialectName::new(s)
}

#[test]
fn load_is_lazy_and_runs_ctor_once() {
    static CTOR_RUNS: AtomicUsize = AtomicUsize::new(0);
    struct LazyDialect;
    impl DialectDefinition for LazyDialect {
        const NAMESPACE: &'static str = "lazy";
        fn init(_ctx: &mut Context) -> Dialect {
            CTOR_RUNS.fetch_add(1, Ordering::SeqCst);
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<LazyDialect>();
    ctx.append_dialect_registry(&registry);
    // Registration alone does not construct.
    assert_eq!(CTOR_RUNS.load(Ordering::SeqCst), 0);
    assert!(ctx.dialect(&name("lazy")).is_none());

    assert!(ctx.load_dialect_by_name(&name("lazy")).is_some());
    assert!(ctx.load_dialect_by_name(&name("lazy")).is_some());
    assert_eq!(CTOR_RUNS.load(Ordering::SeqCst), 1);
    assert!(ctx.dialect(&name("lazy")).is_some());
    assert!(ctx.load_dialect_by_name(&name("unregistered")).is_none());
}

#[test]
fn load_other_dialect_from_ctor() {
    struct BaseDialect;
    impl DialectDefinition for BaseDialect {
        const NAMESPACE: &'static str = "base";
        fn init(_ctx: &mut Context) -> Dialect {
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }
    struct DerivedDialect;
    impl DialectDefinition for DerivedDialect {
        const NAMESPACE: &'static str = "derived";
        fn init(ctx: &mut Context) -> Dialect {
            // Loading another namespace from within a constructor is
            // legal; only a self-load is not.
            assert!(ctx.is_dialect_loading(&name("derived")));
            ctx.load_dialect_by_name(&name("base"))
                .expect("base must be registered");
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<BaseDialect>();
    registry.insert::<DerivedDialect>();
    ctx.append_dialect_registry(&registry);
    ctx.load_dialect_by_name(&name("derived")).unwrap();
    assert!(ctx.dialect(&name("base")).is_some());
    assert!(!ctx.is_dialect_loading(&name("derived")));
}

#[test]
#[should_panic(expected = "repeatedly being loaded while its loading is in progress")]
fn recursive_self_load() {
    struct CyclicDialect;
    impl DialectDefinition for CyclicDialect {
        const NAMESPACE: &'static str = "cyclic";
        fn init(ctx: &mut Context) -> Dialect {
            ctx.load_dialect_by_name(&name("cyclic"));
            unreachable!()
        }
    }

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<CyclicDialect>();
    ctx.append_dialect_registry(&registry);
    ctx.load_dialect_by_name(&name("cyclic"));
}

#[test]
#[should_panic(expected = "already been registered with a different identity")]
fn namespace_identity_collision() {
    struct ImposterDialect;

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<TestDialect>();
    ctx.append_dialect_registry(&registry);
    ctx.load_dialect_by_name(&name("test")).unwrap();
    // Same namespace, different defining type.
    ctx.get_or_load_dialect(&name("test"), TypeID::get::<ImposterDialect>(), |_ctx| {
        unreachable!()
    });
}

#[test]
fn load_all_available_dialects() {
    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<TestDialect>();
    ctx.append_dialect_registry(&registry);
    ctx.load_all_available_dialects();
    let loaded: Vec<_> = ctx.loaded_dialects().cloned().collect();
    assert!(loaded.contains(&name("builtin")));
    assert!(loaded.contains(&name("test")));
}

#[test]
fn required_extension_fires_when_last_requirement_loads() {
    static APPLIED: AtomicUsize = AtomicUsize::new(0);
    struct FirstDialect;
    impl DialectDefinition for FirstDialect {
        const NAMESPACE: &'static str = "ext_first";
        fn init(_ctx: &mut Context) -> Dialect {
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }
    struct SecondDialect;
    impl DialectDefinition for SecondDialect {
        const NAMESPACE: &'static str = "ext_second";
        fn init(_ctx: &mut Context) -> Dialect {
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }
    struct PairExtension {
        required: [DialectName; 2],
    }
    impl DialectExtension for PairExtension {
        fn required_dialects(&self) -> &[DialectName] {
            &self.required
        }
        fn apply(&self, ctx: &mut Context) {
            assert!(ctx.dialect(&name("ext_first")).is_some());
            assert!(ctx.dialect(&name("ext_second")).is_some());
            APPLIED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<FirstDialect>();
    registry.insert::<SecondDialect>();
    registry.add_extension(PairExtension {
        required: [name("ext_first"), name("ext_second")],
    });
    ctx.append_dialect_registry(&registry);

    ctx.load_dialect_by_name(&name("ext_first")).unwrap();
    assert_eq!(APPLIED.load(Ordering::SeqCst), 0);
    ctx.load_dialect_by_name(&name("ext_second")).unwrap();
    assert_eq!(APPLIED.load(Ordering::SeqCst), 1);
    // Reloading does not re-apply.
    ctx.load_dialect_by_name(&name("ext_first")).unwrap();
    assert_eq!(APPLIED.load(Ordering::SeqCst), 1);
}

#[test]
fn anchorless_extension_fires_per_dialect() {
    static APPLICATIONS: AtomicUsize = AtomicUsize::new(0);
    struct SoloDialect;
    impl DialectDefinition for SoloDialect {
        const NAMESPACE: &'static str = "anchorless_solo";
        fn init(_ctx: &mut Context) -> Dialect {
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }
    struct EveryDialectExtension;
    impl DialectExtension for EveryDialectExtension {
        fn required_dialects(&self) -> &[DialectName] {
            &[]
        }
        fn apply(&self, _ctx: &mut Context) {
            APPLICATIONS.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<SoloDialect>();
    registry.add_extension(EveryDialectExtension);
    // builtin is already loaded, so appending applies the extension to
    // it right away.
    ctx.append_dialect_registry(&registry);
    assert_eq!(APPLICATIONS.load(Ordering::SeqCst), 1);
    ctx.load_dialect_by_name(&name("anchorless_solo")).unwrap();
    assert_eq!(APPLICATIONS.load(Ordering::SeqCst), 2);
    // Appending the same registry again is a no-op.
    ctx.append_dialect_registry(&registry);
    assert_eq!(APPLICATIONS.load(Ordering::SeqCst), 2);
}

#[test]
#[should_panic(expected = "while in a multi-threaded execution context")]
fn no_dialect_load_during_parallel_execution() {
    struct LateDialect;
    impl DialectDefinition for LateDialect {
        const NAMESPACE: &'static str = "late";
        fn init(_ctx: &mut Context) -> Dialect {
            Dialect::new(name(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }

    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<LateDialect>();
    ctx.append_dialect_registry(&registry);
    ctx.enter_multi_threaded_execution();
    ctx.load_dialect_by_name(&name("late"));
}

#[test]
#[should_panic(expected = "while in a multi-threaded execution context")]
fn no_kind_registration_during_parallel_execution() {
    use corion::{builtin::types::IntegerType, r#type::Type};

    let mut ctx = Context::new();
    let mut dialect = Dialect::new(name("builtin"), TypeID::get::<TestDialect>());
    ctx.enter_multi_threaded_execution();
    IntegerType::register_type_in_dialect(&mut ctx, &mut dialect);
}

#[test]
fn multithreading_toggle() {
    let mut ctx = Context::new();
    if std::env::var("CORION_DISABLE_MULTITHREADING").is_ok() {
        // The kill switch wins over enable_multithreading.
        ctx.enable_multithreading();
        assert!(!ctx.is_multithreading_enabled());
        return;
    }
    assert!(ctx.thread_pool().is_none());
    ctx.enable_multithreading();
    assert!(ctx.is_multithreading_enabled());
    assert!(ctx.thread_pool().is_some());

    ctx.enter_multi_threaded_execution();
    ctx.exit_multi_threaded_execution();

    ctx.disable_multithreading();
    assert!(!ctx.is_multithreading_enabled());
    assert!(ctx.thread_pool().is_none());
}
