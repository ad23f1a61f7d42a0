//! Property tests for class resolution and method lookup.

use proptest::prelude::*;
use rdispatch::{
    BaseType, ClassResolver, ClassVector, DispatchEngine, DispatchScope, Group, ScopeId,
    ScopeRegistry, Value,
};

fn class_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn class_vector() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(class_name(), 1..6)
}

fn base_type() -> impl Strategy<Value = BaseType> {
    prop_oneof![
        Just(BaseType::Logical),
        Just(BaseType::Integer),
        Just(BaseType::Double),
        Just(BaseType::Character),
        Just(BaseType::List),
        Just(BaseType::Closure),
    ]
}

proptest! {
    #[test]
    fn explicit_class_is_returned_verbatim(classes in class_vector(), base in base_type()) {
        let value = Value::new(base).with_class(classes.clone());
        let resolved = ClassResolver::resolve(&value);
        prop_assert_eq!(resolved.as_slice(), classes.as_slice());
    }

    #[test]
    fn resolve_is_idempotent(
        classes in class_vector(),
        defined in prop::collection::vec(any::<bool>(), 6),
        with_default in any::<bool>(),
        with_group in any::<bool>(),
    ) {
        let mut registry = ScopeRegistry::new();
        for (class, define) in classes.iter().zip(&defined) {
            if *define {
                registry.define(ScopeId::GLOBAL, format!("area.{class}"), ());
            } else if with_group {
                registry.define(ScopeId::GLOBAL, format!("Math.{class}"), ());
            }
        }
        if with_default {
            registry.define(ScopeId::GLOBAL, "area.default", ());
        }

        let engine = DispatchEngine::new(&registry);
        let cv = ClassVector::new(classes.iter().cloned()).unwrap();
        let group = with_group.then_some(Group::Math);
        let scope = DispatchScope::new(ScopeId::GLOBAL);

        let first = engine.resolve("area", &cv, group, &scope).unwrap();
        let second = engine.resolve("area", &cv, group, &scope).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn remaining_is_suffix_after_match(classes in class_vector(), pick in 0usize..6) {
        let pick = pick % classes.len();
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, format!("area.{}", classes[pick]), ());

        let engine = DispatchEngine::new(&registry);
        let cv = ClassVector::new(classes.iter().cloned()).unwrap();
        let result = engine
            .resolve("area", &cv, None, &DispatchScope::new(ScopeId::GLOBAL))
            .unwrap();
        let found = result.into_match().unwrap();

        // The first occurrence of the picked class wins.
        let index = classes.iter().position(|c| *c == classes[pick]).unwrap();
        prop_assert_eq!(found.matched_at_head, index == 0);
        if index + 1 == classes.len() {
            prop_assert!(found.remaining.is_default_sentinel());
        } else {
            prop_assert_eq!(found.remaining.as_slice(), &classes[index + 1..]);
        }
        prop_assert_eq!(found.remaining.previous(), Some(&cv));
    }
}
