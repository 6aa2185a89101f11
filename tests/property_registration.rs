use crucible_di::{Lifetime, Resolver, ServiceCollection};
use proptest::prelude::*;

proptest! {
    /// Collection resolution preserves registration order for any
    /// sequence of registrations, and single resolution always takes the
    /// most recent one.
    #[test]
    fn registration_order_is_preserved(values in proptest::collection::vec(0u32..1000, 1..8)) {
        let mut sc = ServiceCollection::new();
        for v in &values {
            sc.register_instance(*v);
        }

        let sp = sc.build().unwrap();

        let all: Vec<u32> = sp.get_all::<u32>().unwrap().iter().map(|v| **v).collect();
        prop_assert_eq!(&all, &values);

        let single = *sp.get::<u32>().unwrap();
        prop_assert_eq!(single, *values.last().unwrap());
    }

    /// Named and unnamed registrations of the same type never collide.
    #[test]
    fn named_keys_are_isolated(unnamed in 0u32..1000, named in 0u32..1000) {
        let mut sc = ServiceCollection::new();
        sc.register_instance(unnamed);
        sc.register_named_instance("keyed", named);

        let sp = sc.build().unwrap();
        prop_assert_eq!(*sp.get::<u32>().unwrap(), unnamed);
        prop_assert_eq!(*sp.get_named::<u32>("keyed").unwrap(), named);
    }

    /// Transient factories yield as many distinct instances as calls.
    #[test]
    fn transient_instances_are_distinct(calls in 1usize..16) {
        use std::sync::{Arc, Mutex};

        let counter = Arc::new(Mutex::new(0u64));
        let seq = counter.clone();

        let mut sc = ServiceCollection::new();
        sc.register_factory(Lifetime::Transient, move |_| {
            let mut n = seq.lock().unwrap();
            *n += 1;
            *n
        });

        let sp = sc.build().unwrap();
        let mut seen = Vec::new();
        for _ in 0..calls {
            seen.push(*sp.get::<u64>().unwrap());
        }
        seen.dedup();
        prop_assert_eq!(seen.len(), calls);
        prop_assert_eq!(*counter.lock().unwrap() as usize, calls);
    }
}
