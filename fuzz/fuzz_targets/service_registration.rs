#![no_main]

use libfuzzer_sys::fuzz_target;
use proxy_di::{ContainerConfig, Descriptor, DuplicatePolicy, Resolver, ServiceCollection};
use std::sync::Arc;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fuzz_target!(|data: &[u8]| {
    let Some((&policy, ops)) = data.split_first() else {
        return;
    };
    let policy = match policy % 3 {
        0 => DuplicatePolicy::FirstWins,
        1 => DuplicatePolicy::Replace,
        _ => DuplicatePolicy::Reject,
    };

    let mut services = ServiceCollection::new();
    services.with_config(ContainerConfig::default().with_sweep_interval(None).with_duplicate_policy(policy));

    // Expected winner per name slot (index 4 is the unnamed slot).
    let mut expected: [Option<u8>; 5] = [None; 5];
    for &op in ops.iter().take(64) {
        let slot = (op % 5) as usize;
        let name = NAMES.get(slot).copied();
        let result = services.register(Descriptor::instance::<u8>(name, Arc::new(op)));
        match (policy, expected[slot]) {
            (_, None) => {
                assert!(result.is_ok());
                expected[slot] = Some(op);
            }
            (DuplicatePolicy::Reject, Some(_)) => assert!(result.is_err()),
            (DuplicatePolicy::Replace, Some(_)) => {
                assert!(result.is_ok());
                expected[slot] = Some(op);
            }
            (DuplicatePolicy::FirstWins, Some(_)) => assert!(result.is_ok()),
        }
    }

    let provider = services.build();
    for (slot, expected) in expected.iter().enumerate() {
        let resolved = match NAMES.get(slot) {
            Some(name) => provider.resolve_named::<u8>(name),
            None => provider.resolve::<u8>(),
        }
        .expect("instances never fail");
        assert_eq!(resolved.map(|v| *v), *expected);
    }
});
