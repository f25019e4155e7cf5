#![no_main]

use libfuzzer_sys::fuzz_target;
use proxy_di::{ContainerConfig, DiError, Lifetime, Resolver, ServiceCollection};
use std::sync::Arc;

const NODES: [&str; 8] = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"];

// Each byte pair declares one node: its lifetime and the node it depends on
// (or none). Arbitrary graphs must resolve or fail with a cycle, never hang.
fuzz_target!(|data: &[u8]| {
    let mut services = ServiceCollection::new();
    services.with_config(ContainerConfig::default().with_sweep_interval(None).with_max_depth(16));

    for (index, pair) in data.chunks_exact(2).take(NODES.len()).enumerate() {
        let lifetime = match pair[0] % 3 {
            0 => Lifetime::Singleton,
            1 => Lifetime::Scoped,
            _ => Lifetime::Transient,
        };
        let dependency = NODES.get(pair[1] as usize % (NODES.len() + 2)).copied();
        services.add_named_factory::<usize, _>(NODES[index], lifetime, move |r| match dependency {
            Some(name) => Ok(Arc::new(r.resolve_named::<usize>(name)?.map_or(0, |d| *d + 1))),
            None => Ok(Arc::new(index)),
        });
    }

    let provider = services.build();
    let scope = provider.create_scope();
    for name in NODES {
        for result in [provider.resolve_named::<usize>(name), scope.resolve_named::<usize>(name)] {
            match result {
                Ok(_) | Err(DiError::Circular(_)) | Err(DiError::DepthExceeded(_)) => {}
                Err(other) => panic!("unexpected error for {}: {}", name, other),
            }
        }
    }
});
