//! Benchmark: ACL resolution cost
//!
//! Every dispatcher request resolves an ACL and runs at least one check.
//! This measures the resolver walk and `has_permission` as the ownership
//! chain deepens and the rule list grows.
//!
//! # When to revisit
//!
//! - If rule lists grow past a few thousand entries (index by subject)
//! - If ownership chains routinely exceed ten levels

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use warden_auth::permission::{ADMINISTER, MANAGE, MANAGE_FLAG, READ};
use warden_auth::{AclResolver, FeatureFlags, PermissionRegistry, ProjectMatrixStrategy, Subject};
use warden_types::{Identity, ObjectPath, Scope};

fn registry() -> Arc<PermissionRegistry> {
    Arc::new(
        PermissionRegistry::with_builtins(FeatureFlags::new().with(MANAGE_FLAG))
            .expect("builtins should register"),
    )
}

fn resolver_with_depth(depth: usize) -> (AclResolver, ObjectPath) {
    let registry = registry();
    let root = ProjectMatrixStrategy::new(Arc::clone(&registry));
    root.grant(Subject::user("admin"), [ADMINISTER], Scope::Global);
    let resolver = AclResolver::new(Arc::new(root));

    let mut path = ObjectPath::root();
    for level in 0..depth {
        let child = path.child(&format!("n{level}"));
        let local = ProjectMatrixStrategy::new(Arc::clone(&registry));
        local.grant(Subject::user(format!("u{level}")), [READ], Scope::Global);
        resolver
            .register_object(child.clone(), path.clone(), Some(Arc::new(local)))
            .expect("register should succeed");
        path = child;
    }
    (resolver, path)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("acl_resolve");
    let admin = Identity::user("admin");

    for depth in [0usize, 3, 10] {
        let (resolver, leaf) = resolver_with_depth(depth);
        group.bench_with_input(BenchmarkId::new("resolve+check", depth), &depth, |b, _| {
            b.iter(|| {
                let acl = resolver.acl(black_box(&leaf));
                black_box(acl.has_permission(&admin, &MANAGE))
            });
        });
    }

    group.finish();
}

fn bench_rule_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("acl_rules");
    let registry = registry();
    let probe = Identity::user("probe").with_group("g7");

    for rules in [10usize, 100, 1000] {
        let strategy = ProjectMatrixStrategy::new(Arc::clone(&registry));
        for i in 0..rules {
            strategy.grant(Subject::group(format!("g{i}")), [READ], Scope::Global);
        }
        let resolver = AclResolver::new(Arc::new(strategy));
        let acl = resolver.acl(&ObjectPath::root());
        group.bench_with_input(BenchmarkId::new("has_permission", rules), &rules, |b, _| {
            b.iter(|| black_box(acl.has_permission(black_box(&probe), &READ)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_rule_count);
criterion_main!(benches);
