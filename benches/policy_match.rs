use authgate::policy::{Effect, Policies, PolicyItem, WILDCARD};
use authgate::roles::RolesConfig;
use authgate::{Principal, RoleSet};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;

/// Rule list where the catch-all sits behind `rules` specific entries
fn create_policies(rules: usize) -> Policies {
    let mut items: Vec<PolicyItem> = (0..rules)
        .map(|i| {
            PolicyItem::new(
                format!("rule_{}", i),
                "GET",
                format!("/api/v1/resource_{}", i),
                Effect::Allow,
                RoleSet::from_roles([format!("role_{}", i % 16)]),
            )
        })
        .collect();
    items.push(PolicyItem::new(
        "deny_all",
        WILDCARD,
        WILDCARD,
        Effect::Deny,
        RoleSet::everyone(),
    ));
    Policies::new(items)
}

fn principal() -> Principal {
    let mut principal = Principal::new("bench");
    principal.login = "bench@example.com".to_string();
    principal.roles = RoleSet::from_roles(["role_3", "role_7"]);
    principal
}

/// Benchmark first-match evaluation as the rule list grows
fn bench_match_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_match");

    for rules in [10, 100, 1_000] {
        group.throughput(Throughput::Elements(1));

        group.bench_with_input(BenchmarkId::new("last_rule", rules), &rules, |b, &rules| {
            let policies = create_policies(rules);
            let principal = principal();
            b.iter(|| {
                let item = policies.match_request(&principal, "POST", "/api/v1/other");
                black_box(item.is_ok());
            });
        });

        group.bench_with_input(BenchmarkId::new("early_rule", rules), &rules, |b, &rules| {
            let policies = create_policies(rules);
            let principal = principal();
            b.iter(|| {
                let item = policies.match_request(&principal, "GET", "/api/v1/resource_3");
                black_box(item.is_ok());
            });
        });
    }

    group.finish();
}

/// Benchmark role derivation from groups
fn bench_derive_roles(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_roles");

    for roles in [8, 64, 512] {
        let mut definitions = HashMap::new();
        for i in 0..roles {
            definitions.insert(
                format!("role_{}", i),
                RoleSet::from_roles([format!("group_{}", i), format!("group_{}", i + 1)]),
            );
        }
        let config = RolesConfig {
            admin_roles: RoleSet::from_roles(["role_0"]),
            super_admin_roles: RoleSet::new(),
            definitions,
        };
        let groups: Vec<String> = (0..8).map(|i| format!("group_{}", i * 3)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(roles), &roles, |b, _| {
            b.iter(|| black_box(config.derive_roles(&groups)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_match_request, bench_derive_roles);
criterion_main!(benches);
