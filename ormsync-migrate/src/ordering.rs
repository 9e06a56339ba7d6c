//! Apply-order strategies.
//!
//! Django migrations form a dependency graph across apps, so their order is
//! a topological sort. Prisma migration directories are timestamp-prefixed
//! and apply in lexical order of their names. Neither strategy ever looks at
//! file modification times.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::error::{MigrateResult, MigrationError};
use crate::migration::Migration;

/// Puts a set of migrations in apply order.
pub trait OrderingStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Order `migrations`; the output is a permutation of the input.
    fn order(&self, migrations: Vec<Migration>) -> MigrateResult<Vec<Migration>>;
}

/// Sort by `sequence_key`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOrdering;

impl OrderingStrategy for LexicalOrdering {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn order(&self, mut migrations: Vec<Migration>) -> MigrateResult<Vec<Migration>> {
        migrations.sort_by(|a, b| {
            a.sequence_key
                .cmp(&b.sequence_key)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(migrations)
    }
}

/// Kahn's algorithm over declared dependencies plus the per-app sequence.
///
/// Among migrations that are ready at the same time, the smallest
/// `(app, sequence_key)` goes first, so the result is deterministic.
/// Dependencies on migrations outside the set are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalOrdering {
    strict: bool,
}

impl TopologicalOrdering {
    /// Fail with [`MigrationError::DependencyCycle`] instead of appending
    /// cycle members at the end.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl OrderingStrategy for TopologicalOrdering {
    fn name(&self) -> &'static str {
        "topological"
    }

    fn order(&self, migrations: Vec<Migration>) -> MigrateResult<Vec<Migration>> {
        let index: HashMap<&str, usize> = migrations
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.as_str(), i))
            .collect();

        // prerequisites[i] = migrations that must come before i
        let mut prerequisites: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); migrations.len()];
        for (i, migration) in migrations.iter().enumerate() {
            for dep in &migration.depends_on {
                if let Some(&j) = index.get(dep.as_str()) {
                    if j != i {
                        prerequisites[i].insert(j);
                    }
                }
            }
        }

        let mut by_app: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, migration) in migrations.iter().enumerate() {
            by_app.entry(migration.sort_key().0).or_default().push(i);
        }
        for members in by_app.values_mut() {
            members.sort_by(|&a, &b| migrations[a].sequence_key.cmp(&migrations[b].sequence_key));
            for pair in members.windows(2) {
                prerequisites[pair[1]].insert(pair[0]);
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); migrations.len()];
        let mut in_degree: Vec<usize> = vec![0; migrations.len()];
        for (i, prereqs) in prerequisites.iter().enumerate() {
            in_degree[i] = prereqs.len();
            for &j in prereqs {
                dependents[j].push(i);
            }
        }

        let key = |i: usize| {
            let (app, seq) = migrations[i].sort_key();
            (app, seq, i)
        };

        let mut ready: BTreeSet<(&str, &str, usize)> = (0..migrations.len())
            .filter(|&i| in_degree[i] == 0)
            .map(key)
            .collect();
        let mut order = Vec::with_capacity(migrations.len());

        while let Some(next) = ready.pop_first() {
            let i = next.2;
            order.push(i);
            for &d in &dependents[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    ready.insert(key(d));
                }
            }
        }

        if order.len() < migrations.len() {
            let mut cyclic: Vec<usize> = (0..migrations.len())
                .filter(|&i| in_degree[i] > 0)
                .collect();
            cyclic.sort_by_key(|&i| key(i));
            let ids: Vec<String> = cyclic.iter().map(|&i| migrations[i].id.clone()).collect();

            if self.strict {
                return Err(MigrationError::DependencyCycle(ids));
            }
            warn!(migrations = ?ids, "dependency cycle, appending in key order");
            order.extend(cyclic);
        }

        let mut slots: Vec<Option<Migration>> = migrations.into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn django(app: &str, name: &str, deps: &[&str]) -> Migration {
        let mut m = Migration::new(format!("{app}.{name}"), name, format!("{app}/migrations/{name}.py"))
            .with_app(app);
        for dep in deps {
            m = m.depends_on(*dep);
        }
        m
    }

    fn ids(migrations: &[Migration]) -> Vec<&str> {
        migrations.iter().map(|m| m.id.as_str()).collect()
    }

    fn assert_valid_order(ordered: &[Migration]) {
        for (pos, m) in ordered.iter().enumerate() {
            for dep in &m.depends_on {
                if let Some(dep_pos) = ordered.iter().position(|o| &o.id == dep) {
                    assert!(dep_pos < pos, "{dep} must precede {}", m.id);
                }
            }
        }
    }

    #[test]
    fn test_lexical_uses_name_not_time() {
        let input = vec![
            Migration::new("20240101_init", "20240101_init", "a"),
            Migration::new("20231215_seed", "20231215_seed", "b"),
        ];
        let ordered = LexicalOrdering.order(input).unwrap();
        assert_eq!(ids(&ordered), vec!["20231215_seed", "20240101_init"]);
    }

    #[test]
    fn test_cross_app_dependency_beats_alphabetical() {
        // alphabetical by id would put accounts first
        let input = vec![
            django("accounts", "0001_initial", &["core.0002_profile"]),
            django("core", "0001_initial", &[]),
            django("core", "0002_profile", &["core.0001_initial"]),
        ];
        let ordered = TopologicalOrdering::default().order(input).unwrap();

        assert_eq!(
            ids(&ordered),
            vec!["core.0001_initial", "core.0002_profile", "accounts.0001_initial"]
        );
        assert_valid_order(&ordered);
    }

    #[test]
    fn test_implicit_app_sequence() {
        let input = vec![
            django("shop", "0002_add_total", &[]),
            django("shop", "0001_initial", &[]),
        ];
        let ordered = TopologicalOrdering::default().order(input).unwrap();
        assert_eq!(ids(&ordered), vec!["shop.0001_initial", "shop.0002_add_total"]);
    }

    #[test]
    fn test_external_dependencies_ignored() {
        let input = vec![django("shop", "0001_initial", &["auth.0012_alter_user"])];
        let ordered = TopologicalOrdering::default().order(input).unwrap();
        assert_eq!(ids(&ordered), vec!["shop.0001_initial"]);
    }

    #[test]
    fn test_deterministic_tie_break() {
        let make = || {
            vec![
                django("b", "0001_initial", &[]),
                django("c", "0001_initial", &[]),
                django("a", "0001_initial", &[]),
            ]
        };
        let first = TopologicalOrdering::default().order(make()).unwrap();
        let mut reversed = make();
        reversed.reverse();
        let second = TopologicalOrdering::default().order(reversed).unwrap();

        assert_eq!(ids(&first), vec!["a.0001_initial", "b.0001_initial", "c.0001_initial"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cycle_appended_or_rejected() {
        let make = || {
            vec![
                django("a", "0001_initial", &["b.0001_initial"]),
                django("b", "0001_initial", &["a.0001_initial"]),
                django("c", "0001_initial", &[]),
            ]
        };

        let ordered = TopologicalOrdering::default().order(make()).unwrap();
        assert_eq!(
            ids(&ordered),
            vec!["c.0001_initial", "a.0001_initial", "b.0001_initial"]
        );

        let err = TopologicalOrdering::strict().order(make()).unwrap_err();
        assert!(matches!(err, MigrationError::DependencyCycle(ids) if ids.len() == 2));
    }
}
