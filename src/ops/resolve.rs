//! Dependency walk over a repository.
//!
//! Starting from one package, every declared dependency is resolved
//! through `Repository::resolve_dependency` until the closure is complete.
//! The result is a graph whose edges point from a package to its
//! dependencies.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use anyhow::Result;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::core::{Dependency, Package, PackageIdentity, Repository};

/// Errors from walking a dependency closure.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no package satisfies `{dependency}`, required by {dependent}")]
    MissingDependency {
        dependent: PackageIdentity,
        dependency: Dependency,
    },

    #[error("dependency cycle involving {package}")]
    Cycle { package: PackageIdentity },
}

/// A resolved dependency closure.
pub struct Resolution {
    /// Package graph; an edge `a -> b` means `a` depends on `b`
    graph: DiGraph<Package, ()>,

    /// Map from identity to node index
    nodes: HashMap<PackageIdentity, NodeIndex>,

    root: NodeIndex,

    /// Dependencies before dependents
    order: Vec<NodeIndex>,
}

impl Resolution {
    /// Get the package the walk started from.
    pub fn root(&self) -> &Package {
        &self.graph[self.root]
    }

    /// Get the number of packages, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if empty. A resolution always holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Check if an identity is part of the closure.
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.nodes.contains_key(identity)
    }

    /// Get the packages in install order (dependencies before dependents).
    pub fn install_order(&self) -> Vec<Package> {
        self.order.iter().map(|&n| self.graph[n].clone()).collect()
    }

    /// Get the direct dependencies of a package in the closure.
    pub fn dependencies(&self, identity: &PackageIdentity) -> Vec<Package> {
        match self.nodes.get(identity) {
            Some(&node) => self
                .graph
                .neighbors(node)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order: Vec<String> = self
            .order
            .iter()
            .map(|&n| self.graph[n].identity().to_string())
            .collect();
        f.debug_struct("Resolution")
            .field("root", self.root().identity())
            .field("order", &order)
            .finish()
    }
}

/// Walk the dependency closure of `root` through `repo`.
///
/// Each dependency is resolved with the dependent's source as origin, so
/// vertical aggregates keep a package's dependencies on its own source.
pub fn resolve_closure(repo: &dyn Repository, root: Package) -> Result<Resolution> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    let root_identity = root.identity().clone();
    let root_node = graph.add_node(root);
    nodes.insert(root_identity, root_node);

    let mut queue = VecDeque::from([root_node]);
    while let Some(node) = queue.pop_front() {
        let package = graph[node].clone();

        for dep in package.dependencies() {
            let Some(found) = repo.resolve_dependency(dep, package.source())? else {
                return Err(ResolveError::MissingDependency {
                    dependent: package.identity().clone(),
                    dependency: dep.clone(),
                }
                .into());
            };

            let target = match nodes.get(found.identity()) {
                Some(&existing) => existing,
                None => {
                    tracing::debug!("{} requires {}", package.identity(), found.identity());
                    let identity = found.identity().clone();
                    let added = graph.add_node(found);
                    nodes.insert(identity, added);
                    queue.push_back(added);
                    added
                }
            };

            if !graph.contains_edge(node, target) {
                graph.add_edge(node, target, ());
            }
        }
    }

    let mut order = toposort(&graph, None).map_err(|cycle| ResolveError::Cycle {
        package: graph[cycle.node_id()].identity().clone(),
    })?;
    // toposort puts dependents first.
    order.reverse();

    Ok(Resolution {
        graph,
        nodes,
        root: root_node,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pkg, pkg_with_deps, MockRepository};

    fn names(packages: &[Package]) -> Vec<String> {
        packages
            .iter()
            .map(|p| p.identity().display_name())
            .collect()
    }

    #[test]
    fn test_dependencies_first() {
        let repo = MockRepository::new("feed")
            .with_package(pkg_with_deps("B", "1.0", &[("C", "^1.0")]))
            .with_package(pkg("C", "1.0"))
            .with_package(pkg("C", "1.4"))
            .with_package(pkg("C", "2.0"));
        let root = pkg_with_deps("A", "1.0", &[("B", "*"), ("C", "^1.0")]);

        let resolution = resolve_closure(&repo, root).unwrap();
        let order = resolution.install_order();

        assert_eq!(names(&order), vec!["C 1.4.0", "B 1.0.0", "A 1.0.0"]);
        assert_eq!(resolution.len(), 3);
        assert_eq!(resolution.root().id(), "A");
        assert_eq!(
            resolution.dependencies(resolution.root().identity()).len(),
            2
        );
    }

    #[test]
    fn test_no_dependencies() {
        let repo = MockRepository::new("feed");
        let resolution = resolve_closure(&repo, pkg("A", "1.0")).unwrap();
        assert_eq!(names(&resolution.install_order()), vec!["A 1.0.0"]);
    }

    #[test]
    fn test_missing_dependency() {
        let repo = MockRepository::new("feed").with_package(pkg("B", "1.0"));
        let root = pkg_with_deps("A", "1.0", &[("B", ">=2.0")]);

        let err = resolve_closure(&repo, root).unwrap_err();
        match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::MissingDependency { dependent, dependency }) => {
                assert_eq!(dependent.id(), "A");
                assert_eq!(dependency.id(), "B");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_cycle() {
        let repo = MockRepository::new("feed")
            .with_package(pkg_with_deps("A", "1.0", &[("B", "*")]))
            .with_package(pkg_with_deps("B", "1.0", &[("A", "*")]));
        let root = repo.packages()[0].clone();

        let err = resolve_closure(&repo, root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::Cycle { .. })
        ));
    }
}
