// src/graph/cycle.rs

//! Cycle detection over the product dependency graph
//!
//! Nodes are product ids; an edge `A -> B` means A's active recipe lists B as
//! an ingredient. Because the stored graph is acyclic before a mutation, a
//! mutation that gives `root` a new child set can only introduce a cycle that
//! passes through `root`. It is therefore enough to ask whether any of the
//! children reaches `root`.

use std::collections::{HashMap, HashSet, VecDeque};

/// Find a path from `root` through one of `children` back to `root`
///
/// Runs a single breadth-first search seeded with every child, so the
/// returned path is a shortest one. The path starts and ends with `root`:
/// `[root, child, ..., root]`.
pub fn find_cycle_path(
    adjacency: &HashMap<String, Vec<String>>,
    root: &str,
    children: &[&str],
) -> Option<Vec<String>> {
    // child -> node it was discovered from
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for &child in children {
        if child == root {
            return Some(vec![root.to_string(), root.to_string()]);
        }
        if visited.insert(child) {
            parent.insert(child, root);
            queue.push_back(child);
        }
    }

    while let Some(node) = queue.pop_front() {
        let Some(next) = adjacency.get(node) else {
            continue;
        };

        for dep in next {
            if dep == root {
                return Some(build_path(&parent, root, node));
            }
            if visited.insert(dep.as_str()) {
                parent.insert(dep.as_str(), node);
                queue.push_back(dep.as_str());
            }
        }
    }

    None
}

fn build_path(parent: &HashMap<&str, &str>, root: &str, last: &str) -> Vec<String> {
    let mut chain = vec![last.to_string()];
    let mut current = last;
    while let Some(&prev) = parent.get(current) {
        if prev == root {
            break;
        }
        chain.push(prev.to_string());
        current = prev;
    }
    chain.reverse();

    let mut path = Vec::with_capacity(chain.len() + 2);
    path.push(root.to_string());
    path.extend(chain);
    path.push(root.to_string());
    path
}
