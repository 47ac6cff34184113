//! Constraint closure: given constraints on some nodes' values, compute the
//! extended set of constraints induced on every other node by the network's
//! structure, so that a subsequent consistent-sample search never wastes
//! backtracking on combinations already known to be unreachable.
//!
//! Ported from the reference implementation's `undeeper` /
//! `filter_by_last_level_keys` / `array_zip` / `array_intersection`.

use super::graph::BayesianNetwork;
use super::node::ConditionalProbabilities;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
  #[error("no possible values were supplied for constrained node {0:?}")]
  EmptyConstraint(String),

  #[error("the current constraints are too restrictive: no possible values remain for node {0:?}")]
  TooRestrictive(String),
}

/// A conditional probability table with the `deeper`/`skip` structure
/// collapsed away: branches merge every parent-value's subtree into one,
/// since closure computation doesn't know which parent value will hold.
enum Flat {
  Branch(HashMap<String, Flat>),
  Leaf(f64),
}

fn flatten(cp: &ConditionalProbabilities) -> HashMap<String, Flat> {
  let mut result = HashMap::new();

  if let Some(deeper) = &cp.deeper {
    for (parent_value, sub) in deeper {
      result.insert(parent_value.clone(), Flat::Branch(flatten(sub)));
    }
  }

  for (value, probability) in &cp.probabilities {
    result.insert(value.clone(), Flat::Leaf(*probability));
  }

  result
}

/// DFS over the flattened tree, collecting the set of values seen at each
/// depth along every path whose leaf key is one of `valid_keys`.
fn collect_union_paths(tree: &HashMap<String, Flat>, valid_keys: &[String]) -> Vec<Vec<String>> {
  let mut out: Vec<Vec<String>> = Vec::new();
  let mut acc: Vec<String> = Vec::new();
  recurse(tree, valid_keys, &mut acc, &mut out);
  out
}

fn recurse(
  tree: &HashMap<String, Flat>,
  valid_keys: &[String],
  acc: &mut Vec<String>,
  out: &mut Vec<Vec<String>>,
) {
  for (key, value) in tree {
    match value {
      Flat::Leaf(_) => {
        if valid_keys.iter().any(|k| k == key) {
          zip_union(out, acc);
        }
      }
      Flat::Branch(sub) => {
        acc.push(key.clone());
        recurse(sub, valid_keys, acc, out);
        acc.pop();
      }
    }
  }
}

/// Merges `acc` into `out` position-by-position as a set union, matching
/// the reference's `array_zip`. The first accepted path seeds `out`.
fn zip_union(out: &mut Vec<Vec<String>>, acc: &[String]) {
  if out.is_empty() {
    *out = acc.iter().map(|a| vec![a.clone()]).collect();
    return;
  }

  let len = out.len().min(acc.len());
  out.truncate(len);
  for (o, a) in out.iter_mut().zip(acc.iter()) {
    if !o.contains(a) {
      o.push(a.clone());
    }
  }
}

fn array_intersection(a: &[String], b: &[String]) -> Vec<String> {
  a.iter().filter(|x| b.contains(x)).cloned().collect()
}

/// Given a set of user constraints on some nodes, returns the extended set
/// of constraints induced by the network's structure: for every constrained
/// node, the possible values of its ancestors are narrowed to only those
/// that could have produced an allowed value.
pub fn compute_allowed_values(
  network: &BayesianNetwork,
  constraints: &HashMap<String, Vec<String>>,
) -> Result<HashMap<String, Vec<String>>, ClosureError> {
  let mut sets: Vec<HashMap<String, Vec<String>>> = Vec::new();

  for (key, value) in constraints {
    if value.is_empty() {
      return Err(ClosureError::EmptyConstraint(key.clone()));
    }

    let Some(node) = network.get_node(key) else {
      continue;
    };

    let tree = flatten(node.conditional_probabilities());
    let zipped = collect_union_paths(&tree, value);

    let mut set: HashMap<String, Vec<String>> = node
      .parent_names()
      .iter()
      .cloned()
      .zip(zipped)
      .collect();
    set.insert(key.clone(), value.clone());
    sets.push(set);
  }

  let mut result: HashMap<String, Vec<String>> = HashMap::new();
  for set in sets {
    for (key, values) in set {
      use std::collections::hash_map::Entry;
      match result.entry(key) {
        Entry::Occupied(mut entry) => {
          let intersected = array_intersection(&values, entry.get());
          if intersected.is_empty() {
            return Err(ClosureError::TooRestrictive(entry.key().clone()));
          }
          entry.insert(intersected);
        }
        Entry::Vacant(entry) => {
          entry.insert(values);
        }
      }
    }
  }

  Ok(result)
}
