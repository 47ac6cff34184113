//! A Bayesian network capable of unconstrained ancestral sampling and
//! constrained, backtracking-consistent sampling.

use super::loader::{self, LoaderError};
use super::node::BayesianNode;
use rand::RngCore;
use std::collections::HashMap;

/// A node-name -> value assignment produced by sampling.
pub type Assignment = HashMap<String, String>;

/// A Bayesian network loaded from a trained network definition.
pub struct BayesianNetwork {
  nodes_in_sampling_order: Vec<BayesianNode>,
  nodes_by_name: HashMap<String, usize>,
}

impl BayesianNetwork {
  /// Loads a network from bytes (zip-packaged or plain JSON, auto-detected).
  pub fn load(bytes: &[u8]) -> Result<Self, LoaderError> {
    let definition = loader::load_network_definition(bytes)?;

    let mut nodes_in_sampling_order = Vec::with_capacity(definition.nodes.len());
    let mut nodes_by_name = HashMap::with_capacity(definition.nodes.len());

    for (i, node_def) in definition.nodes.into_iter().enumerate() {
      nodes_by_name.insert(node_def.name.clone(), i);
      nodes_in_sampling_order.push(BayesianNode::new(node_def));
    }

    Ok(Self {
      nodes_in_sampling_order,
      nodes_by_name,
    })
  }

  pub fn get_node(&self, name: &str) -> Option<&BayesianNode> {
    self
      .nodes_by_name
      .get(name)
      .map(|&i| &self.nodes_in_sampling_order[i])
  }

  pub fn get_possible_values(&self, name: &str) -> Option<&[String]> {
    self.get_node(name).map(|node| node.possible_values())
  }

  pub fn nodes_in_sampling_order(&self) -> &[BayesianNode] {
    &self.nodes_in_sampling_order
  }

  /// Samples every node not already present in `input_values`, in
  /// topological order, so that each node's parents are always already
  /// assigned by the time it is sampled.
  pub fn generate_sample(&self, input_values: &Assignment, rng: &mut dyn RngCore) -> Assignment {
    let mut sample = input_values.clone();

    for node in &self.nodes_in_sampling_order {
      if !sample.contains_key(node.name()) {
        let value = node.sample(&sample, rng);
        sample.insert(node.name().to_string(), value);
      }
    }

    sample
  }

  /// Samples a full assignment consistent with `value_possibilities`,
  /// backtracking when an earlier choice leaves a later node with no
  /// reachable value. Returns `None` if no such assignment exists.
  pub fn generate_consistent_sample_when_possible(
    &self,
    value_possibilities: &HashMap<String, Vec<String>>,
    rng: &mut dyn RngCore,
  ) -> Option<Assignment> {
    self.recursively_generate_consistent_sample(HashMap::new(), value_possibilities, 0, rng)
  }

  fn recursively_generate_consistent_sample(
    &self,
    sample_so_far: Assignment,
    value_possibilities: &HashMap<String, Vec<String>>,
    depth: usize,
    rng: &mut dyn RngCore,
  ) -> Option<Assignment> {
    if depth >= self.nodes_in_sampling_order.len() {
      return Some(sample_so_far);
    }

    let node = &self.nodes_in_sampling_order[depth];
    let mut banned_values: Vec<String> = Vec::new();
    let mut sample_so_far = sample_so_far;

    loop {
      let sample_value = node.sample_according_to_restrictions(
        &sample_so_far,
        value_possibilities.get(node.name()).map(|v| v.as_slice()),
        &banned_values,
        rng,
      );

      let Some(value) = sample_value else {
        break;
      };

      sample_so_far.insert(node.name().to_string(), value.clone());

      if let Some(complete_sample) = self.recursively_generate_consistent_sample(
        sample_so_far.clone(),
        value_possibilities,
        depth + 1,
        rng,
      ) {
        return Some(complete_sample);
      }

      sample_so_far.remove(node.name());
      banned_values.push(value);
    }

    None
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::node::{BayesianNode as Node, ConditionalProbabilities, NodeDefinition};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn leaf(name: &str, values: &[(&str, f64)]) -> Node {
    let mut probs = HashMap::new();
    for (v, p) in values {
      probs.insert(v.to_string(), *p);
    }
    Node::new(NodeDefinition {
      name: name.to_string(),
      parent_names: vec![],
      possible_values: values.iter().map(|(v, _)| v.to_string()).collect(),
      conditional_probabilities: ConditionalProbabilities {
        deeper: None,
        skip: None,
        probabilities: probs,
      },
    })
  }

  fn os_conditioned_browser(name: &str) -> Node {
    // browser depends on os: windows -> {chrome: 1.0}, macos -> {safari: 1.0}
    let mut windows_probs = HashMap::new();
    windows_probs.insert("chrome".to_string(), 1.0);
    let mut macos_probs = HashMap::new();
    macos_probs.insert("safari".to_string(), 1.0);

    let mut deeper = HashMap::new();
    deeper.insert(
      "windows".to_string(),
      ConditionalProbabilities {
        deeper: None,
        skip: None,
        probabilities: windows_probs,
      },
    );
    deeper.insert(
      "macos".to_string(),
      ConditionalProbabilities {
        deeper: None,
        skip: None,
        probabilities: macos_probs,
      },
    );

    Node::new(NodeDefinition {
      name: name.to_string(),
      parent_names: vec!["os".to_string()],
      possible_values: vec!["chrome".to_string(), "safari".to_string()],
      conditional_probabilities: ConditionalProbabilities {
        deeper: Some(deeper),
        skip: None,
        probabilities: HashMap::new(),
      },
    })
  }

  fn build_network(nodes: Vec<Node>) -> BayesianNetwork {
    tests_support::build(nodes)
  }

  #[test]
  fn ancestral_sample_respects_topological_order() {
    let network = build_network(vec![
      leaf("os", &[("windows", 1.0)]),
      os_conditioned_browser("browser"),
    ]);
    let mut rng = StdRng::seed_from_u64(1);
    let sample = network.generate_sample(&HashMap::new(), &mut rng);

    assert_eq!(sample.get("os"), Some(&"windows".to_string()));
    assert_eq!(sample.get("browser"), Some(&"chrome".to_string()));
  }

  #[test]
  fn consistent_sample_respects_constraints() {
    let network = build_network(vec![
      leaf("os", &[("windows", 0.5), ("macos", 0.5)]),
      os_conditioned_browser("browser"),
    ]);
    let mut rng = StdRng::seed_from_u64(2);

    let mut constraints = HashMap::new();
    constraints.insert("browser".to_string(), vec!["safari".to_string()]);

    let sample = network
      .generate_consistent_sample_when_possible(&constraints, &mut rng)
      .expect("a consistent sample should exist");

    assert_eq!(sample.get("browser"), Some(&"safari".to_string()));
    assert_eq!(sample.get("os"), Some(&"macos".to_string()));
  }

  #[test]
  fn consistent_sample_backtracks_past_an_infeasible_first_choice() {
    // browser is constrained to chrome, which is only reachable via os=windows;
    // the sampler must reject an initial os=macos choice and retry with windows.
    let network = build_network(vec![
      leaf("os", &[("macos", 0.99), ("windows", 0.01)]),
      os_conditioned_browser("browser"),
    ]);
    let mut rng = StdRng::seed_from_u64(5);

    let mut constraints = HashMap::new();
    constraints.insert("browser".to_string(), vec!["chrome".to_string()]);

    let sample = network
      .generate_consistent_sample_when_possible(&constraints, &mut rng)
      .expect("backtracking should find the windows/chrome combination");

    assert_eq!(sample.get("os"), Some(&"windows".to_string()));
    assert_eq!(sample.get("browser"), Some(&"chrome".to_string()));
  }

  #[test]
  fn consistent_sample_returns_none_when_truly_impossible() {
    let network = build_network(vec![
      leaf("os", &[("windows", 1.0)]),
      os_conditioned_browser("browser"),
    ]);
    let mut rng = StdRng::seed_from_u64(3);

    let mut constraints = HashMap::new();
    constraints.insert("browser".to_string(), vec!["safari".to_string()]);

    assert!(network
      .generate_consistent_sample_when_possible(&constraints, &mut rng)
      .is_none());
  }

  #[test]
  fn sampling_is_deterministic_given_the_same_seed() {
    let network = build_network(vec![
      leaf("os", &[("windows", 0.5), ("macos", 0.5)]),
      os_conditioned_browser("browser"),
    ]);

    let mut rng_a = StdRng::seed_from_u64(99);
    let mut rng_b = StdRng::seed_from_u64(99);

    let a = network.generate_sample(&HashMap::new(), &mut rng_a);
    let b = network.generate_sample(&HashMap::new(), &mut rng_b);

    assert_eq!(a, b);
  }
}
