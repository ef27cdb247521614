//! Conformance test fixture runner
//!
//! Loads YAML fixtures (a rule-set config plus input trees and the fields
//! they must classify to) and runs them against the agentwalk engine.

use crate::NodeSpec;
use agentwalk::{RuleError, RuleSetConfig};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A complete test fixture.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    pub description: String,
    pub config: RuleSetConfig,
    /// When set, building the rule set must fail with an error whose message
    /// contains this text. `cases` is then ignored.
    #[serde(default)]
    pub build_error: Option<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// Test case: one input tree and every field it must produce.
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub tree: NodeSpec,
    /// Field → value. Fields not listed must not be set.
    #[serde(default)]
    pub expect: BTreeMap<String, String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case.
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: BTreeMap<String, String>,
    pub actual: BTreeMap<String, String>,
}

impl Fixture {
    /// Parse a fixture from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators.
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Build the rule set and run every case.
    ///
    /// # Errors
    ///
    /// The build error, if the rule set does not compile.
    pub fn run(&self) -> Result<Vec<CaseResult>, RuleError> {
        let rules = self.config.clone().build()?;
        let trees: Vec<_> = self.cases.iter().map(|case| case.tree.build()).collect();
        let mut state = rules.new_state();

        Ok(self
            .cases
            .iter()
            .zip(&trees)
            .map(|(case, tree)| {
                let fields = rules.classify_with(tree, &mut state);
                let actual: BTreeMap<String, String> = fields
                    .iter()
                    .map(|(field, value)| (field.to_owned(), value.value.clone()))
                    .collect();
                CaseResult {
                    case_name: case.name.clone(),
                    passed: actual == case.expect,
                    expected: case.expect.clone(),
                    actual,
                }
            })
            .collect())
    }

    /// Run the fixture and panic on the first failure.
    pub fn run_and_assert(&self) {
        let results = match (self.run(), &self.build_error) {
            (Err(err), Some(expected)) => {
                assert!(
                    err.to_string().contains(expected.as_str()),
                    "Fixture '{}' failed with '{err}', expected an error containing '{expected}'",
                    self.name
                );
                return;
            }
            (Ok(_), Some(expected)) => {
                panic!(
                    "Fixture '{}' built, expected an error containing '{expected}'",
                    self.name
                )
            }
            (Err(err), None) => panic!("Fixture '{}' failed to build: {err}", self.name),
            (Ok(results), None) => results,
        };
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?}, got {:?}",
                self.name, result.case_name, result.expected, result.actual
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: single
description: one rule, two cases
config:
  rules:
    - name: chrome
      extract: { field: AgentName, confidence: 1, expression: 'agent.(0-3)product.(0)name="Chrome"' }
cases:
  - name: hit
    tree:
      value: Chrome/99
      children:
        - kind: product
          value: Chrome/99
          children:
            - { kind: name, value: Chrome }
    expect:
      AgentName: Chrome
  - name: miss
    tree:
      value: Firefox/1
      children:
        - kind: product
          value: Firefox/1
          children:
            - { kind: name, value: Firefox }
"#;

    #[test]
    fn parses_and_runs() {
        let fixture = Fixture::from_yaml(YAML).unwrap();
        assert_eq!(fixture.cases.len(), 2);
        let results = fixture.run().unwrap();
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert!(results[1].actual.is_empty());
    }

    #[test]
    fn multi_document() {
        let fixtures = Fixture::from_yaml_multi(&format!("{YAML}\n---\n{YAML}")).unwrap();
        assert_eq!(fixtures.len(), 2);
    }

    #[test]
    fn expected_build_error() {
        let fixture = Fixture::from_yaml(
            r#"
name: broken
description: unknown table
build_error: unknown lookup table
config:
  rules:
    - name: r
      extract: { field: F, confidence: 1, expression: 'LookUp[Missing;agent]' }
"#,
        )
        .unwrap();
        assert!(fixture.run().is_err());
        fixture.run_and_assert();
    }
}
