//! Declarative firewall-rule documents: loading, format validation and
//! ordered, consume-once drain semantics.
//!
//! A document is JSON with a `rules` key holding an ordered sequence of
//! records. Ordering is significant: a later rule may reference a firewall
//! group an earlier rule implicitly created, so consumers must process
//! rules in declaration order.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// The target of a rule as written in the document: a literal address
/// block or a reference to a named firewall group.
#[derive(Clone, Debug, Deserialize)]
pub struct TargetRecord {
    /// `"cidr"` or `"securityGroup"`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// The literal block text or the referenced group name.
    #[serde(default)]
    pub data: Option<String>,
}

/// One rule record, as written. Fields are optional at this layer; shape
/// validation happens when the rule is realized so a malformed rule can
/// abort the whole batch with an aggregated message instead of a bare
/// deserialization error.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    /// The firewall group the rule is declared on.
    #[serde(default)]
    pub target_sec_group_name: Option<String>,

    /// `"ingress"` or `"egress"`.
    #[serde(default, rename = "type")]
    pub direction: Option<String>,

    /// `"tcp"`, `"udp"`, `"icmp"` or `"all"`.
    #[serde(default)]
    pub protocol: Option<String>,

    /// Start of the port range.
    #[serde(default)]
    pub from_port: Option<i32>,

    /// End of the port range.
    #[serde(default)]
    pub to_port: Option<i32>,

    /// The rule's target.
    #[serde(default)]
    pub target: Option<TargetRecord>,
}

/// An ordered set of firewall rules loaded from a document. Consumed
/// exactly once, in declaration order, through [`IntoIterator`].
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<RuleRecord>,
}

impl RuleSet {
    /// Loads a rule document from disk.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` when the file is missing, before any parse
    ///   attempt.
    /// - `Error::Io` when the file exists but cannot be read.
    /// - `Error::Json` when the contents are not valid JSON.
    /// - `Error::Format` when the `rules` key is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses a rule document from its JSON text.
    ///
    /// # Errors
    ///
    /// `Error::Json` on unparseable input, `Error::Format` when the
    /// `rules` key is absent.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(text)?;
        let Some(rules_value) = document.get("rules") else {
            return Err(Error::Format("rules section is missing".to_string()));
        };
        let rules: Vec<RuleRecord> = serde_json::from_value(rules_value.clone())?;

        Ok(Self { rules })
    }

    /// Number of rules in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// A non-consuming view of the rules, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[RuleRecord] {
        &self.rules
    }

    /// Consumes the set, yielding each rule exactly once in declaration
    /// order.
    #[must_use]
    pub fn drain(self) -> std::vec::IntoIter<RuleRecord> {
        self.rules.into_iter()
    }
}

impl IntoIterator for RuleSet {
    type Item = RuleRecord;
    type IntoIter = std::vec::IntoIter<RuleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.drain()
    }
}
