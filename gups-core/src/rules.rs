//! Reviewer pools and assignment rules
//!
//! Both tables are built once from configuration and never change
//! afterwards. All referential checks happen here so that evaluation can
//! index them without failing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::set::Set;
use crate::{Error, Result};

/// Validated mapping from pool name to its members
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: BTreeMap<String, Set>,
}

impl PoolRegistry {
    /// Build the registry, rejecting any pool member that is not in `users`
    pub fn new<I, S>(pools: I, users: &Set) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Set)>,
        S: Into<String>,
    {
        let mut registry = BTreeMap::new();

        for (name, members) in pools {
            let name = name.into();
            let unknown = members.difference(users);
            if !unknown.is_empty() {
                return Err(Error::UnknownUsers {
                    pool: name,
                    users: unknown,
                });
            }
            registry.insert(name, members);
        }

        Ok(Self { pools: registry })
    }

    pub fn get(&self, name: &str) -> Option<&Set> {
        self.pools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    /// Iterate pools by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Set)> {
        self.pools.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// "Ensure at least `count` reviewers from `pool`"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub pool: String,
    pub count: usize,
}

impl Pick {
    pub fn new(pool: impl Into<String>, count: usize) -> Self {
        Self {
            pool: pool.into(),
            count,
        }
    }

    /// Parse `pool` or `pool:count`; `rule` is only used for error reporting
    pub fn parse(rule: &str, raw: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedPick {
            rule: rule.to_string(),
            pick: raw.to_string(),
            reason,
        };

        let mut parts = raw.split(':');
        let pool = parts.next().unwrap_or_default().trim();
        if pool.is_empty() {
            return Err(malformed("missing pool name".to_string()));
        }

        let count = match parts.next() {
            None => 1,
            Some(count) => {
                let count: i64 = count
                    .trim()
                    .parse()
                    .map_err(|e| malformed(format!("'{}': {}", count, e)))?;
                if count < 1 {
                    return Err(malformed(format!("'{}' must be >= 1", count)));
                }
                usize::try_from(count).map_err(|e| malformed(e.to_string()))?
            }
        };

        if parts.next().is_some() {
            return Err(malformed("expected 'pool' or 'pool:count'".to_string()));
        }

        Ok(Self::new(pool, count))
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pool, self.count)
    }
}

/// One directive as written in configuration
///
/// ```toml
/// [rules]
/// backend = [{ if = "core", pick = ["core:2"] }, { pick = ["core"] }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectiveConfig {
    /// Pool the author must belong to for this directive to apply
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,

    #[serde(default)]
    pub pick: Vec<String>,
}

/// A guarded list of picks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub guard: Option<String>,
    pub picks: Vec<Pick>,
}

impl Directive {
    /// Whether this directive applies to a pull request by `author`
    pub fn matches(&self, author: &str, pools: &PoolRegistry) -> bool {
        match &self.guard {
            None => true,
            Some(guard) => pools.get(guard).is_some_and(|pool| pool.contains(author)),
        }
    }
}

/// How directives of a rule are selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dispatch {
    /// Apply the first directive whose guard matches, then stop
    #[default]
    FirstMatch,
    /// Apply every directive whose guard matches
    AllMatching,
}

/// Validated mapping from rule name to its ordered directives
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: BTreeMap<String, Vec<Directive>>,
}

impl RuleTable {
    /// Parse and validate rules against `pools`
    pub fn new<'a, I>(rules: I, pools: &PoolRegistry) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<DirectiveConfig>)>,
    {
        let mut table = BTreeMap::new();

        for (name, raw_directives) in rules {
            let mut directives = Vec::with_capacity(raw_directives.len());

            for raw in raw_directives {
                let guard = raw.guard.clone().filter(|g| !g.is_empty());

                if let Some(guard) = &guard {
                    if !pools.contains(guard) {
                        return Err(Error::UnknownGuardPool {
                            rule: name.clone(),
                            pool: guard.clone(),
                        });
                    }
                }

                let mut picks = Vec::with_capacity(raw.pick.len());
                for pick in &raw.pick {
                    let pick = Pick::parse(name, pick)?;
                    if !pools.contains(&pick.pool) {
                        return Err(Error::UnknownPickPool {
                            rule: name.clone(),
                            guard: guard.clone().unwrap_or_default(),
                            pool: pick.pool,
                        });
                    }
                    picks.push(pick);
                }

                directives.push(Directive { guard, picks });
            }

            table.insert(name.clone(), directives);
        }

        Ok(Self { rules: table })
    }

    pub fn get(&self, name: &str) -> Option<&[Directive]> {
        self.rules.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Iterate rules by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Directive])> {
        self.rules
            .iter()
            .map(|(name, directives)| (name.as_str(), directives.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
