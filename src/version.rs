//! Version tokens and composite knowledge.
//!
//! A token is `<ReplicaId>-<Counter>` (e.g. `A-86`). Knowledge is a
//! comma-separated list of tokens, one per observed replica
//! (e.g. `A-11429,B-63,C-52`). `Ord` on tokens is counter first and
//! replica second, so the "effective version" of any knowledge string is
//! simply its maximum token. [`compare`] is the per-replica ordering used
//! when listing versions.

use crate::error::{BudgetError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A single `<ReplicaId>-<Counter>` version.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken {
    replica: char,
    counter: u64,
}

impl VersionToken {
    /// Build a token. `replica` must be an ASCII uppercase letter.
    pub fn new(replica: char, counter: u64) -> Result<Self> {
        if !replica.is_ascii_uppercase() {
            return Err(BudgetError::format(
                replica.to_string(),
                "replica id must be a single uppercase letter",
            ));
        }
        Ok(Self { replica, counter })
    }

    pub fn replica(&self) -> char {
        self.replica
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Same replica, counter + 1. Fails if the counter is already at its
    /// maximum.
    pub fn increment(self) -> Result<Self> {
        let counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| BudgetError::format(self.to_string(), "version counter overflow"))?;
        Ok(Self {
            replica: self.replica,
            counter,
        })
    }
}

/// Order by replica id, then counter.
///
/// Groups each replica's versions together. Use `Ord` (counter first) to
/// decide which of two versions is later.
pub fn compare(a: VersionToken, b: VersionToken) -> Ordering {
    a.replica
        .cmp(&b.replica)
        .then_with(|| a.counter.cmp(&b.counter))
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then_with(|| self.replica.cmp(&other.replica))
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({}-{})", self.replica, self.counter)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.replica, self.counter)
    }
}

impl FromStr for VersionToken {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self> {
        parse_token(s)
    }
}

/// Parse exactly `^[A-Z]-\d+$`.
pub fn parse_token(s: &str) -> Result<VersionToken> {
    let mut chars = s.chars();
    let replica = match (chars.next(), chars.next()) {
        (Some(id), Some('-')) if id.is_ascii_uppercase() => id,
        _ => return Err(BudgetError::format(s, "invalid version token")),
    };

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BudgetError::format(s, "invalid version token"));
    }

    let counter = digits
        .parse::<u64>()
        .map_err(|e| BudgetError::format(s, format!("version counter out of range: {}", e)))?;

    Ok(VersionToken { replica, counter })
}

/// Parse a single token or a comma-separated composite.
///
/// Duplicate replica ids are kept as given; consumers only look at the max.
pub fn parse_composite(s: &str) -> Result<Vec<VersionToken>> {
    if !s.contains(',') {
        return Ok(vec![parse_token(s.trim())?]);
    }

    s.split(',')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return Err(BudgetError::format(
                    s,
                    "empty version part in composite knowledge",
                ));
            }
            parse_token(part).map_err(|_| {
                BudgetError::format(
                    part,
                    format!("invalid version part '{}' in composite '{}'", part, s),
                )
            })
        })
        .collect()
}

/// Maximum token of a composite (or single) version string.
pub fn effective_version(s: &str) -> Result<VersionToken> {
    parse_composite(s)?
        .into_iter()
        .max()
        .ok_or_else(|| BudgetError::format(s, "empty knowledge"))
}

/// Composite knowledge: at most one token per replica.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Knowledge {
    tokens: Vec<VersionToken>,
}

impl Knowledge {
    /// Knowledge containing a single token.
    pub fn single(token: VersionToken) -> Self {
        Self {
            tokens: vec![token],
        }
    }

    /// Parse a knowledge string, folding duplicate replicas to their max.
    pub fn parse(s: &str) -> Result<Self> {
        let mut knowledge = Knowledge::default();
        for token in parse_composite(s)? {
            knowledge.observe(token);
        }
        Ok(knowledge)
    }

    /// Record `token`, keeping the higher counter if its replica is known.
    pub fn observe(&mut self, token: VersionToken) {
        match self
            .tokens
            .iter_mut()
            .find(|t| t.replica == token.replica)
        {
            Some(existing) => {
                if token.counter > existing.counter {
                    *existing = token;
                }
            }
            None => {
                self.tokens.push(token);
                self.tokens.sort_by_key(|t| t.replica);
            }
        }
    }

    pub fn tokens(&self) -> &[VersionToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token for `replica`, if observed.
    pub fn get(&self, replica: char) -> Option<VersionToken> {
        self.tokens.iter().copied().find(|t| t.replica == replica)
    }

    /// Highest token, `None` for empty knowledge.
    pub fn effective(&self) -> Option<VersionToken> {
        self.tokens.iter().copied().max()
    }
}

impl fmt::Display for Knowledge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl FromStr for Knowledge {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self> {
        Knowledge::parse(s)
    }
}
