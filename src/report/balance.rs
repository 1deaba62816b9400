use super::{checked_sum, write_balances, write_overflow, Balances, Overflow};
use crate::options::BalanceOptions;
use crate::{Amount, Currency, Decimal, Ledger};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Default)]
struct TrieNode<'l> {
    own: Balances,
    total: Balances,
    nodes: BTreeMap<&'l str, TrieNode<'l>>,
}

/// One account of a [`BalanceReport`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    /// Full path, e.g. `Expenses:Food`.
    pub account: String,
    /// Last segment of the path, e.g. `Food`.
    pub name: String,
    /// `0` for top-level accounts.
    pub level: usize,
    /// Sum of the postings to this exact account.
    pub own: Balances,
    /// Sum of the postings to this account and its sub-accounts.
    pub total: Balances,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BalanceReport {
    /// Accounts in depth-first alphabetical order.
    pub rows: Vec<BalanceRow>,
    /// Sum of all matched postings.
    pub total: Balances,
    /// Every commodity seen among matched postings, sorted.
    pub currencies: Vec<Currency>,
    /// Postings left out because a sum would go out of range.
    pub overflow: Vec<Overflow>,
}

impl BalanceReport {
    pub fn get(&self, account: &str) -> Option<&BalanceRow> {
        self.rows.iter().find(|row| row.account == account)
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows.iter() {
            let label = format!("{:indent$}{}", "", row.name, indent = row.level * 2);
            write_balances(f, &row.total, &label)?;
        }
        writeln!(f, "{}", "-".repeat(20))?;
        write_balances(f, &self.total, "")?;
        write_overflow(f, &self.overflow)
    }
}

fn strip_zeros(balances: &mut Balances) {
    balances.retain(|_, number| !number.is_zero());
}

/// Removes zero numbers and returns `false` if nothing under `node` is left.
fn prune(node: &mut TrieNode) -> bool {
    strip_zeros(&mut node.own);
    strip_zeros(&mut node.total);
    node.nodes.retain(|_, child| prune(child));
    !node.total.is_empty() || !node.nodes.is_empty()
}

fn flatten(
    path: &str,
    name: &str,
    level: usize,
    node: TrieNode,
    depth: Option<usize>,
    rows: &mut Vec<BalanceRow>,
) {
    if depth.map_or(false, |depth| level >= depth) {
        return;
    }
    rows.push(BalanceRow {
        account: path.to_string(),
        name: name.to_string(),
        level,
        own: node.own,
        total: node.total,
    });
    for (child_name, child) in node.nodes {
        let child_path = format!("{}:{}", path, child_name);
        flatten(&child_path, child_name, level + 1, child, depth, rows);
    }
}

/// The sums `amount` would produce at the root, along the path of `account`,
/// and in the account itself, or `None` if any of them is out of range.
fn rolled_up(
    root: &TrieNode,
    account: &str,
    amount: &Amount,
) -> Option<(Decimal, Vec<Decimal>, Decimal)> {
    let total = checked_sum(&root.total, amount)?;
    let mut path = Vec::new();
    let mut node = Some(root);
    for key in account.split(':') {
        node = node.and_then(|node| node.nodes.get(key));
        path.push(match node {
            Some(node) => checked_sum(&node.total, amount)?,
            None => amount.number,
        });
    }
    let own = match node {
        Some(node) => checked_sum(&node.own, amount)?,
        None => amount.number,
    };
    Some((total, path, own))
}

/// Sums the postings selected by `options` per account, rolled up along the
/// account tree.
pub fn balance(ledger: &Ledger, options: &BalanceOptions) -> BalanceReport {
    let mut root = TrieNode::default();
    let mut currencies = BTreeSet::new();
    let mut overflow = Vec::new();
    for p in ledger.postings_matching(&options.filter, &options.range) {
        let amount = &p.posting.amount;
        let (total, path, own) = match rolled_up(&root, &p.posting.account, amount) {
            Some(sums) => sums,
            None => {
                log::warn!("{}: balance of {} out of range", p.posting.src, p.posting.account);
                overflow.push(Overflow::from(&p));
                continue;
            }
        };
        currencies.insert(amount.currency.as_str());
        root.total.insert(amount.currency.clone(), total);
        let mut node = &mut root;
        for (key, sum) in p.posting.account.split(':').zip(path) {
            node = node.nodes.entry(key).or_default();
            node.total.insert(amount.currency.clone(), sum);
        }
        node.own.insert(amount.currency.clone(), own);
    }
    if !options.show_zero {
        prune(&mut root);
    }
    let mut rows = Vec::new();
    for (name, node) in root.nodes {
        flatten(name, name, 0, node, options.depth, &mut rows);
    }
    log::debug!("balance report: {} rows", rows.len());
    BalanceReport {
        rows,
        total: root.total,
        currencies: currencies.into_iter().map(str::to_string).collect(),
        overflow,
    }
}
