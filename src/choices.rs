//! Hierarchical choice maps
//!
//! A [`ChoiceMap`] is a persistent, addressable tree of sampled values.
//! Maps are immutable: `set` and `merge` return new maps. A choice map
//! produced by batching `N` sub-traces exposes integer keys `0..N-1` at the
//! batch level, and a wildcard ([`Key::All`]) read stacks one address across
//! all batch indices at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{Address, Key};
use crate::error::{AddressError, GenResult};
use crate::value::Value;

/// A persistent mapping from addresses to values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ChoiceMap {
    /// No choices at any depth
    #[default]
    Empty,
    /// A single value at this address
    Leaf(Value),
    /// Nested sub-maps under distinct keys
    Node(BTreeMap<Key, ChoiceMap>),
}

/// Shared empty map, so subtree views can hand out references.
static EMPTY: ChoiceMap = ChoiceMap::Empty;

impl ChoiceMap {
    /// The empty choice map.
    pub fn empty() -> Self {
        ChoiceMap::Empty
    }

    /// A bare leaf holding `value`.
    pub fn leaf<V: Into<Value>>(value: V) -> Self {
        ChoiceMap::Leaf(value.into())
    }

    /// A map with `sub` nested under `key`. Empty sub-maps are pruned.
    pub fn nest(key: Key, sub: ChoiceMap) -> Self {
        if sub.static_is_empty() {
            ChoiceMap::Empty
        } else {
            let mut children = BTreeMap::new();
            children.insert(key, sub);
            ChoiceMap::Node(children)
        }
    }

    /// True iff no leaf exists at any depth.
    pub fn static_is_empty(&self) -> bool {
        match self {
            ChoiceMap::Empty => true,
            ChoiceMap::Leaf(_) => false,
            ChoiceMap::Node(children) => children.values().all(ChoiceMap::static_is_empty),
        }
    }

    /// The value of this map if it is a leaf.
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            ChoiceMap::Leaf(v) => Some(v),
            _ => None,
        }
    }

    /// The subtree under `key` (empty for absent paths).
    pub fn at(&self, key: &Key) -> &ChoiceMap {
        match self {
            ChoiceMap::Node(children) => children.get(key).unwrap_or(&EMPTY),
            _ => &EMPTY,
        }
    }

    /// The subtree under `addr` (empty for absent paths).
    pub fn at_addr(&self, addr: &Address) -> &ChoiceMap {
        let mut cur = self;
        for key in addr.keys() {
            cur = cur.at(key);
        }
        cur
    }

    /// Read the leaf at `addr`, failing if it is absent.
    ///
    /// A [`Key::All`] segment at a batch node performs a vectorized read:
    /// the remaining address is resolved against every integer-keyed child
    /// and the results are stacked, shape-preserving.
    pub fn get_value(&self, addr: &Address) -> GenResult<Value> {
        self.get_value_inner(addr, addr.keys())
    }

    fn get_value_inner(&self, full: &Address, remaining: &[Key]) -> GenResult<Value> {
        match remaining.first() {
            None => match self {
                ChoiceMap::Leaf(v) => Ok(v.clone()),
                _ => Err(AddressError::Missing(full.clone()).into()),
            },
            Some(Key::All) => match self {
                ChoiceMap::Node(_) => {
                    let indices = self.indices();
                    if indices.is_empty() {
                        return Err(AddressError::Missing(full.clone()).into());
                    }
                    let column = indices
                        .into_iter()
                        .map(|i| {
                            self.at(&Key::Idx(i))
                                .get_value_inner(full, &remaining[1..])
                        })
                        .collect::<GenResult<Vec<_>>>()?;
                    Ok(Value::stack(column))
                }
                _ => Err(AddressError::Malformed(full.clone()).into()),
            },
            Some(key) => match self {
                ChoiceMap::Node(children) => match children.get(key) {
                    Some(sub) => sub.get_value_inner(full, &remaining[1..]),
                    None => Err(AddressError::Missing(full.clone()).into()),
                },
                _ => Err(AddressError::Missing(full.clone()).into()),
            },
        }
    }

    /// New map with the leaf at `addr` replaced or inserted.
    pub fn set(&self, addr: &Address, value: Value) -> ChoiceMap {
        self.set_inner(addr.keys(), value)
    }

    fn set_inner(&self, remaining: &[Key], value: Value) -> ChoiceMap {
        match remaining.first() {
            None => ChoiceMap::Leaf(value),
            Some(key) => {
                let mut children = match self {
                    ChoiceMap::Node(children) => children.clone(),
                    _ => BTreeMap::new(),
                };
                let sub = children.get(key).unwrap_or(&EMPTY);
                let new_sub = sub.set_inner(&remaining[1..], value);
                children.insert(key.clone(), new_sub);
                ChoiceMap::Node(children)
            }
        }
    }

    /// New map where `other`'s leaves override this one's at matching
    /// addresses, recursively.
    ///
    /// When the two maps disagree structurally (a `Leaf` in `other` where
    /// this map holds a `Node`, or vice versa), `other` replaces the whole
    /// subtree: a merge never mixes a leaf with children under one address.
    pub fn merge(&self, other: &ChoiceMap) -> ChoiceMap {
        match (self, other) {
            (_, ChoiceMap::Empty) => self.clone(),
            (ChoiceMap::Node(a), ChoiceMap::Node(b)) => {
                let mut merged = a.clone();
                for (key, sub) in b {
                    let combined = match merged.get(key) {
                        Some(existing) => existing.merge(sub),
                        None => sub.clone(),
                    };
                    merged.insert(key.clone(), combined);
                }
                ChoiceMap::Node(merged)
            }
            // other wins wherever both carry data
            (_, winner) => winner.clone(),
        }
    }

    /// Integer keys at this level, in ascending order.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            ChoiceMap::Node(children) => children
                .keys()
                .filter_map(|k| match k {
                    Key::Idx(i) => Some(*i),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// All `(address, value)` leaf pairs, in address order.
    pub fn entries(&self) -> Vec<(Address, Value)> {
        let mut out = Vec::new();
        self.collect_entries(Address::root(), &mut out);
        out
    }

    fn collect_entries(&self, prefix: Address, out: &mut Vec<(Address, Value)>) {
        match self {
            ChoiceMap::Empty => {}
            ChoiceMap::Leaf(v) => out.push((prefix, v.clone())),
            ChoiceMap::Node(children) => {
                for (key, sub) in children {
                    sub.collect_entries(prefix.push(key.clone()), out);
                }
            }
        }
    }
}

/// Builder façade for choice-map literals.
///
/// ```
/// use gentrace::{addr, choices::C, value::Value};
///
/// let chm = C::at(addr!("x", 0)).set(3.0);
/// assert_eq!(chm.get_value(&addr!("x", 0)).unwrap(), Value::F64(3.0));
/// let leaf = C::v(2.0);
/// assert_eq!(leaf.as_leaf(), Some(&Value::F64(2.0)));
/// ```
pub struct C;

impl C {
    /// Start a one-leaf map at `addr`.
    pub fn at<A: Into<Address>>(addr: A) -> ChoiceEntry {
        ChoiceEntry(addr.into())
    }

    /// A bare leaf map.
    pub fn v<V: Into<Value>>(value: V) -> ChoiceMap {
        ChoiceMap::leaf(value)
    }
}

/// Pending address produced by [`C::at`]; call [`ChoiceEntry::set`] to bind
/// a value.
pub struct ChoiceEntry(Address);

impl ChoiceEntry {
    /// Bind `value` at the pending address, producing a one-leaf map.
    pub fn set<V: Into<Value>>(self, value: V) -> ChoiceMap {
        ChoiceMap::Empty.set(&self.0, value.into())
    }
}
