//! Addresses and selections
//!
//! An [`Address`] is an ordered path of [`Key`]s identifying one leaf in a
//! choice map. A [`Selection`] is a predicate over addresses, used to choose
//! which leaves participate in a `Regenerate` edit or a `project` query.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One segment of an address.
///
/// Keys serialize as plain strings (`"slope"`, `"3"`, `"*"`), so choice
/// maps and requests keyed by them stay readable in JSON. Symbol keys that
/// look like integers or the wildcard are reserved for those meanings.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Named address segment
    Sym(String),
    /// Batch index segment
    Idx(usize),
    /// Wildcard: descend into the batched dimension
    All,
}

impl Key {
    /// Whether this key (possibly a wildcard) covers `other` (a concrete key).
    pub fn covers(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::All, Key::Idx(_)) | (Key::All, Key::All) => true,
            (a, b) => a == b,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Sym(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Sym(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Idx(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Sym(s) => write!(f, "{s}"),
            Key::Idx(i) => write!(f, "{i}"),
            Key::All => write!(f, "*"),
        }
    }
}

fn parse_key(s: &str) -> Key {
    if s == "*" {
        return Key::All;
    }
    match s.parse::<usize>() {
        Ok(i) => Key::Idx(i),
        Err(_) => Key::Sym(s.to_string()),
    }
}

impl FromStr for Key {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_key(s))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(parse_key(&String::deserialize(deserializer)?))
    }
}

/// A path of keys identifying one leaf in a choice map.
///
/// Addresses compare structurally. The empty address names the root leaf of
/// a primitive distribution's choice map.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(Vec<Key>);

impl Address {
    /// The empty (root) address.
    pub fn root() -> Self {
        Address(Vec::new())
    }

    /// Build from key segments.
    pub fn from_keys<I: IntoIterator<Item = Key>>(keys: I) -> Self {
        Address(keys.into_iter().collect())
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root address.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments of this address.
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// First segment, if any.
    pub fn head(&self) -> Option<&Key> {
        self.0.first()
    }

    /// Address with the first segment removed.
    pub fn tail(&self) -> Address {
        Address(self.0.iter().skip(1).cloned().collect())
    }

    /// New address with `key` appended.
    pub fn push(&self, key: Key) -> Address {
        let mut keys = self.0.clone();
        keys.push(key);
        Address(keys)
    }

    /// New address with `key` prepended.
    pub fn prefixed(&self, key: Key) -> Address {
        let mut keys = Vec::with_capacity(self.0.len() + 1);
        keys.push(key);
        keys.extend(self.0.iter().cloned());
        Address(keys)
    }

    /// Strip a leading key, returning the remainder if it matches.
    pub fn strip_prefix(&self, key: &Key) -> Option<Address> {
        match self.0.first() {
            Some(head) if head == key => Some(self.tail()),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

fn parse_address(s: &str) -> Address {
    if s == "<root>" {
        return Address::root();
    }
    Address(s.split('/').map(parse_key).collect())
}

impl FromStr for Address {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_address(s))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(parse_address(&String::deserialize(deserializer)?))
    }
}

impl From<Key> for Address {
    fn from(key: Key) -> Self {
        Address(vec![key])
    }
}

impl From<&str> for Address {
    fn from(key: &str) -> Self {
        Address(vec![Key::from(key)])
    }
}

impl From<String> for Address {
    fn from(key: String) -> Self {
        Address(vec![Key::from(key)])
    }
}

impl From<usize> for Address {
    fn from(key: usize) -> Self {
        Address(vec![Key::from(key)])
    }
}

/// Build an [`Address`] from mixed string / integer / [`Key`] segments.
///
/// ```
/// use gentrace::{addr, address::{Address, Key}};
///
/// let a = addr!("outer", 1, "z");
/// assert_eq!(a.keys().len(), 3);
/// let root: Address = addr!();
/// assert!(root.is_empty());
/// ```
#[macro_export]
macro_rules! addr {
    () => {
        $crate::address::Address::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::address::Address::from_keys(vec![$($crate::address::Key::from($segment)),+])
    };
}

/// A predicate over addresses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    /// Matches every address
    All,
    /// Matches no address
    None,
    /// Matches addresses whose first key is covered by the given key, with
    /// the remainder matching the inner selection
    Under(Key, Box<Selection>),
    /// Matches if either branch matches
    Union(Box<Selection>, Box<Selection>),
}

impl Selection {
    /// The selection matching every address.
    pub fn all() -> Self {
        Selection::All
    }

    /// The selection matching no address.
    pub fn none() -> Self {
        Selection::None
    }

    /// Select the subtree rooted at `addr`.
    pub fn at<A: Into<Address>>(addr: A) -> Self {
        let addr = addr.into();
        let mut sel = Selection::All;
        for key in addr.keys().iter().rev() {
            sel = Selection::Under(key.clone(), Box::new(sel));
        }
        sel
    }

    /// Union of two selections.
    pub fn or(self, other: Selection) -> Self {
        match (self, other) {
            (Selection::All, _) | (_, Selection::All) => Selection::All,
            (Selection::None, s) | (s, Selection::None) => s,
            (a, b) => Selection::Union(Box::new(a), Box::new(b)),
        }
    }

    /// Whether this selection matches the given concrete address.
    pub fn matches(&self, addr: &Address) -> bool {
        match self {
            Selection::All => true,
            Selection::None => false,
            Selection::Under(key, inner) => match addr.head() {
                Some(head) => key.covers(head) && inner.matches(&addr.tail()),
                None => false,
            },
            Selection::Union(a, b) => a.matches(addr) || b.matches(addr),
        }
    }

    /// Restrict this selection to the subtree under `key`.
    pub fn descend(&self, key: &Key) -> Selection {
        match self {
            Selection::All => Selection::All,
            Selection::None => Selection::None,
            Selection::Under(k, inner) => {
                if k.covers(key) {
                    (**inner).clone()
                } else {
                    Selection::None
                }
            }
            Selection::Union(a, b) => a.descend(key).or(b.descend(key)),
        }
    }

    /// True iff this selection can match no address at all.
    pub fn is_none(&self) -> bool {
        match self {
            Selection::All => false,
            Selection::None => true,
            Selection::Under(_, inner) => inner.is_none(),
            Selection::Union(a, b) => a.is_none() && b.is_none(),
        }
    }
}
