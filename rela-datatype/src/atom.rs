use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Type of an atomic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtomType {
    Nat,
    Int,
    Dbl,
    Bool,
    Str,
}

/// Atom is a literal value stored in literal tables, attached
/// as constant column, or referred by properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    Nat(u64),
    Int(i64),
    Dbl(ValidF64),
    Bool(bool),
    Str(Arc<str>),
}

impl Atom {
    #[inline]
    pub fn nat(v: u64) -> Self {
        Atom::Nat(v)
    }

    #[inline]
    pub fn int(v: i64) -> Self {
        Atom::Int(v)
    }

    #[inline]
    pub fn new_dbl(v: f64) -> Option<Self> {
        ValidF64::new(v).map(Atom::Dbl)
    }

    #[inline]
    pub fn bool(v: bool) -> Self {
        Atom::Bool(v)
    }

    #[inline]
    pub fn str(v: &str) -> Self {
        Atom::Str(Arc::from(v))
    }

    #[inline]
    pub fn ty(&self) -> AtomType {
        match self {
            Atom::Nat(_) => AtomType::Nat,
            Atom::Int(_) => AtomType::Int,
            Atom::Dbl(_) => AtomType::Dbl,
            Atom::Bool(_) => AtomType::Bool,
            Atom::Str(_) => AtomType::Str,
        }
    }

    /// Two atoms are comparable only if they share the same type.
    /// No implicit cast is applied.
    #[inline]
    pub fn is_comparable(&self, other: &Atom) -> bool {
        self.ty() == other.ty()
    }

    /// Compare two atoms, returns None if they are not comparable.
    #[inline]
    pub fn try_cmp(&self, other: &Atom) -> Option<Ordering> {
        if self.is_comparable(other) {
            Some(self.cmp(other))
        } else {
            None
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Atom::Bool(b) => Ok(*b),
            other => Err(Error::TypeMismatch {
                expected: AtomType::Bool,
                found: other.ty(),
            }),
        }
    }

    #[inline]
    pub fn as_nat(&self) -> Result<u64> {
        match self {
            Atom::Nat(n) => Ok(*n),
            other => Err(Error::TypeMismatch {
                expected: AtomType::Nat,
                found: other.ty(),
            }),
        }
    }

    /// Parse atom of given type from its textual form.
    pub fn parse(ty: AtomType, s: &str) -> Result<Self> {
        let atom = match ty {
            AtomType::Nat => Atom::Nat(s.parse()?),
            AtomType::Int => Atom::Int(s.parse()?),
            AtomType::Dbl => Atom::new_dbl(s.parse()?).ok_or(Error::InvalidValueFormat)?,
            AtomType::Bool => match s {
                "true" => Atom::Bool(true),
                "false" => Atom::Bool(false),
                _ => return Err(Error::InvalidValueFormat),
            },
            AtomType::Str => Atom::str(s),
        };
        Ok(atom)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Nat(v) => write!(f, "#{}", v),
            Atom::Int(v) => write!(f, "{}", v),
            Atom::Dbl(v) => write!(f, "{:?}", v.value()),
            Atom::Bool(v) => write!(f, "{}", v),
            Atom::Str(v) => write!(f, "\"{}\"", v),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidF64(f64);

impl ValidF64 {
    #[inline]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_infinite() || value.is_nan() {
            None
        } else if value == 0.0 {
            // normalize negative zero so that hash agrees with equality
            Some(ValidF64(0.0))
        } else {
            Some(ValidF64(value))
        }
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for ValidF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

// we must ensure f64 is valid for equality check
impl Eq for ValidF64 {}

impl PartialOrd for ValidF64 {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValidF64 {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for ValidF64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.to_bits())
    }
}

impl Deref for ValidF64 {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
