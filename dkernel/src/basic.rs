//! Basic serialisable objects shared by every part of the kernel.

use std::{
    fmt::{Debug, Display},
    ops::Add,
    rc::Rc,
};

use serde::{Deserialize, Serialize};

/// The name of a constant, a universe parameter, or the display name of a local binding.
/// Names are reference counted so that cloning expressions and levels never copies text.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Name(Rc<str>);

impl Name {
    pub fn new(text: &str) -> Self {
        Self(Rc::from(text))
    }

    /// The display name given to bindings the checker introduces itself.
    pub fn anonymous() -> Self {
        Self::new("_")
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        &*self.0 == "_"
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(Rc::from(value))
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// A de Bruijn index.
/// The index `#0` refers to the innermost binder in scope.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DeBruijnIndex(u32);

impl Display for DeBruijnIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl DeBruijnIndex {
    /// Constructs a de Bruijn index explicitly.
    /// Prefer [`Self::zero`] and [`Self::succ`] inside the kernel.
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    /// The lowest de Bruijn index.
    pub fn zero() -> DeBruijnIndex {
        Self(0)
    }

    /// The next (higher) de Bruijn index.
    pub fn succ(self) -> DeBruijnIndex {
        Self(self.0 + 1)
    }

    /// The previous (lower) de Bruijn index, or zero if one does not exist.
    pub fn pred(self) -> DeBruijnIndex {
        Self(self.0.saturating_sub(1))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Subtracts an offset, saturating at zero.
    pub fn saturating_sub(self, offset: DeBruijnOffset) -> DeBruijnIndex {
        Self(self.0.saturating_sub(offset.0))
    }
}

/// An offset for de Bruijn indices, which can be used to calculate relative indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeBruijnOffset(u32);

impl DeBruijnOffset {
    pub fn new(offset: u32) -> DeBruijnOffset {
        Self(offset)
    }

    /// The zero offset.
    pub fn zero() -> DeBruijnOffset {
        Self(0)
    }

    /// Increase the offset by one.
    pub fn succ(self) -> DeBruijnOffset {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Add<DeBruijnOffset> for DeBruijnIndex {
    type Output = DeBruijnIndex;

    fn add(self, rhs: DeBruijnOffset) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<DeBruijnOffset> for DeBruijnOffset {
    type Output = DeBruijnOffset;

    fn add(self, rhs: DeBruijnOffset) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
