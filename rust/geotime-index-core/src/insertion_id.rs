use std::fmt;

/// A sortable row key identifying one index cell touched by an entity.
///
/// Layout: `[tier][temporal bin ids...][curve index]`. Keys compare
/// byte-wise, so rows of the same tier and bin are contiguous and ordered by
/// their position along the space-filling curve.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InsertionId(Box<[u8]>);

impl InsertionId {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> InsertionId {
        InsertionId(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The tier the cell belongs to.
    pub fn tier(&self) -> Option<u8> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for InsertionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for InsertionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for InsertionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InsertionId({self})")
    }
}
