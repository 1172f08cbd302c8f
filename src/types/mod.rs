//! The effective-type representation used by the checker and the runtime.

use std::fmt;

/// Primitive type tags. `Invalid` marks an identifier that has never been
/// declared or assigned; it is not a legal operand of any operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Integer,
    Real,
    Char,
    String,
    Boolean,
    Date,
    Invalid,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::Integer => "INTEGER",
            Primitive::Real => "REAL",
            Primitive::Char => "CHAR",
            Primitive::String => "STRING",
            Primitive::Boolean => "BOOLEAN",
            Primitive::Date => "DATE",
            Primitive::Invalid => "INVALID",
        };
        f.write_str(name)
    }
}

/// Effective type: a primitive tag plus, for arrays, the ordered list of
/// `(lo, hi)` index bounds, outermost dimension first.
///
/// `bounds` is empty exactly when `is_array` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EType {
    pub primtype: Primitive,
    pub is_array: bool,
    pub bounds: Vec<(i64, i64)>,
}

impl EType {
    pub fn scalar(primtype: Primitive) -> Self {
        Self {
            primtype,
            is_array: false,
            bounds: Vec::new(),
        }
    }

    /// The scalar type of this array's elements after full indexing.
    pub fn element_type(&self) -> Self {
        Self::scalar(self.primtype)
    }

    pub fn is_invalid(&self) -> bool {
        self.primtype == Primitive::Invalid
    }
}

impl Default for EType {
    fn default() -> Self {
        Self::scalar(Primitive::Invalid)
    }
}

impl From<Primitive> for EType {
    fn from(primtype: Primitive) -> Self {
        Self::scalar(primtype)
    }
}

impl fmt::Display for EType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            f.write_str("ARRAY[")?;
            for (i, (lo, hi)) in self.bounds.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{lo}:{hi}")?;
            }
            write!(f, "] OF {}", self.primtype)
        } else {
            write!(f, "{}", self.primtype)
        }
    }
}
