use super::{DataType, DeclaredType};

impl DeclaredType {
    /// Checks whether an entry declared with this type may update a tag of
    /// the given live type.
    #[must_use]
    pub fn accepts(self, live: DataType) -> bool {
        match (self, live) {
            // Integer-mapped strings are stored as integers.
            (DeclaredType::Integer, DataType::Integer | DataType::IntegerMappedString) => true,
            (DeclaredType::Float, DataType::Float) => true,
            (DeclaredType::String, DataType::String) => true,
            (DeclaredType::Boolean, DataType::Boolean) => true,
            (DeclaredType::DWord, DataType::DWord) => true,
            _ => false,
        }
    }

    /// Live types this declared type may update.
    #[must_use]
    pub fn acceptable_types(self) -> &'static [DataType] {
        match self {
            DeclaredType::Integer => &[DataType::Integer, DataType::IntegerMappedString],
            DeclaredType::Float => &[DataType::Float],
            DeclaredType::String => &[DataType::String],
            DeclaredType::Boolean => &[DataType::Boolean],
            DeclaredType::DWord => &[DataType::DWord],
        }
    }
}
