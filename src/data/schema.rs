use crate::error::{Result, TitanicError};

// ---------------------------------------------------------------------------
// Attribute definitions
// ---------------------------------------------------------------------------

/// Value domain of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Categorical attribute with a fixed, ordered list of levels.
    Nominal(&'static [&'static str]),
    /// Real-valued attribute.
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
}

impl Attribute {
    /// Declared levels, or `None` for numeric attributes.
    pub fn levels(&self) -> Option<&'static [&'static str]> {
        match self.kind {
            AttributeKind::Nominal(levels) => Some(levels),
            AttributeKind::Numeric => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// An ordered attribute list with one attribute designated as the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub relation: &'static str,
    pub attributes: [Attribute; 4],
    pub class_index: usize,
}

pub const PCLASS: usize = 0;
pub const AGE: usize = 1;
pub const SEX: usize = 2;
pub const SURVIVED: usize = 3;

/// The passenger table.  Loaders, writers, the feature encoder and the
/// single-record constructor all read their attribute layout from here.
pub const TITANIC: Schema = Schema {
    relation: "titanic",
    attributes: [
        Attribute {
            name: "pclass",
            kind: AttributeKind::Nominal(&["1", "2", "3"]),
        },
        Attribute {
            name: "age",
            kind: AttributeKind::Numeric,
        },
        Attribute {
            name: "sex",
            kind: AttributeKind::Nominal(&["male", "female"]),
        },
        Attribute {
            name: "survived",
            kind: AttributeKind::Nominal(&["0", "1"]),
        },
    ],
    class_index: SURVIVED,
};

impl Schema {
    pub fn attribute(&self, index: usize) -> &Attribute {
        &self.attributes[index]
    }

    pub fn class_attribute(&self) -> &Attribute {
        self.attribute(self.class_index)
    }

    /// Attribute names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes.iter().map(|a| a.name)
    }

    /// Position of `value` in the level list of a nominal attribute.
    ///
    /// Fails with [`TitanicError::SchemaMismatch`] when the value is not a
    /// declared level.  Values are matched exactly, no case folding.
    pub fn level_index(&self, attribute: usize, value: &str) -> Result<usize> {
        let attr = self.attribute(attribute);
        let levels = attr.levels().unwrap_or(&[]);
        levels
            .iter()
            .position(|l| *l == value)
            .ok_or_else(|| TitanicError::SchemaMismatch {
                attribute: attr.name,
                value: value.to_string(),
                expected: levels,
            })
    }

    /// Level string at `index` of a nominal attribute.
    pub fn level(&self, attribute: usize, index: usize) -> &'static str {
        self.attribute(attribute)
            .levels()
            .and_then(|levels| levels.get(index).copied())
            .unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_last_attribute() {
        assert_eq!(TITANIC.class_index, 3);
        assert_eq!(TITANIC.class_attribute().name, "survived");
        assert_eq!(
            TITANIC.names().collect::<Vec<_>>(),
            vec!["pclass", "age", "sex", "survived"]
        );
    }

    #[test]
    fn level_lookup() {
        assert_eq!(TITANIC.level_index(PCLASS, "3").unwrap(), 2);
        assert_eq!(TITANIC.level_index(SEX, "female").unwrap(), 1);
        assert_eq!(TITANIC.level(SURVIVED, 0), "0");
    }

    #[test]
    fn unknown_level_is_schema_mismatch() {
        let err = TITANIC.level_index(PCLASS, "9").unwrap_err();
        assert!(matches!(
            err,
            TitanicError::SchemaMismatch { attribute: "pclass", .. }
        ));
        // no case folding
        assert!(TITANIC.level_index(SEX, "Female").is_err());
    }

    #[test]
    fn numeric_attribute_has_no_levels() {
        assert!(TITANIC.attribute(AGE).levels().is_none());
        assert!(TITANIC.level_index(AGE, "5").is_err());
    }
}
