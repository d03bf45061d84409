use std::fmt;

use serde::{Deserialize, Serialize};

use super::schema::{PCLASS, SEX, SURVIVED, TITANIC};
use crate::error::{Result, TitanicError};

// ---------------------------------------------------------------------------
// Nominal values – one enum per categorical attribute
// ---------------------------------------------------------------------------

/// A categorical attribute whose variants line up, in order, with the level
/// list declared for it in [`TITANIC`].
pub trait Nominal: Copy + Sized + 'static {
    /// Index of the attribute in the schema.
    const ATTRIBUTE: usize;
    /// All variants, in level order.
    const VARIANTS: &'static [Self];

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self> {
        Self::VARIANTS.get(index).copied()
    }

    /// The level string declared by the schema for this variant.
    fn level(self) -> &'static str {
        TITANIC.level(Self::ATTRIBUTE, self.index())
    }

    /// Parse a level string.  Anything outside the declared levels is a
    /// [`TitanicError::SchemaMismatch`].
    fn parse_level(value: &str) -> Result<Self> {
        let index = TITANIC.level_index(Self::ATTRIBUTE, value)?;
        Self::from_index(index).ok_or_else(|| {
            TitanicError::data(format!(
                "level '{value}' has no variant for attribute '{}'",
                TITANIC.attribute(Self::ATTRIBUTE).name
            ))
        })
    }
}

/// Implements [`Nominal`], `Display` and the string conversions serde goes
/// through, so every textual form of the enum comes from the schema.
macro_rules! nominal {
    ($ty:ident, $attr:expr, [$($variant:ident),+ $(,)?]) => {
        impl Nominal for $ty {
            const ATTRIBUTE: usize = $attr;
            const VARIANTS: &'static [Self] = &[$($ty::$variant),+];

            fn index(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.level())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = TitanicError;

            fn try_from(value: String) -> Result<Self> {
                Self::parse_level(&value)
            }
        }

        impl From<$ty> for &'static str {
            fn from(value: $ty) -> &'static str {
                value.level()
            }
        }
    };
}

/// Ticket class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Pclass {
    First,
    Second,
    Third,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Sex {
    Male,
    Female,
}

/// The class label.  `Died` is level `"0"`, `Survived` is level `"1"`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Survival {
    #[default]
    Died,
    Survived,
}

nominal!(Pclass, PCLASS, [First, Second, Third]);
nominal!(Sex, SEX, [Male, Female]);
nominal!(Survival, SURVIVED, [Died, Survived]);

// ---------------------------------------------------------------------------
// Passenger – one row of the dataset
// ---------------------------------------------------------------------------

/// A single passenger record.  `age` and `survived` may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub pclass: Pclass,
    pub age: Option<f64>,
    pub sex: Sex,
    pub survived: Option<Survival>,
}

impl Passenger {
    /// A record with the label left missing, ready for classification.
    pub fn unlabelled(pclass: Pclass, age: Option<f64>, sex: Sex) -> Self {
        Passenger {
            pclass,
            age,
            sex,
            survived: None,
        }
    }

    /// Build a record from raw level strings, validating each against the
    /// schema.
    pub fn from_levels(
        pclass: &str,
        age: Option<f64>,
        sex: &str,
        survived: Option<&str>,
    ) -> Result<Self> {
        Ok(Passenger {
            pclass: Pclass::parse_level(pclass)?,
            age,
            sex: Sex::parse_level(sex)?,
            survived: survived.map(Survival::parse_level).transpose()?,
        })
    }
}

/// ARFF instance form: `1,5,female,?`.
impl fmt::Display for Passenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},", self.pclass)?;
        match self.age {
            Some(age) => write!(f, "{age},")?,
            None => f.write_str("?,")?,
        }
        write!(f, "{},", self.sex)?;
        match self.survived {
            Some(label) => write!(f, "{label}"),
            None => f.write_str("?"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Relation name (ARFF `@relation`, or the schema default).
    pub relation: String,
    /// All records, in file order.
    pub passengers: Vec<Passenger>,
}

impl Dataset {
    pub fn new(passengers: Vec<Passenger>) -> Self {
        Dataset {
            relation: TITANIC.relation.to_string(),
            passengers,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Passenger> {
        self.passengers.iter()
    }

    /// Records that carry a label, paired with it.
    pub fn labelled(&self) -> Vec<(&Passenger, Survival)> {
        self.passengers
            .iter()
            .filter_map(|p| p.survived.map(|label| (p, label)))
            .collect()
    }

    /// Count of labelled records per class, indexed by level.
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for label in self.passengers.iter().filter_map(|p| p.survived) {
            counts[label.index()] += 1;
        }
        counts
    }

    /// Mean of the known ages among labelled records, `None` when there are
    /// none.  This is the fill value a model trained on the dataset uses.
    pub fn mean_age(&self) -> Option<f64> {
        let (sum, n) = self
            .passengers
            .iter()
            .filter(|p| p.survived.is_some())
            .filter_map(|p| p.age)
            .fold((0.0, 0usize), |(s, n), a| (s + a, n + 1));
        (n > 0).then(|| sum / n as f64)
    }
}

impl IntoIterator for Dataset {
    type Item = Passenger;
    type IntoIter = std::vec::IntoIter<Passenger>;

    fn into_iter(self) -> Self::IntoIter {
        self.passengers.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::AttributeKind;

    #[test]
    fn variants_match_schema_levels() {
        fn check<N: Nominal + fmt::Debug>() {
            let attr = TITANIC.attribute(N::ATTRIBUTE);
            match attr.kind {
                AttributeKind::Nominal(levels) => {
                    assert_eq!(levels.len(), N::VARIANTS.len(), "{}", attr.name);
                    for (i, v) in N::VARIANTS.iter().enumerate() {
                        assert_eq!(v.index(), i);
                        assert_eq!(v.level(), levels[i]);
                    }
                }
                AttributeKind::Numeric => panic!("{} should be nominal", attr.name),
            }
        }
        check::<Pclass>();
        check::<Sex>();
        check::<Survival>();
    }

    #[test]
    fn display_uses_arff_instance_form() {
        let p = Passenger::unlabelled(Pclass::First, Some(5.0), Sex::Female);
        assert_eq!(p.to_string(), "1,5,female,?");

        let p = Passenger {
            pclass: Pclass::Third,
            age: None,
            sex: Sex::Male,
            survived: Some(Survival::Died),
        };
        assert_eq!(p.to_string(), "3,?,male,0");

        let p = Passenger::unlabelled(Pclass::Second, Some(0.42), Sex::Male);
        assert_eq!(p.to_string(), "2,0.42,male,?");
    }

    #[test]
    fn from_levels_rejects_unknown_levels() {
        assert!(Passenger::from_levels("1", Some(5.0), "female", None).is_ok());
        assert!(matches!(
            Passenger::from_levels("9", Some(5.0), "female", None),
            Err(TitanicError::SchemaMismatch { attribute: "pclass", .. })
        ));
        assert!(matches!(
            Passenger::from_levels("1", Some(5.0), "f", None),
            Err(TitanicError::SchemaMismatch { attribute: "sex", .. })
        ));
        assert!(matches!(
            Passenger::from_levels("1", None, "male", Some("2")),
            Err(TitanicError::SchemaMismatch { attribute: "survived", .. })
        ));
    }

    #[test]
    fn serde_goes_through_levels() {
        let json = serde_json::to_string(&Survival::Died).unwrap();
        assert_eq!(json, "\"0\"");
        let sex: Sex = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(sex, Sex::Female);
        assert!(serde_json::from_str::<Pclass>("\"4\"").is_err());
    }

    #[test]
    fn dataset_statistics() {
        let ds = Dataset::new(vec![
            Passenger::from_levels("1", Some(10.0), "male", Some("1")).unwrap(),
            Passenger::from_levels("2", None, "female", Some("0")).unwrap(),
            Passenger::from_levels("3", Some(30.0), "male", Some("0")).unwrap(),
            Passenger::from_levels("3", Some(80.0), "male", None).unwrap(),
        ]);
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.class_counts(), [2, 1]);
        assert_eq!(ds.labelled().len(), 3);
        assert_eq!(ds.mean_age(), Some(20.0));
        assert_eq!(Dataset::default().mean_age(), None);
    }
}
