//! Minimal erythema dose (MED) reference table.
//!
//! Maps each skin class to the dose, in SED (1 SED = 100 J/m²), that produces
//! just-perceptible reddening. The values are representative and very
//! approximate; deployments can override them through the `[med]` section of
//! the config file.

use crate::{Error, Result, SkinClass};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Cached reference table - built once and shared by every evaluation
static DEFAULT_MED_TABLE: Lazy<MedTable> = Lazy::new(MedTable::reference);

/// Get a reference to the cached reference table
pub fn default_med_table() -> &'static MedTable {
    &DEFAULT_MED_TABLE
}

/// Immutable skin class → MED (SED) lookup
#[derive(Clone, Debug, PartialEq)]
pub struct MedTable {
    entries: BTreeMap<SkinClass, f64>,
}

impl MedTable {
    /// Representative MED values by skin class
    pub fn reference() -> Self {
        let entries = [
            (SkinClass::I, 2.5),
            (SkinClass::II, 3.5),
            (SkinClass::III, 4.5),
            (SkinClass::IV, 6.0),
            (SkinClass::V, 8.0),
            (SkinClass::VI, 12.0),
        ]
        .into_iter()
        .collect();

        Self { entries }
    }

    /// Build a table from explicit entries
    ///
    /// Every value must be finite and strictly positive.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (SkinClass, f64)>,
    {
        let mut table = Self {
            entries: BTreeMap::new(),
        };
        for (class, med) in entries {
            table = table.with_override(class, med)?;
        }
        Ok(table)
    }

    /// Return a copy of this table with one class replaced
    pub fn with_override(mut self, class: SkinClass, med_sed: f64) -> Result<Self> {
        if !(med_sed.is_finite() && med_sed > 0.0) {
            return Err(Error::Config(format!(
                "MED for skin class {} must be positive, got {}",
                class, med_sed
            )));
        }
        self.entries.insert(class, med_sed);
        Ok(self)
    }

    /// MED in SED for a skin class
    pub fn med_sed(&self, class: SkinClass) -> Result<f64> {
        self.entries
            .get(&class)
            .copied()
            .ok_or_else(|| Error::UnknownSkinClass(class.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkinClass, f64)> + '_ {
        self.entries.iter().map(|(class, med)| (*class, *med))
    }
}

impl Default for MedTable {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_covers_every_class() {
        let table = default_med_table();
        for class in SkinClass::ALL {
            let med = table.med_sed(class).unwrap();
            assert!(med > 0.0, "class {} has non-positive MED", class);
        }
        assert_eq!(table.med_sed(SkinClass::III).unwrap(), 4.5);
    }

    #[test]
    fn test_reference_is_ordered_by_sensitivity() {
        let meds: Vec<f64> = default_med_table().iter().map(|(_, med)| med).collect();
        assert!(meds.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_override_rejects_non_positive() {
        let result = MedTable::reference().with_override(SkinClass::I, 0.0);
        assert!(matches!(result, Err(Error::Config(_))));

        let result = MedTable::reference().with_override(SkinClass::I, f64::INFINITY);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_table_reports_unknown_class() {
        let table = MedTable::from_entries([(SkinClass::II, 3.0)]).unwrap();
        assert_eq!(table.med_sed(SkinClass::II).unwrap(), 3.0);
        assert!(matches!(
            table.med_sed(SkinClass::V),
            Err(Error::UnknownSkinClass(s)) if s == "V"
        ));
    }
}
