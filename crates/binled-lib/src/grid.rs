//! Bin grid — maps a (category, store) pair to a device index.
//!
//! The array is laid out store-major: each store owns a run of
//! `Category::COUNT` consecutive LEDs, in the fixed category order below.
//! One extra bin sits outside the grid: South GR backstock, wired to the
//! last LED of the 25-output array.

use std::fmt;

use serde::Serialize;

use crate::error::{BinledError, Result};

/// Canonical integer address of one LED position.
pub type DeviceIndex = usize;

/// Device index of the South GR backstock bin.
pub const OVERFLOW_INDEX: DeviceIndex = 24;

/// Normalized label of the overflow bin's category.
pub const OVERFLOW_CATEGORY: &str = "BACKSTOCK";

/// Normalized label of the overflow bin's store.
pub const OVERFLOW_STORE: &str = "SOUTH GR";

/// Trim, uppercase, and fold `" AND "` into `" & "`.
///
/// The fold runs after uppercasing, so `"Snacks and Candy"` matches too.
pub fn normalize(label: &str) -> String {
    label.trim().to_uppercase().replace(" AND ", " & ")
}

// ── Category ──

/// Product category. Declaration order is the bit-offset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    MiscOther,
    HbaHousehold,
    Drinks,
    PetSupplies,
    SnacksCandy,
    PantryBreakfast,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::MiscOther,
        Category::HbaHousehold,
        Category::Drinks,
        Category::PetSupplies,
        Category::SnacksCandy,
        Category::PantryBreakfast,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Normalized label, as matched against caller input.
    pub fn label(self) -> &'static str {
        match self {
            Category::MiscOther => "MISC/OTHER",
            Category::HbaHousehold => "HBA & HOUSEHOLD",
            Category::Drinks => "DRINKS",
            Category::PetSupplies => "PET SUPPLIES",
            Category::SnacksCandy => "SNACKS & CANDY",
            Category::PantryBreakfast => "PANTRY & BREAKFAST",
        }
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    /// Look up a category by label, normalizing first.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = normalize(label);
        Self::ALL.into_iter().find(|c| c.label() == wanted)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Store ──

/// Store location. Declaration order is the bit-offset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Store {
    SouthGr,
    Muskegon,
    NortonShores,
    Wyoming,
}

impl Store {
    pub const ALL: [Store; 4] = [
        Store::SouthGr,
        Store::Muskegon,
        Store::NortonShores,
        Store::Wyoming,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn label(self) -> &'static str {
        match self {
            Store::SouthGr => "SOUTH GR",
            Store::Muskegon => "MUSKEGON",
            Store::NortonShores => "NORTON SHORES",
            Store::Wyoming => "WYOMING",
        }
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = normalize(label);
        Self::ALL.into_iter().find(|s| s.label() == wanted)
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Addresses ──

/// A resolved bin: either a cell of the category × store grid, or the overflow bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinAddress {
    Grid { category: Category, store: Store },
    Overflow,
}

impl BinAddress {
    /// Parse a raw (category, store) pair.
    ///
    /// The overflow pair is checked before the grid lookup. Anything else
    /// that is not on the grid fails with `UnknownAddress`.
    pub fn parse(category: &str, store: &str) -> Result<Self> {
        let (cu, su) = (normalize(category), normalize(store));
        if cu == OVERFLOW_CATEGORY && su == OVERFLOW_STORE {
            return Ok(BinAddress::Overflow);
        }
        match (Category::from_label(&cu), Store::from_label(&su)) {
            (Some(category), Some(store)) => Ok(BinAddress::Grid { category, store }),
            _ => Err(BinledError::UnknownAddress {
                category: category.to_string(),
                store: store.to_string(),
            }),
        }
    }

    pub fn index(self) -> DeviceIndex {
        match self {
            BinAddress::Grid { category, store } => store.rank() * Category::COUNT + category.rank(),
            BinAddress::Overflow => OVERFLOW_INDEX,
        }
    }

    /// Normalized (category, store) labels for this bin.
    pub fn labels(self) -> (&'static str, &'static str) {
        match self {
            BinAddress::Grid { category, store } => (category.label(), store.label()),
            BinAddress::Overflow => (OVERFLOW_CATEGORY, OVERFLOW_STORE),
        }
    }

    /// Every addressable bin, grid cells in index order followed by the overflow bin.
    pub fn all() -> Vec<BinAddress> {
        let mut bins: Vec<BinAddress> = Store::ALL
            .into_iter()
            .flat_map(|store| {
                Category::ALL
                    .into_iter()
                    .map(move |category| BinAddress::Grid { category, store })
            })
            .collect();
        bins.push(BinAddress::Overflow);
        bins
    }
}

/// Resolve a raw (category, store) pair to its device index.
pub fn resolve_address(category: &str, store: &str) -> Result<DeviceIndex> {
    BinAddress::parse(category, store).map(BinAddress::index)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── normalize ──

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize("  drinks \t"), "DRINKS");
    }

    #[test]
    fn normalize_folds_and_into_ampersand() {
        assert_eq!(normalize("Snacks and Candy"), "SNACKS & CANDY");
        assert_eq!(normalize("pantry AND breakfast"), "PANTRY & BREAKFAST");
    }

    #[test]
    fn normalize_leaves_embedded_and_alone() {
        // Only the space-delimited word is folded.
        assert_eq!(normalize("Sandy Andover"), "SANDY ANDOVER");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["  hba and household ", "Norton Shores", "misc/other", "x AND y"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    // ── resolve_address ──

    #[test]
    fn overflow_pair_resolves_to_24() {
        assert_eq!(resolve_address("backstock", "south gr").unwrap(), 24);
        assert_eq!(resolve_address("  BackStock ", "South GR").unwrap(), 24);
    }

    #[test]
    fn drinks_wyoming_is_20() {
        assert_eq!(resolve_address("Drinks", "Wyoming").unwrap(), 20);
    }

    #[test]
    fn full_grid_matches_store_major_formula() {
        for store in Store::ALL {
            for category in Category::ALL {
                let idx = resolve_address(category.label(), store.label()).unwrap();
                assert_eq!(idx, store.rank() * 6 + category.rank());
            }
        }
    }

    #[test]
    fn grid_indices_are_unique_and_below_overflow() {
        let mut seen: Vec<usize> = BinAddress::all().into_iter().map(BinAddress::index).collect();
        let n = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), n);
        assert_eq!(seen, (0..=24).collect::<Vec<_>>());
    }

    #[test]
    fn variants_resolve_like_canonical_labels() {
        let pairs = [
            ("snacks and candy", "norton shores", "SNACKS & CANDY", "NORTON SHORES"),
            (" HBA AND Household", "muskegon ", "HBA & HOUSEHOLD", "MUSKEGON"),
            ("pantry & breakfast", "SOUTH GR", "PANTRY & BREAKFAST", "SOUTH GR"),
        ];
        for (c, s, cn, sn) in pairs {
            assert_eq!(
                resolve_address(c, s).unwrap(),
                resolve_address(&normalize(c), &normalize(s)).unwrap()
            );
            assert_eq!(resolve_address(c, s).unwrap(), resolve_address(cn, sn).unwrap());
        }
    }

    #[test]
    fn unknown_category_fails() {
        let err = resolve_address("Frozen", "Wyoming").unwrap_err();
        assert!(matches!(
            err,
            BinledError::UnknownAddress { ref category, ref store }
                if category == "Frozen" && store == "Wyoming"
        ));
    }

    #[test]
    fn unknown_store_fails() {
        assert!(resolve_address("Drinks", "Grandville").is_err());
    }

    #[test]
    fn backstock_only_exists_at_south_gr() {
        let err = resolve_address("Backstock", "Muskegon").unwrap_err();
        assert!(matches!(err, BinledError::UnknownAddress { .. }));
    }

    #[test]
    fn empty_labels_fail() {
        assert!(resolve_address("", "").is_err());
        assert!(resolve_address("   ", "Wyoming").is_err());
    }

    #[test]
    fn labels_round_trip_through_parse() {
        for bin in BinAddress::all() {
            let (c, s) = bin.labels();
            assert_eq!(BinAddress::parse(c, s).unwrap(), bin);
        }
    }

    #[test]
    fn category_from_label_ignores_case() {
        assert_eq!(Category::from_label("pet supplies"), Some(Category::PetSupplies));
        assert_eq!(Category::from_label("backstock"), None);
    }
}
