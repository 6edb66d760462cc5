//! Army schema.
//!
//! An army file is a list of `[type, level, [x, y]]` triples. Each entry
//! becomes one troop at deployment.

use serde::{Deserialize, Serialize};

use crate::data::GameData;
use crate::error::Result;
use crate::math::Vec2Fixed;
use crate::troops::{Troop, TroopKind};

/// One troop in an army: kind identifier, level and deployment point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmyEntry(pub String, pub u8, pub (f64, f64));

impl ArmyEntry {
    /// Entry for a known kind.
    #[must_use]
    pub fn new(kind: TroopKind, level: u8, position: (f64, f64)) -> Self {
        Self(kind.as_str().to_string(), level, position)
    }

    /// Kind identifier as written.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        &self.0
    }

    /// Level.
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.1
    }

    /// Parsed kind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SiegeError::UnknownTroopKind`] for unknown identifiers.
    pub fn kind(&self) -> Result<TroopKind> {
        self.0.parse()
    }

    /// Deployment point in tiles.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        Vec2Fixed::from_f64(self.2 .0, self.2 .1)
    }

    /// Instantiate the troop.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown kinds or levels.
    pub fn to_troop(&self, data: &GameData) -> Result<Troop> {
        Troop::new(self.kind()?, self.1, self.position(), data)
    }
}

/// Housing space used by the valid entries of an army.
#[must_use]
pub fn housing_total(army: &[ArmyEntry], data: &GameData) -> u32 {
    army.iter()
        .filter_map(|entry| data.troop_stats(entry.kind().ok()?, entry.level()).ok())
        .map(|stats| stats.housing)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiegeError;

    #[test]
    fn test_json_shape() {
        let army = vec![
            ArmyEntry::new(TroopKind::Barbarian, 1, (2.0, 3.5)),
            ArmyEntry::new(TroopKind::WallBreaker, 1, (0.0, 0.0)),
        ];
        let json = serde_json::to_string(&army).unwrap();
        assert_eq!(json, r#"[["barbarian",1,[2.0,3.5]],["wall_breaker",1,[0.0,0.0]]]"#);
        let parsed: Vec<ArmyEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, army);
    }

    #[test]
    fn test_to_troop() {
        let data = GameData::default();
        let troop = ArmyEntry::new(TroopKind::Giant, 1, (1.5, 2.0)).to_troop(&data).unwrap();
        assert_eq!(troop.kind, TroopKind::Giant);
        assert_eq!(troop.position, Vec2Fixed::from_f64(1.5, 2.0));

        let unknown = ArmyEntry("dragon".into(), 1, (0.0, 0.0));
        assert!(matches!(unknown.to_troop(&data), Err(SiegeError::UnknownTroopKind(_))));
        let bad_level = ArmyEntry::new(TroopKind::Giant, 9, (0.0, 0.0));
        assert!(matches!(bad_level.to_troop(&data), Err(SiegeError::UnknownLevel { .. })));
    }

    #[test]
    fn test_housing_total_skips_invalid() {
        let army = vec![
            ArmyEntry::new(TroopKind::Giant, 1, (0.0, 0.0)),
            ArmyEntry::new(TroopKind::Archer, 1, (0.0, 0.0)),
            ArmyEntry("dragon".into(), 1, (0.0, 0.0)),
        ];
        assert_eq!(housing_total(&army, &GameData::default()), 6);
    }
}
