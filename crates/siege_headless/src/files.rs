//! Layout, army, config and data files.
//!
//! Layouts and armies are JSON; battle configs and stat tables are RON,
//! matching the engine's own loaders. A source that is not an existing
//! path is treated as a preset name.

use std::path::Path;

use siege_core::army::ArmyEntry;
use siege_core::config::BattleConfig;
use siege_core::data::GameData;
use siege_core::layout::{BaseLayout, LayoutData, RejectedEntry};
use tracing::{info, warn};

use crate::error::{Result, RunnerError};
use crate::presets::{army_preset, base_preset};

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RunnerError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Read a layout file without validating placements.
pub fn load_layout_data(path: &Path) -> Result<LayoutData> {
    Ok(serde_json::from_str(&read(path)?)?)
}

/// Write a layout file as pretty JSON.
pub fn save_layout_data(path: &Path, layout: &LayoutData) -> Result<()> {
    write(path, &serde_json::to_string_pretty(layout)?)
}

/// Read a layout file and place its entries.
///
/// Entries that fail placement are returned alongside the layout rather
/// than failing the load.
pub fn load_layout(path: &Path, data: GameData, grid_size: u32) -> Result<(BaseLayout, Vec<RejectedEntry>)> {
    let layout = load_layout_data(path)?;
    let (base, rejected) = BaseLayout::from_layout_data(&layout, data, grid_size);
    info!(
        path = %path.display(),
        buildings = base.structures().len(),
        walls = base.walls().len(),
        rejected = rejected.len(),
        "Loaded layout"
    );
    Ok((base, rejected))
}

/// Export a placed layout.
pub fn save_layout(path: &Path, base: &BaseLayout) -> Result<()> {
    save_layout_data(path, &base.to_layout_data())
}

/// Read an army file.
pub fn load_army(path: &Path) -> Result<Vec<ArmyEntry>> {
    let army: Vec<ArmyEntry> = serde_json::from_str(&read(path)?)?;
    info!(path = %path.display(), troops = army.len(), "Loaded army");
    Ok(army)
}

/// Write an army file.
pub fn save_army(path: &Path, army: &[ArmyEntry]) -> Result<()> {
    write(path, &serde_json::to_string_pretty(army)?)
}

/// Read a battle config from RON.
pub fn load_config(path: &Path) -> Result<BattleConfig> {
    Ok(BattleConfig::from_ron_str(&read(path)?)?)
}

/// Read stat tables from RON.
pub fn load_game_data(path: &Path) -> Result<GameData> {
    Ok(GameData::from_ron_str(&read(path)?)?)
}

/// Resolve a base from a file path or a preset name.
pub fn resolve_base(source: &str, data: GameData, grid_size: u32) -> Result<BaseLayout> {
    let path = Path::new(source);
    let (base, rejected) = if path.exists() {
        load_layout(path, data, grid_size)?
    } else {
        BaseLayout::from_layout_data(&base_preset(source)?, data, grid_size)
    };
    if !rejected.is_empty() {
        warn!(base = %source, rejected = rejected.len(), "Some layout entries were not placed");
    }
    Ok(base)
}

/// Resolve an army from a file path or a preset name.
pub fn resolve_army(source: &str) -> Result<Vec<ArmyEntry>> {
    let path = Path::new(source);
    if path.exists() {
        load_army(path)
    } else {
        army_preset(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{default_base, mixed_army};
    use tempfile::tempdir;

    #[test]
    fn test_layout_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bases/default.json");

        save_layout_data(&path, &default_base()).unwrap();
        let (base, rejected) = load_layout(&path, GameData::default(), 44).unwrap();

        assert!(rejected.is_empty());
        assert_eq!(base.to_layout_data(), default_base());
    }

    #[test]
    fn test_army_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("army.json");

        save_army(&path, &mixed_army()).unwrap();
        assert_eq!(load_army(&path).unwrap(), mixed_army());
    }

    #[test]
    fn test_layout_file_keeps_rejections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"name":"bad","buildings":[
                {"type":"town_hall","level":3,"x":10,"y":10},
                {"type":"cannon","level":1,"x":11,"y":11},
                {"type":"moat","level":1,"x":30,"y":30}
            ]}"#,
        )
        .unwrap();

        let (base, rejected) = load_layout(&path, GameData::default(), 44).unwrap();
        assert_eq!(base.structures().len(), 1);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[1].kind, "moat");
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_army(&dir.path().join("nope.json")),
            Err(RunnerError::FileNotFound(_))
        ));

        let path = dir.path().join("army.json");
        std::fs::write(&path, "[[\"barbarian\", 1]]").unwrap();
        assert!(matches!(load_army(&path), Err(RunnerError::Json(_))));
    }

    #[test]
    fn test_config_from_ron() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("battle.ron");
        std::fs::write(&path, "(max_duration_ms: 60000, snapshot_interval_ticks: 10)").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.max_duration_ms, 60_000);
        assert_eq!(config.snapshot_interval_ticks, 10);
        assert_eq!(config.tick_rate, BattleConfig::default().tick_rate);
    }

    #[test]
    fn test_game_data_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("th3.ron");
        std::fs::write(&path, GameData::default().to_ron_string().unwrap()).unwrap();
        assert_eq!(load_game_data(&path).unwrap(), GameData::default());
    }

    #[test]
    fn test_resolve_prefers_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mini.json");
        save_army(&path, &[]).unwrap();

        assert!(resolve_army(path.to_str().unwrap()).unwrap().is_empty());
        assert_eq!(resolve_army("minimal").unwrap().len(), 2);
        assert!(resolve_army("nobody").is_err());

        let base = resolve_base("minimal", GameData::default(), 44).unwrap();
        assert_eq!(base.structures().len(), 2);
    }
}
