use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::overlay::path::Band;

/// Complete module configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Module id; the socket namespace is `module.<id>`
    pub module_id: String,

    /// World setting key holding the ledger
    pub settings_key: String,

    /// Localized chat text that marks the start of an initiative process
    pub initiative_marker: String,

    pub path: PathStyle,
    pub messages: Messages,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            module_id: "move-ledger".to_string(),
            settings_key: "moveHistory".to_string(),
            initiative_marker: "Initiative Process".to_string(),
            path: PathStyle::default(),
            messages: Messages::default(),
        }
    }
}

impl ModuleConfig {
    /// Load configuration from JSON file
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ModuleConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file with pretty formatting
    pub fn save(&self, path: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_else(|_| {
            let config = Self::default();
            // Try to save the default config
            let _ = config.save(path);
            config
        })
    }

    pub fn socket_namespace(&self) -> String {
        format!("module.{}", self.module_id)
    }
}

/// Path overlay styling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStyle {
    pub line_width: f32,
    pub alpha: f32,

    /// Within battle move
    #[serde(with = "rgb_serde")]
    pub battle_color: Vec3,

    /// Within full move
    #[serde(with = "rgb_serde")]
    pub full_color: Vec3,

    /// Beyond full move
    #[serde(with = "rgb_serde")]
    pub exceeded_color: Vec3,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            line_width: 6.0,
            alpha: 0.25,
            battle_color: Vec3::new(0.0, 1.0, 0.0),
            full_color: Vec3::new(1.0, 1.0, 0.0),
            exceeded_color: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

impl PathStyle {
    pub fn color(&self, band: Band) -> Vec3 {
        match band {
            Band::Battle => self.battle_color,
            Band::Full => self.full_color,
            Band::Exceeded => self.exceeded_color,
        }
    }

    /// Band color with the overlay alpha applied
    pub fn rgba(&self, band: Band) -> [f32; 4] {
        let color = self.color(band);
        [color.x, color.y, color.z, self.alpha]
    }
}

/// User-facing notification text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub undo_done: String,
    pub nothing_to_undo: String,
    pub token_missing: String,
    pub history_cleared: String,
    pub combat_ended: String,
    /// `{round}` is replaced with the new round number
    pub round_reset: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            undo_done: "Movement undone".to_string(),
            nothing_to_undo: "No movement to undo".to_string(),
            token_missing: "Token not found".to_string(),
            history_cleared: "All movement history cleared".to_string(),
            combat_ended: "Combat ended: all movement history cleared".to_string(),
            round_reset: "Round {round}: movement history reset".to_string(),
        }
    }
}

impl Messages {
    pub fn round_reset(&self, round: u32) -> String {
        self.round_reset.replace("{round}", &round.to_string())
    }
}

/// Custom serialization for RGB colors
mod rgb_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct RgbData {
        r: f32,
        g: f32,
        b: f32,
    }

    pub fn serialize<S>(vec: &Vec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        RgbData {
            r: vec.x,
            g: vec.y,
            b: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = RgbData::deserialize(deserializer)?;
        Ok(Vec3::new(data.r, data.g, data.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModuleConfig::default();
        assert_eq!(config.path.line_width, 6.0);
        assert_eq!(config.path.alpha, 0.25);
        assert_eq!(config.socket_namespace(), "module.move-ledger");
        assert_eq!(config.path.rgba(Band::Full), [1.0, 1.0, 0.0, 0.25]);
    }

    #[test]
    fn test_round_message() {
        let messages = Messages::default();
        assert_eq!(messages.round_reset(4), "Round 4: movement history reset");
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("move-ledger.json");
        let path = path.to_str().unwrap();

        let mut config = ModuleConfig::default();
        config.initiative_marker = "Proceso de iniciativa".to_string();
        config.save(path).unwrap();
        let loaded = ModuleConfig::load(path).unwrap();

        assert_eq!(loaded.initiative_marker, "Proceso de iniciativa");
        assert_eq!(loaded.path.exceeded_color, config.path.exceeded_color);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ModuleConfig = serde_json::from_str(r#"{"module_id":"dx3rd-move"}"#).unwrap();
        assert_eq!(config.module_id, "dx3rd-move");
        assert_eq!(config.settings_key, "moveHistory");
        assert_eq!(config.messages.undo_done, "Movement undone");
    }
}
