//! Game Configuration
//!
//! File-facing settings in human units (seconds, world units). Every field
//! has a default, so a config file only needs the values it overrides.
//! [`GameConfig::compile`] validates the settings and converts them once
//! into the tick/fixed-point [`SessionConfig`] the simulation runs on.
//!
//! ```json
//! {
//!   "streaming": { "lanes_ahead": 12 },
//!   "lanes": { "road": { "speed": 4.5 } },
//!   "stamina": { "interval_secs": 0.5 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::info;

use crate::core::fixed::{to_fixed, secs_to_ticks};
use crate::core::vec2::FixedVec2;
use crate::game::coordinator::CoordinatorConfig;
use crate::game::movement::MovementConfig;
use crate::game::probe::ProbeConfig;
use crate::game::spawner::{LaneRules, LaneTable, SpawnArea, SpawnEdge};
use crate::game::state::{EntityKind, LaneType};
use crate::game::streamer::StreamerConfig;
use crate::game::tick::SessionConfig;
use crate::game::world::{ColliderShape, ShapeTable};

/// Largest magnitude a world-space setting may have before fixed-point
/// arithmetic on positions could overflow.
const MAX_WORLD_UNITS: f64 = 1000.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid JSON for this schema
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Player stepping and gesture recognition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Length of one step
    pub step: f64,
    /// Seconds a step takes
    pub move_time_secs: f64,
    /// Gestures shorter than this many pixels are taps
    pub tap_threshold_px: u32,
    /// Radius of the destination overlap check
    pub probe_radius: f64,
    /// Tag that always blocks a step
    pub obstacle_tag: Option<EntityKind>,
    /// Physics layers that always block a step
    pub obstacle_layers: Vec<u8>,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            step: 1.0,
            move_time_secs: 0.1,
            tap_threshold_px: 20,
            probe_radius: 0.4,
            obstacle_tag: Some(EntityKind::Obstacle),
            obstacle_layers: Vec::new(),
        }
    }
}

/// Lane window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Height of a lane row
    pub lane_height: f64,
    /// Lanes kept ahead of the player
    pub lanes_ahead: i32,
    /// Lanes kept behind the player
    pub lanes_behind: i32,
    /// First lane of the initial fill
    pub initial_offset: i32,
    /// Lane types new lanes are drawn from; the first fills the start area
    pub palette: Vec<LaneType>,
    /// Keep static hazards out of the player's start column
    pub keep_start_column_clear: bool,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            lane_height: 1.0,
            lanes_ahead: 10,
            lanes_behind: 5,
            initial_offset: -5,
            palette: LaneType::ALL.to_vec(),
            keep_start_column_clear: true,
        }
    }
}

/// Spawn rules for one lane type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneProfile {
    /// Hazard kind, or `null` for an empty lane
    pub obstacle: Option<EntityKind>,
    /// Seconds between moving spawns
    pub spawn_interval_secs: f64,
    /// Live hazard cap
    pub max_obstacles: u32,
    /// Hazard speed (units per second)
    pub speed: f64,
    /// Edge moving hazards enter from
    pub spawn_edge: SpawnEdge,
    /// Pickup chance when the lane appears (0-100)
    pub item_percent: u32,
}

impl Default for LaneProfile {
    fn default() -> Self {
        Self {
            obstacle: None,
            spawn_interval_secs: 2.0,
            max_obstacles: 3,
            speed: 3.0,
            spawn_edge: SpawnEdge::Left,
            item_percent: 0,
        }
    }
}

impl LaneProfile {
    /// Static hazards topped up in place.
    pub fn grass() -> Self {
        Self {
            obstacle: Some(EntityKind::Obstacle),
            speed: 0.0,
            ..Self::default()
        }
    }

    /// Cars from the left.
    pub fn road() -> Self {
        Self {
            obstacle: Some(EntityKind::Car),
            item_percent: 20,
            ..Self::default()
        }
    }

    /// Slower logs from the right.
    pub fn river() -> Self {
        Self {
            obstacle: Some(EntityKind::Log),
            speed: 2.0,
            spawn_edge: SpawnEdge::Right,
            item_percent: 20,
            ..Self::default()
        }
    }

    /// One fast train at a time.
    pub fn rail() -> Self {
        Self {
            obstacle: Some(EntityKind::Train),
            spawn_interval_secs: 4.0,
            max_obstacles: 1,
            speed: 8.0,
            item_percent: 10,
            ..Self::default()
        }
    }
}

/// Profiles for every lane type.
///
/// A profile given in a config file is laid over that lane type's own
/// defaults, so `"road": { "speed": 4.5 }` still spawns cars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneSettings {
    /// Static hazards
    #[serde(deserialize_with = "grass_profile")]
    pub grass: LaneProfile,
    /// Cars
    #[serde(deserialize_with = "road_profile")]
    pub road: LaneProfile,
    /// Logs
    #[serde(deserialize_with = "river_profile")]
    pub river: LaneProfile,
    /// Trains
    #[serde(deserialize_with = "rail_profile")]
    pub rail: LaneProfile,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            grass: LaneProfile::grass(),
            road: LaneProfile::road(),
            river: LaneProfile::river(),
            rail: LaneProfile::rail(),
        }
    }
}

/// Deserialize a partial profile on top of `base`.
fn overlay_profile<'de, D>(base: LaneProfile, deserializer: D) -> Result<LaneProfile, D::Error>
where
    D: Deserializer<'de>,
{
    let patch = serde_json::Value::deserialize(deserializer)?;
    let base = serde_json::to_value(base).map_err(D::Error::custom)?;

    let merged = match (base, patch) {
        (serde_json::Value::Object(mut fields), serde_json::Value::Object(overrides)) => {
            fields.extend(overrides);
            serde_json::Value::Object(fields)
        }
        (_, other) => other,
    };

    serde_json::from_value(merged).map_err(D::Error::custom)
}

fn grass_profile<'de, D: Deserializer<'de>>(d: D) -> Result<LaneProfile, D::Error> {
    overlay_profile(LaneProfile::grass(), d)
}

fn road_profile<'de, D: Deserializer<'de>>(d: D) -> Result<LaneProfile, D::Error> {
    overlay_profile(LaneProfile::road(), d)
}

fn river_profile<'de, D: Deserializer<'de>>(d: D) -> Result<LaneProfile, D::Error> {
    overlay_profile(LaneProfile::river(), d)
}

fn rail_profile<'de, D: Deserializer<'de>>(d: D) -> Result<LaneProfile, D::Error> {
    overlay_profile(LaneProfile::rail(), d)
}

impl LaneSettings {
    fn profiles(&self) -> [(LaneType, &LaneProfile); 4] {
        [
            (LaneType::Grass, &self.grass),
            (LaneType::Road, &self.road),
            (LaneType::River, &self.river),
            (LaneType::Rail, &self.rail),
        ]
    }
}

/// Collider half extents for one kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeSettings {
    /// Half width
    pub half_x: f64,
    /// Half height
    pub half_y: f64,
    /// Physics layer (0-31)
    #[serde(default)]
    pub layer: u8,
}

impl ShapeSettings {
    const fn new(half_x: f64, half_y: f64) -> Self {
        Self { half_x, half_y, layer: 0 }
    }

    fn build(&self) -> ColliderShape {
        ColliderShape::new(to_fixed(self.half_x), to_fixed(self.half_y)).on_layer(self.layer)
    }
}

/// Corridor extents and collider sizes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// |x| past which moving hazards are removed
    pub destroy_distance: f64,
    /// |x| where moving hazards enter
    pub spawn_offset: f64,
    /// Static hazards and pickups use integer x in [-span, span]
    pub hazard_span: i32,
    /// Player spawn x
    pub start_x: f64,
    /// Player spawn y
    pub start_y: f64,
    /// Player collider
    pub player: ShapeSettings,
    /// Static hazard collider
    pub obstacle: ShapeSettings,
    /// Car collider
    pub car: ShapeSettings,
    /// Train collider
    pub train: ShapeSettings,
    /// Log collider
    pub log: ShapeSettings,
    /// Pickup collider
    pub item: ShapeSettings,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            destroy_distance: 20.0,
            spawn_offset: 10.0,
            hazard_span: 10,
            start_x: 0.0,
            start_y: 0.0,
            player: ShapeSettings::new(0.4, 0.4),
            obstacle: ShapeSettings::new(0.45, 0.45),
            car: ShapeSettings::new(0.9, 0.4),
            train: ShapeSettings::new(2.0, 0.4),
            log: ShapeSettings::new(1.2, 0.4),
            item: ShapeSettings::new(0.3, 0.3),
        }
    }
}

impl WorldSettings {
    fn shapes(&self) -> [(&'static str, &ShapeSettings); 6] {
        [
            ("world.player", &self.player),
            ("world.obstacle", &self.obstacle),
            ("world.car", &self.car),
            ("world.train", &self.train),
            ("world.log", &self.log),
            ("world.item", &self.item),
        ]
    }
}

/// Stamina drain and pickups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaminaSettings {
    /// Seconds between one-point drains
    pub interval_secs: f64,
    /// Stamina restored per pickup
    pub item_restore: i32,
}

impl Default for StaminaSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            item_restore: 30,
        }
    }
}

/// Persistence keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Key the high score is stored under
    pub high_score_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            high_score_key: "HighScore".to_string(),
        }
    }
}

/// Camera follow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Camera height relative to the player
    pub offset_y: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self { offset_y: -2.0 }
    }
}

// =============================================================================
// ROOT
// =============================================================================

/// Complete game configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Player stepping
    pub movement: MovementSettings,
    /// Lane window
    pub streaming: StreamingSettings,
    /// Per-lane spawn rules
    pub lanes: LaneSettings,
    /// Corridor and colliders
    pub world: WorldSettings,
    /// Stamina
    pub stamina: StaminaSettings,
    /// Persistence
    pub storage: StorageSettings,
    /// Camera
    pub camera: CameraSettings,
}

impl GameConfig {
    /// Parse JSON text. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Validate and convert to runtime form.
    pub fn compile(&self) -> Result<SessionConfig, ConfigError> {
        self.validate()?;
        Ok(self.build())
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.movement;
        check_positive("movement.step", m.step)?;
        check_non_negative("movement.move_time_secs", m.move_time_secs)?;
        check_non_negative("movement.probe_radius", m.probe_radius)?;
        if let Some(&layer) = m.obstacle_layers.iter().find(|&&l| l >= 32) {
            return Err(invalid("movement.obstacle_layers", format!("layer {layer} is not in 0..32")));
        }

        let s = &self.streaming;
        check_positive("streaming.lane_height", s.lane_height)?;
        if s.lanes_ahead <= 0 {
            return Err(invalid("streaming.lanes_ahead", "must be at least 1"));
        }
        if s.lanes_behind < 0 {
            return Err(invalid("streaming.lanes_behind", "must not be negative"));
        }
        for (field, lanes) in [
            ("streaming.lanes_ahead", s.lanes_ahead),
            ("streaming.lanes_behind", s.lanes_behind),
        ] {
            let span = lanes as f64 * s.lane_height;
            if span > MAX_WORLD_UNITS {
                return Err(invalid(field, format!("spans {span} units, more than {MAX_WORLD_UNITS}")));
            }
        }
        if s.initial_offset > 0 {
            return Err(invalid("streaming.initial_offset", "must not be positive"));
        }
        if s.palette.is_empty() {
            return Err(invalid("streaming.palette", "needs at least one lane type"));
        }

        for (lane_type, profile) in self.lanes.profiles() {
            let moving = lane_type != LaneType::Grass && profile.obstacle.is_some();
            if moving {
                check_positive("lanes.*.spawn_interval_secs", profile.spawn_interval_secs)?;
            }
            check_non_negative("lanes.*.speed", profile.speed)?;
            if profile.item_percent > 100 {
                return Err(invalid("lanes.*.item_percent", format!("{} is over 100", profile.item_percent)));
            }
            if profile.obstacle == Some(EntityKind::Player) {
                return Err(invalid("lanes.*.obstacle", "lanes cannot spawn players"));
            }
        }

        let w = &self.world;
        check_positive("world.spawn_offset", w.spawn_offset)?;
        if w.destroy_distance <= w.spawn_offset {
            return Err(invalid("world.destroy_distance", "must exceed world.spawn_offset"));
        }
        check_world_units("world.destroy_distance", w.destroy_distance)?;
        check_world_units("world.start_x", w.start_x)?;
        check_world_units("world.start_y", w.start_y)?;
        if w.hazard_span < 0 {
            return Err(invalid("world.hazard_span", "must not be negative"));
        }
        for (field, shape) in w.shapes() {
            check_positive(field, shape.half_x)?;
            check_positive(field, shape.half_y)?;
            if shape.layer >= 32 {
                return Err(invalid(field, format!("layer {} is not in 0..32", shape.layer)));
            }
        }

        check_positive("stamina.interval_secs", self.stamina.interval_secs)?;
        if self.storage.high_score_key.is_empty() {
            return Err(invalid("storage.high_score_key", "must not be empty"));
        }

        Ok(())
    }

    /// Convert without validating.
    pub(crate) fn build(&self) -> SessionConfig {
        let m = &self.movement;
        let w = &self.world;

        let mut lanes = LaneTable::new();
        for (lane_type, profile) in self.lanes.profiles() {
            lanes.insert(
                lane_type,
                LaneRules {
                    obstacle: profile.obstacle,
                    spawn_interval_ticks: secs_to_ticks(profile.spawn_interval_secs),
                    max_obstacles: profile.max_obstacles,
                    speed: to_fixed(profile.speed),
                    spawn_edge: profile.spawn_edge,
                    item_percent: profile.item_percent,
                },
            );
        }

        SessionConfig {
            movement: MovementConfig {
                step: to_fixed(m.step),
                move_ticks: secs_to_ticks(m.move_time_secs),
                tap_threshold_px: m.tap_threshold_px,
            },
            probe: ProbeConfig {
                radius: to_fixed(m.probe_radius),
                obstacle_tag: m.obstacle_tag,
                obstacle_layers: layer_mask(&m.obstacle_layers),
            },
            streamer: StreamerConfig {
                lane_height: to_fixed(self.streaming.lane_height),
                lanes_ahead: self.streaming.lanes_ahead,
                lanes_behind: self.streaming.lanes_behind,
                initial_offset: self.streaming.initial_offset,
                palette: self.streaming.palette.clone(),
                keep_start_column_clear: self.streaming.keep_start_column_clear,
            },
            lanes,
            area: SpawnArea {
                spawn_offset: to_fixed(w.spawn_offset),
                hazard_span: w.hazard_span,
            },
            shapes: ShapeTable {
                player: w.player.build(),
                obstacle: w.obstacle.build(),
                car: w.car.build(),
                train: w.train.build(),
                log: w.log.build(),
                item: w.item.build(),
            },
            destroy_distance: to_fixed(w.destroy_distance),
            coordinator: CoordinatorConfig {
                stamina_interval_ticks: secs_to_ticks(self.stamina.interval_secs),
                high_score_key: self.storage.high_score_key.clone(),
            },
            item_restore: self.stamina.item_restore,
            camera_offset: to_fixed(self.camera.offset_y),
            player_start: FixedVec2::new(to_fixed(w.start_x), to_fixed(w.start_y)),
        }
    }
}

fn layer_mask(layers: &[u8]) -> u32 {
    layers
        .iter()
        .filter(|&&layer| layer < 32)
        .fold(0u32, |mask, &layer| mask | (1u32 << layer))
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value <= 0.0 {
        return Err(invalid(field, format!("{value} must be positive")));
    }
    check_world_units(field, value)
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < 0.0 {
        return Err(invalid(field, format!("{value} must not be negative")));
    }
    check_world_units(field, value)
}

fn check_world_units(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value.abs() > MAX_WORLD_UNITS {
        return Err(invalid(field, format!("{value} is outside ±{MAX_WORLD_UNITS}")));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_ONE, from_int};

    #[test]
    fn test_defaults_compile() {
        let config = GameConfig::default().compile().unwrap();

        assert_eq!(config.movement.step, FIXED_ONE);
        assert_eq!(config.movement.move_ticks, 6);
        assert_eq!(config.movement.tap_threshold_px, 20);
        assert_eq!(config.streamer.lanes_ahead, 10);
        assert_eq!(config.streamer.lanes_behind, 5);
        assert_eq!(config.streamer.palette[0], LaneType::Grass);
        assert_eq!(config.coordinator.stamina_interval_ticks, 60);
        assert_eq!(config.coordinator.high_score_key, "HighScore");
        assert_eq!(config.destroy_distance, from_int(20));
        assert_eq!(config.item_restore, 30);

        let road = config.lanes.get(LaneType::Road).unwrap();
        assert_eq!(road.spawn_interval_ticks, 120);
        assert_eq!(road.max_obstacles, 3);
        assert_eq!(road.speed, from_int(3));
        assert_eq!(road.obstacle, Some(EntityKind::Car));

        let river = config.lanes.get(LaneType::River).unwrap();
        assert_eq!(river.speed, from_int(2));
        assert_eq!(river.spawn_edge, SpawnEdge::Right);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(
            r#"{
                "streaming": { "lanes_ahead": 12 },
                "lanes": { "road": { "speed": 4.5 } },
                "movement": { "obstacle_layers": [3, 5] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.streaming.lanes_ahead, 12);
        assert_eq!(config.streaming.lanes_behind, 5);
        assert_eq!(config.lanes.road.speed, 4.5);
        assert_eq!(config.lanes.road.max_obstacles, 3);
        assert_eq!(config.lanes.road.obstacle, Some(EntityKind::Car));
        assert_eq!(config.lanes.river, LaneProfile::river());

        let compiled = config.compile().unwrap();
        assert_eq!(compiled.probe.obstacle_layers, (1 << 3) | (1 << 5));
    }

    #[test]
    fn test_lane_type_and_edge_names() {
        let config = GameConfig::from_json_str(
            r#"{
                "streaming": { "palette": ["Road", "River"] },
                "lanes": { "river": { "obstacle": "Log", "spawn_edge": "left" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.streaming.palette, vec![LaneType::Road, LaneType::River]);
        assert_eq!(config.lanes.river.spawn_edge, SpawnEdge::Left);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = GameConfig::default();
        config.streaming.lanes_ahead = 0;
        assert!(matches!(
            config.compile(),
            Err(ConfigError::Invalid { field: "streaming.lanes_ahead", .. })
        ));

        let mut config = GameConfig::default();
        config.streaming.palette.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "streaming.palette", .. })
        ));

        let mut config = GameConfig::default();
        config.streaming.lane_height = 0.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.streaming.lane_height = 200.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "streaming.lanes_ahead", .. })
        ));

        let mut config = GameConfig::default();
        config.world.destroy_distance = 5.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.lanes.road.item_percent = 101;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.movement.obstacle_layers = vec![40];
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.stamina.interval_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            GameConfig::from_json_str("{ \"streaming\": 3 }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GameConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
