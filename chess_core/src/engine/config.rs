use crate::logic::eval_constants::{
    MATE_SCORE, VAL_BISHOP, VAL_KING, VAL_KNIGHT, VAL_PAWN, VAL_QUEEN, VAL_ROOK, WEIGHT_MOBILITY,
};
use serde::{Deserialize, Serialize};
use shakmaty::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Evaluation Parameters
    pub val_pawn: i32,
    pub val_knight: i32,
    pub val_bishop: i32,
    pub val_rook: i32,
    pub val_queen: i32,
    pub val_king: i32,
    pub mobility_weight: i32,

    // Search Parameters
    pub mate_score: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            val_pawn: VAL_PAWN,
            val_knight: VAL_KNIGHT,
            val_bishop: VAL_BISHOP,
            val_rook: VAL_ROOK,
            val_queen: VAL_QUEEN,
            val_king: VAL_KING,
            mobility_weight: WEIGHT_MOBILITY,
            mate_score: MATE_SCORE,
        }
    }
}

/// Tuning file format: every field is an optional multiplier on the default.
#[derive(Deserialize)]
struct EngineConfigJson {
    val_pawn: Option<f32>,
    val_knight: Option<f32>,
    val_bishop: Option<f32>,
    val_rook: Option<f32>,
    val_queen: Option<f32>,
    val_king: Option<f32>,
    mobility_weight: Option<f32>,
    mate_score: Option<i32>,
}

impl EngineConfig {
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        let json_config: EngineConfigJson = serde_json::from_str(json_str)?;
        let default = Self::default();

        Ok(Self {
            val_pawn: apply_scale(default.val_pawn, json_config.val_pawn),
            val_knight: apply_scale(default.val_knight, json_config.val_knight),
            val_bishop: apply_scale(default.val_bishop, json_config.val_bishop),
            val_rook: apply_scale(default.val_rook, json_config.val_rook),
            val_queen: apply_scale(default.val_queen, json_config.val_queen),
            val_king: apply_scale(default.val_king, json_config.val_king),
            mobility_weight: apply_scale(default.mobility_weight, json_config.mobility_weight),
            mate_score: json_config.mate_score.unwrap_or(default.mate_score),
        })
    }

    #[must_use]
    pub const fn piece_value(&self, role: Role) -> i32 {
        match role {
            Role::Pawn => self.val_pawn,
            Role::Knight => self.val_knight,
            Role::Bishop => self.val_bishop,
            Role::Rook => self.val_rook,
            Role::Queen => self.val_queen,
            Role::King => self.val_king,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn apply_scale(default_val: i32, scale: Option<f32>) -> i32 {
    scale.map_or(default_val, |s| (default_val as f32 * s) as i32)
}
