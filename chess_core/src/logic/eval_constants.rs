use shakmaty::Role;

// Piece Values
pub const VAL_PAWN: i32 = 100;
pub const VAL_KNIGHT: i32 = 320;
pub const VAL_BISHOP: i32 = 330;
pub const VAL_ROOK: i32 = 500;
pub const VAL_QUEEN: i32 = 900;
pub const VAL_KING: i32 = 20_000;

pub const MATE_SCORE: i32 = 100_000;

/// Weight applied to the side-to-move's legal move count.
pub const WEIGHT_MOBILITY: i32 = 3;

pub const fn get_piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => VAL_PAWN,
        Role::Knight => VAL_KNIGHT,
        Role::Bishop => VAL_BISHOP,
        Role::Rook => VAL_ROOK,
        Role::Queen => VAL_QUEEN,
        Role::King => VAL_KING,
    }
}

