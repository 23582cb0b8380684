pub mod captures;
pub mod clock;
pub mod eval_constants;
pub mod game;
pub mod position;
pub mod rules;
