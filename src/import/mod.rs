pub mod game_record;
pub mod converter;
