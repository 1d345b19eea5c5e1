pub mod position_index;
