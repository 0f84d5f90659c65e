pub mod aggregate;
pub mod display;
pub mod error;
pub mod match_xg;
pub mod shot;
pub mod shot_source;
pub mod shot_store;
pub mod xg;
pub mod xg_params;
