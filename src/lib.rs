pub mod clock;
pub mod config;
pub mod duration;
pub mod output;
pub mod rates;
pub mod source;
pub mod state;
pub mod sync;
