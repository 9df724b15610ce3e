pub mod player;

pub use player::{ClockPlayer, MediaPlayer, PlayerEvent};
