pub mod ema;

pub use ema::{last_crossover, Crossover, Ema};
