pub mod cnn;
pub mod yahoo;

pub use cnn::{CnnFearGreedAdapter, FearGreedReading, GraphPayload};
pub use yahoo::YahooAdapter;
