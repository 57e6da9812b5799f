pub mod decisions;
pub mod hub;
pub mod producer;
pub mod ws;

pub use hub::{Frame, Hub};
pub use producer::{Producer, Tick};
