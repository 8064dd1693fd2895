pub mod color;

pub use color::{ColorRecord, Rgb};
