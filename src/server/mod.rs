pub mod handler;

pub use handler::{AppState, serve};
