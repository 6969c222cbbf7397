//! JSON 범용 저장소

mod store;

pub use store::{JsonStore, PAWNCTL_DIR};
