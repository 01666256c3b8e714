pub mod import;
pub mod progress;
pub mod quiz;
pub mod reset;
