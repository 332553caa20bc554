pub mod assets;
pub mod common;
pub mod drain;
pub mod pending;
pub mod run;
pub mod submit;
pub mod worker;
