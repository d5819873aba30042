pub mod control;
pub mod run;
pub mod setup;
pub mod status;
