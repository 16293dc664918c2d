mod bootstrap;
mod config;
mod loop_runner;
mod physics;
mod world;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
