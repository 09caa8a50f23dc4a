pub(crate) mod bootstrap;
mod gameplay;
mod input_script;
pub(crate) mod loop_runner;
