pub mod app;
pub mod classify;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod memory;
pub mod output;
pub mod rules;
pub mod run;
pub mod runtime;
pub mod strategies;
