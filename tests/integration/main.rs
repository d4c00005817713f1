//! Integration tests for the VEAP client

mod cli_contracts;
mod config_loading;
mod support;
mod watch_flow;
