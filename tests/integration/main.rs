mod config_loading;
mod demo_config;
mod engine_fake_runner;
mod fs_abstraction;
