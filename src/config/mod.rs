//! 配置管理
//!
//! 配置按 `config.toml` → `config.{APP_ENV}.toml` → `COURSEHUB_*` 环境变量的顺序叠加。

mod r#impl;
mod structs;

pub use structs::*;
