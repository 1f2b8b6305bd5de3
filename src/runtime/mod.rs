//! 运行时生命周期：启动前准备与优雅关闭
pub mod lifetime;
