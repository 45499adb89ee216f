//! Commands - 命令层
//!
//! 静态命令表 + 入站消息路由 + 各命令处理器。
//! 处理器对用户的所有反馈都经聊天连接器发送，没有返回值语义。

mod handlers;
mod router;
mod table;

pub use handlers::CommandHandlers;
pub use router::CommandRouter;
pub use table::{CommandEntry, CommandId, CommandSpec, CommandTable, RouterError};
