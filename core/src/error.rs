use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlChainError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    /// 参数不是有序集合，或元素不是标量
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),
    /// 尚未调用 set_options
    #[error("Connection options have not been set")]
    NotConfigured,
    /// 连接已通过 close_the_connection 关闭
    #[error("Connection has already been closed")]
    ConnectionClosed,
    #[error("Command is empty, call prepare() or set_command() first")]
    EmptyCommand,
}

pub type Result<T> = std::result::Result<T, SqlChainError>;
