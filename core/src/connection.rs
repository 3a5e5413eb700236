//! 单连接数据库包装器

use crate::bind_value::BindValue;
use crate::config::ConnectionConfig;
use crate::error::{Result, SqlChainError};
use crate::executor::{Connector, DbExecutor, Record};
use crate::mysql::MySqlConnector;
use crate::query_builder::QueryBuilder;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, warn};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 尚未调用 set_options
    Uninitialized,
    /// 已有配置，连接未打开
    Configured,
    Connected,
    /// 已调用 close_the_connection
    Closed,
}

/// 持有单个懒连接的数据库包装器
///
/// 所有操作都需要 `&mut self`，因此同一个 `Database` 上同一时刻只有一个查询在执行。
/// 需要在多个任务间共享时，由调用方包一层 `tokio::sync::Mutex`。
pub struct Database {
    connector: Box<dyn Connector>,
    config: Option<ConnectionConfig>,
    conn: Option<Box<dyn DbExecutor>>,
    state: ConnectionState,
}

impl Database {
    /// 使用 MySQL 驱动创建未配置的包装器
    pub fn new() -> Self {
        Self::with_connector(MySqlConnector)
    }

    /// 使用自定义 Connector
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            config: None,
            conn: None,
            state: ConnectionState::Uninitialized,
        }
    }

    /// 设置连接参数（不会立即连接）
    ///
    /// 之前的连接会被直接丢弃，不做正常关闭。
    pub fn set_options(&mut self, config: ConnectionConfig) -> &mut Self {
        if self.conn.take().is_some() {
            warn!("set_options replaced an open connection without closing it");
        }
        debug!(config = ?config, "connection options set");
        self.config = Some(config);
        self.state = ConnectionState::Configured;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> Option<&ConnectionConfig> {
        self.config.as_ref()
    }

    /// 未连接时打开连接
    pub async fn connect_to_database(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Uninitialized => Err(SqlChainError::NotConfigured),
            ConnectionState::Closed => Err(SqlChainError::ConnectionClosed),
            ConnectionState::Configured => {
                let config = self.config.as_ref().ok_or(SqlChainError::NotConfigured)?;
                let conn = self.connector.connect(config).await?;
                info!(
                    host = %config.hostname,
                    port = config.port,
                    database = %config.database,
                    "connected to database"
                );
                self.conn = Some(conn);
                self.state = ConnectionState::Connected;
                Ok(())
            }
        }
    }

    /// 关闭连接，之后的 execute / get_result 会返回 ConnectionClosed
    pub async fn close_the_connection(&mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        match self.conn.take() {
            Some(conn) => {
                conn.close().await?;
                info!("database connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// 校验命令并确保连接可用，返回要绑定的参数
    async fn checkout<'b>(
        &mut self,
        builder: &'b QueryBuilder,
    ) -> Result<(&mut Box<dyn DbExecutor>, &'b [BindValue])> {
        if builder.get_command().is_empty() {
            return Err(SqlChainError::EmptyCommand);
        }
        self.connect_to_database().await?;
        let params: &[BindValue] = if builder.has_positional_marker() {
            builder.get_parameters()
        } else {
            &[]
        };
        let conn = self.conn.as_mut().ok_or(SqlChainError::ConnectionClosed)?;
        Ok((conn, params))
    }

    /// 执行命令并返回受影响的行数，失败时记录日志后返回错误
    pub async fn execute(&mut self, builder: &QueryBuilder) -> Result<u64> {
        let sql = builder.get_command();
        let result = match self.checkout(builder).await {
            Ok((conn, params)) => {
                debug!(sql, params = %render_params(params), "execute");
                conn.execute(sql, params).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!(sql, error = %e, "execute failed");
        }
        result
    }

    /// 执行查询并返回物化后的结果行
    pub async fn get_result(&mut self, builder: &QueryBuilder) -> Result<Vec<Record>> {
        let sql = builder.get_command();
        let (conn, params) = self.checkout(builder).await?;
        debug!(sql, params = %render_params(params), "get_result");
        conn.fetch_all(sql, params).await
    }

    /// 回调形式的 get_result，回调恰好被调用一次：
    /// 成功时为 `(None, Some(rows))`，失败时为 `(Some(err), None)`
    pub async fn get_result_with<F>(&mut self, builder: &QueryBuilder, callback: F)
    where
        F: FnOnce(Option<SqlChainError>, Option<Vec<Record>>),
    {
        match self.get_result(builder).await {
            Ok(rows) => callback(None, Some(rows)),
            Err(e) => {
                error!(sql = builder.get_command(), error = %e, "get_result failed");
                callback(Some(e), None)
            }
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

fn render_params(params: &[BindValue]) -> Value {
    Value::Array(params.iter().map(BindValue::to_json).collect())
}
