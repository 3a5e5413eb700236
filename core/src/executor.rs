use crate::bind_value::BindValue;
use crate::config::ConnectionConfig;
use crate::error::Result;
use serde_json::{Map, Value};

/// 物化后的一行结果：列名 -> JSON 值
pub type Record = Map<String, Value>;

/// 单个数据库连接上的执行器
///
/// `Database` 只通过这个 trait 访问连接，生产环境由 `sqlx::MySqlConnection` 实现，
/// 测试中可以替换为内存实现。
///
/// 注意：此 trait 要求 `Send`，因为异步方法需要在不同线程之间传递 Future
#[async_trait::async_trait]
pub trait DbExecutor: Send {
    /// 执行命令，返回受影响的行数
    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64>;

    /// 执行查询并物化全部结果行
    async fn fetch_all(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<Record>>;

    /// 正常关闭连接
    async fn close(self: Box<Self>) -> Result<()>;
}

/// 根据连接配置打开一个新连接
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DbExecutor>>;
}
