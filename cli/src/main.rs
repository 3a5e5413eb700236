mod args;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use sqlchain::{Database, QueryBuilder};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let query = args.build_query()?;
    info!(command = query.get_command(), "prepared command");

    if args.dry_run {
        println!("{}", query.get_command());
        let params: Vec<_> = query.get_parameters().iter().map(|p| p.to_json()).collect();
        println!("{}", serde_json::to_string(&params)?);
        return Ok(());
    }

    let config = args.connection_config()?;
    let mut db = Database::new();
    db.set_options(config);
    db.connect_to_database()
        .await
        .context("Failed to connect to database")?;

    let outcome = run(&mut db, &args, &query).await;

    // 无论查询是否成功都关闭连接
    let closed = db.close_the_connection().await;
    finish(outcome, closed)
}

/// 查询错误优先返回；查询失败时关闭错误只记录日志
fn finish(outcome: Result<()>, closed: sqlchain::Result<()>) -> Result<()> {
    match (outcome, closed) {
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "failed to close connection");
            }
            Err(err.context("Query failed"))
        }
        (Ok(()), closed) => closed.context("Failed to close connection"),
    }
}

async fn run(db: &mut Database, args: &Args, query: &QueryBuilder) -> Result<()> {
    if args.execute {
        let affected = db.execute(query).await?;
        println!("{} row(s) affected", affected);
    } else {
        let rows = db.get_result(query).await?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlchain::SqlChainError;

    #[test]
    fn test_finish_reports_query_error_over_close_error() {
        let err = finish(
            Err(anyhow::anyhow!("syntax error")),
            Err(SqlChainError::ConnectionClosed),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Query failed");
        assert_eq!(err.root_cause().to_string(), "syntax error");
    }

    #[test]
    fn test_finish_reports_close_error_after_success() {
        let err = finish(Ok(()), Err(SqlChainError::ConnectionClosed)).unwrap_err();
        assert_eq!(err.to_string(), "Failed to close connection");
    }

    #[test]
    fn test_finish_ok() {
        assert!(finish(Ok(()), Ok(())).is_ok());
    }
}
