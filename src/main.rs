//! # Kepler 缓存运维工具
//!
//! 检查、读取和清除追踪系统缓存的命令行入口

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use entity::application::{NewApplication, Priority, Status};
use entity::user::NewUser;
use kepler_cache::{
    AppConfig, AppContext, Result, cache_error,
    cache::{Aggregate, ApplicationFilter, CacheKey},
    config,
    error::{Context, ErrorCategory},
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
};

#[derive(Parser, Debug)]
#[command(name = "kepler-cache", version, about = "Kepler 追踪系统缓存工具", long_about = None)]
struct Cli {
    /// 配置文件路径，默认读取 `KEPLER_CONFIG_PATH` 或 `config/config.{RUST_ENV}.toml`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 测试缓存存储连接
    Ping,
    /// 列出匹配通配模式的缓存键
    Keys {
        /// Redis glob 模式，例如 `applications:search:*`
        pattern: String,
    },
    /// 读取一个缓存键的原始值
    Get { key: String },
    /// 清除一个聚合的全部缓存
    Invalidate {
        #[arg(value_enum)]
        aggregate: AggregateArg,
    },
    /// 用进程内文档库演示读穿透与失效
    Demo,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AggregateArg {
    Applications,
    Users,
}

impl From<AggregateArg> for Aggregate {
    fn from(arg: AggregateArg) -> Self {
        match arg {
            AggregateArg::Applications => Self::Application,
            AggregateArg::Users => Self::User,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::Main,
            "command_failed",
            &format!("命令执行失败: {e}")
        );
        eprintln!("error: {e}");
        // 输入或数据问题退出码 2，服务或依赖故障退出码 1
        let code = match e.category() {
            ErrorCategory::Client => 2,
            ErrorCategory::Server => 1,
        };
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None if config::default_config_path().exists() => {
            config::load_config().context("加载默认配置失败")?
        }
        // 没有配置文件时使用默认的内存缓存
        None => AppConfig::default(),
    };
    logging::init_logging(config.log_level.as_deref());

    let context = AppContext::from_config(config).await?;
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "context_ready",
        &format!("缓存后端: {}", context.cache_store.backend())
    );

    match cli.command {
        Commands::Ping => {
            context.cache_store.ping().await?;
            println!("PONG ({})", context.cache_store.backend());
        }
        Commands::Keys { pattern } => {
            for key in context.cache_store.keys_matching(&pattern).await? {
                println!("{key}");
            }
        }
        Commands::Get { key } => {
            if CacheKey::parse(&key).is_none() {
                eprintln!("warning: {key} 不属于缓存键命名规范");
            }
            match context.cache_store.get(&key).await? {
                Some(raw) => println!("{raw}"),
                None => println!("(nil)"),
            }
        }
        Commands::Invalidate { aggregate } => {
            let report = context.invalidator.invalidate(aggregate.into()).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_complete() {
                return Err(cache_error!("{} 个失效操作失败", report.failed.len()));
            }
        }
        Commands::Demo => demo(&context).await?,
    }

    Ok(())
}

async fn demo(context: &AppContext) -> Result<()> {
    let alice = context
        .users
        .register(NewUser {
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "developer".to_string(),
            password_hash: "demo".to_string(),
        })
        .await?;

    let crm = context
        .applications
        .create(NewApplication {
            title: "CRM Portal".to_string(),
            description: "客户关系管理门户".to_string(),
            assets: Vec::new(),
            status: Status::Todo,
            priority: Priority::High,
        })
        .await?;
    context.applications.add_member(crm.id, alice.id).await?;

    let todo = ApplicationFilter::Status(Status::Todo);
    for round in 1..=2 {
        let apps = context.applications.list(todo, None).await?;
        println!("第 {round} 次读取 applications:todo -> {} 个应用", apps.len());
    }

    context
        .applications
        .edit(
            crm.id,
            entity::application::Changes {
                status: Some(Status::Implement),
                ..Default::default()
            },
        )
        .await?;
    let todo_after = context.applications.list(todo, None).await?;
    let implement = context
        .applications
        .list(ApplicationFilter::Status(Status::Implement), None)
        .await?;
    println!(
        "状态变更后: todo={} implement={}",
        todo_after.len(),
        implement.len()
    );

    let counts = context.applications.status_counts().await?;
    println!("状态统计: {}", serde_json::to_string(&counts)?);

    let stats = context.cache.stats();
    println!(
        "缓存统计: hit={} miss={} error={} in_flight={} hit_rate={:.2}",
        stats.hit_count,
        stats.miss_count,
        stats.error_count,
        stats.in_flight,
        stats.hit_rate()
    );
    Ok(())
}
