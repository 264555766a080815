use std::path::PathBuf;
use std::process::ExitCode;

use actix_web::{App, HttpServer, middleware::Logger, web};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

use pgm3d_mesher::app_state::AppState;
use pgm3d_mesher::config::{DEFAULT_LABELS, OutputLayout, PipelineConfig, ServerConfig};
use pgm3d_mesher::routes;
use pgm3d_mesher::{PipelineError, run_pipeline};

#[derive(Parser)]
#[command(name = "pgm3d-mesher")]
#[command(about = "PGM3D 体数据按标签抽取边界网格", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve {
        /// 监听地址，覆盖 MESHER_BIND
        #[arg(long)]
        bind: Option<String>,

        /// 体数据目录，覆盖 MESHER_RESOURCE_DIR
        #[arg(long)]
        resource_dir: Option<PathBuf>,

        /// OBJ 输出目录，覆盖 MESHER_OUTPUT_DIR
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// 处理单个文件后退出
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 量化标签数，0 表示不量化
        #[arg(long, default_value_t = DEFAULT_LABELS)]
        labels: u32,

        #[arg(long, value_enum, default_value = "merged")]
        layout: LayoutArg,

        /// 默认写到输入文件所在目录
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Merged,
    PerLabel,
}

impl From<LayoutArg> for OutputLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Merged => OutputLayout::Merged,
            LayoutArg::PerLabel => OutputLayout::PerLabel,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve {
        bind: None,
        resource_dir: None,
        output_dir: None,
    });

    match command {
        Command::Serve {
            bind,
            resource_dir,
            output_dir,
        } => {
            let mut config = ServerConfig::from_env();
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(dir) = resource_dir {
                config.resource_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            match actix_web::rt::System::new().block_on(serve(config)) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("服务异常退出: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Extract {
            file,
            labels,
            layout,
            output_dir,
        } => {
            let mut config = PipelineConfig::default()
                .with_labels(labels)
                .with_layout(layout.into());
            config.output_dir = output_dir;

            match run_pipeline(&file, &config) {
                Ok(report) => {
                    match serde_json::to_string_pretty(&report) {
                        Ok(json) => println!("{}", json),
                        Err(e) => error!("无法序列化报告: {}", e),
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{}", e);
                    eprintln!("{}", failure_message(&e));
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// extract 失败时写到 stderr 的内容：阶段、输入文件和原始错误
fn failure_message(err: &PipelineError) -> String {
    format!("错误: {}", err)
}

async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState::new(&config));

    info!(
        "已注册的解析器: {}",
        app_state.parser_registry.supported_extensions().join(", ")
    );

    // 启动后台清理任务：定期清理过期的任务
    // 每 5 分钟执行一次清理，避免长期占用内存
    let cleanup_store = app_state.task_store.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(std::time::Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            let cleaned_count = cleanup_store.cleanup_expired();
            if cleaned_count > 0 {
                info!(
                    "[清理任务] 清理了 {} 个过期任务，当前剩余: {} 个任务",
                    cleaned_count,
                    cleanup_store.task_count()
                );
            }
        }
    });

    info!("服务器启动在 http://{}", config.bind);
    info!("资源目录: {}", config.resource_dir.display());
    info!("输出目录: {}", config.output_dir.display());
    info!(
        "任务 TTL: {} 分钟",
        app_state.task_store.default_ttl().as_secs() / 60
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(config.bind.as_str())?
    .run()
    .await
}
