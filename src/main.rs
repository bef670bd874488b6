use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use itemplate::env::{self, EnvVar};
use itemplate::{
    open_store, process_element, restore_element, AppConfig, ConfigManager, ContentElement,
    ContentItem, ElementKind, ItemplateError, ItemplateResult, TemplateBuilder, Validator,
};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// 校验发现问题时的退出码
const EXIT_FINDINGS: i32 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 配置文件（TOML 或 JSON）
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// redb 存储文件，覆盖配置中的路径
    #[arg(short, long, global = true)]
    store: Option<String>,

    /// 提高日志级别（-v info，-vv debug，-vvv trace）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 对一批 HTML 文件执行抽取、模板化与校验
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// 以 JSON 输出报告
        #[arg(long)]
        json: bool,
        /// 工作线程数
        #[arg(short, long)]
        workers: Option<usize>,
        /// 只处理指定种类的元素
        #[arg(short, long)]
        element_kind: Option<String>,
        /// 跳过还原校验
        #[arg(long)]
        no_round_trip: bool,
    },
    /// 把 HTML 文件转换为模板
    Template {
        file: PathBuf,
        /// 默认使用文件名（不含扩展名）
        #[arg(long)]
        content_id: Option<String>,
        /// 只处理指定种类的元素
        #[arg(short, long)]
        element_kind: Option<String>,
        /// 把内容项写入 JSON 文件
        #[arg(long)]
        items_out: Option<PathBuf>,
        /// 模板输出文件，默认写到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 由模板和内容项还原 HTML
    Restore {
        file: PathBuf,
        /// 从存储读取内容项时使用
        #[arg(long)]
        content_id: Option<String>,
        /// 内容项 JSON 文件（`template --items-out` 的输出）
        #[arg(long)]
        items: Option<PathBuf>,
        /// 输出文件，默认写到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 生成示例配置文件
    InitConfig {
        #[arg(default_value = "itemplate.toml")]
        path: String,
    },
    /// 列出支持的环境变量
    Env,
}

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(error) => {
            print_error_message(&format!("错误: {}", error));
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => env::core::LogLevel::get().unwrap_or_else(|_| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let level: tracing::Level = level.parse().unwrap_or(tracing::Level::WARN);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .init();
}

fn use_color() -> bool {
    atty::is(atty::Stream::Stderr) && !env::core::NoColor::get_or_default(false)
}

/// Prints an error message to stderr
fn print_error_message(msg: &str) {
    if use_color() {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    } else {
        eprintln!("{msg}");
    }
}

fn load_config(cli: &Cli) -> ItemplateResult<AppConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };

    let mut config = manager.into_config();
    if let Some(store) = &cli.store {
        config.store.path = Some(store.clone());
    }

    Ok(config)
}

fn read_file(path: &Path) -> ItemplateResult<String> {
    fs::read_to_string(path).map_err(|e| ItemplateError::from(e).with_context(path.display()))
}

fn write_output(output: Option<&Path>, content: &str) -> ItemplateResult<()> {
    match output {
        Some(path) => fs::write(path, content)
            .map_err(|e| ItemplateError::from(e).with_context(path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn content_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(cli: Cli) -> ItemplateResult<i32> {
    match &cli.command {
        Commands::InitConfig { path } => {
            ConfigManager::generate_example_config(path)?;
            println!("已生成配置文件: {}", path);
            return Ok(0);
        }
        Commands::Env => {
            println!("{}", env::env_docs());
            return Ok(0);
        }
        _ => {}
    }

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Validate {
            files,
            json,
            workers,
            element_kind,
            no_round_trip,
        } => {
            if let Some(workers) = workers {
                config.batch.workers = workers;
            }
            if no_round_trip {
                config.batch.verify_round_trip = false;
            }

            let mut elements: Vec<ContentElement> = Vec::with_capacity(files.len());
            for file in &files {
                let mut element = ContentElement::new(file.display().to_string(), read_file(file)?);
                element.element_kind = element_kind.as_deref().map(ElementKind::from);
                elements.push(element);
            }

            let store = open_store(&config.store)?;
            let report = Validator::new(&*store, &config.extraction)
                .with_batch(config.batch.clone())
                .run(&elements)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.summary());
            }

            Ok(if report.is_clean() { 0 } else { EXIT_FINDINGS })
        }
        Commands::Template {
            file,
            content_id,
            element_kind,
            items_out,
            output,
        } => {
            let content_id = content_id.unwrap_or_else(|| content_id_for(&file));
            let mut element = ContentElement::new(content_id, read_file(&file)?);
            element.element_kind = element_kind.as_deref().map(ElementKind::from);

            let store = open_store(&config.store)?;
            let outcome = process_element(&*store, &config.extraction, &element)?;

            for miss in &outcome.template.misses {
                tracing::warn!(item_id = miss.item_id, reason = %miss.reason, "content item not substituted");
            }

            if let Some(path) = &items_out {
                let items = serde_json::to_string_pretty(&outcome.items)?;
                fs::write(path, items).map_err(|e| ItemplateError::from(e).with_context(path.display()))?;
            }
            write_output(output.as_deref(), &outcome.template.body)?;

            Ok(0)
        }
        Commands::Restore {
            file,
            content_id,
            items,
            output,
        } => {
            let template = read_file(&file)?;

            let outcome = match (items, content_id) {
                (Some(path), _) => {
                    let items: Vec<ContentItem> = serde_json::from_str(&read_file(&path)?)?;
                    TemplateBuilder::new(&config.extraction).restore(&template, &items)
                }
                (None, Some(content_id)) if config.store.path.is_some() => {
                    let store = open_store(&config.store)?;
                    restore_element(&*store, &config.extraction, &content_id, &template)?
                }
                _ => {
                    return Err(ItemplateError::InvalidInput(
                        "还原需要 --items，或同时提供 --store 与 --content-id".to_string(),
                    ))
                }
            };

            for placeholder in &outcome.unresolved {
                print_error_message(&format!("未知占位符: {}", placeholder));
            }
            write_output(output.as_deref(), &outcome.body)?;

            Ok(if outcome.unresolved.is_empty() { 0 } else { EXIT_FINDINGS })
        }
        Commands::InitConfig { .. } | Commands::Env => Ok(0),
    }
}
