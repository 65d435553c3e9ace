use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use qna_api::config::{ApiConfig, CorsConfig};
use qna_api::helpers::llm::create_llm_client;
use qna_api::logging::init_logging;
use qna_api::routes::{configure_routes, json_config};
use qna_api::services::batch::{self, BatchMode};
use qna_api::services::{AnswerGenerator, ChatSettings};
use qna_api::storage::{PgQnaStore, QnaStore};
use qna_api::AppState;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "qna-api", version, about = "Admin service for the chatbot Q&A library")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP service (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate and store answers for a CSV of questions
    Import(ImportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// CSV file with a Question column
    file: PathBuf,
    /// Number of questions to process in this run
    #[arg(long)]
    batch_size: Option<usize>,
    /// First question (0-based) to process
    #[arg(long, default_value_t = 0)]
    start_index: usize,
    /// Stop before this question
    #[arg(long)]
    end_index: Option<usize>,
    /// Only check the file, do not call the completion service
    #[arg(long)]
    validate_only: bool,
    /// Write a Question,Answer,Status CSV of the results
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ApiConfig::load(cli.config.as_deref())?;
    let _log_guard = init_logging(&config.logging)?;

    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    match command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            actix_web::rt::System::new().block_on(serve(config))
        }
        Command::Import(args) => actix_web::rt::System::new().block_on(import(config, args)),
    }
}

async fn connect_store(config: &ApiConfig) -> anyhow::Result<PgQnaStore> {
    let store = PgQnaStore::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    if config.database.run_migrations {
        store.init().await.context("Failed to initialize the schema")?;
    }
    let server_time = store.server_time().await?;
    info!(server_time = %server_time, "Database connection established");
    Ok(store)
}

async fn serve(config: ApiConfig) -> anyhow::Result<()> {
    let store: Arc<dyn QnaStore> = Arc::new(connect_store(&config).await?);
    let client = create_llm_client(&config.llm)?;
    info!(model = client.model_name(), "Completion client ready");

    let state = web::Data::new(AppState {
        store,
        answers: AnswerGenerator::from_config(client, &config.llm),
        chat: ChatSettings::from(&config.chat),
        upload: config.upload.clone(),
    });

    let bind_addr = (config.server.host.clone(), config.server.port);
    info!("Starting qna-api server at http://{}:{}", bind_addr.0, bind_addr.1);

    let cors_config = config.cors.clone();
    let json_limit = config.upload.max_file_size;

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&cors_config))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(json_config(json_limit))
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}

fn cors(config: &CorsConfig) -> Cors {
    if config.allowed_origins.is_empty() {
        return Cors::permissive();
    }
    config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

async fn import(config: ApiConfig, args: ImportArgs) -> anyhow::Result<()> {
    let parsed = batch::read_questions(&args.file)
        .with_context(|| format!("Cannot use {}", args.file.display()))?;
    info!(
        questions = parsed.questions.len(),
        empty_rows = parsed.empty_rows,
        duplicates = parsed.duplicates,
        "CSV file validated"
    );
    if parsed.questions.is_empty() {
        bail!("{} contains no questions", args.file.display());
    }
    if args.validate_only {
        return Ok(());
    }

    let range = batch::select_range(
        parsed.questions.len(),
        args.start_index,
        args.end_index,
        args.batch_size,
    );
    info!(start = range.start, end = range.end, "Selected questions");
    let questions = parsed.questions[range].to_vec();

    let store = connect_store(&config).await?;
    let generator = AnswerGenerator::from_config(create_llm_client(&config.llm)?, &config.llm);
    let report = batch::process_questions(questions, &generator, &store, BatchMode::Persist).await;

    if let Some(path) = &args.report {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        batch::write_report(&report, file)?;
        info!(path = %path.display(), "Report written");
    }

    if report.processed() == 0 && report.failed() > 0 {
        error!(failed = report.failed(), "No question could be processed");
        bail!("all {} questions failed", report.failed());
    }
    Ok(())
}
