//! spam-detector command line
//!
//! ```bash
//! # Serve the HTTP API (default)
//! spam-detector serve --config spam-detector.toml
//!
//! # Retrain the model artifact and report holdout accuracy
//! spam-detector train --holdout 0.2
//!
//! # Classify one message
//! spam-detector predict "Win a brand new car!"
//!
//! # Add an account
//! spam-detector add-user "Jane Doe" jane@example.com s3cret --admin
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use spam_detector::api::{ApiServer, AppState};
use spam_detector::api::auth::JwtConfig;
use spam_detector::config::{Config, LoggingConfig};
use spam_detector::spam::{CorpusProvider, EmbeddedCorpus, JsonCorpus, ModelHandle, Pipeline};
use spam_detector::storage::{self, MessageStore, Role, UserStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "spam-detector")]
#[command(about = "Spam classification service", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./spam-detector.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON corpus to train on instead of the built-in one
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,
    /// Train the model, evaluate it on a holdout split and save the artifact
    Train {
        /// Fraction of the corpus held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        holdout: f64,
        /// Shuffle seed for the holdout split
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Classify a single message
    Predict {
        text: String,
    },
    /// Add a user account
    AddUser {
        name: String,
        email: String,
        password: String,
        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

fn corpus_provider(path: Option<PathBuf>) -> Arc<dyn CorpusProvider> {
    match path {
        Some(path) => Arc::new(JsonCorpus::new(path)),
        None => Arc::new(EmbeddedCorpus),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging);

    let corpus = corpus_provider(cli.corpus);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, corpus).await,
        Commands::Train { holdout, seed } => train(&config, corpus.as_ref(), holdout, seed),
        Commands::Predict { text } => {
            let pipeline = Pipeline::load_or_train(&config.model, corpus.as_ref())
                .context("failed to load or train the model")?;
            let prediction = pipeline.predict(&text)?;
            println!(
                "{} (confidence {:.3})",
                if prediction.is_spam { "spam" } else { "not spam" },
                prediction.confidence
            );
            Ok(())
        }
        Commands::AddUser {
            name,
            email,
            password,
            admin,
        } => {
            let pool = storage::connect(&config.database.url, config.database.max_connections)
                .await
                .context("failed to open database")?;
            storage::init_db(&pool).await?;

            let role = if admin { Role::Admin } else { Role::User };
            let user = UserStore::new(pool)
                .create_user(&name, &email, &password, role)
                .await?;
            println!("✓ User {} added (id {}, role {})", user.email, user.id, role.as_str());
            Ok(())
        }
    }
}

async fn serve(config: Config, corpus: Arc<dyn CorpusProvider>) -> anyhow::Result<()> {
    info!("Starting spam-detector v{}", env!("CARGO_PKG_VERSION"));

    let pool = storage::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    storage::init_db(&pool).await?;

    let users = UserStore::new(pool.clone());
    users
        .ensure_admin(
            &config.auth.admin_name,
            &config.auth.admin_email,
            &config.auth.admin_password,
        )
        .await?;

    let model_config = config.model.clone();
    let loader_corpus = corpus.clone();
    let pipeline = tokio::task::spawn_blocking(move || {
        Pipeline::load_or_train(&model_config, loader_corpus.as_ref())
    })
    .await?
    .with_context(|| format!("failed to load or train model at {}", config.model.path))?;

    let state = Arc::new(AppState {
        users,
        messages: MessageStore::new(pool),
        jwt_config: JwtConfig::new(
            config.auth.secret_key.clone(),
            config.auth.jwt_expiration_secs,
        ),
        model: Arc::new(ModelHandle::new(pipeline)),
        corpus,
        model_config: config.model.clone(),
    });

    ApiServer::new(state, &config.server).run().await?;
    Ok(())
}

fn train(
    config: &Config,
    corpus: &dyn CorpusProvider,
    holdout: f64,
    seed: u64,
) -> anyhow::Result<()> {
    let examples = corpus.examples().context("failed to read training corpus")?;
    let (_, report) = Pipeline::train_and_save(&config.model, &examples, holdout, seed)
        .context("training failed")?;

    if let Some(evaluation) = report.holdout {
        println!(
            "Holdout: {}/{} correct (accuracy {:.3}, tp {} fp {} tn {} fn {})",
            evaluation.correct,
            evaluation.total,
            evaluation.accuracy,
            evaluation.true_positives,
            evaluation.false_positives,
            evaluation.true_negatives,
            evaluation.false_negatives
        );
    }
    println!(
        "Model saved to {} ({} terms, spam prior {:.3})",
        config.model.path, report.summary.vocabulary_size, report.summary.spam_prior
    );
    Ok(())
}

