use std::{fmt, sync::Arc, time::Duration};

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{command, Parser};
use log::info;
use reqwest::Client;
use sqlx::postgres::PgConnectOptions;

use status_board::{
    board::StatusBoard,
    dispatch::{
        sendgrid::{SendGridMailer, DEFAULT_API_URL},
        Dispatcher, Sender,
    },
    routes,
    store::PgStore,
    structures::{config::Config, errors::StatusBoardError},
};

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// path to config file
    #[arg(long, env, default_value = "./config.yaml")]
    config_path: String,

    #[arg(long, env, default_value = "localhost")]
    db_host: String,

    #[arg(long, env, default_value_t = 5433)]
    db_port: u16,

    #[arg(long, env, default_value = "postgres")]
    db_user: String,

    #[arg(long, env, default_value = "", hide_env_values = true)]
    db_password: String,

    #[arg(long, env, default_value = "sites_status")]
    db_name: String,

    /// SendGrid API key
    #[arg(long, env, hide_env_values = true)]
    sendgrid_api_key: String,

    /// SendGrid API base URL
    #[arg(long, env, default_value = DEFAULT_API_URL)]
    sendgrid_url: String,

    /// sender address for report emails
    #[arg(long, env)]
    email: String,

    #[arg(long, env, default_value = "0.0.0.0")]
    bind_address: String,

    #[arg(long, env, default_value_t = 3000)]
    port: u16,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("config_path", &self.config_path)
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("sendgrid_api_key", &"<redacted>")
            .field("sendgrid_url", &self.sendgrid_url)
            .field("email", &self.email)
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .finish()
    }
}

#[actix_web::main]
async fn main() -> Result<(), StatusBoardError> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // a missing .env is fine, the variables may come from the environment
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let args = Args::parse();
    info!("Started with args: {:?}", args);

    info!("Reading config from {}", args.config_path);
    let config = Config::from_path(&args.config_path)?;

    let options = PgConnectOptions::new()
        .host(&args.db_host)
        .port(args.db_port)
        .username(&args.db_user)
        .password(&args.db_password)
        .database(&args.db_name);
    info!(
        "Connecting to database {} at {}:{}",
        args.db_name, args.db_host, args.db_port
    );
    let store = PgStore::connect(options, config.max_connections).await?;

    let mailer = SendGridMailer::new(
        Client::new(),
        args.sendgrid_url,
        args.sendgrid_api_key,
        Duration::from_secs(config.send_timeout_secs),
    );
    let sender = Sender {
        name: config.sender_name,
        address: args.email,
    };
    let board = web::Data::new(StatusBoard::new(
        Arc::new(store),
        Dispatcher::new(Arc::new(mailer), sender),
        config.report_title,
    ));

    info!("Listening on {}:{}", args.bind_address, args.port);
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(board.clone())
            .configure(routes::configure)
    })
    .bind((args.bind_address, args.port))?
    .run()
    .await?)
}
