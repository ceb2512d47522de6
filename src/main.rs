use axum::Server;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use team_backend::{
    AppState,
    config::{Config, Environment},
    init_tracing, routes,
};

/// 过期会话的清理周期
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(version, about = "Team collaboration server")]
struct Args {
    /// 安装配置文件路径（覆盖 CONFIG_FILE）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 监听地址（覆盖 SERVER_HOST）
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = args.config {
        config.config_file = path;
    }
    if let Some(host) = args.host {
        config.server_host = host;
    }
    init_tracing(&config);

    let environment = Environment::load(&config.config_file)?;
    let addr: SocketAddr = environment.bind_address(&config.server_host).parse()?;
    let installed = environment.installed;
    let url = installed.then(|| environment.mysql.database_url()).transpose()?;

    let state = Arc::new(AppState::new(config, environment));
    if let Some(url) = url {
        state.db.open(&url, state.config.database_max_connections)?;
    } else {
        tracing::info!("Not installed yet, open / to run the installer");
    }

    let sessions = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sessions.sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions purged");
            }
        }
    });

    let app = routes::create_router(state);

    tracing::info!(%addr, installed, "Server running");
    Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}
