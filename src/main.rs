//! nlq - console client for a natural-language query server.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

use nlq_console::api::UploadFile;
use nlq_console::cli::{Cli, Command, ExportFormat};
use nlq_console::error::ConsoleError;
use nlq_console::jobs::JobEvent;
use nlq_console::logging::{self, LogTarget};
use nlq_console::render;
use nlq_console::session::Session;

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    logging::init(LogTarget::from_flag(cli.log_file));

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ConsoleError>() {
            Some(console) => error!("{}: {}", console.category(), console.user_message()),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;

    // One logical thread of control: every poll loop interleaves on this runtime.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let session = Session::from_config(&config)?;
        let result = execute(&session, cli.command).await;
        session.shutdown().await;
        result
    })
}

async fn execute(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Connect { connection_string } => {
            let summary = session.connect(&connection_string).await?;
            if let Some(message) = &summary.message {
                println!("{}", message);
            }
            println!(
                "{} tables, {} relationships\n",
                summary.tables_count, summary.relationships_count
            );
            print!("{}", summary.schema.format_for_display());
        }

        Command::Upload { files, wait } => {
            let files = load_files(&files).await?;
            session.start();
            let job_id = session.upload(files).await?;
            println!("Started ingestion job {}", job_id);

            if wait {
                let mut events = session.subscribe_jobs();
                let waiter = session.wait_for_job(&job_id);
                tokio::pin!(waiter);
                let job = loop {
                    tokio::select! {
                        job = &mut waiter => break job?,
                        event = events.recv() => {
                            if let Ok(JobEvent::Updated(job)) = event {
                                if job.id() == &job_id {
                                    println!("{}", job.summary());
                                }
                            }
                        }
                    }
                };
                println!("{}", render::render_jobs(&[job]));
            }
        }

        Command::Query {
            text,
            page,
            tab,
            export,
            output,
        } => {
            let mut adapter = session.query(&text).await?;
            if let Some(message) = adapter.envelope().error_message() {
                anyhow::bail!("Query failed: {}", message);
            }

            match export {
                Some(format) => {
                    let body = match format {
                        ExportFormat::Json => adapter.export_json()?,
                        ExportFormat::Csv => adapter.export_csv()?,
                    };
                    write_output(output, &body).await?;
                }
                None => {
                    if let Some(tab) = tab {
                        adapter.switch_tab(tab)?;
                    }
                    adapter.set_page(page);
                    println!("{}", render::render_result(&adapter));
                }
            }
        }

        Command::Metrics => {
            session.metrics().refresh().await?;
            match session.metrics().snapshot() {
                Some(snapshot) => println!("{}", render::render_metrics(&snapshot)),
                None => println!("No metrics available"),
            }
        }

        Command::History => {
            session.submitter().refresh_history().await;
            println!("{}", render::render_history(&session.submitter().history()));
        }

        Command::Schema => {
            let summary = session.gateway().refresh_schema().await?;
            print!("{}", summary.schema.format_for_display());
        }

        Command::Health => {
            let health = session.gateway().health().await?;
            println!(
                "Server: {} (database {}, {} documents indexed)",
                health.status.as_deref().unwrap_or("unknown"),
                if health.database_connected.unwrap_or(false) {
                    "connected"
                } else {
                    "not connected"
                },
                health.documents_indexed.unwrap_or(0)
            );
            if !health.is_healthy() {
                anyhow::bail!("Server reported an unhealthy status");
            }
        }
    }
    Ok(())
}

async fn load_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(UploadFile::from_path(path).await?);
    }
    Ok(files)
}

async fn write_output(output: Option<PathBuf>, body: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", body),
    }
    Ok(())
}
