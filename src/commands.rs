use crate::cli::{Command, IngestArgs, RecentArgs, ShowArgs};
use crate::error::{ErrorKind, Result};
use crate::transport::{self, Line, MessageWriter};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io;
use tracing::{info, warn};
use updater_config::Config;
use updater_service::{Event, Options, Updater, process_stream};
use updater_store::{Database, PoolSettings, Repository};

pub async fn run_command(command: Command, config: &Config) -> Result<ExitCode> {
    match command {
        Command::Ingest(args) => ingest(args, config).await,
        Command::Show(args) => show(args, config).await,
        Command::Recent(args) => recent(args, config).await,
    }
}

/// Counts of [`Event`]s seen during an ingest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub published: u64,
    pub suppressed: u64,
    pub rejected: u64,
    pub failed: u64,
}
impl Summary {
    fn record(&mut self, event: &Event) {
        match event {
            Event::Published(_) => self.published += 1,
            Event::Suppressed { .. } => self.suppressed += 1,
            Event::Rejected(_) => self.rejected += 1,
            Event::Failed { .. } => self.failed += 1,
        }
    }

    /// Rejected messages would fail again on redelivery, so only store
    /// failures make the run unsuccessful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
    }
}

async fn open_database(config: &Config) -> Result<Database> {
    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
    }
    let settings = PoolSettings {
        max_connections: config.database.max_connections,
        busy_timeout: config.database.busy_timeout(),
    };
    Database::connect(path, &settings).await.or_raise(|| ErrorKind::Database)
}

async fn ingest(args: IngestArgs, config: &Config) -> Result<ExitCode> {
    let db = open_database(config).await?;
    let options = Options {
        publish_unchanged: config.processing.publish_unchanged,
        max_attempts: config.processing.max_attempts,
        retry_backoff: config.processing.retry_backoff(),
    };
    let updater = Updater::new(Repository::new(db.pool().clone(), args.dry_run), options);
    let concurrency = args.concurrency.map_or(config.processing.concurrency, usize::from);

    let input = transport::open_input(args.input.as_deref()).await?;
    let mut output = MessageWriter::new(transport::open_output(args.output.as_deref()).await?);
    let summary = apply_all(&updater, transport::read_messages(input), concurrency, &mut output).await;
    db.close().await;
    let summary = summary?;

    info!(
        published = summary.published,
        suppressed = summary.suppressed,
        rejected = summary.rejected,
        failed = summary.failed,
        dry_run = args.dry_run,
        "ingest finished"
    );
    Ok(summary.exit_code())
}

/// Feed every decoded line through the updater and write what gets published.
///
/// Undecodable lines are counted as rejected. An I/O error on the input fails
/// the run once everything read before it has been processed and written.
async fn apply_all<S, W>(updater: &Updater, lines: S, concurrency: usize, output: &mut MessageWriter<W>) -> Result<Summary>
where
    S: Stream<Item = io::Result<Line>>,
    W: io::AsyncWrite + Unpin,
{
    let mut summary = Summary::default();
    let mut read_error = None;
    {
        let slot = &mut read_error;
        let messages = stream! {
            for await line in lines {
                match line {
                    Ok(line) => yield line,
                    Err(err) => {
                        *slot = Some(err);
                        break;
                    },
                }
            }
        };
        let mut events = std::pin::pin!(process_stream(updater, messages, concurrency));
        while let Some(event) = events.next().await {
            summary.record(&event);
            if let Event::Published(document) = event {
                output.write(document).await?;
            }
        }
    }
    output.flush().await?;
    if let Some(err) = read_error {
        warn!(
            published = summary.published,
            rejected = summary.rejected,
            failed = summary.failed,
            "input ended early"
        );
        return Err(exn::Exn::new(err).raise(ErrorKind::Read));
    }
    Ok(summary)
}

async fn show(args: ShowArgs, config: &Config) -> Result<ExitCode> {
    let db = open_database(config).await?;
    let found = Repository::from(&db).get_by_url(&args.url).await.or_raise(|| ErrorKind::Query);
    db.close().await;
    let Some(document) = found? else {
        warn!(url = %args.url, "no record stored for url");
        return Ok(ExitCode::FAILURE);
    };
    let mut output = MessageWriter::new(io::stdout());
    output.write(document).await?;
    output.flush().await?;
    Ok(ExitCode::SUCCESS)
}

async fn recent(args: RecentArgs, config: &Config) -> Result<ExitCode> {
    let db = open_database(config).await?;
    let documents = Repository::from(&db).list_recent(args.limit).await.or_raise(|| ErrorKind::Query);
    db.close().await;
    let mut output = MessageWriter::new(io::stdout());
    for document in documents? {
        output.write(document).await?;
    }
    output.flush().await?;
    Ok(ExitCode::SUCCESS)
}

/// Apply the command-line overrides that live outside of subcommands.
pub fn apply_overrides(config: &mut Config, database: Option<PathBuf>) {
    if let Some(path) = database {
        config.database.path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests::Broken;
    use tokio::io::AsyncReadExt;
    use updater_resolve::models::Message;

    fn line(url: &str, fetch_time: u64, pub_date: u64, text: &str) -> String {
        let message = Message {
            url: url.to_string(),
            pub_date,
            fetch_time: Some(fetch_time),
            text: text.to_string(),
            first_fetch_time: None,
        };
        serde_json::to_string(&message).unwrap() + "\n"
    }

    async fn updater() -> (Database, Updater) {
        let db = Database::connect_in_memory().await.unwrap();
        let updater = Updater::new(Repository::from(&db), Options::default());
        (db, updater)
    }

    fn written(output: MessageWriter<Vec<u8>>) -> Vec<Message> {
        let written = String::from_utf8(output.into_inner()).unwrap();
        written.lines().map(|line| serde_json::from_str(line).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_apply_all_writes_published_records() {
        let (_db, updater) = updater().await;
        let input = [line("A", 5, 100, "v5"), "{garbled\n".to_string(), line("A", 3, 90, "v3")].concat();
        let mut output = MessageWriter::new(Vec::new());
        let lines = transport::read_messages(input.as_bytes());
        let summary = apply_all(&updater, lines, 1, &mut output).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                published: 2,
                rejected: 1,
                ..Summary::default()
            }
        );
        assert!(summary.is_success());

        let last = written(output).pop().unwrap();
        assert_eq!(last.first_fetch_time, Some(3));
        assert_eq!((last.fetch_time, last.pub_date, last.text.as_str()), (Some(5), 90, "v5"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_rejected_and_later_lines_applied() {
        let (_db, updater) = updater().await;
        let mut input = line("A", 1, 10, "a").into_bytes();
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(line("B", 2, 20, "b").as_bytes());
        let mut output = MessageWriter::new(Vec::new());
        let summary = apply_all(&updater, transport::read_messages(&input[..]), 1, &mut output)
            .await
            .unwrap();
        assert_eq!((summary.published, summary.rejected), (2, 1));
        let urls: Vec<String> = written(output).into_iter().map(|m| m.url).collect();
        assert_eq!(urls, ["A", "B"]);
        assert_eq!(updater.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_read_error_fails_the_run() {
        let (_db, updater) = updater().await;
        let first = line("A", 1, 10, "a");
        let reader = tokio::io::BufReader::new(first.as_bytes().chain(Broken));
        let mut output = MessageWriter::new(Vec::new());
        let err = apply_all(&updater, transport::read_messages(reader), 1, &mut output)
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Read));
        // What was read before the failure is still applied and written.
        assert_eq!(written(output).len(), 1);
        assert_eq!(updater.store().count().await.unwrap(), 1);
    }

    #[test]
    fn test_failures_fail_the_run() {
        let summary = Summary {
            failed: 1,
            ..Summary::default()
        };
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_open_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, Some(dir.path().join("nested/deeper/store.sqlite")));
        let db = open_database(&config).await.unwrap();
        assert_eq!(Repository::from(&db).count().await.unwrap(), 0);
        db.close().await;
        assert!(dir.path().join("nested/deeper/store.sqlite").is_file());
    }
}
