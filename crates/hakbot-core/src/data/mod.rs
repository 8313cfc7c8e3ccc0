//! Flat-file school data: meals and events (CSV) and the timetable (JSON).
//!
//! Nothing is cached. Each request loads a fresh [`SchoolData`] snapshot, so
//! answers are as current as the files on disk.

mod events;
mod meals;
mod timetable;

pub use events::{parse_events, EventRecord};
pub use meals::{parse_meals, MealRecord};
pub use timetable::{ClassSchedule, Timetable};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::DataConfig;
use crate::error::{HakbotError, Result};

pub const MEALS_FILE: &str = "meals.csv";
pub const EVENTS_FILE: &str = "events.csv";
pub const TIMETABLE_FILE: &str = "timetable.json";

/// One consistent load of all three data files.
#[derive(Debug, Clone, Default)]
pub struct SchoolData {
    pub meals: Vec<MealRecord>,
    pub events: Vec<EventRecord>,
    pub timetable: Timetable,
}

/// Default cap on file reads in flight across all clones of a [`DataSource`].
pub const MAX_PENDING_READS: usize = 16;

/// Reads the data files from a directory, bounding each read by a timeout.
///
/// A read that outlives its timeout keeps running on a blocking thread and
/// holds one of the source's read permits until it returns, so a hung data
/// directory ties up at most [`MAX_PENDING_READS`] threads. Once all permits
/// are held, further reads time out while waiting for one.
#[derive(Debug, Clone)]
pub struct DataSource {
    dir: PathBuf,
    timeout: Duration,
    reads: Arc<Semaphore>,
}

impl DataSource {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
            reads: Arc::new(Semaphore::new(MAX_PENDING_READS)),
        }
    }

    /// Replace the in-flight read cap (minimum 1).
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.reads = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(&config.dir, config.read_timeout())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn load_meals(&self) -> Result<Vec<MealRecord>> {
        parse_meals(&self.read(MEALS_FILE).await?)
    }

    pub async fn load_events(&self) -> Result<Vec<EventRecord>> {
        parse_events(&self.read(EVENTS_FILE).await?)
    }

    pub async fn load_timetable(&self) -> Result<Timetable> {
        Timetable::parse(&self.read(TIMETABLE_FILE).await?)
    }

    /// Load all three files concurrently. Any failure fails the whole load.
    pub async fn load_all(&self) -> Result<SchoolData> {
        let (meals, events, timetable) = tokio::try_join!(
            self.load_meals(),
            self.load_events(),
            self.load_timetable()
        )?;
        tracing::debug!(
            meals = meals.len(),
            events = events.len(),
            classes = timetable.len(),
            "loaded school data from {}",
            self.dir.display()
        );
        Ok(SchoolData {
            meals,
            events,
            timetable,
        })
    }

    async fn read(&self, file: &str) -> Result<String> {
        let path = self.dir.join(file);
        let reads = Arc::clone(&self.reads);
        let blocking_path = path.clone();
        let read = async move {
            // The semaphore is never closed; the permit moves into the
            // blocking task and is released only when the read returns.
            let permit = reads.acquire_owned().await.ok();
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                std::fs::read_to_string(&blocking_path)
            })
            .await
        };

        match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(Ok(content))) => Ok(content),
            Ok(Ok(Err(e))) => Err(HakbotError::io(path, e)),
            Ok(Err(join)) => Err(HakbotError::io(path, std::io::Error::other(join))),
            Err(_) => Err(HakbotError::Timeout(format!(
                "reading {} took longer than {}ms",
                path.display(),
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Split CSV content into trimmed records, tolerating ragged rows.
/// Rows whose fields are all empty are dropped.
fn csv_records(content: &str) -> Result<Vec<Vec<String>>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
