use std::{
  fs::{self, File, OpenOptions},
  io::{self, BufRead, BufReader, Write},
  path::Path,
  sync::{Arc, Mutex},
};

use tracing_subscriber::{
  EnvFilter,
  fmt::{self, time::LocalTime},
  prelude::*,
};

use crate::configs::{Config, LoggingConfig};

/// Builds the filter directive from `logging.level` and `logging.filters`.
pub fn filter_directive(logging: Option<&LoggingConfig>) -> String {
  let level = logging.and_then(|l| l.level.as_deref()).unwrap_or("info");
  let filters = logging.and_then(|l| l.filters.as_deref()).unwrap_or("");

  if filters.is_empty() {
    level.to_string()
  } else {
    format!("{},{}", level, filters)
  }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &Config) {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.logging.as_ref())));

  let stdout_layer = fmt::layer()
    .with_timer(LocalTime::rfc_3339())
    .with_target(true)
    .with_thread_ids(true)
    .with_line_number(true)
    .with_file(false);

  let file_layer = config
    .logging
    .as_ref()
    .and_then(|l| l.file.as_ref())
    .map(|file_config| {
      if let Some(parent) = Path::new(&file_config.path).parent() {
        if let Err(e) = fs::create_dir_all(parent) {
          eprintln!("Failed to create log directory: {}", e);
        }
      }

      fmt::layer()
        .with_writer(LineCappedWriter::new(
          file_config.path.clone(),
          file_config.max_lines,
        ))
        .with_timer(LocalTime::rfc_3339())
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
    });

  // A second init (e.g. from tests) keeps the first subscriber.
  let _ = tracing_subscriber::registry()
    .with(env_filter)
    .with(stdout_layer)
    .with(file_layer)
    .try_init();
}

/// Appends to a log file and trims its head so it never holds much more than
/// `max_lines` lines.
#[derive(Clone)]
pub(crate) struct LineCappedWriter {
  path: String,
  max_lines: u32,
  lines_since_trim: Arc<Mutex<u32>>,
}

impl LineCappedWriter {
  pub(crate) fn new(path: String, max_lines: u32) -> Self {
    Self {
      path,
      max_lines,
      lines_since_trim: Arc::new(Mutex::new(0)),
    }
  }

  fn trim(&self) -> io::Result<()> {
    if !Path::new(&self.path).exists() {
      return Ok(());
    }

    let lines: Vec<String> = BufReader::new(File::open(&self.path)?)
      .lines()
      .collect::<Result<_, _>>()?;

    let max = self.max_lines as usize;
    if lines.len() > max {
      let mut file = File::create(&self.path)?;
      for line in &lines[lines.len() - max..] {
        writeln!(file, "{}", line)?;
      }
    }
    Ok(())
  }
}

impl io::Write for LineCappedWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?
      .write_all(buf)?;

    let mut pending = self
      .lines_since_trim
      .lock()
      .unwrap_or_else(|e| e.into_inner());
    *pending += buf.iter().filter(|&&b| b == b'\n').count() as u32;

    // Trim after roughly 10% of the cap (at least 50 lines) has been added.
    if *pending >= (self.max_lines / 10).max(50) {
      if let Err(e) = self.trim() {
        eprintln!("Failed to trim log file: {}", e);
      }
      *pending = 0;
    }

    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> fmt::MakeWriter<'a> for LineCappedWriter {
  type Writer = Self;

  fn make_writer(&'a self) -> Self::Writer {
    self.clone()
  }
}
