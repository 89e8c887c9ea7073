//! Asynchronous log sink.
//!
//! `env_logger` formats and filters records on the calling thread, then
//! writes the finished line into a [`ChannelWriter`]. A single `log-writer`
//! thread drains the channel to stdout and, optionally, a log file, so
//! connection threads never block on console or disk I/O.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use env_logger::{Env, Target, WriteStyle};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::thread::{self, JoinHandle};

enum Entry {
    Line(Vec<u8>),
    Shutdown,
}

/// `Write` end of the sink; each write becomes one queued entry.
#[derive(Clone)]
pub struct ChannelWriter {
    tx: Sender<Entry>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // After shutdown the receiver is gone and late records are dropped
        let _ = self.tx.send(Entry::Line(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stops the writer thread after draining queued lines.
pub struct LogSinkGuard {
    tx: Sender<Entry>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for LogSinkGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Entry::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Where drained lines go
pub struct SinkTargets {
    pub stdout: bool,
    pub file: Option<File>,
}

/// Start the writer thread.
pub fn spawn_sink(targets: SinkTargets) -> Result<(ChannelWriter, LogSinkGuard)> {
    let (tx, rx) = unbounded();

    let handle = thread::Builder::new()
        .name("log-writer".to_string())
        .spawn(move || drain(rx, targets))
        .map_err(|e| Error::Other(format!("Failed to spawn log writer: {}", e)))?;

    Ok((
        ChannelWriter { tx: tx.clone() },
        LogSinkGuard {
            tx,
            handle: Some(handle),
        },
    ))
}

fn drain(rx: Receiver<Entry>, targets: SinkTargets) {
    let mut stdout = targets.stdout.then(io::stdout);
    let mut file = targets.file.map(BufWriter::new);

    for entry in rx.iter() {
        let line = match entry {
            Entry::Line(line) => line,
            Entry::Shutdown => break,
        };

        if let Some(out) = stdout.as_mut() {
            let _ = out.write_all(&line);
        }
        if let Some(f) = file.as_mut() {
            let _ = f.write_all(&line);
            if rx.is_empty() {
                let _ = f.flush();
            }
        }
    }

    if let Some(f) = file.as_mut() {
        let _ = f.flush();
    }
    if let Some(out) = stdout.as_mut() {
        let _ = out.flush();
    }
}

/// Open the configured log file, creating its directory.
fn open_log_file(config: &LoggingConfig) -> Result<File> {
    if let Some(parent) = config.file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if config.remove_old_log {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    Ok(options.open(&config.file_path)?)
}

/// Install the global logger backed by the async sink.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the writer.
pub fn install(config: &LoggingConfig) -> Result<LogSinkGuard> {
    let file = if config.log_to_file {
        Some(open_log_file(config)?)
    } else {
        None
    };

    let (writer, guard) = spawn_sink(SinkTargets { stdout: true, file })?;

    env_logger::Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .target(Target::Pipe(Box::new(writer)))
        .write_style(WriteStyle::Never)
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}
