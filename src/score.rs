use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Receives finish times. Failures must not interrupt the race loop.
pub trait ScoreSink {
    fn submit(&mut self, millis: u64);
}

/// Appends one line per finished run to a local log file.
pub struct FileScoreSink {
    path: PathBuf,
}

impl FileScoreSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScoreSink for FileScoreSink {
    fn submit(&mut self, millis: u64) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{millis}"));
        match result {
            Ok(()) => log::info!("recorded finish time {:.2}s", millis as f64 / 1000.0),
            Err(e) => log::warn!("failed to record score in {:?}: {e}", self.path),
        }
    }
}

/// Score sink that keeps times in memory, for tests.
#[derive(Default)]
pub struct MemoryScoreSink {
    pub times: Vec<u64>,
}

impl ScoreSink for MemoryScoreSink {
    fn submit(&mut self, millis: u64) {
        self.times.push(millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_appends_one_line_per_finish() {
        let dir = std::env::temp_dir().join(format!("voicekart-scores-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("times.log");

        let mut sink = FileScoreSink::new(&path);
        sink.submit(5230);
        sink.submit(4980);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "5230\n4980\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_sink_swallows_write_errors() {
        // Path into a missing directory: open fails, submit must not panic.
        let mut sink = FileScoreSink::new("/nonexistent-dir/voicekart/times.log");
        sink.submit(1000);
    }

    #[test]
    fn memory_sink_collects_times() {
        let mut sink = MemoryScoreSink::default();
        sink.submit(100);
        sink.submit(200);
        assert_eq!(sink.times, vec![100, 200]);
    }
}
