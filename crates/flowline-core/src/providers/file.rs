//! Line-oriented file work source: one unit per line.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::WorkInfo;
use crate::error::CodeError;
use crate::ports::{Supply, WorkProvider};

/// Turns a raw line into the opaque work payload. An `Err` marks the line
/// unparsable; the provider then emits a defect that still carries the line
/// so the engine can report a terminal event against it.
pub type LineParser = Arc<dyn Fn(&str) -> Result<serde_json::Value, CodeError> + Send + Sync>;

/// Reads an input file lazily, one `WorkInfo` per non-blank line.
///
/// Blank lines are reported as `Pending` ticks rather than silently looped
/// over, so pulls stay cheap and observable. Read errors end the stream.
pub struct LineFileProvider {
    lines: Mutex<Lines<BufReader<File>>>,
    parser: LineParser,
}

impl LineFileProvider {
    pub fn open(
        path: impl AsRef<Path>,
        parser: impl Fn(&str) -> Result<serde_json::Value, CodeError> + Send + Sync + 'static,
    ) -> Result<Self, CodeError> {
        let file = File::open(path).map_err(CodeError::local_io)?;
        Ok(Self {
            lines: Mutex::new(BufReader::new(file).lines()),
            parser: Arc::new(parser),
        })
    }
}

#[async_trait]
impl WorkProvider for LineFileProvider {
    async fn provide(&self) -> Supply {
        let next = self.lines.lock().expect("line reader lock").next();
        match next {
            None => Supply::Exhausted,
            Some(Err(e)) => {
                tracing::error!("work list read error: {e}");
                Supply::Exhausted
            }
            Some(Ok(line)) => {
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    return Supply::Pending;
                }
                match (self.parser)(line) {
                    Ok(work) => Supply::Item(WorkInfo::new(line, work)),
                    Err(err) => Supply::Defect {
                        work: Some(WorkInfo::unparsed(line)),
                        err,
                    },
                }
            }
        }
    }
}
