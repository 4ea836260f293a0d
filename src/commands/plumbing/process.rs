use crate::areas::repository::Repository;
use crate::artifacts::protocol::session::{FilterSession, SessionSummary};
use std::io::{Read, Write};
use tracing::debug;

impl Repository {
    /// Serve one long-running filter session over `input` and `output`
    pub fn process(&self, input: impl Read, output: impl Write) -> anyhow::Result<SessionSummary> {
        let config = self.config()?;
        debug!(?config, "Starting filter session");

        FilterSession::new(self.database(), self.blob_reader(), config, self.git_dir())
            .run(input, output)
    }
}
