use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;

use super::AlertChannel;

/// Prints the message; used when no remote channel is configured
pub struct StdoutChannel;

#[async_trait]
impl AlertChannel for StdoutChannel {
    fn name(&self) -> &str { "stdout" }

    async fn send(&self, message: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", message)?;
        out.flush()?;
        Ok(())
    }
}
