//! How the writer waits while the spreadsheet is locked.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stderr, Stdin,
};

/// What to do after a locked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Abort,
}

/// Waits for the lock on `path` to be released, or for the operator to
/// give up.
#[async_trait]
pub trait RetryStrategy: Send {
    async fn wait(&mut self, path: &Path, attempt: u32) -> RetryDecision;
}

/// Prompt on stderr and retry once the operator presses Enter.
///
/// Ctrl-C or end of input aborts. The reader persists across prompts, so
/// lines typed ahead are not lost.
#[derive(Debug)]
pub struct KeypressRetry<R = BufReader<Stdin>, W = Stderr> {
    input: R,
    output: W,
}

impl KeypressRetry {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stderr())
    }
}

impl Default for KeypressRetry {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> KeypressRetry<R, W> {
    pub fn with_io(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[async_trait]
impl<R, W> RetryStrategy for KeypressRetry<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn wait(&mut self, path: &Path, attempt: u32) -> RetryDecision {
        let prompt = format!(
            "{} is open in another program (attempt {attempt}). \
             Close it and press Enter to retry, or Ctrl-C to abort.\n",
            path.display()
        );
        if self.output.write_all(prompt.as_bytes()).await.is_err() {
            return RetryDecision::Abort;
        }
        let _ = self.output.flush().await;

        let mut line = String::new();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted while waiting for {}", path.display());
                RetryDecision::Abort
            }
            read = self.input.read_line(&mut line) => match read {
                Ok(0) | Err(_) => RetryDecision::Abort,
                Ok(_) => RetryDecision::Retry,
            },
        }
    }
}

/// Sleep a fixed delay between attempts; Ctrl-C aborts.
#[derive(Debug, Clone, Copy)]
pub struct BackoffRetry {
    delay: Duration,
}

impl BackoffRetry {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RetryStrategy for BackoffRetry {
    async fn wait(&mut self, path: &Path, attempt: u32) -> RetryDecision {
        tracing::debug!(
            "retrying {} in {:?} (attempt {attempt})",
            path.display(),
            self.delay
        );
        tokio::select! {
            _ = tokio::signal::ctrl_c() => RetryDecision::Abort,
            _ = tokio::time::sleep(self.delay) => RetryDecision::Retry,
        }
    }
}

/// Replays a fixed list of decisions, then aborts.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRetry {
    decisions: VecDeque<RetryDecision>,
    prompts: u32,
}

impl ScriptedRetry {
    pub fn new(decisions: impl IntoIterator<Item = RetryDecision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            prompts: 0,
        }
    }

    /// How many times [`RetryStrategy::wait`] was called.
    pub fn prompts(&self) -> u32 {
        self.prompts
    }
}

#[async_trait]
impl RetryStrategy for ScriptedRetry {
    async fn wait(&mut self, _path: &Path, _attempt: u32) -> RetryDecision {
        self.prompts += 1;
        self.decisions.pop_front().unwrap_or(RetryDecision::Abort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_retry_replays_then_aborts() {
        let mut retry = ScriptedRetry::new([RetryDecision::Retry]);
        let path = Path::new("races.csv");
        assert_eq!(retry.wait(path, 1).await, RetryDecision::Retry);
        assert_eq!(retry.wait(path, 2).await, RetryDecision::Abort);
        assert_eq!(retry.prompts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_then_retries() {
        let mut retry = BackoffRetry::new(Duration::from_secs(30));
        let started = tokio::time::Instant::now();
        assert_eq!(retry.wait(Path::new("races.csv"), 1).await, RetryDecision::Retry);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn keypress_keeps_typed_ahead_lines_until_eof() {
        let input = BufReader::new(&b"\n\n"[..]);
        let mut retry = KeypressRetry::with_io(input, Vec::new());
        let path = Path::new("races.csv");

        assert_eq!(retry.wait(path, 1).await, RetryDecision::Retry);
        assert_eq!(retry.wait(path, 2).await, RetryDecision::Retry);
        assert_eq!(retry.wait(path, 3).await, RetryDecision::Abort);

        let prompts = String::from_utf8(retry.into_output()).unwrap();
        assert_eq!(prompts.matches("press Enter to retry").count(), 3);
        assert!(prompts.contains("races.csv is open in another program (attempt 2)"));
    }
}
