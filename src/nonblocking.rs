//! Async wrapper over [`TransactionRunner`].
//!
//! There is no non-blocking I/O here: [`AsyncRunner`] runs the same blocking
//! transaction on tokio's blocking thread pool so async callers are not stalled.
//!
//! # Example
//!
//! ```
//! use plc_link::nonblocking::AsyncRunner;
//! use plc_link::spec::IsoTcp;
//! use plc_link::{RunnerConfig, ScriptedTransport, TransactionRunner};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let transport = ScriptedTransport::new();
//! transport.queue_reply([0x03, 0x00, 0x00, 0x05, 0xAA]);
//!
//! let runner = AsyncRunner::new(TransactionRunner::new(transport, RunnerConfig::new()));
//! let reply = runner
//!     .send_and_receive(vec![0x03, 0x00, 0x00, 0x04], Arc::new(IsoTcp))
//!     .await
//!     .unwrap();
//! assert_eq!(reply, vec![0x03, 0x00, 0x00, 0x05, 0xAA]);
//! # });
//! ```

use std::sync::Arc;

use tokio::task;

use crate::error::{LinkError, Result};
use crate::frame::Frame;
use crate::runner::{CancelToken, TransactionRunner};
use crate::spec::FrameSpec;
use crate::transport::Transport;

/// Shareable handle running transactions off the async executor.
///
/// Clones share one runner and therefore one connection lock.
#[derive(Debug)]
pub struct AsyncRunner<T> {
    inner: Arc<TransactionRunner<T>>,
}

impl<T> Clone for AsyncRunner<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> AsyncRunner<T> {
    /// Wraps a blocking runner.
    pub fn new(runner: TransactionRunner<T>) -> Self {
        Self {
            inner: Arc::new(runner),
        }
    }

    /// Returns the blocking runner.
    pub fn blocking(&self) -> &TransactionRunner<T> {
        &self.inner
    }

    /// Async form of [`TransactionRunner::execute`].
    pub async fn execute(
        &self,
        request: Vec<u8>,
        spec: Arc<dyn FrameSpec>,
        expect_response: bool,
    ) -> Result<Vec<u8>> {
        self.run(move |runner| runner.execute(&request, &*spec, expect_response))
            .await
    }

    /// Async form of [`TransactionRunner::execute_with_cancel`].
    ///
    /// Dropping the returned future does not stop the worker; fire `cancel`
    /// to abort a transaction in flight.
    pub async fn execute_with_cancel(
        &self,
        request: Vec<u8>,
        spec: Arc<dyn FrameSpec>,
        expect_response: bool,
        cancel: CancelToken,
    ) -> Result<Vec<u8>> {
        self.run(move |runner| {
            runner.execute_with_cancel(&request, &*spec, expect_response, &cancel)
        })
        .await
    }

    /// Async form of [`TransactionRunner::send`].
    pub async fn send(&self, request: Vec<u8>) -> Result<()> {
        self.run(move |runner| runner.send(&request)).await
    }

    /// Async form of [`TransactionRunner::send_and_receive`].
    pub async fn send_and_receive(
        &self,
        request: Vec<u8>,
        spec: Arc<dyn FrameSpec>,
    ) -> Result<Vec<u8>> {
        self.run(move |runner| runner.send_and_receive(&request, &*spec))
            .await
    }

    /// Async form of [`TransactionRunner::receive`].
    pub async fn receive(&self, spec: Arc<dyn FrameSpec>) -> Result<Frame> {
        self.run(move |runner| runner.receive(&*spec)).await
    }

    async fn run<R, F>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&TransactionRunner<T>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let runner = Arc::clone(&self.inner);
        task::spawn_blocking(move || job(&*runner))
            .await
            .map_err(|e| LinkError::Worker {
                reason: e.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunnerConfig;
    use crate::spec::ModbusTcp;
    use crate::transport::ScriptedTransport;
    use std::time::Duration;

    fn runner(transport: &ScriptedTransport) -> AsyncRunner<ScriptedTransport> {
        let config = RunnerConfig::new().with_receive_timeout(Duration::from_millis(50));
        AsyncRunner::new(TransactionRunner::new(transport.clone(), config))
    }

    #[tokio::test]
    async fn test_async_timeout() {
        let transport = ScriptedTransport::new();
        let runner = runner(&transport);
        let err = runner
            .send_and_receive(
                vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x01, 0x03],
                Arc::new(ModbusTcp),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Timeout));
    }

    #[tokio::test]
    async fn test_async_send() {
        let transport = ScriptedTransport::new();
        let runner = runner(&transport);
        runner.send(vec![0xFF, 0x00]).await.unwrap();
        assert_eq!(transport.writes(), vec![vec![0xFF, 0x00]]);
    }

    #[tokio::test]
    async fn test_async_receive() {
        let transport = ScriptedTransport::new();
        transport.push_bytes([0x00, 0x09, 0x00, 0x00, 0x00, 0x02, 0x01, 0x03]);
        let runner = runner(&transport);
        let frame = runner.receive(Arc::new(ModbusTcp)).await.unwrap();
        assert_eq!(frame.head()[1], 0x09);
        assert!(frame.body().is_empty());
    }
}
