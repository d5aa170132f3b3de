//! Serialized request/response transactions over one connection.
//!
//! This module provides [`TransactionRunner`], the entry point vendor codecs
//! use to talk to a device. Each call is one wire exchange:
//!
//! `Idle -> Locked -> Sending -> (ReceivingHeader -> ReceivingBody)? -> Unlocked`
//!
//! # Overview
//!
//! The runner handles:
//! - Mutual exclusion: at most one transaction in flight per connection
//! - Optional purge of stale bytes before sending
//! - Frame assembly with one shared receive budget
//! - Correlation of the reply with the request just sent
//! - A single access check per transaction, before any byte is written
//!
//! # Example
//!
//! ```
//! use plc_link::spec::ModbusTcp;
//! use plc_link::{RunnerConfig, ScriptedTransport, TransactionRunner};
//!
//! let transport = ScriptedTransport::new();
//! transport.queue_reply([0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x00, 0x2A]);
//!
//! let runner = TransactionRunner::new(transport, RunnerConfig::new());
//! let request = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
//! let reply = runner.send_and_receive(&request, &ModbusTcp)?;
//! assert_eq!(reply.len(), 11);
//! # Ok::<(), plc_link::LinkError>(())
//! ```
//!
//! # Thread Safety
//!
//! `TransactionRunner` is `Sync` when its transport is `Send`: share it behind
//! an `Arc` and concurrent calls are queued on the connection lock. Waiting for
//! the lock is bounded by [`RunnerConfig::lock_timeout`].
//!
//! # Retries
//!
//! None. A failed transaction leaves the connection possibly out of sync
//! (see [`LinkError::is_connection_suspect`]); resetting it is up to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::assembler::{FrameAssembler, DEFAULT_MAX_BODY_LENGTH, DEFAULT_POLL_INTERVAL};
use crate::error::{LinkError, Result};
use crate::frame::Frame;
use crate::spec::FrameSpec;
use crate::transport::Transport;
use crate::utils::format_hex_bytes;

/// Default receive and lock timeout (2 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration of a [`TransactionRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunnerConfig {
    /// Budget for receiving one reply, head and body together.
    pub receive_timeout: Duration,
    /// Longest wait for the connection lock.
    pub lock_timeout: Duration,
    /// Discard unread bytes before every send.
    pub purge_before_send: bool,
    /// Reject replies whose correlation id differs from the request's.
    pub verify_correlation: bool,
    /// Session token expected in reply heads.
    pub token: Option<Vec<u8>>,
    /// Largest body length accepted.
    pub max_body_length: usize,
    /// Granularity at which a blocked read re-checks cancellation.
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            receive_timeout: DEFAULT_TIMEOUT,
            lock_timeout: DEFAULT_TIMEOUT,
            purge_before_send: false,
            verify_correlation: true,
            token: None,
            max_body_length: DEFAULT_MAX_BODY_LENGTH,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl RunnerConfig {
    /// Creates a configuration with default values.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_link::RunnerConfig;
    /// use std::time::Duration;
    ///
    /// let config = RunnerConfig::new();
    /// assert_eq!(config.receive_timeout, Duration::from_secs(2));
    /// assert!(config.verify_correlation);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the receive budget (default is 2 seconds).
    ///
    /// # Example
    ///
    /// ```
    /// use plc_link::RunnerConfig;
    /// use std::time::Duration;
    ///
    /// let config = RunnerConfig::new().with_receive_timeout(Duration::from_millis(500));
    /// ```
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Sets the lock wait (default is 2 seconds).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Enables or disables the pre-send purge.
    pub fn with_purge_before_send(mut self, purge: bool) -> Self {
        self.purge_before_send = purge;
        self
    }

    /// Enables or disables correlation checks.
    pub fn with_verify_correlation(mut self, verify: bool) -> Self {
        self.verify_correlation = verify;
        self
    }

    /// Sets the session token reply heads must carry.
    pub fn with_token(mut self, token: impl Into<Vec<u8>>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the largest accepted body length (default is 64 KiB).
    pub fn with_max_body_length(mut self, max_body_length: usize) -> Self {
        self.max_body_length = max_body_length;
        self
    }

    /// Sets the cancellation poll interval (default is 50 ms).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Capability check run once per transaction before anything is written.
///
/// Any `Fn(&[u8]) -> Result<()>` closure is a policy.
///
/// # Example
///
/// ```
/// use plc_link::{AccessPolicy, LinkError};
///
/// let read_only = |request: &[u8]| {
///     if request.get(7) == Some(&0x06) {
///         return Err(LinkError::access_denied("writes are disabled"));
///     }
///     Ok(())
/// };
/// assert!(read_only.check(&[0, 1, 0, 0, 0, 6, 1, 3]).is_ok());
/// assert!(read_only.check(&[0, 1, 0, 0, 0, 6, 1, 6]).is_err());
/// ```
pub trait AccessPolicy: Send + Sync {
    /// Returns `Err(LinkError::AccessDenied)` to refuse `request`.
    ///
    /// Receive-only transactions are checked with an empty request.
    fn check(&self, request: &[u8]) -> Result<()>;
}

impl<F> AccessPolicy for F
where
    F: Fn(&[u8]) -> Result<()> + Send + Sync,
{
    fn check(&self, request: &[u8]) -> Result<()> {
        self(request)
    }
}

/// Policy that allows every transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check(&self, _request: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Cooperative cancellation flag shared between a caller and a transaction.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs transactions over one exclusively owned transport.
///
/// Each operation produces at most one request and one frame.
/// No automatic retries, caching, or reconnection.
pub struct TransactionRunner<T> {
    transport: Mutex<T>,
    config: RunnerConfig,
    policy: Box<dyn AccessPolicy>,
}

impl<T: Transport> TransactionRunner<T> {
    /// Creates a runner owning `transport`.
    pub fn new(transport: T, config: RunnerConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            config,
            policy: Box::new(AllowAll),
        }
    }

    /// Replaces the access policy (default [`AllowAll`]).
    pub fn with_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Returns the runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs one transaction.
    ///
    /// With `expect_response` false the request is sent and an empty vector
    /// returned without reading. Otherwise the reply frame is returned as
    /// head followed by body.
    ///
    /// # Errors
    ///
    /// Every [`LinkError`] variant except `Incomplete` and `Worker`.
    pub fn execute(
        &self,
        request: &[u8],
        spec: &dyn FrameSpec,
        expect_response: bool,
    ) -> Result<Vec<u8>> {
        self.dispatch(request, spec, expect_response, None)
    }

    /// Same as [`execute`](Self::execute), aborting with
    /// [`LinkError::Cancelled`] once `cancel` fires.
    ///
    /// A cancelled read stops within one poll interval and releases the lock.
    pub fn execute_with_cancel(
        &self,
        request: &[u8],
        spec: &dyn FrameSpec,
        expect_response: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        self.dispatch(request, spec, expect_response, Some(cancel))
    }

    /// Sends `request` without waiting for a reply.
    pub fn send(&self, request: &[u8]) -> Result<()> {
        self.send_only(request, "raw", None)
    }

    /// Sends `request` and returns the reply frame bytes.
    pub fn send_and_receive(&self, request: &[u8], spec: &dyn FrameSpec) -> Result<Vec<u8>> {
        self.execute(request, spec, true)
    }

    /// Sends `request` and returns the reply as a [`Frame`].
    pub fn exchange(&self, request: &[u8], spec: &dyn FrameSpec) -> Result<Frame> {
        self.transact(request, spec, None)
    }

    /// Reads one frame the device sends on its own.
    ///
    /// Used for registration and heartbeat frames. Correlation is not checked.
    pub fn receive(&self, spec: &dyn FrameSpec) -> Result<Frame> {
        self.policy.check(&[])?;
        let mut transport = self.lock()?;
        self.assembler(spec, None).read_frame(
            &mut *transport,
            None,
            self.config.token.as_deref(),
            self.config.receive_timeout,
        )
    }

    /// Returns the transport for direct use.
    pub fn transport_mut(&mut self) -> &mut T {
        self.transport.get_mut()
    }

    /// Consumes the runner, returning the transport.
    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }

    fn dispatch(
        &self,
        request: &[u8],
        spec: &dyn FrameSpec,
        expect_response: bool,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<u8>> {
        if expect_response {
            return self.transact(request, spec, cancel).map(Frame::into_bytes);
        }
        self.send_only(request, spec.name(), cancel)?;
        debug!(protocol = spec.name(), "request sent without waiting for a reply");
        Ok(Vec::new())
    }

    fn send_only(
        &self,
        request: &[u8],
        protocol: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        self.policy.check(request)?;
        let mut transport = self.lock()?;
        self.write_request(&mut *transport, request, protocol, cancel)
    }

    /// Writes `request` and reads the matching reply under one lock.
    fn transact(
        &self,
        request: &[u8],
        spec: &dyn FrameSpec,
        cancel: Option<&CancelToken>,
    ) -> Result<Frame> {
        self.policy.check(request)?;
        let mut transport = self.lock()?;
        let protocol = spec.name();

        self.write_request(&mut *transport, request, protocol, cancel)?;

        let frame = self.assembler(spec, cancel).read_frame(
            &mut *transport,
            Some(request),
            self.config.token.as_deref(),
            self.config.receive_timeout,
        )?;

        if self.config.verify_correlation {
            let expected = spec.correlation_id(request);
            let received = spec.correlation_id(frame.head());
            if expected != received {
                warn!(protocol, expected, received, "reply does not match request");
                return Err(LinkError::correlation(expected, received));
            }
        }
        Ok(frame)
    }

    /// Purges if configured and writes the request under the held lock.
    fn write_request(
        &self,
        transport: &mut T,
        request: &[u8],
        protocol: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        if self.config.purge_before_send {
            let purged = transport
                .discard_pending()
                .map_err(|e| LinkError::from_io(e, 0))?;
            if purged > 0 {
                debug!(protocol, purged, "discarded stale bytes before send");
            }
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(LinkError::Cancelled);
        }

        trace!(protocol, request = %format_hex_bytes(request), "sending request");
        transport
            .write_all(request)
            .map_err(|e| LinkError::from_io(e, 0))
    }

    fn lock(&self) -> Result<MutexGuard<'_, T>> {
        let guard = self
            .transport
            .try_lock_for(self.config.lock_timeout)
            .ok_or(LinkError::LockTimeout)?;
        debug!("transaction lock acquired");
        Ok(guard)
    }

    fn assembler<'a>(
        &'a self,
        spec: &'a dyn FrameSpec,
        cancel: Option<&'a CancelToken>,
    ) -> FrameAssembler<'a, dyn FrameSpec + 'a> {
        let assembler = FrameAssembler::new(spec)
            .with_max_body_length(self.config.max_body_length)
            .with_poll_interval(self.config.poll_interval);
        match cancel {
            Some(cancel) => assembler.with_cancel(cancel),
            None => assembler,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TransactionRunner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionRunner")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
