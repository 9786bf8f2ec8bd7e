//! Connector trait definitions

use async_trait::async_trait;

use pontoon_core::Result;

/// A source of one full logical database dump.
///
/// The byte sequence produced through [`read`](Self::read) is lazy,
/// finite, and non-restartable: once a dump has started, the only way
/// to read it again is a fresh connector instance. A mid-stream failure
/// surfaces as [`Error::StreamInterrupted`], never as a clean
/// end-of-stream.
///
/// [`Error::StreamInterrupted`]: pontoon_core::Error::StreamInterrupted
#[async_trait]
pub trait SourceConnector: Send {
    /// Open the dump stream. Failures to reach or authenticate against
    /// the database surface as [`Error::Connection`].
    ///
    /// [`Error::Connection`]: pontoon_core::Error::Connection
    async fn open(&mut self) -> Result<()>;

    /// Read the next bytes of the dump into `buf`, returning how many
    /// were written. `Ok(0)` means clean end-of-stream; a source that
    /// dies mid-dump returns [`Error::StreamInterrupted`] instead.
    ///
    /// [`Error::StreamInterrupted`]: pontoon_core::Error::StreamInterrupted
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the stream. Safe to call at any point, including after
    /// an error or before end-of-stream (the remainder is abandoned).
    async fn close(&mut self) -> Result<()>;
}

/// A destination applying one full logical database dump.
///
/// Contract for implementers: restores are re-run from the beginning
/// after any failure, so applying the same dump from scratch multiple
/// times must be safe. Implementations achieve this with
/// replace-not-append semantics (dumps carrying drop/recreate
/// statements, single-transaction application), not by this pipeline
/// tracking partial progress.
#[async_trait]
pub trait DestinationConnector: Send {
    /// Open the apply stream. Failures to reach or authenticate against
    /// the database surface as [`Error::Connection`].
    ///
    /// [`Error::Connection`]: pontoon_core::Error::Connection
    async fn open(&mut self) -> Result<()>;

    /// Feed the next verified bytes of the dump to the destination.
    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Finish the stream and wait for the destination to commit what it
    /// was fed. An unsuccessful apply surfaces here.
    async fn close(&mut self) -> Result<()>;
}
