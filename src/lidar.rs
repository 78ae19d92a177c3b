//! LIDAR session: builder, reader task, and control surface.
//!
//! A [`Lidar`] owns everything for one device: the reassembly state (inside
//! the reader task), the ready-frame queue, the scan mode, and the command
//! writer. Lifecycle:
//! 1. Split the byte stream into read and write halves
//! 2. Spawn the command writer task
//! 3. Spawn the reader task feeding the [`Reassembler`]
//! 4. Send `stop` so the device starts from a known idle state
//!
//! # Example
//!
//! ```ignore
//! use x4lidar::{decoder::decode, Lidar};
//!
//! #[tokio::main]
//! async fn main() -> x4lidar::Result<()> {
//!     let lidar = Lidar::builder().open("/dev/ttyUSB0").await?;
//!     lidar.start().await?;
//!
//!     loop {
//!         let frame = lidar.read_frame().await?;
//!         match decode(&frame) {
//!             Ok(samples) => println!("{} samples", samples.len()),
//!             Err(e) => eprintln!("skipping frame: {e}"),
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

use crate::config::{ChecksumPolicy, LidarConfig, OverrunPolicy};
use crate::decoder::{decode, Sample};
use crate::error::{LidarError, Result};
use crate::mode::{Mode, ModeController};
use crate::protocol::{Command, Frame, Reassembler};
use crate::stats::{Stats, StatsSnapshot};
use crate::transport::open_serial;
use crate::writer::{spawn_writer_task, CommandWriter};

/// Builder for configuring and opening a LIDAR session.
#[derive(Debug, Clone, Default)]
pub struct LidarBuilder {
    config: LidarConfig,
}

impl LidarBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration.
    pub fn from_config(config: LidarConfig) -> Self {
        Self { config }
    }

    /// Serial baud rate. Default: 128000
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    /// Ready frames buffered before the reader starts dropping. Default: 8
    pub fn frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.frame_queue_capacity = capacity;
        self
    }

    /// How long `read_frame` waits for a frame. Default: 1 second
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Bytes requested per transport read. Default: 512
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Commands buffered for the writer task. Default: 16
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.command_channel_capacity = capacity;
        self
    }

    pub fn overrun_policy(mut self, policy: OverrunPolicy) -> Self {
        self.config.overrun_policy = policy;
        self
    }

    pub fn checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.config.checksum_policy = policy;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &LidarConfig {
        &self.config
    }

    /// Open the serial port at `path` and start the session.
    pub async fn open(self, path: &str) -> Result<Lidar> {
        self.config.validate()?;
        let port = open_serial(path, self.config.baud_rate)?;
        Lidar::spawn_session(port, self.config).await
    }

    /// Start a session over an already-open byte stream.
    pub async fn connect<S>(self, stream: S) -> Result<Lidar>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.config.validate()?;
        Lidar::spawn_session(stream, self.config).await
    }
}

/// A running LIDAR session.
pub struct Lidar {
    mode: ModeController,
    writer: CommandWriter,
    /// Ready frames from the reader task.
    frames: Mutex<mpsc::Receiver<Frame>>,
    stats: Arc<Stats>,
    read_timeout: Duration,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl Lidar {
    /// Create a new session builder.
    pub fn builder() -> LidarBuilder {
        LidarBuilder::new()
    }

    async fn spawn_session<S>(stream: S, config: LidarConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);

        let (writer, writer_task) = spawn_writer_task(write_half, config.command_channel_capacity);

        let stats = Stats::new();
        let (ready_tx, ready_rx) = mpsc::channel(config.frame_queue_capacity);
        let reassembler = Reassembler::new(
            ready_tx,
            config.overrun_policy,
            config.checksum_policy,
            stats.clone(),
        );
        let reader_task = tokio::spawn(read_loop(read_half, reassembler, config.read_chunk_size));

        let lidar = Lidar {
            mode: ModeController::new(),
            writer,
            frames: Mutex::new(ready_rx),
            stats,
            read_timeout: config.read_timeout(),
            reader_task,
            writer_task,
        };

        // The device may still be scanning from a previous session.
        lidar.send(Command::Stop).await?;

        Ok(lidar)
    }

    /// Record the mode transition, then write the command.
    async fn send(&self, command: Command) -> Result<()> {
        let mode = self.mode.record(command);
        tracing::trace!("{} -> {:?}", command.name(), mode);
        self.writer.send(command).await
    }

    /// Enter scan mode. Frames queued before this call are discarded.
    pub async fn start(&self) -> Result<()> {
        self.discard_queued();
        self.send(Command::Start).await
    }

    /// Leave scan mode.
    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    /// Ask the device for its information block. The reply is not parsed.
    pub async fn request_info(&self) -> Result<()> {
        self.send(Command::Info).await
    }

    /// Ask the device for its health status. The reply is not parsed.
    pub async fn request_status(&self) -> Result<()> {
        self.send(Command::Status).await
    }

    /// Soft-reboot the device; leaves scan mode.
    pub async fn reboot(&self) -> Result<()> {
        self.send(Command::Reboot).await
    }

    #[inline]
    pub fn current_mode(&self) -> Mode {
        self.mode.current()
    }

    /// Wait for the next ready frame.
    ///
    /// The whole call, including waiting for other readers, is bounded by
    /// the configured read timeout.
    ///
    /// # Errors
    ///
    /// - [`LidarError::NotScanning`] if the mode is [`Mode::Stopped`]; no
    ///   queue state is touched.
    /// - [`LidarError::Unavailable`] if no frame arrived in time. The call
    ///   can simply be retried.
    /// - [`LidarError::ConnectionClosed`] if the link is gone and the queue
    ///   is drained.
    pub async fn read_frame(&self) -> Result<Frame> {
        if !self.mode.is_scanning() {
            return Err(LidarError::NotScanning);
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut frames = timeout_at(deadline, self.frames.lock())
            .await
            .map_err(|_| LidarError::Unavailable)?;

        match timeout_at(deadline, frames.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(LidarError::ConnectionClosed),
            Err(_) => Err(LidarError::Unavailable),
        }
    }

    /// Take a ready frame without waiting.
    pub fn try_read_frame(&self) -> Result<Frame> {
        if !self.mode.is_scanning() {
            return Err(LidarError::NotScanning);
        }

        let mut frames = self
            .frames
            .try_lock()
            .map_err(|_| LidarError::Unavailable)?;

        frames.try_recv().map_err(|e| match e {
            mpsc::error::TryRecvError::Empty => LidarError::Unavailable,
            mpsc::error::TryRecvError::Disconnected => LidarError::ConnectionClosed,
        })
    }

    /// Wait for the next frame and decode it.
    pub async fn read_samples(&self) -> Result<Vec<Sample>> {
        let frame = self.read_frame().await?;
        decode(&frame)
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Put the device back to idle and shut the session down.
    ///
    /// The tasks are stopped even if the `stop` write fails.
    pub async fn close(self) -> Result<()> {
        let result = self.send(Command::Stop).await;
        self.reader_task.abort();
        self.writer_task.abort();
        result
    }

    /// Drop frames queued so far. Skipped while another caller is waiting
    /// in `read_frame`; that caller takes the queued frames instead.
    fn discard_queued(&self) {
        let Ok(mut frames) = self.frames.try_lock() else {
            tracing::debug!("Frame queue busy, stale frames kept");
            return;
        };
        let mut stale = 0;
        while frames.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            tracing::debug!("Discarded {} stale frames", stale);
        }
    }
}

impl Drop for Lidar {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

/// Delivery context: read chunks and hand them to the reassembler.
async fn read_loop<R>(mut reader: R, mut reassembler: Reassembler, chunk_size: usize)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("Serial link closed");
                return;
            }
            Ok(n) => {
                reassembler.on_bytes(&buf[..n]);
            }
            Err(e) => {
                tracing::error!("Serial read error: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    async fn session(builder: LidarBuilder) -> (Lidar, DuplexStream) {
        let (host, mut device) = duplex(4096);
        let lidar = builder.connect(host).await.unwrap();

        let mut opcode = [0u8; 2];
        device.read_exact(&mut opcode).await.unwrap();
        assert_eq!(opcode, Command::Stop.opcode());

        (lidar, device)
    }

    async fn wait_for<F: Fn(&StatsSnapshot) -> bool>(lidar: &Lidar, f: F) {
        for _ in 0..200 {
            if f(&lidar.stats()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached: {:?}", lidar.stats());
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Lidar::builder()
            .baud_rate(115_200)
            .frame_queue_capacity(32)
            .read_timeout(Duration::from_millis(250))
            .read_chunk_size(64)
            .command_channel_capacity(4)
            .overrun_policy(OverrunPolicy::Truncate)
            .checksum_policy(ChecksumPolicy::Reject);

        let config = builder.config();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.frame_queue_capacity, 32);
        assert_eq!(config.read_timeout_ms, 250);
        assert_eq!(config.read_chunk_size, 64);
        assert_eq!(config.command_channel_capacity, 4);
        assert_eq!(config.overrun_policy, OverrunPolicy::Truncate);
        assert_eq!(config.checksum_policy, ChecksumPolicy::Reject);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (host, _device) = duplex(64);
        let result = Lidar::builder().frame_queue_capacity(0).connect(host).await;
        assert!(matches!(result, Err(LidarError::Config(_))));
    }

    #[tokio::test]
    async fn test_connect_sends_stop_and_starts_stopped() {
        let (lidar, _device) = session(Lidar::builder()).await;
        assert_eq!(lidar.current_mode(), Mode::Stopped);
    }

    #[tokio::test]
    async fn test_read_while_stopped_fails_fast() {
        let (lidar, mut device) = session(Lidar::builder()).await;
        device.write_all(&build_frame(0, 0, 0, &[1, 2])).await.unwrap();
        wait_for(&lidar, |s| s.frames_delivered == 1).await;

        assert!(matches!(lidar.read_frame().await, Err(LidarError::NotScanning)));
        assert!(matches!(lidar.try_read_frame(), Err(LidarError::NotScanning)));
        assert_eq!(lidar.frames.try_lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_keeps_frames_while_queue_busy() {
        let (lidar, mut device) = session(Lidar::builder()).await;
        device.write_all(&build_frame(0, 0, 0, &[1, 2])).await.unwrap();
        wait_for(&lidar, |s| s.frames_delivered == 1).await;

        let held = lidar.frames.try_lock().unwrap();
        lidar.start().await.unwrap();
        assert_eq!(held.len(), 1);
        drop(held);

        assert!(lidar.try_read_frame().is_ok());
    }

    #[tokio::test]
    async fn test_mode_follows_commands() {
        let (lidar, mut device) = session(Lidar::builder()).await;

        lidar.start().await.unwrap();
        assert_eq!(lidar.current_mode(), Mode::Scanning);
        lidar.request_info().await.unwrap();
        lidar.request_status().await.unwrap();
        assert_eq!(lidar.current_mode(), Mode::Scanning);
        lidar.reboot().await.unwrap();
        assert_eq!(lidar.current_mode(), Mode::Stopped);
        lidar.start().await.unwrap();
        lidar.stop().await.unwrap();
        assert_eq!(lidar.current_mode(), Mode::Stopped);

        let mut buf = [0u8; 12];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(
            buf,
            [0xA5, 0x60, 0xA5, 0x90, 0xA5, 0x91, 0xA5, 0x80, 0xA5, 0x60, 0xA5, 0x65]
        );
    }

    #[tokio::test]
    async fn test_read_frame_returns_delivered_frame() {
        let (lidar, mut device) = session(Lidar::builder()).await;
        lidar.start().await.unwrap();

        let wire = build_frame(2, 0x0140, 0x2D00, &[400, 800, 1200]);
        device.write_all(&wire).await.unwrap();

        let frame = lidar.read_frame().await.unwrap();
        assert_eq!(frame.wire_bytes(), &wire[..]);
    }

    #[tokio::test]
    async fn test_read_frame_times_out() {
        let (lidar, _device) =
            session(Lidar::builder().read_timeout(Duration::from_millis(20))).await;
        lidar.start().await.unwrap();

        let result = lidar.read_frame().await;
        assert!(matches!(result, Err(LidarError::Unavailable)));
    }

    #[tokio::test]
    async fn test_try_read_frame_empty_is_unavailable() {
        let (lidar, _device) = session(Lidar::builder()).await;
        lidar.start().await.unwrap();
        assert!(matches!(lidar.try_read_frame(), Err(LidarError::Unavailable)));
    }

    #[tokio::test]
    async fn test_start_discards_stale_frames() {
        let (lidar, mut device) =
            session(Lidar::builder().read_timeout(Duration::from_millis(20))).await;

        device.write_all(&build_frame(0, 0, 0, &[1, 2])).await.unwrap();
        wait_for(&lidar, |s| s.frames_delivered == 1).await;

        lidar.start().await.unwrap();
        assert!(matches!(lidar.read_frame().await, Err(LidarError::Unavailable)));
    }

    #[tokio::test]
    async fn test_link_closed_after_queue_drained() {
        let (lidar, mut device) = session(Lidar::builder()).await;
        lidar.start().await.unwrap();

        let mut start = [0u8; 2];
        device.read_exact(&mut start).await.unwrap();
        device.write_all(&build_frame(0, 0, 0, &[1, 2])).await.unwrap();
        drop(device);

        assert!(lidar.read_frame().await.is_ok());
        assert!(matches!(
            lidar.read_frame().await,
            Err(LidarError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_samples_decodes() {
        let (lidar, mut device) = session(Lidar::builder()).await;
        lidar.start().await.unwrap();

        device
            .write_all(&build_frame(0, 0x0140, 0x2D00, &[400, 800, 1200]))
            .await
            .unwrap();

        let samples = lidar.read_samples().await.unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].distance_mm, 300.0);
    }

    #[tokio::test]
    async fn test_close_sends_stop() {
        let (lidar, mut device) = session(Lidar::builder()).await;
        lidar.start().await.unwrap();
        lidar.close().await.unwrap();

        let mut buf = [0u8; 4];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0xA5, 0x60, 0xA5, 0x65]);
    }
}
