//! Dedicated writer task for device commands.
//!
//! The write half of the serial link is owned by a single task; callers
//! queue commands through an mpsc channel and get the outcome of the
//! underlying write back on a oneshot.
//!
//! ```text
//! start()/stop()/... ─► mpsc::Sender<CommandRequest> ─► Writer Task ─► serial TX
//!                     ◄──────────── oneshot reply (write result) ◄────┘
//! ```
//!
//! Commands are fire-and-forget from the device's point of view: the reply
//! only says whether the opcode reached the transport, not what the device
//! answered.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{LidarError, Result};
use crate::protocol::Command;

/// A queued command with its reply slot.
#[derive(Debug)]
pub struct CommandRequest {
    command: Command,
    reply: oneshot::Sender<std::io::Result<()>>,
}

/// Handle for sending commands to the writer task.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandWriter {
    tx: mpsc::Sender<CommandRequest>,
}

impl CommandWriter {
    /// Write `command` and wait for the transport write to finish.
    ///
    /// # Errors
    ///
    /// - [`LidarError::Io`] if the transport rejected the write.
    /// - [`LidarError::ConnectionClosed`] if the writer task is gone.
    pub async fn send(&self, command: Command) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CommandRequest { command, reply })
            .await
            .map_err(|_| LidarError::ConnectionClosed)?;

        rx.await.map_err(|_| LidarError::ConnectionClosed)??;
        Ok(())
    }
}

/// Spawn the writer task and return a handle for sending commands.
pub fn spawn_writer_task<W>(writer: W, channel_capacity: usize) -> (CommandWriter, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (CommandWriter { tx }, task)
}

/// Receive commands and write their opcodes until every handle is dropped.
///
/// A failed write is reported to its caller; the loop keeps serving later
/// commands so each one gets its own answer.
async fn writer_loop<W>(mut rx: mpsc::Receiver<CommandRequest>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(request) = rx.recv().await {
        let result = write_command(&mut writer, request.command).await;
        match &result {
            Ok(()) => tracing::info!("Sent {} command", request.command.name()),
            Err(e) => tracing::error!("Failed to send {} command: {}", request.command.name(), e),
        }
        // Caller may have given up waiting.
        let _ = request.reply.send(result);
    }
    tracing::debug!("Command writer shut down");
}

async fn write_command<W>(writer: &mut W, command: Command) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&command.opcode()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COMMAND_CHANNEL_CAPACITY;
    use std::io::Cursor;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_send_writes_opcode() {
        let (client, mut device) = duplex(64);
        let (writer, _task) = spawn_writer_task(client, DEFAULT_COMMAND_CHANNEL_CAPACITY);

        writer.send(Command::Start).await.unwrap();

        let mut buf = [0u8; 2];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0xA5, 0x60]);
    }

    #[tokio::test]
    async fn test_commands_written_in_order() {
        let (client, mut device) = duplex(64);
        let (writer, _task) = spawn_writer_task(client, DEFAULT_COMMAND_CHANNEL_CAPACITY);

        for command in [Command::Stop, Command::Info, Command::Status, Command::Reboot] {
            writer.send(command).await.unwrap();
        }

        let mut buf = [0u8; 8];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0xA5, 0x65, 0xA5, 0x90, 0xA5, 0x91, 0xA5, 0x80]);
    }

    #[tokio::test]
    async fn test_write_failure_reported() {
        let (client, device) = duplex(64);
        drop(device);
        let (writer, _task) = spawn_writer_task(client, DEFAULT_COMMAND_CHANNEL_CAPACITY);

        let result = writer.send(Command::Start).await;
        assert!(matches!(result, Err(LidarError::Io(_))));
    }

    #[tokio::test]
    async fn test_send_fails_after_task_abort() {
        let (client, _device) = duplex(64);
        let (writer, task) = spawn_writer_task(client, DEFAULT_COMMAND_CHANNEL_CAPACITY);

        task.abort();
        let _ = task.await;

        let result = writer.send(Command::Stop).await;
        assert!(matches!(result, Err(LidarError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_handle_drop() {
        let (client, _device) = duplex(64);
        let (writer, task) = spawn_writer_task(client, DEFAULT_COMMAND_CHANNEL_CAPACITY);

        drop(writer);

        assert!(task.await.is_ok());
    }

    #[tokio::test]
    async fn test_write_command_to_cursor() {
        let mut buf = Cursor::new(Vec::new());
        write_command(&mut buf, Command::Info).await.unwrap();
        assert_eq!(buf.into_inner(), vec![0xA5, 0x90]);
    }
}
