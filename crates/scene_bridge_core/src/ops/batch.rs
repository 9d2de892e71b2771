use crate::transport::Transport;
use crate::types::{Command, Reply};
use crate::{Result, TransportError};

/// An ordered group of commands sent to the host as one `batch` round trip.
///
/// The host runs entries in insertion order and answers with one aggregate
/// [`Reply`]. Empty batches are allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `command`. A batch can't contain another batch.
    pub fn push(&mut self, command: Command) -> Result<&mut Self> {
        if matches!(command, Command::Batch { .. }) {
            return Err(TransportError::InvalidCommand(format!(
                "batch entry #{} is itself a batch; flatten it first",
                self.commands.len()
            )));
        }
        self.commands.push(command);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_command(self) -> Command {
        Command::Batch {
            batch: self.commands,
        }
    }

    pub async fn dispatch<T: Transport>(self, transport: &mut T) -> Result<Reply> {
        let count = self.len();
        let reply = transport.dispatch(&self.into_command()).await?;
        tracing::debug!("Batch of {} command(s) answered: {}", count, reply.message);
        Ok(reply)
    }
}

impl TryFrom<Vec<Command>> for Batch {
    type Error = TransportError;

    fn try_from(commands: Vec<Command>) -> Result<Self> {
        let mut batch = Batch::new();
        for command in commands {
            batch.push(command)?;
        }
        Ok(batch)
    }
}

/// Sends `commands` as a single `batch` command.
pub async fn dispatch_batch<T, I>(transport: &mut T, commands: I) -> Result<Reply>
where
    T: Transport,
    I: IntoIterator<Item = Command>,
{
    let batch = Batch::try_from(commands.into_iter().collect::<Vec<_>>())?;
    batch.dispatch(transport).await
}
