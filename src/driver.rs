//! Frame driver - runs an [`InputCoordinator`] on its own tokio task
//!
//! ```text
//! InputSource ─[InputEvent]──┐
//! CoordinatorHandle ─[cmd]───┼──► InputDriver<Running> ──► InputCoordinator
//! frame interval ─[tick]─────┘
//! ```
//!
//! The driver task is the only place the coordinator is touched, so events,
//! commands and poll ticks are applied one at a time in arrival order. One poll
//! evaluation runs per tick; missed ticks are skipped rather than replayed.

use crate::binding::{BindingDocument, BindingKey, Callback, CallbackResolver, RestoreReport};
use crate::coordinator::{
    BindMode, CaptureHandle, CaptureTarget, CoordinatorError, InputCoordinator,
};
use crate::source::{InputEvent, InputSource, SourceError};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const EVENT_BUFFER: usize = 1000;
const COMMAND_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Input source error: {0}")]
    Source(#[from] SourceError),

    #[error("Driver task failed: {0}")]
    TaskError(String),
}

/// Requests forwarded from a [`CoordinatorHandle`] to the driver task
pub enum CoordinatorCommand {
    Bind {
        key: BindingKey,
        callback: Callback,
        mode: BindMode,
        response_tx: oneshot::Sender<Result<Option<CaptureHandle>, CoordinatorError>>,
    },
    Rebind {
        callback: Callback,
        target: CaptureTarget,
        response_tx: oneshot::Sender<Result<CaptureHandle, CoordinatorError>>,
    },
    Unbind {
        key: BindingKey,
        response_tx: oneshot::Sender<Result<(), CoordinatorError>>,
    },
    ListBindings {
        response_tx: oneshot::Sender<Vec<(BindingKey, String)>>,
    },
    LoadBindings {
        document: BindingDocument,
        resolver: Box<dyn CallbackResolver + Send>,
        response_tx: oneshot::Sender<RestoreReport>,
    },
    ExportBindings {
        response_tx: oneshot::Sender<BindingDocument>,
    },
    /// Event from the host that does not come through the source, e.g. window key presses
    Inject { event: InputEvent },
}

macro_rules! respond {
    ($response_tx:expr, $value:expr) => {
        if $response_tx.send($value).is_err() {
            debug!("Command caller went away before the response");
        }
    };
}

#[state]
#[derive(Debug, Clone)]
pub enum DriverState {
    Initializing,
    Running,
}

#[machine]
#[derive(Debug)]
pub struct InputDriver<S: DriverState> {
    coordinator: InputCoordinator,

    source: Box<dyn InputSource>,

    // Source events; the sender half goes to the source on initialize
    event_sender: mpsc::Sender<InputEvent>,
    event_receiver: mpsc::Receiver<InputEvent>,

    commands: mpsc::Receiver<CoordinatorCommand>,

    frame_interval: Duration,
}

impl InputDriver<Initializing> {
    pub fn create(
        coordinator: InputCoordinator,
        source: Box<dyn InputSource>,
        commands: mpsc::Receiver<CoordinatorCommand>,
    ) -> Self {
        let frame_interval = Duration::from_millis(coordinator.settings().frame_interval_ms.max(1));
        let (event_sender, event_receiver) = mpsc::channel(EVENT_BUFFER);
        debug!("Created event channel with buffer capacity {}", EVENT_BUFFER);

        Self::new(
            coordinator,
            source,
            event_sender,
            event_receiver,
            commands,
            frame_interval,
        )
    }

    /// Subscribes to the source and moves to `Running`.
    pub fn initialize(mut self) -> Result<InputDriver<Running>, DriverError> {
        self.source.subscribe(self.event_sender.clone())?;
        info!(
            "Input driver subscribed, ticking every {:?}",
            self.frame_interval
        );
        Ok(self.transition())
    }
}

impl InputDriver<Running> {
    /// Runs until `token` is cancelled or every handle is gone, then hands the
    /// coordinator back.
    pub async fn run(mut self, token: CancellationToken) -> InputCoordinator {
        let mut ticker = interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    info!("Input driver cancelled");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.execute(command),
                    None => {
                        info!("All coordinator handles dropped, stopping input driver");
                        break;
                    }
                },
                Some(event) = self.event_receiver.recv() => {
                    debug!("Input event: {:?}", event);
                    self.coordinator.handle_event(event);
                }
                _ = ticker.tick() => {
                    self.coordinator.poll(self.source.as_ref());
                }
            }
        }

        self.source.unsubscribe();
        self.coordinator
    }

    fn execute(&mut self, command: CoordinatorCommand) {
        match command {
            CoordinatorCommand::Bind {
                key,
                callback,
                mode,
                response_tx,
            } => respond!(response_tx, self.coordinator.bind(key, callback, mode)),
            CoordinatorCommand::Rebind {
                callback,
                target,
                response_tx,
            } => respond!(response_tx, self.coordinator.rebind(callback, target)),
            CoordinatorCommand::Unbind { key, response_tx } => {
                respond!(response_tx, self.coordinator.unbind(&key).map(|_| ()))
            }
            CoordinatorCommand::ListBindings { response_tx } => {
                respond!(response_tx, self.coordinator.list_bindings())
            }
            CoordinatorCommand::LoadBindings {
                document,
                resolver,
                response_tx,
            } => respond!(
                response_tx,
                self.coordinator.load_bindings(document, resolver.as_ref())
            ),
            CoordinatorCommand::ExportBindings { response_tx } => {
                respond!(response_tx, self.coordinator.export_bindings())
            }
            CoordinatorCommand::Inject { event } => self.coordinator.handle_event(event),
        }
    }
}

/// Async front of a coordinator running on a driver task.
///
/// Dropping the handle closes the command channel, which stops the driver.
pub struct CoordinatorHandle {
    commands: mpsc::Sender<CoordinatorCommand>,
    token: CancellationToken,
    task: JoinHandle<InputCoordinator>,
}

impl CoordinatorHandle {
    /// Subscribes `source` and spawns the driver task. Must be called inside a tokio runtime.
    pub fn spawn(
        coordinator: InputCoordinator,
        source: Box<dyn InputSource>,
    ) -> Result<Self, DriverError> {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let driver = InputDriver::create(coordinator, source, commands_rx).initialize()?;

        let token = CancellationToken::new();
        let task = tokio::spawn(driver.run(token.clone()));
        info!("Input driver started");

        Ok(Self {
            commands: commands_tx,
            token,
            task,
        })
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> CoordinatorCommand,
    ) -> Result<T, CoordinatorError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.commands
            .send(command(response_tx))
            .await
            .map_err(|_| CoordinatorError::DriverStopped)?;
        response_rx.await.map_err(|_| CoordinatorError::DriverStopped)
    }

    pub async fn bind(
        &self,
        key: BindingKey,
        callback: Callback,
        mode: BindMode,
    ) -> Result<Option<CaptureHandle>, CoordinatorError> {
        self.request(|response_tx| CoordinatorCommand::Bind {
            key,
            callback,
            mode,
            response_tx,
        })
        .await?
    }

    pub async fn rebind(
        &self,
        callback: Callback,
        target: CaptureTarget,
    ) -> Result<CaptureHandle, CoordinatorError> {
        self.request(|response_tx| CoordinatorCommand::Rebind {
            callback,
            target,
            response_tx,
        })
        .await?
    }

    pub async fn unbind(&self, key: BindingKey) -> Result<(), CoordinatorError> {
        self.request(|response_tx| CoordinatorCommand::Unbind { key, response_tx })
            .await?
    }

    pub async fn list_bindings(&self) -> Result<Vec<(BindingKey, String)>, CoordinatorError> {
        self.request(|response_tx| CoordinatorCommand::ListBindings { response_tx })
            .await
    }

    pub async fn load_bindings<R>(
        &self,
        document: BindingDocument,
        resolver: R,
    ) -> Result<RestoreReport, CoordinatorError>
    where
        R: CallbackResolver + Send + 'static,
    {
        self.request(|response_tx| CoordinatorCommand::LoadBindings {
            document,
            resolver: Box::new(resolver),
            response_tx,
        })
        .await
    }

    pub async fn export_bindings(&self) -> Result<BindingDocument, CoordinatorError> {
        self.request(|response_tx| CoordinatorCommand::ExportBindings { response_tx })
            .await
    }

    pub async fn inject(&self, event: InputEvent) -> Result<(), CoordinatorError> {
        self.commands
            .send(CoordinatorCommand::Inject { event })
            .await
            .map_err(|_| CoordinatorError::DriverStopped)
    }

    /// Stops the driver and returns the coordinator with its bindings.
    pub async fn shutdown(self) -> Result<InputCoordinator, DriverError> {
        self.token.cancel();
        self.task.await.map_err(|e| {
            error!("Input driver task failed: {}", e);
            DriverError::TaskError(e.to_string())
        })
    }
}
