use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use wallfit_common::{
    assign, Catalog, DirectoryWatcher, DisplayOutput, ErrorReporting, IpcCommand, IpcResponse,
    OutputStatus, ProcessExecutor, Slot, SlotDecision, SlotOutcome, AssignmentState,
};
use wallfit_common::watcher::DEFAULT_DEBOUNCE;
use wallfit_config::Config;

pub const DISPLAY_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DISPLAY_DEBOUNCE: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub enum Trigger {
    Startup,
    AutoChange,
    DirectoryChanged,
    DisplaysChanged,
    Ipc {
        command: IpcCommand,
        reply: oneshot::Sender<IpcResponse>,
    },
}

/// Everything the dispatcher owns. Only the dispatcher task touches it, so
/// wallpaper commands never interleave.
pub struct Daemon {
    config: Config,
    catalog: Arc<Catalog>,
    executor: ProcessExecutor,
    persisted: AssignmentState,
    state_file: PathBuf,
    outputs: Vec<DisplayOutput>,
    decisions: Vec<SlotDecision>,
    watcher: Option<DirectoryWatcher>,
    auto_change_deadline: Option<Instant>,
    triggers: mpsc::UnboundedSender<Trigger>,
}

impl Daemon {
    pub fn new(config: Config, executor: ProcessExecutor, triggers: mpsc::UnboundedSender<Trigger>) -> Self {
        let state_file = AssignmentState::default_path();
        let persisted = AssignmentState::load(&state_file).unwrap_or_else(|e| {
            log::warn!("Failed to load state, starting fresh: {}", e);
            AssignmentState::new()
        });

        Self {
            config,
            catalog: Arc::new(Catalog::new()),
            executor,
            persisted,
            state_file,
            outputs: Vec::new(),
            decisions: Vec::new(),
            watcher: None,
            auto_change_deadline: None,
            triggers,
        }
    }

    /// Consumes triggers until every sender is gone.
    pub async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Trigger>) {
        loop {
            let deadline = self.auto_change_deadline;
            tokio::select! {
                trigger = receiver.recv() => match trigger {
                    Some(trigger) => self.handle(trigger).await,
                    None => break,
                },
                _ = sleep_until(deadline) => self.handle(Trigger::AutoChange).await,
            }
        }

        log::info!("Dispatcher stopped");
    }

    pub async fn handle(&mut self, trigger: Trigger) {
        log::debug!("Handling trigger: {:?}", trigger);

        match trigger {
            Trigger::Startup => {
                self.rescan().await;
                self.arm_watcher();
                self.restart_auto_change();
                log_outcome("startup", self.apply(false).await);
            }
            Trigger::AutoChange => {
                self.restart_auto_change();
                log_outcome("auto-change", self.apply(true).await);
            }
            Trigger::DirectoryChanged => {
                self.rescan().await;
                log_outcome("directory change", self.apply(false).await);
            }
            Trigger::DisplaysChanged => {
                log_outcome("display change", self.apply(false).await);
            }
            Trigger::Ipc { command, reply } => {
                let response = self.handle_command(command).await;
                if reply.send(response).is_err() {
                    log::warn!("IPC client went away before the response was sent");
                }
            }
        }
    }

    async fn handle_command(&mut self, command: IpcCommand) -> IpcResponse {
        let result = match command {
            IpcCommand::Change => {
                self.restart_auto_change();
                self.apply(true).await
            }
            IpcCommand::Apply => self.apply(false).await,
            IpcCommand::Rescan => {
                self.rescan().await;
                self.apply(false).await
            }
            IpcCommand::Reload => self.reload().await,
            IpcCommand::Status => return self.status(),
        };

        match result {
            Ok(message) => IpcResponse::Success { message },
            Err(e) => {
                log::error!("{:?} failed: {:#}", command, e);
                IpcResponse::Error { message: format!("{:#}", e) }
            }
        }
    }

    /// Reads the outputs, runs one assignment and sets the new wallpapers.
    async fn apply(&mut self, force_change: bool) -> Result<String> {
        let outputs = self.executor.query_outputs().await.map_err(|e| {
            e.log_error("Querying outputs");
            anyhow::anyhow!(e.user_friendly_message())
        })?;

        let slots = build_slots(&outputs, &self.persisted);
        let policy = self.config.policy();
        let assignment = assign(&self.catalog, &slots, &policy, force_change);

        let mode = self.config.selection.display_mode;
        let mut changed = 0;
        let mut failed = 0;
        for (slot_id, image) in assignment.changes() {
            let Some(slot) = slots.iter().find(|slot| slot.id == slot_id) else {
                continue;
            };
            if slot.current.as_deref() == Some(image) {
                log::debug!("{} already shows {:?}", slot_id, image);
                continue;
            }

            match self.executor.set_wallpaper(slot_id, image, mode).await {
                Ok(()) => {
                    self.persisted.record(slot_id, image, slot.width, slot.height);
                    changed += 1;
                }
                Err(e) => {
                    log::error!("Failed to set wallpaper for {}: {}", slot_id, e.user_friendly_message());
                    failed += 1;
                }
            }
        }

        if force_change {
            self.persisted.mark_forced_change();
        }
        self.persisted.retain_outputs(outputs.iter().map(|o| o.name.as_str()));
        if let Err(e) = self.persisted.save(&self.state_file) {
            log::error!("Failed to save state: {:#}", e);
        }

        let summary = summarize(assignment.decisions(), changed, failed);
        self.outputs = outputs;
        self.decisions = assignment.decisions().to_vec();

        if failed > 0 {
            anyhow::bail!("{}", summary);
        }
        Ok(summary)
    }

    async fn rescan(&mut self) {
        let directory = self.config.image_directory();
        let recursive = self.config.general.recursive;
        let scan_dir = directory.clone();

        let scanned = tokio::task::spawn_blocking(move || Catalog::scan(&scan_dir, recursive)).await;
        let catalog = match scanned {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(e)) => {
                log::warn!("{}; continuing with an empty catalog", e.user_friendly_message());
                Catalog::new()
            }
            Err(e) => {
                log::error!("Catalog scan task failed: {}", e);
                Catalog::new()
            }
        };

        log::info!("Catalog of {:?}: {} image(s)", directory, catalog.len());
        self.catalog = Arc::new(catalog);
    }

    async fn reload(&mut self) -> Result<String> {
        let new_config = Config::load()
            .map_err(|e| anyhow::anyhow!("Failed to reload configuration: {}", e.user_friendly_message()))?;

        let catalog_changed = new_config.image_directory() != self.config.image_directory()
            || new_config.general.recursive != self.config.general.recursive;
        let directory_changed = new_config.image_directory() != self.config.image_directory();
        self.config = new_config;

        if catalog_changed {
            self.rescan().await;
            self.arm_watcher();
        }
        self.restart_auto_change();

        let summary = self.apply(directory_changed).await
            .context("Configuration reloaded, but applying it failed")?;
        Ok(format!("Configuration reloaded; {}", summary))
    }

    fn status(&self) -> IpcResponse {
        let outputs = self
            .decisions
            .iter()
            .filter_map(|decision| {
                let output = self.outputs.iter().find(|o| o.name == decision.slot)?;
                let current_image = match &decision.outcome {
                    SlotOutcome::Assigned(path) => Some(path.clone()),
                    _ => output.current_image.clone().or_else(|| {
                        self.persisted
                            .current_image_for(&output.name, output.width, output.height)
                            .map(|p| p.to_path_buf())
                    }),
                };
                Some(OutputStatus {
                    name: output.name.clone(),
                    width: output.width,
                    height: output.height,
                    current_image: current_image.map(|p| p.to_string_lossy().to_string()),
                    eligible: decision.eligible,
                    last_outcome: decision.outcome.to_string(),
                })
            })
            .collect();

        IpcResponse::Status {
            outputs,
            catalog_size: self.catalog.len(),
            auto_change_remaining: self
                .auto_change_deadline
                .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_secs()),
        }
    }

    fn arm_watcher(&mut self) {
        self.watcher = None;

        let directory = self.config.image_directory();
        let triggers = self.triggers.clone();
        match DirectoryWatcher::start(&directory, self.config.general.recursive, DEFAULT_DEBOUNCE, move |_| {
            let _ = triggers.send(Trigger::DirectoryChanged);
        }) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => log::warn!("Not watching {:?}: {}", directory, e.user_friendly_message()),
        }
    }

    fn restart_auto_change(&mut self) {
        self.auto_change_deadline = self.config.auto_change_interval().map(|interval| {
            log::debug!("Next automatic change in {:?}", interval);
            Instant::now() + interval
        });
    }
}

fn log_outcome(trigger: &str, result: Result<String>) {
    match result {
        Ok(summary) => log::info!("{}: {}", trigger, summary),
        Err(e) => log::error!("{}: {:#}", trigger, e),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Slots for the current outputs. swww's report of the displayed image wins;
/// otherwise the last image this daemon set on an output of the same size.
pub fn build_slots(outputs: &[DisplayOutput], persisted: &AssignmentState) -> Vec<Slot> {
    outputs
        .iter()
        .map(|output| {
            let mut slot = output.to_slot();
            if slot.current.is_none() {
                slot.current = persisted
                    .current_image_for(&output.name, output.width, output.height)
                    .map(|p| p.to_path_buf());
            }
            slot
        })
        .collect()
}

pub fn summarize(decisions: &[SlotDecision], changed: usize, failed: usize) -> String {
    let kept = decisions.iter().filter(|d| d.outcome == SlotOutcome::Kept).count();
    let without = decisions.iter().filter(|d| d.outcome == SlotOutcome::NoCandidate).count();

    let mut summary = format!(
        "{} output(s): {} changed, {} kept, {} without a fitting image",
        decisions.len(),
        changed,
        kept,
        without
    );
    if failed > 0 {
        summary.push_str(&format!(", {} failed", failed));
    }
    summary
}

/// Geometry of the connected outputs, used to notice hotplug and mode
/// changes.
pub fn display_signature(outputs: &[DisplayOutput]) -> Vec<(String, u32, u32)> {
    let mut signature: Vec<_> = outputs
        .iter()
        .map(|o| (o.name.clone(), o.width, o.height))
        .collect();
    signature.sort();
    signature
}

/// Polls swww for output changes and reports them once they have been
/// stable for [`DISPLAY_DEBOUNCE`].
pub async fn watch_displays(executor: ProcessExecutor, triggers: mpsc::UnboundedSender<Trigger>) {
    let mut known = executor.query_outputs().await.ok().map(|o| display_signature(&o));
    let mut ticker = tokio::time::interval(DISPLAY_POLL_INTERVAL);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let current = match executor.query_outputs().await {
            Ok(outputs) => display_signature(&outputs),
            Err(e) => {
                log::debug!("Display poll failed: {}", e);
                continue;
            }
        };
        if known.as_ref() == Some(&current) {
            continue;
        }

        tokio::time::sleep(DISPLAY_DEBOUNCE).await;
        let settled = match executor.query_outputs().await {
            Ok(outputs) => display_signature(&outputs),
            Err(_) => continue,
        };
        if settled != current {
            continue;
        }

        log::info!("Displays changed: {:?}", settled);
        known = Some(settled);
        if triggers.send(Trigger::DisplaysChanged).is_err() {
            break;
        }
    }
}
