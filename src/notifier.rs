//! User-facing progress reporting.
//!
//! [`Notifier`] pairs an `env_logger` logger with `indicatif` widgets under one
//! verbosity switch:
//! - [`VerbosityLevel::Quiet`]: milestones update a spinner, blob uploads get a
//!   byte progress bar, and only warnings are logged.
//! - [`VerbosityLevel::Info`] and above: milestones are plain log lines and no
//!   widgets are drawn.

use env_logger::Env;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{Level, LevelFilter, Log, Record};
use std::cell::RefCell;
use std::time::Duration;

const TRANSFER_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {bytes:>9}/{total_bytes:9} {msg}";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerbosityLevel {
    Quiet = 0,
    Info = 1,
    Debug = 2,
    Trace = 3,
}

impl From<u8> for VerbosityLevel {
    fn from(level: u8) -> Self {
        match level {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Info,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }
}

impl VerbosityLevel {
    pub fn to_log_level(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet => LevelFilter::Warn,
            VerbosityLevel::Info => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
            VerbosityLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub struct Notifier {
    verbosity: VerbosityLevel,
    logger: env_logger::Logger,
    multi_progress: Option<MultiProgress>,
    spinner: RefCell<Option<ProgressBar>>,
}

impl Notifier {
    pub fn new(verbosity_level: u8) -> Self {
        let verbosity = VerbosityLevel::from(verbosity_level);
        let multi_progress = (verbosity == VerbosityLevel::Quiet).then(MultiProgress::new);
        Self::build(verbosity, multi_progress)
    }

    /// A notifier that draws nothing; warnings are still logged.
    pub fn silent() -> Self {
        let hidden = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        Self::build(VerbosityLevel::Quiet, Some(hidden))
    }

    fn build(verbosity: VerbosityLevel, multi_progress: Option<MultiProgress>) -> Self {
        let logger = env_logger::Builder::from_env(Env::default())
            .filter_level(verbosity.to_log_level())
            .build();
        Self {
            verbosity,
            logger,
            multi_progress,
            spinner: RefCell::new(None),
        }
    }

    pub fn info(&self, message: &str) {
        match &self.multi_progress {
            Some(multi_progress) => {
                let mut slot = self.spinner.borrow_mut();
                let spinner = slot.get_or_insert_with(|| {
                    let bar = multi_progress.add(ProgressBar::new_spinner());
                    bar.set_style(
                        ProgressStyle::with_template("{spinner:.green} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                    );
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                });
                spinner.set_message(message.to_string());
            }
            None => self.log(Level::Info, message),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    /// Byte progress bar for a transfer of `total` bytes; hidden unless Quiet.
    pub fn transfer_bar(&self, total: u64, label: &str) -> ProgressBar {
        let Some(multi_progress) = &self.multi_progress else {
            return ProgressBar::hidden();
        };
        let bar = multi_progress.add(ProgressBar::new(total));
        if let Ok(style) = ProgressStyle::with_template(TRANSFER_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(label.to_string());
        bar
    }

    /// Stops the spinner, leaving `message` as the final line.
    pub fn finish(&self, message: &str) {
        match self.spinner.borrow_mut().take() {
            Some(spinner) => spinner.finish_with_message(message.to_string()),
            None => self.log(Level::Info, message),
        }
    }

    pub fn verbosity_level(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn log(&self, level: Level, message: &str) {
        self.logger.log(
            &Record::builder()
                .args(format_args!("{}", message))
                .level(level)
                .target(module_path!())
                .build(),
        );
    }
}
