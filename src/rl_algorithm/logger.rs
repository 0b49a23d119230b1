use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use lazy_static::lazy_static;
use log::info;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Collects `(main_tag, sub_tag) -> scalar` pairs between two `log` calls.
///
/// Scalars always go to the `log` facade; they are also written to
/// TensorBoard once `init_writer` has been called.
pub struct EpochLogger {
    log_info: BTreeMap<(String, String), f32>,
    writer: Option<SummaryWriter>,
}

lazy_static! {
    static ref EPOCH_LOGGER: Mutex<EpochLogger> = Mutex::new(EpochLogger {
        log_info: BTreeMap::new(),
        writer: None,
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochLoggerAggMode {
    Sum,
    Mean,
    Max,
    Min,
    /// Keep the first value recorded in the epoch.
    Keep,
}

fn lock() -> MutexGuard<'static, EpochLogger> {
    EPOCH_LOGGER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn tag_key(main_tag_sub_tag: (&str, &str)) -> (String, String) {
    (
        main_tag_sub_tag.0.to_string(),
        main_tag_sub_tag.1.to_string(),
    )
}

/// `<prefix>_<env_id>_<local time>`, usable as a log directory name.
pub fn experiment_name(prefix: &str, env_id: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        env_id,
        Local::now().format("%d-%m-%Y_%H-%M-%S")
    )
}

impl EpochLogger {
    pub fn init_writer(logdir: &str) {
        info!("writing tensorboard summaries to {}", logdir);
        lock().writer = Some(SummaryWriter::new(logdir));
    }

    /// Flushes and drops the TensorBoard writer; later epochs only reach the `log` facade.
    pub fn close_writer() {
        if let Some(mut writer) = lock().writer.take() {
            writer.flush();
        }
    }

    pub fn add_scalar(main_tag_sub_tag: (&str, &str), val: f32) {
        lock().log_info.insert(tag_key(main_tag_sub_tag), val);
    }

    pub fn add_scalar_agg(main_tag_sub_tag: (&str, &str), val: f32, agg_mode: EpochLoggerAggMode) {
        let mut this = lock();
        let key = tag_key(main_tag_sub_tag);
        let val = match this.log_info.get(&key) {
            Some(&old_val) => match agg_mode {
                EpochLoggerAggMode::Sum => val + old_val,
                EpochLoggerAggMode::Mean => (val + old_val) / 2.0,
                EpochLoggerAggMode::Max => val.max(old_val),
                EpochLoggerAggMode::Min => val.min(old_val),
                EpochLoggerAggMode::Keep => old_val,
            },
            None => val,
        };
        this.log_info.insert(key, val);
    }

    /// Pending value for a tag, if any was recorded since the last `log`.
    pub fn peek(main_tag_sub_tag: (&str, &str)) -> Option<f32> {
        lock().log_info.get(&tag_key(main_tag_sub_tag)).copied()
    }

    fn write_scalar(&mut self, main_tag: &str, sub_tag: &str, scalar: f32, step: usize) {
        if let Some(writer) = self.writer.as_mut() {
            let mut map = HashMap::<String, f32>::new();
            map.insert(sub_tag.to_string(), scalar);
            writer.add_scalars(format!("{}/{}", main_tag, sub_tag).as_str(), &map, step);
        }
    }

    /// Emits and clears everything recorded since the previous call.
    pub fn log(step: usize) {
        let mut this = lock();
        let log_info = std::mem::take(&mut this.log_info);
        if log_info.is_empty() {
            return;
        }
        info!("************iter={}************", step);
        for ((main_tag, sub_tag), scalar) in log_info {
            this.write_scalar(&main_tag, &sub_tag, scalar, step);
            info!("{}-{}={}", main_tag, sub_tag, scalar);
        }
        if let Some(writer) = this.writer.as_mut() {
            writer.flush();
        }
    }
}
