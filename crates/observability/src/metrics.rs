//! 采集运行指标
//!
//! 计数器由各业务 crate 直接通过 `metrics` 宏上报；本模块负责描述它们，
//! 并在内存中聚合 CLI tick 循环的统计，供运行结束时输出摘要。

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// 持久化的记录数 (labels: sector, kind)
pub const FRAMES_PERSISTED: &str = "rig_capture_frames_persisted_total";
/// 丢弃的帧数 (labels: view, reason)
pub const FRAMES_DROPPED: &str = "rig_capture_frames_dropped_total";
/// 中心 view 待合并半帧被意外覆盖的次数
pub const PENDING_OVERWRITES: &str = "rig_capture_pending_overwrites_total";
/// 生成的传感器数 (labels: kind)
pub const SENSORS_SPAWNED: &str = "rig_capture_sensors_spawned_total";
/// tick 耗时
pub const TICK_DURATION_MS: &str = "rig_capture_tick_duration_ms";
/// 每个 tick 触发的回调数
pub const CALLBACKS_PER_TICK: &str = "rig_capture_callbacks_per_tick";
/// 最近一次 tick 的帧号
pub const LAST_GRAB_INDEX: &str = "rig_capture_last_grab_index";
/// 切换 clip 的次数
pub const CLIPS_STARTED: &str = "rig_capture_clips_started_total";

/// 向已安装的 recorder 注册指标描述
pub fn describe_capture_metrics() {
    describe_counter!(FRAMES_PERSISTED, "Records handed to the frame sink");
    describe_counter!(
        FRAMES_DROPPED,
        "Frames dropped because they could not be decoded or persisted"
    );
    describe_counter!(
        PENDING_OVERWRITES,
        "Center-view merges that paired mismatched halves"
    );
    describe_counter!(SENSORS_SPAWNED, "Camera sensors spawned and listening");
    describe_histogram!(TICK_DURATION_MS, "Wall time of one capture tick");
    describe_histogram!(CALLBACKS_PER_TICK, "Sensor callbacks fired per tick");
    describe_gauge!(LAST_GRAB_INDEX, "Grab index of the latest tick");
    describe_counter!(CLIPS_STARTED, "Clips started, including the first one");
}

/// 记录一次 tick
pub fn record_tick(grab_index: u64, callbacks: usize, duration_ms: f64) {
    gauge!(LAST_GRAB_INDEX).set(grab_index as f64);
    histogram!(CALLBACKS_PER_TICK).record(callbacks as f64);
    histogram!(TICK_DURATION_MS).record(duration_ms);
}

/// 记录新 clip 开始
pub fn record_clip_started(simulation_id: &str) {
    counter!(CLIPS_STARTED, "simulation_id" => simulation_id.to_string()).increment(1);
}

/// 采集运行聚合器
#[derive(Debug, Clone, Default)]
pub struct CaptureRunAggregator {
    /// tick 总数
    pub total_ticks: u64,

    /// 回调总数
    pub total_callbacks: u64,

    /// 没有任何回调的 tick 数
    pub silent_ticks: u64,

    /// clip 数
    pub clips: u64,

    /// tick 耗时统计 (毫秒)
    pub tick_stats: RunningStats,

    /// 每 tick 回调数统计
    pub callback_stats: RunningStats,
}

impl CaptureRunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 聚合一次 tick，并同时上报到 recorder
    pub fn record_tick(&mut self, grab_index: u64, callbacks: usize, duration_ms: f64) {
        record_tick(grab_index, callbacks, duration_ms);

        self.total_ticks += 1;
        self.total_callbacks += callbacks as u64;
        if callbacks == 0 {
            self.silent_ticks += 1;
        }
        self.tick_stats.push(duration_ms);
        self.callback_stats.push(callbacks as f64);
    }

    pub fn record_clip(&mut self, simulation_id: &str) {
        record_clip_started(simulation_id);
        self.clips += 1;
    }

    /// 生成摘要；落盘数量由调用方从组装器统计中给出
    pub fn summary(&self, persisted: u64, pending_overwrites: u64) -> CaptureSummary {
        CaptureSummary {
            total_ticks: self.total_ticks,
            total_callbacks: self.total_callbacks,
            silent_ticks: self.silent_ticks,
            clips: self.clips,
            persisted,
            pending_overwrites,
            tick_duration_ms: StatsSummary::from(&self.tick_stats),
            callbacks_per_tick: StatsSummary::from(&self.callback_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 运行摘要
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub total_ticks: u64,
    pub total_callbacks: u64,
    pub silent_ticks: u64,
    pub clips: u64,
    pub persisted: u64,
    pub pending_overwrites: u64,
    pub tick_duration_ms: StatsSummary,
    pub callbacks_per_tick: StatsSummary,
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Ticks: {} ({} silent)", self.total_ticks, self.silent_ticks)?;
        writeln!(f, "Clips: {}", self.clips)?;
        writeln!(f, "Callbacks: {}", self.total_callbacks)?;
        writeln!(f, "Records persisted: {}", self.persisted)?;
        if self.pending_overwrites > 0 {
            writeln!(f, "Pending overwrites: {}", self.pending_overwrites)?;
        }
        writeln!(f, "Tick duration (ms): {}", self.tick_duration_ms)?;
        writeln!(f, "Callbacks per tick: {}", self.callbacks_per_tick)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线均值/方差 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
