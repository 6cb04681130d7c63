use crate::core::series::{SampleSeries, Tail};
use crate::domain::model::{FlowRecord, WeightSample};
use crate::utils::error::{BalanceError, Result};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FlowError {
    #[error("Elapsed time between samples is not positive ({elapsed} s), check the clock and poll interval")]
    ZeroElapsedTime { elapsed: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    /// 流量窗口涵蓋的樣本數
    pub flow_window: usize,
    /// 移動平均使用的窗口流量數
    pub average_window: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            flow_window: 6,
            average_window: 4,
        }
    }
}

/// Turns successive weight samples into instantaneous, windowed and
/// running-average flow (mg/s).
#[derive(Debug, Clone)]
pub struct FlowEngine {
    settings: FlowSettings,
    samples: SampleSeries,
    windowed: Tail<f64>,
}

impl FlowEngine {
    pub fn new(settings: FlowSettings) -> Result<Self> {
        if settings.flow_window < 2 {
            return Err(BalanceError::InvalidConfigValueError {
                field: "hydro.flow_interval".to_string(),
                value: settings.flow_window.to_string(),
                reason: "Flow window must span at least 2 samples".to_string(),
            });
        }
        if settings.average_window < 1 {
            return Err(BalanceError::InvalidConfigValueError {
                field: "hydro.average_n".to_string(),
                value: settings.average_window.to_string(),
                reason: "Average window must be at least 1".to_string(),
            });
        }

        Ok(Self {
            settings,
            samples: SampleSeries::new(settings.flow_window),
            windowed: Tail::seeded(settings.average_window, 0.0),
        })
    }

    pub fn settings(&self) -> FlowSettings {
        self.settings
    }

    /// 加入新樣本並計算流量。
    ///
    /// 時間差不為正時回傳 [`FlowError::ZeroElapsedTime`]；樣本仍會保留在序列中，
    /// 但這一次不產生窗口流量。
    pub fn ingest(&mut self, sample: WeightSample) -> std::result::Result<FlowRecord, FlowError> {
        let previous = self.samples.latest().unwrap_or(WeightSample::new(0.0, 0.0));
        self.samples.push(sample);

        let instant_flow = rate(previous, sample)?;

        let window = self.samples.len().min(self.settings.flow_window);
        let start = self.samples.back(window).unwrap_or(previous);
        let windowed_flow = rate(start, sample)?;

        self.windowed.push(windowed_flow);
        let n = self.windowed.len().min(self.settings.average_window);
        let running_avg_flow = self.windowed.last_n(n).sum::<f64>() / n as f64;

        Ok(FlowRecord {
            sample,
            instant_flow,
            windowed_flow,
            running_avg_flow,
        })
    }
}

fn rate(from: WeightSample, to: WeightSample) -> std::result::Result<f64, FlowError> {
    let elapsed = to.timestamp - from.timestamp;
    // NaN 也視為無效
    if !(elapsed > 0.0) {
        return Err(FlowError::ZeroElapsedTime { elapsed });
    }
    Ok((to.value_mg - from.value_mg) / elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(flow_window: usize, average_window: usize) -> FlowEngine {
        FlowEngine::new(FlowSettings {
            flow_window,
            average_window,
        })
        .unwrap()
    }

    #[test]
    fn test_first_sample_uses_seed_as_baseline() {
        let mut engine = engine(6, 4);
        let record = engine.ingest(WeightSample::new(10.0, 5.0)).unwrap();

        assert_eq!(record.instant_flow, 0.5);
        assert_eq!(record.windowed_flow, 0.5);
        // 窗口流量序列的初始 0 也參與平均
        assert_eq!(record.running_avg_flow, 0.25);
    }

    #[test]
    fn test_window_is_clamped_then_slides() {
        let mut engine = engine(3, 2);
        engine.ingest(WeightSample::new(1.0, 1.0)).unwrap();
        engine.ingest(WeightSample::new(2.0, 3.0)).unwrap();
        let third = engine.ingest(WeightSample::new(3.0, 6.0)).unwrap();

        // 序列: seed, (1,1), (2,3), (3,6)；窗口 3 → 從 (1,1) 起算
        assert_eq!(third.instant_flow, 3.0);
        assert_eq!(third.windowed_flow, 2.5);
        // 前一次窗口流量: (3-0)/(2-0) = 1.5
        assert_eq!(third.running_avg_flow, 2.0);
    }

    #[test]
    fn test_zero_elapsed_time_keeps_sample() {
        let mut engine = engine(6, 4);
        engine.ingest(WeightSample::new(5.0, 1.0)).unwrap();

        let err = engine.ingest(WeightSample::new(5.0, 2.0)).unwrap_err();
        assert_eq!(err, FlowError::ZeroElapsedTime { elapsed: 0.0 });

        // 下一次以被保留的 (5,2) 為前一筆
        let next = engine.ingest(WeightSample::new(6.0, 4.0)).unwrap();
        assert_eq!(next.instant_flow, 2.0);
    }

    #[test]
    fn test_rejects_degenerate_windows() {
        assert!(FlowEngine::new(FlowSettings {
            flow_window: 1,
            average_window: 4
        })
        .is_err());
        assert!(FlowEngine::new(FlowSettings {
            flow_window: 6,
            average_window: 0
        })
        .is_err());
    }
}
