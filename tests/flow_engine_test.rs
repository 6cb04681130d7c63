use anyhow::Result;
use sbalance::core::flow::{FlowEngine, FlowSettings};
use sbalance::core::protocol::{ProtocolAdapter, WeightRequest};
use sbalance::domain::model::{AdapterConfig, FlowRecord, Vendor, WeightSample};

/// 保留完整歷史的參考計算，用來比對有界序列的結果
fn unbounded_reference(samples: &[WeightSample], flow_window: usize, average_n: usize) -> Vec<FlowRecord> {
    let mut values = vec![0.0_f64];
    let mut times = vec![0.0_f64];
    let mut windowed = vec![0.0_f64];
    let mut records = Vec::new();

    for sample in samples {
        let instant = (sample.value_mg - values[values.len() - 1])
            / (sample.timestamp - times[times.len() - 1]);
        values.push(sample.value_mg);
        times.push(sample.timestamp);

        let fn_ = values.len().min(flow_window);
        let w = (values[values.len() - 1] - values[values.len() - fn_])
            / (times[times.len() - 1] - times[times.len() - fn_]);
        windowed.push(w);

        let n = windowed.len().min(average_n);
        let avg = windowed[windowed.len() - n..].iter().sum::<f64>() / n as f64;

        records.push(FlowRecord {
            sample: *sample,
            instant_flow: instant,
            windowed_flow: w,
            running_avg_flow: avg,
        });
    }
    records
}

fn dummy_samples(count: usize, start: f64, step: f64) -> Vec<WeightSample> {
    let mut adapter = ProtocolAdapter::new(AdapterConfig::for_vendor(Vendor::Dummy));
    (1..=count)
        .map(|k| match adapter.request_weight() {
            WeightRequest::Immediate(value) => WeightSample::new(start + step * k as f64, value),
            WeightRequest::Send(command) => panic!("dummy sent {}", command),
        })
        .collect()
}

#[test]
fn test_dummy_scenario_flow_window_6_average_4() -> Result<()> {
    let mut engine = FlowEngine::new(FlowSettings {
        flow_window: 6,
        average_window: 4,
    })?;
    // 不等間隔的時間，確認使用實際時間差
    let times: Vec<f64> = (1..=10).map(|k| 1000.0 + 5.0 * k as f64 + 0.1 * (k * k) as f64).collect();
    let samples: Vec<WeightSample> = times
        .iter()
        .enumerate()
        .map(|(i, t)| WeightSample::new(*t, (i + 1) as f64))
        .collect();

    let records: Vec<FlowRecord> = samples
        .iter()
        .map(|s| engine.ingest(*s))
        .collect::<std::result::Result<_, _>>()?;

    // 第 1 筆以 (0, 0) 為基準
    assert_eq!(records[0].instant_flow, 1.0 / times[0]);
    for k in 2..=10 {
        assert_eq!(records[k - 1].instant_flow, 1.0 / (times[k - 1] - times[k - 2]));
    }

    // 第 6 筆：序列長度 7（含 seed），fn = 6 → 從第 1 筆起算
    assert_eq!(records[5].windowed_flow, (6.0 - 1.0) / (times[5] - times[0]));
    // 第 10 筆：從第 5 筆起算
    assert_eq!(records[9].windowed_flow, (10.0 - 5.0) / (times[9] - times[4]));
    // 第 3 筆：fn = min(4, 6) = 4 → 從 seed 起算
    assert_eq!(records[2].windowed_flow, 3.0 / times[2]);

    // 4 個窗口流量後的移動平均 = 這 4 個的平均
    let first_four: f64 = records[..4].iter().map(|r| r.windowed_flow).sum();
    assert!((records[3].running_avg_flow - first_four / 4.0).abs() < 1e-12);

    Ok(())
}

#[test]
fn test_bounded_history_matches_full_history() -> Result<()> {
    let samples = dummy_samples(200, 1_700_000_000.0, 5.0);

    for (flow_window, average_n) in [(2, 1), (6, 4), (10, 3), (3, 25)] {
        let mut engine = FlowEngine::new(FlowSettings {
            flow_window,
            average_window: average_n,
        })?;
        let expected = unbounded_reference(&samples, flow_window, average_n);

        for (sample, want) in samples.iter().zip(expected) {
            let got = engine.ingest(*sample)?;
            assert_eq!(got.instant_flow.to_bits(), want.instant_flow.to_bits());
            assert_eq!(got.windowed_flow.to_bits(), want.windowed_flow.to_bits());
            assert_eq!(got.running_avg_flow.to_bits(), want.running_avg_flow.to_bits());
        }
    }

    Ok(())
}

#[test]
fn test_replay_is_bit_identical() -> Result<()> {
    let samples = dummy_samples(50, 10.0, 0.75);
    let settings = FlowSettings::default();

    let run = |samples: &[WeightSample]| -> Result<Vec<FlowRecord>> {
        let mut engine = FlowEngine::new(settings)?;
        samples
            .iter()
            .map(|s| engine.ingest(*s).map_err(anyhow::Error::from))
            .collect()
    };

    let first = run(&samples)?;
    let second = run(&samples)?;
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.running_avg_flow.to_bits(), b.running_avg_flow.to_bits());
    }

    Ok(())
}

#[test]
fn test_non_increasing_time_is_reported_not_panicking() -> Result<()> {
    let mut engine = FlowEngine::new(FlowSettings::default())?;
    engine.ingest(WeightSample::new(20.0, 1.0))?;

    assert!(engine.ingest(WeightSample::new(19.0, 2.0)).is_err());
    assert!(engine.ingest(WeightSample::new(19.0, 3.0)).is_err());
    assert!(engine.ingest(WeightSample::new(f64::NAN, 3.0)).is_err());

    Ok(())
}
