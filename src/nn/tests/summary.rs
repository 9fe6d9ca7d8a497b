/*
 * @Author       : 老董
 * @Date         : 2026-07-20
 * @Description  : 观测上报单元测试
 */

use approx::assert_abs_diff_eq;

use crate::nn::summary::zero_fraction;
use crate::nn::{NullSink, RecordingSink, SummarySink};

#[test]
fn test_zero_fraction() {
    assert_abs_diff_eq!(zero_fraction(&[0.0, 1.0, 0.0, 3.0]), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(zero_fraction(&[1.0, 2.0]), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(zero_fraction(&[]), 0.0, epsilon = 1e-6);
}

#[test]
fn test_recording_sink_keeps_order() {
    let mut sink = RecordingSink::new();
    sink.scalar("loss", 2.0);
    sink.scalar("loss", 1.0);
    sink.histogram("weights", &[0.1, 0.2, 0.3]);

    assert_eq!(sink.scalars.len(), 2);
    assert_abs_diff_eq!(sink.last_scalar("loss").unwrap(), 1.0, epsilon = 1e-6);
    assert!(sink.last_scalar("nope").is_none());
    assert_eq!(sink.histograms, vec![("weights".to_string(), 3)]);
}

#[test]
fn test_null_sink_discards_everything() {
    let mut sink = NullSink;
    sink.scalar("anything", 1.0);
    sink.histogram("anything", &[1.0]);
}
