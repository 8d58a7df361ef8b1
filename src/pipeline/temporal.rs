// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 时间一致性过滤 (Temporal consistency)
//!
//! 每个 HistoryKey 保留滑动时间窗口内的置信度历史, 只有在窗口内被
//! 多帧确认的检测才会输出, 置信度取窗口内平均值。
//! 过期条目只在键被再次访问时清理, 不使用后台定时器。

use std::collections::HashMap;

use tracing::debug;

use crate::detection::{Detection, HistoryEntry, HistoryKey};

pub struct TemporalTracker {
    history: HashMap<HistoryKey, Vec<HistoryEntry>>,
    retention_window_millis: i64,
    min_consistent_frames: usize,
    confidence_threshold: f32,
}

impl TemporalTracker {
    pub fn new(retention_window_millis: i64, min_consistent_frames: usize, confidence_threshold: f32) -> Self {
        Self {
            history: HashMap::new(),
            retention_window_millis,
            min_consistent_frames,
            confidence_threshold,
        }
    }

    pub fn track(&mut self, detections: &[Detection], now_millis: i64) -> Vec<Detection> {
        let mut consistent = Vec::new();

        for detection in detections {
            let key = detection.history_key();
            let entries = self.history.entry(key).or_default();

            entries.push(HistoryEntry {
                confidence: detection.confidence,
                timestamp_millis: now_millis,
            });

            // 访问时清理过期条目
            let window = self.retention_window_millis;
            entries.retain(|e| now_millis - e.timestamp_millis < window);

            if entries.len() < self.min_consistent_frames {
                continue;
            }

            let avg = entries.iter().map(|e| e.confidence).sum::<f32>() / entries.len() as f32;
            if avg > self.confidence_threshold {
                consistent.push(Detection::new(
                    detection.class_label.clone(),
                    avg,
                    detection.bbox,
                ));
            } else {
                debug!(
                    class = %detection.class_label,
                    avg,
                    frames = entries.len(),
                    "temporal average below threshold"
                );
            }
        }

        consistent
    }

    /// 键当前保存的条目数 (未访问的键可能含过期条目)
    pub fn history_len(&self, key: &HistoryKey) -> usize {
        self.history.get(key).map_or(0, Vec::len)
    }

    pub fn tracked_keys(&self) -> impl Iterator<Item = &HistoryKey> {
        self.history.keys()
    }

    /// 调用方主动清理: 删除过期条目与空键, 返回删除的键数
    pub fn evict_stale(&mut self, now_millis: i64) -> usize {
        let window = self.retention_window_millis;
        let before = self.history.len();
        self.history.retain(|_, entries| {
            entries.retain(|e| now_millis - e.timestamp_millis < window);
            !entries.is_empty()
        });
        before - self.history.len()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    fn person(conf: f32) -> Detection {
        Detection::new("person", conf, BoundingBox::new(10.0, 20.0, 50.0, 80.0))
    }

    #[test]
    fn test_three_touches_emit_average() {
        let mut tracker = TemporalTracker::new(1000, 3, 0.98);
        assert!(tracker.track(&[person(0.99)], 0).is_empty());
        assert!(tracker.track(&[person(0.99)], 100).is_empty());
        let out = tracker.track(&[person(0.99)], 200);
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence - 0.99).abs() < 1e-5);
        assert_eq!(out[0].bbox, person(0.99).bbox);
    }

    #[test]
    fn test_two_touches_emit_nothing() {
        let mut tracker = TemporalTracker::new(1000, 3, 0.98);
        assert!(tracker.track(&[person(0.99)], 0).is_empty());
        assert!(tracker.track(&[person(0.99)], 100).is_empty());
    }

    #[test]
    fn test_entries_outside_window_do_not_contribute() {
        let mut tracker = TemporalTracker::new(1000, 1, 0.5);
        tracker.track(&[person(0.1)], 0);
        let out = tracker.track(&[person(0.9)], 1500);
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(tracker.history_len(&person(0.9).history_key()), 1);
    }

    #[test]
    fn test_entry_exactly_window_old_is_pruned() {
        let mut tracker = TemporalTracker::new(1000, 2, 0.5);
        tracker.track(&[person(0.99)], 0);
        assert!(tracker.track(&[person(0.99)], 1000).is_empty());
    }

    #[test]
    fn test_average_must_exceed_threshold() {
        let mut tracker = TemporalTracker::new(1000, 3, 0.98);
        tracker.track(&[person(0.99)], 0);
        tracker.track(&[person(0.97)], 10);
        assert!(tracker.track(&[person(0.97)], 20).is_empty());
    }

    #[test]
    fn test_untouched_key_does_not_reappear_stale() {
        let mut tracker = TemporalTracker::new(1000, 3, 0.98);
        for t in [0, 100, 200] {
            tracker.track(&[person(0.99)], t);
        }
        // 其他目标持续出现, person 键不被访问
        let cup = Detection::new("cup", 0.99, BoundingBox::new(300.0, 300.0, 5.0, 5.0));
        for t in [400, 800, 1200, 1600] {
            let out = tracker.track(&[cup.clone()], t);
            assert!(out.iter().all(|d| d.class_label == "cup"));
        }
        // 过期后再次出现, 只剩一条新记录
        assert!(tracker.track(&[person(0.99)], 2000).is_empty());
        assert_eq!(tracker.history_len(&person(0.99).history_key()), 1);
    }

    #[test]
    fn test_keys_are_class_and_position_specific() {
        let mut tracker = TemporalTracker::new(1000, 3, 0.5);
        let a = Detection::new("person", 0.9, BoundingBox::new(0.0, 0.0, 5.0, 5.0));
        let b = Detection::new("person", 0.9, BoundingBox::new(40.0, 0.0, 5.0, 5.0));
        let c = Detection::new("dog", 0.9, BoundingBox::new(0.0, 0.0, 5.0, 5.0));
        for t in [0, 10] {
            tracker.track(&[a.clone(), b.clone(), c.clone()], t);
        }
        let out = tracker.track(&[a.clone()], 20);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].history_key(), a.history_key());
        assert!((out[0].confidence - 0.9).abs() < 1e-5);
        assert_eq!(tracker.tracked_keys().count(), 3);
    }

    #[test]
    fn test_evict_stale() {
        let mut tracker = TemporalTracker::new(1000, 3, 0.5);
        tracker.track(&[person(0.9)], 0);
        tracker.track(&[Detection::new("cup", 0.9, BoundingBox::default())], 900);
        assert_eq!(tracker.evict_stale(1200), 1);
        assert_eq!(tracker.tracked_keys().count(), 1);
        tracker.clear();
        assert_eq!(tracker.tracked_keys().count(), 0);
    }
}
