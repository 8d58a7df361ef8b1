// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use sentinel_refine::{
    find_target, preprocess, suppress, BoundingBox, DetectOptions, Detection, FnDetector, Frame,
    PixelRange, RawDetection, RefineConfig, RefineError, RefiningDetector, ReplayDetector, Stage,
};

fn person_raw(score: f32, x: f32) -> RawDetection {
    RawDetection::new("person", score, BoundingBox::new(x, 40.0, 40.0, 60.0))
}

/// 中心亮块的帧
fn scene() -> Frame {
    let mut bytes = vec![20u8; 160 * 120 * 3];
    for y in 30..110 {
        for x in 30..90 {
            let i = (y * 160 + x) * 3;
            bytes[i..i + 3].copy_from_slice(&[230, 230, 230]);
        }
    }
    Frame::from_raw_rgb(160, 120, &bytes).unwrap()
}

#[test]
fn uniform_gray_frame_preprocesses_without_error() {
    let gray = Frame::uniform(320, 240, 127.0, PixelRange::Byte);
    let out = preprocess(&gray).unwrap();
    assert_eq!((out.width(), out.height()), (320, 240));
    assert!(out.view().iter().all(|v| v.is_finite()));
}

#[test]
fn presorted_overlapping_people_keep_strongest() {
    let strong = Detection::new("person", 0.99, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
    let weak = Detection::new("person", 0.97, BoundingBox::new(0.0, 0.0, 100.0, 80.0));
    let out = suppress(vec![strong.clone(), weak], 0.5);
    assert_eq!(out, vec![strong]);
}

#[test]
fn consistent_person_emitted_on_third_frame() {
    let base = FnDetector::new("camera", |_frame: &Frame, _opts: &DetectOptions| {
        Ok(vec![person_raw(0.99, 40.0)])
    });
    let mut detector = RefiningDetector::create(base, RefineConfig::default()).unwrap();
    let frame = scene();

    assert!(detector.detect_at(&frame, 1_000).unwrap().is_empty());
    assert!(detector.detect_at(&frame, 1_033).unwrap().is_empty());
    let out = detector.detect_at(&frame, 1_066).unwrap();
    assert_eq!(out.len(), 1);

    let hit = find_target(&out, "PERSON").unwrap();
    assert!((0.98..=1.0).contains(&hit.confidence));
    assert!(hit.confidence_percent() >= 98);

    // 时间窗口外重新开始计数
    assert!(detector.detect_at(&frame, 5_000).unwrap().is_empty());
}

#[test]
fn failed_frame_does_not_poison_pipeline() {
    let mut frame_no = 0;
    let base = FnDetector::new("flaky", move |_frame: &Frame, _opts: &DetectOptions| {
        frame_no += 1;
        if frame_no == 2 {
            anyhow::bail!("inference timeout");
        }
        Ok(vec![person_raw(0.99, 40.0)])
    });
    let mut detector = RefiningDetector::create(base, RefineConfig::default()).unwrap();
    let frame = scene();

    assert!(detector.detect_at(&frame, 0).unwrap().is_empty());
    let err = detector.detect_at(&frame, 33).unwrap_err();
    assert!(matches!(
        err,
        RefineError::Stage {
            stage: Stage::BaseDetector,
            ..
        }
    ));
    assert!(detector.detect_at(&frame, 66).unwrap().is_empty());
    assert_eq!(detector.detect_at(&frame, 99).unwrap().len(), 1);
}

#[test]
fn replay_script_drives_pipeline() {
    let script = vec![
        vec![person_raw(0.99, 40.0), person_raw(0.2, 40.0)],
        vec![person_raw(0.99, 40.2)],
        vec![person_raw(0.99, 39.8), person_raw(0.99, 41.0)],
    ];
    let replay = ReplayDetector::new(script);
    let mut detector = RefiningDetector::create(replay, RefineConfig::default()).unwrap();
    let frame = scene();

    let mut last = Vec::new();
    for (i, t) in [0i64, 40, 80].iter().enumerate() {
        let report = detector.detect_report(&frame, *t).unwrap();
        if i == 0 {
            // min_score 过滤低分框
            assert_eq!(report.counts.raw, 1);
        }
        last = report.detections;
    }
    // 同一取整位置的框在第三帧被确认, 重叠框被抑制
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].class_label, "person");
}
