use ppe_monitor::{BBox, ComplianceClassifier, Detection, Verdict};

fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new("person", 0.9, BBox::new(x1, y1, x2, y2))
}

fn item(label: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new(label, 0.6, BBox::new(x1, y1, x2, y2))
}

fn classify(detections: &[Detection]) -> ppe_monitor::FrameReport {
    ComplianceClassifier::default().classify(detections)
}

#[test]
fn helmet_near_head_goggles_at_waist_is_partial() {
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        item("helmet", 20.0, 10.0, 40.0, 30.0),
        item("safety goggles", 10.0, 150.0, 30.0, 170.0),
    ]);

    assert_eq!(report.people.len(), 1);
    let p = &report.people[0];
    assert!(p.ppe.helmet);
    assert!(!p.ppe.goggles);
    assert!(!p.ppe.ear_protection);
    assert_eq!(p.ppe.count(), 1);
    assert_eq!(p.verdict, Verdict::Partial);
}

#[test]
fn center_on_head_boundary_counts() {
    // head region of (0,0,100,200) ends at y = 80
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        item("helmet", 40.0, 70.0, 60.0, 90.0),
    ]);
    assert!(report.people[0].ppe.helmet);
}

#[test]
fn center_below_head_region_never_counts() {
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        // covers the whole head region, but its center is at y = 90
        item("helmet", 0.0, 0.0, 100.0, 180.0),
    ]);
    assert!(!report.people[0].ppe.helmet);
    assert_eq!(report.people[0].verdict, Verdict::Unsafe);
}

#[test]
fn no_ppe_is_unsafe() {
    let report = classify(&[person(10.0, 10.0, 110.0, 310.0)]);
    let p = &report.people[0];
    assert!(!p.ppe.helmet && !p.ppe.goggles && !p.ppe.ear_protection);
    assert_eq!(p.verdict, Verdict::Unsafe);
}

#[test]
fn all_three_is_safe_any_two_is_partial() {
    let head = |label: &str| item(label, 40.0, 20.0, 60.0, 40.0);
    let body = person(0.0, 0.0, 100.0, 200.0);

    let all = classify(&[
        body.clone(),
        head("helmet"),
        head("safety goggles"),
        head("ear protection"),
    ]);
    assert_eq!(all.people[0].verdict, Verdict::Safe);

    for pair in [
        ["helmet", "safety goggles"],
        ["helmet", "ear protection"],
        ["safety goggles", "ear protection"],
    ] {
        let report = classify(&[body.clone(), head(pair[0]), head(pair[1])]);
        assert_eq!(report.people[0].verdict, Verdict::Partial, "{:?}", pair);
    }
}

#[test]
fn earmuffs_count_as_ear_protection() {
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        item("earmuffs", 70.0, 20.0, 95.0, 45.0),
    ]);
    assert!(report.people[0].ppe.ear_protection);
    assert_eq!(report.counts.ear_protection, 1);
}

#[test]
fn vest_never_changes_verdict() {
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        item("safety vest", 10.0, 10.0, 90.0, 60.0),
    ]);
    assert_eq!(report.people[0].verdict, Verdict::Unsafe);
    assert_eq!(report.counts.vests, 1);
}

#[test]
fn one_helmet_can_serve_overlapping_people() {
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        person(20.0, 0.0, 120.0, 200.0),
        item("helmet", 40.0, 10.0, 80.0, 40.0),
    ]);
    assert_eq!(report.people.len(), 2);
    assert!(report.people.iter().all(|p| p.ppe.helmet));
    assert_eq!(report.counts.helmets, 1);
}

#[test]
fn detection_order_does_not_matter() {
    let detections = vec![
        person(0.0, 0.0, 100.0, 200.0),
        item("helmet", 20.0, 10.0, 40.0, 30.0),
        person(300.0, 50.0, 380.0, 250.0),
        item("ear protection", 310.0, 60.0, 330.0, 80.0),
        item("safety goggles", 330.0, 60.0, 350.0, 75.0),
        item("bottle", 200.0, 200.0, 220.0, 240.0),
    ];
    let forward = classify(&detections);

    let mut reversed = detections.clone();
    reversed.reverse();
    let backward = classify(&reversed);

    let verdicts = |report: &ppe_monitor::FrameReport| {
        let mut v: Vec<_> = report
            .people
            .iter()
            .map(|p| (p.bbox.x1 as i32, p.verdict, p.ppe))
            .collect();
        v.sort_by_key(|(x, _, _)| *x);
        v
    };
    assert_eq!(verdicts(&forward), verdicts(&backward));
    assert_eq!(forward.counts, backward.counts);
    assert_eq!(forward.counts.other, 1);
}

#[test]
fn malformed_boxes_are_ignored() {
    let report = classify(&[
        person(0.0, 0.0, 100.0, 200.0),
        person(50.0, 50.0, 50.0, 120.0),
        item("helmet", 40.0, 30.0, 20.0, 10.0),
        item("safety goggles", f32::NAN, 10.0, 30.0, 30.0),
    ]);
    assert_eq!(report.people.len(), 1);
    assert_eq!(report.counts.helmets, 0);
    assert_eq!(report.counts.goggles, 0);
    assert_eq!(report.people[0].verdict, Verdict::Unsafe);
}

#[test]
fn empty_frame_has_no_people() {
    let report = classify(&[]);
    assert!(report.people.is_empty());
    assert_eq!(report.tally(), (0, 0, 0));
}

#[test]
fn report_serializes_with_uppercase_verdicts() {
    let report = classify(&[person(0.0, 0.0, 100.0, 200.0)]);
    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["people"][0]["verdict"], "UNSAFE");
    assert_eq!(json["people"][0]["bbox"], serde_json::json!([0.0, 0.0, 100.0, 200.0]));
    assert_eq!(json["counts"]["persons"], 1);
}
