use std::fs;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use holdout::layout::ImageFilter;
use holdout::manifest::{write_manifest_csv, write_report_json, MANIFEST_HEADER};
use holdout::split_log::MemoryLog;
use holdout::splitter::create_test_folders;

fn tmp_root(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "holdout_manifest_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));
    fs::create_dir_all(&p).expect("create tmp root");
    p
}

#[test]
fn manifest_lists_moves_and_failures() {
    let root = tmp_root("rows");
    let train = root.join("train");
    let test = root.join("test");
    fs::create_dir_all(train.join("a")).unwrap();
    for n in ["p.png", "q.png"] {
        fs::write(train.join("a").join(n), b"x").unwrap();
    }
    let blocker = test.join("a").join("q.png");
    fs::create_dir_all(&blocker).unwrap();
    fs::write(blocker.join("inside"), b"x").unwrap();

    let log = MemoryLog::new();
    let mut rng = StdRng::seed_from_u64(11);
    let report = create_test_folders(&train, &test, 1.0, &ImageFilter::default(), &mut rng, &log)
        .expect("split");

    let out = root.join("out").join("moves.csv");
    write_manifest_csv(&out, &report).expect("manifest");

    let mut rdr = csv::Reader::from_path(&out).expect("open manifest");
    let header: Vec<String> = rdr
        .headers()
        .expect("header")
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(header, MANIFEST_HEADER.to_vec());

    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 2);

    let moved = rows.iter().find(|r| &r[4] == "moved").expect("moved row");
    assert_eq!(&moved[0], "a");
    assert_eq!(&moved[1], "p.png");
    assert_eq!(&moved[5], "");

    let failed = rows.iter().find(|r| &r[4] == "failed").expect("failed row");
    assert_eq!(&failed[1], "q.png");
    assert!(!failed[5].is_empty());
}

#[test]
fn report_json_carries_totals_per_class() {
    let root = tmp_root("json");
    let train = root.join("train");
    let test = root.join("test");
    for (class, n) in [("cat", 10usize), ("dog", 5)] {
        fs::create_dir_all(train.join(class)).unwrap();
        for i in 0..n {
            fs::write(train.join(class).join(format!("{i}.png")), b"x").unwrap();
        }
    }

    let log = MemoryLog::new();
    let mut rng = StdRng::seed_from_u64(3);
    let report = create_test_folders(&train, &test, 0.2, &ImageFilter::default(), &mut rng, &log)
        .expect("split");

    let out = root.join("report.json");
    write_report_json(&out, &report).expect("json");

    let v: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    let classes = v["classes"].as_array().expect("classes");
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0]["class"], "cat");
    assert_eq!(classes[0]["requested"], 2);
    assert_eq!(classes[1]["class"], "dog");
    assert_eq!(classes[1]["moved"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(v["created_dirs"].as_array().map(|a| a.len()), Some(2));
}
