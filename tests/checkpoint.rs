use std::fs;
use std::path::PathBuf;

use fcnet::{checkpoint, Matrix, NetError, Network, NetworkSpec, ParamTensor};

/// A fresh scratch directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fcnet-it-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn batch(cols: usize) -> Matrix {
    Matrix::from_data(
        (0..3)
            .map(|r| (0..cols).map(|c| ((r * cols + c) as f64 * 0.37).sin()).collect())
            .collect(),
    )
}

#[test]
fn round_trip_preserves_forward_output() {
    let dir = scratch_dir("round-trip");
    let path = dir.join("model.json");
    let spec = NetworkSpec::new(6, 4, vec![10, 5]).unwrap();

    let mut original = Network::build_seeded(&spec, 101).unwrap();
    checkpoint::save(&path, &original).unwrap();
    let mut restored = checkpoint::load(&path).unwrap();

    original.eval();
    restored.eval();
    let a = original.forward(&batch(6)).unwrap();
    let b = restored.forward(&batch(6)).unwrap();
    for (ra, rb) in a.data.iter().zip(&b.data) {
        for (x, y) in ra.iter().zip(rb) {
            assert!((x - y).abs() < 1e-12, "{x} != {y}");
        }
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn saving_twice_is_byte_identical() {
    let dir = scratch_dir("idempotent");
    let path = dir.join("model.json");
    let spec = NetworkSpec::new(3, 2, vec![4]).unwrap();
    let net = Network::build_seeded(&spec, 102).unwrap();

    checkpoint::save(&path, &net).unwrap();
    let first = fs::read(&path).unwrap();
    checkpoint::save(&path, &net).unwrap();
    let second = fs::read(&path).unwrap();
    assert_eq!(first, second);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn hidden_sizes_survive_reconstruction() {
    let dir = scratch_dir("hidden-sizes");
    for (i, hidden) in [vec![], vec![3], vec![9, 2, 7]].into_iter().enumerate() {
        let path = dir.join(format!("model-{i}.json"));
        let spec = NetworkSpec::new(5, 3, hidden.clone()).unwrap();
        checkpoint::save(&path, &Network::build(&spec).unwrap()).unwrap();
        let restored = checkpoint::load(&path).unwrap();
        assert_eq!(restored.hidden_sizes(), hidden);
        assert_eq!(restored.spec(), spec);
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn file_layout_has_exactly_the_documented_keys() {
    let dir = scratch_dir("layout");
    let path = dir.join("model.json");
    let spec = NetworkSpec::new(3, 2, vec![4]).unwrap();
    checkpoint::save(&path, &Network::build(&spec).unwrap()).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let object = value.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["hidden_sizes", "input_size", "output_size", "state_dict"]);
    assert_eq!(value["input_size"], 3);
    assert_eq!(value["hidden_sizes"], serde_json::json!([4]));

    let state = value["state_dict"].as_object().unwrap();
    let mut names: Vec<&str> = state.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["hidden_layers.0.bias", "hidden_layers.0.weight", "output.bias", "output.weight"]
    );
    assert_eq!(state["hidden_layers.0.weight"].as_array().unwrap().len(), 4);
    assert_eq!(state["hidden_layers.0.weight"][0].as_array().unwrap().len(), 3);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_state_dict_is_corrupt() {
    let dir = scratch_dir("missing-state");
    let path = dir.join("model.json");
    fs::write(&path, r#"{"input_size": 3, "output_size": 2, "hidden_sizes": [4]}"#).unwrap();

    let err = checkpoint::load(&path).unwrap_err();
    assert!(
        matches!(err, NetError::CorruptCheckpoint { ref reason, .. } if reason.contains("state_dict")),
        "{err}"
    );
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_architecture_field_is_corrupt() {
    let dir = scratch_dir("missing-arch");
    let path = dir.join("model.json");
    fs::write(&path, r#"{"input_size": 3, "hidden_sizes": [], "state_dict": {}}"#).unwrap();
    assert!(matches!(
        checkpoint::load(&path),
        Err(NetError::CorruptCheckpoint { .. })
    ));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn ragged_weight_is_corrupt() {
    let dir = scratch_dir("ragged");
    let path = dir.join("model.json");
    let json = r#"{
        "input_size": 2, "output_size": 2, "hidden_sizes": [],
        "state_dict": {
            "output.weight": [[0.1, 0.2], [0.3]],
            "output.bias": [0.0, 0.0]
        }
    }"#;
    fs::write(&path, json).unwrap();
    assert!(matches!(
        checkpoint::load(&path),
        Err(NetError::CorruptCheckpoint { .. })
    ));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn tampered_parameter_shapes_are_all_reported() {
    let dir = scratch_dir("tampered");
    let path = dir.join("model.json");
    let json = r#"{
        "input_size": 2, "output_size": 2, "hidden_sizes": [3],
        "state_dict": {
            "hidden_layers.0.weight": [[0.1, 0.2], [0.3, 0.4]],
            "hidden_layers.0.bias": [0.0, 0.0, 0.0],
            "output.weight": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]],
            "output.bias": [0.0, 0.0, 0.0]
        }
    }"#;
    fs::write(&path, json).unwrap();

    let err = checkpoint::load(&path).unwrap_err();
    let NetError::ShapeMismatch(mismatches) = err else {
        panic!("expected ShapeMismatch");
    };
    assert_eq!(mismatches.len(), 2);
    assert_eq!(mismatches[0].name, "hidden_layers.0.weight");
    assert_eq!(mismatches[0].stored, vec![2, 2]);
    assert_eq!(mismatches[0].expected, vec![3, 2]);
    assert_eq!(mismatches[1].name, "output.bias");
    assert_eq!(mismatches[1].stored, vec![3]);
    assert_eq!(mismatches[1].expected, vec![2]);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn huge_stored_width_is_rejected_without_allocating() {
    let dir = scratch_dir("huge-width");
    let path = dir.join("model.json");

    // Hidden layer parameters are absent altogether.
    fs::write(
        &path,
        r#"{"input_size":1,"output_size":1,"hidden_sizes":[1099511627776],
            "state_dict":{"output.weight":[[0.1]],"output.bias":[0.0]}}"#,
    )
    .unwrap();
    assert!(matches!(
        checkpoint::load(&path),
        Err(NetError::CorruptCheckpoint { path: Some(_), .. })
    ));
    assert!(matches!(
        checkpoint::load_record(&path),
        Err(NetError::CorruptCheckpoint { .. })
    ));

    // Every name present, every shape far smaller than the stored widths.
    fs::write(
        &path,
        r#"{"input_size":1,"output_size":1,"hidden_sizes":[1099511627776],
            "state_dict":{
                "hidden_layers.0.weight":[[0.1]],"hidden_layers.0.bias":[0.0],
                "output.weight":[[0.1]],"output.bias":[0.0]}}"#,
    )
    .unwrap();
    let err = checkpoint::load(&path).unwrap_err();
    let NetError::ShapeMismatch(mismatches) = err else {
        panic!("expected ShapeMismatch");
    };
    assert_eq!(mismatches[0].name, "hidden_layers.0.weight");
    assert_eq!(mismatches[0].expected, vec![1 << 40, 1]);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_io_error() {
    let dir = scratch_dir("missing-file");
    assert!(matches!(
        checkpoint::load(dir.join("absent.json")),
        Err(NetError::Io { .. })
    ));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unwritable_path_is_io_error_and_leaves_no_temp_file() {
    let dir = scratch_dir("unwritable");
    let spec = NetworkSpec::new(2, 2, vec![]).unwrap();
    let net = Network::build(&spec).unwrap();

    // Parent directory does not exist.
    let err = checkpoint::save(dir.join("no-such-dir").join("model.json"), &net).unwrap_err();
    assert!(matches!(err, NetError::Io { .. }));

    // Target is a directory, so the final rename fails after the temp file
    // was written.
    let target = dir.join("occupied");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), b"x").unwrap();
    assert!(matches!(checkpoint::save(&target, &net), Err(NetError::Io { .. })));

    let leftovers: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_save_keeps_previous_checkpoint() {
    let dir = scratch_dir("keep-previous");
    let path = dir.join("model.json");
    let spec = NetworkSpec::new(2, 2, vec![3]).unwrap();
    let good = Network::build_seeded(&spec, 103).unwrap();
    checkpoint::save(&path, &good).unwrap();
    let before = fs::read(&path).unwrap();

    let mut bad = Network::build_seeded(&spec, 104).unwrap();
    bad.hidden_layers[0].weight.data[1][1] = f64::INFINITY;
    let err = checkpoint::save(&path, &bad).unwrap_err();
    assert!(matches!(err, NetError::NonFiniteParameter { ref name } if name == "hidden_layers.0.weight"));

    assert_eq!(fs::read(&path).unwrap(), before);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn concurrent_saves_to_one_path_never_leave_a_partial_file() {
    let dir = scratch_dir("concurrent");
    let path = dir.join("model.json");
    let spec = NetworkSpec::new(16, 4, vec![32]).unwrap();
    let nets: Vec<Network> = (0..4)
        .map(|seed| Network::build_seeded(&spec, 200 + seed).unwrap())
        .collect();

    std::thread::scope(|s| {
        for net in &nets {
            let path = &path;
            s.spawn(move || {
                for _ in 0..5 {
                    checkpoint::save(path, net).unwrap();
                }
            });
        }
    });

    let loaded = checkpoint::load(&path).unwrap().state_dict();
    assert!(nets.iter().any(|n| n.state_dict() == loaded));
    let leftovers = fs::read_dir(&dir).unwrap().count();
    assert_eq!(leftovers, 1);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn end_to_end_loaded_parameters_come_from_the_file() {
    let dir = scratch_dir("end-to-end");
    let path = dir.join("mnist.json");
    let spec = NetworkSpec::new(784, 10, vec![512, 256, 128]).unwrap();

    let first = Network::build_seeded(&spec, 1).unwrap();
    checkpoint::save(&path, &first).unwrap();

    let second = Network::build_seeded(&spec, 2).unwrap();
    let loaded = checkpoint::load(&path).unwrap();

    assert_eq!(loaded.state_dict(), first.state_dict());
    assert_ne!(loaded.state_dict(), second.state_dict());
    assert_eq!(loaded.hidden_sizes(), vec![512, 256, 128]);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn inspect_record_without_building() {
    let dir = scratch_dir("record");
    let path = dir.join("model.json");
    let spec = NetworkSpec::new(4, 3, vec![2]).unwrap();
    let net = Network::build_seeded(&spec, 105).unwrap();
    checkpoint::save(&path, &net).unwrap();

    let record = checkpoint::load_record(&path).unwrap();
    assert_eq!(record.spec().unwrap(), spec);
    assert_eq!(record.state_dict.scalar_count(), net.parameter_count());
    assert!(matches!(
        record.state_dict.get("output.bias"),
        Some(ParamTensor::Vector(v)) if v.len() == 3
    ));
    fs::remove_dir_all(&dir).unwrap();
}
