use layerforge::TrainError;
use layerforge::config::{
    DatasetLimit, Direction, EnumerationStrategy, GanMode, LrPolicy, ModelVariant, Preprocess,
    TrainOptions, TransformSharing,
};
use tempfile::tempdir;

const CYCLIC_OPTIONS: &str = r#"{
    "dataset": {
        "dataroot": "datasets/advnet",
        "phase": "train",
        "direction": "AtoB",
        "max_dataset_size": "inf",
        "strategy": { "kind": "grouped", "groups": ["cola", "sprite", "milk", "tea"] },
        "roles": {
            "slots": [
                {
                    "name": "A",
                    "parts": [
                        { "part": "A1", "role": "object", "channels": 3 },
                        { "part": "A2", "role": "scene", "channels": 3 },
                        { "part": "A3", "role": "structure", "channels": 3 }
                    ]
                },
                { "name": "B", "parts": [{ "part": "B", "role": "image", "channels": 3 }] }
            ],
            "transform_sharing": { "kind": "shared", "reference": "image" }
        },
        "transform": { "preprocess": "resize_and_crop", "load_size": 286, "crop_size": 256, "no_flip": true }
    },
    "model": "cyclic",
    "input_nc": 9,
    "output_nc": 3,
    "input2_nc": 3,
    "loss": { "lambda_A": 10.0, "lambda_B": 10.0, "lambda_identity": 0.5 },
    "pool": { "pool_size": 50 },
    "schedule": { "batch_size": 4, "n_epochs": 10, "n_epochs_decay": 5 }
}"#;

fn with_replaced(from: &str, to: &str) -> String {
    assert!(CYCLIC_OPTIONS.contains(from), "fixture lacks {from}");
    CYCLIC_OPTIONS.replace(from, to)
}

#[test]
fn cyclic_options_parse_with_defaults() {
    let options = TrainOptions::from_json_str(CYCLIC_OPTIONS).unwrap();
    assert_eq!(options.model, ModelVariant::Cyclic);
    assert_eq!(options.dataset.direction, Direction::AtoB);
    assert_eq!(options.dataset.max_dataset_size, DatasetLimit::Unlimited);
    assert_eq!(
        options.dataset.strategy,
        EnumerationStrategy::default_groups()
    );
    assert_eq!(
        options.dataset.roles.transform_sharing,
        TransformSharing::Shared {
            reference: "image".to_string()
        }
    );
    assert_eq!(options.dataset.transform.preprocess, Preprocess::ResizeAndCrop);
    assert_eq!(options.loss.gan_mode, GanMode::LeastSquares);
    assert_eq!(options.loss.lambda_l1, 100.0);
    assert_eq!(options.pool.capacity, 50);
    assert_eq!(options.pool.replace_probability, 0.5);
    assert_eq!(options.schedule.batch_size, 4);
    assert_eq!(options.schedule.lr_policy, LrPolicy::Linear);
    assert_eq!(options.schedule.total_epochs(), 15);

    let mut preset = TrainOptions::advnet_cyclic("datasets/advnet");
    preset.schedule.batch_size = 4;
    preset.schedule.n_epochs = 10;
    preset.schedule.n_epochs_decay = 5;
    assert_eq!(options, preset);
}

#[test]
fn numeric_and_textual_limits() {
    let options = TrainOptions::from_json_str(&with_replaced("\"inf\"", "40")).unwrap();
    assert_eq!(options.dataset.max_dataset_size, DatasetLimit::Max(40));
    let options =
        TrainOptions::from_json_str(&with_replaced("\"inf\"", "\"no limit\"")).unwrap();
    assert!(options.dataset.max_dataset_size.is_unlimited());
    assert!(matches!(
        TrainOptions::from_json_str(&with_replaced("\"inf\"", "\"plenty\"")),
        Err(TrainError::Options(_))
    ));
}

#[test]
fn invalid_values_are_configuration_errors() {
    for (from, to) in [
        ("\"pool_size\": 50", "\"pool_size\": -1"),
        ("\"lambda_identity\": 0.5", "\"lambda_identity\": -0.5"),
        ("\"batch_size\": 4", "\"batch_size\": 0"),
        ("\"input_nc\": 9", "\"input_nc\": 6"),
        ("\"direction\": \"AtoB\"", "\"direction\": \"BtoA\""),
        (
            "\"role\": \"object\", \"channels\": 3",
            "\"role\": \"object\", \"channels\": 2",
        ),
    ] {
        let result = TrainOptions::from_json_str(&with_replaced(from, to));
        assert!(
            matches!(result, Err(TrainError::Configuration(_))),
            "{to}: {result:?}"
        );
    }
}

#[test]
fn options_load_from_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("options.json");
    std::fs::write(&path, CYCLIC_OPTIONS).unwrap();
    let options = TrainOptions::from_json_path(&path).unwrap();
    assert_eq!(options.input_nc, 9);

    let missing = TrainOptions::from_json_path(&temp.path().join("absent.json"));
    assert!(matches!(missing, Err(TrainError::Io(_))));
}
