//! Integration tests for finclust

use finclust::{
    load_records, parse_cluster_count, DataError, Engine, EngineConfig, Error, Initialization,
    Metric, Record, ValidationError,
};
use serde_json::json;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

/// Create a test CSV with three obvious profiles: banks, miners and retailers.
fn create_test_csv() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(
        file,
        "id,stockname,roa,roe,eps,npm,bv,price_to_bv,pe_ratio,de_ratio"
    )
    .unwrap();

    // Banks: low roa, high leverage
    writeln!(file, "1,BBCA,3.1,18.5,412,45.2,1720,4.9,22.4,5.6").unwrap();
    writeln!(file, "2,BBRI,2.9,17.9,395,43.8,1650,4.6,21.8,5.9").unwrap();
    writeln!(file, "3,BMRI,3.0,18.1,401,44.5,1700,4.7,22.0,5.7").unwrap();
    writeln!(file, "4,BBNI,2.8,17.5,388,42.9,1600,4.5,21.2,6.0").unwrap();

    // Miners: high roa, cheap
    writeln!(file, "5,ADRO,18.2,28.4,910,31.0,3100,1.1,4.2,0.6").unwrap();
    writeln!(file, "6,PTBA,17.5,27.9,880,30.4,3000,1.2,4.5,0.5").unwrap();
    writeln!(file, "7,ITMG,19.0,29.1,950,32.2,3200,1.0,4.0,0.4").unwrap();
    writeln!(file, "8,INDY,17.8,28.0,900,30.9,3050,1.1,4.3,0.6").unwrap();

    // Retailers: thin margins, expensive
    writeln!(file, "9,ACES,9.5,12.1,45,8.2,420,3.4,30.1,1.9").unwrap();
    writeln!(file, "10,AMRT,9.9,12.6,48,8.5,440,3.6,31.0,2.0").unwrap();
    writeln!(file, "11,MAPI,9.1,11.8,43,7.9,410,3.3,29.5,2.1").unwrap();
    writeln!(file, "12,LPPF,9.7,12.3,46,8.1,430,3.5,30.4,1.8").unwrap();

    file
}

fn label_of(labels: &[usize], id: &str, records: &[Record]) -> usize {
    let index = records.iter().position(|r| r.id() == id).unwrap();
    labels[index]
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let records = load_records(test_file.path()).unwrap();
    assert_eq!(records.len(), 12);

    let k = parse_cluster_count(None).unwrap();
    let analysis = Engine::default().cluster(&records, k).unwrap();
    let labels = &analysis.model.labels;

    // Each profile forms its own cluster
    for group in [["1", "2", "3", "4"], ["5", "6", "7", "8"], ["9", "10", "11", "12"]] {
        let first = label_of(labels, group[0], &records);
        for id in &group[1..] {
            assert_eq!(label_of(labels, id, &records), first, "record {id}");
        }
    }
    assert_ne!(label_of(labels, "1", &records), label_of(labels, "5", &records));
    assert_ne!(label_of(labels, "1", &records), label_of(labels, "9", &records));
    assert_ne!(label_of(labels, "5", &records), label_of(labels, "9", &records));

    // The report partitions every index and each medoid sits in its cluster
    let report = analysis.report();
    let mut seen: Vec<usize> = report
        .clusters
        .iter()
        .flat_map(|c| c.members.iter().copied())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..12).collect::<Vec<_>>());
    for cluster in &report.clusters {
        assert!(cluster.members.contains(&cluster.medoid));
    }

    assert!(analysis.silhouette() > 0.5);
}

#[test]
fn test_every_initialization_is_deterministic() {
    let test_file = create_test_csv();
    let records = load_records(test_file.path()).unwrap();

    for init in [
        Initialization::Build,
        Initialization::Heuristic,
        Initialization::KMedoidsPlusPlus { seed: 42 },
    ] {
        let engine = Engine::new(EngineConfig::default().with_init(init));
        let first = engine.cluster(&records, 3).unwrap();
        let second = engine.cluster(&records, 3).unwrap();

        assert_eq!(first.model, second.model);
        assert_eq!(
            serde_json::to_string(&first.report()).unwrap(),
            serde_json::to_string(&second.report()).unwrap()
        );
    }
}

#[test]
fn test_k_extremes() {
    let test_file = create_test_csv();
    let records = load_records(test_file.path()).unwrap();
    let engine = Engine::default();

    let all = engine.cluster(&records, 12).unwrap();
    assert_eq!(all.model.cluster_sizes(), vec![1; 12]);
    for (cluster, &medoid) in all.model.medoids.iter().enumerate() {
        assert_eq!(all.model.labels[medoid], cluster);
    }

    let one = engine.cluster(&records, 1).unwrap();
    assert_eq!(one.report().clusters[0].members, (0..12).collect::<Vec<_>>());
    let medoid = one.model.medoids[0];
    let best = (0..12)
        .map(|i| one.distances.row_sum(i))
        .fold(f64::INFINITY, f64::min);
    assert_eq!(one.distances.row_sum(medoid), best);
}

#[test]
fn test_error_handling_invalid_clusters() {
    let test_file = create_test_csv();
    let records = load_records(test_file.path()).unwrap();
    let engine = Engine::default();

    for k in [0, 13] {
        let err = engine.cluster(&records, k).unwrap_err();
        assert!(
            matches!(
                err,
                Error::Validation(ValidationError::InvalidClusterCount { requested, n_items: 12 })
                    if requested == k
            ),
            "k = {k}: {err}"
        );
    }
}

#[test]
fn test_missing_eps_is_data_error() {
    let value = json!([
        {"stockname": "BBCA", "roa": 3.1, "roe": 18.5, "eps": 412, "npm": 45.2,
         "bv": 1720, "price_to_bv": 4.9, "pe_ratio": 22.4, "de_ratio": 5.6},
        {"stockname": "TLKM", "roa": 9.1, "roe": 17.0, "npm": 18.2,
         "bv": 1050, "price_to_bv": 3.2, "pe_ratio": 15.5, "de_ratio": 0.7}
    ]);

    let err = Record::from_json_array(&value).unwrap_err();
    assert_eq!(
        err,
        DataError::MissingFeature {
            record: "1".to_string(),
            metric: "eps"
        }
    );
}

#[test]
fn test_ranges_on_twelve_records() {
    let test_file = create_test_csv();
    let records = load_records(test_file.path()).unwrap();

    let (_, ranges) = Engine::default().analyze(&records, 3).unwrap();
    let ids = |slice: &[&Record]| slice.iter().map(|r| r.id().to_string()).collect::<Vec<_>>();

    // roa ascending: 4,2,3,1,11,9,12,10,6,8,5,7
    assert_eq!(ids(&ranges.lowest[&Metric::Roa]), ["4", "2", "3", "1", "11"]);
    assert_eq!(ids(&ranges.medium[&Metric::Roa]), ["11", "9", "12", "10", "6"]);
    assert_eq!(ids(&ranges.highest[&Metric::Roa]), ["10", "6", "8", "5", "7"]);
}

#[test]
fn test_prediction() {
    let test_file = create_test_csv();
    let records = load_records(test_file.path()).unwrap();
    let analysis = Engine::default().cluster(&records, 3).unwrap();

    let miner = Record::new(
        "new",
        "BUMI",
        [18.0, 28.0, 905.0, 31.0, 3080.0, 1.1, 4.3, 0.5],
    )
    .unwrap();
    assert_eq!(
        analysis.predict(&miner),
        label_of(&analysis.model.labels, "5", &records)
    );
}
