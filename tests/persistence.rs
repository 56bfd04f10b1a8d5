use gaussmix::{Error, GaussianMixture, ModelBag, MODEL_TOPIC};
use rand::prelude::*;

fn blobs(seed: u64) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers = [[0.0, 0.0, 0.0], [6.0, -2.0, 1.0], [-4.0, 5.0, 3.0]];
    (0..90)
        .map(|i| {
            let c = centers[i % 3];
            [
                c[0] + rng.random_range(-1.0..1.0),
                c[1] + rng.random_range(-1.0..1.0),
                c[2] + rng.random_range(-1.0..1.0),
            ]
        })
        .collect()
}

fn trained(seed: u64) -> GaussianMixture<3> {
    let data = blobs(seed);
    let mut gmm = GaussianMixture::<3>::new().with_seed(seed);
    gmm.set_num_states(3);
    gmm.init_kmeans(&data, 25).unwrap();
    gmm
}

fn assert_same_model(a: &GaussianMixture<3>, b: &GaussianMixture<3>) {
    assert_eq!(a.num_states(), b.num_states());
    assert_eq!(a.is_initialized(), b.is_initialized());
    for s in 0..a.num_states() {
        assert_eq!(a.prior(s).to_bits(), b.prior(s).to_bits());
        assert_eq!(a.mean(s), b.mean(s));
        assert_eq!(a.covariance(s), b.covariance(s));
    }
}

#[test]
fn test_binary_file_roundtrip() {
    let gmm = trained(3);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.gmm");
    gmm.to_binary_file(&path).unwrap();

    let mut back = GaussianMixture::<3>::new();
    back.from_binary_file(&path).unwrap();
    assert_same_model(&gmm, &back);

    // Densities agree bit for bit.
    for x in blobs(99).iter().take(20) {
        assert_eq!(gmm.pdf(x).to_bits(), back.pdf(x).to_bits());
        assert_eq!(gmm.most_likely_state(x), back.most_likely_state(x));
    }
}

#[test]
fn test_binary_file_dimension_mismatch() {
    let gmm = trained(4);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.gmm");
    gmm.to_binary_file(&path).unwrap();

    let mut wrong = GaussianMixture::<2>::new();
    let err = wrong.from_binary_file(&path).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, found: 3 }));
    assert_eq!(wrong.num_states(), 0);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut gmm = GaussianMixture::<3>::new();
    let err = gmm.from_binary_file(dir.path().join("absent.gmm")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_truncated_file_is_io_error() {
    let gmm = trained(5);
    let mut buf = Vec::new();
    gmm.write_binary(&mut buf).unwrap();
    buf.truncate(buf.len() - 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.gmm");
    std::fs::write(&path, &buf).unwrap();

    let mut back = GaussianMixture::<3>::new();
    assert!(matches!(back.from_binary_file(&path), Err(Error::Io(_))));
}

#[test]
fn test_message_roundtrip_through_json() {
    let gmm = trained(6);
    let msg = gmm.to_message().unwrap();
    let json = serde_json::to_string(&msg).unwrap();
    let parsed = serde_json::from_str(&json).unwrap();

    let mut back = GaussianMixture::<3>::new();
    back.from_message(&parsed).unwrap();
    assert_same_model(&gmm, &back);
}

#[test]
fn test_bag_roundtrip() {
    let gmm = trained(7);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    gmm.to_bag(&path).unwrap();

    let bag = ModelBag::open(&path).unwrap();
    assert_eq!(bag.messages(MODEL_TOPIC).count(), 1);

    let mut back = GaussianMixture::<3>::new();
    back.from_bag(&path).unwrap();
    assert_same_model(&gmm, &back);
}

#[test]
fn test_bag_with_two_models_is_rejected() {
    let msg = trained(8).to_message().unwrap();
    let mut bag = ModelBag::new();
    bag.push(MODEL_TOPIC, msg.clone()).push(MODEL_TOPIC, msg);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.json");
    bag.save(&path).unwrap();

    let mut back = GaussianMixture::<3>::new();
    assert!(matches!(back.from_bag(&path), Err(Error::Container(_))));
}
