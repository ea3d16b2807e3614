use std::fs;

use rand::Rng;
use resiliso::prelude::*;
use tempfile::TempDir;

fn scenario_payload() -> Vec<u8> {
    let mut payload = vec![0u8; 10_000];
    payload[5000] = 0xFF;
    payload
}

#[test]
fn corrupted_block_is_restored_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let set = RedundancySet::write(dir.path(), &scenario_payload(), 4096).unwrap();

    let sizes: Vec<usize> = (0..3)
        .map(|i| fs::read(set.block_path(i).unwrap()).unwrap().len())
        .collect();
    assert_eq!(sizes, vec![4096, 4096, 1808]);

    set.corrupt_block(1).unwrap();
    let corrupted = fs::read(set.block_path(1).unwrap()).unwrap();
    assert!(corrupted[2048..2056].iter().all(|&b| b == 0xFF));
    assert_eq!(set.verify().unwrap(), Some(ChainFault { index: 1, kind: FaultKind::Mismatch }));

    let report = set.recover().unwrap();
    assert!(matches!(report, RecoveryReport::Recovered { index: 1, verified: true, .. }));

    let restored = fs::read(set.block_path(1).unwrap()).unwrap();
    assert_eq!(restored, scenario_payload()[4096..8192]);
    assert_eq!(restored[5000 - 4096], 0xFF);
    assert_eq!(set.recover().unwrap(), RecoveryReport::Clean);
}

#[test]
fn empty_payload_has_header_only_manifest_and_zero_parity() {
    let dir = TempDir::new().unwrap();
    let set = RedundancySet::write(dir.path(), &[], 4096).unwrap();

    assert!(set.manifest.is_empty());
    assert_eq!(fs::read_to_string(set.manifest_path()).unwrap(), "blocksize=4096\n");
    assert_eq!(fs::read(set.parity_path()).unwrap(), vec![0u8; 4096]);
    assert_eq!(set.recover().unwrap(), RecoveryReport::Clean);
}

#[test]
fn random_payloads_survive_any_single_erasure() {
    let mut rng = rand::rng();
    for _ in 0..5 {
        let block_size = rng.random_range(1..=512);
        let mut payload = vec![0u8; rng.random_range(1..4000)];
        rng.fill(&mut payload[..]);

        let dir = TempDir::new().unwrap();
        let set = RedundancySet::write(dir.path(), &payload, block_size).unwrap();
        let victim = rng.random_range(0..set.manifest.len());
        fs::remove_file(set.block_path(victim).unwrap()).unwrap();

        let report = set.recover().unwrap();
        assert!(matches!(
            report,
            RecoveryReport::Recovered { kind: FaultKind::Missing, verified: true, .. }
        ));

        let blocks: Vec<Block> = (0..set.manifest.len())
            .map(|i| Block::new(i, &fs::read(set.block_path(i).unwrap()).unwrap()))
            .collect();
        assert_eq!(join(&blocks, block_size, payload.len()), payload);
    }
}

#[test]
fn pipeline_image_carries_a_recoverable_redundancy_set() {
    let dir = TempDir::new().unwrap();
    let config = ResilisoConfig {
        image_path: dir.path().join("resiliso.iso"),
        redundancy_dir: dir.path().join("build").join("REDUNDANCY"),
        ..ResilisoConfig::default()
    };
    let payload = scenario_payload();
    let report = Pipeline::new(config).unwrap().run(&payload, None).unwrap();

    let image = fs::read(&report.image_path).unwrap();
    let parsed = DiscImage::parse_layout(&image).unwrap();
    let boot = parsed.find("BOOT.IMG").unwrap();
    assert_eq!(boot.extent_lba, parsed.catalog.initial.load_lba);
    assert_eq!(parsed.file_data(&image, boot).unwrap(), payload.as_slice());

    // pull the embedded set back out of the image and repair it there
    let extracted = dir.path().join("extracted");
    parsed.extract_to(&image, &extracted).unwrap();
    let set = RedundancySet::open(&extracted).unwrap();
    assert_eq!(set.manifest, report.redundancy.manifest);
    assert_eq!(set.verify().unwrap(), None);

    set.corrupt_block(2).unwrap();
    let report = set.recover().unwrap();
    assert!(matches!(report, RecoveryReport::Recovered { index: 2, verified: true, .. }));
    assert_eq!(fs::read(set.block_path(2).unwrap()).unwrap(), vec![0u8; 1808]);
}

#[test]
fn reordered_blocks_are_detected() {
    let dir = TempDir::new().unwrap();
    let payload: Vec<u8> = (0..3 * 64).map(|i| (i / 64) as u8 + 1).collect();
    let set = RedundancySet::write(dir.path(), &payload, 64).unwrap();

    let first = fs::read(set.block_path(0).unwrap()).unwrap();
    let second = fs::read(set.block_path(1).unwrap()).unwrap();
    fs::write(set.block_path(0).unwrap(), &second).unwrap();
    fs::write(set.block_path(1).unwrap(), &first).unwrap();

    assert_eq!(set.verify().unwrap().map(|fault| fault.index), Some(0));
}
