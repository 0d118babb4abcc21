use plume_index::storage::codec::CommonCodec;
use plume_index::storage::page::{AttrType, RecordId};
use plume_index::{BTreeIndex, BufferPoolConfig, Operator, PlumeError, TableHeap};
use rand::seq::SliceRandom;
use tempfile::TempDir;

// RECORD { i: int, d: double, s: char[64] }, indexed on `i` at offset 0
const RECORD_SIZE: usize = 76;

fn make_record(key: i32) -> Vec<u8> {
    let mut record = Vec::with_capacity(RECORD_SIZE);
    record.extend(CommonCodec::encode_i32(key));
    record.extend(CommonCodec::encode_f64(key as f64));
    let name = format!("record-{key}");
    let mut field = [0u8; 64];
    let len = name.len().min(64);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    record.extend_from_slice(&field);
    record
}

fn build_relation(temp_dir: &TempDir, keys: &[i32]) -> (TableHeap, String) {
    let relation_name = temp_dir.path().join("rel").to_string_lossy().into_owned();
    let heap = TableHeap::create(&relation_name, RECORD_SIZE, BufferPoolConfig::default()).unwrap();
    for key in keys {
        heap.insert_record(&make_record(*key)).unwrap();
    }
    (heap, relation_name)
}

fn build_index(heap: &TableHeap, relation_name: &str) -> BTreeIndex {
    BTreeIndex::open(
        heap,
        relation_name,
        0,
        AttrType::Integer,
        BufferPoolConfig::default(),
    )
    .unwrap()
}

fn collect_scan(
    index: &mut BTreeIndex,
    low: i32,
    low_op: Operator,
    high: i32,
    high_op: Operator,
) -> Vec<RecordId> {
    let mut rids = Vec::new();
    match index.start_scan(low, low_op, high, high_op) {
        Ok(()) => {}
        Err(PlumeError::NoSuchKeyFound) => return rids,
        Err(e) => panic!("start_scan failed: {e}"),
    }
    loop {
        match index.scan_next() {
            Ok(rid) => rids.push(rid),
            Err(PlumeError::IndexScanCompleted) => break,
            Err(e) => panic!("scan_next failed: {e}"),
        }
    }
    rids
}

/// Keys of the matching records, read back from the relation.
fn scanned_keys(
    heap: &TableHeap,
    index: &mut BTreeIndex,
    low: i32,
    low_op: Operator,
    high: i32,
    high_op: Operator,
) -> Vec<i32> {
    let rids = collect_scan(index, low, low_op, high, high_op);

    let mut by_rid = std::collections::HashMap::new();
    let mut scanner = heap.scan();
    while let Some((rid, record)) = scanner.next().unwrap() {
        by_rid.insert(rid, BTreeIndex::key_from_record(&record, 0).unwrap());
    }
    rids.iter().map(|rid| by_rid[rid]).collect()
}

#[test]
fn forward_loaded_relation() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..5000).collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let found = scanned_keys(&heap, &mut index, 25, Operator::Gt, 40, Operator::Lt);
    assert_eq!(found, (26..40).collect::<Vec<i32>>());
    assert_eq!(index.buffer_pool.pinned_page_count(), 0);
}

#[test]
fn backward_loaded_relation() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..5000).rev().collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let found = scanned_keys(&heap, &mut index, 20, Operator::Gte, 35, Operator::Lte);
    assert_eq!(found, (20..=35).collect::<Vec<i32>>());
}

#[test]
fn random_loaded_relation() {
    let temp_dir = TempDir::new().unwrap();
    let mut keys: Vec<i32> = (0..5000).collect();
    keys.shuffle(&mut rand::thread_rng());
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let found = scanned_keys(&heap, &mut index, 3000, Operator::Gte, 4000, Operator::Lt);
    assert_eq!(found.len(), 1000);
    assert_eq!(found, (3000..4000).collect::<Vec<i32>>());
}

#[test]
fn out_of_range_scans() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..5000).collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let all = collect_scan(&mut index, -1000, Operator::Gt, 6000, Operator::Lt);
    assert_eq!(all.len(), 5000);

    let below = collect_scan(&mut index, -800, Operator::Gte, -100, Operator::Lt);
    assert!(below.is_empty());

    let above = collect_scan(&mut index, 5000, Operator::Gt, 5100, Operator::Lte);
    assert!(above.is_empty());

    assert_eq!(index.buffer_pool.pinned_page_count(), 0);
}

#[test]
fn sparse_relation() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..300).map(|i| 10 * i + 10).collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let found = scanned_keys(&heap, &mut index, 25, Operator::Gt, 40, Operator::Lt);
    assert_eq!(found, vec![30]);

    let found = scanned_keys(&heap, &mut index, 300, Operator::Gt, 400, Operator::Lt);
    assert_eq!(found, (31..40).map(|i| 10 * i).collect::<Vec<i32>>());
}

#[test]
fn scan_error_paths() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..10).collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    assert!(matches!(
        index.end_scan(),
        Err(PlumeError::ScanNotInitialized)
    ));
    assert!(matches!(
        index.scan_next(),
        Err(PlumeError::ScanNotInitialized)
    ));
    assert!(matches!(
        index.start_scan(2, Operator::Lte, 5, Operator::Lte),
        Err(PlumeError::BadOpcodes)
    ));
    assert!(matches!(
        index.start_scan(2, Operator::Gte, 5, Operator::Gte),
        Err(PlumeError::BadOpcodes)
    ));
    assert!(matches!(
        index.start_scan(5, Operator::Gte, 2, Operator::Lte),
        Err(PlumeError::BadScanrange)
    ));
}

#[test]
fn reopen_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..5000).collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);

    let before = {
        let mut index = build_index(&heap, &relation_name);
        let rids = collect_scan(&mut index, 25, Operator::Gt, 40, Operator::Lt);
        index.close().unwrap();
        rids
    };
    assert_eq!(before.len(), 14);

    let mut index = build_index(&heap, &relation_name);
    let after = collect_scan(&mut index, 25, Operator::Gt, 40, Operator::Lt);
    assert_eq!(after, before);
}

#[test]
fn duplicate_keys_yield_one_hit_per_rid() {
    let temp_dir = TempDir::new().unwrap();
    let mut keys: Vec<i32> = (0..150).collect();
    keys.extend(0..150);
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let found = scanned_keys(&heap, &mut index, 100, Operator::Gte, 105, Operator::Lt);
    assert_eq!(found, vec![100, 100, 101, 101, 102, 102, 103, 103, 104, 104]);

    let rids = collect_scan(&mut index, 100, Operator::Gte, 100, Operator::Lte);
    assert_eq!(rids.len(), 2);
    assert_ne!(rids[0], rids[1]);
}

// Enough sequential inserts to overflow a full internal root, exercising
// the internal split and a second root promotion.
#[test]
fn internal_split_keeps_the_chain_sorted() {
    let temp_dir = TempDir::new().unwrap();
    let keys: Vec<i32> = (0..90_000).collect();
    let (heap, relation_name) = build_relation(&temp_dir, &keys);
    let mut index = build_index(&heap, &relation_name);

    let all = collect_scan(&mut index, -1, Operator::Gt, 90_000, Operator::Lt);
    assert_eq!(all.len(), 90_000);

    let slice = scanned_keys(
        &heap,
        &mut index,
        44_990,
        Operator::Gte,
        45_010,
        Operator::Lt,
    );
    assert_eq!(slice, (44_990..45_010).collect::<Vec<i32>>());
    assert_eq!(index.buffer_pool.pinned_page_count(), 0);
}
