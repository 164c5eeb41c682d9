//! Performance benchmarks for budget replay.

use budget_replay::{Budget, BudgetConfig, EntityChange, EntityKind, MemoryFs};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DATA: &str = "/budget/data1~BENCH";

fn snapshot(transactions: usize) -> Value {
    let transactions: Vec<Value> = (0..transactions)
        .map(|i| {
            json!({
                "entityId": format!("TXN-{}", i),
                "accountId": "ACC-1",
                "amount": -(i as f64),
                "date": "2025-08-01",
                "cleared": "Cleared",
                "accepted": true,
                "entityVersion": "A-1"
            })
        })
        .collect();
    json!({
        "accounts": [{"entityId": "ACC-1", "accountName": "Checking", "accountType": "Checking",
                      "onBudget": true, "sortableIndex": 0, "hidden": false,
                      "entityVersion": "A-1"}],
        "transactions": transactions
    })
}

/// One file per step, each updating a few transactions and adding one.
fn change(step: usize) -> Value {
    let version = format!("A-{}", step + 2);
    let mut items: Vec<Value> = (0..4)
        .map(|k| {
            json!({
                "entityType": "transaction",
                "entityId": format!("TXN-{}", (step * 7 + k) % 500),
                "entityVersion": version,
                "isTombstone": false,
                "amount": -(step as f64) - 0.5
            })
        })
        .collect();
    items.push(json!({
        "entityType": "transaction",
        "entityId": format!("NEW-{}", step),
        "entityVersion": version,
        "isTombstone": false,
        "accountId": "ACC-1",
        "amount": 1.0,
        "date": "2025-08-02",
        "cleared": "Uncleared",
        "accepted": true
    }));
    json!({ "items": items })
}

/// Replica record whose knowledge covers the whole chain.
fn device(chain_length: usize) -> Value {
    json!({
        "deviceGUID": "GUID-A",
        "shortDeviceId": "A",
        "knowledge": format!("A-{}", chain_length + 1)
    })
}

fn file_name(step: usize) -> String {
    format!("A-{}_A-{}.ydiff", step + 1, step + 2)
}

fn memory_budget(chain_length: usize) -> MemoryFs {
    let mut fs = MemoryFs::new();
    fs.insert(format!("{}/devices/A.ydevice", DATA), device(chain_length).to_string());
    fs.insert(format!("{}/GUID-A/Budget.yfull", DATA), snapshot(500).to_string());
    for step in 0..chain_length {
        fs.insert(
            format!("{}/GUID-A/{}", DATA, file_name(step)),
            change(step).to_string(),
        );
    }
    fs
}

fn disk_budget(dir: &Path, chain_length: usize) {
    let data = dir.join("data1~BENCH");
    let replica = data.join("GUID-A");
    fs::create_dir_all(data.join("devices")).unwrap();
    fs::create_dir_all(&replica).unwrap();
    fs::write(data.join("devices/A.ydevice"), device(chain_length).to_string()).unwrap();
    fs::write(replica.join("Budget.yfull"), snapshot(500).to_string()).unwrap();
    for step in 0..chain_length {
        fs::write(replica.join(file_name(step)), change(step).to_string()).unwrap();
    }
}

/// Benchmark full assembly with varying chain lengths (in memory)
fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");

    for chain_length in [10, 100, 500, 1000] {
        group.bench_with_input(
            BenchmarkId::new("chain_length", chain_length),
            &chain_length,
            |b, &length| {
                let budget = Budget::with_fs(BudgetConfig::new("/budget"), memory_budget(length));
                b.iter(|| {
                    black_box(budget.assemble().unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark bounded replay at several points of a 1000-file chain
fn bench_bounded_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_replay");
    let budget = Budget::with_fs(BudgetConfig::new("/budget"), memory_budget(1000));

    for version in [0u64, 101, 501, 1001] {
        group.bench_with_input(BenchmarkId::new("version", version), &version, |b, &v| {
            b.iter(|| {
                black_box(budget.assemble_at_version(v).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark assembly from a real directory
fn bench_disk_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_assembly");

    for chain_length in [10, 100] {
        group.bench_with_input(
            BenchmarkId::new("chain_length", chain_length),
            &chain_length,
            |b, &length| {
                let dir = TempDir::new().unwrap();
                disk_budget(dir.path(), length);
                let budget = Budget::open(BudgetConfig::new(dir.path())).unwrap();
                b.iter(|| {
                    black_box(budget.assemble().unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark writing a change file and advancing knowledge
fn bench_write_changes(c: &mut Criterion) {
    c.bench_function("write_changes", |b| {
        let dir = TempDir::new().unwrap();
        disk_budget(dir.path(), 1);
        let budget = Budget::open(BudgetConfig::new(dir.path())).unwrap();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            budget
                .write_changes(&[EntityChange::Delete {
                    kind: EntityKind::Transaction,
                    id: format!("TXN-{}", n % 500),
                }])
                .unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_assembly,
    bench_bounded_replay,
    bench_disk_assembly,
    bench_write_changes,
);
criterion_main!(benches);
