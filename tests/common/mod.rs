//! Synthetic budget fixtures shared by the integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const GUID_A: &str = "8D2C4B6A-1E3F-4A5B-9C7D-0E1F2A3B4C5D";
pub const GUID_B: &str = "F1E2D3C4-B5A6-4978-8695-A4B3C2D1E0F9";

/// Transaction updated twice in the chain (A-68, A-84) plus one stale write.
pub const TRACKED_TXN: &str = "44B1567B-2F0C-4D8E-B1A9-6C3E5F7A9D21";
pub const TRACKED_INITIAL_AMOUNT: f64 = -50.0;
pub const TRACKED_AMOUNT_AT_68: f64 = -55.25;
pub const TRACKED_FINAL_AMOUNT: f64 = -61.75;

/// Payee removed by a tombstone in the file ending at 99.
pub const DELETED_PAYEE: &str = "PAYEE-14";

/// Transaction whose memo alone is patched in the file ending at 111.
pub const MEMO_TXN: &str = "TXN-02";

/// Transaction created in the file ending at 120.
pub const NEW_TXN: &str = "TXN-NEW";

pub const SNAPSHOT_VERSION: u64 = 63;
pub const FINAL_VERSION: u64 = 141;

pub struct Fixture {
    pub dir: TempDir,
    pub root: PathBuf,
    pub data_root: PathBuf,
}

impl Fixture {
    pub fn replica_dir(&self) -> PathBuf {
        self.data_root.join(GUID_A)
    }

    pub fn device_path(&self, short_id: &str) -> PathBuf {
        self.data_root
            .join("devices")
            .join(format!("{}.ydevice", short_id))
    }
}

/// Route `tracing` output to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn device(guid: &str, short_id: &str, knowledge: &str, full: &str) -> Value {
    json!({
        "deviceGUID": guid,
        "shortDeviceId": short_id,
        "friendlyName": format!("Device {}", short_id),
        "knowledge": knowledge,
        "knowledgeInFullBudgetFile": full,
        "hasFullKnowledge": true,
        "formatVersion": "1.2",
        "YNABVersion": "Desktop version: YNAB 4 v4.3.857",
        "deviceType": "Desktop (Mac)",
        "lastDataVersionFullyKnown": "4.2",
        "highestDataVersionImported": null
    })
}

/// End versions of the change chain: 67, then 69 to 141 in steps of three.
pub fn chain_ends() -> Vec<u64> {
    let mut ends = vec![67];
    ends.extend((69..=FINAL_VERSION).step_by(3));
    ends
}

/// `A-63_A-67.ydiff`, `A-67_A-69.ydiff`, ... in replay order.
pub fn chain_file_names() -> Vec<String> {
    let mut start = SNAPSHOT_VERSION;
    chain_ends()
        .into_iter()
        .map(|end| {
            let name = format!("A-{}_A-{}.ydiff", start, end);
            start = end;
            name
        })
        .collect()
}

fn transaction(
    id: &str,
    account: &str,
    payee: &str,
    category: &str,
    amount: f64,
    date: &str,
    cleared: &str,
    version: &str,
) -> Value {
    json!({
        "entityId": id,
        "accountId": account,
        "payeeId": payee,
        "categoryId": category,
        "amount": amount,
        "date": date,
        "cleared": cleared,
        "accepted": true,
        "memo": null,
        "flag": null,
        "entityVersion": version
    })
}

fn snapshot() -> Value {
    let accounts: Vec<Value> = (1..=3)
        .map(|i| {
            json!({
                "entityId": format!("ACC-{}", i),
                "accountName": (["Checking", "Savings", "Credit Card"][i - 1]),
                "accountType": (["Checking", "Savings", "CreditCard"][i - 1]),
                "onBudget": true,
                "sortableIndex": i * 10,
                "hidden": false,
                "lastReconciledBalance": 0,
                "entityVersion": format!("A-{}", i)
            })
        })
        .collect();

    let payees: Vec<Value> = (1..=14)
        .map(|i| {
            json!({
                "entityId": format!("PAYEE-{:02}", i),
                "name": format!("Payee {}", i),
                "enabled": true,
                "autoFillCategoryId": null,
                "entityVersion": format!("A-{}", 3 + i)
            })
        })
        .collect();

    let mut transactions: Vec<Value> = (1..=16)
        .map(|i: usize| {
            let cleared = ["Uncleared", "Reconciled", "Cleared"][i % 3];
            transaction(
                &format!("TXN-{:02}", i),
                &format!("ACC-{}", i % 3 + 1),
                &format!("PAYEE-{:02}", i % 14 + 1),
                if i % 2 == 0 { "CAT-GROC" } else { "CAT-FUEL" },
                -(i as f64) * 10.0,
                &format!("2025-08-{:02}", i),
                cleared,
                &format!("A-{}", 20 + i),
            )
        })
        .collect();
    transactions.push(transaction(
        TRACKED_TXN,
        "ACC-1",
        "PAYEE-01",
        "CAT-GROC",
        TRACKED_INITIAL_AMOUNT,
        "2025-08-20",
        "Uncleared",
        "A-40",
    ));

    json!({
        "fileMetaData": {"budgetDataVersion": "4.2"},
        "accounts": accounts,
        "payees": payees,
        "transactions": transactions,
        "masterCategories": [{
            "entityId": "MC-EVERYDAY",
            "name": "Everyday Expenses",
            "type": "OUTFLOW",
            "deleteable": true,
            "expanded": true,
            "sortableIndex": 0,
            "entityVersion": "A-50",
            "subCategories": [
                {"entityId": "CAT-GROC", "name": "Groceries", "type": "OUTFLOW",
                 "masterCategoryId": "MC-EVERYDAY", "sortableIndex": 0,
                 "cachedBalance": 0, "entityVersion": "A-51"},
                {"entityId": "CAT-FUEL", "name": "Fuel", "type": "OUTFLOW",
                 "masterCategoryId": "MC-EVERYDAY", "sortableIndex": 1,
                 "cachedBalance": 0, "entityVersion": "A-52"}
            ]
        }],
        "monthlyBudgets": [{
            "entityId": "MB/2025-08",
            "month": "2025-08-01",
            "entityVersion": "A-53"
        }],
        "monthlyCategoryBudgets": [
            {"entityId": "MCB/2025-08/CAT-GROC", "categoryId": "CAT-GROC",
             "parentMonthlyBudgetId": "MB/2025-08", "budgeted": 400.0,
             "overspendingHandling": null, "note": null, "entityVersion": "A-54"},
            {"entityId": "MCB/2025-08/CAT-FUEL", "categoryId": "CAT-FUEL",
             "parentMonthlyBudgetId": "MB/2025-08", "budgeted": 120.0,
             "overspendingHandling": null, "entityVersion": "A-55"}
        ],
        "scheduledTransactions": [{
            "entityId": "SCH-RENT",
            "frequency": "Monthly",
            "amount": -1200.0,
            "payeeId": "PAYEE-03",
            "accountId": "ACC-1",
            "date": "2025-09-01",
            "entityVersion": "A-56"
        }]
    })
}

fn item(kind: &str, id: &str, version: &str, fields: Value) -> Value {
    let mut item = json!({
        "entityType": kind,
        "entityId": id,
        "entityVersion": version,
        "isTombstone": false,
        "madeWithKnowledge": null,
        "isResolvedConflict": false
    });
    if let (Some(target), Value::Object(extra)) = (item.as_object_mut(), fields) {
        target.extend(extra);
    }
    item
}

fn tombstone(kind: &str, id: &str, version: &str) -> Value {
    json!({
        "entityType": kind,
        "entityId": id,
        "entityVersion": version,
        "isTombstone": true
    })
}

/// Items of the change file ending at `end`.
fn chain_items(end: u64) -> Vec<Value> {
    let stamp = format!("A-{}", end);
    // Every file touches the checking account so no file is empty.
    let mut items = vec![item(
        "account",
        "ACC-1",
        &stamp,
        json!({"sortableIndex": end}),
    )];

    match end {
        67 => items.push(item(
            "payee",
            "PAYEE-01",
            &stamp,
            json!({"name": "Corner Grocer"}),
        )),
        69 => items.push(item(
            "transaction",
            TRACKED_TXN,
            "A-68",
            json!({"amount": TRACKED_AMOUNT_AT_68}),
        )),
        84 => items.push(item(
            "transaction",
            TRACKED_TXN,
            "A-84",
            json!({"amount": TRACKED_FINAL_AMOUNT, "cleared": "Cleared"}),
        )),
        90 => items.push(item(
            "transaction",
            TRACKED_TXN,
            "A-80",
            json!({"amount": -999.0}),
        )),
        99 => {
            items.push(tombstone("payee", DELETED_PAYEE, &stamp));
            items.push(tombstone("payee", "PAYEE-NEVER-EXISTED", &stamp));
        }
        105 => items.push(item(
            "budgetMetaData",
            "META-1",
            &stamp,
            json!({"currencyLocale": "en_US"}),
        )),
        111 => items.push(item(
            "transaction",
            MEMO_TXN,
            &stamp,
            json!({"memo": "split with flatmate"}),
        )),
        120 => items.push(item(
            "transaction",
            NEW_TXN,
            &stamp,
            json!({
                "accountId": "ACC-2",
                "payeeId": "PAYEE-05",
                "categoryId": "CAT-FUEL",
                "amount": -42.0,
                "date": "2025-08-28",
                "cleared": "Uncleared",
                "accepted": false,
                "memo": null
            }),
        )),
        _ => {}
    }
    items
}

fn change_document(start: &str, end: &str, items: Vec<Value>) -> Value {
    json!({
        "shortDeviceId": "A",
        "startVersion": start,
        "endVersion": end,
        "deviceGUID": GUID_A,
        "publishTime": "Tue Aug 05 14:03:11 GMT+0200 2025",
        "budgetDataGUID": null,
        "formatVersion": null,
        "dataVersion": "4.2",
        "items": items
    })
}

/// Full budget: two replicas (A active at `A-141`, B behind), a snapshot at
/// `A-63` with 3 accounts, 14 payees and 17 transactions, and a 26-file
/// change chain ending at `A-141`.
pub fn budget_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Household~1A2B3C4D.ynab4");
    let data_root = root.join("data1~5F3A2B1C");

    write_json(
        &data_root.join("devices").join("A.ydevice"),
        &device(GUID_A, "A", "A-141", "A-63"),
    );
    write_json(
        &data_root.join("devices").join("B.ydevice"),
        &device(GUID_B, "B", "A-60,B-12", "A-60,B-12"),
    );
    write_json(&data_root.join(GUID_A).join("Budget.yfull"), &snapshot());
    fs::create_dir_all(data_root.join(GUID_B)).unwrap();

    let mut start = SNAPSHOT_VERSION;
    for end in chain_ends() {
        let (from, to) = (format!("A-{}", start), format!("A-{}", end));
        write_json(
            &data_root
                .join(GUID_A)
                .join(format!("{}_{}.ydiff", from, to)),
            &change_document(&from, &to, chain_items(end)),
        );
        start = end;
    }

    Fixture {
        dir,
        root,
        data_root,
    }
}

/// Budget with only a snapshot and the given replica documents.
pub fn bare_budget(devices: &[(&str, Value)]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Bare~00000000.ynab4");
    let data_root = root.join("data1~00000000");
    fs::create_dir_all(data_root.join("devices")).unwrap();

    for (short_id, document) in devices {
        write_json(
            &data_root
                .join("devices")
                .join(format!("{}.ydevice", short_id)),
            document,
        );
        if let Some(guid) = document.get("deviceGUID").and_then(Value::as_str) {
            write_json(
                &data_root.join(guid).join("Budget.yfull"),
                &json!({"payees": [{"entityId": "P1", "name": guid, "enabled": true,
                                    "entityVersion": "A-1"}]}),
            );
        }
    }

    Fixture {
        dir,
        root,
        data_root,
    }
}
