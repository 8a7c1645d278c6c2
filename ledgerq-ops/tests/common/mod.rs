#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use chrono::NaiveDate;
use ledgerq_core::{Kind, Record};
use ledgerq_fetch::{DateWindow, FetchOptions, FetchOrchestrator, PageFetcher};
use ledgerq_ops::{MutationOptions, RecordMutator};

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Update { kind: Kind, id: i64, record: Record },
    Delete { kind: Kind, id: i64 },
}

#[derive(Default)]
struct State {
    records: Vec<Record>,
    page_calls: usize,
    writes: Vec<Write>,
}

/// In-memory remote ledger. Clones share state.
#[derive(Clone, Default)]
pub struct FakeLedger {
    state: Arc<Mutex<State>>,
    fail_fetch: Option<String>,
    fail_writes: HashSet<i64>,
}

impl FakeLedger {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                records,
                ..State::default()
            })),
            ..Self::default()
        }
    }

    pub fn failing_fetch(mut self, message: &str) -> Self {
        self.fail_fetch = Some(message.to_string());
        self
    }

    pub fn failing_write(mut self, id: i64) -> Self {
        self.fail_writes.insert(id);
        self
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn page_calls(&self) -> usize {
        self.state.lock().unwrap().page_calls
    }

    pub fn record(&self, id: i64) -> Option<Record> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

#[async_trait]
impl PageFetcher for FakeLedger {
    async fn fetch_page(
        &self,
        window: &DateWindow,
        page: usize,
        page_size: usize,
    ) -> anyhow::Result<Vec<Record>> {
        let mut state = self.state.lock().unwrap();
        state.page_calls += 1;
        if let Some(msg) = &self.fail_fetch {
            bail!("{msg}");
        }
        Ok(state
            .records
            .iter()
            .filter(|r| {
                NaiveDate::parse_from_str(r.date_key(), "%Y-%m-%d")
                    .map(|d| window.contains(d))
                    .unwrap_or(false)
            })
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecordMutator for FakeLedger {
    async fn update_record(&self, kind: Kind, id: i64, record: &Record) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::Update {
            kind,
            id,
            record: record.clone(),
        });
        if self.fail_writes.contains(&id) {
            bail!("remote rejected record {id}");
        }
        if let Some(slot) = state.records.iter_mut().find(|r| r.id == id) {
            *slot = record.clone();
        }
        Ok(())
    }

    async fn delete_record(&self, kind: Kind, id: i64) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::Delete { kind, id });
        if self.fail_writes.contains(&id) {
            bail!("remote rejected record {id}");
        }
        state.records.retain(|r| r.id != id);
        Ok(())
    }
}

pub fn orchestrator() -> FetchOrchestrator {
    FetchOrchestrator::new(FetchOptions {
        delay: Duration::ZERO,
        ..FetchOptions::default()
    })
}

pub fn no_delay() -> MutationOptions {
    MutationOptions {
        delay: Duration::ZERO,
    }
}

/// January: two outflows at "Cafe Luna" (category 3), one at "Book Nook", one inflow.
pub fn january() -> Vec<Record> {
    vec![
        Record::new(1, Kind::Outflow, "2024-01-05", 4.5)
            .with_place("Cafe Luna")
            .with_category(3, "Food"),
        Record::new(2, Kind::Outflow, "2024-01-12", 5.0)
            .with_place("Cafe Luna")
            .with_category(3, "Food"),
        Record::new(3, Kind::Outflow, "2024-01-20", 18.0)
            .with_place("Book Nook")
            .with_category(7, "Books"),
        Record::new(4, Kind::Inflow, "2024-01-25", 2500.0).with_name("Salary"),
    ]
}
