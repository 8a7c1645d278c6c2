//! HTTP transport for the remote ledger.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ledgerq_core::{Kind, Record};
use ledgerq_fetch::{DateWindow, PageFetcher};
use ledgerq_ops::RecordMutator;

use crate::config::Config;

/// Record shape on the wire. The remote calls the kind `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: i64,
    pub mode: String,
    pub date: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_account_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing)]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub genre_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub account_name: Option<String>,
}

pub fn mode_of(kind: Kind) -> &'static str {
    match kind {
        Kind::Outflow => "payment",
        Kind::Inflow => "income",
        Kind::Transfer => "transfer",
    }
}

fn kind_of(mode: &str) -> Option<Kind> {
    match mode {
        "payment" => Some(Kind::Outflow),
        "income" => Some(Kind::Inflow),
        "transfer" => Some(Kind::Transfer),
        _ => None,
    }
}

impl TryFrom<RemoteRecord> for Record {
    type Error = anyhow::Error;

    fn try_from(r: RemoteRecord) -> Result<Self> {
        let kind = kind_of(&r.mode)
            .with_context(|| format!("record {} has unknown mode `{}`", r.id, r.mode))?;
        // payments draw from an account, income lands in one
        let account_id = match kind {
            Kind::Outflow => r.from_account_id,
            Kind::Inflow => r.to_account_id,
            Kind::Transfer => None,
        };
        Ok(Record {
            id: r.id,
            kind,
            date: r.date,
            amount: r.amount,
            category_id: r.category_id,
            genre_id: r.genre_id,
            account_id,
            from_account_id: r.from_account_id,
            to_account_id: r.to_account_id,
            place: r.place,
            name: r.name,
            comment: r.comment,
            category: r.category_name,
            genre: r.genre_name,
            account: r.account_name,
        })
    }
}

impl From<&Record> for RemoteRecord {
    fn from(r: &Record) -> Self {
        let (from_account_id, to_account_id) = match r.kind {
            Kind::Outflow => (r.from_account_id.or(r.account_id), None),
            Kind::Inflow => (None, r.to_account_id.or(r.account_id)),
            Kind::Transfer => (r.from_account_id, r.to_account_id),
        };
        RemoteRecord {
            id: r.id,
            mode: mode_of(r.kind).to_string(),
            date: r.date.clone(),
            amount: r.amount,
            category_id: r.category_id,
            genre_id: r.genre_id,
            from_account_id,
            to_account_id,
            place: r.place.clone(),
            name: r.name.clone(),
            comment: r.comment.clone(),
            category_name: None,
            genre_name: None,
            account_name: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody {
    Wrapped { records: Vec<RemoteRecord> },
    Bare(Vec<RemoteRecord>),
}

impl PageBody {
    fn into_records(self) -> Vec<RemoteRecord> {
        match self {
            PageBody::Wrapped { records } | PageBody::Bare(records) => records,
        }
    }
}

pub fn decode_page(body: &str) -> Result<Vec<Record>> {
    let page: PageBody = serde_json::from_str(body).context("parse records page")?;
    page.into_records().into_iter().map(Record::try_from).collect()
}

#[derive(Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLedger {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let token = cfg.resolve_token();
        Self::new(
            &cfg.api.base_url,
            token.as_deref(),
            Duration::from_secs(cfg.api.timeout_secs),
        )
    }

    fn record_url(&self, kind: Kind, id: i64) -> String {
        format!("{}/records/{}/{}", self.base_url, mode_of(kind), id)
    }
}

async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("{what} failed: {status} {txt}");
    }
    Ok(resp)
}

#[async_trait]
impl PageFetcher for HttpLedger {
    async fn fetch_page(
        &self,
        window: &DateWindow,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Record>> {
        debug!(window = %window, page, page_size, "GET records");
        let resp = self
            .client
            .get(format!("{}/records", self.base_url))
            .query(&[
                ("start_date", window.start.to_string()),
                ("end_date", window.end.to_string()),
                ("page", page.to_string()),
                ("limit", page_size.to_string()),
            ])
            .send()
            .await
            .context("records request")?;
        let body = check(resp, "records request").await?.text().await?;
        decode_page(&body)
    }
}

#[async_trait]
impl RecordMutator for HttpLedger {
    async fn update_record(&self, kind: Kind, id: i64, record: &Record) -> Result<()> {
        debug!(id, kind = kind.as_str(), "PUT record");
        let resp = self
            .client
            .put(self.record_url(kind, id))
            .json(&RemoteRecord::from(record))
            .send()
            .await
            .with_context(|| format!("update record {id}"))?;
        check(resp, "update").await?;
        Ok(())
    }

    async fn delete_record(&self, kind: Kind, id: i64) -> Result<()> {
        debug!(id, kind = kind.as_str(), "DELETE record");
        let resp = self
            .client
            .delete(self.record_url(kind, id))
            .send()
            .await
            .with_context(|| format!("delete record {id}"))?;
        check(resp, "delete").await?;
        Ok(())
    }
}
