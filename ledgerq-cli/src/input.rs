//! Turning command-line input into request JSON.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};
use std::fs;
use std::io::Read;

/// `--request` accepts inline JSON, `@path` or `-` for stdin.
pub fn read_request(src: &str) -> Result<Value> {
    let text = if src == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("read request from stdin")?;
        s
    } else if let Some(path) = src.strip_prefix('@') {
        fs::read_to_string(path).with_context(|| format!("read {path}"))?
    } else {
        src.to_string()
    };
    serde_json::from_str(&text).context("parse request JSON")
}

/// Request parts given as individual flags.
#[derive(Debug, Clone, Default)]
pub struct RequestFlags {
    pub start: Option<String>,
    pub end: Option<String>,
    pub criteria: Option<String>,
    pub output: Option<String>,
    pub updates: Option<String>,
    pub expected_count: Option<i64>,
    pub dry_run: bool,
}

impl RequestFlags {
    pub fn into_request(self) -> Result<Value> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            bail!("pass --request, or both --start and --end");
        };

        let mut params = Map::new();
        params.insert("dateRange".to_string(), json!({"start": start, "end": end}));
        for (key, raw) in [
            ("criteria", self.criteria),
            ("output", self.output),
            ("updates", self.updates),
        ] {
            if let Some(raw) = raw {
                params.insert(key.to_string(), read_request(&raw).with_context(|| format!("--{key}"))?);
            }
        }
        if let Some(n) = self.expected_count {
            params.insert("expectedCount".to_string(), json!(n));
        }
        if self.dry_run {
            params.insert("dryRun".to_string(), json!(true));
        }
        Ok(Value::Object(params))
    }
}

/// `--request` wins over individual flags.
pub fn resolve(request: Option<&str>, flags: RequestFlags) -> Result<Value> {
    match request {
        Some(src) => read_request(src),
        None => flags.into_request(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_request() {
        let v = read_request(r#"{"dateRange": {"start": "2024-01-01", "end": "2024-01-31"}}"#).unwrap();
        assert_eq!(v["dateRange"]["end"], "2024-01-31");
    }

    #[test]
    fn test_flags_build_request() {
        let flags = RequestFlags {
            start: Some("2024-01-01".to_string()),
            end: Some("2024-01-31".to_string()),
            criteria: Some(r#"{"type":"condition","field":"place","operator":"equals","value":"A"}"#.to_string()),
            updates: Some(r#"{"place":"B"}"#.to_string()),
            expected_count: Some(2),
            dry_run: true,
            ..RequestFlags::default()
        };
        let v = flags.into_request().unwrap();
        assert_eq!(v["criteria"]["field"], "place");
        assert_eq!(v["updates"]["place"], "B");
        assert_eq!(v["expectedCount"], 2);
        assert_eq!(v["dryRun"], true);
        assert!(v.get("output").is_none());
    }

    #[test]
    fn test_missing_window_is_an_error() {
        let flags = RequestFlags {
            start: Some("2024-01-01".to_string()),
            ..RequestFlags::default()
        };
        assert!(flags.into_request().is_err());
    }

    #[test]
    fn test_request_file() {
        let dir = std::env::temp_dir().join(format!("ledgerq-input-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("req.json");
        fs::write(&path, r#"{"expectedCount": 3}"#).unwrap();
        let v = read_request(&format!("@{}", path.display())).unwrap();
        assert_eq!(v["expectedCount"], 3);
        fs::remove_dir_all(&dir).unwrap();
    }
}
