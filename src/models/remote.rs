//! Masked language model served over a Hugging Face style fill-mask endpoint.
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::predictor::{MaskedLanguageModel, MaskedPrediction, MaskedQuery, MASK_TOKEN};

pub const API_KEY_ENV: &str = "HF_API_TOKEN";

#[derive(Debug, Deserialize)]
struct FillMaskEntry {
    token_str: String,
    score: f64,
}

pub struct RemoteMaskedLm {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteMaskedLm {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(90))
            .build()?;

        Ok(RemoteMaskedLm {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

fn request_body(query: &MaskedQuery<'_>, top_n: usize) -> Result<Value> {
    if query.input.get(query.position).map(String::as_str) != Some(MASK_TOKEN) {
        return Err(Error::Config(
            "a fill-mask endpoint can only predict masked positions".into(),
        ));
    }
    Ok(json!({
        "inputs": query.input.join(" "),
        "parameters": { "top_k": top_n },
    }))
}

fn parse_response(raw: &str) -> Result<Vec<MaskedPrediction>> {
    let entries: Vec<FillMaskEntry> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .map(|e| MaskedPrediction {
            token: e.token_str.trim().to_owned(),
            score: e.score,
        })
        .collect())
}

impl MaskedLanguageModel for RemoteMaskedLm {
    fn top_tokens(&self, query: &MaskedQuery<'_>, top_n: usize) -> Result<Vec<MaskedPrediction>> {
        let body = request_body(query, top_n)?;
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request.send()?;
        if !resp.status().is_success() {
            let status = resp.status();
            let msg = resp.text()?;
            return Err(Error::Model(format!("{status}: {msg}")));
        }
        parse_response(&resp.text()?)
    }
}
