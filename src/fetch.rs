use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::RawPhenotypeRecord;
use crate::error::IngressError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BioIndexEndpoint {
    pub base_url: String,
    pub index: String,
    pub query: String,
    pub timeout_secs: u64,
}

impl Default for BioIndexEndpoint {
    fn default() -> Self {
        Self {
            base_url: "https://bioindex-dev.hugeamp.org".to_string(),
            index: "pigean-phenotypes".to_string(),
            query: "1".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WireRecord {
    phenotype: String,
    #[serde(default)]
    phenotype_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WirePage {
    #[serde(default)]
    data: Vec<WireRecord>,
    #[serde(default)]
    continuation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub data: Vec<RawPhenotypeRecord>,
    pub continuation: Option<String>,
}

impl Page {
    pub fn new(data: Vec<RawPhenotypeRecord>, continuation: Option<&str>) -> Self {
        Self {
            data,
            continuation: continuation.map(str::to_string),
        }
    }

    pub fn next_token(&self) -> Option<&str> {
        self.continuation.as_deref().filter(|token| !token.is_empty())
    }
}

impl From<WirePage> for Page {
    fn from(page: WirePage) -> Self {
        Self {
            data: page
                .data
                .into_iter()
                .map(|record| RawPhenotypeRecord {
                    phenotype_key: record.phenotype,
                    phenotype_display_name: record.phenotype_name.unwrap_or_default(),
                })
                .collect(),
            continuation: page.continuation,
        }
    }
}

pub fn parse_page(body: &[u8]) -> Result<Page, IngressError> {
    let page: WirePage =
        serde_json::from_slice(body).map_err(|err| IngressError::FetchDecode(err.to_string()))?;
    Ok(page.into())
}

pub trait PageSource: Send + Sync {
    fn first_page(&self) -> Result<Page, IngressError>;
    fn next_page(&self, token: &str) -> Result<Page, IngressError>;
}

/// Follows continuation tokens until the service stops returning one.
pub fn fetch_all<P: PageSource + ?Sized>(
    source: &P,
    mut on_page: impl FnMut(usize, usize),
) -> Result<Vec<RawPhenotypeRecord>, IngressError> {
    let mut page = source.first_page()?;
    let mut records = Vec::new();
    let mut pages = 0usize;
    loop {
        pages += 1;
        let next = page.next_token().map(str::to_string);
        records.extend(page.data);
        on_page(pages, records.len());
        let Some(token) = next else {
            break;
        };
        debug!(page = pages, "following continuation token");
        page = source.next_page(&token)?;
        if page.next_token() == Some(token.as_str()) {
            return Err(IngressError::FetchDecode(format!(
                "continuation token {token} returned itself"
            )));
        }
    }
    Ok(records)
}

#[derive(Clone)]
pub struct BioIndexHttpClient {
    client: Client,
    endpoint: BioIndexEndpoint,
}

impl BioIndexHttpClient {
    pub fn new(endpoint: BioIndexEndpoint) -> Result<Self, IngressError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kg-ingress/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| IngressError::FetchHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()
            .map_err(|err| IngressError::FetchHttp(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn query_url(&self) -> String {
        format!(
            "{}/api/bio/query/{}",
            self.endpoint.base_url.trim_end_matches('/'),
            self.endpoint.index
        )
    }

    pub fn continuation_url(&self) -> String {
        format!(
            "{}/api/bio/cont",
            self.endpoint.base_url.trim_end_matches('/')
        )
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<reqwest::blocking::Response, IngressError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 250;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        attempt += 1;
                        std::thread::sleep(Duration::from_millis(BASE_DELAY_MS * attempt as u64));
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        attempt += 1;
                        std::thread::sleep(Duration::from_millis(BASE_DELAY_MS * attempt as u64));
                        continue;
                    }
                    return Err(IngressError::FetchHttp(err.to_string()));
                }
            }
        }
    }

    fn read_page(response: reqwest::blocking::Response) -> Result<Page, IngressError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "BioIndex request failed".to_string());
            return Err(IngressError::FetchStatus { status, message });
        }
        let body = response
            .bytes()
            .map_err(|err| IngressError::FetchHttp(err.to_string()))?;
        parse_page(&body)
    }
}

impl PageSource for BioIndexHttpClient {
    fn first_page(&self) -> Result<Page, IngressError> {
        let url = self.query_url();
        let response = self.send_with_retries(|| {
            self.client
                .get(&url)
                .query(&[("q", self.endpoint.query.as_str())])
        })?;
        Self::read_page(response)
    }

    fn next_page(&self, token: &str) -> Result<Page, IngressError> {
        let url = self.continuation_url();
        let response =
            self.send_with_retries(|| self.client.get(&url).query(&[("token", token)]))?;
        Self::read_page(response)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
