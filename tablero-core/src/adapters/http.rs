//! Board REST API client
//!
//! Talks to the board endpoints of the accounting API. Every response body
//! is wrapped as `{ "data": ... }`.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Board, BoardColumn, Card, ColumnDetailsDto, Comment, CreateCardDto, CreateColumnDto,
    CreateColumnRulesDto, CreateCommentDto, UpdateCardDto, UpdateColumnDto,
};
use crate::ports::BoardGateway;

const BOARDS_PATH: &str = "boards";

/// Response envelope used by the API
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkCustomerBody<'a> {
    customer_id: &'a str,
}

/// Board API client
#[derive(Debug)]
pub struct HttpBoardGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBoardGateway {
    /// Create a client for the API at `base_url`
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid API URL '{}': {}", base_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "API URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        // Url::join replaces the last segment unless the path ends with '/'
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_url,
            config.api_token.as_deref(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{}/{}", BOARDS_PATH, path))
            .map_err(|e| Error::config(format!("Invalid request path '{}': {}", path, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request).send()?;
        let response = check_status(response)?;
        let envelope: DataEnvelope<T> = response.json()?;
        Ok(envelope.data)
    }
}

/// Map non-success statuses to errors
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }
    let body = response.text().unwrap_or_default();
    Err(Error::Http {
        status: status.as_u16(),
        body,
    })
}

impl BoardGateway for HttpBoardGateway {
    fn name(&self) -> &str {
        "http"
    }

    fn find_my_board(&self) -> Result<Board> {
        let url = self.url("my-board")?;
        self.send(self.client.get(url))
    }

    fn update_column_rules(&self, column_id: &str, rules: &CreateColumnRulesDto) -> Result<BoardColumn> {
        let url = self.url(&format!("columns/{}", column_id))?;
        let body = UpdateColumnDto { rules };
        self.send(self.client.put(url).json(&body))
    }

    fn get_card(&self, card_id: &str) -> Result<Card> {
        let url = self.url(&format!("cards/{}", card_id))?;
        self.send(self.client.get(url))
    }

    fn create_column(&self, column: &CreateColumnDto) -> Result<BoardColumn> {
        let url = self.url("columns")?;
        self.send(self.client.post(url).json(column))
    }

    fn update_column(&self, column_id: &str, details: &ColumnDetailsDto) -> Result<BoardColumn> {
        let url = self.url(&format!("columns/{}", column_id))?;
        self.send(self.client.put(url).json(details))
    }

    fn delete_column(&self, board_id: &str, column_id: &str) -> Result<BoardColumn> {
        let url = self.url(&format!("{}/columns/{}", board_id, column_id))?;
        self.send(self.client.delete(url))
    }

    fn create_card(&self, card: &CreateCardDto) -> Result<Card> {
        let url = self.url("cards")?;
        self.send(self.client.post(url).json(card))
    }

    fn update_card(&self, card_id: &str, changes: &UpdateCardDto) -> Result<Card> {
        let url = self.url(&format!("cards/{}", card_id))?;
        self.send(self.client.put(url).json(changes))
    }

    fn add_comment(&self, comment: &CreateCommentDto) -> Result<Comment> {
        let url = self.url("comments")?;
        self.send(self.client.post(url).json(comment))
    }

    fn delete_comment(&self, comment_id: &str) -> Result<Comment> {
        let url = self.url(&format!("comments/{}", comment_id))?;
        self.send(self.client.delete(url))
    }

    fn link_customer(&self, card_id: &str, customer_id: &str) -> Result<Card> {
        let url = self.url(&format!("cards/{}/customer", card_id))?;
        self.send(self.client.post(url).json(&LinkCustomerBody { customer_id }))
    }

    fn unlink_customer(&self, card_id: &str) -> Result<Card> {
        let url = self.url(&format!("cards/{}/customer", card_id))?;
        self.send(self.client.delete(url))
    }
}
