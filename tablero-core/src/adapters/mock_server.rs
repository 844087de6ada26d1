//! Mock board API server for testing
//!
//! Serves the demo board over plain HTTP on a random local port:
//! - GET /boards/my-board returns { data: Board }
//! - POST /boards/columns, PUT /boards/columns/{id} (rules or details),
//!   DELETE /boards/{board}/columns/{id} return { data: BoardColumn }
//! - GET, PUT /boards/cards/{id} and POST /boards/cards return { data: Card }
//! - POST, DELETE /boards/cards/{id}/customer return { data: Card }
//! - POST /boards/comments, DELETE /boards/comments/{id} return { data: Comment }
//!
//! Requests need an `Authorization: Bearer valid_...` header. Card writes
//! do not record history.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::demo::generate_demo_board;
use crate::domain::{
    Board, BoardColumn, Card, CardCustomer, ColumnDetailsDto, ColumnRules, Comment, CreateCardDto,
    CreateColumnDto, CreateColumnRulesDto, CreateCommentDto, UpdateCardDto,
};

/// Configuration for mock behaviour
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Answer every write with 422
    pub reject_updates: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

#[derive(Deserialize)]
struct UpdateColumnBody {
    rules: Option<CreateColumnRulesDto>,
    #[serde(flatten)]
    details: ColumnDetailsDto,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkCustomerBody {
    customer_id: String,
}

struct SharedState {
    board: Mutex<Board>,
    last_body: Mutex<Option<JsonValue>>,
    next_id: AtomicUsize,
}

/// Mock board API server
pub struct MockBoardServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<SharedState>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockBoardServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(SharedState {
            board: Mutex::new(generate_demo_board()),
            last_body: Mutex::new(None),
            next_id: AtomicUsize::new(1),
        });

        // Non-blocking accept so stop() can end the loop
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let st = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &st));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// JSON body of the most recent request that had one
    pub fn last_body(&self) -> Option<JsonValue> {
        self.state.last_body.lock().ok().and_then(|b| b.clone())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockBoardServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read headers, then as many body bytes as Content-Length announces
fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    Some((head, data[header_end..].to_vec()))
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &SharedState) {
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"error": "Invalid request"}"#);
        return;
    }
    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or(parts[1]);

    let has_valid_auth = head.to_lowercase().contains("authorization: bearer valid_");
    if !has_valid_auth {
        send_response(&mut stream, 401, "Unauthorized", r#"{"error": "Invalid token"}"#);
        return;
    }

    if !body.is_empty() {
        if let Ok(mut last) = state.last_body.lock() {
            *last = serde_json::from_slice(&body).ok();
        }
    }

    if method != "GET" && config.reject_updates {
        send_response(&mut stream, 422, "Unprocessable Entity", r#"{"error": "Rejected"}"#);
        return;
    }

    let Ok(mut board) = state.board.lock() else {
        send_response(&mut stream, 500, "Internal Server Error", r#"{"error": "poisoned"}"#);
        return;
    };

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let response = match (method, segments.as_slice()) {
        ("GET", ["boards", "my-board"]) => Some(to_json(&*board)),
        ("POST", ["boards", "columns"]) => parse::<CreateColumnDto>(&body).map(|dto| {
            let column = BoardColumn {
                id: format!("col-mock-{}", state.next_id.fetch_add(1, Ordering::SeqCst)),
                name: dto.name,
                cards: Vec::new(),
                order: board.columns.len() as i32,
                rules: None,
                description: dto.description,
                color: dto.color,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            board.columns.push(column.clone());
            to_json(&column)
        }),
        ("PUT", ["boards", "columns", column_id]) => {
            let update = parse::<UpdateColumnBody>(&body);
            let column = board.columns.iter_mut().find(|c| c.id == *column_id);
            match (update, column) {
                (Some(update), Some(column)) => {
                    if let Some(rules) = update.rules {
                        column.rules = Some(ColumnRules::from(rules));
                    }
                    if let Some(name) = update.details.name {
                        column.name = name;
                    }
                    if let Some(description) = update.details.description {
                        column.description = Some(description);
                    }
                    if let Some(color) = update.details.color {
                        column.color = Some(color);
                    }
                    Some(to_json(&*column))
                }
                _ => None,
            }
        }
        ("DELETE", ["boards", board_id, "columns", column_id]) if *board_id == board.id => board
            .columns
            .iter()
            .position(|c| c.id == *column_id)
            .map(|i| to_json(&board.columns.remove(i))),
        ("GET", ["boards", "cards", card_id]) => find_card(&mut board, card_id).map(|c| to_json(&*c)),
        ("POST", ["boards", "cards"]) => parse::<CreateCardDto>(&body).and_then(|dto| {
            let id = format!("card-mock-{}", state.next_id.fetch_add(1, Ordering::SeqCst));
            let column = board.columns.iter_mut().find(|c| c.id == dto.column_id)?;
            let card = Card {
                id,
                name: dto.name,
                customer: None,
                due_date: Some(dto.due_date),
                priority: None,
                labels: Vec::new(),
                description: Some(dto.description).filter(|d| !d.is_empty()),
                history: Vec::new(),
                comments: Vec::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            column.cards.push(card.clone());
            Some(to_json(&card))
        }),
        ("PUT", ["boards", "cards", card_id]) => {
            parse::<UpdateCardDto>(&body).and_then(|dto| update_card(&mut board, card_id, dto))
        }
        ("POST", ["boards", "cards", card_id, "customer"]) => {
            parse::<LinkCustomerBody>(&body).and_then(|link| {
                let card = find_card(&mut board, card_id)?;
                card.customer = Some(CardCustomer {
                    id: Some(link.customer_id),
                    name: None,
                });
                Some(to_json(&*card))
            })
        }
        ("DELETE", ["boards", "cards", card_id, "customer"]) => {
            find_card(&mut board, card_id).map(|card| {
                card.customer = None;
                to_json(&*card)
            })
        }
        ("POST", ["boards", "comments"]) => parse::<CreateCommentDto>(&body).and_then(|dto| {
            let comment = Comment {
                id: format!("comment-mock-{}", state.next_id.fetch_add(1, Ordering::SeqCst)),
                content: dto.content,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            find_card(&mut board, &dto.card_id)?.comments.push(comment.clone());
            Some(to_json(&comment))
        }),
        ("DELETE", ["boards", "comments", comment_id]) => board
            .columns
            .iter_mut()
            .flat_map(|c| c.cards.iter_mut())
            .find_map(|card| {
                let i = card.comments.iter().position(|m| m.id == *comment_id)?;
                Some(to_json(&card.comments.remove(i)))
            }),
        _ => None,
    };

    match response {
        Some(data) => send_data(&mut stream, data),
        None => send_response(&mut stream, 404, "Not Found", r#"{"error": "Not found"}"#),
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice(body).ok()
}

fn to_json<T: serde::Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value).unwrap_or_default()
}

fn find_card<'a>(board: &'a mut Board, card_id: &str) -> Option<&'a mut Card> {
    board
        .columns
        .iter_mut()
        .flat_map(|c| c.cards.iter_mut())
        .find(|c| c.id == card_id)
}

fn update_card(board: &mut Board, card_id: &str, dto: UpdateCardDto) -> Option<JsonValue> {
    let card = find_card(board, card_id)?;
    if let Some(name) = dto.name {
        card.name = name;
    }
    if let Some(description) = dto.description {
        card.description = Some(description);
    }
    if dto.due_date.is_some() {
        card.due_date = dto.due_date;
    }
    if dto.priority.is_some() {
        card.priority = dto.priority;
    }
    if let Some(labels) = dto.labels {
        card.labels = labels;
    }
    if let Some(customer_id) = dto.customer_id {
        card.customer = Some(CardCustomer {
            id: Some(customer_id),
            name: None,
        });
    }

    let Some(target) = dto.column_id else {
        return Some(to_json(&*card));
    };
    if !board.columns.iter().any(|c| c.id == target) {
        return None;
    }
    let mut moved = None;
    for column in board.columns.iter_mut() {
        if let Some(i) = column.cards.iter().position(|c| c.id == card_id) {
            moved = Some(column.cards.remove(i));
        }
    }
    let moved = moved?;
    let json = to_json(&moved);
    board.columns.iter_mut().find(|c| c.id == target)?.cards.push(moved);
    Some(json)
}

fn send_data(stream: &mut TcpStream, data: JsonValue) {
    let body = json!({ "data": data }).to_string();
    send_response(stream, 200, "OK", &body);
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
