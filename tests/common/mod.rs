//! In-memory transport that replays canned responses and records requests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use sweetbird::sweetistics::transport::{ApiRequest, ApiResponse, Body, Transport};
use sweetbird::{ClientError, SweetisticsClient};

pub const API_KEY: &str = "test-key";

#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<Result<ApiResponse, ClientError>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_text(&self, status: u16, body: &str) -> &Self {
        self.push(Ok(ApiResponse {
            status,
            body: Body::Text(body.to_string()),
        }))
    }

    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond_text(status, &body.to_string())
    }

    pub fn respond_parsed(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(ApiResponse {
            status,
            body: Body::Json(body),
        }))
    }

    pub fn fail(&self, error: ClientError) -> &Self {
        self.push(Err(error))
    }

    fn push(&self, response: Result<ApiResponse, ClientError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("no request was sent")
    }

    pub fn client(&self) -> SweetisticsClient {
        SweetisticsClient::with_transport(
            API_KEY,
            Some("bird-tests".to_string()),
            Box::new(self.clone()),
        )
        .unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no canned response left")
    }
}
