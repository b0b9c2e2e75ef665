#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use device_gateway::{GatewayError, GatewayState, RealtimeStore, gateway_router};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// In-process stand-in for the realtime database: one JSON tree.
#[derive(Default)]
pub struct MemoryStore {
    root: Mutex<Value>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl MemoryStore {
    pub fn with_root(root: Value) -> Self {
        Self {
            root: Mutex::new(root),
        }
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Value, GatewayError> {
        let root = self.root.lock().unwrap();
        let mut node = &*root;
        for seg in segments(path) {
            match node.get(seg) {
                Some(child) => node = child,
                None => return Ok(Value::Null),
            }
        }
        Ok(node.clone())
    }

    async fn set(&self, path: &str, value: &Value) -> Result<(), GatewayError> {
        let mut root = self.root.lock().unwrap();
        let segs = segments(path);
        let Some((last, parents)) = segs.split_last() else {
            *root = value.clone();
            return Ok(());
        };
        let mut node = &mut *root;
        for seg in parents {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = node
                .as_object_mut()
                .unwrap()
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let obj = node.as_object_mut().unwrap();
        if value.is_null() {
            obj.remove(*last);
        } else {
            obj.insert(last.to_string(), value.clone());
        }
        Ok(())
    }
}

/// Store whose every call fails the way a rules rejection does.
pub struct DenyingStore;

#[async_trait]
impl RealtimeStore for DenyingStore {
    async fn get(&self, _path: &str) -> Result<Value, GatewayError> {
        Err(GatewayError::Backend("Permission denied".to_string()))
    }

    async fn set(&self, _path: &str, _value: &Value) -> Result<(), GatewayError> {
        Err(GatewayError::Backend("Permission denied".to_string()))
    }
}

pub fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "device-gateway-{tag}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

pub fn app_with(store: Option<Arc<dyn RealtimeStore>>) -> Router {
    gateway_router(GatewayState::new(store), &temp_dir("static"))
}

pub async fn send(app: &Router, req: Request<Body>) -> (Response<Body>, Value) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let (parts, body) = resp.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .expect("failed to read response body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (Response::from_parts(parts, Body::empty()), json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn post_json(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .expect("failed to build request")
}
