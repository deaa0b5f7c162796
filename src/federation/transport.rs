/*
 *  Copyright 2026 Sluice Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Unix socket transport: a single connection multiplexes concurrent
//! requests by `id`, newline-delimited JSONL framing via
//! `tokio_util::codec::LinesCodec`.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::warn;

use super::rpc::{RpcRequest, RpcResponse};
use crate::error::TransportError;

fn codec_err(e: LinesCodecError) -> TransportError {
    TransportError::Io(io::Error::new(io::ErrorKind::Other, e))
}

/// Implemented by whatever sits behind the socket (the federation boundary
/// dispatcher: `describe`/`schema`/`engine`/`sync`/`health`/`start`/`stop`).
#[async_trait]
pub trait RpcDispatcher: Send + Sync {
    async fn dispatch(&self, request: RpcRequest) -> RpcResponse;
}

/// Accepts connections on `path` and hands each incoming request to
/// `dispatcher`, writing its response back. Runs until the listener errors;
/// callers typically `tokio::spawn` this.
pub async fn serve(path: &str, dispatcher: Arc<dyn RpcDispatcher>) -> Result<(), TransportError> {
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path)?;
    loop {
        let (stream, _) = listener.accept().await?;
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, dispatcher).await {
                warn!(error = %e, "rpc connection handler exited");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, dispatcher: Arc<dyn RpcDispatcher>) -> Result<(), TransportError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, LinesCodec::new());
    let writer = Arc::new(AsyncMutex::new(FramedWrite::new(write_half, LinesCodec::new())));

    let mut in_flight = Vec::new();
    while let Some(line) = reader.next().await {
        let line = line.map_err(codec_err)?;
        let request: RpcRequest = serde_json::from_str(&line)?;
        let dispatcher = dispatcher.clone();
        let writer = writer.clone();
        in_flight.push(tokio::spawn(async move {
            let response = dispatcher.dispatch(request).await;
            if let Ok(line) = serde_json::to_string(&response) {
                let mut w = writer.lock().await;
                let _ = w.send(line).await;
            }
        }));
    }
    for task in in_flight {
        let _ = task.await;
    }
    Ok(())
}

/// Client side of the multiplexed connection: `call` may be invoked
/// concurrently from many tasks; a single background reader demultiplexes
/// responses back to their caller by request id.
pub struct RpcClient {
    writer: AsyncMutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
    pending: Arc<SyncMutex<HashMap<String, oneshot::Sender<RpcResponse>>>>,
}

impl RpcClient {
    pub async fn connect(path: &str) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path).await?;
        let (read_half, write_half): (OwnedReadHalf, OwnedWriteHalf) = stream.into_split();
        let reader = FramedRead::new(read_half, LinesCodec::new());
        let writer = AsyncMutex::new(FramedWrite::new(write_half, LinesCodec::new()));
        let pending: Arc<SyncMutex<HashMap<String, oneshot::Sender<RpcResponse>>>> =
            Arc::new(SyncMutex::new(HashMap::new()));

        spawn_reader(reader, pending.clone());

        Ok(Self { writer, pending })
    }

    pub async fn call(&self, request: RpcRequest) -> Result<RpcResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request.id.clone(), tx);
        let id = request.id.clone();
        let line = serde_json::to_string(&request)?;
        {
            let mut w = self.writer.lock().await;
            w.send(line).await.map_err(codec_err)?;
        }
        rx.await.map_err(|_| TransportError::ConnectionClosed(id))
    }
}

fn spawn_reader(
    mut reader: FramedRead<OwnedReadHalf, LinesCodec>,
    pending: Arc<SyncMutex<HashMap<String, oneshot::Sender<RpcResponse>>>>,
) {
    tokio::spawn(async move {
        while let Some(Ok(line)) = reader.next().await {
            let Ok(response) = serde_json::from_str::<RpcResponse>(&line) else {
                continue;
            };
            if let Some(tx) = pending.lock().remove(response.id()) {
                let _ = tx.send(response);
            }
        }
    });
}
