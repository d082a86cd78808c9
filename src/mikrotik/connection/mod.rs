// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Low-level RouterOS API connection handling

mod auth;
pub(crate) mod protocol;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::DeviceError;
use crate::mikrotik::types::{Params, Reply};
use protocol::{attributes, encode_sentence, read_sentence};

/// One authenticated RouterOS API session over TCP
///
/// Timeouts are not applied here; the connection manager and the command
/// executor own both timers.
pub struct RouterOsConnection {
    stream: TcpStream,
    in_flight: bool,
}

impl RouterOsConnection {
    pub(crate) async fn connect(addr: &str) -> Result<Self, DeviceError> {
        tracing::trace!("Attempting TCP connection to: {}", addr);
        let stream = TcpStream::connect(addr).await?;
        tracing::trace!("TCP connection established to: {}", addr);
        Ok(Self {
            stream,
            in_flight: false,
        })
    }

    pub(crate) async fn command(&mut self, path: &str, params: &Params) -> Reply {
        let args = params.to_words();
        let mut words: Vec<String> = Vec::with_capacity(1 + args.len());
        words.push(path.to_string());
        words.extend(args);
        match self.raw_command(words).await {
            Ok(reply) => reply,
            Err(e) => Reply::Error(e.to_string()),
        }
    }

    async fn raw_command(&mut self, words: Vec<String>) -> Result<Reply, DeviceError> {
        tracing::trace!("Sending command: {}", words.first().map_or("", String::as_str));
        self.stream.write_all(&encode_sentence(&words)).await?;
        self.in_flight = true;
        let reply = self.read_reply().await?;
        self.in_flight = false;
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<Reply, DeviceError> {
        let mut records = Vec::new();
        let mut trap: Option<String> = None;
        loop {
            let sentence = read_sentence(&mut self.stream).await?;
            let Some((head, rest)) = sentence.split_first() else {
                continue;
            };
            match head.as_str() {
                "!re" => records.push(attributes(rest)),
                "!trap" => {
                    tracing::trace!("Trap received, reading trap details");
                    let details = attributes(rest);
                    trap = Some(
                        details
                            .get("message")
                            .cloned()
                            .unwrap_or_else(|| "trap".to_string()),
                    );
                }
                "!done" => {
                    // !done may carry attributes, e.g. `=ret=` of an add
                    let done = attributes(rest);
                    if !done.is_empty() {
                        records.push(done);
                    }
                    tracing::trace!("Command complete, {} sentences received", records.len());
                    return Ok(match trap {
                        Some(message) => Reply::Trap(message),
                        None => Reply::Done(records),
                    });
                }
                "!fatal" => {
                    let reason = rest
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "fatal".to_string());
                    return Ok(Reply::Error(reason));
                }
                other => tracing::trace!("Ignoring reply word: {}", other),
            }
        }
    }

    /// Abandons an unanswered command
    pub(crate) async fn cancel(&mut self) -> Result<(), DeviceError> {
        if !self.in_flight {
            return Ok(());
        }
        tracing::trace!("Cancelling in-flight command");
        self.stream
            .write_all(&encode_sentence(&["/cancel".to_string()]))
            .await?;
        self.in_flight = false;
        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), DeviceError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
