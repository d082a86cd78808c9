// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS wire protocol helpers

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::mikrotik::types::Record;

// RouterOS protocol length encoding - intentional truncation is part of the wire format
#[allow(clippy::cast_possible_truncation)]
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        vec![((len >> 8) as u8) | 0x80, (len & 0xFF) as u8]
    } else if len < 0x0020_0000 {
        vec![
            ((len >> 16) as u8) | 0xC0,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else if len < 0x1000_0000 {
        vec![
            ((len >> 24) as u8) | 0xE0,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else {
        vec![
            0xF0,
            ((len >> 24) & 0xFF) as u8,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    }
}

/// Encodes a full sentence: every word length-prefixed, then the empty terminator
pub fn encode_sentence(words: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for word in words {
        out.extend_from_slice(&encode_length(word.len()));
        out.extend_from_slice(word.as_bytes());
    }
    out.push(0);
    out
}

pub async fn read_length<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<usize> {
    let first = stream.read_u8().await?;
    let len = if first & 0x80 == 0 {
        first as usize
    } else if first & 0xC0 == 0x80 {
        let second = stream.read_u8().await?;
        (((first & 0x3F) as usize) << 8) + second as usize
    } else if first & 0xE0 == 0xC0 {
        let second = stream.read_u8().await?;
        let third = stream.read_u8().await?;
        (((first & 0x1F) as usize) << 16) + ((second as usize) << 8) + third as usize
    } else if first & 0xF0 == 0xE0 {
        let second = stream.read_u8().await?;
        let third = stream.read_u8().await?;
        let fourth = stream.read_u8().await?;
        (((first & 0x0F) as usize) << 24)
            + ((second as usize) << 16)
            + ((third as usize) << 8)
            + fourth as usize
    } else {
        // five byte length, control byte carries no data
        let b2 = stream.read_u8().await?;
        let b3 = stream.read_u8().await?;
        let b4 = stream.read_u8().await?;
        let b5 = stream.read_u8().await?;
        (b2 as usize) << 24 | (b3 as usize) << 16 | (b4 as usize) << 8 | b5 as usize
    };
    Ok(len)
}

pub async fn read_word<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<String> {
    let len = read_length(stream).await?;
    if len == 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into())
}

/// Reads words up to the empty terminator; empty sentences are skipped
pub async fn read_sentence<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<Vec<String>> {
    let mut words = Vec::new();
    loop {
        let word = read_word(stream).await?;
        if word.is_empty() {
            if words.is_empty() {
                continue;
            }
            return Ok(words);
        }
        tracing::trace!("Received word: {}", word);
        words.push(word);
    }
}

/// Collects `=key=value` attribute words into a record; other words are ignored
pub(crate) fn attributes(words: &[String]) -> Record {
    words
        .iter()
        .filter_map(|w| w.strip_prefix('='))
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
