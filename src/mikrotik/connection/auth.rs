// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS authentication

use md5::compute as md5_compute;

use super::RouterOsConnection;
use crate::error::DeviceError;
use crate::mikrotik::types::Reply;

impl RouterOsConnection {
    pub(crate) async fn login(&mut self, username: &str, password: &str) -> Result<(), DeviceError> {
        tracing::trace!("Attempting login for user: {}", username);
        // Try new login method first (RouterOS 6.43+)
        let reply = self
            .raw_command(vec![
                "/login".to_string(),
                format!("=name={username}"),
                format!("=password={password}"),
            ])
            .await?;

        let sentences = match reply {
            Reply::Done(sentences) => sentences,
            Reply::Trap(msg) => return Err(DeviceError::Auth(msg)),
            Reply::Error(reason) => return Err(DeviceError::Transport(reason)),
        };

        // Pre-6.43 devices answer the plaintext attempt with a challenge
        let Some(challenge_hex) = sentences.iter().find_map(|s| s.get("ret")).cloned() else {
            for s in &sentences {
                if let Some(msg) = s.get("message") {
                    if msg.contains("failure") || msg.contains("invalid") {
                        tracing::trace!("Login failed with message: {}", msg);
                        return Err(DeviceError::Auth(msg.clone()));
                    }
                    tracing::debug!("Login message: {}", msg);
                }
            }
            tracing::debug!("Login successful (new method)");
            return Ok(());
        };

        tracing::debug!("Challenge received, falling back to legacy login");
        let response = challenge_response(password, &challenge_hex)?;

        match self
            .raw_command(vec![
                "/login".to_string(),
                format!("=name={username}"),
                format!("=response={response}"),
            ])
            .await?
        {
            Reply::Done(_) => {
                tracing::debug!("Login successful (legacy method)");
                Ok(())
            }
            Reply::Trap(msg) => Err(DeviceError::Auth(msg)),
            Reply::Error(reason) => Err(DeviceError::Transport(reason)),
        }
    }
}

/// `"00"` + hex(MD5(0x00 + password + challenge))
fn challenge_response(password: &str, challenge_hex: &str) -> Result<String, DeviceError> {
    let challenge = hex::decode(challenge_hex)
        .map_err(|e| DeviceError::Auth(format!("invalid login challenge: {e}")))?;

    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(0u8);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&challenge);
    let digest = md5_compute(&data);

    let mut response = String::from("00");
    response.push_str(&hex::encode(digest.0));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_response_format() {
        let response = challenge_response("secret", "00112233445566778899aabbccddeeff").unwrap();
        assert!(response.starts_with("00"));
        assert_eq!(response.len(), 2 + 32);
        assert!(response[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_challenge_response_is_deterministic() {
        let a = challenge_response("pw", "abcdef").unwrap();
        let b = challenge_response("pw", "abcdef").unwrap();
        let c = challenge_response("other", "abcdef").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_challenge_response_rejects_bad_hex() {
        assert!(matches!(
            challenge_response("pw", "zz"),
            Err(DeviceError::Auth(_))
        ));
    }
}
