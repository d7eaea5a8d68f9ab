use fit_types::{ObjectId, HASH_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{
    Command, PushStatus, Request, MAX_BRANCH_LEN, MAX_STATUS_MESSAGE_LEN, PROTOCOL_VERSION,
};

/// Encoder/decoder for request headers.
pub struct FitCodec;

impl FitCodec {
    /// Encode a request: `version | command | args`.
    pub fn encode(req: &Request) -> ProtocolResult<Vec<u8>> {
        let mut buf = vec![PROTOCOL_VERSION, req.command().tag()];
        match req {
            Request::SendObjects => {}
            Request::RequestObjects { branch } => encode_branch(&mut buf, branch)?,
            Request::PushBranch { branch, tip } => {
                encode_branch(&mut buf, branch)?;
                buf.extend_from_slice(tip.as_bytes());
            }
        }
        Ok(buf)
    }

    /// Write an encoded request to `writer`.
    pub async fn write_request<W>(writer: &mut W, req: &Request) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&Self::encode(req)?).await?;
        Ok(())
    }

    /// Read a request header from `reader`, leaving any pack payload unread.
    pub async fn read_request<R>(reader: &mut R) -> ProtocolResult<Request>
    where
        R: AsyncRead + Unpin,
    {
        let mut handshake = [0u8; 2];
        reader.read_exact(&mut handshake).await?;
        let [version, tag] = handshake;
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                local: PROTOCOL_VERSION,
                remote: version,
            });
        }
        let command = Command::from_tag(tag).ok_or(ProtocolError::UnknownCommand(tag))?;
        debug!(command = command.name(), "read handshake");

        Ok(match command {
            Command::SendObjects => Request::SendObjects,
            Command::RequestObjects => Request::RequestObjects {
                branch: read_branch(reader).await?,
            },
            Command::PushBranch => {
                let branch = read_branch(reader).await?;
                let mut tip = [0u8; HASH_LEN];
                reader.read_exact(&mut tip).await?;
                Request::PushBranch {
                    branch,
                    tip: ObjectId::from_hash(tip),
                }
            }
        })
    }
}

impl FitCodec {
    /// Encode a push status: `status:u8 | len:u32 | message`. Messages
    /// longer than [`MAX_STATUS_MESSAGE_LEN`] are cut at a char boundary.
    pub fn encode_status(status: &PushStatus) -> Vec<u8> {
        let message = match status {
            PushStatus::Accepted => "",
            PushStatus::Rejected(reason) => truncate(reason, MAX_STATUS_MESSAGE_LEN),
        };
        let mut buf = vec![status.tag()];
        buf.extend_from_slice(&(message.len() as u32).to_be_bytes());
        buf.extend_from_slice(message.as_bytes());
        buf
    }

    /// Decode a complete push status reply.
    pub fn decode_status(bytes: &[u8]) -> ProtocolResult<PushStatus> {
        let malformed = |what: &str| ProtocolError::Malformed(format!("push status: {what}"));
        if bytes.len() < 5 {
            return Err(malformed("truncated header"));
        }
        let tag = bytes[0];
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[1..5]);
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_STATUS_MESSAGE_LEN {
            return Err(malformed("message too long"));
        }
        let message = &bytes[5..];
        if message.len() != len {
            return Err(malformed("message length mismatch"));
        }
        let message = std::str::from_utf8(message).map_err(|_| malformed("message is not UTF-8"))?;
        match tag {
            PushStatus::ACCEPTED_TAG => Ok(PushStatus::Accepted),
            PushStatus::REJECTED_TAG => Ok(PushStatus::Rejected(message.to_string())),
            other => Err(malformed(&format!("unknown status {other}"))),
        }
    }

    /// Write a push status and close the write half.
    pub async fn write_status<W>(writer: &mut W, status: &PushStatus) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&Self::encode_status(status)).await?;
        writer.flush().await?;
        writer.shutdown().await?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn encode_branch(buf: &mut Vec<u8>, branch: &str) -> ProtocolResult<()> {
    if branch.is_empty() || branch.len() > MAX_BRANCH_LEN {
        return Err(ProtocolError::Malformed(format!(
            "branch name must be 1..={MAX_BRANCH_LEN} bytes, got {}",
            branch.len()
        )));
    }
    buf.extend_from_slice(&(branch.len() as u32).to_be_bytes());
    buf.extend_from_slice(branch.as_bytes());
    Ok(())
}

async fn read_branch<R>(reader: &mut R) -> ProtocolResult<String>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len == 0 || len > MAX_BRANCH_LEN {
        return Err(ProtocolError::Malformed(format!(
            "branch length {len} outside 1..={MAX_BRANCH_LEN}"
        )));
    }
    let mut name = vec![0u8; len];
    reader.read_exact(&mut name).await?;
    String::from_utf8(name).map_err(|_| ProtocolError::Malformed("branch name is not UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn roundtrip(req: Request) {
        let bytes = FitCodec::encode(&req).unwrap();
        let mut reader = bytes.as_slice();
        let decoded = FitCodec::read_request(&mut reader).await.unwrap();
        assert_eq!(decoded, req);
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn requests_roundtrip() {
        roundtrip(Request::SendObjects).await;
        roundtrip(Request::RequestObjects {
            branch: "feature/x".into(),
        })
        .await;
        roundtrip(Request::PushBranch {
            branch: "main".into(),
            tip: ObjectId::digest(b"tip"),
        })
        .await;
    }

    #[test]
    fn wire_layout() {
        let bytes = FitCodec::encode(&Request::RequestObjects {
            branch: "main".into(),
        })
        .unwrap();
        assert_eq!(bytes, [1, 2, 0, 0, 0, 4, b'm', b'a', b'i', b'n']);
    }

    #[tokio::test]
    async fn version_mismatch() {
        let mut reader: &[u8] = &[9, 1];
        assert!(matches!(
            FitCodec::read_request(&mut reader).await,
            Err(ProtocolError::VersionMismatch { local: 1, remote: 9 })
        ));
    }

    #[tokio::test]
    async fn unknown_command() {
        let mut reader: &[u8] = &[1, 7];
        assert!(matches!(
            FitCodec::read_request(&mut reader).await,
            Err(ProtocolError::UnknownCommand(7))
        ));
    }

    #[tokio::test]
    async fn overlong_branch_rejected() {
        let mut bytes = vec![1, 2];
        bytes.extend_from_slice(&256u32.to_be_bytes());
        bytes.extend(std::iter::repeat(b'a').take(256));
        let mut reader = bytes.as_slice();
        assert!(matches!(
            FitCodec::read_request(&mut reader).await,
            Err(ProtocolError::Malformed(_))
        ));

        let long = "a".repeat(MAX_BRANCH_LEN + 1);
        assert!(FitCodec::encode(&Request::RequestObjects { branch: long }).is_err());
    }

    #[tokio::test]
    async fn truncated_request_is_io_error() {
        let mut reader: &[u8] = &[1, 3, 0, 0, 0, 4, b'm'];
        assert!(matches!(
            FitCodec::read_request(&mut reader).await,
            Err(ProtocolError::Io(_))
        ));
    }

    #[test]
    fn push_status_layout() {
        assert_eq!(FitCodec::encode_status(&PushStatus::Accepted), [0, 0, 0, 0, 0]);
        let rejected = FitCodec::encode_status(&PushStatus::Rejected("no".into()));
        assert_eq!(rejected, [1, 0, 0, 0, 2, b'n', b'o']);
        assert_eq!(
            FitCodec::decode_status(&rejected).unwrap(),
            PushStatus::Rejected("no".into())
        );
        assert!(FitCodec::decode_status(&[0, 0, 0, 0, 0]).unwrap().is_accepted());
    }

    #[test]
    fn bad_push_status_is_malformed() {
        let cases: [&[u8]; 4] = [&[], &[0, 0, 0], &[7, 0, 0, 0, 0], &[1, 0, 0, 0, 3, b'x']];
        for bytes in cases {
            assert!(matches!(
                FitCodec::decode_status(bytes),
                Err(ProtocolError::Malformed(_))
            ));
        }
    }

    #[test]
    fn long_status_message_is_cut_on_char_boundary() {
        let reason = "é".repeat(MAX_STATUS_MESSAGE_LEN);
        let bytes = FitCodec::encode_status(&PushStatus::Rejected(reason));
        match FitCodec::decode_status(&bytes).unwrap() {
            PushStatus::Rejected(message) => {
                assert!(message.len() <= MAX_STATUS_MESSAGE_LEN);
                assert!(message.chars().all(|c| c == 'é'));
            }
            PushStatus::Accepted => panic!("expected rejection"),
        }
    }
}
