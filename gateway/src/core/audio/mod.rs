//! Audio demo replay.
//!
//! Replays a local transcript and a raw PCM file (16-bit little-endian mono)
//! as provider-shaped audio deltas: one transcript frame, then one frame per
//! fixed-duration PCM chunk. All frames of one response share an `audio_id`.

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use futures::{StreamExt, future};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AudioDemoConfig;
use crate::core::upstream::{EventStream, StreamEvent};

/// Bytes per 16-bit PCM sample
const BYTES_PER_SAMPLE: u64 = 2;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid chunk size for {sample_rate} Hz and {duration_ms} ms")]
    InvalidChunkSize { sample_rate: u32, duration_ms: u32 },

    #[error("PCM chunk size must be non-zero")]
    ZeroChunkSize,
}

/// Bytes in one chunk of `duration_ms` at `sample_rate`
///
/// Zero when the chunk would not hold a whole byte or the size overflows; both
/// are rejected as invalid.
pub fn chunk_size_bytes(sample_rate: u32, duration_ms: u32) -> usize {
    u64::from(sample_rate)
        .checked_mul(BYTES_PER_SAMPLE)
        .and_then(|bytes| bytes.checked_mul(u64::from(duration_ms)))
        .and_then(|bytes| usize::try_from(bytes / 1000).ok())
        .unwrap_or(0)
}

/// Split `pcm` into `chunk_size` pieces; the last one may be shorter
pub fn split_pcm(pcm: Bytes, chunk_size: usize) -> Result<Vec<Bytes>, AudioError> {
    if chunk_size == 0 {
        return Err(AudioError::ZeroChunkSize);
    }

    let mut chunks = Vec::with_capacity(pcm.len().div_ceil(chunk_size));
    let mut offset = 0;
    while offset < pcm.len() {
        let end = (offset + chunk_size).min(pcm.len());
        chunks.push(pcm.slice(offset..end));
        offset = end;
    }
    Ok(chunks)
}

/// Transcript and PCM chunks loaded for one response
#[derive(Debug, Clone)]
pub struct AudioDemoAssets {
    pub transcript: String,
    pub chunks: Vec<Bytes>,
}

impl AudioDemoAssets {
    /// Read both files and chunk the PCM data
    pub async fn load(config: &AudioDemoConfig) -> Result<Self, AudioError> {
        let chunk_size = chunk_size_bytes(config.sample_rate, config.chunk_duration_ms);
        if chunk_size == 0 {
            return Err(AudioError::InvalidChunkSize {
                sample_rate: config.sample_rate,
                duration_ms: config.chunk_duration_ms,
            });
        }

        let transcript = read_text(&config.text_path).await?;
        let pcm = read_bytes(&config.pcm_path).await?;
        let chunks = split_pcm(pcm, chunk_size)?;

        debug!(
            pcm_path = %config.pcm_path.display(),
            chunk_size,
            chunks = chunks.len(),
            "Loaded audio demo assets"
        );

        Ok(Self { transcript, chunks })
    }

    /// Transcript frame followed by one frame per chunk, sharing one
    /// `audio_id`. Each chunk is encoded only when the relay pulls it.
    pub fn into_event_stream(self) -> EventStream {
        let audio_id = new_id();
        let transcript = transcript_frame(&audio_id, &self.transcript);

        let chunks = futures::stream::iter(self.chunks)
            .map(move |chunk| Ok(StreamEvent::new(audio_chunk_frame(&audio_id, &chunk))));

        Box::pin(futures::stream::once(future::ready(Ok(StreamEvent::new(transcript)))).chain(chunks))
    }
}

async fn read_text(path: &Path) -> Result<String, AudioError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AudioError::Read {
            path: path.to_path_buf(),
            source,
        })
}

async fn read_bytes(path: &Path) -> Result<Bytes, AudioError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|source| AudioError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn audio_delta(audio: Value) -> Value {
    json!({
        "id": new_id(),
        "choices": [{
            "index": 0,
            "delta": {"audio": audio},
            "finish_reason": null
        }]
    })
}

pub fn transcript_frame(audio_id: &str, transcript: &str) -> Value {
    audio_delta(json!({"id": audio_id, "transcript": transcript}))
}

pub fn audio_chunk_frame(audio_id: &str, chunk: &[u8]) -> Value {
    audio_delta(json!({"id": audio_id, "data": STANDARD.encode(chunk)}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn collect_frames(assets: AudioDemoAssets) -> Vec<Value> {
        assets
            .into_event_stream()
            .map(|event| event.unwrap().into_payload())
            .collect()
            .await
    }

    fn demo_config(dir: &TempDir, transcript: &str, pcm: &[u8]) -> AudioDemoConfig {
        let text_path = dir.path().join("file.txt");
        let pcm_path = dir.path().join("file.pcm");
        std::fs::write(&text_path, transcript).unwrap();
        std::fs::write(&pcm_path, pcm).unwrap();
        AudioDemoConfig {
            text_path,
            pcm_path,
            ..Default::default()
        }
    }

    #[test]
    fn test_chunk_size_for_defaults() {
        assert_eq!(chunk_size_bytes(16000, 40), 1280);
        assert_eq!(chunk_size_bytes(24000, 20), 960);
        assert_eq!(chunk_size_bytes(0, 40), 0);
        assert_eq!(chunk_size_bytes(16000, 0), 0);
    }

    #[test]
    fn test_chunk_size_overflow_is_invalid() {
        assert_eq!(chunk_size_bytes(u32::MAX, u32::MAX), 0);
        assert!(chunk_size_bytes(u32::MAX, 1000) > 0);
    }

    #[test]
    fn test_split_keeps_short_tail() {
        let pcm = Bytes::from(vec![7u8; 1280 * 2 + 100]);
        let chunks = split_pcm(pcm, 1280).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1280);
        assert_eq!(chunks[1].len(), 1280);
        assert_eq!(chunks[2].len(), 100);
    }

    #[test]
    fn test_split_empty_and_zero_size() {
        assert!(split_pcm(Bytes::new(), 1280).unwrap().is_empty());
        assert!(matches!(
            split_pcm(Bytes::from_static(b"ab"), 0),
            Err(AudioError::ZeroChunkSize)
        ));
    }

    #[tokio::test]
    async fn test_load_one_second_of_audio() {
        let dir = TempDir::new().unwrap();
        let config = demo_config(&dir, "hello there", &vec![0u8; 32000]);

        let assets = AudioDemoAssets::load(&config).await.unwrap();
        assert_eq!(assets.transcript, "hello there");
        assert_eq!(assets.chunks.len(), 25);
        assert!(assets.chunks.iter().all(|c| c.len() == 1280));
    }

    #[tokio::test]
    async fn test_frames_share_audio_id() {
        let dir = TempDir::new().unwrap();
        let pcm: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let config = demo_config(&dir, "transcript", &pcm);

        let assets = AudioDemoAssets::load(&config).await.unwrap();
        let frames = collect_frames(assets).await;
        assert_eq!(frames.len(), 4);

        let audio_id = frames[0]["choices"][0]["delta"]["audio"]["id"].clone();
        assert_eq!(frames[0]["choices"][0]["delta"]["audio"]["transcript"], "transcript");
        for frame in &frames {
            assert_eq!(frame["choices"][0]["delta"]["audio"]["id"], audio_id);
            assert!(frame["choices"][0]["finish_reason"].is_null());
        }

        let decoded: Vec<u8> = frames[1..]
            .iter()
            .flat_map(|f| {
                STANDARD
                    .decode(f["choices"][0]["delta"]["audio"]["data"].as_str().unwrap())
                    .unwrap()
            })
            .collect();
        assert_eq!(decoded, pcm);
    }

    #[tokio::test]
    async fn test_frame_ids_are_distinct() {
        let dir = TempDir::new().unwrap();
        let config = demo_config(&dir, "t", &vec![1u8; 1280 * 3]);
        let frames = collect_frames(AudioDemoAssets::load(&config).await.unwrap()).await;

        let ids: std::collections::HashSet<_> =
            frames.iter().map(|f| f["id"].as_str().unwrap().to_string()).collect();
        assert_eq!(ids.len(), frames.len());
        assert!(ids.iter().all(|id| id.len() == 32));
    }

    #[tokio::test]
    async fn test_missing_pcm_is_read_error() {
        let dir = TempDir::new().unwrap();
        let mut config = demo_config(&dir, "t", b"");
        config.pcm_path = dir.path().join("missing.pcm");

        let err = AudioDemoAssets::load(&config).await.unwrap_err();
        assert!(matches!(err, AudioError::Read { .. }));
        assert!(err.to_string().contains("missing.pcm"));
    }

    #[tokio::test]
    async fn test_empty_pcm_yields_transcript_only() {
        let dir = TempDir::new().unwrap();
        let config = demo_config(&dir, "only text", b"");

        let events: Vec<_> = AudioDemoAssets::load(&config)
            .await
            .unwrap()
            .into_event_stream()
            .collect()
            .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_chunks_encoded_on_demand() {
        let assets = AudioDemoAssets {
            transcript: "t".to_string(),
            chunks: vec![Bytes::from_static(b"\x01\x02"), Bytes::from_static(b"\x03")],
        };

        let mut events = assets.into_event_stream();
        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first.payload()["choices"][0]["delta"]["audio"]["transcript"], "t");
        assert_eq!(events.size_hint(), (2, Some(2)));

        let second = events.next().await.unwrap().unwrap();
        assert_eq!(second.payload()["choices"][0]["delta"]["audio"]["data"], "AQI=");
        assert_eq!(events.size_hint(), (1, Some(1)));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected_before_reading() {
        let config = AudioDemoConfig {
            text_path: PathBuf::from("/nonexistent/file.txt"),
            sample_rate: 0,
            ..Default::default()
        };
        assert!(matches!(
            AudioDemoAssets::load(&config).await,
            Err(AudioError::InvalidChunkSize { sample_rate: 0, .. })
        ));
    }
}
