use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{FragmentError, VerticutError, VerticutResult};

/// Acknowledgement for one accepted fragment.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FragmentAck {
    pub upload_id: String,
    /// Distinct indices stored so far.
    pub received: usize,
    pub total_chunks: u32,
    /// `true` once every index in `[0, total_chunks)` has arrived.
    pub complete: bool,
}

struct UploadSession {
    total_chunks: u32,
    filename: String,
    fragments: Vec<Option<Vec<u8>>>,
}

impl UploadSession {
    fn new(total_chunks: u32, filename: String) -> Self {
        Self {
            total_chunks,
            filename,
            fragments: (0..total_chunks).map(|_| None).collect(),
        }
    }

    fn received(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_some()).count()
    }

    fn is_complete(&self) -> bool {
        self.fragments.iter().all(|f| f.is_some())
    }
}

/// Reassembles a source file delivered as ordered byte fragments.
///
/// Sessions are independent: the table lock is held only for lookup and
/// insert, and all per-session work runs under that session's own mutex, so
/// unrelated uploads never block each other. Overlapping operations on the
/// *same* upload id are rejected with [`FragmentError::SessionBusy`] rather
/// than serialized, which keeps a fragment arriving mid-assembly from ever
/// corrupting the reconstructed stream.
#[derive(Default)]
pub struct UploadAssembler {
    sessions: Mutex<HashMap<String, Arc<Mutex<UploadSession>>>>,
}

impl UploadAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one fragment, creating the session on first contact.
    ///
    /// Re-receiving an index overwrites the stored payload; fragment arrival
    /// order carries no meaning anywhere in the assembler.
    pub fn receive_fragment(
        &self,
        upload_id: &str,
        index: u32,
        total_chunks: u32,
        filename: &str,
        bytes: Vec<u8>,
    ) -> VerticutResult<FragmentAck> {
        if index >= total_chunks {
            return Err(FragmentError::IndexOutOfRange {
                index,
                total_chunks,
            }
            .into());
        }

        let session = {
            let mut sessions = self.lock_table();
            sessions
                .entry(upload_id.to_string())
                .or_insert_with(|| {
                    tracing::debug!(upload_id, total_chunks, "new upload session");
                    Arc::new(Mutex::new(UploadSession::new(
                        total_chunks,
                        filename.to_string(),
                    )))
                })
                .clone()
        };

        let mut session = session.try_lock().map_err(|_| FragmentError::SessionBusy {
            upload_id: upload_id.to_string(),
        })?;
        if session.total_chunks != total_chunks {
            return Err(FragmentError::TotalChunksMismatch {
                expected: session.total_chunks,
                got: total_chunks,
            }
            .into());
        }

        session.fragments[index as usize] = Some(bytes);
        Ok(FragmentAck {
            upload_id: upload_id.to_string(),
            received: session.received(),
            total_chunks: session.total_chunks,
            complete: session.is_complete(),
        })
    }

    /// Reassemble a completed session into `<dir>/<sanitized filename>`.
    ///
    /// One-shot and consuming: on success the session and all fragment
    /// storage are released. While fragments are missing the session stays
    /// intact and [`VerticutError::Incomplete`] is returned.
    pub fn try_assemble(&self, upload_id: &str, dir: &Path) -> VerticutResult<PathBuf> {
        let session_arc = self.lock_table().get(upload_id).cloned().ok_or_else(|| {
            VerticutError::invalid_params(format!("unknown upload id '{upload_id}'"))
        })?;

        let session = session_arc
            .try_lock()
            .map_err(|_| FragmentError::SessionBusy {
                upload_id: upload_id.to_string(),
            })?;
        if !session.is_complete() {
            return Err(VerticutError::Incomplete {
                received: session.received(),
                total: session.total_chunks,
            });
        }

        // Concatenate strictly in index order; arrival order is irrelevant.
        let total_len: usize = session
            .fragments
            .iter()
            .flatten()
            .map(|f| f.len())
            .sum();
        let mut assembled = Vec::with_capacity(total_len);
        for fragment in session.fragments.iter().flatten() {
            assembled.extend_from_slice(fragment);
        }

        let out_path = dir.join(sanitize_filename(&session.filename));
        {
            use anyhow::Context as _;
            std::fs::write(&out_path, &assembled)
                .with_context(|| format!("failed to write assembled upload '{}'", out_path.display()))?;
        }
        tracing::info!(upload_id, bytes = assembled.len(), "upload assembled");

        // Drop fragment storage and the session itself. The session lock is
        // still held, so a fragment racing this removal was already rejected
        // as busy.
        self.lock_table().remove(upload_id);
        Ok(out_path)
    }

    /// Remove a session without assembling. Returns `false` for unknown ids.
    pub fn abandon(&self, upload_id: &str) -> bool {
        self.lock_table().remove(upload_id).is_some()
    }

    /// Number of sessions currently tracked.
    pub fn session_count(&self) -> usize {
        self.lock_table().len()
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<UploadSession>>>> {
        // Lock poisoning only happens if a panic escaped while holding the
        // lock; the table is still structurally sound, so keep serving.
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Reduce a caller-supplied filename to a safe basename.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_is_rejected_before_session_creation() {
        let assembler = UploadAssembler::new();
        let err = assembler
            .receive_fragment("u1", 3, 3, "a.mp4", vec![1])
            .unwrap_err();
        assert!(matches!(
            err,
            VerticutError::Fragment(FragmentError::IndexOutOfRange { index: 3, total_chunks: 3 })
        ));
        assert_eq!(assembler.session_count(), 0);
    }

    #[test]
    fn total_chunks_mismatch_keeps_session_intact() {
        let assembler = UploadAssembler::new();
        assembler
            .receive_fragment("u1", 0, 3, "a.mp4", vec![1])
            .unwrap();
        let err = assembler
            .receive_fragment("u1", 1, 4, "a.mp4", vec![2])
            .unwrap_err();
        assert!(matches!(
            err,
            VerticutError::Fragment(FragmentError::TotalChunksMismatch { expected: 3, got: 4 })
        ));
        // The original fragment is still there.
        let ack = assembler
            .receive_fragment("u1", 1, 3, "a.mp4", vec![2])
            .unwrap();
        assert_eq!(ack.received, 2);
    }

    #[test]
    fn duplicate_fragment_overwrites_idempotently() {
        let assembler = UploadAssembler::new();
        assembler
            .receive_fragment("u1", 0, 2, "a.mp4", vec![0xAA])
            .unwrap();
        let ack = assembler
            .receive_fragment("u1", 0, 2, "a.mp4", vec![0xBB])
            .unwrap();
        assert_eq!(ack.received, 1);
        assert!(!ack.complete);
    }

    #[test]
    fn assemble_before_completion_is_incomplete_and_nondestructive() {
        let assembler = UploadAssembler::new();
        let dir = tempfile::tempdir().unwrap();
        assembler
            .receive_fragment("u1", 1, 3, "a.mp4", vec![2])
            .unwrap();
        let err = assembler.try_assemble("u1", dir.path()).unwrap_err();
        assert!(matches!(
            err,
            VerticutError::Incomplete {
                received: 1,
                total: 3
            }
        ));
        assert_eq!(assembler.session_count(), 1);
    }

    #[test]
    fn assembly_concatenates_in_index_order_regardless_of_arrival() {
        let assembler = UploadAssembler::new();
        let dir = tempfile::tempdir().unwrap();
        // Arrival order [2, 0, 1].
        assembler
            .receive_fragment("u1", 2, 3, "clip.mp4", b"CC".to_vec())
            .unwrap();
        assembler
            .receive_fragment("u1", 0, 3, "clip.mp4", b"AA".to_vec())
            .unwrap();
        let ack = assembler
            .receive_fragment("u1", 1, 3, "clip.mp4", b"BB".to_vec())
            .unwrap();
        assert!(ack.complete);

        let path = assembler.try_assemble("u1", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "clip.mp4");
        assert_eq!(std::fs::read(&path).unwrap(), b"AABBCC");
        // One-shot: the session is gone.
        assert_eq!(assembler.session_count(), 0);
    }

    #[test]
    fn independent_sessions_do_not_interfere() {
        let assembler = UploadAssembler::new();
        let dir = tempfile::tempdir().unwrap();
        assembler
            .receive_fragment("a", 0, 1, "a.bin", b"left".to_vec())
            .unwrap();
        assembler
            .receive_fragment("b", 0, 1, "b.bin", b"right".to_vec())
            .unwrap();
        let pa = assembler.try_assemble("a", dir.path()).unwrap();
        let pb = assembler.try_assemble("b", dir.path()).unwrap();
        assert_eq!(std::fs::read(pa).unwrap(), b"left");
        assert_eq!(std::fs::read(pb).unwrap(), b"right");
    }

    #[test]
    fn abandon_discards_a_session() {
        let assembler = UploadAssembler::new();
        assembler
            .receive_fragment("u1", 0, 2, "a.mp4", vec![1])
            .unwrap();
        assert!(assembler.abandon("u1"));
        assert!(!assembler.abandon("u1"));
        assert_eq!(assembler.session_count(), 0);
    }

    #[test]
    fn filenames_are_reduced_to_safe_basenames() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("c:\\videos\\in put.mp4"), "input.mp4");
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("...."), "upload.bin");
        assert_eq!(sanitize_filename(""), "upload.bin");
    }
}
