use std::path::{Path, PathBuf};

use image::ImageFormat;
use uuid::Uuid;

use crate::{
    config::{MAX_ATTACHMENTS, MAX_ATTACHMENT_BYTES},
    error::{AttachmentRejection, RejectReason},
    model::{AttachmentKind, StagedAttachment},
};

/// A file offered to the composer, with its size if it could be read.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub size: Result<u64, String>,
}

impl FileCandidate {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = std::fs::metadata(&path)
            .map_err(|e| e.to_string())
            .and_then(|meta| {
                if meta.is_file() {
                    Ok(meta.len())
                } else {
                    Err("not a regular file".to_string())
                }
            });
        Self { path, size }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        _ => None,
    }
}

fn kind_for(path: &Path) -> AttachmentKind {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Png | ImageFormat::Jpeg) => AttachmentKind::Image,
        _ => AttachmentKind::File,
    }
}

/// What leaves the composer on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub content: String,
    pub attachments: Vec<StagedAttachment>,
}

#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    staged: Vec<StagedAttachment>,
    sending: bool,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replaces the draft. Returns the typing flag to announce when the text changed.
    pub fn set_draft(&mut self, text: impl Into<String>) -> Option<bool> {
        let text = text.into();
        if text == self.draft {
            return None;
        }
        self.draft = text;
        Some(!self.draft.trim().is_empty())
    }

    pub fn staged(&self) -> &[StagedAttachment] {
        &self.staged
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn set_sending(&mut self, sending: bool) {
        self.sending = sending;
    }

    /// Stages a batch. A batch that would exceed the file cap is refused whole;
    /// otherwise oversize or disallowed files are refused one by one and the rest are kept.
    pub fn stage(&mut self, batch: Vec<FileCandidate>) -> Vec<AttachmentRejection> {
        if self.staged.len() + batch.len() > MAX_ATTACHMENTS {
            return batch
                .iter()
                .map(|candidate| AttachmentRejection {
                    name: display_name(&candidate.path),
                    reason: RejectReason::TooMany {
                        limit: MAX_ATTACHMENTS,
                    },
                })
                .collect();
        }

        let mut rejections = Vec::new();
        for candidate in batch {
            let name = display_name(&candidate.path);
            let size = match candidate.size {
                Ok(size) => size,
                Err(detail) => {
                    rejections.push(AttachmentRejection {
                        name,
                        reason: RejectReason::Unreadable(detail),
                    });
                    continue;
                }
            };
            let Some(content_type) = content_type_for(&candidate.path) else {
                rejections.push(AttachmentRejection {
                    name,
                    reason: RejectReason::UnsupportedType,
                });
                continue;
            };
            if size > MAX_ATTACHMENT_BYTES {
                rejections.push(AttachmentRejection {
                    name,
                    reason: RejectReason::TooLarge {
                        size,
                        limit: MAX_ATTACHMENT_BYTES,
                    },
                });
                continue;
            }
            self.staged.push(StagedAttachment {
                local_id: Uuid::new_v4(),
                kind: kind_for(&candidate.path),
                path: candidate.path,
                name,
                size,
                content_type,
            });
        }
        rejections
    }

    pub fn unstage(&mut self, local_id: Uuid) -> bool {
        let before = self.staged.len();
        self.staged.retain(|a| a.local_id != local_id);
        self.staged.len() != before
    }

    pub fn can_submit(&self) -> bool {
        !self.sending && (!self.draft.trim().is_empty() || !self.staged.is_empty())
    }

    /// Takes the trimmed text and staged files, clearing the composer.
    /// `None` when there is nothing to send.
    pub fn take(&mut self) -> Option<Submission> {
        if !self.can_submit() {
            return None;
        }
        let content = self.draft.trim().to_string();
        self.draft.clear();
        Some(Submission {
            content,
            attachments: std::mem::take(&mut self.staged),
        })
    }

    pub fn clear(&mut self) {
        self.draft.clear();
        self.staged.clear();
        self.sending = false;
    }
}
