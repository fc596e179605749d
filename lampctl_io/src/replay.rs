//! Recorded detections played back as camera frames and detector output.
//!
//! Script format: JSON Lines, one frame per line, each line an array of
//! `{ "bbox": [x, y, w, h], "label": "person", "confidence": 0.9 }`.
//! `class_id` (1-based into a label file) may be given instead of `label`.
use std::sync::Arc;

use lampctl_traits::{BoundingBox, Detection, Detector, Frame, FrameSource, suppress_overlaps};
use serde::Deserialize;

use crate::error::{LinkError, Result};

#[derive(Debug, Deserialize)]
struct ScriptEntry {
    bbox: [f32; 4],
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    class_id: Option<usize>,
    confidence: f32,
}

#[derive(Debug, Default)]
pub struct ReplayScript {
    frames: Vec<Vec<Detection>>,
}

impl ReplayScript {
    /// Parse a script. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str, labels: &[String]) -> Result<Self> {
        let mut frames = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entries: Vec<ScriptEntry> =
                serde_json::from_str(line).map_err(|e| LinkError::Replay {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            let mut dets = Vec::with_capacity(entries.len());
            for e in entries {
                let label = match (e.label, e.class_id) {
                    (Some(l), _) => l,
                    (None, Some(id)) => id
                        .checked_sub(1)
                        .and_then(|i| labels.get(i))
                        .cloned()
                        .ok_or_else(|| LinkError::Replay {
                            line: idx + 1,
                            reason: format!("class_id {id} not in label file"),
                        })?,
                    (None, None) => {
                        return Err(LinkError::Replay {
                            line: idx + 1,
                            reason: "entry needs a label or class_id".to_string(),
                        });
                    }
                };
                let [x, y, w, h] = e.bbox;
                dets.push(Detection::new(BoundingBox::new(x, y, w, h), label, e.confidence));
            }
            frames.push(dets);
        }
        Ok(Self { frames })
    }

    pub fn load(path: &std::path::Path, labels: &[String]) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, labels)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn frame(&self, seq: u64) -> &[Detection] {
        if self.frames.is_empty() {
            return &[];
        }
        &self.frames[(seq % self.frames.len() as u64) as usize]
    }
}

/// Frame source yielding one blank frame per script line.
pub struct ReplayCamera {
    script: Arc<ReplayScript>,
    width: u32,
    height: u32,
    looping: bool,
    seq: u64,
}

impl ReplayCamera {
    pub fn new(script: Arc<ReplayScript>, width: u32, height: u32, looping: bool) -> Self {
        Self {
            script,
            width,
            height,
            looping,
            seq: 0,
        }
    }
}

impl FrameSource for ReplayCamera {
    fn next_frame(
        &mut self,
    ) -> std::result::Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        let len = self.script.len() as u64;
        if len == 0 || (!self.looping && self.seq >= len) {
            return Ok(None);
        }
        let frame = Frame {
            seq: self.seq,
            width: self.width,
            height: self.height,
            pixels: Vec::new(),
        };
        self.seq += 1;
        Ok(Some(frame))
    }
}

/// Detector returning the scripted detections for a frame, after the
/// model-side confidence threshold and overlap suppression.
pub struct ReplayDetector {
    script: Arc<ReplayScript>,
    confidence_threshold: f32,
    nms_threshold: f32,
}

impl ReplayDetector {
    pub fn new(script: Arc<ReplayScript>, confidence_threshold: f32, nms_threshold: f32) -> Self {
        Self {
            script,
            confidence_threshold,
            nms_threshold,
        }
    }
}

impl Detector for ReplayDetector {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> std::result::Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        let candidates: Vec<Detection> = self
            .script
            .frame(frame.seq)
            .iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .cloned()
            .collect();
        Ok(suppress_overlaps(candidates, self.nms_threshold))
    }
}
