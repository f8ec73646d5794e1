#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::LabelMap;
use crate::detect::nms::non_max_suppression;
use crate::detect::result::{BBox, Detection, RawDetection};
use crate::frame::Frame;

/// Tract-based backend for exported YOLOv8 / YOLO-World ONNX models.
///
/// The model takes a square `1x3xSxS` input in [0, 1] and returns
/// `1x(4+nc)xN`: box center, size and one score per class for every anchor.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    labels: LabelMap,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, labels: LabelMap) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{} input, {} classes)",
            model_path.display(),
            input_size,
            input_size,
            labels.len()
        );

        Ok(Self {
            model,
            labels,
            input_size,
            confidence_threshold: 0.20,
            iou_threshold: 0.7,
        })
    }

    /// Override the default confidence and IoU thresholds.
    pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
        self.confidence_threshold = confidence;
        self.iou_threshold = iou;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let side = self.input_size;
        let resized = image::imageops::resize(frame.image(), side, side, FilterType::Triangle);
        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("expected a [1, 4+nc, N] model output")?;
        decode_yolo(
            view,
            &self.labels,
            self.input_size,
            (frame.width(), frame.height()),
            self.confidence_threshold,
            self.iou_threshold,
        )
    }
}

/// Decode a YOLOv8 head output `[1, 4+nc, N]`: per anchor `cx, cy, w, h` in
/// model input pixels followed by one score per class. Keeps the best class
/// of each anchor at or above `confidence`, maps boxes to frame pixels and
/// runs class-aware NMS.
pub(crate) fn decode_yolo(
    view: tract_ndarray::ArrayView3<'_, f32>,
    labels: &LabelMap,
    input_size: u32,
    frame_size: (u32, u32),
    confidence: f32,
    iou: f32,
) -> Result<Vec<RawDetection>> {
    let channels = view.shape()[1];
    let anchors = view.shape()[2];
    let classes = channels
        .checked_sub(4)
        .ok_or_else(|| anyhow!("model output has only {} channels", channels))?;
    if classes != labels.len() {
        return Err(anyhow!(
            "model predicts {} classes but {} labels are configured",
            classes,
            labels.len()
        ));
    }

    let sx = frame_size.0 as f32 / input_size as f32;
    let sy = frame_size.1 as f32 / input_size as f32;

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let (class_id, score) = (0..classes)
            .map(|c| (c, view[[0, 4 + c, i]]))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if score < confidence {
            continue;
        }
        let (cx, cy, w, h) = (
            view[[0, 0, i]],
            view[[0, 1, i]],
            view[[0, 2, i]],
            view[[0, 3, i]],
        );
        let bbox =
            BBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0).scaled(sx, sy);
        candidates.push(RawDetection {
            class_id,
            confidence: score,
            bbox,
        });
    }

    Ok(non_max_suppression(candidates, iou))
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let raw = self.decode(outputs, frame)?;
        Ok(self.labels.resolve(raw))
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let blank = Frame::new(0, image::RgbImage::new(side, side));
        self.detect(&blank).map(|_| ())
    }
}
